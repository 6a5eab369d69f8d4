//! Newtype IDs for type-safe entity references.
//!
//! Every table keyed by a `SERIAL` column gets its own wrapper so a
//! `CategoryId` can never be passed where a `ProductId` is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>` and `Into<i32>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use shoply_core::define_id;
/// define_id!(WishlistId);
/// define_id!(CouponId);
///
/// let wishlist = WishlistId::new(1);
/// let coupon = CouponId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: WishlistId = coupon;
/// # let _ = (wishlist, coupon);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type))]
        #[cfg_attr(feature = "postgres", sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Wrap a raw `SERIAL` value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// The raw column value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Catalog
define_id!(ProductId);
define_id!(VariantId);
define_id!(CategoryId);

// Orders
define_id!(OrderId);
define_id!(OrderHistoryId);
define_id!(InvoiceId);

// Promotional content
define_id!(BannerId);
define_id!(FeatureIconId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_transparently() {
        let id = ProductId::new(42);
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("42"));
    }

    #[test]
    fn test_ids_sort_by_value() {
        let mut ids = vec![CategoryId::new(3), CategoryId::new(1), CategoryId::new(2)];
        ids.sort();
        assert_eq!(
            ids,
            vec![CategoryId::new(1), CategoryId::new(2), CategoryId::new(3)]
        );
    }

    #[test]
    fn test_id_parses_from_text() {
        assert_eq!(" 17 ".parse::<OrderId>(), Ok(OrderId::new(17)));
        assert!("abc".parse::<OrderId>().is_err());
    }
}
