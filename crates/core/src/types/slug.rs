//! URL-safe identifiers for products and categories.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// Nothing usable was left after normalization.
    #[error("slug cannot be empty")]
    Empty,
    /// Longer than [`Slug::MAX_LENGTH`].
    #[error("slug must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// Contains characters outside `a-z`, `0-9` and `-`.
    #[error("slug may only contain lowercase letters, digits and single hyphens")]
    InvalidCharacters,
}

/// A lowercase, hyphen-separated URL segment such as `letni-saty-2024`.
///
/// ```
/// use shoply_core::Slug;
///
/// let slug = Slug::from_name("Letní šaty 2024").unwrap();
/// assert_eq!(slug.as_str(), "letni-saty-2024");
///
/// assert!(Slug::parse("Not A Slug").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Maximum stored length.
    pub const MAX_LENGTH: usize = 200;

    /// Validate an already-formed slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, or not in canonical
    /// slug form.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        let valid_chars = s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid_chars || s.starts_with('-') || s.ends_with('-') || s.contains("--") {
            return Err(SlugError::InvalidCharacters);
        }
        Ok(Self(s.to_owned()))
    }

    /// Derive a slug from a display name, transliterating accents.
    ///
    /// # Errors
    ///
    /// Returns an error if the name contains nothing sluggable or the result
    /// is too long.
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let slugified = slug::slugify(name);
        Self::parse(&slugified)
    }

    /// Use the explicit slug when present, otherwise derive one from `name`.
    ///
    /// # Errors
    ///
    /// See [`Slug::parse`] and [`Slug::from_name`].
    pub fn explicit_or_from_name(explicit: Option<&str>, name: &str) -> Result<Self, SlugError> {
        match explicit.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Self::parse(s),
            None => Self::from_name(name),
        }
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_transliterates() {
        assert_eq!(Slug::from_name("Dětské boty").unwrap().as_str(), "detske-boty");
        assert_eq!(Slug::from_name("  T-shirt  XL ").unwrap().as_str(), "t-shirt-xl");
    }

    #[test]
    fn test_from_name_without_letters() {
        assert_eq!(Slug::from_name("!!!"), Err(SlugError::Empty));
    }

    #[test]
    fn test_parse_rejects_non_canonical() {
        assert_eq!(Slug::parse(""), Err(SlugError::Empty));
        assert_eq!(Slug::parse("Upper"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("-lead"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("double--dash"), Err(SlugError::InvalidCharacters));
        assert!(Slug::parse("summer-sale-2024").is_ok());
    }

    #[test]
    fn test_explicit_or_from_name() {
        let explicit = Slug::explicit_or_from_name(Some("custom"), "Ignored").unwrap();
        assert_eq!(explicit.as_str(), "custom");

        let derived = Slug::explicit_or_from_name(Some("   "), "Zimní bundy").unwrap();
        assert_eq!(derived.as_str(), "zimni-bundy");
    }
}
