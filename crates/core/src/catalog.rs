//! Category hierarchy bookkeeping.
//!
//! Categories form a tree through `parent_id`; siblings (same parent) are
//! sorted by an integer `order`. The functions here only *plan* changes: they
//! take the current sibling positions and return the assignments to write,
//! which the caller applies in a single transaction.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::CategoryId;

/// Step used by single-category moves (`PATCH /categories/{id}/move`).
pub const MOVE_STEP: i32 = 1;

/// Step used by bulk reorder and normalization. Leaves room for manual inserts.
pub const ORDER_STEP: i32 = 10;

/// Current position of one sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiblingPosition {
    pub id: CategoryId,
    pub order: i32,
}

/// A new `order` value to write for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAssignment {
    pub id: CategoryId,
    pub order: i32,
}

/// Errors produced while planning an ordering change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderingError {
    #[error("category {0} is not a sibling in this group")]
    UnknownCategory(CategoryId),
    #[error("reorder list must contain every sibling exactly once")]
    IncompleteReorder,
    #[error("order must not be negative")]
    NegativeOrder,
    #[error("step must be positive")]
    InvalidStep,
    #[error("a category cannot be placed under itself or one of its descendants")]
    CreatesCycle,
}

/// Plan moving `moving` to `new_order` within its sibling group.
///
/// Siblings after the old slot up to and including the target slot shift by
/// `step` toward the vacated slot; the moved category takes the target. A
/// target past the last sibling is clamped to the last position. Rows whose
/// value does not change are omitted.
///
/// # Errors
///
/// Returns an error if `moving` is not among `siblings`, `new_order` is
/// negative, or `step` is not positive.
pub fn plan_move(
    siblings: &[SiblingPosition],
    moving: CategoryId,
    new_order: i32,
    step: i32,
) -> Result<Vec<OrderAssignment>, OrderingError> {
    if step <= 0 {
        return Err(OrderingError::InvalidStep);
    }
    if new_order < 0 {
        return Err(OrderingError::NegativeOrder);
    }

    let old_order = siblings
        .iter()
        .find(|s| s.id == moving)
        .map(|s| s.order)
        .ok_or(OrderingError::UnknownCategory(moving))?;

    let last = siblings.iter().map(|s| s.order).max().unwrap_or(0);
    let target = new_order.min(last);
    if target == old_order {
        return Ok(Vec::new());
    }

    let mut plan: Vec<OrderAssignment> = siblings
        .iter()
        .filter(|s| s.id != moving)
        .filter_map(|s| {
            let shifted = if target > old_order && s.order > old_order && s.order <= target {
                Some(s.order - step)
            } else if target < old_order && s.order >= target && s.order < old_order {
                Some(s.order + step)
            } else {
                None
            };
            shifted.map(|order| OrderAssignment { id: s.id, order })
        })
        .collect();

    plan.push(OrderAssignment {
        id: moving,
        order: target,
    });
    Ok(plan)
}

/// Plan an explicit ordering: `ids[0]` gets 0, `ids[1]` gets `step`, and so on.
///
/// # Errors
///
/// Returns [`OrderingError::IncompleteReorder`] unless `ids` is a permutation
/// of the sibling ids.
pub fn plan_reorder(
    siblings: &[SiblingPosition],
    ids: &[CategoryId],
    step: i32,
) -> Result<Vec<OrderAssignment>, OrderingError> {
    if step <= 0 {
        return Err(OrderingError::InvalidStep);
    }

    let expected: HashSet<CategoryId> = siblings.iter().map(|s| s.id).collect();
    let given: HashSet<CategoryId> = ids.iter().copied().collect();
    if ids.len() != siblings.len() || given != expected {
        return Err(OrderingError::IncompleteReorder);
    }

    Ok(assign_sequence(siblings, ids.iter().copied(), step))
}

/// Plan renumbering a sibling group to `0, step, 2*step, ...`, keeping the
/// current relative order (ties broken by id).
///
/// # Errors
///
/// Returns [`OrderingError::InvalidStep`] if `step` is not positive.
pub fn plan_normalize(
    siblings: &[SiblingPosition],
    step: i32,
) -> Result<Vec<OrderAssignment>, OrderingError> {
    if step <= 0 {
        return Err(OrderingError::InvalidStep);
    }

    let mut sorted = siblings.to_vec();
    sorted.sort_by_key(|s| (s.order, s.id));
    Ok(assign_sequence(siblings, sorted.iter().map(|s| s.id), step))
}

/// The `order` for a new category appended to a sibling group.
#[must_use]
pub fn next_order(siblings: &[SiblingPosition], step: i32) -> i32 {
    siblings
        .iter()
        .map(|s| s.order)
        .max()
        .map_or(0, |max| max.saturating_add(step))
}

/// Whether re-parenting `category` under `proposed_parent` would create a cycle.
///
/// Walks `parent_of` upward from the proposed parent; reaching `category`
/// means the proposed parent is the category itself or one of its
/// descendants. The walk stops on a repeated node, so a cycle already present
/// in storage cannot loop forever.
pub fn creates_cycle<F>(
    category: CategoryId,
    proposed_parent: Option<CategoryId>,
    parent_of: F,
) -> bool
where
    F: Fn(CategoryId) -> Option<CategoryId>,
{
    let mut visited = HashSet::new();
    let mut current = proposed_parent;

    while let Some(id) = current {
        if id == category {
            return true;
        }
        if !visited.insert(id) {
            return false;
        }
        current = parent_of(id);
    }

    false
}

/// Emit assignments for `ordered_ids` in sequence, skipping unchanged rows.
fn assign_sequence(
    siblings: &[SiblingPosition],
    ordered_ids: impl Iterator<Item = CategoryId>,
    step: i32,
) -> Vec<OrderAssignment> {
    ordered_ids
        .zip((0..).map(|i: i32| i.saturating_mul(step)))
        .filter(|(id, order)| {
            siblings
                .iter()
                .find(|s| s.id == *id)
                .is_none_or(|s| s.order != *order)
        })
        .map(|(id, order)| OrderAssignment { id, order })
        .collect()
}
