//! # Order Manager
//!
//! `sectionsOrder` is the single source of truth for display and navigation
//! order. It is kept apart from the `sections` map, whose iteration order is
//! by id and carries no meaning.
//!
//! The manager itself never checks set-equality against the sections map;
//! [`check_permutation`] is what the story-level operations call before
//! committing a new order.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::IntegrityError;

/// Ordered sequence of section ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionsOrder(Arc<Vec<String>>);

impl SectionsOrder {
    pub fn new(ids: Vec<String>) -> Self {
        Self(Arc::new(ids))
    }

    /// Push a section id at the end (used on section creation)
    pub fn append(&mut self, section_id: &str) {
        Arc::make_mut(&mut self.0).push(section_id.to_string());
    }

    /// Replace the order wholesale
    pub fn reorder(&mut self, new_order: Vec<String>) {
        self.0 = Arc::new(new_order);
    }

    /// Remove a section id, preserving the relative order of the others.
    ///
    /// Returns whether the id was present; removing an absent id is a no-op.
    pub fn remove(&mut self, section_id: &str) -> bool {
        match self.position(section_id) {
            Some(index) => {
                Arc::make_mut(&mut self.0).remove(index);
                true
            }
            None => false,
        }
    }

    /// Compute the order obtained by moving the element at `from` to `to`
    pub fn moved(&self, from: usize, to: usize) -> Result<Vec<String>, IntegrityError> {
        array_move(&self.0, from, to)
    }

    pub fn position(&self, section_id: &str) -> Option<usize> {
        self.0.iter().position(|id| id == section_id)
    }

    pub fn contains(&self, section_id: &str) -> bool {
        self.position(section_id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether two orders share the same backing sequence
    pub fn ptr_eq(&self, other: &SectionsOrder) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Vec<String>> for SectionsOrder {
    fn from(ids: Vec<String>) -> Self {
        Self::new(ids)
    }
}

/// Move the element at `from` so that it ends up at index `to`
pub fn array_move(ids: &[String], from: usize, to: usize) -> Result<Vec<String>, IntegrityError> {
    let len = ids.len();
    if from >= len {
        return Err(IntegrityError::IndexOutOfBounds { index: from, len });
    }
    if to >= len {
        return Err(IntegrityError::IndexOutOfBounds { index: to, len });
    }

    let mut moved = ids.to_vec();
    let item = moved.remove(from);
    moved.insert(to, item);
    Ok(moved)
}

/// Check that `order` is a permutation of the keys of `sections`.
///
/// Duplicated ids are reported as unexpected.
pub fn check_permutation<T>(
    order: &[String],
    sections: &BTreeMap<String, T>,
) -> Result<(), IntegrityError> {
    let mut seen = HashSet::with_capacity(order.len());
    let mut unexpected = Vec::new();

    for id in order {
        if !sections.contains_key(id) || !seen.insert(id.as_str()) {
            unexpected.push(id.clone());
        }
    }

    let missing: Vec<String> = sections
        .keys()
        .filter(|id| !seen.contains(id.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(IntegrityError::OrderMismatch {
            missing,
            unexpected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_move_last_to_first() {
        let order = SectionsOrder::new(ids(&["a", "b", "c"]));
        assert_eq!(order.moved(2, 0).unwrap(), ids(&["c", "a", "b"]));
    }

    #[test]
    fn test_move_first_to_last() {
        let order = SectionsOrder::new(ids(&["a", "b", "c"]));
        assert_eq!(order.moved(0, 2).unwrap(), ids(&["b", "c", "a"]));
    }

    #[test]
    fn test_move_out_of_bounds() {
        let order = SectionsOrder::new(ids(&["a"]));
        assert_eq!(
            order.moved(0, 3),
            Err(IntegrityError::IndexOutOfBounds { index: 3, len: 1 })
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut order = SectionsOrder::new(ids(&["a", "b", "c"]));
        assert!(order.remove("b"));
        assert!(!order.remove("b"));
        assert_eq!(order.as_slice(), ids(&["a", "c"]).as_slice());
    }

    #[test]
    fn test_append_does_not_touch_clones() {
        let original = SectionsOrder::new(ids(&["a"]));
        let mut next = original.clone();
        next.append("b");

        assert_eq!(original.len(), 1);
        assert_eq!(next.len(), 2);
        assert!(!original.ptr_eq(&next));
    }

    #[test]
    fn test_check_permutation_reports_both_directions() {
        let mut sections = BTreeMap::new();
        sections.insert("a".to_string(), ());
        sections.insert("b".to_string(), ());

        assert!(check_permutation(&ids(&["b", "a"]), &sections).is_ok());
        assert_eq!(
            check_permutation(&ids(&["a", "a", "z"]), &sections),
            Err(IntegrityError::OrderMismatch {
                missing: ids(&["b"]),
                unexpected: ids(&["a", "z"]),
            })
        );
    }
}
