//! Dedup ledger: the single source of truth for "have we seen this before".
//!
//! The harvest loop must never add a record through any other path; `accept`
//! being the only mutator is what closes the duplicate-insert bug class.

use std::collections::HashSet;

use crate::models::Record;

/// Identity-keyed set of accepted records, in insertion order.
///
/// Append-only within a run: a record, once accepted, is never mutated or
/// removed. The unflushed counter drives checkpoint timing.
#[derive(Debug, Default)]
pub struct DedupLedger {
    records: Vec<Record>,
    names: HashSet<String>,
    new_since_checkpoint: usize,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Accept a record unless its name is already present.
    ///
    /// Returns false and leaves the ledger untouched on a duplicate.
    pub fn accept(&mut self, record: Record) -> bool {
        if !self.names.insert(record.name.clone()) {
            return false;
        }
        self.records.push(record);
        self.new_since_checkpoint += 1;
        true
    }

    /// Rebuild path for checkpoint load at startup.
    ///
    /// The checkpoint is already dedup-clean, so loaded records bypass the
    /// unflushed counter; they are not "new" work to flush.
    pub fn absorb(&mut self, record: Record) {
        if self.names.insert(record.name.clone()) {
            self.records.push(record);
        }
    }

    pub fn should_checkpoint(&self, threshold: usize) -> bool {
        self.new_since_checkpoint >= threshold
    }

    /// Reset the unflushed counter after a successful save. Accepted records
    /// are untouched.
    pub fn mark_checkpointed(&mut self) {
        self.new_since_checkpoint = 0;
    }

    /// Records accepted since the last successful checkpoint.
    pub fn unflushed(&self) -> usize {
        self.new_since_checkpoint
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The accepted records in canonical (insertion) order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Availability;

    fn record(name: &str) -> Record {
        Record {
            name: name.to_string(),
            price: Some(4.99),
            description: None,
            rating: None,
            category: "All Products".to_string(),
            availability: Availability::InStock,
            image_url: None,
        }
    }

    #[test]
    fn test_accept_is_idempotent_per_name() {
        let mut ledger = DedupLedger::new();
        assert!(ledger.accept(record("Toor Dal 2lb")));
        assert_eq!(ledger.len(), 1);

        // Second accept of the same identity is a no-op
        assert!(!ledger.accept(record("Toor Dal 2lb")));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.unflushed(), 1);
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut ledger = DedupLedger::new();
        ledger.accept(record("b"));
        ledger.accept(record("a"));
        ledger.accept(record("c"));
        let names: Vec<_> = ledger.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_absorb_skips_unflushed_counter() {
        let mut ledger = DedupLedger::new();
        ledger.absorb(record("from-checkpoint"));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.unflushed(), 0);
        assert!(ledger.contains("from-checkpoint"));

        // New accepts on top of absorbed records count normally
        assert!(ledger.accept(record("fresh")));
        assert!(!ledger.accept(record("from-checkpoint")));
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.unflushed(), 1);
    }

    #[test]
    fn test_checkpoint_threshold_and_reset() {
        let mut ledger = DedupLedger::new();
        for i in 0..3 {
            ledger.accept(record(&format!("item-{i}")));
        }
        assert!(!ledger.should_checkpoint(4));
        assert!(ledger.should_checkpoint(3));

        ledger.mark_checkpointed();
        assert_eq!(ledger.unflushed(), 0);
        assert!(!ledger.should_checkpoint(1));
        // accepted set untouched
        assert_eq!(ledger.len(), 3);
    }
}
