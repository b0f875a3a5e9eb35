//! In-memory journal lookup.
//!
//! Built once from a [`Dataset`]: every display name is normalized and mapped to its
//! record. When several names normalize to the same key the first one in dataset order
//! is kept.
//!
//! Fuzzy lookup scans keys shortest first, ties broken lexicographically, so the result
//! does not depend on hash or file order.

use crate::dataset::{Dataset, JournalRecord};
use crate::normalize::normalize;
use std::collections::HashMap;
use tracing::{debug, info};

/// Inputs shorter than this never fuzzy match
pub const MIN_FUZZY_KEY_LEN: usize = 4;

/// Both sides must be longer than this for the containment pass
pub const MIN_CONTAINMENT_LEN: usize = 15;

/// Normalized key to record mapping with a deterministic scan order
#[derive(Debug, Clone, Default)]
pub struct JournalIndex {
    records: HashMap<String, JournalRecord>,
    scan_order: Vec<String>,
}

impl JournalIndex {
    /// Build the index from a dataset
    pub fn build(dataset: &Dataset) -> Self {
        let mut records: HashMap<String, JournalRecord> = HashMap::with_capacity(dataset.len());
        let mut collisions = 0usize;

        for (name, metrics) in dataset.entries() {
            let key = normalize(name);
            if key.is_empty() {
                debug!(journal = %name, "Dataset name normalizes to an empty key");
                continue;
            }
            if records.contains_key(&key) {
                debug!(journal = %name, key = %key, "Key already taken by an earlier entry");
                collisions += 1;
                continue;
            }
            records.insert(key, JournalRecord::new(name.clone(), metrics.clone()));
        }

        let mut scan_order: Vec<String> = records.keys().cloned().collect();
        scan_order.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

        info!(
            entries = dataset.len(),
            keys = records.len(),
            collisions = collisions,
            "Built journal index"
        );

        Self {
            records,
            scan_order,
        }
    }

    /// Look up an already normalized key
    pub fn exact_lookup(&self, key: &str) -> Option<&JournalRecord> {
        if key.is_empty() {
            return None;
        }
        self.records.get(key)
    }

    /// Approximate lookup for a normalized key cut off by the page.
    ///
    /// First pass: a dataset key that starts with `key`. Second pass, only when both
    /// are longer than [`MIN_CONTAINMENT_LEN`]: either one contains the other. Short
    /// acronyms are excluded to keep false positives down.
    pub fn fuzzy_lookup(&self, key: &str) -> Option<&JournalRecord> {
        if key.len() < MIN_FUZZY_KEY_LEN {
            return None;
        }

        let prefix = self
            .scan_order
            .iter()
            .find(|candidate| candidate.starts_with(key));

        let found = prefix.or_else(|| {
            if key.len() <= MIN_CONTAINMENT_LEN {
                return None;
            }
            self.scan_order.iter().find(|candidate| {
                candidate.len() > MIN_CONTAINMENT_LEN
                    && (candidate.contains(key) || key.contains(candidate.as_str()))
            })
        })?;

        debug!(input = key, matched = %found, "Fuzzy match");
        self.records.get(found)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
