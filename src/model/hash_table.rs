//! Per-project audit table mapping raw addresses to their hash tokens.

use std::collections::BTreeMap;

/// Mapping from lowercased raw address to its hex SHA-256 token.
///
/// One table exists per project. It only grows; inserting an address that
/// is already present is a no-op. Iteration order is sorted by address so
/// the exported CSV is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressHashTable {
    entries: BTreeMap<String, String>,
}

impl AddressHashTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `address -> hash`. Returns `true` if the address was new.
    pub fn insert(&mut self, address: String, hash: String) -> bool {
        match self.entries.entry(address) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(hash);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, address: &str) -> Option<&str> {
        self.entries.get(address).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(address, hash)` pairs in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(a, h)| (a.as_str(), h.as_str()))
    }

    /// Union another table into this one. Returns the number of new entries.
    ///
    /// Hashing is a pure function of the address, so two tables can never
    /// disagree on the token for the same address.
    pub fn merge(&mut self, other: AddressHashTable) -> usize {
        let mut added = 0;
        for (address, hash) in other.entries {
            debug_assert!(
                self.get(&address).is_none_or(|existing| existing == hash),
                "conflicting hash tokens for one address"
            );
            if self.insert(address, hash) {
                added += 1;
            }
        }
        added
    }
}

/// The domain part of an address (everything after the last `@`).
pub fn domain_of(address: &str) -> &str {
    address.rsplit_once('@').map(|(_, d)| d).unwrap_or("")
}
