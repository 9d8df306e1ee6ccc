//! Deterministic, unsalted address pseudonymization.

use sha2::{Digest, Sha256};

use crate::model::hash_table::AddressHashTable;
use crate::model::record::EmailRecord;

/// Hex SHA-256 of the lowercased address.
pub fn address_hash(address: &str) -> String {
    format!("{:x}", Sha256::digest(address.to_lowercase().as_bytes()))
}

/// Replace every address in `records` with its hash token.
///
/// Returns the audit table of every raw address seen, one entry per
/// distinct lowercased address, alongside the rewritten records.
pub fn pseudonymize(mut records: Vec<EmailRecord>) -> (AddressHashTable, Vec<EmailRecord>) {
    let mut table = AddressHashTable::new();
    for record in &mut records {
        hash_all(&mut record.to, &mut table);
        hash_all(&mut record.recipients, &mut table);
        hash_all(&mut record.emails_in_body, &mut table);
        if let Some(from) = record.from.as_mut() {
            *from = token_for(from, &mut table);
        }
    }
    (table, records)
}

fn hash_all(addresses: &mut [String], table: &mut AddressHashTable) {
    for address in addresses {
        *address = token_for(address, table);
    }
}

fn token_for(address: &str, table: &mut AddressHashTable) -> String {
    let key = address.to_lowercase();
    if let Some(hash) = table.get(&key) {
        return hash.to_string();
    }
    let hash = address_hash(&key);
    table.insert(key, hash.clone());
    hash
}
