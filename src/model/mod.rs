//! Core data model types: canonical email records, attachment metadata,
//! and the per-project address-to-hash audit table.

pub mod attachment;
pub mod hash_table;
pub mod record;
