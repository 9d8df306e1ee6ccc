//! Privacy passes applied to a whole project's records after parsing:
//! address pseudonymization, then dictionary-based name redaction.

pub mod names;
pub mod pseudonymizer;
pub mod redactor;

pub use names::NameDictionary;
pub use pseudonymizer::{address_hash, pseudonymize};
pub use redactor::NameRedactor;
