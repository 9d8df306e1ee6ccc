//! `mailscrub` normalizes EML, MSG and PST email archives into
//! privacy-scrubbed records.
//!
//! Each source file is decoded by a format adapter into canonical
//! [`model::record::EmailRecord`]s. A project's records then have every
//! address replaced by a deterministic SHA-256 token and every dictionary
//! name removed from their subject and body before export.

pub mod anonymize;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod project;
