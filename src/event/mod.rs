//! Event model for the relay
//!
//! - Opaque security event with an integer id
//! - Search filter sent with every query
//! - Redaction list applied before delivery

mod event_types;
pub mod redaction;

pub use event_types::{SearchFilter, SecurityEvent};
pub use redaction::{RedactionList, DEFAULT_REDACTED_FIELDS};
