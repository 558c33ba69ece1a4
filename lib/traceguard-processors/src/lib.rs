//! Processor implementations.
//!
//! This crate contains the collector extension processors: PII redaction over span and event
//! attributes, and tenant-ID stamping from transport metadata.

#![deny(warnings)]
#![deny(missing_docs)]

pub mod pii;
pub mod tenant;
