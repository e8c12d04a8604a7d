#![deny(missing_docs)]
//! Captures the metadata of newly created objects and records it in a key-value store.
//! The crate follows the hexagonal architecture pattern: the [domain] knows nothing
//! about S3, DynamoDB or Lambda, those live behind the ports in [inbound] and [outbound].

pub mod domain;
#[cfg(feature = "inbound")]
pub mod inbound;
pub mod outbound;
