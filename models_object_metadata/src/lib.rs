//! Data shapes shared by the object metadata capture crates

mod event;
mod record;
pub mod timestamp;

pub use event::{ObjectAttributes, ObjectChangeEvent, ObjectLocation};
pub use record::{MetadataRecord, attribute};

/// Value stored for optional attributes the storage backend did not report
pub const UNKNOWN_ATTRIBUTE: &str = "unknown";
