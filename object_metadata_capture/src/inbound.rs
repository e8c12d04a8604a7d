//! Adapters that turn the outside world's requests into domain input

pub mod decoder;
#[cfg(any(test, feature = "mock"))]
pub mod fixtures;
