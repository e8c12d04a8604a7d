//! Concrete implementations of the outbound ports.
//! Outbound ports are things in the outside world that we reach out to

#[cfg(feature = "outbound")]
pub mod dynamodb;
#[cfg(feature = "outbound")]
pub mod s3;

#[cfg(any(test, feature = "mock"))]
pub mod memory;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub mod time;
