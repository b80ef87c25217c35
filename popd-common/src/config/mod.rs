//! Configuration types shared across popd crates.
//!
//! - [`timeouts`]: session timeout configuration

pub mod timeouts;

pub use timeouts::ServerTimeouts;
