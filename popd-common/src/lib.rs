pub mod config;
pub mod controller;
pub mod error;
pub mod listener;
pub mod logging;
pub mod traits;

pub use tracing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
}
