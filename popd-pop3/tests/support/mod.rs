//! Test support for driving POP3 sessions
//!
//! Sessions run on their own task over an in-memory duplex stream, so tests
//! can speak the protocol line by line without binding sockets.
#![allow(dead_code)]

pub mod client;

pub use client::TestClient;
