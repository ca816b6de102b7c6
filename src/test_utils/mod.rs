//! Test-only helpers shared across crate unit tests.
//!
//! This module is only compiled for unit tests and provides small utilities
//! used by multiple test modules to keep individual test files focused.

pub mod collecting_hook;
pub mod line_server;
pub mod shared_buffer;
