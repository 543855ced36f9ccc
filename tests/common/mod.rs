//! Common test utilities and helpers
//!
//! - JSON fixtures shaped like admin API responses
//! - A wiremock-backed admin API for HTTP client tests
//! - A console wired to the in-memory backend

pub mod fixtures;
pub mod mocks;
pub mod test_console;

pub use fixtures::*;
pub use mocks::*;
pub use test_console::*;
