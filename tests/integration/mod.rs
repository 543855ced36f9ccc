//! Integration tests for the gateway console
//!
//! `http_client_tests` and `gateway_tests` run against wiremock servers;
//! the rest use the in-memory backend.

mod console_tests;
mod gateway_tests;
mod http_client_tests;
