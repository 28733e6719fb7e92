//! Integration tests for Shiori
//!
//! Orchestration scenarios run against an in-memory page fetcher so timing
//! and page graphs are deterministic; HTTP-level runs use wiremock.

mod acquisition_tests;
mod http_tests;
mod ordering_tests;
mod support;
