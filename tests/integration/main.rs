//! Integration tests for the ingestion pipelines
//!
//! These tests use wiremock to stand in for the upstream APIs and tempfile
//! directories for the archive, and run each crawler end-to-end.

mod common;
mod esports_tests;
mod fetch_tests;
mod livestats_tests;
