//! Integration tests for netverify.
//!
//! These tests drive full runs against mock providers and the in-memory
//! device model.

pub mod cli_tests;
pub mod full_run_tests;
pub mod output_tests;
