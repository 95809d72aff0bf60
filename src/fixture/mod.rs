//! Saved test cases.
//!
//! This module handles:
//! - TOML fixture files with `[[case]]` tables
//! - Running cases through an engine and checking expectations
//! - The pass/fail report

pub mod runner;
pub mod types;

pub use runner::{
	CaseResult, generate_report, load_fixture_file, parse_fixture_str, run_case, run_fixtures,
};
pub use types::{Expectation, FixtureFile, LineExpectation, TestCase};
