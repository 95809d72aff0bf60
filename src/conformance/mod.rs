//! Comparison against a reference tester's saved responses.
//!
//! This module handles:
//! - Parsing the reference response JSON
//! - Listing every difference from a local evaluation

pub mod comparator;
pub mod oracle;

pub use comparator::{ConformanceResult, compare};
pub use oracle::{OracleLine, OracleResponse, parse_oracle_response};
