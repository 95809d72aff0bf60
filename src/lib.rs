//! htaccess-tester - evaluate Apache `.htaccess` rewrite rules offline.
//!
//! This library provides the core functionality, including:
//! - Parsing `RewriteEngine`, `RewriteCond` and `RewriteRule` lines
//! - Evaluating them against a synthetic request with a per-line trace
//! - Layered settings files, saved fixtures and reference comparisons
//!
//! # Example
//!
//! ```
//! use htaccess_tester::engine::{Engine, EngineInput, HtaccessEngine};
//!
//! let input = EngineInput::new(
//!     "http://example.com/old",
//!     "RewriteEngine On\nRewriteRule ^old$ /new [R=301,L]",
//! );
//! let output = Engine::default().evaluate(&input).unwrap();
//!
//! assert_eq!(output.output_url.as_deref(), Some("http://example.com/new"));
//! assert_eq!(output.status_code, Some(301));
//! ```

pub mod config;
pub mod conformance;
pub mod engine;
pub mod error;
pub mod fixture;
pub mod parser;
pub mod report;

pub use error::{HtaccessError, Result};
