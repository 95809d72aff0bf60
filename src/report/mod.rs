//! Presentation of evaluation results.
//!
//! This module handles:
//! - Trace filtering
//! - Outcome statistics and the text summary
//! - JSON rendering

pub mod filter;
pub mod summary;

pub use filter::TraceFilter;
pub use summary::{TraceStats, calculate_stats, generate_summary, render_json, render_trace};
