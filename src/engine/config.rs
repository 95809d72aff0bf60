use crate::error::{HtaccessError, Result};

pub const DEFAULT_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_MAX_OUTPUT_URL_LENGTH: usize = 8192;
pub const DEFAULT_MAX_RULES_COUNT: usize = 1000;

/// Evaluation limits. Every limit must be positive; this is checked when the
/// value is built, so an `EngineConfig` in hand is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
	max_iterations: usize,
	max_output_url_length: usize,
	max_rules_count: usize,
}

impl EngineConfig {
	pub fn new(
		max_iterations: usize,
		max_output_url_length: usize,
		max_rules_count: usize,
	) -> Result<Self> {
		let checks = [
			("max_iterations", max_iterations),
			("max_output_url_length", max_output_url_length),
			("max_rules_count", max_rules_count),
		];
		if let Some((field, _)) = checks.into_iter().find(|(_, value)| *value == 0) {
			return Err(HtaccessError::InvalidConfig { field });
		}

		Ok(Self {
			max_iterations,
			max_output_url_length,
			max_rules_count,
		})
	}

	/// Upper bound on `N`-flag restarts in one evaluation.
	pub fn max_iterations(&self) -> usize {
		self.max_iterations
	}

	pub fn max_output_url_length(&self) -> usize {
		self.max_output_url_length
	}

	/// Upper bound on parsed lines (blank lines included).
	pub fn max_rules_count(&self) -> usize {
		self.max_rules_count
	}
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			max_iterations: DEFAULT_MAX_ITERATIONS,
			max_output_url_length: DEFAULT_MAX_OUTPUT_URL_LENGTH,
			max_rules_count: DEFAULT_MAX_RULES_COUNT,
		}
	}
}
