//! Rewrite evaluation.
//!
//! This module handles:
//! - The request state and `%{VAR}` / backreference expansion
//! - `RewriteCond` operators and the condition chain
//! - The rule loop with `L`, `END`, `N`, `R`, `F` and `G` control flow
//! - The [`Engine`] entry point that enforces the configured limits

pub mod conditions;
pub mod config;
pub mod evaluator;
pub mod model;
pub mod pattern;
pub mod request;
pub mod variables;

pub use config::{
	DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_OUTPUT_URL_LENGTH, DEFAULT_MAX_RULES_COUNT, EngineConfig,
};
pub use evaluator::Evaluator;
pub use model::{EngineInput, EngineOutput, TraceLine};

use tracing::debug;

use crate::error::{HtaccessError, Result};
use crate::parser;

/// Anything that can evaluate an `.htaccess` file against a request.
pub trait HtaccessEngine {
	fn evaluate(&self, input: &EngineInput) -> Result<EngineOutput>;
}

/// The built-in evaluator. Holds only its limits, so one instance can serve
/// any number of concurrent calls.
#[derive(Debug, Clone, Default)]
pub struct Engine {
	config: EngineConfig,
}

impl Engine {
	pub fn new(config: EngineConfig) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}
}

impl HtaccessEngine for Engine {
	fn evaluate(&self, input: &EngineInput) -> Result<EngineOutput> {
		let directives = parser::parse(&input.htaccess_content);
		if directives.len() > self.config.max_rules_count() {
			return Err(HtaccessError::RuleCountExceeded {
				count: directives.len(),
				max: self.config.max_rules_count(),
			});
		}

		debug!(
			url = %input.url,
			lines = directives.len(),
			variables = input.server_variables.len(),
			"evaluating rules"
		);

		let output = Evaluator::new(
			&input.url,
			&input.server_variables,
			self.config.max_iterations(),
		)
		.evaluate(&directives);

		if let Some(url) = &output.output_url
			&& url.len() > self.config.max_output_url_length()
		{
			return Err(HtaccessError::OutputUrlTooLong {
				length: url.len(),
				max: self.config.max_output_url_length(),
			});
		}

		Ok(output)
	}
}
