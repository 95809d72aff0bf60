use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::parser::Directive;

/// A synthetic request to evaluate rules against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineInput {
	/// Absolute request URL, e.g. `http://example.com/page?x=1`.
	pub url: String,

	/// Raw `.htaccess` text.
	pub htaccess_content: String,

	/// Server variables that take precedence over the synthesized ones.
	#[serde(default)]
	pub server_variables: BTreeMap<String, String>,
}

impl EngineInput {
	pub fn new(url: impl Into<String>, htaccess_content: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			htaccess_content: htaccess_content.into(),
			server_variables: BTreeMap::new(),
		}
	}

	/// Add a server variable, builder style.
	pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.server_variables.insert(name.into(), value.into());
		self
	}
}

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOutput {
	/// Final URL. `None` only when no URL could be rebuilt from the input.
	pub output_url: Option<String>,

	/// Set by `R`, `F`, `G` or an external redirect.
	pub status_code: Option<u16>,

	/// Per-directive diagnostics, in the order they were produced.
	pub trace: Vec<TraceLine>,
}

/// How one directive was interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLine {
	pub raw_line: String,
	pub line_number: usize,
	pub is_valid: bool,
	pub was_reached: bool,
	pub was_met: bool,
	pub is_supported: bool,
	pub message: Option<String>,
}

impl TraceLine {
	/// A valid, supported entry for `directive`.
	pub fn new(directive: &Directive, was_reached: bool, was_met: bool) -> Self {
		Self {
			raw_line: directive.raw_line().to_string(),
			line_number: directive.line_number(),
			is_valid: true,
			was_reached,
			was_met,
			is_supported: true,
			message: None,
		}
	}

	/// Entry for a directive the evaluator never got to.
	pub fn not_reached(directive: &Directive) -> Self {
		Self::new(directive, false, false)
	}

	pub fn invalid(mut self) -> Self {
		self.is_valid = false;
		self
	}

	pub fn unsupported(mut self) -> Self {
		self.is_supported = false;
		self
	}

	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());
		self
	}

	/// Set the message only if none is present yet.
	pub fn or_message(mut self, message: impl Into<String>) -> Self {
		if self.message.is_none() {
			self.message = Some(message.into());
		}
		self
	}
}
