use serde::Deserialize;
use std::collections::BTreeMap;

/// A fixture file: any number of `[[case]]` tables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureFile {
	#[serde(default, rename = "case")]
	pub cases: Vec<TestCase>,
}

/// One saved request with the rules to run and what should come out.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TestCase {
	pub name: String,
	pub url: String,
	pub rules: String,

	#[serde(default)]
	pub server_variables: BTreeMap<String, String>,

	#[serde(default)]
	pub expect: Expectation,
}

/// Expected outcome. Fields left out are not checked.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Expectation {
	pub output_url: Option<String>,
	pub status_code: Option<u16>,

	#[serde(default)]
	pub lines: Vec<LineExpectation>,
}

/// Expected state of one trace entry, selected by `line-number` or by the
/// first raw line that contains `contains`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LineExpectation {
	pub contains: Option<String>,
	pub line_number: Option<usize>,
	pub reached: Option<bool>,
	pub met: Option<bool>,
	pub valid: Option<bool>,
	pub supported: Option<bool>,
	pub message_contains: Option<String>,
}

impl LineExpectation {
	/// Human label used in difference messages.
	pub fn label(&self) -> String {
		match (self.line_number, &self.contains) {
			(Some(number), _) => format!("line {number}"),
			(None, Some(text)) => format!("line containing '{text}'"),
			(None, None) => "unlocated line".to_string(),
		}
	}
}
