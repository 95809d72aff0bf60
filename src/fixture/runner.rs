use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;
use tracing::{debug, warn};

use crate::engine::{EngineInput, EngineOutput, HtaccessEngine, TraceLine};
use crate::error::{HtaccessError, Result};
use crate::fixture::types::{FixtureFile, LineExpectation, TestCase};

/// Outcome of one fixture case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseResult {
	pub name: String,
	pub passed: bool,
	pub differences: Vec<String>,
	pub output_url: Option<String>,
}

/// Load a fixture file from the given path.
pub fn load_fixture_file(path: &Path) -> Result<FixtureFile> {
	let content =
		std::fs::read_to_string(path).map_err(|source| HtaccessError::FixtureReadError {
			path: path.to_path_buf(),
			source,
		})?;

	parse_fixture_str(&content, path)
}

/// Parse fixtures from a string (useful for testing).
pub fn parse_fixture_str(content: &str, path: &Path) -> Result<FixtureFile> {
	toml::from_str(content).map_err(|source| HtaccessError::FixtureParseError {
		path: path.to_path_buf(),
		source,
	})
}

/// Evaluate a case and compare against its expectations.
///
/// `defaults` are server variables from settings; the case's own variables
/// override them.
pub fn run_case(
	engine: &impl HtaccessEngine,
	case: &TestCase,
	defaults: &BTreeMap<String, String>,
) -> CaseResult {
	let mut input = EngineInput::new(&case.url, &case.rules);
	input.server_variables = defaults.clone();
	input.server_variables.extend(
		case.server_variables
			.iter()
			.map(|(k, v)| (k.clone(), v.clone())),
	);

	let output = match engine.evaluate(&input) {
		Ok(output) => output,
		Err(e) => {
			warn!(case = %case.name, error = %e, "engine rejected fixture input");
			return CaseResult {
				name: case.name.clone(),
				passed: false,
				differences: vec![format!("Engine error: {e}")],
				output_url: None,
			};
		}
	};

	let differences = check_expectations(case, &output);
	debug!(case = %case.name, differences = differences.len(), "fixture case evaluated");

	CaseResult {
		name: case.name.clone(),
		passed: differences.is_empty(),
		differences,
		output_url: output.output_url,
	}
}

pub fn run_fixtures(
	engine: &impl HtaccessEngine,
	fixtures: &FixtureFile,
	defaults: &BTreeMap<String, String>,
) -> Vec<CaseResult> {
	fixtures
		.cases
		.iter()
		.map(|case| run_case(engine, case, defaults))
		.collect()
}

fn check_expectations(case: &TestCase, output: &EngineOutput) -> Vec<String> {
	let expect = &case.expect;
	let mut differences = Vec::new();

	if let Some(expected) = &expect.output_url
		&& output.output_url.as_deref() != Some(expected.as_str())
	{
		differences.push(format!(
			"Output URL mismatch: expected '{expected}', got '{}'",
			output.output_url.as_deref().unwrap_or("none")
		));
	}

	if let Some(expected) = expect.status_code
		&& output.status_code != Some(expected)
	{
		differences.push(format!(
			"Status code mismatch: expected {expected}, got {}",
			output
				.status_code
				.map_or_else(|| "none".to_string(), |s| s.to_string())
		));
	}

	for expected in &expect.lines {
		check_line(expected, &output.trace, &mut differences);
	}

	differences
}

fn check_line(expected: &LineExpectation, trace: &[TraceLine], differences: &mut Vec<String>) {
	let label = expected.label();

	let found = match (expected.line_number, &expected.contains) {
		(Some(number), _) => trace.iter().find(|l| l.line_number == number),
		(None, Some(text)) => trace.iter().find(|l| l.raw_line.contains(text.as_str())),
		(None, None) => {
			differences.push("Line expectation needs 'contains' or 'line-number'".to_string());
			return;
		}
	};

	let Some(line) = found else {
		differences.push(format!("No trace entry for {label}"));
		return;
	};

	if let Some(text) = &expected.contains
		&& !line.raw_line.contains(text.as_str())
	{
		differences.push(format!("{label}: expected raw line to contain '{text}'"));
	}

	let checks = [
		("reached", expected.reached, line.was_reached),
		("met", expected.met, line.was_met),
		("valid", expected.valid, line.is_valid),
		("supported", expected.supported, line.is_supported),
	];
	for (name, want, got) in checks {
		if let Some(want) = want
			&& want != got
		{
			differences.push(format!("{label}: expected {name}={want}, got {got}"));
		}
	}

	if let Some(text) = &expected.message_contains {
		match &line.message {
			Some(message) if message.contains(text.as_str()) => {}
			other => differences.push(format!(
				"{label}: expected message containing '{text}', got '{}'",
				other.as_deref().unwrap_or("none")
			)),
		}
	}
}

/// Text report with totals, pass rate and every failure.
pub fn generate_report(results: &[CaseResult]) -> String {
	let passed = results.iter().filter(|r| r.passed).count();
	let failed = results.len() - passed;
	let rule = "=".repeat(60);
	let mut out = String::new();

	let _ = writeln!(out, "{rule}");
	let _ = writeln!(out, "FIXTURE REPORT");
	let _ = writeln!(out, "{rule}");
	let _ = writeln!(out);
	let _ = writeln!(
		out,
		"Total: {} | Passed: {passed} | Failed: {failed}",
		results.len()
	);
	if results.is_empty() {
		let _ = writeln!(out, "Pass rate: N/A");
	} else {
		let rate = passed as f64 * 100.0 / results.len() as f64;
		let _ = writeln!(out, "Pass rate: {rate:.1}%");
	}

	if failed > 0 {
		let _ = writeln!(out);
		let _ = writeln!(out, "{}", "-".repeat(60));
		let _ = writeln!(out, "FAILURES:");
		let _ = writeln!(out, "{}", "-".repeat(60));
		for result in results.iter().filter(|r| !r.passed) {
			let _ = writeln!(out);
			let _ = writeln!(out, "Case: {}", result.name);
			let _ = writeln!(
				out,
				"  Output URL: {}",
				result.output_url.as_deref().unwrap_or("none")
			);
			for difference in &result.differences {
				let _ = writeln!(out, "  - {difference}");
			}
		}
	}

	let _ = writeln!(out);
	let _ = writeln!(out, "{rule}");
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::{Engine, EngineConfig};
	use std::path::PathBuf;

	const FIXTURES: &str = r#"
[[case]]
name = "simple rewrite"
url = "http://example.com/test"
rules = '''
RewriteEngine On
RewriteRule ^test$ /result [L]
'''

[case.expect]
output-url = "http://example.com/result"

[[case.expect.lines]]
line-number = 2
reached = true
met = true

[[case]]
name = "https redirect"
url = "http://example.com/secure"
rules = '''
RewriteEngine On
RewriteCond %{HTTPS} off
RewriteRule ^(.*)$ https://example.com/$1 [R=301,L]
'''

[case.server-variables]
HTTPS = "off"

[case.expect]
output-url = "https://example.com/secure"
status-code = 301

[[case.expect.lines]]
contains = "RewriteCond"
met = true
"#;

	fn fixtures() -> FixtureFile {
		parse_fixture_str(FIXTURES, &PathBuf::from("fixtures.toml")).unwrap()
	}

	#[test]
	fn test_parse_fixture_file() {
		let file = fixtures();
		assert_eq!(file.cases.len(), 2);
		assert_eq!(file.cases[0].name, "simple rewrite");
		assert_eq!(file.cases[1].server_variables.get("HTTPS").unwrap(), "off");
		assert_eq!(file.cases[1].expect.status_code, Some(301));
		assert_eq!(file.cases[0].expect.lines[0].line_number, Some(2));
	}

	#[test]
	fn test_run_fixtures_pass() {
		let results = run_fixtures(&Engine::default(), &fixtures(), &BTreeMap::new());
		assert!(results.iter().all(|r| r.passed), "{results:#?}");

		let report = generate_report(&results);
		assert!(report.contains("Total: 2 | Passed: 2 | Failed: 0"));
		assert!(report.contains("Pass rate: 100.0%"));
	}

	#[test]
	fn test_failing_case_reports_differences() {
		let mut case = fixtures().cases.remove(0);
		case.expect.output_url = Some("http://example.com/elsewhere".to_string());
		case.expect.status_code = Some(302);
		case.expect.lines[0].met = Some(false);

		let result = run_case(&Engine::default(), &case, &BTreeMap::new());
		assert!(!result.passed);
		assert_eq!(result.differences.len(), 3);
		assert!(result.differences[0].starts_with("Output URL mismatch"));
		assert!(result.differences[1].starts_with("Status code mismatch"));
		assert!(result.differences[2].contains("expected met=false"));

		let report = generate_report(&[result]);
		assert!(report.contains("FAILURES:"));
		assert!(report.contains("Case: simple rewrite"));
	}

	#[test]
	fn test_defaults_are_overridden_by_case_variables() {
		let case = fixtures().cases.remove(1);
		let defaults: BTreeMap<String, String> =
			[("HTTPS".to_string(), "on".to_string())].into();
		let result = run_case(&Engine::default(), &case, &defaults);
		assert!(result.passed, "{result:#?}");
	}

	#[test]
	fn test_engine_error_fails_case() {
		let engine = Engine::new(EngineConfig::new(100, 8192, 1).unwrap());
		let case = fixtures().cases.remove(0);
		let result = run_case(&engine, &case, &BTreeMap::new());
		assert!(!result.passed);
		assert!(result.differences[0].starts_with("Engine error"));
	}

	#[test]
	fn test_missing_line_reported() {
		let mut case = fixtures().cases.remove(0);
		case.expect.lines[0].line_number = Some(42);
		let result = run_case(&Engine::default(), &case, &BTreeMap::new());
		assert_eq!(result.differences, vec!["No trace entry for line 42"]);
	}

	#[test]
	fn test_unknown_field_rejected() {
		let result = parse_fixture_str(
			"[[case]]\nname = \"x\"\nurl = \"u\"\nrules = \"\"\nbogus = 1",
			&PathBuf::from("bad.toml"),
		);
		assert!(matches!(
			result.unwrap_err(),
			HtaccessError::FixtureParseError { .. }
		));
	}
}
