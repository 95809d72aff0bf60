use crate::conformance::oracle::{OracleLine, OracleResponse};
use crate::engine::{EngineOutput, TraceLine};

const SNIPPET_LEN: usize = 50;

/// Whether a local result agrees with the reference response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformanceResult {
	pub passed: bool,
	pub differences: Vec<String>,
}

/// Compare a local evaluation with a reference response.
///
/// Blank lines are dropped on both sides and the rest compared by position.
pub fn compare(output: &EngineOutput, oracle: &OracleResponse) -> ConformanceResult {
	let mut differences = Vec::new();

	if let Some(error) = &oracle.error {
		differences.push(format!("Oracle reported an error: {error}"));
	}

	if output.output_url != oracle.output_url {
		differences.push(format!(
			"Output URL mismatch: local={} vs oracle={}",
			describe(output.output_url.as_deref()),
			describe(oracle.output_url.as_deref())
		));
	}

	if output.status_code != oracle.output_status_code {
		differences.push(format!(
			"Status code mismatch: local={} vs oracle={}",
			describe(output.status_code.map(|s| s.to_string()).as_deref()),
			describe(oracle.output_status_code.map(|s| s.to_string()).as_deref())
		));
	}

	compare_lines(&output.trace, &oracle.lines, &mut differences);

	ConformanceResult {
		passed: differences.is_empty(),
		differences,
	}
}

fn compare_lines(local: &[TraceLine], oracle: &[OracleLine], differences: &mut Vec<String>) {
	let local: Vec<_> = local
		.iter()
		.filter(|l| !l.raw_line.trim().is_empty())
		.collect();
	let oracle: Vec<_> = oracle
		.iter()
		.filter(|l| !l.line.trim().is_empty())
		.collect();

	if local.len() != oracle.len() {
		differences.push(format!(
			"Line count mismatch: local={} vs oracle={}",
			local.len(),
			oracle.len()
		));
	}

	for (i, (ours, theirs)) in local.iter().zip(&oracle).enumerate() {
		let snippet: String = ours.raw_line.chars().take(SNIPPET_LEN).collect();
		let fields = [
			("reached", ours.was_reached, theirs.was_reached),
			("met", ours.was_met, theirs.was_met),
			("valid", ours.is_valid, theirs.is_valid),
		];
		for (name, mine, reference) in fields {
			if mine != reference {
				differences.push(format!(
					"Line {} {name} mismatch: local={mine} vs oracle={reference} for '{snippet}'",
					i + 1
				));
			}
		}
	}
}

fn describe(value: Option<&str>) -> String {
	match value {
		Some(v) => format!("'{v}'"),
		None => "none".to_string(),
	}
}
