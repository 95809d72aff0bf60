use serde::Serialize;
use std::fmt::Write;

use crate::engine::{EngineOutput, TraceLine};

/// Counts per trace outcome. Each line lands in exactly one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TraceStats {
	pub total: usize,
	pub met: usize,
	pub not_met: usize,
	pub invalid: usize,
	pub not_reached: usize,
}

/// Bucket lines with precedence invalid, then not reached, then met.
pub fn calculate_stats(lines: &[TraceLine]) -> TraceStats {
	let mut stats = TraceStats {
		total: lines.len(),
		..Default::default()
	};

	for line in lines {
		if !line.is_valid {
			stats.invalid += 1;
		} else if !line.was_reached {
			stats.not_reached += 1;
		} else if line.was_met {
			stats.met += 1;
		} else {
			stats.not_met += 1;
		}
	}

	stats
}

pub fn generate_summary(output: &EngineOutput) -> String {
	let stats = calculate_stats(&output.trace);
	let mut out = String::new();

	let _ = writeln!(out, "=== Htaccess Test Summary ===");
	let _ = writeln!(out);
	let _ = writeln!(
		out,
		"Result URL: {}",
		output.output_url.as_deref().unwrap_or("(unchanged)")
	);
	if let Some(status) = output.status_code {
		let _ = writeln!(out, "HTTP Status: {status}");
	}
	let _ = writeln!(out);
	let _ = writeln!(out, "Rules: {} total", stats.total);
	let _ = writeln!(out, "  - Met: {}", stats.met);
	let _ = writeln!(out, "  - Not Met: {}", stats.not_met);
	let _ = writeln!(out, "  - Invalid: {}", stats.invalid);
	let _ = writeln!(out, "  - Not Reached: {}", stats.not_reached);

	if stats.invalid > 0 {
		let _ = writeln!(out);
		let _ = writeln!(out, "Invalid rules:");
		for line in output.trace.iter().filter(|l| !l.is_valid) {
			let _ = writeln!(out, "  ✗ {}", line.raw_line.trim());
			if let Some(message) = &line.message {
				let _ = writeln!(out, "    {message}");
			}
		}
	}

	out
}

/// One line per trace entry, followed by its message when there is one.
pub fn render_trace<'a>(lines: impl IntoIterator<Item = &'a TraceLine>) -> String {
	let mut out = String::new();
	for line in lines {
		let marker = if !line.is_valid {
			"✗"
		} else if !line.was_reached {
			"·"
		} else if line.was_met {
			"✓"
		} else {
			"-"
		};
		let unsupported = if line.is_supported { "" } else { " (unsupported)" };
		let _ = writeln!(
			out,
			"{:>4} {marker} {}{unsupported}",
			line.line_number,
			line.raw_line.trim()
		);
		if let Some(message) = &line.message {
			let _ = writeln!(out, "       {message}");
		}
	}
	out
}

/// Pretty JSON for an evaluation result.
pub fn render_json(output: &EngineOutput) -> serde_json::Result<String> {
	serde_json::to_string_pretty(output)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn line(number: usize, valid: bool, reached: bool, met: bool) -> TraceLine {
		TraceLine {
			raw_line: format!("RewriteRule ^{number}$ /x"),
			line_number: number,
			is_valid: valid,
			was_reached: reached,
			was_met: met,
			is_supported: true,
			message: None,
		}
	}

	#[test]
	fn test_stats_precedence() {
		let lines = vec![
			line(1, true, true, true),
			line(2, true, true, false),
			line(3, false, false, true),
			line(4, true, false, true),
		];

		let stats = calculate_stats(&lines);
		assert_eq!(
			stats,
			TraceStats {
				total: 4,
				met: 1,
				not_met: 1,
				invalid: 1,
				not_reached: 1,
			}
		);
	}

	#[test]
	fn test_summary_lists_invalid_lines() {
		let mut bad = line(2, false, true, false);
		bad.message = Some("Invalid regex: oops".to_string());
		let output = EngineOutput {
			output_url: Some("http://example.com/new".to_string()),
			status_code: Some(301),
			trace: vec![line(1, true, true, true), bad],
		};

		let summary = generate_summary(&output);
		assert!(summary.contains("Result URL: http://example.com/new"));
		assert!(summary.contains("HTTP Status: 301"));
		assert!(summary.contains("Rules: 2 total"));
		assert!(summary.contains("Invalid rules:"));
		assert!(summary.contains("Invalid regex: oops"));
	}

	#[test]
	fn test_summary_without_url() {
		let output = EngineOutput {
			output_url: None,
			status_code: None,
			trace: Vec::new(),
		};
		let summary = generate_summary(&output);
		assert!(summary.contains("Result URL: (unchanged)"));
		assert!(!summary.contains("HTTP Status"));
	}

	#[test]
	fn test_render_json_uses_snake_case() {
		let output = EngineOutput {
			output_url: Some("http://example.com/".to_string()),
			status_code: None,
			trace: vec![line(1, true, true, true)],
		};
		let json = render_json(&output).unwrap();
		assert!(json.contains("\"output_url\""));
		assert!(json.contains("\"was_reached\": true"));
	}
}
