use serde::Deserialize;

use crate::error::{HtaccessError, Result};

/// A saved response from the reference tester service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OracleResponse {
	#[serde(default)]
	pub output_url: Option<String>,

	#[serde(default)]
	pub output_status_code: Option<u16>,

	#[serde(default)]
	pub lines: Vec<OracleLine>,

	#[serde(default)]
	pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OracleLine {
	pub line: String,

	#[serde(default)]
	pub message: Option<String>,

	#[serde(default)]
	pub was_met: bool,

	#[serde(default = "default_true")]
	pub is_valid: bool,

	#[serde(default)]
	pub was_reached: bool,
}

fn default_true() -> bool {
	true
}

/// Parse a response document. Unknown keys are ignored.
pub fn parse_oracle_response(json: &str) -> Result<OracleResponse> {
	serde_json::from_str(json).map_err(|source| HtaccessError::OracleParseError { source })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_full_response() {
		let json = r#"{
			"output_url": "http://example.com/new",
			"output_status_code": 301,
			"lines": [
				{"line": "RewriteEngine On", "was_met": true, "is_valid": true, "was_reached": true},
				{"line": "RewriteRule ^old$ /new [R=301]", "message": "redirect", "was_met": true, "is_valid": true, "was_reached": true}
			],
			"extra": "ignored"
		}"#;

		let response = parse_oracle_response(json).unwrap();
		assert_eq!(response.output_url.as_deref(), Some("http://example.com/new"));
		assert_eq!(response.output_status_code, Some(301));
		assert_eq!(response.lines.len(), 2);
		assert_eq!(response.lines[1].message.as_deref(), Some("redirect"));
		assert!(response.error.is_none());
	}

	#[test]
	fn test_line_defaults() {
		let response = parse_oracle_response(r#"{"lines": [{"line": "x"}]}"#).unwrap();
		let line = &response.lines[0];
		assert!(!line.was_met);
		assert!(line.is_valid);
		assert!(!line.was_reached);
		assert!(response.output_url.is_none());
	}

	#[test]
	fn test_invalid_json() {
		assert!(matches!(
			parse_oracle_response("not json").unwrap_err(),
			HtaccessError::OracleParseError { .. }
		));
	}
}
