use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::engine::request::RequestState;

/// `%{NAME}` or a single-digit `$N` / `%N` reference, matched in one pass so
/// expanded values are never scanned again.
static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"%\{([^}]+)\}|([$%])([0-9])").expect("reference pattern is valid")
});

/// Resolves `%{NAME}` references against the caller's server variables and
/// the current request.
#[derive(Debug)]
pub struct VariableResolver<'a> {
	server_variables: &'a BTreeMap<String, String>,
	request: &'a RequestState,
}

/// Result of expanding a string.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Expansion {
	pub value: String,

	/// References this engine cannot resolve (`ENV:`, `SSL:`, ...), as written.
	pub unsupported: Vec<String>,
}

impl Expansion {
	pub fn unsupported_message(&self) -> Option<String> {
		if self.unsupported.is_empty() {
			None
		} else {
			Some(format!(
				"Unsupported variable: {}",
				self.unsupported.join(", ")
			))
		}
	}
}

impl<'a> VariableResolver<'a> {
	pub fn new(server_variables: &'a BTreeMap<String, String>, request: &'a RequestState) -> Self {
		Self {
			server_variables,
			request,
		}
	}

	/// Resolve a single variable name. `None` means the lookup kind is not
	/// supported; unknown plain names resolve to an empty string.
	pub fn resolve(&self, name: &str) -> Option<String> {
		if let Some(value) = self.server_variables.get(name) {
			return Some(value.clone());
		}

		if let Some((prefix, key)) = name.split_once(':') {
			return match prefix.to_ascii_uppercase().as_str() {
				"HTTP" => {
					let header = format!("HTTP_{}", key.to_ascii_uppercase().replace('-', "_"));
					Some(self.server_variables.get(&header).cloned().unwrap_or_default())
				}
				_ => None,
			};
		}

		let request = self.request;
		let value = match name {
			"REQUEST_URI" => request.request_uri(),
			"QUERY_STRING" => request.query.clone(),
			"HTTP_HOST" | "SERVER_NAME" => request.host.clone().unwrap_or_default(),
			"HTTPS" => (if request.is_https() { "on" } else { "off" }).to_string(),
			"SERVER_PORT" => request.effective_port().to_string(),
			"REQUEST_FILENAME" => request.path.clone(),
			"THE_REQUEST" => format!("GET {} HTTP/1.1", request.path),
			"REQUEST_METHOD" => "GET".to_string(),
			"REQUEST_SCHEME" => request.scheme.clone(),
			"SERVER_PROTOCOL" => "HTTP/1.1".to_string(),
			_ => String::new(),
		};
		Some(value)
	}

	/// Replace every `%{NAME}` in `input`, along with `$N` from `rule_refs`
	/// and `%N` from `cond_refs`. A backreference with no capture behind it
	/// is left as written, so `%20` survives when there are no condition
	/// captures.
	pub fn expand(&self, input: &str, rule_refs: &[String], cond_refs: &[String]) -> Expansion {
		let mut unsupported = Vec::new();
		let value = REFERENCE_RE
			.replace_all(input, |caps: &Captures| {
				if let Some(name) = caps.get(1) {
					return match self.resolve(name.as_str()) {
						Some(value) => value,
						None => {
							unsupported.push(caps[0].to_string());
							String::new()
						}
					};
				}
				let index: usize = caps[3].parse().unwrap_or_default();
				let refs = if &caps[2] == "$" { rule_refs } else { cond_refs };
				refs.get(index)
					.cloned()
					.unwrap_or_else(|| caps[0].to_string())
			})
			.into_owned();

		Expansion { value, unsupported }
	}
}
