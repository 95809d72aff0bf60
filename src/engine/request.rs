use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

/// Characters escaped in a redirect path unless the rule carries `NE`.
/// `/` is kept so the path structure survives.
const PATH_ESCAPE: &AsciiSet = &CONTROLS
	.add(b' ')
	.add(b'"')
	.add(b'#')
	.add(b'%')
	.add(b'<')
	.add(b'>')
	.add(b'?')
	.add(b'[')
	.add(b'\\')
	.add(b']')
	.add(b'^')
	.add(b'`')
	.add(b'{')
	.add(b'|')
	.add(b'}');

/// Mutable view of the request while rules are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestState {
	pub scheme: String,

	/// `None` when the input URL was malformed and no variable named a host.
	pub host: Option<String>,

	/// Explicit, non-default port.
	pub port: Option<u16>,

	/// Always starts with `/`.
	pub path: String,

	/// Without the leading `?`; empty when absent.
	pub query: String,
}

impl RequestState {
	/// Build the initial state from the request URL, falling back to
	/// `SERVER_NAME` / `HTTP_HOST` for the host.
	pub fn from_url(input: &str, server_variables: &BTreeMap<String, String>) -> Self {
		let fallback_host = server_variables
			.get("SERVER_NAME")
			.or_else(|| server_variables.get("HTTP_HOST"))
			.cloned();

		match Url::parse(input) {
			Ok(url) => {
				let host = url
					.host_str()
					.map(str::to_string)
					.or(fallback_host)
					.or_else(|| Some("localhost".to_string()));
				Self {
					scheme: url.scheme().to_string(),
					host,
					port: url.port(),
					path: normalize_path(url.path()),
					query: url.query().unwrap_or_default().to_string(),
				}
			}
			Err(e) => {
				debug!(url = input, error = %e, "input URL is not absolute, using defaults");
				Self {
					scheme: "http".to_string(),
					host: fallback_host,
					port: None,
					path: "/".to_string(),
					query: String::new(),
				}
			}
		}
	}

	pub fn is_https(&self) -> bool {
		self.scheme.eq_ignore_ascii_case("https")
	}

	/// Explicit port, or the scheme default.
	pub fn effective_port(&self) -> u16 {
		self.port
			.unwrap_or(if self.is_https() { 443 } else { 80 })
	}

	/// Path plus `?query` when a query is present.
	pub fn request_uri(&self) -> String {
		join_query(&self.path, &self.query)
	}

	/// Path relative to the document root, as rule patterns see it.
	pub fn match_path(&self) -> &str {
		self.path.strip_prefix('/').unwrap_or(&self.path)
	}

	/// Reassemble `scheme://host[:port]path[?query]`.
	pub fn to_url(&self) -> Option<String> {
		let host = self.host.as_deref()?;
		Some(build_url(
			&self.scheme,
			host,
			self.port,
			&self.request_uri(),
		))
	}

	/// True if `host` names the host this request is for.
	pub fn is_same_host(&self, host: &str) -> bool {
		self.host
			.as_deref()
			.is_some_and(|own| own.eq_ignore_ascii_case(host))
	}
}

/// `scheme://host[:port]` followed by `path_and_query`. Ports 80 and 443 are
/// left out.
pub fn build_url(scheme: &str, host: &str, port: Option<u16>, path_and_query: &str) -> String {
	match port {
		Some(p) if p != 80 && p != 443 => format!("{scheme}://{host}:{p}{path_and_query}"),
		_ => format!("{scheme}://{host}{path_and_query}"),
	}
}

pub fn join_query(path: &str, query: &str) -> String {
	if query.is_empty() {
		path.to_string()
	} else {
		format!("{path}?{query}")
	}
}

/// Ensure a single leading `/`; empty becomes `/`.
pub fn normalize_path(path: &str) -> String {
	if path.starts_with('/') {
		path.to_string()
	} else {
		format!("/{path}")
	}
}

/// Split `path?query` at the first `?`.
pub fn split_query(target: &str) -> (&str, Option<&str>) {
	match target.split_once('?') {
		Some((path, query)) => (path, Some(query)),
		None => (target, None),
	}
}

/// Escape a path for use in a redirect. Existing escapes are decoded first so
/// they are not encoded twice.
pub fn escape_path(path: &str) -> String {
	let decoded = percent_decode_str(path).decode_utf8_lossy();
	utf8_percent_encode(&decoded, PATH_ESCAPE).to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[test]
	fn test_from_url_full() {
		let state = RequestState::from_url("https://example.com:8443/a/b?x=1&y=2", &vars(&[]));
		assert_eq!(state.scheme, "https");
		assert_eq!(state.host.as_deref(), Some("example.com"));
		assert_eq!(state.port, Some(8443));
		assert_eq!(state.path, "/a/b");
		assert_eq!(state.query, "x=1&y=2");
		assert_eq!(state.match_path(), "a/b");
		assert_eq!(
			state.to_url().as_deref(),
			Some("https://example.com:8443/a/b?x=1&y=2")
		);
	}

	#[test]
	fn test_from_url_empty_path_normalized() {
		let state = RequestState::from_url("http://example.com", &vars(&[]));
		assert_eq!(state.path, "/");
		assert_eq!(state.to_url().as_deref(), Some("http://example.com/"));
	}

	#[test]
	fn test_default_port_omitted() {
		let state = RequestState::from_url("http://example.com:80/x", &vars(&[]));
		assert_eq!(state.port, None);
		assert_eq!(state.effective_port(), 80);
		assert_eq!(state.to_url().as_deref(), Some("http://example.com/x"));
	}

	#[test]
	fn test_malformed_url_uses_server_name() {
		let state =
			RequestState::from_url("not a url", &vars(&[("SERVER_NAME", "fallback.test")]));
		assert_eq!(state.path, "/");
		assert_eq!(state.scheme, "http");
		assert_eq!(state.to_url().as_deref(), Some("http://fallback.test/"));
	}

	#[test]
	fn test_malformed_url_without_variables_has_no_url() {
		let state = RequestState::from_url("/relative/path", &vars(&[]));
		assert!(state.host.is_none());
		assert!(state.to_url().is_none());
	}

	#[test]
	fn test_split_query() {
		assert_eq!(split_query("/a?b=c?d"), ("/a", Some("b=c?d")));
		assert_eq!(split_query("/a?"), ("/a", Some("")));
		assert_eq!(split_query("/a"), ("/a", None));
	}

	#[test]
	fn test_escape_path() {
		assert_eq!(escape_path("/a b/c"), "/a%20b/c");
		assert_eq!(escape_path("/already%20encoded"), "/already%20encoded");
		assert_eq!(escape_path("/caf\u{e9}"), "/caf%C3%A9");
	}
}
