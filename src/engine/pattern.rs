use fancy_regex::Regex;
use std::collections::HashMap;

/// Compiled user patterns for one evaluation, keyed by pattern text and case
/// sensitivity. `N` restarts revisit the same rules, so each pattern is
/// compiled at most once per call.
#[derive(Debug, Default)]
pub struct PatternCache {
	compiled: HashMap<(String, bool), Result<Regex, String>>,
}

impl PatternCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Compile `pattern`, returning the error text on failure.
	pub fn get(&mut self, pattern: &str, no_case: bool) -> Result<&Regex, String> {
		self.compiled
			.entry((pattern.to_string(), no_case))
			.or_insert_with(|| compile(pattern, no_case))
			.as_ref()
			.map_err(Clone::clone)
	}
}

fn compile(pattern: &str, no_case: bool) -> Result<Regex, String> {
	let source = if no_case {
		format!("(?i){pattern}")
	} else {
		pattern.to_string()
	};
	Regex::new(&source).map_err(|e| e.to_string())
}

/// Search `text` for `re`. Returns the full match and every group (unmatched
/// groups as empty strings), `None` when there is no match.
pub fn find_groups(re: &Regex, text: &str) -> Result<Option<Vec<String>>, String> {
	let captures = re.captures(text).map_err(|e| e.to_string())?;
	Ok(captures.map(|caps| {
		(0..caps.len())
			.map(|i| {
				caps.get(i)
					.map(|m| m.as_str().to_string())
					.unwrap_or_default()
			})
			.collect()
	}))
}
