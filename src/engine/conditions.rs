use crate::engine::pattern::{PatternCache, find_groups};

/// Filesystem and proxy tests that need a real server.
const FILE_TESTS: &[&str] = &["-f", "-d", "-s", "-l", "-F", "-U", "-x", "-h"];

/// Outcome of testing one `RewriteCond` pattern against its expanded test
/// string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondOutcome {
	pub met: bool,
	pub valid: bool,
	pub supported: bool,
	pub message: Option<String>,

	/// `%0..%n` groups, present only for a positive regex match.
	pub captures: Option<Vec<String>>,
}

impl CondOutcome {
	fn boolean(met: bool) -> Self {
		Self {
			met,
			valid: true,
			supported: true,
			message: None,
			captures: None,
		}
	}

	fn invalid_regex(error: String) -> Self {
		Self {
			met: false,
			valid: false,
			supported: true,
			message: Some(format!("Invalid regex: {error}")),
			captures: None,
		}
	}
}

/// Evaluate a condition pattern. The operator is chosen from the pattern
/// prefix: `!=`, `=`, negated file tests, `!regex`, file tests, integer
/// comparisons, and finally a plain regex search.
pub fn evaluate_condition(
	test_value: &str,
	pattern: &str,
	no_case: bool,
	patterns: &mut PatternCache,
) -> CondOutcome {
	if let Some(expected) = pattern.strip_prefix("!=") {
		return CondOutcome::boolean(!strings_equal(test_value, expected, no_case));
	}
	if let Some(expected) = pattern.strip_prefix('=') {
		return CondOutcome::boolean(strings_equal(test_value, expected, no_case));
	}
	if let Some(negated) = pattern.strip_prefix('!') {
		if FILE_TESTS.contains(&negated) {
			return file_test(negated, true);
		}
		return match patterns.get(negated, no_case) {
			Ok(re) => match find_groups(re, test_value) {
				Ok(found) => CondOutcome::boolean(found.is_none()),
				Err(e) => CondOutcome::invalid_regex(e),
			},
			Err(e) => CondOutcome::invalid_regex(e),
		};
	}
	if FILE_TESTS.contains(&pattern) {
		return file_test(pattern, false);
	}
	if let Some(met) = compare_integers(test_value, pattern) {
		return CondOutcome::boolean(met);
	}

	match patterns.get(pattern, no_case) {
		Ok(re) => match find_groups(re, test_value) {
			Ok(Some(groups)) => CondOutcome {
				captures: Some(groups),
				..CondOutcome::boolean(true)
			},
			Ok(None) => CondOutcome::boolean(false),
			Err(e) => CondOutcome::invalid_regex(e),
		},
		Err(e) => CondOutcome::invalid_regex(e),
	}
}

fn strings_equal(a: &str, b: &str, no_case: bool) -> bool {
	if no_case {
		a.to_lowercase() == b.to_lowercase()
	} else {
		a == b
	}
}

/// No filesystem is available, so every path is treated as nonexistent.
fn file_test(test: &str, negated: bool) -> CondOutcome {
	CondOutcome {
		met: negated,
		valid: true,
		supported: false,
		message: Some(format!(
			"File test {test} is not supported; treated as nonexistent"
		)),
		captures: None,
	}
}

/// Integer comparison operators. Returns `None` if the pattern is not a
/// comparison, `Some(false)` if either side is not an integer.
fn compare_integers(test_value: &str, pattern: &str) -> Option<bool> {
	let (op, operand) = split_comparison(pattern)?;
	let (Ok(left), Ok(right)) = (
		test_value.trim().parse::<i64>(),
		operand.trim().parse::<i64>(),
	) else {
		return Some(false);
	};

	Some(match op {
		"<" | "-lt" => left < right,
		"<=" | "-le" => left <= right,
		">" | "-gt" => left > right,
		">=" | "-ge" => left >= right,
		"-eq" => left == right,
		"-ne" => left != right,
		_ => false,
	})
}

fn split_comparison(pattern: &str) -> Option<(&str, &str)> {
	for op in ["<=", ">=", "<", ">"] {
		if let Some(rest) = pattern.strip_prefix(op) {
			return Some((op, rest));
		}
	}
	for op in ["-lt", "-le", "-gt", "-ge", "-eq", "-ne"] {
		if let Some(rest) = pattern.strip_prefix(op)
			&& (rest.is_empty() || rest.starts_with(char::is_whitespace))
		{
			return Some((op, rest));
		}
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;

	fn eval(test_value: &str, pattern: &str) -> CondOutcome {
		evaluate_condition(test_value, pattern, false, &mut PatternCache::new())
	}

	#[test]
	fn test_equality() {
		assert!(eval("off", "=off").met);
		assert!(!eval("on", "=off").met);
		assert!(eval("on", "!=off").met);
		assert!(!eval("off", "!=off").met);
		assert!(eval("", "=").met);
	}

	#[test]
	fn test_equality_no_case() {
		let mut cache = PatternCache::new();
		assert!(evaluate_condition("OFF", "=off", true, &mut cache).met);
		assert!(!evaluate_condition("OFF", "=off", false, &mut cache).met);
	}

	#[test]
	fn test_regex_sets_captures() {
		let outcome = eval("sub.example.com", r"^(.+)\.example\.com$");
		assert!(outcome.met);
		assert_eq!(
			outcome.captures,
			Some(vec!["sub.example.com".to_string(), "sub".to_string()])
		);
	}

	#[test]
	fn test_negated_regex() {
		let outcome = eval("example.com", "!^www\\.");
		assert!(outcome.met);
		assert!(outcome.captures.is_none());
		assert!(!eval("www.example.com", "!^www\\.").met);
	}

	#[test]
	fn test_file_tests_unsupported() {
		let outcome = eval("/index.php", "-f");
		assert!(!outcome.met);
		assert!(!outcome.supported);
		assert!(outcome.message.unwrap().contains("not supported"));

		let outcome = eval("/index.php", "!-d");
		assert!(outcome.met);
		assert!(!outcome.supported);
	}

	#[test]
	fn test_integer_comparisons() {
		assert!(eval("5", "<10").met);
		assert!(!eval("15", "<10").met);
		assert!(eval("10", "<=10").met);
		assert!(eval("11", ">10").met);
		assert!(eval("10", ">=10").met);
		assert!(eval("7", "-eq 7").met);
		assert!(eval("7", "-ne 8").met);
		assert!(eval("3", "-lt 4").met);
		assert!(!eval("abc", "<10").met);
		assert!(!eval("5", "<ten").met);
	}

	#[test]
	fn test_invalid_regex() {
		let outcome = eval("x", "([bad");
		assert!(!outcome.met);
		assert!(!outcome.valid);
		assert!(outcome.message.unwrap().starts_with("Invalid regex"));
	}
}
