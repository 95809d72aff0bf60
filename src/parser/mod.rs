//! `.htaccess` parsing.
//!
//! This module handles:
//! - Line classification into [`Directive`] values
//! - Argument tokenizing with quote support
//! - Condition and rule flag blocks
//!
//! Parsing never fails. A line that cannot be understood becomes
//! [`Directive::Unknown`] carrying a reason, and the evaluator reports it.

pub mod directive;
pub mod flags;
pub mod lexer;

pub use directive::{
	CondFlag, CondFlags, DEFAULT_REDIRECT_STATUS, Directive, RuleFlag, RuleFlags, SourceLine,
};
pub use flags::{parse_cond_flags, parse_rule_flags};
pub use lexer::tokenize;

use lexer::is_flag_block;

/// Parse `.htaccess` content into one directive per source line.
pub fn parse(content: &str) -> Vec<Directive> {
	content
		.lines()
		.enumerate()
		.map(|(index, line)| parse_line(index + 1, line))
		.collect()
}

/// Classify a single line.
pub fn parse_line(number: usize, raw: &str) -> Directive {
	let line = SourceLine::new(number, raw);
	let trimmed = raw.trim();

	if trimmed.is_empty() {
		return Directive::BlankLine { line };
	}
	if trimmed.starts_with('#') {
		return Directive::Comment { line };
	}
	if let Some(rest) = strip_keyword(trimmed, "RewriteEngine") {
		return parse_rewrite_engine(line, rest);
	}
	if let Some(rest) = strip_keyword(trimmed, "RewriteCond") {
		return parse_rewrite_cond(line, rest);
	}
	if let Some(rest) = strip_keyword(trimmed, "RewriteRule") {
		return parse_rewrite_rule(line, rest);
	}

	Directive::Unknown { line, error: None }
}

/// Case-insensitive keyword prefix match, returning the remainder.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
	let head = line.get(..keyword.len())?;
	if head.eq_ignore_ascii_case(keyword) {
		Some(&line[keyword.len()..])
	} else {
		None
	}
}

fn unknown(line: SourceLine, error: &str) -> Directive {
	Directive::Unknown {
		line,
		error: Some(error.to_string()),
	}
}

/// The whole argument is compared, so `RewriteEngine On extra` is off.
fn parse_rewrite_engine(line: SourceLine, rest: &str) -> Directive {
	let value = rest.trim();
	if value.is_empty() {
		return unknown(line, "Missing On/Off argument");
	}
	Directive::RewriteEngine {
		line,
		enabled: value.eq_ignore_ascii_case("on"),
	}
}

fn parse_rewrite_cond(line: SourceLine, rest: &str) -> Directive {
	let mut tokens = tokenize(rest);
	if tokens.len() < 2 {
		return unknown(line, "Invalid RewriteCond syntax");
	}

	let flags = if tokens.last().is_some_and(|t| is_flag_block(t)) {
		if tokens.len() == 2 {
			return unknown(line, "Missing pattern");
		}
		tokens.pop().map(|block| parse_cond_flags(&block)).unwrap_or_default()
	} else {
		CondFlags::default()
	};

	let test_string = tokens.remove(0);
	let pattern = tokens.join(" ");

	Directive::RewriteCond {
		line,
		test_string,
		pattern,
		flags,
	}
}

fn parse_rewrite_rule(line: SourceLine, rest: &str) -> Directive {
	let mut tokens = tokenize(rest);
	if tokens.len() < 2 {
		return unknown(line, "Invalid RewriteRule syntax");
	}

	let flags = if tokens.last().is_some_and(|t| is_flag_block(t)) {
		tokens.pop().map(|block| parse_rule_flags(&block)).unwrap_or_default()
	} else {
		RuleFlags::default()
	};

	let pattern = tokens.remove(0);
	let substitution = tokens.join(" ");

	Directive::RewriteRule {
		line,
		pattern,
		substitution,
		flags,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn single(content: &str) -> Directive {
		let mut directives = parse(content);
		assert_eq!(directives.len(), 1);
		directives.remove(0)
	}

	#[test]
	fn test_parse_preserves_line_numbers() {
		let directives = parse("RewriteEngine On\n\n# comment\nRewriteRule ^a$ /b");
		assert_eq!(directives.len(), 4);
		let numbers: Vec<_> = directives.iter().map(Directive::line_number).collect();
		assert_eq!(numbers, vec![1, 2, 3, 4]);
		assert!(directives[1].is_blank());
		assert!(matches!(directives[2], Directive::Comment { .. }));
	}

	#[test]
	fn test_parse_rewrite_engine() {
		assert!(matches!(
			single("RewriteEngine On"),
			Directive::RewriteEngine { enabled: true, .. }
		));
		assert!(matches!(
			single("  rewriteengine ON  "),
			Directive::RewriteEngine { enabled: true, .. }
		));
		assert!(matches!(
			single("RewriteEngine off"),
			Directive::RewriteEngine { enabled: false, .. }
		));
	}

	#[test]
	fn test_parse_rewrite_engine_missing_argument() {
		match single("RewriteEngine") {
			Directive::Unknown { error, .. } => {
				assert_eq!(error.as_deref(), Some("Missing On/Off argument"));
			}
			other => panic!("Expected Unknown, got {other:?}"),
		}
	}

	#[test]
	fn test_parse_rewrite_cond_https_off() {
		match single("RewriteCond %{HTTPS} off") {
			Directive::RewriteCond {
				test_string,
				pattern,
				flags,
				..
			} => {
				assert_eq!(test_string, "%{HTTPS}");
				assert_eq!(pattern, "off");
				assert!(flags.is_empty());
			}
			other => panic!("Expected RewriteCond, got {other:?}"),
		}
	}

	#[test]
	fn test_parse_rewrite_cond_with_flags_and_spaced_pattern() {
		match single("RewriteCond %{HTTP_USER_AGENT} foo bar [NC,OR]") {
			Directive::RewriteCond { pattern, flags, .. } => {
				assert_eq!(pattern, "foo bar");
				assert!(flags.contains(CondFlag::NoCase));
				assert!(flags.contains(CondFlag::OrNext));
			}
			other => panic!("Expected RewriteCond, got {other:?}"),
		}
	}

	#[test]
	fn test_parse_rewrite_cond_too_short() {
		match single("RewriteCond %{HTTPS}") {
			Directive::Unknown { error, .. } => {
				assert_eq!(error.as_deref(), Some("Invalid RewriteCond syntax"));
			}
			other => panic!("Expected Unknown, got {other:?}"),
		}
	}

	#[test]
	fn test_parse_rewrite_rule_with_redirect() {
		match single("RewriteRule ^(.*)$ https://example.com/$1 [R=301,L]") {
			Directive::RewriteRule {
				pattern,
				substitution,
				flags,
				..
			} => {
				assert_eq!(pattern, "^(.*)$");
				assert_eq!(substitution, "https://example.com/$1");
				assert!(flags.has_last());
				assert_eq!(flags.redirect(), Some(301));
			}
			other => panic!("Expected RewriteRule, got {other:?}"),
		}
	}

	#[test]
	fn test_parse_rewrite_rule_trailing_slash() {
		match single("RewriteRule ^(.+[^/])$ $1/ [R=301,L]") {
			Directive::RewriteRule {
				pattern,
				substitution,
				..
			} => {
				assert_eq!(pattern, "^(.+[^/])$");
				assert_eq!(substitution, "$1/");
			}
			other => panic!("Expected RewriteRule, got {other:?}"),
		}
	}

	#[test]
	fn test_parse_rewrite_rule_without_flags() {
		match single("RewriteRule ^old$ /new") {
			Directive::RewriteRule {
				substitution,
				flags,
				..
			} => {
				assert_eq!(substitution, "/new");
				assert!(flags.is_empty());
			}
			other => panic!("Expected RewriteRule, got {other:?}"),
		}
	}

	#[test]
	fn test_parse_rewrite_rule_quoted_substitution() {
		match single(r#"RewriteRule ^a$ "/with space" [L]"#) {
			Directive::RewriteRule { substitution, .. } => {
				assert_eq!(substitution, "/with space");
			}
			other => panic!("Expected RewriteRule, got {other:?}"),
		}
	}

	#[test]
	fn test_parse_rewrite_rule_too_short() {
		assert!(matches!(
			single("RewriteRule ^a$"),
			Directive::Unknown { error: Some(_), .. }
		));
	}

	#[test]
	fn test_parse_rewrite_engine_compares_whole_argument() {
		assert!(matches!(
			single("RewriteEngine On extra"),
			Directive::RewriteEngine { enabled: false, .. }
		));
	}

	#[test]
	fn test_parse_rewrite_cond_flags_without_pattern() {
		match single("RewriteCond %{HTTPS} [NC]") {
			Directive::Unknown { error, .. } => {
				assert_eq!(error.as_deref(), Some("Missing pattern"));
			}
			other => panic!("Expected Unknown, got {other:?}"),
		}
	}

	#[test]
	fn test_parse_rewrite_rule_flags_without_substitution() {
		match single("RewriteRule ^a$ [F]") {
			Directive::RewriteRule {
				pattern,
				substitution,
				flags,
				..
			} => {
				assert_eq!(pattern, "^a$");
				assert_eq!(substitution, "");
				assert!(flags.forbidden());
			}
			other => panic!("Expected RewriteRule, got {other:?}"),
		}
	}

	#[test]
	fn test_parse_unrecognised_directive() {
		match single("Options -Indexes") {
			Directive::Unknown { error, .. } => assert!(error.is_none()),
			other => panic!("Expected Unknown, got {other:?}"),
		}
	}

	#[test]
	fn test_parse_lowercase_keyword_strips_prefix() {
		match single("rewriterule ^a$ /b") {
			Directive::RewriteRule { pattern, .. } => assert_eq!(pattern, "^a$"),
			other => panic!("Expected RewriteRule, got {other:?}"),
		}
	}
}
