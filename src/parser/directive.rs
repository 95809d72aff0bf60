use std::fmt;

/// One parsed line of an `.htaccess` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
	/// `RewriteEngine On|Off`.
	RewriteEngine { line: SourceLine, enabled: bool },

	/// `RewriteCond TestString CondPattern [flags]`.
	RewriteCond {
		line: SourceLine,
		test_string: String,
		pattern: String,
		flags: CondFlags,
	},

	/// `RewriteRule Pattern Substitution [flags]`.
	RewriteRule {
		line: SourceLine,
		pattern: String,
		substitution: String,
		flags: RuleFlags,
	},

	Comment { line: SourceLine },

	BlankLine { line: SourceLine },

	/// A line that could not be parsed, or a directive this engine does not know.
	Unknown {
		line: SourceLine,
		error: Option<String>,
	},
}

/// Position and original text of a directive, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
	/// 1-based line number.
	pub number: usize,

	/// The line exactly as it appeared in the input.
	pub raw: String,
}

impl SourceLine {
	pub fn new(number: usize, raw: impl Into<String>) -> Self {
		Self {
			number,
			raw: raw.into(),
		}
	}
}

impl Directive {
	/// Source position shared by every variant.
	pub fn source(&self) -> &SourceLine {
		match self {
			Directive::RewriteEngine { line, .. }
			| Directive::RewriteCond { line, .. }
			| Directive::RewriteRule { line, .. }
			| Directive::Comment { line }
			| Directive::BlankLine { line }
			| Directive::Unknown { line, .. } => line,
		}
	}

	pub fn line_number(&self) -> usize {
		self.source().number
	}

	pub fn raw_line(&self) -> &str {
		&self.source().raw
	}

	pub fn is_blank(&self) -> bool {
		matches!(self, Directive::BlankLine { .. })
	}
}

/// Flags accepted in a `RewriteCond` flag block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CondFlag {
	/// Case-insensitive match (`NC`, `NOCASE`).
	NoCase,
	/// OR-join with the next condition (`OR`, `ORNEXT`).
	OrNext,
	/// Do not add the header to `Vary` (`NV`, `NOVARY`). Accepted, no effect here.
	NoVary,
}

/// Set of condition flags; duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CondFlags(Vec<CondFlag>);

impl CondFlags {
	pub fn insert(&mut self, flag: CondFlag) {
		if !self.0.contains(&flag) {
			self.0.push(flag);
		}
	}

	pub fn contains(&self, flag: CondFlag) -> bool {
		self.0.contains(&flag)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &CondFlag> {
		self.0.iter()
	}
}

impl FromIterator<CondFlag> for CondFlags {
	fn from_iter<I: IntoIterator<Item = CondFlag>>(iter: I) -> Self {
		let mut flags = CondFlags::default();
		for flag in iter {
			flags.insert(flag);
		}
		flags
	}
}

/// Flags accepted in a `RewriteRule` flag block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleFlag {
	Last,
	End,
	NoCase,
	QsAppend,
	NoEscape,
	Next,
	Forbidden,
	Gone,
	PassThrough,
	Redirect(u16),
	Unknown(String),
}

/// Status used by a bare `R` flag.
pub const DEFAULT_REDIRECT_STATUS: u16 = 302;

impl RuleFlag {
	/// Two flags of the same kind replace each other in a [`RuleFlags`] set.
	/// Unknown flags are told apart by their raw text.
	fn same_kind(&self, other: &RuleFlag) -> bool {
		match (self, other) {
			(RuleFlag::Unknown(a), RuleFlag::Unknown(b)) => a == b,
			_ => std::mem::discriminant(self) == std::mem::discriminant(other),
		}
	}
}

impl fmt::Display for RuleFlag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RuleFlag::Last => f.write_str("L"),
			RuleFlag::End => f.write_str("END"),
			RuleFlag::NoCase => f.write_str("NC"),
			RuleFlag::QsAppend => f.write_str("QSA"),
			RuleFlag::NoEscape => f.write_str("NE"),
			RuleFlag::Next => f.write_str("N"),
			RuleFlag::Forbidden => f.write_str("F"),
			RuleFlag::Gone => f.write_str("G"),
			RuleFlag::PassThrough => f.write_str("PT"),
			RuleFlag::Redirect(DEFAULT_REDIRECT_STATUS) => f.write_str("R"),
			RuleFlag::Redirect(code) => write!(f, "R={code}"),
			RuleFlag::Unknown(raw) => f.write_str(raw),
		}
	}
}

/// Set of rule flags keyed by flag kind. Inserting a flag of a kind that is
/// already present replaces it, so the last one written wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFlags(Vec<RuleFlag>);

impl RuleFlags {
	pub fn insert(&mut self, flag: RuleFlag) {
		match self.0.iter_mut().find(|existing| existing.same_kind(&flag)) {
			Some(existing) => *existing = flag,
			None => self.0.push(flag),
		}
	}

	pub fn contains(&self, flag: &RuleFlag) -> bool {
		self.0.iter().any(|f| f.same_kind(flag))
	}

	pub fn has_last(&self) -> bool {
		self.contains(&RuleFlag::Last)
	}

	pub fn has_end(&self) -> bool {
		self.contains(&RuleFlag::End)
	}

	pub fn has_next(&self) -> bool {
		self.contains(&RuleFlag::Next)
	}

	pub fn no_case(&self) -> bool {
		self.contains(&RuleFlag::NoCase)
	}

	pub fn qs_append(&self) -> bool {
		self.contains(&RuleFlag::QsAppend)
	}

	pub fn no_escape(&self) -> bool {
		self.contains(&RuleFlag::NoEscape)
	}

	pub fn forbidden(&self) -> bool {
		self.contains(&RuleFlag::Forbidden)
	}

	pub fn gone(&self) -> bool {
		self.contains(&RuleFlag::Gone)
	}

	/// Status code of the `R` flag, if present.
	pub fn redirect(&self) -> Option<u16> {
		self.0.iter().find_map(|f| match f {
			RuleFlag::Redirect(code) => Some(*code),
			_ => None,
		})
	}

	/// Raw text of every flag the parser did not recognise.
	pub fn unknown(&self) -> impl Iterator<Item = &str> {
		self.0.iter().filter_map(|f| match f {
			RuleFlag::Unknown(raw) => Some(raw.as_str()),
			_ => None,
		})
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = &RuleFlag> {
		self.0.iter()
	}
}

impl FromIterator<RuleFlag> for RuleFlags {
	fn from_iter<I: IntoIterator<Item = RuleFlag>>(iter: I) -> Self {
		let mut flags = RuleFlags::default();
		for flag in iter {
			flags.insert(flag);
		}
		flags
	}
}

impl fmt::Display for RuleFlags {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let parts: Vec<String> = self.0.iter().map(|flag| flag.to_string()).collect();
		write!(f, "[{}]", parts.join(","))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_rule_flags_last_of_kind_wins() {
		let flags: RuleFlags = [
			RuleFlag::Redirect(301),
			RuleFlag::Last,
			RuleFlag::Redirect(307),
		]
		.into_iter()
		.collect();

		assert_eq!(flags.len(), 2);
		assert_eq!(flags.redirect(), Some(307));
		assert!(flags.has_last());
	}

	#[test]
	fn test_rule_flags_keep_distinct_unknown_flags() {
		let flags: RuleFlags = [
			RuleFlag::Unknown("CO=a:b".to_string()),
			RuleFlag::Unknown("E=x:y".to_string()),
			RuleFlag::Unknown("CO=a:b".to_string()),
		]
		.into_iter()
		.collect();

		let unknown: Vec<_> = flags.unknown().collect();
		assert_eq!(unknown, vec!["CO=a:b", "E=x:y"]);
	}

	#[test]
	fn test_rule_flags_display() {
		let flags: RuleFlags = [RuleFlag::Redirect(302), RuleFlag::Last, RuleFlag::QsAppend]
			.into_iter()
			.collect();
		assert_eq!(flags.to_string(), "[R,L,QSA]");

		let flags: RuleFlags = [RuleFlag::Redirect(301)].into_iter().collect();
		assert_eq!(flags.to_string(), "[R=301]");
	}

	#[test]
	fn test_cond_flags_collapse_duplicates() {
		let flags: CondFlags = [CondFlag::NoCase, CondFlag::OrNext, CondFlag::NoCase]
			.into_iter()
			.collect();
		assert!(flags.contains(CondFlag::NoCase));
		assert!(flags.contains(CondFlag::OrNext));
		assert!(!flags.contains(CondFlag::NoVary));
		assert_eq!(flags.iter().count(), 2);
	}

	#[test]
	fn test_directive_source_accessors() {
		let directive = Directive::Unknown {
			line: SourceLine::new(7, "Options +FollowSymLinks"),
			error: None,
		};
		assert_eq!(directive.line_number(), 7);
		assert_eq!(directive.raw_line(), "Options +FollowSymLinks");
		assert!(!directive.is_blank());
	}
}
