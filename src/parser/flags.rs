use crate::parser::directive::{
	CondFlag, CondFlags, DEFAULT_REDIRECT_STATUS, RuleFlag, RuleFlags,
};

fn flag_entries(block: &str) -> impl Iterator<Item = &str> {
	let inner = block
		.strip_prefix('[')
		.and_then(|s| s.strip_suffix(']'))
		.unwrap_or(block);
	inner.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a `[...]` block of condition flags. Unrecognised entries are dropped.
pub fn parse_cond_flags(block: &str) -> CondFlags {
	flag_entries(block)
		.filter_map(|entry| match entry.to_ascii_uppercase().as_str() {
			"NC" | "NOCASE" => Some(CondFlag::NoCase),
			"OR" | "ORNEXT" => Some(CondFlag::OrNext),
			"NV" | "NOVARY" => Some(CondFlag::NoVary),
			_ => None,
		})
		.collect()
}

/// Parse a `[...]` block of rule flags. Unrecognised entries are kept as
/// [`RuleFlag::Unknown`] so they can be reported.
pub fn parse_rule_flags(block: &str) -> RuleFlags {
	flag_entries(block).map(parse_rule_flag).collect()
}

fn parse_rule_flag(entry: &str) -> RuleFlag {
	let upper = entry.to_ascii_uppercase();
	match upper.as_str() {
		"L" | "LAST" => RuleFlag::Last,
		"END" => RuleFlag::End,
		"NC" | "NOCASE" => RuleFlag::NoCase,
		"QSA" | "QSAPPEND" => RuleFlag::QsAppend,
		"NE" | "NOESCAPE" => RuleFlag::NoEscape,
		"N" | "NEXT" => RuleFlag::Next,
		"F" | "FORBIDDEN" => RuleFlag::Forbidden,
		"G" | "GONE" => RuleFlag::Gone,
		"PT" | "PASSTHROUGH" => RuleFlag::PassThrough,
		"R" => RuleFlag::Redirect(DEFAULT_REDIRECT_STATUS),
		_ if upper.starts_with("R=") => {
			let code = entry[2..]
				.trim()
				.parse()
				.unwrap_or(DEFAULT_REDIRECT_STATUS);
			RuleFlag::Redirect(code)
		}
		_ => RuleFlag::Unknown(entry.to_string()),
	}
}
