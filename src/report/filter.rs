use std::fmt;
use std::str::FromStr;

use crate::engine::TraceLine;

/// Which trace entries to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TraceFilter {
	#[default]
	All,
	FailedOnly,
	ReachedOnly,
	MetOnly,
}

impl TraceFilter {
	pub fn display_name(&self) -> &'static str {
		match self {
			Self::All => "Show All",
			Self::FailedOnly => "Failed Only",
			Self::ReachedOnly => "Reached Only",
			Self::MetOnly => "Met Only",
		}
	}

	pub fn matches(&self, line: &TraceLine) -> bool {
		match self {
			Self::All => true,
			Self::FailedOnly => !line.is_valid || !line.was_met,
			Self::ReachedOnly => line.was_reached,
			Self::MetOnly => line.was_met,
		}
	}

	pub fn filter<'a>(&self, lines: &'a [TraceLine]) -> Vec<&'a TraceLine> {
		lines.iter().filter(|line| self.matches(line)).collect()
	}
}

impl FromStr for TraceFilter {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"all" => Ok(Self::All),
			"failed" => Ok(Self::FailedOnly),
			"reached" => Ok(Self::ReachedOnly),
			"met" => Ok(Self::MetOnly),
			other => Err(format!(
				"unknown filter '{other}' (expected all, failed, reached or met)"
			)),
		}
	}
}

impl fmt::Display for TraceFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.display_name())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn line(number: usize, valid: bool, reached: bool, met: bool) -> TraceLine {
		TraceLine {
			raw_line: format!("line {number}"),
			line_number: number,
			is_valid: valid,
			was_reached: reached,
			was_met: met,
			is_supported: true,
			message: None,
		}
	}

	fn numbers(lines: Vec<&TraceLine>) -> Vec<usize> {
		lines.into_iter().map(|l| l.line_number).collect()
	}

	#[test]
	fn test_filters() {
		let lines = vec![
			line(1, true, true, true),
			line(2, true, true, false),
			line(3, false, true, false),
			line(4, true, false, false),
		];

		assert_eq!(numbers(TraceFilter::All.filter(&lines)), vec![1, 2, 3, 4]);
		assert_eq!(numbers(TraceFilter::FailedOnly.filter(&lines)), vec![2, 3, 4]);
		assert_eq!(numbers(TraceFilter::ReachedOnly.filter(&lines)), vec![1, 2, 3]);
		assert_eq!(numbers(TraceFilter::MetOnly.filter(&lines)), vec![1]);
	}

	#[test]
	fn test_from_str() {
		assert_eq!("failed".parse::<TraceFilter>().unwrap(), TraceFilter::FailedOnly);
		assert_eq!("MET".parse::<TraceFilter>().unwrap(), TraceFilter::MetOnly);
		assert!("bogus".parse::<TraceFilter>().is_err());
	}
}
