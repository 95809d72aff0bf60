use std::collections::BTreeMap;
use tracing::{debug, trace};
use url::Url;

use crate::engine::conditions::evaluate_condition;
use crate::engine::model::{EngineOutput, TraceLine};
use crate::engine::pattern::{PatternCache, find_groups};
use crate::engine::request::{
	RequestState, build_url, escape_path, join_query, normalize_path, split_query,
};
use crate::engine::variables::VariableResolver;
use crate::parser::{CondFlag, CondFlags, DEFAULT_REDIRECT_STATUS, Directive, RuleFlags};

/// Apache directives that exist but are outside what this engine simulates.
const UNSUPPORTED_DIRECTIVES: &[&str] = &["RewriteBase", "RewriteMap", "RewriteOptions"];

const FORBIDDEN_STATUS: u16 = 403;
const GONE_STATUS: u16 = 410;

/// What the main loop does after a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
	Advance,
	Restart,
}

/// Borrowed view of a `RewriteCond` owned by the rule being processed.
#[derive(Debug, Clone, Copy)]
struct Condition<'d> {
	directive: &'d Directive,
	test_string: &'d str,
	pattern: &'d str,
	flags: &'d CondFlags,
}

/// Borrowed view of the `RewriteRule` being processed.
#[derive(Debug, Clone, Copy)]
struct Rule<'d> {
	directive: &'d Directive,
	pattern: &'d str,
	substitution: &'d str,
	flags: &'d RuleFlags,
}

/// Side effects of applying a substitution that the trace must report.
#[derive(Debug, Default)]
struct Applied {
	unsupported: Option<String>,
	external_redirect: bool,
}

/// Interpreter for one evaluation. All state lives here and dies with the
/// call: [`Evaluator::evaluate`] takes `self` by value.
#[derive(Debug)]
pub struct Evaluator<'a> {
	server_variables: &'a BTreeMap<String, String>,
	max_iterations: usize,
	request: RequestState,
	engine_on: bool,
	stopped: bool,
	status: Option<u16>,
	redirect_target: Option<String>,
	rule_refs: Vec<String>,
	cond_refs: Vec<String>,
	patterns: PatternCache,
	trace: Vec<TraceLine>,
}

impl<'a> Evaluator<'a> {
	pub fn new(
		input_url: &str,
		server_variables: &'a BTreeMap<String, String>,
		max_iterations: usize,
	) -> Self {
		Self {
			server_variables,
			max_iterations,
			request: RequestState::from_url(input_url, server_variables),
			engine_on: false,
			stopped: false,
			status: None,
			redirect_target: None,
			rule_refs: Vec::new(),
			cond_refs: Vec::new(),
			patterns: PatternCache::new(),
			trace: Vec::new(),
		}
	}

	/// Run every directive against the request and build the result.
	pub fn evaluate(mut self, directives: &[Directive]) -> EngineOutput {
		let mut cursor = 0;
		let mut iteration = 0;

		while cursor < directives.len() && iteration < self.max_iterations && !self.stopped {
			match self.process(directives, cursor) {
				Flow::Restart => {
					cursor = 0;
					iteration += 1;
					trace!(iteration, path = %self.request.path, "restarting rule processing");
				}
				Flow::Advance => cursor += 1,
			}
		}

		if self.stopped {
			for directive in directives[cursor.min(directives.len())..]
				.iter()
				.filter(|d| !d.is_blank())
			{
				self.trace.push(TraceLine::not_reached(directive));
			}
		} else if iteration >= self.max_iterations {
			debug!(
				max_iterations = self.max_iterations,
				"iteration limit reached, returning current state"
			);
		}

		let output_url = self
			.redirect_target
			.take()
			.or_else(|| self.request.to_url());

		EngineOutput {
			output_url,
			status_code: self.status,
			trace: self.trace,
		}
	}

	fn process(&mut self, directives: &[Directive], index: usize) -> Flow {
		let directive = &directives[index];

		match directive {
			Directive::RewriteEngine { enabled, .. } => {
				self.engine_on = *enabled;
				self.trace.push(TraceLine::new(directive, true, *enabled));
			}
			Directive::RewriteRule {
				pattern,
				substitution,
				flags,
				..
			} => {
				let conditions = collect_conditions(directives, index);
				let rule = Rule {
					directive,
					pattern,
					substitution,
					flags,
				};

				if !self.engine_on {
					self.skip_conditions(&conditions);
					self.push_rule(
						rule,
						TraceLine::new(directive, false, false).with_message("RewriteEngine is Off"),
					);
					return Flow::Advance;
				}

				return self.process_rule(rule, &conditions);
			}
			Directive::RewriteCond { .. } => {
				if !has_following_rule(directives, index) {
					self.trace.push(
						TraceLine::new(directive, true, false)
							.with_message("RewriteCond has no following RewriteRule"),
					);
				}
			}
			Directive::Comment { .. } => {
				self.trace.push(TraceLine::new(directive, true, false));
			}
			Directive::BlankLine { .. } => {}
			Directive::Unknown { error, .. } => {
				let mut line = TraceLine::new(directive, true, false).invalid();
				if let Some(error) = error {
					line = line.with_message(error.clone());
				} else if let Some(name) = unsupported_directive(directive.raw_line()) {
					line = line
						.unsupported()
						.with_message(format!("{name} is not supported"));
				}
				self.trace.push(line);
			}
		}

		Flow::Advance
	}

	fn process_rule(&mut self, rule: Rule<'_>, conditions: &[Condition<'_>]) -> Flow {
		let subject = self.request.match_path().to_string();
		let matched = self
			.patterns
			.get(rule.pattern, rule.flags.no_case())
			.and_then(|re| find_groups(re, &subject));

		let groups = match matched {
			Ok(Some(groups)) => groups,
			Ok(None) => {
				self.skip_conditions(conditions);
				self.push_rule(
					rule,
					TraceLine::new(rule.directive, true, false)
						.with_message("Rule pattern did not match"),
				);
				return Flow::Advance;
			}
			Err(e) => {
				self.skip_conditions(conditions);
				self.push_rule(
					rule,
					TraceLine::new(rule.directive, true, false)
						.invalid()
						.with_message(format!("Invalid regex: {e}")),
				);
				return Flow::Advance;
			}
		};

		self.rule_refs = groups;

		if !conditions.is_empty() && !self.evaluate_conditions(conditions) {
			self.push_rule(
				rule,
				TraceLine::new(rule.directive, true, false).with_message("Conditions not met"),
			);
			return Flow::Advance;
		}

		if rule.flags.forbidden() || rule.flags.gone() {
			let status = if rule.flags.forbidden() {
				FORBIDDEN_STATUS
			} else {
				GONE_STATUS
			};
			debug!(line = rule.directive.line_number(), status, "rule ends the request");
			self.status = Some(status);
			self.stopped = true;
			self.push_rule(rule, TraceLine::new(rule.directive, true, true));
			return Flow::Advance;
		}

		let applied = self.apply_substitution(rule.substitution, rule.flags);
		let mut line = TraceLine::new(rule.directive, true, true);
		if let Some(message) = applied.unsupported {
			line = line.unsupported().with_message(message);
		}
		self.push_rule(rule, line);

		debug!(
			line = rule.directive.line_number(),
			path = %self.request.path,
			query = %self.request.query,
			"rule applied"
		);

		let flags = rule.flags;
		if flags.has_end()
			|| flags.redirect().is_some()
			|| applied.external_redirect
			|| flags.has_last()
		{
			self.stopped = true;
			Flow::Advance
		} else if flags.has_next() {
			Flow::Restart
		} else {
			Flow::Advance
		}
	}

	/// Evaluate a condition chain left to right. Every condition is traced
	/// with its own result, even after the chain outcome is already decided.
	fn evaluate_conditions(&mut self, conditions: &[Condition<'_>]) -> bool {
		self.cond_refs.clear();

		let mut result = true;
		let mut decided_false = false;
		let mut or_group = false;

		for cond in conditions {
			let expansion = VariableResolver::new(self.server_variables, &self.request).expand(
				cond.test_string,
				&self.rule_refs,
				&self.cond_refs,
			);
			let test_value = expansion.value.as_str();
			let outcome = evaluate_condition(
				test_value,
				cond.pattern,
				cond.flags.contains(CondFlag::NoCase),
				&mut self.patterns,
			);

			trace!(
				line = cond.directive.line_number(),
				test_value = %test_value,
				pattern = cond.pattern,
				met = outcome.met,
				"condition evaluated"
			);

			let mut line = TraceLine::new(cond.directive, true, outcome.met);
			if !outcome.valid {
				line = line.invalid();
			}
			if !outcome.supported || !expansion.unsupported.is_empty() {
				line = line.unsupported();
			}
			if let Some(message) = outcome.message.or_else(|| expansion.unsupported_message()) {
				line = line.with_message(message);
			}
			self.trace.push(line);

			if let Some(captures) = outcome.captures {
				self.cond_refs = captures;
			}

			if decided_false {
				continue;
			}
			if or_group {
				result = result || outcome.met;
			} else if !result {
				decided_false = true;
			} else {
				result = outcome.met;
			}
			or_group = cond.flags.contains(CondFlag::OrNext);
		}

		result && !decided_false
	}

	fn apply_substitution(&mut self, substitution: &str, flags: &RuleFlags) -> Applied {
		if substitution == "-" {
			return Applied::default();
		}

		let expansion = VariableResolver::new(self.server_variables, &self.request).expand(
			substitution,
			&self.rule_refs,
			&self.cond_refs,
		);
		let target = expansion.value.as_str();
		let mut applied = Applied {
			unsupported: expansion.unsupported_message(),
			external_redirect: false,
		};

		if let Some(status) = flags.redirect() {
			self.redirect_to(target, status, flags);
		} else if is_absolute(target) {
			match Url::parse(target) {
				Ok(url) if self.is_own_origin(&url) => {
					let local = match url.query() {
						Some(query) => format!("{}?{query}", url.path()),
						None => url.path().to_string(),
					};
					self.rewrite_in_place(&local, flags);
				}
				_ => {
					debug!(substitution = %target, "absolute substitution on another origin, redirecting");
					self.redirect_to(target, DEFAULT_REDIRECT_STATUS, flags);
					applied.external_redirect = true;
				}
			}
		} else {
			self.rewrite_in_place(target, flags);
		}

		applied
	}

	fn is_own_origin(&self, url: &Url) -> bool {
		url.scheme().eq_ignore_ascii_case(&self.request.scheme)
			&& url
				.host_str()
				.is_some_and(|host| self.request.is_same_host(host))
			&& url.port() == self.request.port
	}

	/// Internal rewrite: replace the path and query and keep going.
	fn rewrite_in_place(&mut self, target: &str, flags: &RuleFlags) {
		let (path, query) = split_query(target);
		let query = self.merge_query(query, flags.qs_append());
		self.request.path = normalize_path(path);
		self.request.query = query;
	}

	fn redirect_to(&mut self, target: &str, status: u16, flags: &RuleFlags) {
		let escape = |path: &str| {
			if flags.no_escape() {
				path.to_string()
			} else {
				escape_path(path)
			}
		};

		let location = if is_absolute(target) {
			match Url::parse(target) {
				Ok(url) => {
					let query = self.merge_query(url.query(), flags.qs_append());
					build_url(
						url.scheme(),
						url.host_str().unwrap_or_default(),
						url.port(),
						&join_query(&escape(url.path()), &query),
					)
				}
				Err(_) => target.to_string(),
			}
		} else {
			let (path, query) = split_query(target);
			let query = self.merge_query(query, flags.qs_append());
			let path_and_query = join_query(&escape(&normalize_path(path)), &query);
			match self.request.host.as_deref() {
				Some(host) => build_url(
					&self.request.scheme,
					host,
					self.request.port,
					&path_and_query,
				),
				None => path_and_query,
			}
		};

		debug!(status, location = %location, "redirect");
		self.status = Some(status);
		self.redirect_target = Some(location);
	}

	/// Query after a substitution: a `?` in the substitution replaces the
	/// current query, or is prepended to it under `QSA`; no `?` keeps it.
	fn merge_query(&self, new_query: Option<&str>, qs_append: bool) -> String {
		let current = &self.request.query;
		match new_query {
			Some(new) if qs_append && !current.is_empty() => {
				if new.is_empty() {
					current.clone()
				} else {
					format!("{new}&{current}")
				}
			}
			Some(new) => new.to_string(),
			None => current.clone(),
		}
	}

	/// Trace conditions that were never evaluated.
	fn skip_conditions(&mut self, conditions: &[Condition<'_>]) {
		for cond in conditions {
			self.trace.push(TraceLine::not_reached(cond.directive));
		}
	}

	/// Push a rule's trace entry, flagging unknown rule flags.
	fn push_rule(&mut self, rule: Rule<'_>, line: TraceLine) {
		let unknown: Vec<&str> = rule.flags.unknown().collect();
		let line = if unknown.is_empty() {
			line
		} else {
			line.unsupported()
				.or_message(format!("Unsupported flag: {}", unknown.join(", ")))
		};
		self.trace.push(line);
	}
}

/// The contiguous run of `RewriteCond` directives before the rule at
/// `rule_index`, in source order. Comments and blank lines are skipped;
/// anything else ends the run.
fn collect_conditions(directives: &[Directive], rule_index: usize) -> Vec<Condition<'_>> {
	let mut conditions = Vec::new();
	for directive in directives[..rule_index].iter().rev() {
		match directive {
			Directive::RewriteCond {
				test_string,
				pattern,
				flags,
				..
			} => conditions.push(Condition {
				directive,
				test_string,
				pattern,
				flags,
			}),
			Directive::Comment { .. } | Directive::BlankLine { .. } => {}
			_ => break,
		}
	}
	conditions.reverse();
	conditions
}

/// True if the condition at `index` belongs to a rule further down.
fn has_following_rule(directives: &[Directive], index: usize) -> bool {
	for directive in &directives[index + 1..] {
		match directive {
			Directive::RewriteRule { .. } => return true,
			Directive::RewriteCond { .. }
			| Directive::Comment { .. }
			| Directive::BlankLine { .. } => {}
			_ => return false,
		}
	}
	false
}

fn is_absolute(target: &str) -> bool {
	let lower = target.get(..8).unwrap_or(target).to_ascii_lowercase();
	lower.starts_with("http://") || lower.starts_with("https://")
}

fn unsupported_directive(raw: &str) -> Option<&'static str> {
	let keyword = raw.split_whitespace().next()?;
	UNSUPPORTED_DIRECTIVES
		.iter()
		.copied()
		.find(|name| name.eq_ignore_ascii_case(keyword))
}
