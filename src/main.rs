use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use htaccess_tester::config::{
	SETTINGS_FILE_NAME, Settings, discover_settings, generate_init_template, load_settings,
	merge_settings, user_settings_path,
};
use htaccess_tester::conformance::{compare, parse_oracle_response};
use htaccess_tester::engine::{Engine, EngineInput, EngineOutput, HtaccessEngine};
use htaccess_tester::fixture::{generate_report, load_fixture_file, run_fixtures};
use htaccess_tester::report::{TraceFilter, generate_summary, render_json, render_trace};

#[derive(Parser)]
#[command(name = "htaccess")]
#[command(
	author,
	version,
	about = "Evaluate and trace Apache .htaccess rewrite rules offline"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Increase log output (-v debug, -vv trace)
	#[arg(short, long, action = ArgAction::Count, global = true)]
	verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
	/// Evaluate rules against a URL and print the result with its trace
	Test {
		#[command(flatten)]
		request: RequestArgs,

		/// Print the result as JSON
		#[arg(long)]
		json: bool,

		/// Which trace lines to show: all, failed, reached or met
		#[arg(long, default_value = "all")]
		filter: TraceFilter,
	},
	/// Run saved test cases from fixture files
	Check {
		/// Fixture files (TOML with [[case]] tables)
		#[arg(required = true)]
		fixtures: Vec<PathBuf>,
	},
	/// Compare local evaluation with a saved reference response
	Compare {
		#[command(flatten)]
		request: RequestArgs,

		/// Reference response JSON file
		#[arg(long, value_name = "FILE")]
		oracle: PathBuf,
	},
	/// Settings management commands
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},
}

#[derive(clap::Args)]
struct RequestArgs {
	/// Request URL, e.g. http://example.com/page?x=1
	#[arg(long)]
	url: String,

	/// .htaccess file to evaluate (reads stdin when omitted)
	#[arg(long, value_name = "FILE")]
	rules: Option<PathBuf>,

	/// Server variable, may be repeated
	#[arg(short = 's', long = "server-var", value_name = "KEY=VALUE", value_parser = parse_key_value)]
	server_vars: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum ConfigAction {
	/// Display effective settings with source annotations
	Show,
	/// Check all settings files for errors without evaluating anything
	Validate,
	/// Create a template .htaccess-tester.toml in the current directory
	Init {
		/// Overwrite an existing file
		#[arg(long)]
		force: bool,
	},
}

fn main() -> ExitCode {
	match run() {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn run() -> Result<ExitCode> {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	match cli.command {
		Commands::Test {
			request,
			json,
			filter,
		} => handle_test(&request, json, filter),
		Commands::Check { fixtures } => handle_check(&fixtures),
		Commands::Compare { request, oracle } => handle_compare(&request, &oracle),
		Commands::Config { action } => match action {
			ConfigAction::Show => handle_config_show(),
			ConfigAction::Validate => handle_config_validate(),
			ConfigAction::Init { force } => handle_init(force),
		},
	}
}

fn init_logging(verbose: u8) {
	let level = match verbose {
		0 => "warn",
		1 => "debug",
		_ => "trace",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
	match s.split_once('=') {
		Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
		_ => Err(format!("expected KEY=VALUE, got '{s}'")),
	}
}

fn current_settings() -> Result<Settings> {
	let cwd = std::env::current_dir().context("Failed to get current directory")?;
	load_settings(&cwd).context("Failed to load settings")
}

fn read_rules(path: Option<&Path>) -> Result<String> {
	match path {
		Some(path) => std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read rules file {}", path.display())),
		None => std::io::read_to_string(std::io::stdin()).context("Failed to read rules from stdin"),
	}
}

/// Evaluate the request described on the command line. Command-line
/// variables override the ones from settings.
fn evaluate_request(request: &RequestArgs, settings: &Settings) -> Result<EngineOutput> {
	let rules = read_rules(request.rules.as_deref())?;

	let mut server_variables: BTreeMap<String, String> = settings.server_variables.clone();
	server_variables.extend(request.server_vars.iter().cloned());

	let input = EngineInput {
		url: request.url.clone(),
		htaccess_content: rules,
		server_variables,
	};
	debug!(url = %input.url, sources = settings.sources.len(), "evaluating request");

	Engine::new(settings.engine)
		.evaluate(&input)
		.context("Evaluation rejected")
}

fn handle_test(request: &RequestArgs, json: bool, filter: TraceFilter) -> Result<ExitCode> {
	let settings = current_settings()?;
	let mut output = evaluate_request(request, &settings)?;

	if json {
		output.trace.retain(|line| filter.matches(line));
		println!("{}", render_json(&output).context("Failed to serialize result")?);
	} else {
		println!("{}", generate_summary(&output));
		println!("Trace ({filter}):");
		print!("{}", render_trace(filter.filter(&output.trace)));
	}

	Ok(ExitCode::SUCCESS)
}

fn handle_check(paths: &[PathBuf]) -> Result<ExitCode> {
	let settings = current_settings()?;
	let engine = Engine::new(settings.engine);

	let mut results = Vec::new();
	for path in paths {
		let fixtures = load_fixture_file(path)
			.with_context(|| format!("Failed to load fixtures from {}", path.display()))?;
		results.extend(run_fixtures(&engine, &fixtures, &settings.server_variables));
	}

	print!("{}", generate_report(&results));

	if results.iter().all(|r| r.passed) {
		Ok(ExitCode::SUCCESS)
	} else {
		Ok(ExitCode::FAILURE)
	}
}

fn handle_compare(request: &RequestArgs, oracle_path: &Path) -> Result<ExitCode> {
	let json = std::fs::read_to_string(oracle_path)
		.with_context(|| format!("Failed to read {}", oracle_path.display()))?;
	let oracle = parse_oracle_response(&json)
		.with_context(|| format!("Invalid reference response in {}", oracle_path.display()))?;

	let settings = current_settings()?;
	let output = evaluate_request(request, &settings)?;
	let result = compare(&output, &oracle);

	if result.passed {
		println!("Conformance: PASS");
		return Ok(ExitCode::SUCCESS);
	}

	println!("Conformance: FAIL ({} differences)", result.differences.len());
	for difference in &result.differences {
		println!("  - {difference}");
	}
	Ok(ExitCode::FAILURE)
}

fn handle_init(force: bool) -> Result<ExitCode> {
	let path = PathBuf::from(SETTINGS_FILE_NAME);

	if path.exists() && !force {
		anyhow::bail!("{SETTINGS_FILE_NAME} already exists. Use --force to overwrite.");
	}

	std::fs::write(&path, generate_init_template())
		.with_context(|| format!("Failed to write {}", path.display()))?;

	println!("Created {SETTINGS_FILE_NAME}");
	Ok(ExitCode::SUCCESS)
}

fn handle_config_show() -> Result<ExitCode> {
	let cwd = std::env::current_dir().context("Failed to get current directory")?;
	let files = discover_settings(&cwd).context("Failed to discover settings files")?;

	if files.is_empty() {
		println!("No settings files found; using defaults.\n");
	} else {
		println!("Settings files (in cascade order):\n");
	}

	for loaded in &files {
		let settings = &loaded.settings;
		println!("# Source: {}", loaded.path.display());
		println!("# root: {}", settings.root);
		if let Some(value) = settings.max_iterations {
			println!("# max-iterations: {value}");
		}
		if let Some(value) = settings.max_output_url_length {
			println!("# max-output-url-length: {value}");
		}
		if let Some(value) = settings.max_rules_count {
			println!("# max-rules-count: {value}");
		}
		if let Some(ref env_var) = settings.user_config_disable_env_var {
			println!("# user-config-disable-env-var: {env_var}");
		}
		for (name, value) in &settings.server_variables {
			println!("  {name} = {value}");
		}
		println!();
	}

	let effective = merge_settings(&files).context("Invalid combined settings")?;
	println!("Effective settings:");
	println!("  max-iterations: {}", effective.engine.max_iterations());
	println!(
		"  max-output-url-length: {}",
		effective.engine.max_output_url_length()
	);
	println!("  max-rules-count: {}", effective.engine.max_rules_count());
	println!("  server-variables: {}", effective.server_variables.len());
	println!();

	if let Ok(user_path) = user_settings_path() {
		println!("User settings path: {}", user_path.display());
		if user_path.exists() {
			println!("  (exists)");
		} else {
			println!("  (not found)");
		}
	}

	Ok(ExitCode::SUCCESS)
}

fn handle_config_validate() -> Result<ExitCode> {
	let cwd = std::env::current_dir().context("Failed to get current directory")?;

	match discover_settings(&cwd) {
		Ok(files) => {
			if files.is_empty() {
				println!("No settings files found.");
			} else {
				println!("All settings files are valid:");
				for loaded in &files {
					println!("  {}", loaded.path.display());
				}
			}
			Ok(ExitCode::SUCCESS)
		}
		Err(e) => {
			eprintln!("Settings error: {e}");
			Ok(ExitCode::FAILURE)
		}
	}
}
