use crate::config::parser::parse_settings_file;
use crate::config::types::{LoadedSettings, Settings};
use crate::engine::{
	DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_OUTPUT_URL_LENGTH, DEFAULT_MAX_RULES_COUNT, EngineConfig,
};
use crate::error::{HtaccessError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SETTINGS_FILE_NAME: &str = ".htaccess-tester.toml";

/// Discover and load all settings files in the cascade.
///
/// The cascade order is:
/// 1. Start from `start_dir` and look for `.htaccess-tester.toml`
/// 2. If found and `root = true`, skip to the user file only
/// 3. Otherwise, continue up the directory tree
/// 4. Finally, check ~/.htaccess-tester.toml (unless disabled)
///
/// Returns files in cascade order (most specific first).
pub fn discover_settings(start_dir: &Path) -> Result<Vec<LoadedSettings>> {
	let mut found = Vec::new();
	let mut current_dir = start_dir.to_path_buf();

	loop {
		let path = current_dir.join(SETTINGS_FILE_NAME);

		if path.exists() {
			let settings = parse_settings_file(&path)?;
			let root = settings.root;
			debug!(path = %path.display(), root, "loaded settings file");
			found.push(LoadedSettings { settings, path });

			if root {
				break;
			}
		}

		match current_dir.parent() {
			Some(parent) => current_dir = parent.to_path_buf(),
			None => break,
		}
	}

	if let Some(user) = load_user_settings(&found)? {
		found.push(user);
	}

	Ok(found)
}

/// Load ~/.htaccess-tester.toml if it exists and isn't disabled.
fn load_user_settings(existing: &[LoadedSettings]) -> Result<Option<LoadedSettings>> {
	for loaded in existing {
		if let Some(ref env_var) = loaded.settings.user_config_disable_env_var
			&& is_env_truthy(env_var)
		{
			debug!(env_var, "user settings disabled");
			return Ok(None);
		}
	}

	let path = user_settings_path()?;

	// The walk may already have reached the home directory.
	if existing.iter().any(|loaded| loaded.path == path) {
		return Ok(None);
	}

	if path.exists() {
		let settings = parse_settings_file(&path)?;
		Ok(Some(LoadedSettings { settings, path }))
	} else {
		Ok(None)
	}
}

/// Check if an environment variable is set to a truthy value.
fn is_env_truthy(var_name: &str) -> bool {
	match std::env::var(var_name) {
		Ok(value) => {
			let lower = value.to_lowercase();
			!value.is_empty() && lower != "0" && lower != "false" && lower != "no"
		}
		Err(_) => false,
	}
}

/// Merge settings files into effective settings.
///
/// Files are given most specific first; for every field the first file that
/// sets it wins. Server variables merge per key the same way.
pub fn merge_settings(files: &[LoadedSettings]) -> Result<Settings> {
	let pick = |get: fn(&LoadedSettings) -> Option<usize>, default: usize| {
		files.iter().find_map(get).unwrap_or(default)
	};

	let engine = EngineConfig::new(
		pick(|l| l.settings.max_iterations, DEFAULT_MAX_ITERATIONS),
		pick(
			|l| l.settings.max_output_url_length,
			DEFAULT_MAX_OUTPUT_URL_LENGTH,
		),
		pick(|l| l.settings.max_rules_count, DEFAULT_MAX_RULES_COUNT),
	)?;

	let mut server_variables = std::collections::BTreeMap::new();
	for loaded in files.iter().rev() {
		server_variables.extend(
			loaded
				.settings
				.server_variables
				.iter()
				.map(|(k, v)| (k.clone(), v.clone())),
		);
	}

	Ok(Settings {
		engine,
		server_variables,
		sources: files.iter().map(|l| l.path.clone()).collect(),
	})
}

/// Convenience function to discover, load, and merge settings from a directory.
pub fn load_settings(start_dir: &Path) -> Result<Settings> {
	let files = discover_settings(start_dir)?;
	merge_settings(&files)
}

/// Get the path to the user's settings file.
pub fn user_settings_path() -> Result<PathBuf> {
	let home_dir = dirs::home_dir().ok_or(HtaccessError::HomeDirectoryNotFound)?;
	Ok(home_dir.join(SETTINGS_FILE_NAME))
}
