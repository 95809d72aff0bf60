use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::engine::EngineConfig;
use crate::error::{HtaccessError, Result};

/// Contents of one `.htaccess-tester.toml` file. Every field is optional so
/// that files further down the cascade only override what they name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SettingsFile {
	/// If true, stop the directory walk here and go straight to the user file.
	#[serde(default)]
	pub root: bool,

	/// Upper bound on `N`-flag restarts.
	pub max_iterations: Option<usize>,

	/// Longest output URL the engine will return.
	pub max_output_url_length: Option<usize>,

	/// Most source lines an `.htaccess` input may have.
	pub max_rules_count: Option<usize>,

	/// Environment variable name that, if truthy, skips the user settings file.
	/// Useful for CI environments.
	pub user_config_disable_env_var: Option<String>,

	/// Default server variables for every evaluation.
	#[serde(default)]
	pub server_variables: BTreeMap<String, String>,
}

impl SettingsFile {
	/// Reject limits that are present but zero.
	pub fn validate(&self) -> Result<()> {
		let limits = [
			("max-iterations", self.max_iterations),
			("max-output-url-length", self.max_output_url_length),
			("max-rules-count", self.max_rules_count),
		];
		if let Some((field, _)) = limits.into_iter().find(|(_, value)| *value == Some(0)) {
			return Err(HtaccessError::InvalidConfig { field });
		}
		Ok(())
	}
}

/// A settings file with the path it was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
	pub settings: SettingsFile,
	pub path: PathBuf,
}

/// Effective settings after the cascade has been merged.
#[derive(Debug, Clone, Default)]
pub struct Settings {
	pub engine: EngineConfig,
	pub server_variables: BTreeMap<String, String>,

	/// Files that contributed, most specific first.
	pub sources: Vec<PathBuf>,
}
