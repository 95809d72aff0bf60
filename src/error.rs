use std::path::PathBuf;

/// Library-level structured errors for htaccess-tester.
///
/// Only configuration problems are errors. Anything wrong with an individual
/// directive is reported in the evaluation trace instead.
#[derive(Debug, thiserror::Error)]
pub enum HtaccessError {
	#[error("Invalid engine configuration: {field} must be positive")]
	InvalidConfig { field: &'static str },

	#[error("Rule count {count} exceeds maximum {max}")]
	RuleCountExceeded { count: usize, max: usize },

	#[error("Output URL length {length} exceeds maximum {max}")]
	OutputUrlTooLong { length: usize, max: usize },

	#[error("Failed to read settings file: {path}")]
	SettingsReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse settings file: {path}")]
	SettingsParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Failed to read fixture file: {path}")]
	FixtureReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse fixture file: {path}")]
	FixtureParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Failed to parse oracle response")]
	OracleParseError {
		#[source]
		source: serde_json::Error,
	},

	#[error("Failed to resolve home directory")]
	HomeDirectoryNotFound,
}

/// Result type alias using HtaccessError.
pub type Result<T> = std::result::Result<T, HtaccessError>;
