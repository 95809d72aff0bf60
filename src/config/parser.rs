use crate::config::types::SettingsFile;
use crate::error::{HtaccessError, Result};
use std::path::Path;

/// Parse a settings file from the given path.
pub fn parse_settings_file(path: &Path) -> Result<SettingsFile> {
	let content =
		std::fs::read_to_string(path).map_err(|source| HtaccessError::SettingsReadError {
			path: path.to_path_buf(),
			source,
		})?;

	parse_settings_str(&content, path)
}

/// Parse settings from a string (useful for testing).
pub fn parse_settings_str(content: &str, path: &Path) -> Result<SettingsFile> {
	let settings: SettingsFile =
		toml::from_str(content).map_err(|source| HtaccessError::SettingsParseError {
			path: path.to_path_buf(),
			source,
		})?;

	settings.validate()?;

	Ok(settings)
}

/// Template written by `htaccess config init`.
pub fn generate_init_template() -> String {
	r#"# htaccess-tester settings
#
# Files named .htaccess-tester.toml are read from the current directory
# upward. Nearer files override farther ones; root = true stops the walk.
root = true

# max-iterations = 100
# max-output-url-length = 8192
# max-rules-count = 1000

# Skip ~/.htaccess-tester.toml when this variable is truthy.
# user-config-disable-env-var = "CI"

[server-variables]
# HTTPS = "off"
# HTTP_HOST = "example.com"
"#
	.to_string()
}
