//! Configuration for the M-code extension and the simulator binary.
//!
//! Handles:
//! - Command-line argument parsing for `pnp-sim`
//! - Extension settings loaded from a TOML file

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Command-line arguments for the simulator binary.
#[derive(Debug, Parser)]
#[command(name = "pnp-sim")]
#[command(about = "Drives the vendor M-code pipeline against an in-memory machine")]
#[command(version)]
pub struct Args {
    /// Extension configuration file
    #[arg(long, help = "Path to a TOML extension configuration")]
    pub config: Option<PathBuf>,

    /// Number of simulated axes
    #[arg(long, default_value_t = 4, help = "Number of machine axes (1-8)")]
    pub axes: usize,

    /// Log level for the simulator
    #[arg(
        long,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,
}

/// What dispatch does with a command that validated but fell off the end of
/// the execute chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnhandledPolicy {
    /// Treat it as done. Matches the original firmware behavior.
    Ignore,
    /// Report it back to the host as unhandled.
    Surface,
}

/// Identity strings emitted by the firmware-info command.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FirmwareIdentity {
    pub name: String,
    /// Percent-encoded, the host echoes it verbatim.
    pub url: String,
    pub version: String,
    pub build: u32,
}

impl Default for FirmwareIdentity {
    fn default() -> Self {
        FirmwareIdentity {
            name: "pnpHAL".to_string(),
            url: "https%3A//github.com/pnp-mcodes".to_string(),
            version: "1.1".to_string(),
            build: 20240101,
        }
    }
}

/// Extension configuration, all fields optional in the TOML source.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtensionConfig {
    /// Enable the jerk-override command. All three pipeline stages consult
    /// this flag uniformly.
    pub jerk_override: bool,
    pub unhandled: UnhandledPolicy,
    pub firmware: FirmwareIdentity,
    /// Plugin name announced on the host's option report.
    pub plugin_name: String,
    pub plugin_version: String,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        ExtensionConfig {
            jerk_override: false,
            unhandled: UnhandledPolicy::Ignore,
            firmware: FirmwareIdentity::default(),
            plugin_name: "OpenPNP".to_string(),
            plugin_version: "0.10".to_string(),
        }
    }
}

impl ExtensionConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid extension configuration")
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_matches_original_plugin() {
        let config = ExtensionConfig::default();
        assert!(!config.jerk_override);
        assert_eq!(config.unhandled, UnhandledPolicy::Ignore);
        assert_eq!(config.plugin_name, "OpenPNP");
    }

    #[test]
    fn parse_partial_toml() {
        let config = ExtensionConfig::from_toml_str(
            r#"
            jerk_override = true
            unhandled = "surface"
            "#,
        )
        .unwrap();

        assert!(config.jerk_override);
        assert_eq!(config.unhandled, UnhandledPolicy::Surface);
        // Unspecified sections keep their defaults
        assert_eq!(config.firmware, FirmwareIdentity::default());
    }

    #[test]
    fn parse_firmware_identity() {
        let config = ExtensionConfig::from_toml_str(
            r#"
            [firmware]
            name = "testHAL"
            url = "https%3A//example.invalid"
            version = "9.9"
            build = 42
            "#,
        )
        .unwrap();

        assert_eq!(config.firmware.name, "testHAL");
        assert_eq!(config.firmware.build, 42);
    }

    #[test]
    fn reject_malformed_toml() {
        assert!(ExtensionConfig::from_toml_str("unhandled = \"retry\"").is_err());
        assert!(ExtensionConfig::from_toml_str("jerk_override = ").is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "jerk_override = true").unwrap();

        let config = ExtensionConfig::from_file(file.path()).unwrap();
        assert!(config.jerk_override);

        assert!(ExtensionConfig::from_file(Path::new("/nonexistent/pnp.toml")).is_err());
    }
}
