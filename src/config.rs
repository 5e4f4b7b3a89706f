// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Configuration for kubextract
//!
//! Optional defaults live in ~/.kubextract/config.json; command-line flags
//! override them. All kubextract data is stored under ~/.kubextract/:
//! - ~/.kubextract/config.json - user configuration
//! - ~/.kubextract/log/ - log files

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::{Args, OutputFormat};

/// Output directory when neither flag nor config sets one
pub const DEFAULT_OUTPUT_DIR: &str = "default";

/// Subject pattern when neither flag nor config sets one
pub const DEFAULT_SUBJECT_PATTERN: &str = "OPSH";

/// Get the base kubextract directory (~/.kubextract/)
pub fn base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".kubextract"))
        .context("Could not determine home directory")
}

/// Persisted configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root of the exported tree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Substring that marks a binding subject as user-defined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_pattern: Option<String>,
    /// Kubernetes context to export from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Config {
    /// Load config from a file, or return default if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Take over every setting given explicitly on the command line
    pub fn merge_flags(&mut self, args: &Args) {
        if let Some(dir) = &args.outdir {
            self.output_dir = Some(dir.clone());
        }
        if let Some(pattern) = &args.rolestring {
            self.subject_pattern = Some(pattern.clone());
        }
        if let Some(context) = &args.context {
            self.context = Some(context.clone());
        }
    }

    /// Get the config file path (~/.kubextract/config.json)
    pub fn config_path() -> Result<PathBuf> {
        Ok(base_dir()?.join("config.json"))
    }
}

/// Effective settings for one run: flags, then config file, then defaults
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub subject_pattern: String,
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub format: OutputFormat,
}

impl Settings {
    pub fn resolve(args: &Args, config: &Config) -> Self {
        Self {
            output_dir: args
                .outdir
                .clone()
                .or_else(|| config.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            subject_pattern: args
                .rolestring
                .clone()
                .or_else(|| config.subject_pattern.clone())
                .unwrap_or_else(|| DEFAULT_SUBJECT_PATTERN.to_string()),
            kubeconfig: args.kubeconfig.clone(),
            context: args.context.clone().or_else(|| config.context.clone()),
            format: args.format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.output_dir.is_none());
        assert!(config.subject_pattern.is_none());
    }

    #[test]
    fn test_config_deserialize() {
        let json = r#"{"output_dir": "/srv/export", "subject_pattern": "RES-DEV"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.output_dir, Some(PathBuf::from("/srv/export")));
        assert_eq!(config.subject_pattern.as_deref(), Some("RES-DEV"));
        assert!(config.context.is_none());
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let config = Config {
            output_dir: Some(PathBuf::from("out")),
            subject_pattern: Some("OPSH".to_string()),
            context: Some("prod".to_string()),
        };
        config.save_to(&config_path).unwrap();

        let loaded = Config::load_from(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = Config::load_from(&temp_dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_merge_flags_keeps_unset_values() {
        let mut config = Config {
            output_dir: Some(PathBuf::from("/srv/export")),
            subject_pattern: Some("RES-DEV".to_string()),
            context: None,
        };
        let args = Args::parse_from(["kubextract", "-r", "TEAM", "-c", "prod", "--save-config"]);
        config.merge_flags(&args);
        assert_eq!(config.output_dir, Some(PathBuf::from("/srv/export")));
        assert_eq!(config.subject_pattern.as_deref(), Some("TEAM"));
        assert_eq!(config.context.as_deref(), Some("prod"));
    }

    #[test]
    fn test_settings_defaults() {
        let args = Args::parse_from(["kubextract"]);
        let settings = Settings::resolve(&args, &Config::default());
        assert_eq!(settings.output_dir, PathBuf::from("default"));
        assert_eq!(settings.subject_pattern, "OPSH");
        assert!(settings.context.is_none());
        assert_eq!(settings.format, OutputFormat::Yaml);
    }

    #[test]
    fn test_settings_config_over_defaults() {
        let args = Args::parse_from(["kubextract"]);
        let config = Config {
            output_dir: Some(PathBuf::from("/srv/export")),
            subject_pattern: Some("RES-DEV".to_string()),
            context: Some("staging".to_string()),
        };
        let settings = Settings::resolve(&args, &config);
        assert_eq!(settings.output_dir, PathBuf::from("/srv/export"));
        assert_eq!(settings.subject_pattern, "RES-DEV");
        assert_eq!(settings.context.as_deref(), Some("staging"));
    }

    #[test]
    fn test_settings_flags_over_config() {
        let args = Args::parse_from(["kubextract", "-o", "here", "-r", "TEAM", "-c", "prod"]);
        let config = Config {
            output_dir: Some(PathBuf::from("/srv/export")),
            subject_pattern: Some("RES-DEV".to_string()),
            context: Some("staging".to_string()),
        };
        let settings = Settings::resolve(&args, &config);
        assert_eq!(settings.output_dir, PathBuf::from("here"));
        assert_eq!(settings.subject_pattern, "TEAM");
        assert_eq!(settings.context.as_deref(), Some("prod"));
    }
}
