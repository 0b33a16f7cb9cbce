//! Tool-level settings for myvmm.
//!
//! Settings are loaded from multiple sources in priority order:
//! 1. Environment variables (MYVMM_DEFAULT_SLICE, MYVMM_ECHO)
//! 2. Project-local settings file (`./myvmm.toml`)
//! 3. User settings file (`~/.config/myvmm/config.toml`)
//! 4. Built-in defaults
//!
//! These are separate from the per-VM config files passed with `-v`,
//! which are handled by [`crate::session::vm_config`].
//!
//! # Settings File Format
//!
//! ```toml
//! # myvmm.toml
//!
//! # Quota for VMs whose config omits vm_exec_slice_in_instructions
//! default_slice = 500
//!
//! # Print each instruction before executing it
//! echo_instructions = true
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::session::vm_config::DEFAULT_SLICE;

/// myvmm settings.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Quota for VMs that do not set one.
    pub default_slice: Option<u32>,

    /// Echo `Executing PC=<n>: <instruction>` before each step.
    pub echo_instructions: Option<bool>,
}

impl Settings {
    /// Load settings from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Project-local `myvmm.toml`
    /// 3. User config `~/.config/myvmm/config.toml`
    /// 4. Defaults
    pub fn load() -> Self {
        let mut settings = Self::default();

        // Load user config first (lowest priority of file configs)
        if let Some(user) = Self::user_config_path().and_then(|p| Self::load_from_file(&p)) {
            settings.merge(user);
        }

        // Project-local config (higher priority)
        if let Some(local) = Self::load_from_file(Path::new("myvmm.toml")) {
            settings.merge(local);
        }

        // Environment variables override everything
        settings.apply_env_overrides(|key| std::env::var(key).ok());

        log::debug!("Loaded settings: {:?}", settings);
        settings
    }

    /// Quota for VMs without one, with fallback to the built-in default.
    pub fn default_slice(&self) -> u32 {
        self.default_slice.unwrap_or(DEFAULT_SLICE)
    }

    /// Whether instruction echo is enabled (off by default).
    pub fn echo_instructions(&self) -> bool {
        self.echo_instructions.unwrap_or(false)
    }

    /// Load settings from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    Some(settings)
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Merge another settings value into this one.
    /// Only overrides fields that are Some in the other.
    fn merge(&mut self, other: Self) {
        if other.default_slice.is_some() {
            self.default_slice = other.default_slice;
        }
        if other.echo_instructions.is_some() {
            self.echo_instructions = other.echo_instructions;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("MYVMM_DEFAULT_SLICE") {
            match value.trim().parse::<u32>() {
                Ok(slice) => {
                    log::info!("Using MYVMM_DEFAULT_SLICE from environment: {}", slice);
                    self.default_slice = Some(slice);
                }
                Err(_) => log::warn!("Ignoring invalid MYVMM_DEFAULT_SLICE: {:?}", value),
            }
        }
        if let Some(value) = lookup("MYVMM_ECHO") {
            match value.trim() {
                "1" | "true" | "yes" | "on" => self.echo_instructions = Some(true),
                "0" | "false" | "no" | "off" => self.echo_instructions = Some(false),
                other => log::warn!("Ignoring invalid MYVMM_ECHO: {:?}", other),
            }
        }
    }

    /// Get the path to the user settings file.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("myvmm").join("config.toml"))
    }

    /// Generate a sample settings file (printed by `--print-config`).
    pub fn sample() -> String {
        r#"# myvmm settings
# Place this file at ~/.config/myvmm/config.toml or ./myvmm.toml

# Quota for VMs whose config omits vm_exec_slice_in_instructions
# default_slice = 100

# Print "Executing PC=<n>: <instruction>" before each instruction
# echo_instructions = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.default_slice(), 100);
        assert!(!settings.echo_instructions());
    }

    #[test]
    fn test_merge() {
        let mut base = Settings {
            default_slice: Some(10),
            echo_instructions: Some(true),
        };
        let overlay = Settings {
            default_slice: Some(20),
            echo_instructions: None,
        };

        base.merge(overlay);

        assert_eq!(base.default_slice, Some(20));
        // unchanged (overlay was None)
        assert_eq!(base.echo_instructions, Some(true));
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_env_overrides(|key| match key {
            "MYVMM_DEFAULT_SLICE" => Some("42".to_string()),
            "MYVMM_ECHO" => Some("yes".to_string()),
            _ => None,
        });
        assert_eq!(settings.default_slice(), 42);
        assert!(settings.echo_instructions());
    }

    #[test]
    fn test_invalid_env_ignored() {
        let mut settings = Settings {
            default_slice: Some(5),
            echo_instructions: None,
        };
        settings.apply_env_overrides(|key| match key {
            "MYVMM_DEFAULT_SLICE" => Some("-1".to_string()),
            "MYVMM_ECHO" => Some("maybe".to_string()),
            _ => None,
        });
        assert_eq!(settings.default_slice(), 5);
        assert_eq!(settings.echo_instructions, None);
    }

    #[test]
    fn test_parse_toml() {
        let settings: Settings = toml::from_str("default_slice = 7\necho_instructions = true\n")
            .expect("settings should parse");
        assert_eq!(settings.default_slice(), 7);
        assert!(settings.echo_instructions());
    }

    #[test]
    fn test_sample_parses() {
        let sample = Settings::sample();
        let settings: Settings = toml::from_str(&sample).expect("Sample settings should parse");
        assert_eq!(settings, Settings::default());
    }
}
