// src/config.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StatsError};

/// Environment variable naming a JSON config file to load instead of the default location.
pub const CONFIG_PATH_ENV: &str = "SYSTEM_STATS_CONFIG";

#[cfg(windows)]
const DEFAULT_OS_DRIVE: &str = "C";
#[cfg(windows)]
const DEFAULT_DATA_DRIVE: &str = "D";
#[cfg(not(windows))]
const DEFAULT_OS_DRIVE: &str = "/";
#[cfg(not(windows))]
const DEFAULT_DATA_DRIVE: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStatsConfig {
    pub short_term_cpu_window_seconds: u32,  // Default: 5
    pub medium_term_cpu_window_seconds: u32, // Default: 30
    pub long_term_cpu_window_seconds: u32,   // Default: 300

    // Drive letters ("C", "D:") on Windows, mount points elsewhere
    pub os_drive: Option<String>,   // Default: platform fallback
    pub data_drive: Option<String>, // Default: platform fallback
}

impl Default for SystemStatsConfig {
    fn default() -> Self {
        SystemStatsConfig {
            short_term_cpu_window_seconds: 5,
            medium_term_cpu_window_seconds: 30,
            long_term_cpu_window_seconds: 300,
            os_drive: None,
            data_drive: None,
        }
    }
}

impl SystemStatsConfig {
    /// Window lengths in reporting order: short, medium, long.
    pub fn cpu_windows(&self) -> [u32; 3] {
        [
            self.short_term_cpu_window_seconds,
            self.medium_term_cpu_window_seconds,
            self.long_term_cpu_window_seconds,
        ]
    }

    pub fn os_drive(&self) -> String {
        resolve_drive(self.os_drive.as_deref(), DEFAULT_OS_DRIVE)
    }

    pub fn data_drive(&self) -> String {
        resolve_drive(self.data_drive.as_deref(), DEFAULT_DATA_DRIVE)
    }

    pub fn validate(&self) -> Result<()> {
        for seconds in self.cpu_windows() {
            if seconds == 0 {
                return Err(StatsError::InvalidWindow(seconds));
            }
        }
        Ok(())
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: SystemStatsConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| StatsError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Loads from `$SYSTEM_STATS_CONFIG`, then the per-user config file, then defaults.
    /// An explicitly named file that cannot be read is an error; a missing default file is not.
    pub fn load_or_default() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Self::load(Path::new(&path));
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("system-stats");
    path.push("config.json");
    Some(path)
}

fn resolve_drive(configured: Option<&str>, fallback: &str) -> String {
    let trimmed = configured.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return fallback.to_string();
    }
    match windows_drive_letter(trimmed) {
        Some(letter) => letter.to_string(),
        None => trimmed.to_string(),
    }
}

/// Recognises `C`, `c:` and `C:\` style drive specs.
pub(crate) fn windows_drive_letter(spec: &str) -> Option<char> {
    let mut chars = spec.chars();
    let letter = chars.next().filter(char::is_ascii_alphabetic)?;
    let rest = chars.as_str();
    if rest.is_empty() || rest == ":" || rest == ":\\" || rest == ":/" {
        Some(letter.to_ascii_uppercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_valid() {
        let config = SystemStatsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cpu_windows(), [5, 30, 300]);
        assert_eq!(config.os_drive(), DEFAULT_OS_DRIVE);
        assert_eq!(config.data_drive(), DEFAULT_DATA_DRIVE);
    }

    #[test]
    fn drive_specs_normalise_to_letters() {
        let config = SystemStatsConfig {
            os_drive: Some("c:\\".into()),
            data_drive: Some("e".into()),
            ..Default::default()
        };
        assert_eq!(config.os_drive(), "C");
        assert_eq!(config.data_drive(), "E");
    }

    #[test]
    fn blank_drive_falls_back() {
        let config = SystemStatsConfig {
            os_drive: Some("   ".into()),
            data_drive: Some("/srv/data".into()),
            ..Default::default()
        };
        assert_eq!(config.os_drive(), DEFAULT_OS_DRIVE);
        assert_eq!(config.data_drive(), "/srv/data");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            SystemStatsConfig::from_json(r#"{ "short_term_cpu_window_seconds": 2 }"#).unwrap();
        assert_eq!(config.cpu_windows(), [2, 30, 300]);
        assert!(config.os_drive.is_none());
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = SystemStatsConfig::from_json(r#"{ "long_term_cpu_window_seconds": 0 }"#)
            .unwrap_err();
        assert!(matches!(err, StatsError::InvalidWindow(0)));
    }

    #[test]
    fn load_reads_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "medium_term_cpu_window_seconds": 12, "data_drive": "D" }}"#
        )
        .unwrap();

        let config = SystemStatsConfig::load(file.path()).unwrap();
        assert_eq!(config.medium_term_cpu_window_seconds, 12);
        assert_eq!(config.data_drive(), "D");
    }

    #[test]
    fn load_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        match SystemStatsConfig::load(&missing) {
            Err(StatsError::ConfigIo { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected ConfigIo, got {:?}", other),
        }
    }
}
