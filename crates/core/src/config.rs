use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_MAX_FILENAME_LEN: usize = 255;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Table => "table",
            Self::Json => "json",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub recursive_default: bool,
    pub include_hidden_default: bool,
    pub ignore_extension: bool,
    pub preserve_caps: bool,
    /// Names longer than this are skipped at commit time. `0` disables the check.
    pub max_filename_len: usize,
    pub output: OutputFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            recursive_default: false,
            include_hidden_default: false,
            ignore_extension: false,
            preserve_caps: false,
            max_filename_len: DEFAULT_MAX_FILENAME_LEN,
            output: OutputFormat::Table,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
    pub journal_path: PathBuf,
}

impl AppPaths {
    /// Paths rooted at an explicit directory.
    pub fn in_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            config_path: config_dir.join("config.toml"),
            journal_path: config_dir.join("last-rename.json"),
            config_dir,
        }
    }
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "namnbyte", "namnbyte")
        .context("could not resolve the OS config directory")?;
    Ok(AppPaths::in_dir(proj.config_dir()))
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&app_paths()?.config_path)
}

/// Reads a config file; a missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config = toml::from_str::<AppConfig>(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_to(config, &app_paths()?.config_path)
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory: {}", dir.display()))?;
    }
    let body = toml::to_string_pretty(config).context("failed to serialize config")?;
    fs::write(path, body)
        .with_context(|| format!("failed to write config file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().expect("tempdir");
        let config = load_config_from(&dir.path().join("config.toml")).expect("load");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_fills_remaining_fields() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "preserve_caps = true\noutput = \"json\"\n").expect("write");

        let config = load_config_from(&path).expect("load");
        assert!(config.preserve_caps);
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.max_filename_len, DEFAULT_MAX_FILENAME_LEN);
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().expect("tempdir");
        let paths = AppPaths::in_dir(dir.path().join("nested"));
        let config = AppConfig {
            recursive_default: true,
            max_filename_len: 80,
            ..AppConfig::default()
        };
        save_config_to(&config, &paths.config_path).expect("save");
        assert_eq!(load_config_from(&paths.config_path).expect("load"), config);
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "output = 3").expect("write");
        assert!(load_config_from(&path).is_err());
    }
}
