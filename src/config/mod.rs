use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "SmartNotes";
const APP_NAME: &str = "smart-notes";

pub const CONFIG_ENV: &str = "SMART_NOTES_CONFIG";
pub const DATA_ENV: &str = "SMART_NOTES_DATA";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load(&self.paths);
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths);
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub log_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let override_data = env::var(DATA_ENV).ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_dir = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        let log_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_dir.join("state"))
            .join("logs");

        Ok(Self {
            config_dir,
            config_file,
            database_path: data_dir.join("notes.db"),
            data_dir,
            log_dir,
        })
    }

    /// Every location under one root directory.
    pub fn rooted_at(root: &Path) -> Self {
        let config_dir = root.join("config");
        let data_dir = root.join("data");
        Self {
            config_file: config_dir.join("config.toml"),
            config_dir,
            database_path: data_dir.join("notes.db"),
            data_dir,
            log_dir: root.join("logs"),
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("smart-notes.log")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir, &self.log_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub theme: ThemeName,
    pub preview_lines: u16,
    pub storage: StorageOptions,
    pub search: SearchOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            theme: ThemeName::Dark,
            preview_lines: 2,
            storage: StorageOptions::default(),
            search: SearchOptions::default(),
        }
    }
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) {
        if self.storage.database_path.as_os_str().is_empty() {
            self.storage.database_path = paths.database_path.clone();
        }
        if self.storage.wal_autocheckpoint == 0 {
            tracing::warn!("wal_autocheckpoint of 0 disables checkpoints, using 1000");
            self.storage.wal_autocheckpoint = 1000;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    #[serde(skip)]
    pub database_path: PathBuf,
    /// Write notes to disk. When false every session starts empty.
    pub persist: bool,
    pub wal_autocheckpoint: u32,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            database_path: PathBuf::new(),
            persist: true,
            wal_autocheckpoint: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub highlight_matches: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            highlight_matches: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, std::hash::Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_run_writes_default_config() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted_at(temp.path());
        let loader = ConfigLoader::with_paths(paths.clone());

        let cfg = loader.load_or_init()?;
        assert!(paths.config_file.exists());
        assert_eq!(cfg.storage.database_path, paths.database_path);
        assert!(cfg.storage.persist);

        let reloaded = loader.load()?;
        assert_eq!(reloaded, cfg);
        Ok(())
    }

    #[test]
    fn partial_config_falls_back_to_defaults() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted_at(temp.path());
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            "theme = \"light\"\n[storage]\npersist = false\nwal_autocheckpoint = 0\n",
        )?;

        let cfg = ConfigLoader::with_paths(paths).load()?;
        assert_eq!(cfg.theme, ThemeName::Light);
        assert!(!cfg.storage.persist);
        assert_eq!(cfg.storage.wal_autocheckpoint, 1000);
        assert!(cfg.search.highlight_matches);
        assert_eq!(cfg.preview_lines, 2);
        Ok(())
    }

    #[test]
    fn invalid_toml_is_an_error() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted_at(temp.path());
        paths.ensure_directories()?;
        fs::write(&paths.config_file, "theme = [")?;
        assert!(ConfigLoader::with_paths(paths).load().is_err());
        Ok(())
    }
}
