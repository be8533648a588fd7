//! Config model, application directory and persistence helpers.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::screens::Mode;

/// Environment variable overriding the application directory.
pub const HOME_ENV: &str = "SYSH_HOME";

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Screen opened on top of the initial shell at startup.
    pub startup_screen: Mode,
    /// chrono format of the date in the header bar.
    pub date_format: String,
    /// chrono format of the time in the header bar.
    pub time_format: String,
    /// Seconds a status message stays visible.
    pub status_secs: u64,
    /// Pause between SIGINT and releasing the job slot.
    pub interrupt_grace_ms: u64,
    /// Lines kept per shell console.
    pub console_max_lines: usize,
    /// Used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Shell history file, relative to the application directory.
    pub shell_history_file: String,
    /// SQL history file, relative to the application directory.
    pub sql_history_file: String,
    /// Entries kept per history.
    pub history_max: usize,
}

impl Config {
    /// Load from disk or create defaults when missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            toml::from_str(&s).with_context(|| format!("invalid config {}", path.display()))
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Persist the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            startup_screen: Mode::Shell,
            date_format: "%d/%m/%Y".into(),
            time_format: "%H:%M:%S".into(),
            status_secs: 3,
            interrupt_grace_ms: 50,
            console_max_lines: 5000,
            log_level: "info".into(),
            shell_history_file: "history_cmd".into(),
            sql_history_file: "history_sql".into(),
            history_max: 1000,
        }
    }
}

/// Files inside the application directory.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub dir: PathBuf,
    pub config: PathBuf,
    pub shortcuts: PathBuf,
    pub log: PathBuf,
}

impl AppPaths {
    /// `$SYSH_HOME`, else `~/.sysh`. The directory is created if missing.
    pub fn resolve() -> Result<Self> {
        let dir = match std::env::var_os(HOME_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::home_dir()
                .ok_or_else(|| anyhow!("cannot locate the home directory"))?
                .join(".sysh"),
        };
        Self::in_dir(dir)
    }

    pub fn in_dir(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;
        Ok(Self {
            config: dir.join("config.toml"),
            shortcuts: dir.join("shortcuts.toml"),
            log: dir.join("sysh.log"),
            dir,
        })
    }

    pub fn shell_history(&self, cfg: &Config) -> PathBuf {
        self.dir.join(&cfg.shell_history_file)
    }

    pub fn sql_history(&self, cfg: &Config) -> PathBuf {
        self.dir.join(&cfg.sql_history_file)
    }
}
