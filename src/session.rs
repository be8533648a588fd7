//! Per-run session context shared by the UI and the execution tasks.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use nix::unistd::{Uid, User, gethostname};
use uuid::Uuid;

use crate::jobs::JobTable;

#[derive(Clone, Debug)]
pub struct Session {
    /// Six hex digits, written to the log at startup.
    pub id: String,
    pub user: String,
    pub hostname: String,
    cwd: Arc<Mutex<PathBuf>>,
    pub jobs: JobTable,
}

impl Session {
    /// Session for the current user, starting in `cwd`.
    pub fn new(cwd: PathBuf) -> Self {
        let user = User::from_uid(Uid::current())
            .ok()
            .flatten()
            .map(|u| u.name)
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "unknown".to_string());
        let hostname = gethostname()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string());
        Self::with_identity(cwd, user, hostname)
    }

    pub fn with_identity(cwd: PathBuf, user: String, hostname: String) -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self {
            id: hex[..6].to_string(),
            user,
            hostname,
            cwd: Arc::new(Mutex::new(cwd)),
            jobs: JobTable::new(),
        }
    }

    pub fn cwd(&self) -> PathBuf {
        self.cwd.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_cwd(&self, dir: &Path) {
        *self.cwd.lock().unwrap_or_else(PoisonError::into_inner) = dir.to_path_buf();
    }

    /// Handle for tasks that update the directory after a command exits.
    pub fn cwd_handle(&self) -> Arc<Mutex<PathBuf>> {
        Arc::clone(&self.cwd)
    }

    /// `user@host`, shown in the prompt and the status bar.
    pub fn greeting(&self) -> String {
        format!("{}@{}", self.user, self.hostname)
    }

    /// Resolve a `cd` argument against the current directory.
    ///
    /// No argument means the home directory; a leading `~` is expanded.
    pub fn resolve_dir(&self, arg: Option<&str>) -> Option<PathBuf> {
        let path = match arg {
            None | Some("~") => dirs::home_dir()?,
            Some(a) if a.starts_with("~/") => dirs::home_dir()?.join(&a[2..]),
            Some(a) => self.cwd().join(a),
        };
        Some(path)
    }
}
