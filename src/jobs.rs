//! Table of running external commands, one slot per screen.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use thiserror::Error;

use crate::screens::ScreenId;

/// A command that was submitted in a screen and has not been released yet.
#[derive(Clone, Debug)]
pub struct Job {
    pub command: String,
    /// Known once the process is spawned. Also its process group id.
    pub pid: Option<u32>,
    pub started: Instant,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("command already running in this screen")]
    Busy,
    #[error("No command running")]
    NotRunning,
    #[error("command is still starting")]
    Starting,
    #[error("cannot signal process group {pgid}: {source}")]
    Signal { pgid: u32, source: Errno },
}

/// Shared between the UI thread and the execution tasks.
#[derive(Clone, Debug, Default)]
pub struct JobTable {
    inner: Arc<Mutex<HashMap<ScreenId, Job>>>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ScreenId, Job>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the slot of `screen` before spawning. Fails if it is taken.
    pub fn reserve(&self, screen: &ScreenId, command: &str) -> Result<(), JobError> {
        let mut jobs = self.lock();
        if jobs.contains_key(screen) {
            return Err(JobError::Busy);
        }
        jobs.insert(
            screen.clone(),
            Job {
                command: command.to_string(),
                pid: None,
                started: Instant::now(),
            },
        );
        Ok(())
    }

    /// Record the pid of a spawned process.
    ///
    /// Returns `false` when the slot was released meanwhile (the screen was
    /// closed or the command interrupted while starting); the caller then
    /// owns an untracked process.
    pub fn attach_pid(&self, screen: &ScreenId, pid: u32) -> bool {
        match self.lock().get_mut(screen) {
            Some(job) if job.pid.is_none() => {
                job.pid = Some(pid);
                true
            }
            _ => false,
        }
    }

    /// Free the slot of `screen`.
    ///
    /// With `Some(pid)` the slot is only freed if it still tracks that
    /// process, so a late release never clears a newer command.
    pub fn release(&self, screen: &ScreenId, pid: Option<u32>) -> Option<Job> {
        let mut jobs = self.lock();
        let matches = match (jobs.get(screen), pid) {
            (Some(job), Some(pid)) => job.pid == Some(pid),
            (Some(_), None) => true,
            (None, _) => false,
        };
        if matches { jobs.remove(screen) } else { None }
    }

    pub fn get(&self, screen: &ScreenId) -> Option<Job> {
        self.lock().get(screen).cloned()
    }

    pub fn is_running(&self, screen: &ScreenId) -> bool {
        self.lock().contains_key(screen)
    }

    /// Run `reap` under the table lock and, if it reports an exit, free the
    /// slot of `screen` when it still tracks `pid`.
    ///
    /// Signals are also sent under the lock, so a process group is never
    /// signalled after its leader was reaped and the pgid could be reused.
    pub fn reap_with<T>(
        &self,
        screen: &ScreenId,
        pid: u32,
        reap: impl FnOnce() -> Option<T>,
    ) -> Option<T> {
        let mut jobs = self.lock();
        let exited = reap()?;
        if jobs.get(screen).is_some_and(|job| job.pid == Some(pid)) {
            jobs.remove(screen);
        }
        Some(exited)
    }

    /// Send SIGINT to the process group of the command running in `screen`.
    pub fn interrupt(&self, screen: &ScreenId) -> Result<u32, JobError> {
        let jobs = self.lock();
        match jobs.get(screen) {
            None => Err(JobError::NotRunning),
            Some(Job { pid: None, .. }) => Err(JobError::Starting),
            Some(Job { pid: Some(pid), .. }) => {
                signal_group(*pid)?;
                Ok(*pid)
            }
        }
    }

    /// SIGINT to every tracked command; returns how many groups were signalled.
    pub fn interrupt_all(&self) -> usize {
        let jobs = self.lock();
        let mut signalled = 0;
        for (screen, job) in jobs.iter() {
            let Some(pid) = job.pid else { continue };
            match signal_group(pid) {
                Ok(()) => signalled += 1,
                Err(e) => tracing::warn!("screen {screen}: {e}"),
            }
        }
        signalled
    }
}

/// SIGINT to every process in group `pgid`.
pub fn signal_group(pgid: u32) -> Result<(), JobError> {
    let raw = i32::try_from(pgid).map_err(|_| JobError::Signal {
        pgid,
        source: Errno::EINVAL,
    })?;
    killpg(Pid::from_raw(raw), Signal::SIGINT).map_err(|source| JobError::Signal { pgid, source })?;
    tracing::info!("SIGINT sent to process group {pgid}");
    Ok(())
}
