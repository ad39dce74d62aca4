//! Per-project sync lock.
//!
//! A real sync pass holds `.docket/sync.lock` for its whole run. The file
//! carries the holder's pid so a lock left by a crashed process can be told
//! apart from a pass that is still running.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use docket_config::PROJECT_DIR;

const LOCK_FILE: &str = "sync.lock";
const WAIT_LIMIT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Held sync lock; the file is removed on drop.
#[derive(Debug)]
pub struct SyncLock {
    path: PathBuf,
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        if let Err(error) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), %error, "failed to remove sync lock");
        }
    }
}

/// What an existing lock file says about its holder.
#[derive(Debug, PartialEq, Eq)]
enum Holder {
    Running(u32),
    Gone(u32),
    /// Empty or unparsable; the holder may still be writing its pid.
    Unknown,
}

/// Take the sync lock for `project_root`, waiting up to a minute for a
/// running pass to finish. Locks whose holder has exited are reclaimed.
pub async fn acquire_for_project(project_root: &Path) -> anyhow::Result<SyncLock> {
    let path = project_root.join(PROJECT_DIR).join(LOCK_FILE);
    let deadline = Instant::now() + WAIT_LIMIT;

    loop {
        if let Some(lock) = try_create(&path)
            .with_context(|| format!("failed to create sync lock {}", path.display()))?
        {
            return Ok(lock);
        }

        match inspect(&path) {
            Holder::Gone(pid) => {
                tracing::info!(pid, path = %path.display(), "reclaiming sync lock from exited process");
                match std::fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(e).with_context(|| {
                            format!("failed to remove stale sync lock {}", path.display())
                        });
                    }
                }
                continue;
            }
            Holder::Running(pid) if Instant::now() >= deadline => {
                anyhow::bail!("another docket sync (pid {pid}) still holds {}", path.display());
            }
            Holder::Unknown if Instant::now() >= deadline => {
                anyhow::bail!(
                    "sync lock {} has no readable pid; delete it if no docket sync is running",
                    path.display()
                );
            }
            Holder::Running(pid) => tracing::debug!(pid, "sync lock busy; waiting"),
            Holder::Unknown => tracing::debug!("sync lock has no pid yet; waiting"),
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Create the lock file and record our pid. `None` if it already exists.
fn try_create(path: &Path) -> io::Result<Option<SyncLock>> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => return Err(e),
    };
    let lock = SyncLock {
        path: path.to_path_buf(),
    };
    // On failure `lock` drops and removes the half-written file.
    writeln!(file, "{}", std::process::id())?;
    file.sync_all()?;
    Ok(Some(lock))
}

fn inspect(path: &Path) -> Holder {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return Holder::Unknown;
    };
    match contents.trim().parse::<u32>() {
        Ok(pid) if pid_alive(pid) => Holder::Running(pid),
        Ok(pid) => Holder::Gone(pid),
        Err(_) => Holder::Unknown,
    }
}

fn pid_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn lock_path(root: &Path) -> PathBuf {
        root.join(PROJECT_DIR).join(LOCK_FILE)
    }

    #[test]
    fn lock_file_holds_our_pid_until_dropped() {
        let temp = tempfile::tempdir().unwrap();
        let path = lock_path(temp.path());

        let lock = try_create(&path).unwrap().expect("lock should be free");
        let pid = std::fs::read_to_string(&path).unwrap();
        assert_eq!(pid.trim(), std::process::id().to_string());

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn second_holder_sees_a_running_pass() {
        let temp = tempfile::tempdir().unwrap();
        let path = lock_path(temp.path());

        let _lock = try_create(&path).unwrap().expect("lock should be free");
        assert!(try_create(&path).unwrap().is_none());
        assert_eq!(inspect(&path), Holder::Running(std::process::id()));
    }

    #[test]
    fn empty_lock_file_is_unknown() {
        let temp = tempfile::tempdir().unwrap();
        let path = lock_path(temp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "").unwrap();

        assert_eq!(inspect(&path), Holder::Unknown);
    }

    #[tokio::test]
    async fn lock_from_an_exited_process_is_reclaimed() {
        let temp = tempfile::tempdir().unwrap();
        let path = lock_path(temp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        // Above the default pid_max; never a live process.
        std::fs::write(&path, "4194304\n").unwrap();

        let lock = acquire_for_project(temp.path()).await.unwrap();
        let pid = std::fs::read_to_string(&path).unwrap();
        assert_eq!(pid.trim(), std::process::id().to_string());
        drop(lock);
    }
}
