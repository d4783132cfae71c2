//! Session records: "this user already authenticated from this shell".
//!
//! A record is keyed by the parent process (normally the interactive shell)
//! and the real user id. Staleness is the only invalidation path; nothing
//! ever deletes a record explicitly.

use nix::unistd::{geteuid, Pid, Uid};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, DirBuilder, OpenOptions},
    io::{self, Write},
    os::unix::fs::{DirBuilderExt, MetadataExt, OpenOptionsExt},
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::{debug, instrument};

pub const SESSION_DIR: &str = "/run/rdo";

pub trait SessionStore {
    /// True if a non-stale record exists for `(parent, uid)`. Never prompts.
    fn check(&self, parent: Pid, ttl: Duration, uid: Uid) -> bool;

    /// Create or refresh the record for `(parent, uid)` with the current time.
    ///
    /// # Errors
    /// Returns an error if the record could not be persisted. Callers treat
    /// that as "prompt again next time", never as a denial.
    fn record(&self, parent: Pid, ttl: Duration, uid: Uid) -> io::Result<()>;
}

pub trait Clock {
    fn now(&self) -> SystemTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct SessionRecord {
    uid: u32,
    parent: i32,
    /// Start time of the parent in clock ticks since boot; guards against
    /// the parent pid being reused by an unrelated process.
    parent_started: Option<u64>,
    verified_at_ms: u64,
}

/// One JSON file per `(uid, parent)` in a directory only the effective user
/// may write to. Writes go through a temp file and `rename`.
#[derive(Debug)]
pub struct FileSessionStore<C: Clock = SystemClock> {
    dir: PathBuf,
    clock: C,
}

impl FileSessionStore<SystemClock> {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(dir, SystemClock)
    }
}

impl<C: Clock> FileSessionStore<C> {
    pub fn with_clock(dir: impl Into<PathBuf>, clock: C) -> Self {
        Self {
            dir: dir.into(),
            clock,
        }
    }

    fn path_for(&self, parent: Pid, uid: Uid) -> PathBuf {
        self.dir.join(format!("{uid}-{parent}"))
    }

    fn read(&self, path: &Path) -> Option<SessionRecord> {
        if !dir_is_trusted(&self.dir) {
            debug!(dir = %self.dir.display(), "session directory is not trusted");
            return None;
        }

        let raw = fs::read(path).ok()?;
        serde_json::from_slice(&raw).ok()
    }
}

impl<C: Clock> SessionStore for FileSessionStore<C> {
    #[instrument(skip(self))]
    fn check(&self, parent: Pid, ttl: Duration, uid: Uid) -> bool {
        let Some(record) = self.read(&self.path_for(parent, uid)) else {
            return false;
        };

        if record.uid != uid.as_raw()
            || record.parent != parent.as_raw()
            || record.parent_started != process_start_time(parent)
        {
            debug!("session record belongs to a different process");
            return false;
        }

        let verified_at = UNIX_EPOCH + Duration::from_millis(record.verified_at_ms);

        // a timestamp from the future is as good as no timestamp
        match self.clock.now().duration_since(verified_at) {
            Ok(elapsed) => elapsed < ttl,
            Err(_) => false,
        }
    }

    #[instrument(skip(self))]
    fn record(&self, parent: Pid, ttl: Duration, uid: Uid) -> io::Result<()> {
        if ttl.is_zero() {
            return Ok(());
        }

        DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&self.dir)?;

        if !dir_is_trusted(&self.dir) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is writable by others", self.dir.display()),
            ));
        }

        let verified_at_ms = self
            .clock
            .now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
            .as_millis();

        let record = SessionRecord {
            uid: uid.as_raw(),
            parent: parent.as_raw(),
            parent_started: process_start_time(parent),
            verified_at_ms: u64::try_from(verified_at_ms)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
        };

        let target = self.path_for(parent, uid);
        let tmp = self
            .dir
            .join(format!(".{uid}-{parent}.{}.tmp", std::process::id()));

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&tmp)?;
        file.write_all(&serde_json::to_vec(&record)?)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &target).inspect_err(|_| {
            let _ = fs::remove_file(&tmp);
        })?;

        debug!(path = %target.display(), "session recorded");

        Ok(())
    }
}

fn dir_is_trusted(dir: &Path) -> bool {
    fs::symlink_metadata(dir).is_ok_and(|meta| {
        meta.is_dir() && meta.uid() == geteuid().as_raw() && meta.mode() & 0o022 == 0
    })
}

/// Field 22 of `/proc/<pid>/stat`, `None` where procfs is unavailable.
fn process_start_time(pid: Pid) -> Option<u64> {
    let stat = fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    // the command name may contain spaces and parentheses, skip past it
    let (_, rest) = stat.rsplit_once(')')?;
    rest.split_whitespace().nth(19)?.parse().ok()
}
