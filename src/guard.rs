use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use uuid::Uuid;

/// How long an idle editing session keeps the desk
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("another user is currently connected")]
    Occupied,
    #[error("failed to open lock file {path}: {source}")]
    LockFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The editing session currently holding the desk
#[derive(Debug)]
struct ActiveSession {
    token: String,
    expires_at: SystemTime,
    pending_barcode: Option<String>,
    // Closing the file releases the OS lock
    _lock: File,
}

/// Outcome of a successful [`SessionGuard::enter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub token: String,
    pub fresh: bool,
}

/// Single-editor lease over the backing file
///
/// A session is identified by a random token and expires after `ttl` without
/// activity. While a session is active the guard holds an exclusive lock on
/// the lock file, so a second process using the same backing file is turned
/// away as well.
#[derive(Debug)]
pub struct SessionGuard {
    lock_path: PathBuf,
    ttl: Duration,
    active: Option<ActiveSession>,
}

impl SessionGuard {
    pub fn new(lock_path: impl Into<PathBuf>, ttl: Duration) -> Self {
        SessionGuard {
            lock_path: lock_path.into(),
            ttl,
            active: None,
        }
    }

    /// Guard whose lock file sits next to `data_file`
    pub fn for_data_file(data_file: &Path, ttl: Duration) -> Self {
        let mut lock_path = data_file.as_os_str().to_owned();
        lock_path.push(".lock");
        SessionGuard::new(PathBuf::from(lock_path), ttl)
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// True while a live session holds the desk
    pub fn is_held(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|s| s.expires_at > SystemTime::now())
    }

    /// Admit the caller, starting a session if none is live
    ///
    /// # Arguments
    /// * `token` - The caller's session token, if it has one
    ///
    /// # Returns
    /// * `Result<Admission, GuardError>` - The token to use from now on, and
    ///   whether a new session was started
    ///
    /// # Errors
    /// * `GuardError::Occupied` if another live session holds the desk, in
    ///   this process or another one
    pub fn enter(&mut self, token: Option<&str>) -> Result<Admission, GuardError> {
        let now = SystemTime::now();

        if let Some(session) = self.active.as_mut() {
            if session.expires_at > now {
                if token == Some(session.token.as_str()) {
                    session.expires_at = now + self.ttl;
                    return Ok(Admission {
                        token: session.token.clone(),
                        fresh: false,
                    });
                }
                return Err(GuardError::Occupied);
            }
        }

        if self.active.take().is_some() {
            log::info!("editing session expired, releasing the desk");
        }

        let lock = self.acquire_lock()?;
        let token = Uuid::new_v4().to_string();
        log::info!("editing session started");

        self.active = Some(ActiveSession {
            token: token.clone(),
            expires_at: now + self.ttl,
            pending_barcode: None,
            _lock: lock,
        });

        Ok(Admission { token, fresh: true })
    }

    /// Release the desk held by `token`
    ///
    /// Returns whether a session was actually ended.
    pub fn end(&mut self, token: Option<&str>) -> Result<bool, GuardError> {
        let Some(session) = &self.active else {
            return Ok(false);
        };
        let owned = token == Some(session.token.as_str());
        let expired = session.expires_at <= SystemTime::now();

        if owned {
            self.active = None;
            log::info!("editing session ended");
            return Ok(true);
        }
        if expired {
            self.active = None;
            log::info!("editing session expired, releasing the desk");
            return Ok(false);
        }
        Err(GuardError::Occupied)
    }

    /// Barcode generated in the current session and not yet issued
    pub fn pending_barcode(&self) -> Option<&str> {
        self.active.as_ref()?.pending_barcode.as_deref()
    }

    pub fn set_pending_barcode(&mut self, barcode: String) {
        if let Some(session) = self.active.as_mut() {
            session.pending_barcode = Some(barcode);
        }
    }

    pub fn take_pending_barcode(&mut self) -> Option<String> {
        self.active.as_mut()?.pending_barcode.take()
    }

    fn acquire_lock(&self) -> Result<File, GuardError> {
        if let Some(parent) = self.lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| GuardError::LockFile {
                    path: self.lock_path.clone(),
                    source,
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|source| GuardError::LockFile {
                path: self.lock_path.clone(),
                source,
            })?;

        if let Err(e) = file.try_lock_exclusive() {
            log::warn!(
                "lock {} is held elsewhere: {}",
                self.lock_path.display(),
                e
            );
            return Err(GuardError::Occupied);
        }

        Ok(file)
    }
}
