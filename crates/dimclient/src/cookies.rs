//! Session cookie jar with optional file persistence.
//!
//! The jar is shared with `reqwest` as its cookie provider, so every request
//! sends the stored cookies and every response's `Set-Cookie` headers land in
//! the jar. Persisting is explicit: the session manager calls
//! [`CookieJar::save`] after each successful login or probe.
//!
//! The file holds the JSON serialization of [`cookie_store::CookieStore`],
//! including session cookies, so a later process can resume the session.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, MutexGuard, PoisonError};

use cookie_store::CookieStore;
use reqwest_cookie_store::CookieStoreMutex;
use tracing::{debug, warn};

use crate::ClientError;

/// Name of the cookie carrying the server-side session.
pub const SESSION_COOKIE: &str = "session";

/// Where and how the jar is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieFile {
    /// Path of the cookie file.
    pub path: PathBuf,
    /// Umask installed while the file is written.
    pub umask: Option<u32>,
    /// When `false` the file is only read, never written.
    pub save_enabled: bool,
}

/// The cookies of one client session.
pub struct CookieJar {
    store: Arc<CookieStoreMutex>,
    file: Option<CookieFile>,
}

impl std::fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieJar")
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

impl CookieJar {
    /// Creates a jar, loading any cookies already stored in `file`.
    pub fn new(file: Option<CookieFile>) -> Self {
        let jar = Self {
            store: Arc::new(CookieStoreMutex::new(CookieStore::default())),
            file,
        };
        jar.load();
        jar
    }

    /// The provider handed to `reqwest::ClientBuilder::cookie_provider`.
    pub fn provider(&self) -> Arc<CookieStoreMutex> {
        Arc::clone(&self.store)
    }

    /// Returns the persistence settings, if any.
    pub fn file(&self) -> Option<&CookieFile> {
        self.file.as_ref()
    }

    fn lock(&self) -> MutexGuard<'_, CookieStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the jar's contents with the cookie file's.
    ///
    /// A missing or unreadable file leaves the jar as it is: no stored
    /// session is not an error.
    pub fn load(&self) {
        let Some(file) = &self.file else {
            return;
        };
        match read_store(&file.path) {
            Ok(Some(store)) => {
                *self.lock() = store;
                debug!(path = %file.path.display(), "loaded session cookies");
            }
            Ok(None) => debug!(path = %file.path.display(), "no cookie file yet"),
            Err(reason) => warn!(
                path = %file.path.display(),
                %reason,
                "ignoring unreadable cookie file"
            ),
        }
    }

    /// Writes all cookies to the cookie file.
    ///
    /// Does nothing when no file is configured or saving is disabled. When a
    /// umask is configured it is installed for the duration of the write and
    /// restored afterwards, also on failure. An existing file is brought down
    /// to the mode the umask allows, so a file first written without an
    /// override does not keep wider permission bits.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::CookieSave`] when the file cannot be written.
    pub fn save(&self) -> Result<(), ClientError> {
        let Some(file) = self.file.as_ref().filter(|file| file.save_enabled) else {
            return Ok(());
        };

        let store = self.lock();
        let _umask = file.umask.map(UmaskGuard::install);
        write_store(&store, &file.path, file.umask).map_err(|source| {
            ClientError::CookieSave {
                path: file.path.clone(),
                source,
            }
        })?;
        debug!(path = %file.path.display(), "saved session cookies");
        Ok(())
    }

    /// Removes the cookie `name` scoped to `domain` and `path`.
    ///
    /// Returns whether such a cookie existed.
    pub fn purge(&self, domain: &str, path: &str, name: &str) -> bool {
        let removed = self.lock().remove(domain, path, name).is_some();
        if removed {
            debug!(domain, path, name, "purged cookie");
        }
        removed
    }

    /// Returns `true` if a cookie `name` is held for `domain` and `path`.
    pub fn contains(&self, domain: &str, path: &str, name: &str) -> bool {
        self.lock().contains_any(domain, path, name)
    }
}

fn read_store(path: &Path) -> Result<Option<CookieStore>, String> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.to_string()),
    };
    cookie_store::serde::json::load_all(BufReader::new(file))
        .map(Some)
        .map_err(|e| e.to_string())
}

fn write_store(store: &CookieStore, path: &Path, umask: Option<u32>) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    if let Some(mask) = umask {
        restrict_mode(&file, mask)?;
    }
    let mut writer = BufWriter::new(file);
    cookie_store::serde::json::save_incl_expired_and_nonpersistent(store, &mut writer)
        .map_err(std::io::Error::other)?;
    writer.flush()
}

/// Narrows an already open cookie file to `0o666 & !mask` before any cookie
/// is written to it.
#[cfg(unix)]
fn restrict_mode(file: &File, mask: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(std::fs::Permissions::from_mode(0o666 & !mask))
}

#[cfg(not(unix))]
fn restrict_mode(_file: &File, _mask: u32) -> std::io::Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Umask scope
// ---------------------------------------------------------------------------

#[cfg(unix)]
use unix_umask::UmaskGuard;

#[cfg(unix)]
mod unix_umask {
    use std::sync::{Mutex, MutexGuard, PoisonError};

    /// Serializes umask swaps made by this crate; the umask is process-wide.
    static UMASK_LOCK: Mutex<()> = Mutex::new(());

    /// Installs a process umask and restores the previous one on drop.
    pub(crate) struct UmaskGuard {
        previous: libc::mode_t,
        // Released after `drop` has restored the previous mask.
        _lock: MutexGuard<'static, ()>,
    }

    impl UmaskGuard {
        pub(crate) fn install(mask: u32) -> Self {
            let lock = UMASK_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            // SAFETY: umask(2) cannot fail and only swaps the file-creation mask.
            let previous = unsafe { libc::umask(mask as libc::mode_t) };
            Self {
                previous,
                _lock: lock,
            }
        }
    }

    impl Drop for UmaskGuard {
        fn drop(&mut self) {
            // SAFETY: see `install`.
            unsafe {
                libc::umask(self.previous);
            }
        }
    }
}

#[cfg(not(unix))]
struct UmaskGuard;

#[cfg(not(unix))]
impl UmaskGuard {
    fn install(mask: u32) -> Self {
        tracing::warn!(mask, "cookie umask is not supported on this platform; ignoring");
        Self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jar_at(path: &Path) -> CookieJar {
        CookieJar::new(Some(CookieFile {
            path: path.to_path_buf(),
            umask: None,
            save_enabled: true,
        }))
    }

    fn set_cookie(jar: &CookieJar, header: &str, url: &str) {
        let url = reqwest::Url::parse(url).unwrap();
        jar.lock().parse(header, &url).unwrap();
    }

    #[test]
    fn missing_file_means_empty_jar() {
        let dir = tempfile::tempdir().unwrap();
        let jar = jar_at(&dir.path().join("absent.cookie"));
        assert!(!jar.contains("dim.example", "/", SESSION_COOKIE));
    }

    #[test]
    fn corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.cookie");
        std::fs::write(&path, "#LWP-Cookies-2.0\nnot json at all").unwrap();

        let jar = jar_at(&path);
        assert!(!jar.contains("dim.example", "/", SESSION_COOKIE));
    }

    #[test]
    fn saved_session_cookie_is_restored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.cookie");

        let jar = jar_at(&path);
        set_cookie(&jar, "session=abc123; Path=/", "http://dim.example/login");
        jar.save().unwrap();

        let restored = jar_at(&path);
        assert!(restored.contains("dim.example", "/", SESSION_COOKIE));
    }

    #[test]
    fn purge_only_touches_the_named_cookie() {
        let jar = CookieJar::new(None);
        set_cookie(&jar, "session=abc123; Path=/", "http://dim.example/login");
        set_cookie(&jar, "theme=dark; Path=/", "http://dim.example/login");

        assert!(jar.purge("dim.example", "/", SESSION_COOKIE));
        assert!(!jar.contains("dim.example", "/", SESSION_COOKIE));
        assert!(jar.contains("dim.example", "/", "theme"));
        assert!(!jar.purge("dim.example", "/", SESSION_COOKIE));
    }

    #[test]
    fn save_without_file_or_when_disabled_writes_nothing() {
        assert!(CookieJar::new(None).save().is_ok());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readonly.cookie");
        let jar = CookieJar::new(Some(CookieFile {
            path: path.clone(),
            umask: None,
            save_enabled: false,
        }));
        set_cookie(&jar, "session=abc123; Path=/", "http://dim.example/login");
        jar.save().unwrap();
        assert!(!path.exists());
    }
}
