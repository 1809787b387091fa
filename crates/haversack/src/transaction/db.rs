use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{Error, Result};

/// Key under which the originating repository is stored.
pub const KEY_FROM_REPO: &str = "from_repo";
/// Key under which the installing user id is stored.
pub const KEY_INSTALLED_BY: &str = "installed_by";
/// Key under which the install reason (`user`/`dep`/`clean`) is stored.
pub const KEY_REASON: &str = "reason";
/// Key under which the release version at install time is stored.
pub const KEY_RELEASEVER: &str = "releasever";

const VALID_KEYS: &[&str] = &[KEY_FROM_REPO, KEY_INSTALLED_BY, KEY_REASON, KEY_RELEASEVER];

/// The out-of-band per-package attribute store consulted for reason
/// propagation. Rows are addressed by the package identity string; the
/// key namespace is fixed to the four `KEY_*` constants.
pub trait ReasonStore {
    /// Reads one attribute.
    fn get_string(&self, package_id: &str, key: &str) -> Result<Option<String>>;

    /// Writes one attribute.
    fn set_string(&mut self, package_id: &str, key: &str, value: &str) -> Result<()>;

    /// Deletes one attribute.
    fn remove(&mut self, package_id: &str, key: &str) -> Result<()>;

    /// Deletes the whole row for a package.
    fn remove_all(&mut self, package_id: &str) -> Result<()>;
}

fn check_key(key: &str) -> Result<()> {
    if VALID_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(Error::InternalError(format!("invalid reason store key '{key}'")))
    }
}

/// A filesystem-backed [`ReasonStore`]: one directory per package, one
/// file per key. The store can be disabled, in which case writes vanish
/// and reads find nothing.
#[derive(Debug)]
pub struct FileReasonStore {
    root: PathBuf,
    enabled: bool,
}

impl FileReasonStore {
    /// A store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> FileReasonStore {
        FileReasonStore {
            root: root.into(),
            enabled: true,
        }
    }

    /// Turns the store on or off.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn package_dir(&self, package_id: &str) -> PathBuf {
        // package ids contain '/'-free fields joined with ';'
        self.root.join(package_id.replace('/', "_"))
    }
}

impl ReasonStore for FileReasonStore {
    fn get_string(&self, package_id: &str, key: &str) -> Result<Option<String>> {
        check_key(key)?;
        if !self.enabled {
            return Ok(None);
        }
        let path = self.package_dir(package_id).join(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value.trim_end().to_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::FileInvalid(format!("{}: {e}", path.display()))),
        }
    }

    fn set_string(&mut self, package_id: &str, key: &str, value: &str) -> Result<()> {
        check_key(key)?;
        if !self.enabled {
            debug!(package_id, key, "reason store disabled, dropping write");
            return Ok(());
        }
        let dir = self.package_dir(package_id);
        fs::create_dir_all(&dir)
            .map_err(|e| Error::FileInvalid(format!("{}: {e}", dir.display())))?;
        let path = dir.join(key);
        fs::write(&path, value)
            .map_err(|e| Error::FileInvalid(format!("{}: {e}", path.display())))
    }

    fn remove(&mut self, package_id: &str, key: &str) -> Result<()> {
        check_key(key)?;
        if !self.enabled {
            return Ok(());
        }
        let path = self.package_dir(package_id).join(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::FileInvalid(format!("{}: {e}", path.display()))),
        }
    }

    fn remove_all(&mut self, package_id: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let dir = self.package_dir(package_id);
        if !dir.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&dir)
            .map_err(|e| Error::FileInvalid(format!("{}: {e}", dir.display())))
    }
}

/// Ensures `dir` exists; shared by the store and the driver's cache
/// cleanup.
pub(crate) fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| Error::FileInvalid(format!("{}: {e}", dir.display())))
}
