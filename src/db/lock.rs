use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const LOCK_FILE: &str = "LOCK";

/// Exclusive claim on a data directory, held for the lifetime of an engine.
///
/// The claim is a `LOCK` file created with `create_new`, so a second engine
/// on the same directory fails instead of overwriting live run files. The
/// file is removed on drop. A process that dies without dropping its engine
/// leaves the file behind and it must be deleted by hand.
pub(crate) struct DirLock {
    path: PathBuf,
}

impl DirLock {
    pub(crate) fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::warn!(dir = %dir.display(), "Data directory already locked");
                return Err(Error::DirectoryLocked(dir.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let lock = DirLock { path };
        writeln!(file, "{}", std::process::id())?;
        Ok(lock)
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove lock file");
        }
    }
}
