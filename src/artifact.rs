use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::utils::{Error, Result};

/// Whether an artifact may replace what is already on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WritePolicy {
    /// Leave any existing entry alone. Used for everything users customise.
    #[default]
    CreateIfAbsent,
    /// Replace the file so it always reflects the current parameters.
    AlwaysOverwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Overwritten,
    Skipped,
}

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub content: String,
    pub policy: WritePolicy,
    pub executable: bool,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>, policy: WritePolicy) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            policy,
            executable: false,
        }
    }

    pub fn executable(mut self) -> Self {
        self.executable = true;
        self
    }

    pub fn write(&self) -> Result<WriteOutcome> {
        let outcome = write(&self.path, &self.content, self.policy)?;
        if self.executable && outcome != WriteOutcome::Skipped {
            set_mode(&self.path, 0o755)?;
        }
        Ok(outcome)
    }
}

/// Creates `path` and any missing parents.
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::create_dir_all(path).map_err(|err| Error::file_write(path, err))
}

/// Writes `content` to `path` according to `policy`. Parent directories must
/// already exist.
pub fn write(path: impl AsRef<Path>, content: &str, policy: WritePolicy) -> Result<WriteOutcome> {
    let path = path.as_ref();
    match policy {
        WritePolicy::CreateIfAbsent => create_if_absent(path, content),
        WritePolicy::AlwaysOverwrite => overwrite(path, content),
    }
}

fn create_if_absent(path: &Path, content: &str) -> Result<WriteOutcome> {
    if fs::symlink_metadata(path).is_ok() {
        debug!(path = %path.display(), "exists, skipping");
        return Ok(WriteOutcome::Skipped);
    }
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "appeared concurrently, skipping");
            return Ok(WriteOutcome::Skipped);
        }
        Err(err) => return Err(Error::file_write(path, err)),
    };
    file.write_all(content.as_bytes())
        .map_err(|err| Error::file_write(path, err))?;
    debug!(path = %path.display(), "created");
    Ok(WriteOutcome::Created)
}

// Content goes to a sibling temporary file first, so an interrupted run
// never leaves a half-written file behind.
fn overwrite(path: &Path, content: &str) -> Result<WriteOutcome> {
    let existed = fs::symlink_metadata(path).is_ok();
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut file = NamedTempFile::new_in(parent).map_err(|err| Error::file_write(path, err))?;
    file.write_all(content.as_bytes())
        .map_err(|err| Error::file_write(path, err))?;
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt as _;
        file.as_file()
            .set_permissions(Permissions::from_mode(0o644))
            .map_err(|err| Error::file_write(path, err))?;
    }
    file.persist(path)
        .map_err(|err| Error::file_write(path, err.error))?;
    debug!(path = %path.display(), existed, "written");
    Ok(if existed {
        WriteOutcome::Overwritten
    } else {
        WriteOutcome::Created
    })
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt as _;
    fs::set_permissions(path, Permissions::from_mode(mode))
        .map_err(|err| Error::file_write(path, err))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
