//! Individually failable filesystem mutations
//!
//! Every operation logs what it does and reports success as a `bool`; a
//! failure is logged as a [`contentsync_types::Error::FileOp`] and never
//! propagated. In speculative mode nothing touches disk and every operation
//! reports success.

use contentsync_types::{Error, Result};
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{debug, error, info, warn};

/// Primitive copy/delete/create operations used by the sync engine
#[derive(Debug, Clone, Copy)]
pub struct FileOps {
    speculative: bool,
    preserve_timestamps: bool,
}

impl Default for FileOps {
    fn default() -> Self {
        Self::new(false)
    }
}

impl FileOps {
    /// Create file operations, speculative when `speculative` is set
    pub fn new(speculative: bool) -> Self {
        Self {
            speculative,
            preserve_timestamps: true,
        }
    }

    /// Copy the source's modification time onto copied files
    pub fn with_preserve_timestamps(mut self, preserve_timestamps: bool) -> Self {
        self.preserve_timestamps = preserve_timestamps;
        self
    }

    /// Whether operations only log their intent
    pub fn is_speculative(&self) -> bool {
        self.speculative
    }

    /// Copy `source` over `destination`, creating parent directories
    pub async fn copy_file(&self, source: &Path, destination: &Path) -> bool {
        if self.speculative {
            info!("Would copy {} to {}", source.display(), destination.display());
            return true;
        }

        info!("Copy {} to {}", source.display(), destination.display());
        report(self.try_copy(source, destination).await)
    }

    /// Delete a file, succeeding if it is already gone
    pub async fn delete_file(&self, path: &Path) -> bool {
        if self.speculative {
            info!("Would delete {}", path.display());
            return true;
        }

        info!("Delete {}", path.display());
        report(Self::try_delete_file(path).await)
    }

    /// Create a directory and any missing parents
    pub async fn create_directory(&self, path: &Path) -> bool {
        if self.speculative {
            info!("Would create {}", path.display());
            return true;
        }

        info!("Create {}", path.display());
        report(
            fs::create_dir_all(path)
                .await
                .map_err(|e| Error::file_op("create directory", path, e.to_string())),
        )
    }

    /// Recursively delete a directory, succeeding if it is already gone
    pub async fn delete_directory(&self, path: &Path) -> bool {
        if self.speculative {
            info!("Would delete {}", path.display());
            return true;
        }

        info!("Delete {}", path.display());
        let result = match fs::remove_dir_all(path).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        };
        report(result.map_err(|e| Error::file_op("delete directory", path, e.to_string())))
    }

    async fn try_copy(&self, source: &Path, destination: &Path) -> Result<()> {
        let fail = |e: io::Error| {
            Error::file_op(
                "copy",
                source,
                format!("to {}: {}", destination.display(), e),
            )
        };

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await.map_err(fail)?;
        }
        fs::copy(source, destination).await.map_err(fail)?;

        if self.preserve_timestamps {
            if let Err(e) = copy_mtime(source, destination).await {
                warn!(
                    "Unable to preserve modification time on {}: {}",
                    destination.display(),
                    e
                );
            }
        }
        Ok(())
    }

    async fn try_delete_file(path: &Path) -> Result<()> {
        let fail = |e: io::Error| Error::file_op("delete", path, e.to_string());

        let metadata = match fs::symlink_metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} is already gone", path.display());
                return Ok(());
            }
            Err(e) => return Err(fail(e)),
        };

        clear_readonly(path, &metadata).await.map_err(fail)?;

        match fs::remove_file(path).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other.map_err(fail),
        }
    }
}

fn report(result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            error!("{}", e);
            false
        }
    }
}

async fn copy_mtime(source: &Path, destination: &Path) -> io::Result<()> {
    let modified = fs::metadata(source).await?.modified()?;
    filetime::set_file_mtime(destination, filetime::FileTime::from_system_time(modified))
}

#[cfg(windows)]
async fn clear_readonly(path: &Path, metadata: &std::fs::Metadata) -> io::Result<()> {
    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions).await?;
    }
    Ok(())
}

#[cfg(not(windows))]
#[allow(clippy::unused_async)]
async fn clear_readonly(_path: &Path, _metadata: &std::fs::Metadata) -> io::Result<()> {
    Ok(())
}
