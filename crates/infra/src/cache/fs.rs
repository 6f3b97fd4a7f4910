//! Filesystem capability consumed by the cache.
//!
//! The engine and the providers never touch `tokio::fs` directly; they go
//! through [`CacheFilesystem`] so tests and embedders can substitute their
//! own storage. [`LocalFilesystem`] is the production implementation.
//!
//! Copies preserve the artifact type (a file copies to a file, a directory
//! tree copies recursively) and check the cancellation token between
//! entries so a cancelled operation stops promptly without leaving a partial
//! destination in a finalised location (staging paths are the caller's to
//! clean).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use groundwork_common::error::context::ensure_live;
use groundwork_common::error::{Error, ErrorKind, Result};
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::IntoCanonical;

/// Capability interface over the storage the cache lives in.
#[async_trait]
pub trait CacheFilesystem: Send + Sync {
    /// Whether a path exists.
    async fn exists(&self, path: &Path) -> bool;

    /// Whether a path is a directory.
    async fn is_dir(&self, path: &Path) -> bool;

    /// Create a directory and its missing parents.
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Copy a file or directory tree, preserving its type.
    async fn copy(&self, token: &CancellationToken, src: &Path, dst: &Path) -> Result<()>;

    /// Atomically rename a path.
    async fn rename(&self, src: &Path, dst: &Path) -> Result<()>;

    /// Remove a file or directory tree. Missing paths are a silent success.
    async fn remove_all(&self, path: &Path) -> Result<()>;

    /// Forced recursive removal used as a last-resort cleanup fallback.
    ///
    /// Clears read-only permission bits along the way where the platform
    /// allows it.
    async fn remove_all_forced(&self, path: &Path) -> Result<()>;

    /// Create a uniquely named temporary directory under `parent`.
    async fn make_temp_dir(&self, parent: &Path, prefix: &str) -> Result<PathBuf>;

    /// Open a writer to a new file, truncating any existing content.
    async fn open_writer(&self, path: &Path) -> Result<Box<dyn AsyncWrite + Send + Unpin>>;
}

/// Production [`CacheFilesystem`] over the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

#[async_trait]
impl CacheFilesystem for LocalFilesystem {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn is_dir(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.map(|meta| meta.is_dir()).unwrap_or(false)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path).await.map_err(IntoCanonical::into_canonical)
    }

    async fn copy(&self, token: &CancellationToken, src: &Path, dst: &Path) -> Result<()> {
        ensure_live(token)?;
        let meta = tokio::fs::metadata(src).await.map_err(IntoCanonical::into_canonical)?;
        if meta.is_dir() {
            copy_tree(token, src.to_path_buf(), dst.to_path_buf()).await
        } else {
            copy_file(src, dst).await
        }
    }

    async fn rename(&self, src: &Path, dst: &Path) -> Result<()> {
        tokio::fs::rename(src, dst).await.map_err(IntoCanonical::into_canonical)
    }

    async fn remove_all(&self, path: &Path) -> Result<()> {
        if !self.exists(path).await {
            return Ok(());
        }
        let result = if self.is_dir(path).await {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into_canonical()),
        }
    }

    async fn remove_all_forced(&self, path: &Path) -> Result<()> {
        if let Err(err) = restore_write_permissions(path).await {
            debug!(path = %path.display(), error = %err, "could not relax permissions");
        }
        self.remove_all(path).await
    }

    async fn make_temp_dir(&self, parent: &Path, prefix: &str) -> Result<PathBuf> {
        self.create_dir_all(parent).await?;
        for _ in 0..16 {
            let candidate = parent.join(format!("{prefix}{:08x}", rand::random::<u32>()));
            match tokio::fs::create_dir(&candidate).await {
                Ok(()) => return Ok(candidate),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into_canonical()),
            }
        }
        Err(Error::new(ErrorKind::Unexpected, "could not allocate a temporary directory"))
    }

    async fn open_writer(&self, path: &Path) -> Result<Box<dyn AsyncWrite + Send + Unpin>> {
        let file = tokio::fs::File::create(path).await.map_err(IntoCanonical::into_canonical)?;
        Ok(Box::new(file))
    }
}

async fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    tokio::fs::copy(src, dst).await.map_err(IntoCanonical::into_canonical)?;
    Ok(())
}

/// Recursive directory copy with a cancellation check per entry.
fn copy_tree(
    token: &CancellationToken,
    src: PathBuf,
    dst: PathBuf,
) -> futures::future::BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        ensure_live(token)?;
        tokio::fs::create_dir_all(&dst).await.map_err(IntoCanonical::into_canonical)?;

        let mut entries =
            tokio::fs::read_dir(&src).await.map_err(IntoCanonical::into_canonical)?;
        while let Some(entry) =
            entries.next_entry().await.map_err(IntoCanonical::into_canonical)?
        {
            ensure_live(token)?;
            let target = dst.join(entry.file_name());
            let kind = entry.file_type().await.map_err(IntoCanonical::into_canonical)?;
            if kind.is_dir() {
                copy_tree(token, entry.path(), target).await?;
            } else {
                copy_file(&entry.path(), &target).await?;
            }
        }
        Ok(())
    })
}

#[cfg(unix)]
async fn restore_write_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let meta = tokio::fs::metadata(path).await?;
    let mut perms = meta.permissions();
    perms.set_mode(perms.mode() | 0o700);
    tokio::fs::set_permissions(path, perms).await
}

#[cfg(not(unix))]
async fn restore_write_permissions(path: &Path) -> std::io::Result<()> {
    let meta = tokio::fs::metadata(path).await?;
    let mut perms = meta.permissions();
    perms.set_readonly(false);
    tokio::fs::set_permissions(path, perms).await
}
