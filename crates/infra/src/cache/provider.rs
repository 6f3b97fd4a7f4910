//! Pluggable entry providers materialising cache artifacts.
//!
//! A provider owns the question "given a key, how does its artifact come to
//! exist inside the cache directory". Both built-in providers stage under
//! `<cacheDir>/<key>-tmp` and atomically rename to `<cacheDir>/<key>` so the
//! engine only ever observes fully materialised entries.
//!
//! Providers are bound to their cache filesystem and directory after
//! construction; the engine refuses stores until both hooks have succeeded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use groundwork_common::error::context::ensure_live;
use groundwork_common::error::{status, Error, ErrorKind, Result};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use crate::errors::IntoCanonical;
use crate::http::HttpClient;

use super::fs::CacheFilesystem;

/// Source of cache artifacts.
#[async_trait]
pub trait EntryProvider: Send + Sync {
    /// Bind the filesystem the cache stores artifacts in.
    fn set_cache_filesystem(&mut self, fs: Arc<dyn CacheFilesystem>);

    /// Bind the directory the cache stores artifacts in.
    fn set_cache_dir(&mut self, dir: &Path) -> Result<()>;

    /// Materialise the artifact for `key` inside the cache directory,
    /// returning its final path.
    async fn fetch_entry(&self, token: &CancellationToken, key: &str) -> Result<PathBuf>;
}

/// Staging and final paths for a key, shared by both providers.
#[derive(Clone)]
struct Binding {
    fs: Arc<dyn CacheFilesystem>,
    dir: PathBuf,
}

impl Binding {
    fn staging_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}-tmp"))
    }

    fn final_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

/// Helper holding the optional hooks until both have been supplied.
#[derive(Default)]
struct BindingSlot {
    fs: Option<Arc<dyn CacheFilesystem>>,
    dir: Option<PathBuf>,
}

impl BindingSlot {
    fn set_fs(&mut self, fs: Arc<dyn CacheFilesystem>) {
        self.fs = Some(fs);
    }

    fn set_dir(&mut self, dir: &Path) -> Result<()> {
        if dir.as_os_str().is_empty() {
            return Err(Error::new(ErrorKind::Undefined, "cache directory is not set"));
        }
        self.dir = Some(dir.to_path_buf());
        Ok(())
    }

    fn bound(&self) -> Result<Binding> {
        let fs = self.fs.clone().ok_or_else(|| {
            Error::new(ErrorKind::Undefined, "entry provider has no cache filesystem")
        })?;
        let dir = self.dir.clone().ok_or_else(|| {
            Error::new(ErrorKind::Undefined, "entry provider has no cache directory")
        })?;
        Ok(Binding { fs, dir })
    }
}

/// Provider copying artifacts from a source filesystem location.
pub struct FilesystemProvider {
    source_fs: Arc<dyn CacheFilesystem>,
    base_path: PathBuf,
    binding: BindingSlot,
}

impl FilesystemProvider {
    /// Provider serving `<base_path>/<key>` from `source_fs`.
    pub fn new(source_fs: Arc<dyn CacheFilesystem>, base_path: impl Into<PathBuf>) -> Self {
        Self { source_fs, base_path: base_path.into(), binding: BindingSlot::default() }
    }
}

#[async_trait]
impl EntryProvider for FilesystemProvider {
    fn set_cache_filesystem(&mut self, fs: Arc<dyn CacheFilesystem>) {
        self.binding.set_fs(fs);
    }

    fn set_cache_dir(&mut self, dir: &Path) -> Result<()> {
        self.binding.set_dir(dir)
    }

    #[instrument(skip(self, token))]
    async fn fetch_entry(&self, token: &CancellationToken, key: &str) -> Result<PathBuf> {
        let binding = self.binding.bound()?;
        ensure_live(token)?;

        let source = self.base_path.join(key);
        if !self.source_fs.exists(&source).await {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("source artifact missing: {}", source.display()),
            ));
        }

        let staging = binding.staging_path(key);
        let target = binding.final_path(key);

        if let Err(err) = binding.fs.copy(token, &source, &staging).await {
            let _ = binding.fs.remove_all(&staging).await;
            return Err(err);
        }
        binding.fs.rename(&staging, &target).await?;

        debug!(key, path = %target.display(), "materialised entry from source filesystem");
        Ok(target)
    }
}

impl std::fmt::Debug for FilesystemProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilesystemProvider").field("base_path", &self.base_path).finish()
    }
}

/// Provider fetching artifacts over HTTP with the resilient client.
pub struct RemoteProvider {
    client: HttpClient,
    endpoint: Url,
    binding: BindingSlot,
}

impl RemoteProvider {
    /// Provider issuing `GET <endpoint>/<key>` through `client`.
    ///
    /// The client's retry policy governs transient-failure handling; pass a
    /// retryable client to get it.
    pub fn new(client: HttpClient, endpoint: Url) -> Self {
        Self { client, endpoint, binding: BindingSlot::default() }
    }

    fn key_url(&self, key: &str) -> Result<Url> {
        self.endpoint.join(key).map_err(IntoCanonical::into_canonical)
    }
}

#[async_trait]
impl EntryProvider for RemoteProvider {
    fn set_cache_filesystem(&mut self, fs: Arc<dyn CacheFilesystem>) {
        self.binding.set_fs(fs);
    }

    fn set_cache_dir(&mut self, dir: &Path) -> Result<()> {
        self.binding.set_dir(dir)
    }

    #[instrument(skip(self, token))]
    async fn fetch_entry(&self, token: &CancellationToken, key: &str) -> Result<PathBuf> {
        let binding = self.binding.bound()?;
        ensure_live(token)?;

        let url = self.key_url(key)?;
        let response = self.client.request(token, reqwest::Method::GET, url, ()).await?;

        let status_code = response.status().as_u16();
        if let Some(err) = status::error_from_status(status_code, format!("fetching {key}").as_str())
        {
            return Err(err);
        }

        let staging = binding.staging_path(key);
        let target = binding.final_path(key);

        if let Err(err) = stream_to_staging(&binding, token, response, &staging).await {
            let _ = binding.fs.remove_all(&staging).await;
            return Err(err);
        }
        binding.fs.rename(&staging, &target).await?;

        debug!(key, path = %target.display(), "materialised entry from remote endpoint");
        Ok(target)
    }
}

impl std::fmt::Debug for RemoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteProvider").field("endpoint", &self.endpoint.as_str()).finish()
    }
}

async fn stream_to_staging(
    binding: &Binding,
    token: &CancellationToken,
    response: reqwest::Response,
    staging: &Path,
) -> Result<()> {
    let mut writer = binding.fs.open_writer(staging).await?;
    let mut stream = response.bytes_stream();
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                return Err(Error::new(ErrorKind::Cancelled, "download cancelled"));
            }
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    writer.write_all(&bytes).await.map_err(IntoCanonical::into_canonical)?;
                }
                Some(Err(err)) => return Err(err.into_canonical()),
                None => break,
            }
        }
    }
    writer.flush().await.map_err(IntoCanonical::into_canonical)?;
    Ok(())
}
