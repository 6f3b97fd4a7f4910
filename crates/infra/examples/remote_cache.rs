//! Example: serving remote artifacts through the file cache
//!
//! Wires the retryable HTTP client into a [`RemoteProvider`] feeding a
//! [`FileCache`], then stores one artifact and copies it out.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example remote_cache -- https://example.org/artifacts/ readme.txt
//! ```
//!
//! The first argument is the endpoint the provider GETs keys from, the
//! second the key to store and fetch.

use std::sync::Arc;
use std::time::Duration;

use groundwork_common::resilience::RetryPolicy;
use groundwork_infra::cache::{
    CacheConfig, FileCache, LocalFilesystem, RemoteProvider,
};
use groundwork_infra::http::{HttpClient, HttpClientConfig};
use tokio_util::sync::CancellationToken;
use url::Url;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let endpoint = args.next().unwrap_or_else(|| "https://example.org/".to_string());
    let key = args.next().unwrap_or_else(|| "index.html".to_string());

    println!("Remote cache example");
    println!("====================\n");
    println!("endpoint: {endpoint}");
    println!("key:      {key}\n");

    let workdir = tempfile::tempdir()?;
    let cache_dir = workdir.path().join("cache");
    let dest = workdir.path().join("out").join(&key);
    std::fs::create_dir_all(workdir.path().join("out"))?;

    let client = HttpClient::retryable(HttpClientConfig {
        retry: RetryPolicy::exponential(4, Duration::from_millis(250), Duration::from_secs(5)),
        ..HttpClientConfig::default()
    })?;
    let provider = RemoteProvider::new(client, Url::parse(&endpoint)?);

    let cache = FileCache::new(
        CacheConfig::builder(&cache_dir)
            .ttl(Duration::from_secs(300))
            .gc_period(Duration::from_secs(30))
            .build()?,
        Arc::new(LocalFilesystem),
        Box::new(provider),
    )
    .await?;

    let token = CancellationToken::new();

    match cache.store(&token, &key).await {
        Ok(()) => println!("stored {key} into {}", cache_dir.display()),
        Err(err) => {
            println!("store failed: {err}");
            cache.close().await?;
            return Ok(());
        }
    }

    cache.fetch(&token, &key, &LocalFilesystem, &dest).await?;
    let size = std::fs::metadata(&dest)?.len();
    println!("fetched {key} to {} ({size} bytes)", dest.display());

    // a second fetch is served from the cache and renews the entry
    cache.fetch(&token, &key, &LocalFilesystem, &dest).await?;
    println!("refetched {key} from cache");

    cache.close().await?;
    Ok(())
}
