//! Filesystem-backed, TTL-governed artifact cache.
//!
//! The cache guards an in-memory key → entry map and delegates physical
//! storage to an injected [`CacheFilesystem`]. Entries are materialised by a
//! pluggable [`EntryProvider`] (source-filesystem or remote HTTP), staged
//! under `<cacheDir>/<key>-tmp`, and atomically renamed to
//! `<cacheDir>/<key>`. Freshness is a sliding window: every successful fetch
//! renews the entry; a background collector evicts whatever has expired.

pub mod config;
pub mod engine;
pub mod entry;
pub mod fs;
pub mod provider;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use engine::FileCache;
pub use entry::CacheEntry;
pub use fs::{CacheFilesystem, LocalFilesystem};
pub use provider::{EntryProvider, FilesystemProvider, RemoteProvider};
