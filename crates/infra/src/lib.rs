//! Infrastructure layer for Groundwork: the resilient HTTP client, the
//! request proxy, and the filesystem-backed artifact cache.
//!
//! Everything here reports failures through the canonical error taxonomy in
//! [`groundwork_common::error`] and observes cooperative cancellation via
//! `tokio_util::sync::CancellationToken`.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod cache;
pub mod errors;
pub mod http;

pub use cache::{CacheConfig, CacheFilesystem, EntryProvider, FileCache, LocalFilesystem};
pub use http::{AuthConfig, AuthScheme, HeaderSet, HttpClient, HttpClientConfig, RequestBody};
