//! Cache configuration.

use std::path::PathBuf;
use std::time::Duration;

use groundwork_common::error::{Error, ErrorKind, Result};
use groundwork_common::utils::serde::duration_millis;
use serde::{Deserialize, Serialize};

/// Configuration for [`crate::cache::FileCache`], validated at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding finalised entries and in-flight staging paths.
    pub cache_dir: PathBuf,
    /// Period between garbage-collection ticks.
    #[serde(with = "duration_millis")]
    pub gc_period: Duration,
    /// Time-to-live granted to an entry on store and renewed on fetch.
    #[serde(with = "duration_millis")]
    pub ttl: Duration,
}

impl CacheConfig {
    /// Configuration with the given directory and the default periods.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            gc_period: Duration::from_secs(60),
            ttl: Duration::from_secs(3600),
        }
    }

    /// Start building a configuration.
    pub fn builder(cache_dir: impl Into<PathBuf>) -> CacheConfigBuilder {
        CacheConfigBuilder { config: Self::new(cache_dir) }
    }

    /// Check the configuration invariants. A zero TTL is a hard error.
    pub fn validate(&self) -> Result<()> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::new(ErrorKind::Undefined, "cache directory is not set"));
        }
        if self.gc_period.is_zero() {
            return Err(Error::new(ErrorKind::Invalid, "gc period must be positive"));
        }
        if self.ttl.is_zero() {
            return Err(Error::new(ErrorKind::Invalid, "ttl must be positive"));
        }
        Ok(())
    }
}

/// Builder for [`CacheConfig`].
#[derive(Debug)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Set the garbage-collection period.
    pub fn gc_period(mut self, period: Duration) -> Self {
        self.config.gc_period = period;
        self
    }

    /// Set the entry time-to-live.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config.ttl = ttl;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<CacheConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
