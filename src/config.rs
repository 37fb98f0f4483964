//! Configuration Module
//!
//! Handles loading cache tuning from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

// == Cache Options ==
/// Size and lifetime tuning for one cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// TTL applied when a write does not give one
    pub ttl: Duration,
    /// Maximum number of entries
    pub max_size: usize,
}

impl CacheOptions {
    pub const fn new(ttl: Duration, max_size: usize) -> Self {
        Self { ttl, max_size }
    }
}

impl Default for CacheOptions {
    /// 5 minutes, 100 entries.
    fn default() -> Self {
        Self::new(Duration::from_secs(5 * 60), 100)
    }
}

/// Cache configuration for the named instances and their sweeper.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// User profiles
    pub user: CacheOptions,
    /// Club metadata
    pub club: CacheOptions,
    /// Members and member lists
    pub member: CacheOptions,
    /// Generic API responses
    pub api: CacheOptions,
    /// Interval between background cleanup sweeps
    pub cleanup_interval: Duration,
    /// TTL used by cached repositories
    pub repository_ttl: Duration,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `USER_CACHE_TTL_MS` / `USER_CACHE_MAX_ENTRIES` (default: 300000 / 500)
    /// - `CLUB_CACHE_TTL_MS` / `CLUB_CACHE_MAX_ENTRIES` (default: 1800000 / 100)
    /// - `MEMBER_CACHE_TTL_MS` / `MEMBER_CACHE_MAX_ENTRIES` (default: 600000 / 1000)
    /// - `API_CACHE_TTL_MS` / `API_CACHE_MAX_ENTRIES` (default: 60000 / 200)
    /// - `CACHE_CLEANUP_INTERVAL_MS` - Sweep frequency (default: 300000)
    /// - `REPOSITORY_CACHE_TTL_MS` - Repository entry lifetime (default: 300000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            user: options_from_env("USER", defaults.user),
            club: options_from_env("CLUB", defaults.club),
            member: options_from_env("MEMBER", defaults.member),
            api: options_from_env("API", defaults.api),
            cleanup_interval: env_millis("CACHE_CLEANUP_INTERVAL_MS")
                .unwrap_or(defaults.cleanup_interval),
            repository_ttl: env_millis("REPOSITORY_CACHE_TTL_MS")
                .unwrap_or(defaults.repository_ttl),
        }
    }

    /// Rejects zero sizes and zero intervals.
    pub fn validate(&self) -> Result<()> {
        let instances = [
            ("user", &self.user),
            ("club", &self.club),
            ("member", &self.member),
            ("api", &self.api),
        ];
        for (name, options) in instances {
            if options.max_size == 0 {
                return Err(CacheError::InvalidConfig(format!(
                    "{} cache max entries must be greater than 0",
                    name
                )));
            }
            if options.ttl.is_zero() {
                return Err(CacheError::InvalidConfig(format!(
                    "{} cache TTL must be greater than 0",
                    name
                )));
            }
        }
        if self.cleanup_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "cleanup interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            user: CacheOptions::new(Duration::from_secs(5 * 60), 500),
            club: CacheOptions::new(Duration::from_secs(30 * 60), 100),
            member: CacheOptions::new(Duration::from_secs(10 * 60), 1000),
            api: CacheOptions::new(Duration::from_secs(60), 200),
            cleanup_interval: Duration::from_secs(5 * 60),
            repository_ttl: Duration::from_secs(5 * 60),
        }
    }
}

fn options_from_env(prefix: &str, fallback: CacheOptions) -> CacheOptions {
    CacheOptions {
        ttl: env_millis(&format!("{}_CACHE_TTL_MS", prefix)).unwrap_or(fallback.ttl),
        max_size: env_parse(&format!("{}_CACHE_MAX_ENTRIES", prefix))
            .unwrap_or(fallback.max_size),
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_millis)
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
