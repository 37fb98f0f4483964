//! Named Cache Instances
//!
//! The four process-wide caches, tuned to how often their data changes.
//! Built once at the composition root and handed to consumers by clone.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::cache::{CacheStatsSnapshot, SharedCache};
use crate::clock::{system_clock, SharedClock};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Cache Kind ==
/// Identifies one of the named instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    User,
    Club,
    Member,
    Api,
}

impl CacheKind {
    pub const ALL: [CacheKind; 4] = [
        CacheKind::User,
        CacheKind::Club,
        CacheKind::Member,
        CacheKind::Api,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::User => "user",
            CacheKind::Club => "club",
            CacheKind::Member => "member",
            CacheKind::Api => "api",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CacheKind::User => "User Cache",
            CacheKind::Club => "Club Cache",
            CacheKind::Member => "Member Cache",
            CacheKind::Api => "API Response Cache",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CacheKind::User => "Caches user authentication and role data",
            CacheKind::Club => "Caches club information",
            CacheKind::Member => "Caches member profiles and data",
            CacheKind::Api => "Caches API responses for performance",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(CacheKind::User),
            "club" => Ok(CacheKind::Club),
            "member" => Ok(CacheKind::Member),
            "api" => Ok(CacheKind::Api),
            other => Err(CacheError::InvalidConfig(format!(
                "Invalid cache type {:?}. Must be one of: user, club, member, api",
                other
            ))),
        }
    }
}

/// Which instances a `clear` applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearTarget {
    One(CacheKind),
    All,
}

impl FromStr for ClearTarget {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "all" {
            Ok(ClearTarget::All)
        } else {
            s.parse().map(ClearTarget::One)
        }
    }
}

/// Stats of one named instance with its label.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedCacheStats {
    pub kind: CacheKind,
    #[serde(rename = "type")]
    pub label: &'static str,
    pub description: &'static str,
    #[serde(flatten)]
    pub stats: CacheStatsSnapshot,
}

// == Named Caches ==
/// The user, club, member and API response caches.
#[derive(Debug, Clone)]
pub struct NamedCaches {
    pub user: SharedCache<Value>,
    pub club: SharedCache<Value>,
    pub member: SharedCache<Value>,
    pub api: SharedCache<Value>,
}

impl NamedCaches {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, system_clock())
    }

    pub fn with_clock(config: &CacheConfig, clock: SharedClock) -> Self {
        Self {
            user: SharedCache::with_clock(config.user, clock.clone()),
            club: SharedCache::with_clock(config.club, clock.clone()),
            member: SharedCache::with_clock(config.member, clock.clone()),
            api: SharedCache::with_clock(config.api, clock),
        }
    }

    pub fn get(&self, kind: CacheKind) -> &SharedCache<Value> {
        match kind {
            CacheKind::User => &self.user,
            CacheKind::Club => &self.club,
            CacheKind::Member => &self.member,
            CacheKind::Api => &self.api,
        }
    }

    /// Stats for all four instances, in `CacheKind::ALL` order.
    pub fn stats(&self) -> Vec<NamedCacheStats> {
        CacheKind::ALL
            .iter()
            .map(|kind| NamedCacheStats {
                kind: *kind,
                label: kind.label(),
                description: kind.description(),
                stats: self.get(*kind).stats(),
            })
            .collect()
    }

    /// Clears the selected instance(s).
    ///
    /// With a key, only that key is deleted and the report lists
    /// `{kind}:{key}` for each instance that held it. Without one, whole
    /// instances are emptied and the report lists their kinds.
    pub fn clear(&self, target: ClearTarget, key: Option<&str>) -> Vec<String> {
        let kinds: Vec<CacheKind> = match target {
            ClearTarget::One(kind) => vec![kind],
            ClearTarget::All => CacheKind::ALL.to_vec(),
        };

        let mut cleared = Vec::new();
        for kind in kinds {
            let cache = self.get(kind);
            match key {
                Some(key) => {
                    if cache.delete(key) {
                        cleared.push(format!("{}:{}", kind, key));
                    }
                }
                None => {
                    cache.clear();
                    cleared.push(kind.to_string());
                }
            }
        }

        info!("Cleared caches: {:?}", cleared);
        cleared
    }

    /// Sweeps expired entries from all four instances.
    pub fn cleanup_all(&self) -> usize {
        CacheKind::ALL
            .iter()
            .map(|kind| self.get(*kind).cleanup())
            .sum()
    }
}

impl Default for NamedCaches {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
