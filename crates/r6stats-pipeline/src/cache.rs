//! Username → profile resolution with a time-to-live cache.
//!
//! Only successful resolutions are cached. Expired entries are never served:
//! a lookup past expiry goes back to the provider and replaces the entry, and
//! a janitor task sweeps leftovers for users that dropped off the roster.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;

use r6stats_core::Profile;
use r6stats_provider::{ProviderError, StatsProvider};
use tokio::task::JoinHandle;
use tokio::time::Instant;

struct CacheEntry {
    profile: Profile,
    expires_at: Instant,
}

pub struct ProfileCache {
    provider: Arc<dyn StatsProvider>,
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ProfileCache {
    #[must_use]
    pub fn new(provider: Arc<dyn StatsProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached profile for `username`, resolving it upstream on a
    /// miss or after expiry.
    ///
    /// Concurrent misses for the same name may both call the provider; the
    /// last insert wins.
    ///
    /// # Errors
    ///
    /// Returns the provider's error unchanged. Failures are not cached.
    pub async fn resolve(&self, username: &str) -> Result<Profile, ProviderError> {
        if let Some(profile) = self.lookup(username) {
            tracing::debug!(username, "cache: using cached profile");
            return Ok(profile);
        }

        let profile = self.provider.resolve_user(username).await?;
        tracing::debug!(username, profile_id = %profile.profile_id, "cache: resolved profile");

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                username.to_owned(),
                CacheEntry {
                    profile: profile.clone(),
                    expires_at: Instant::now() + self.ttl,
                },
            );
        Ok(profile)
    }

    fn lookup(&self, username: &str) -> Option<Profile> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(username)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.profile.clone())
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        before - entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawns a sweep every `interval`. The task ends once the cache is dropped.
    pub fn spawn_janitor(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let evicted = cache.evict_expired();
                if evicted > 0 {
                    tracing::debug!(evicted, "cache: swept expired profiles");
                }
            }
        })
    }
}
