//! Snapshot cache of the gateway's shade list.
//!
//! The current snapshot lives behind an `Arc`.  Readers clone the `Arc` and
//! work on an immutable value; a refresh builds a whole new snapshot and
//! swaps the pointer.  The lock is only ever held for the clone or the swap,
//! never across a gateway call.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::types::Shade;

/// All shades as of one successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub shades: Vec<Shade>,
    /// `None` until the first successful refresh.
    pub fetched_at: Option<Instant>,
}

impl CacheSnapshot {
    /// The snapshot installed before anything was fetched.  Always stale.
    pub fn empty() -> Self {
        Self {
            shades: Vec::new(),
            fetched_at: None,
        }
    }

    /// Age at `now`, or `None` if this snapshot was never fetched.
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.fetched_at
            .map(|fetched_at| now.saturating_duration_since(fetched_at))
    }

    /// Whether a read at `now` must refresh first.  An age equal to the
    /// TTL is still fresh.
    pub fn is_stale(&self, now: Instant, ttl: Duration) -> bool {
        match self.age(now) {
            Some(age) => age > ttl,
            None => true,
        }
    }
}

pub struct ShadeCache {
    gateway: Arc<dyn Gateway>,
    current: RwLock<Arc<CacheSnapshot>>,
}

impl ShadeCache {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            current: RwLock::new(Arc::new(CacheSnapshot::empty())),
        }
    }

    /// Fetch all shades and install them as the current snapshot.
    ///
    /// On failure the previous snapshot stays installed.
    pub async fn refresh(&self) -> Result<Arc<CacheSnapshot>, GatewayError> {
        let shades = self.gateway.list_shades().await?;
        let snapshot = Arc::new(CacheSnapshot {
            shades,
            fetched_at: Some(Instant::now()),
        });

        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Arc::clone(&snapshot);
        drop(current);

        debug!("Refreshed shade data ({} shades)", snapshot.shades.len());
        Ok(snapshot)
    }

    pub fn current(&self) -> Arc<CacheSnapshot> {
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&current)
    }
}
