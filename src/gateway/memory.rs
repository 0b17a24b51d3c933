//! A gateway that keeps its shades in memory.
//!
//! Behaves like a real device: a successful `set_height` changes what the
//! next `list_shades` reports.  It can also be taken offline and slowed
//! down, which is what the cache and dispatcher tests lean on.

use super::Gateway;
use crate::error::GatewayError;
use crate::types::Shade;
use async_trait::async_trait;
use log::debug;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Default)]
pub struct MemoryGateway {
    shades: Mutex<Vec<Shade>>,
    set_calls: Mutex<Vec<(String, u8)>>,
    list_calls: AtomicUsize,
    offline: AtomicBool,
    set_delay: Mutex<Option<Duration>>,
}

impl MemoryGateway {
    pub fn new(shades: Vec<Shade>) -> Self {
        Self {
            shades: Mutex::new(shades),
            ..Default::default()
        }
    }

    /// Replace the shades reported by the next `list_shades`.
    pub fn set_shades(&self, shades: Vec<Shade>) {
        *lock(&self.shades) = shades;
    }

    /// While offline every call fails with [`GatewayError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make every `set_height` take at least `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *lock(&self.set_delay) = delay;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// `(shade id, native height)` for every accepted `set_height`, in call order.
    pub fn set_calls(&self) -> Vec<(String, u8)> {
        lock(&self.set_calls).clone()
    }

    fn check_online(&self) -> Result<(), GatewayError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("gateway is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn list_shades(&self) -> Result<Vec<Shade>, GatewayError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(lock(&self.shades).clone())
    }

    async fn set_height(&self, shade: &Shade, height: u8) -> Result<(), GatewayError> {
        let delay = *lock(&self.set_delay);
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        self.check_online()?;

        debug!("Setting {} to {}", shade.id, height);
        lock(&self.set_calls).push((shade.id.clone(), height));
        if let Some(stored) = lock(&self.shades).iter_mut().find(|s| s.id == shade.id) {
            stored.height = height;
        }
        Ok(())
    }
}

// A panic while holding one of these locks leaves plain data behind, so
// poisoning is ignored.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
