use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::time::Instant;

use crate::cache::{CacheSnapshot, ShadeCache};
use crate::error::LookupError;
use crate::types::{Shade, ShadeView};

/// Read side of the service: answers shade queries out of the cache,
/// refreshing it first whenever the snapshot is older than the TTL.
///
/// Concurrent readers that all see a stale snapshot each refresh on their
/// own.  Refreshing is idempotent, so this only costs extra gateway calls.
pub struct ShadeDirectory {
    cache: ShadeCache,
    ttl: Duration,
}

impl ShadeDirectory {
    pub fn new(cache: ShadeCache, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn cache(&self) -> &ShadeCache {
        &self.cache
    }

    /// Every shade with its height as a percentage.
    pub async fn list_shades(&self) -> Result<Vec<ShadeView>, LookupError> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.shades.iter().map(ShadeView::from).collect())
    }

    /// The raw shade with `id`.  First match wins if the gateway reported
    /// duplicates.
    pub async fn find_shade(&self, id: &str) -> Result<Shade, LookupError> {
        let snapshot = self.snapshot().await?;
        snapshot
            .shades
            .iter()
            .find(|shade| shade.id == id)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(id.to_string()))
    }

    pub async fn get_shade_view(&self, id: &str) -> Result<ShadeView, LookupError> {
        self.find_shade(id).await.map(|shade| ShadeView::from(&shade))
    }

    async fn snapshot(&self) -> Result<Arc<CacheSnapshot>, LookupError> {
        let current = self.cache.current();
        if !current.is_stale(Instant::now(), self.ttl) {
            return Ok(current);
        }
        info!("Shade data cache is too old. Refreshing.");
        Ok(self.cache.refresh().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Gateway, MemoryGateway};

    const TTL: Duration = Duration::from_secs(10);

    async fn warm_directory(shades: Vec<Shade>) -> (Arc<MemoryGateway>, ShadeDirectory) {
        let gateway = Arc::new(MemoryGateway::new(shades));
        let cache = ShadeCache::new(Arc::clone(&gateway) as Arc<dyn Gateway>);
        cache.refresh().await.unwrap();
        (gateway, ShadeDirectory::new(cache, TTL))
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_read_does_not_refresh_and_stale_read_does() {
        let (gateway, directory) = warm_directory(vec![Shade::new("A", "Den", "r1", 128)]).await;
        assert_eq!(gateway.list_calls(), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        let views = directory.list_shades().await.unwrap();
        assert_eq!(views[0].height_percent, 50);
        assert_eq!(gateway.list_calls(), 1);

        gateway.set_shades(vec![Shade::new("A", "Den", "r1", 255)]);
        tokio::time::advance(Duration::from_secs(7)).await;
        let views = directory.list_shades().await.unwrap();
        assert_eq!(views[0].height_percent, 100);
        assert_eq!(gateway.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn read_exactly_at_ttl_is_served_from_cache() {
        let (gateway, directory) = warm_directory(vec![Shade::new("A", "Den", "r1", 0)]).await;

        tokio::time::advance(TTL).await;
        directory.find_shade("A").await.unwrap();

        assert_eq!(gateway.list_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn find_shade_follows_the_staleness_rule() {
        let (gateway, directory) = warm_directory(vec![Shade::new("A", "Den", "r1", 0)]).await;
        gateway.set_shades(vec![Shade::new("B", "Hall", "r2", 0)]);

        assert!(directory.find_shade("A").await.is_ok());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(
            directory.find_shade("A").await,
            Err(LookupError::NotFound("A".into()))
        );
        assert_eq!(directory.find_shade("B").await.unwrap().name, "Hall");
    }

    #[tokio::test]
    async fn missing_id_is_not_found() {
        let (_gateway, directory) = warm_directory(vec![Shade::new("A", "Den", "r1", 0)]).await;

        assert_eq!(
            directory.get_shade_view("missing").await,
            Err(LookupError::NotFound("missing".into()))
        );
    }

    #[tokio::test]
    async fn duplicate_ids_resolve_to_first_match() {
        let (_gateway, directory) = warm_directory(vec![
            Shade::new("A", "First", "r1", 0),
            Shade::new("A", "Second", "r1", 0),
        ])
        .await;

        assert_eq!(directory.find_shade("A").await.unwrap().name, "First");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_surfaces_to_reader_and_keeps_snapshot() {
        let (gateway, directory) = warm_directory(vec![Shade::new("A", "Den", "r1", 0)]).await;
        let before = directory.cache().current();
        gateway.set_offline(true);
        tokio::time::advance(Duration::from_secs(11)).await;

        let err = directory.list_shades().await.unwrap_err();

        assert!(matches!(err, LookupError::GatewayUnavailable(_)));
        assert!(Arc::ptr_eq(&before, &directory.cache().current()));

        gateway.set_offline(false);
        assert_eq!(directory.list_shades().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cold_directory_refreshes_on_first_read() {
        let gateway = Arc::new(MemoryGateway::new(vec![Shade::new("A", "Den", "r1", 0)]));
        let cache = ShadeCache::new(Arc::clone(&gateway) as Arc<dyn Gateway>);
        let directory = ShadeDirectory::new(cache, TTL);

        assert_eq!(directory.list_shades().await.unwrap().len(), 1);
        assert_eq!(gateway.list_calls(), 1);
    }
}
