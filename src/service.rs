//! Start-up wiring and the operations offered to the request layer.

use std::sync::Arc;

use log::{info, warn};

use crate::cache::ShadeCache;
use crate::config::Config;
use crate::directory::ShadeDirectory;
use crate::dispatcher::{Dispatcher, Submitter};
use crate::error::{DispatchError, LookupError};
use crate::gateway::Gateway;
use crate::types::{ShadeView, UpdateRequest};

/// Acknowledgement of a queued height change.
///
/// Carries the height that was asked for, not anything the gateway has
/// confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub id: String,
    pub height_percent: u8,
    pub request: UpdateRequest,
}

pub struct ShadeService {
    directory: Arc<ShadeDirectory>,
    dispatcher: Dispatcher,
    submitter: Submitter,
}

impl ShadeService {
    /// Build the cache, warm it up and start the update workers.
    ///
    /// A failed warm-up is not fatal: the cache starts empty and stale, so
    /// the first read tries the gateway again.
    pub async fn start(config: &Config, gateway: Arc<dyn Gateway>) -> Self {
        let cache = ShadeCache::new(Arc::clone(&gateway));
        match cache.refresh().await {
            Ok(snapshot) => info!("Loaded {} shades from gateway", snapshot.shades.len()),
            Err(e) => warn!("Initial shade refresh failed: {}", e),
        }

        let directory = Arc::new(ShadeDirectory::new(cache, config.cache_ttl()));
        let dispatcher = Dispatcher::start(
            config.workers,
            config.queue_capacity,
            Arc::clone(&directory),
            gateway,
        );
        let submitter = dispatcher.submitter();

        Self {
            directory,
            dispatcher,
            submitter,
        }
    }

    pub fn directory(&self) -> &Arc<ShadeDirectory> {
        &self.directory
    }

    pub async fn list_shade_views(&self) -> Result<Vec<ShadeView>, LookupError> {
        self.directory.list_shades().await
    }

    pub async fn get_shade_view(&self, id: &str) -> Result<ShadeView, LookupError> {
        self.directory.get_shade_view(id).await
    }

    /// Queue a height change and return right away.  Waits only while the
    /// pending queue is full.
    pub async fn submit_height_update(
        &self,
        id: &str,
        height_percent: u8,
    ) -> Result<Accepted, DispatchError> {
        let request = self.submitter.submit_height(id, height_percent).await?;
        Ok(Accepted {
            id: id.to_string(),
            height_percent,
            request,
        })
    }

    /// Stop the workers after they finish what they are doing.
    pub async fn shutdown(self) {
        info!("Shutting down update workers");
        drop(self.submitter);
        self.dispatcher.shutdown().await;
    }
}
