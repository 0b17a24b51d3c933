use crate::error::GatewayError;
use crate::types::Shade;
use async_trait::async_trait;

pub mod memory;
pub use memory::MemoryGateway;

/// Client for the shade gateway device.
///
/// Implementations own the gateway address and whatever connection state
/// they need.  Both calls may be slow; callers never hold locks across them.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetch every shade known to the gateway.
    async fn list_shades(&self) -> Result<Vec<Shade>, GatewayError>;

    /// Move `shade` to `height` on the native scale.
    async fn set_height(&self, shade: &Shade, height: u8) -> Result<(), GatewayError>;
}
