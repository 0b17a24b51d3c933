//! Cached read access and queued height changes for window shades behind a
//! remote gateway.
//!
//! Reads go through [`ShadeDirectory`], which serves a snapshot of the
//! gateway's shade list and refreshes it once it is older than the
//! configured TTL.  Height changes are queued with a [`Submitter`] and
//! carried out by a fixed pool of workers in the background.
//! [`ShadeService`] wires both together at start-up.

pub mod cache;
pub mod config;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod service;
pub mod types;

pub use cache::{CacheSnapshot, ShadeCache};
pub use config::Config;
pub use directory::ShadeDirectory;
pub use dispatcher::{Dispatcher, Submitter};
pub use error::{DispatchError, GatewayError, LookupError};
pub use gateway::{Gateway, MemoryGateway};
pub use service::{Accepted, ShadeService};
pub use types::{Shade, ShadeView, UpdateRequest, MAX_SHADE_HEIGHT};
