//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the agent and the host
//! platform: cache storage, the network, the application badge,
//! notification display, and the set of open application windows.

use crate::http::{Request, Response};
use crate::ids::ClientId;
use crate::messages::BroadcastMessage;
use crate::notification::NotificationTemplate;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// One named partition of request/response pairs.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Partition name.
    fn name(&self) -> &str;

    /// Look up the stored response for exactly this request.
    async fn get(&self, request: &Request) -> Result<Option<Response>>;

    /// Store a response, overwriting any previous entry for the request.
    async fn put(&self, request: &Request, response: &Response) -> Result<()>;

    /// Remove the entry for a request. Returns whether one existed.
    async fn delete(&self, request: &Request) -> Result<bool>;

    /// Cache keys of every stored request.
    async fn keys(&self) -> Result<Vec<String>>;
}

/// The host's collection of named partitions.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a partition, creating it if it does not exist.
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>>;

    /// Check whether a partition exists.
    async fn has(&self, name: &str) -> Result<bool>;

    /// Delete a partition and all of its entries. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Names of all existing partitions.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Look the request up across every partition, in `keys()` order.
    async fn match_any(&self, request: &Request) -> Result<Option<Response>> {
        for name in self.keys().await? {
            let cache = self.open(&name).await?;
            if let Some(response) = cache.get(request).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}

/// The network as seen by the agent.
///
/// `Err` means the request never produced a response (offline, DNS, reset).
/// Any HTTP status, including errors, is an `Ok` response.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response>;
}

/// Application icon badge.
#[async_trait]
pub trait Badge: Send + Sync {
    /// Show exactly `count` on the badge.
    async fn set(&self, count: u64) -> Result<()>;

    /// Remove the badge.
    async fn clear(&self) -> Result<()>;
}

/// System notification display.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &NotificationTemplate) -> Result<()>;

    /// Close displayed notifications carrying `tag` (all when `None`).
    async fn close(&self, tag: Option<&str>) -> Result<()>;
}

/// An open application window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientWindow {
    pub id: ClientId,
    pub url: Url,
    pub focused: bool,
}

/// Open application instances the agent can reach.
#[async_trait]
pub trait Clients: Send + Sync {
    /// Every window currently open, including ones not yet controlled.
    async fn windows(&self) -> Result<Vec<ClientWindow>>;

    async fn focus(&self, id: ClientId) -> Result<()>;

    async fn open_window(&self, url: &Url) -> Result<ClientId>;

    async fn post(&self, id: ClientId, message: &BroadcastMessage) -> Result<()>;

    /// Take control of every open window without waiting for a reload.
    async fn claim(&self) -> Result<()>;
}
