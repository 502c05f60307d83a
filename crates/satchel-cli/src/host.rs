//! Console stand-ins for the window-facing host ports.

use async_trait::async_trait;
use satchel_core::ports::{Badge, ClientWindow, Clients, Notifier};
use satchel_core::{BroadcastMessage, ClientId, NotificationTemplate, Result};
use tracing::info;
use url::Url;

/// Reports badge, notification, and window activity through the log.
/// There are never any open windows.
#[derive(Debug, Default)]
pub struct ConsoleHost;

#[async_trait]
impl Badge for ConsoleHost {
    async fn set(&self, count: u64) -> Result<()> {
        info!(count, "Badge set");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        info!("Badge cleared");
        Ok(())
    }
}

#[async_trait]
impl Notifier for ConsoleHost {
    async fn show(&self, notification: &NotificationTemplate) -> Result<()> {
        info!(
            title = %notification.title,
            body = %notification.body,
            tag = notification.tag.as_deref().unwrap_or("-"),
            "Notification shown"
        );
        Ok(())
    }

    async fn close(&self, tag: Option<&str>) -> Result<()> {
        info!(tag = tag.unwrap_or("-"), "Notification closed");
        Ok(())
    }
}

#[async_trait]
impl Clients for ConsoleHost {
    async fn windows(&self) -> Result<Vec<ClientWindow>> {
        Ok(vec![])
    }

    async fn focus(&self, id: ClientId) -> Result<()> {
        info!(client = %id, "Window focused");
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<ClientId> {
        let id = ClientId::new();
        info!(client = %id, url = %url, "Window opened");
        Ok(id)
    }

    async fn post(&self, id: ClientId, message: &BroadcastMessage) -> Result<()> {
        info!(client = %id, ?message, "Message posted");
        Ok(())
    }

    async fn claim(&self) -> Result<()> {
        Ok(())
    }
}
