//! Backend notification list and push payload handling.

use satchel_core::ports::Network;
use satchel_core::{Error, NotificationRecord, Request, Result, UserRef};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Credentials remembered from the last `FETCH_NOTIFICATIONS` message.
#[derive(Clone)]
pub struct Session {
    pub user_id: UserRef,
    pub token: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Reads the caller's notifications from the backend.
pub struct NotificationsClient {
    network: Arc<dyn Network>,
    endpoint: Url,
}

impl NotificationsClient {
    pub fn new(network: Arc<dyn Network>, endpoint: Url) -> Self {
        Self { network, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetch the full list. Any non-200 status or undecodable body is an error.
    pub async fn fetch(&self, session: &Session) -> Result<Vec<NotificationRecord>> {
        let request = Request::get(self.endpoint.clone())
            .bearer(&session.token)
            .with_header("accept", "application/json");

        debug!(user = %session.user_id, url = %self.endpoint, "Fetching notifications");
        let response = self.network.fetch(&request).await?;
        if !response.is_ok() {
            return Err(Error::Network(format!(
                "Notifications endpoint returned {}",
                response.status
            )));
        }
        response.json()
    }
}

/// Decode a push payload. Absent or empty payloads yield `None`; invalid JSON
/// is logged and also yields `None` so the default template is used.
pub fn parse_push_payload(raw: Option<&[u8]>) -> Option<Value> {
    let raw = raw?;
    if raw.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "Ignoring unparsable push payload");
            None
        }
    }
}

/// Unread count carried by a push payload, if the server sent one.
pub fn unread_hint(payload: &Value) -> Option<u64> {
    let object = payload.as_object()?;
    object
        .get("unread_count")
        .or_else(|| object.get("count"))
        .and_then(Value::as_u64)
}
