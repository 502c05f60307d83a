//! Notification records and display templates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of the backend's notification list.
///
/// Only `is_read` is interpreted; every other field is carried unchanged so
/// the shell sees exactly what the backend sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub is_read: bool,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl NotificationRecord {
    /// Number of records with `is_read == false`.
    pub fn unread_count(records: &[NotificationRecord]) -> u64 {
        records.iter().filter(|r| !r.is_read).count() as u64
    }
}

/// What is shown to the user when a push arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationTemplate {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Where a click on the notification should lead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Default for NotificationTemplate {
    fn default() -> Self {
        Self {
            title: "Satchel".to_string(),
            body: "You have a new notification".to_string(),
            icon: Some("/android-chrome-192x192.png".to_string()),
            badge: Some("/favicon.ico".to_string()),
            tag: Some("satchel-notification".to_string()),
            url: None,
            data: None,
        }
    }
}

impl NotificationTemplate {
    /// Overlay a push payload on this template.
    ///
    /// Object payloads override matching string fields and `data`; any other
    /// JSON value becomes the body text.
    pub fn merged_with(&self, payload: &Value) -> NotificationTemplate {
        let mut merged = self.clone();

        let object = match payload {
            Value::Object(object) => object,
            Value::Null => return merged,
            Value::String(text) => {
                merged.body = text.clone();
                return merged;
            }
            other => {
                merged.body = other.to_string();
                return merged;
            }
        };

        if let Some(title) = object.get("title").and_then(Value::as_str) {
            merged.title = title.to_string();
        }
        if let Some(body) = object.get("body").and_then(Value::as_str) {
            merged.body = body.to_string();
        }
        if let Some(icon) = object.get("icon").and_then(Value::as_str) {
            merged.icon = Some(icon.to_string());
        }
        if let Some(badge) = object.get("badge").and_then(Value::as_str) {
            merged.badge = Some(badge.to_string());
        }
        if let Some(tag) = object.get("tag").and_then(Value::as_str) {
            merged.tag = Some(tag.to_string());
        }
        if let Some(url) = object.get("url").and_then(Value::as_str) {
            merged.url = Some(url.to_string());
        }
        if let Some(data) = object.get("data") {
            merged.data = Some(data.clone());
        }

        merged
    }
}
