//! Configuration and request fixtures.

use satchel_agent::AgentConfig;
use satchel_core::{Destination, Request, Response};
use url::Url;

pub const APP_ORIGIN: &str = "https://app.example.org";
pub const API_ORIGIN: &str = "https://api.example.org";

/// Agent configuration with partition names unique to this call.
pub fn test_config() -> AgentConfig {
    AgentConfig::default()
        .with_app_name(format!("test-{}", uuid::Uuid::new_v4().simple()))
        .with_origin(Url::parse(APP_ORIGIN).unwrap())
        .with_api(Url::parse(API_ORIGIN).unwrap(), "/api")
}

/// `test_config` with a three-entry app-shell manifest.
pub fn small_manifest_config() -> AgentConfig {
    test_config().with_manifest(vec![
        "/".to_string(),
        "/index.html".to_string(),
        "/manifest.json".to_string(),
    ])
}

pub fn app_url(path: &str) -> String {
    format!("{}{}", APP_ORIGIN, path)
}

pub fn api_url(path: &str) -> String {
    format!("{}{}", API_ORIGIN, path)
}

/// A top-level navigation to `path` on the app origin.
pub fn document(path: &str) -> Request {
    Request::navigate(Url::parse(&app_url(path)).unwrap())
}

/// A plain GET on the app origin.
pub fn get(path: &str) -> Request {
    Request::parse_get(&app_url(path)).unwrap()
}

pub fn script(path: &str) -> Request {
    get(path).with_destination(Destination::Script)
}

pub fn html(body: &str) -> Response {
    Response::ok(body).with_header("content-type", "text/html")
}

/// JSON body for the notifications endpoint with the given read flags.
pub fn notifications_body(read_flags: &[bool]) -> String {
    let records: Vec<serde_json::Value> = read_flags
        .iter()
        .enumerate()
        .map(|(idx, is_read)| {
            serde_json::json!({
                "id": idx + 1,
                "title": format!("Notification {}", idx + 1),
                "is_read": is_read
            })
        })
        .collect();
    serde_json::Value::Array(records).to_string()
}
