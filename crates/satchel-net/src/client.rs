//! HTTP client implementing the agent's `Network` port.

use async_trait::async_trait;
use satchel_core::ports::Network;
use satchel_core::{Error, Method, Request, Response, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Network adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpNetworkConfig {
    /// Per-request timeout. Unset means the request may hang indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    format!("satchel-agent/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for HttpNetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }
}

/// `reqwest`-backed network.
#[derive(Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
}

impl HttpNetwork {
    pub fn new(config: &HttpNetworkConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| Error::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        debug!(method = %request.method, url = %request.url, "Network fetch");

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("{}: {}", request.url, e)))?;

        let status = response.status();
        let final_url = response.url().clone();
        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("{}: failed to read body: {}", request.url, e)))?;

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: body.to_vec(),
            url: Some(final_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_maps_status_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.html"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html></html>", "text/html")
                    .insert_header("x-request-id", "req-1"),
            )
            .mount(&server)
            .await;

        let network = HttpNetwork::new(&HttpNetworkConfig::default()).unwrap();
        let request = Request::parse_get(&format!("{}/index.html", server.uri())).unwrap();
        let response = network.fetch(&request).await.unwrap();

        assert!(response.is_ok());
        assert_eq!(response.status_text, "OK");
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.header("X-Request-Id"), Some("req-1"));
        assert_eq!(response.text(), "<html></html>");
    }

    #[tokio::test]
    async fn test_fetch_sends_request_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events/my-notifications"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let network = HttpNetwork::new(&HttpNetworkConfig::default()).unwrap();
        let request = Request::parse_get(&format!("{}/api/events/my-notifications", server.uri()))
            .unwrap()
            .bearer("secret");
        let response = network.fetch(&request).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_http_error_status_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let network = HttpNetwork::new(&HttpNetworkConfig::default()).unwrap();
        let request = Request::parse_get(&format!("{}/", server.uri())).unwrap();
        let response = network.fetch(&request).await.unwrap();
        assert_eq!(response.status, 503);
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        // Port 9 (discard) on localhost is not expected to accept connections.
        let network = HttpNetwork::new(&HttpNetworkConfig {
            timeout_secs: Some(2),
            ..Default::default()
        })
        .unwrap();
        let request = Request::parse_get("http://127.0.0.1:9/").unwrap();
        let err = network.fetch(&request).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }
}
