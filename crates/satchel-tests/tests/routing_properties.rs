//! Routing and caching properties observed through the host ports.

use satchel_agent::{FetchOutcome, PassReason, RoutingDecision};
use satchel_core::ports::CacheStorage;
use satchel_core::{Destination, Method, Request, Response};
use satchel_tests::*;

#[tokio::test]
async fn test_non_get_requests_pass_through_untouched() {
    let host = TestHost::new();
    let agent = host.agent(test_config());

    for method in [Method::Post, Method::Put, Method::Patch, Method::Delete] {
        let request = get("/students").with_method(method);
        assert_eq!(
            agent.route(&request),
            RoutingDecision::PassThrough(PassReason::NonGet)
        );
        assert_eq!(agent.fetch(&request).await, FetchOutcome::PassThrough);
    }

    assert!(host.network.calls().is_empty());
    assert_eq!(host.storage.operations(), 0);
}

#[tokio::test]
async fn test_api_requests_never_touch_storage() {
    let host = TestHost::new();
    let agent = host.agent(test_config());
    let request = Request::parse_get(&api_url("/api/students?page=2")).unwrap();

    assert_eq!(agent.fetch(&request).await, FetchOutcome::PassThrough);
    assert_eq!(host.storage.operations(), 0);
    assert!(host.network.calls().is_empty());
}

#[tokio::test]
async fn test_api_prefix_matches_whole_segments() {
    let host = TestHost::new();
    let agent = host.agent(test_config());

    let apiary = Request::parse_get(&api_url("/apiary/hives")).unwrap();
    assert_eq!(agent.route(&apiary), RoutingDecision::NetworkFirst);

    let exact = Request::parse_get(&api_url("/api")).unwrap();
    assert_eq!(
        agent.route(&exact),
        RoutingDecision::PassThrough(PassReason::Api)
    );

    // Same path on the app origin is not the API.
    assert_eq!(agent.route(&get("/api/students")), RoutingDecision::NetworkFirst);
}

#[tokio::test]
async fn test_dev_host_requests_pass_through() {
    let host = TestHost::new();
    let agent = host.agent(test_config());

    for url in [
        "http://localhost:3000/static/js/bundle.js",
        "http://127.0.0.1:8000/",
    ] {
        let request = Request::parse_get(url).unwrap();
        assert_eq!(
            agent.route(&request),
            RoutingDecision::PassThrough(PassReason::DevHost)
        );
        assert_eq!(agent.fetch(&request).await, FetchOutcome::PassThrough);
    }
    assert_eq!(host.storage.operations(), 0);
}

#[tokio::test]
async fn test_successful_document_is_stored_in_dynamic_partition() {
    let host = TestHost::new();
    let agent = host.agent(test_config());
    let request = document("/students/42");
    host.network
        .ok(&app_url("/students/42"), "<html>student</html>");

    let outcome = agent.fetch(&request).await;
    assert_eq!(outcome.source(), "network");

    let stored = host
        .cached(agent.dynamic_cache_name(), &request)
        .await
        .expect("document stored");
    assert_eq!(stored.text(), "<html>student</html>");
    assert!(host.cached(agent.static_cache_name(), &request).await.is_none());
}

#[tokio::test]
async fn test_offline_document_falls_back_to_app_shell() {
    let host = TestHost::new();
    let agent = host.agent(test_config());

    let static_cache = host
        .storage
        .inner()
        .open(agent.static_cache_name())
        .await
        .unwrap();
    static_cache
        .put(&get("/"), &html("<html>shell</html>"))
        .await
        .unwrap();

    let outcome = agent.fetch(&document("/payments/history")).await;
    assert_eq!(outcome, FetchOutcome::Cache(html("<html>shell</html>")));
}

#[tokio::test]
async fn test_offline_document_without_shell_has_no_response() {
    let host = TestHost::new();
    let agent = host.agent(test_config());

    let outcome = agent.fetch(&document("/payments/history")).await;
    assert_eq!(outcome, FetchOutcome::NoResponse);
}

#[tokio::test]
async fn test_non_200_responses_are_returned_but_not_cached() {
    let host = TestHost::new();
    let agent = host.agent(test_config());

    let cases = [
        (document("/missing"), app_url("/missing"), 404),
        (script("/static/js/broken.js"), app_url("/static/js/broken.js"), 500),
        (get("/data/export.csv"), app_url("/data/export.csv"), 302),
    ];

    for (request, url, status) in cases {
        host.network
            .always(&url, Reply::Respond(Response::new(status, "nope")));
        let outcome = agent.fetch(&request).await;
        assert_eq!(outcome.response().map(|r| r.status), Some(status));
        assert!(host.cached(agent.dynamic_cache_name(), &request).await.is_none());
    }

    assert!(host.entry_keys(agent.dynamic_cache_name()).await.is_empty());
}

#[tokio::test]
async fn test_static_assets_use_stale_while_revalidate() {
    let host = TestHost::new();
    let agent = host.agent(test_config());

    let image = get("/logo.png").with_destination(Destination::Image);
    let style = get("/theme.css").with_destination(Destination::Style);
    let bundled = get("/static/media/font.woff2");

    for request in [&image, &style, &bundled] {
        assert_eq!(agent.route(request), RoutingDecision::StaleWhileRevalidate);
    }

    // First load goes to the network and fills the dynamic partition.
    host.network.ok(&app_url("/theme.css"), "body { color: navy; }");
    assert_eq!(agent.fetch(&style).await.source(), "network");
    assert_eq!(agent.pending_revalidations(), 0);

    // Second load is served from cache and refreshed in the background.
    host.network
        .always(&app_url("/theme.css"), Reply::Respond(Response::ok("body { color: teal; }")));
    let second = agent.fetch(&style).await;
    assert_eq!(second.response().unwrap().text(), "body { color: navy; }");
    assert_eq!(second.source(), "cache");

    agent.settle().await;
    let refreshed = host
        .cached(agent.dynamic_cache_name(), &style)
        .await
        .unwrap();
    assert_eq!(refreshed.text(), "body { color: teal; }");
}

#[tokio::test]
async fn test_uncached_asset_offline_has_no_response() {
    let host = TestHost::new();
    let agent = host.agent(test_config());

    let outcome = agent.fetch(&script("/static/js/chunk.js")).await;
    assert_eq!(outcome, FetchOutcome::NoResponse);
    assert_eq!(agent.pending_revalidations(), 0);
}

#[tokio::test]
async fn test_other_requests_are_network_first_with_any_partition_fallback() {
    let host = TestHost::new();
    let agent = host.agent(test_config());
    let request = get("/manifest.json");
    assert_eq!(agent.route(&request), RoutingDecision::NetworkFirst);

    host.network.script(&app_url("/manifest.json"), Reply::Respond(Response::ok("{\"v\":1}")));
    host.network.script(&app_url("/manifest.json"), Reply::Fail);

    assert_eq!(agent.fetch(&request).await.source(), "network");
    let offline = agent.fetch(&request).await;
    assert_eq!(offline.source(), "cache");
    assert_eq!(offline.response().unwrap().text(), "{\"v\":1}");
}

#[tokio::test]
async fn test_network_first_falls_back_to_static_partition() {
    let host = TestHost::new();
    let agent = host.agent(test_config());
    let request = get("/favicon.ico");

    let static_cache = host
        .storage
        .inner()
        .open(agent.static_cache_name())
        .await
        .unwrap();
    static_cache
        .put(&request, &Response::ok(vec![0u8, 1, 2]))
        .await
        .unwrap();

    let outcome = agent.fetch(&request).await;
    assert_eq!(outcome, FetchOutcome::Cache(Response::ok(vec![0u8, 1, 2])));
}
