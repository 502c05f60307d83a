//! Command handlers.

use crate::commands::RequestArgs;
use crate::config::CliConfig;
use crate::host::ConsoleHost;
use console::style;
use satchel_agent::{FetchOutcome, HostPorts, LifecycleState, OfflineAgent};
use satchel_cache::{FilesystemCacheStorage, PartitionStats};
use satchel_core::ports::Network;
use satchel_core::{ControlMessage, Destination, Method, Request, RequestMode};
use satchel_net::HttpNetwork;
use std::path::PathBuf;
use std::sync::Arc;

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// The agent wired to the on-disk store and the real network.
pub struct Runtime {
    pub agent: OfflineAgent,
    pub storage: Arc<FilesystemCacheStorage>,
    pub network: Arc<HttpNetwork>,
}

impl Runtime {
    pub fn new(config: &CliConfig, store: Option<PathBuf>) -> CliResult<Self> {
        let storage = Arc::new(FilesystemCacheStorage::new(config.store_dir(store)?));
        let network = Arc::new(HttpNetwork::new(&config.network)?);
        let host = Arc::new(ConsoleHost);

        let ports = HostPorts {
            storage: storage.clone(),
            network: network.clone(),
            badge: host.clone(),
            notifier: host.clone(),
            clients: host,
        };
        let agent = OfflineAgent::new(config.agent.clone(), ports)?;
        Ok(Self {
            agent,
            storage,
            network,
        })
    }
}

fn build_request(args: &RequestArgs, method: Method) -> CliResult<Request> {
    let mut request = Request::parse_get(&args.url)?.with_method(method);
    if let Some(destination) = &args.destination {
        request = request.with_destination(destination.parse::<Destination>()?);
    }
    if args.navigate {
        request = request.with_mode(RequestMode::Navigate);
    }
    Ok(request)
}

/// Install and activate.
pub async fn install(runtime: &Runtime) -> CliResult {
    let agent = &runtime.agent;
    println!(
        "Installing {} ({} assets)...",
        style(agent.static_cache_name()).bold(),
        agent.config().static_manifest.len()
    );

    if let Err(e) = agent.install().await {
        println!("{} Install failed: {}", style("✗").red(), e);
        return Err(e.into());
    }
    if agent.state() == LifecycleState::Waiting {
        agent.activate().await?;
    }

    println!("{} Agent {}", style("✓").green(), agent.state());
    for asset in &agent.config().static_manifest {
        println!("  - {}", asset);
    }
    Ok(())
}

/// Print the routing decision for a request.
pub fn route(runtime: &Runtime, args: &RequestArgs, method: &str) -> CliResult {
    let request = build_request(args, method.parse()?)?;
    let decision = runtime.agent.route(&request);
    println!("{} {} -> {}", request.method, request.url, style(decision).cyan());
    Ok(())
}

/// Intercept a request, completing it over the network when the agent passes.
pub async fn fetch(runtime: &Runtime, args: &RequestArgs) -> CliResult {
    let request = build_request(args, Method::Get)?;
    let outcome = runtime.agent.fetch(&request).await;

    let (source, response) = match outcome {
        FetchOutcome::PassThrough => ("pass-through", Some(runtime.network.fetch(&request).await?)),
        other => (other.source(), other.into_response()),
    };

    match response {
        Some(response) => println!(
            "{} {} {} ({}, {} bytes)",
            style("✓").green(),
            response.status,
            response.status_text,
            style(source).cyan(),
            response.body.len()
        ),
        None => println!("{} No response available offline", style("✗").red()),
    }

    runtime.agent.settle().await;
    Ok(())
}

/// List partitions with their entry counts.
pub async fn partitions(runtime: &Runtime) -> CliResult {
    let stats = PartitionStats::collect(runtime.storage.as_ref()).await?;
    if stats.is_empty() {
        println!("{} No cache partitions", style("i").blue());
        return Ok(());
    }

    let agent = &runtime.agent;
    for partition in stats {
        let current = partition.name == agent.static_cache_name()
            || partition.name == agent.dynamic_cache_name();
        let marker = if current { style("*").green() } else { style(" ").dim() };
        println!("{} {:<40} {:>6} entries", marker, partition.name, partition.entries);
    }
    Ok(())
}

/// Send `CLEAR_CACHE`.
pub async fn clear(runtime: &Runtime) -> CliResult {
    runtime.agent.handle_message(ControlMessage::ClearCache).await;
    println!("{} Cache cleared", style("✓").green());
    Ok(())
}

/// Deliver a raw control message.
pub async fn message(runtime: &Runtime, json: &str) -> CliResult {
    let message = ControlMessage::from_json(json)?;
    let kind = message.kind();
    runtime.agent.handle_message(message).await;
    println!(
        "{} Delivered {} (badge {})",
        style("✓").green(),
        style(kind).bold(),
        runtime.agent.badge_count()
    );
    Ok(())
}

/// Simulate a push event.
pub async fn push(runtime: &Runtime, payload: Option<&str>) -> CliResult {
    runtime.agent.push(payload.map(str::as_bytes)).await;
    println!(
        "{} Push handled (badge {})",
        style("✓").green(),
        runtime.agent.badge_count()
    );
    Ok(())
}
