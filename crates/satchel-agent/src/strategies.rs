//! Fetch strategies applied to intercepted requests.

use satchel_core::ports::{CacheStorage, Network};
use satchel_core::{Request, Response};
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Result of intercepting one request.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Not intercepted; the host performs the request itself.
    PassThrough,
    /// Answered from the network.
    Network(Response),
    /// Answered from a cache partition.
    Cache(Response),
    /// Intercepted, but neither the network nor any partition had an answer.
    NoResponse,
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Network(response) | FetchOutcome::Cache(response) => Some(response),
            FetchOutcome::PassThrough | FetchOutcome::NoResponse => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            FetchOutcome::Network(response) | FetchOutcome::Cache(response) => Some(response),
            FetchOutcome::PassThrough | FetchOutcome::NoResponse => None,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            FetchOutcome::PassThrough => "pass-through",
            FetchOutcome::Network(_) => "network",
            FetchOutcome::Cache(_) => "cache",
            FetchOutcome::NoResponse => "none",
        }
    }
}

/// Store a 200 response in the dynamic partition. Failures are logged only.
async fn store_dynamic(
    storage: &dyn CacheStorage,
    dynamic_cache: &str,
    request: &Request,
    response: &Response,
) {
    if !response.is_ok() {
        debug!(url = %request.url, status = response.status, "Not caching non-200 response");
        return;
    }
    let result = match storage.open(dynamic_cache).await {
        Ok(cache) => cache.put(request, response).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        warn!(url = %request.url, partition = %dynamic_cache, error = %e, "Failed to update dynamic cache");
    }
}

/// Drop completed revalidations so the set only holds running tasks.
fn reap_finished(set: &mut JoinSet<()>) {
    while let Some(result) = set.try_join_next() {
        if let Err(e) = result {
            warn!(error = %e, "Revalidation task panicked");
        }
    }
}

/// Runs the three caching strategies against the storage and network ports.
pub struct FetchHandler {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    dynamic_cache: String,
    root_request: Request,
    revalidations: Mutex<JoinSet<()>>,
}

impl FetchHandler {
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        dynamic_cache: String,
        root_request: Request,
    ) -> Self {
        Self {
            storage,
            network,
            dynamic_cache,
            root_request,
            revalidations: Mutex::new(JoinSet::new()),
        }
    }

    async fn dynamic_copy(&self, request: &Request) -> Option<Response> {
        let lookup = match self.storage.open(&self.dynamic_cache).await {
            Ok(cache) => cache.get(request).await,
            Err(e) => Err(e),
        };
        lookup.unwrap_or_else(|e| {
            warn!(url = %request.url, error = %e, "Dynamic cache lookup failed");
            None
        })
    }

    async fn any_copy(&self, request: &Request) -> Option<Response> {
        self.storage.match_any(request).await.unwrap_or_else(|e| {
            warn!(url = %request.url, error = %e, "Cache lookup failed");
            None
        })
    }

    /// Documents: fresh when online, last copy (or the app shell) when offline.
    pub async fn network_first_document(&self, request: &Request) -> FetchOutcome {
        match self.network.fetch(request).await {
            Ok(response) => {
                store_dynamic(self.storage.as_ref(), &self.dynamic_cache, request, &response).await;
                FetchOutcome::Network(response)
            }
            Err(e) => {
                debug!(url = %request.url, error = %e, "Document fetch failed, using cache");
                if let Some(cached) = self.dynamic_copy(request).await {
                    return FetchOutcome::Cache(cached);
                }
                match self.any_copy(&self.root_request).await {
                    Some(root) => FetchOutcome::Cache(root),
                    None => FetchOutcome::NoResponse,
                }
            }
        }
    }

    /// Static assets: answer from cache immediately, refresh for next time.
    pub async fn stale_while_revalidate(&self, request: &Request) -> FetchOutcome {
        if let Some(cached) = self.any_copy(request).await {
            self.spawn_revalidation(request.clone());
            return FetchOutcome::Cache(cached);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                store_dynamic(self.storage.as_ref(), &self.dynamic_cache, request, &response).await;
                FetchOutcome::Network(response)
            }
            Err(e) => {
                debug!(url = %request.url, error = %e, "Asset fetch failed with nothing cached");
                FetchOutcome::NoResponse
            }
        }
    }

    /// Everything else: network, then whatever is cached for this request.
    pub async fn network_first(&self, request: &Request) -> FetchOutcome {
        match self.network.fetch(request).await {
            Ok(response) => {
                store_dynamic(self.storage.as_ref(), &self.dynamic_cache, request, &response).await;
                FetchOutcome::Network(response)
            }
            Err(e) => {
                debug!(url = %request.url, error = %e, "Fetch failed, using cache");
                match self.any_copy(request).await {
                    Some(cached) => FetchOutcome::Cache(cached),
                    None => FetchOutcome::NoResponse,
                }
            }
        }
    }

    fn spawn_revalidation(&self, request: Request) {
        let storage = Arc::clone(&self.storage);
        let network = Arc::clone(&self.network);
        let dynamic_cache = self.dynamic_cache.clone();

        let task = async move {
            match network.fetch(&request).await {
                Ok(response) => {
                    store_dynamic(storage.as_ref(), &dynamic_cache, &request, &response).await;
                }
                Err(e) => {
                    debug!(url = %request.url, error = %e, "Background revalidation failed");
                }
            }
        };

        let mut set = match self.revalidations.lock() {
            Ok(set) => set,
            Err(poisoned) => poisoned.into_inner(),
        };
        reap_finished(&mut set);
        set.spawn(task);
    }

    /// Number of background revalidations still running.
    pub fn pending_revalidations(&self) -> usize {
        let mut set = match self.revalidations.lock() {
            Ok(set) => set,
            Err(poisoned) => poisoned.into_inner(),
        };
        reap_finished(&mut set);
        set.len()
    }

    /// Wait for every background revalidation spawned so far.
    pub async fn settle(&self) {
        let mut set = match self.revalidations.lock() {
            Ok(mut set) => std::mem::take(&mut *set),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        while let Some(result) = set.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Revalidation task panicked");
            }
        }
    }
}
