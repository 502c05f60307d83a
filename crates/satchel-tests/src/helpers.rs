//! Test doubles for every host port.

use async_trait::async_trait;
use satchel_agent::{AgentConfig, HostPorts, OfflineAgent};
use satchel_cache::MemoryCacheStorage;
use satchel_core::ports::{Badge, Cache, CacheStorage, ClientWindow, Clients, Network, Notifier};
use satchel_core::{
    BroadcastMessage, ClientId, Error, NotificationTemplate, Request, Response, Result,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

/// What the scripted network does for one call.
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(Response),
    /// Fail at the network layer.
    Fail,
    /// Never settle.
    Hang,
}

/// Network double answering from a per-URL script.
///
/// Each URL holds a queue of replies; the last one repeats. Unscripted URLs
/// fail at the network layer.
#[derive(Default)]
pub struct ScriptedNetwork {
    script: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<Request>>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `url`.
    pub fn script(&self, url: &str, reply: Reply) {
        self.script
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Replace whatever is queued for `url` with a single repeating reply.
    pub fn always(&self, url: &str, reply: Reply) {
        self.script
            .lock()
            .unwrap()
            .insert(url.to_string(), VecDeque::from([reply]));
    }

    pub fn ok(&self, url: &str, body: &str) {
        self.script(url, Reply::Respond(Response::ok(body)));
    }

    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.as_str() == url)
            .count()
    }

    fn next_reply(&self, url: &str) -> Reply {
        let mut script = self.script.lock().unwrap();
        match script.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Reply::Fail),
            Some(queue) => queue.front().cloned().unwrap_or(Reply::Fail),
            None => Reply::Fail,
        }
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        self.calls.lock().unwrap().push(request.clone());
        match self.next_reply(request.url.as_str()) {
            Reply::Respond(response) => Ok(response),
            Reply::Fail => Err(Error::Network(format!("{}: connection refused", request.url))),
            Reply::Hang => futures::future::pending().await,
        }
    }
}

/// A badge call as seen by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeCall {
    Set(u64),
    Clear,
}

/// Badge double recording every call.
#[derive(Default)]
pub struct RecordingBadge {
    calls: Mutex<Vec<BadgeCall>>,
    unsupported: bool,
}

impl RecordingBadge {
    pub fn new() -> Self {
        Self::default()
    }

    /// A platform without the badging API.
    pub fn unsupported() -> Self {
        Self {
            unsupported: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<BadgeCall> {
        self.calls.lock().unwrap().clone()
    }

    /// What the platform currently shows.
    pub fn shown(&self) -> Option<u64> {
        match self.calls.lock().unwrap().last() {
            Some(BadgeCall::Set(n)) => Some(*n),
            Some(BadgeCall::Clear) | None => None,
        }
    }
}

#[async_trait]
impl Badge for RecordingBadge {
    async fn set(&self, count: u64) -> Result<()> {
        if self.unsupported {
            return Err(Error::Unsupported("navigator.setAppBadge".to_string()));
        }
        self.calls.lock().unwrap().push(BadgeCall::Set(count));
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.unsupported {
            return Err(Error::Unsupported("navigator.clearAppBadge".to_string()));
        }
        self.calls.lock().unwrap().push(BadgeCall::Clear);
        Ok(())
    }
}

/// Notification display double.
#[derive(Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<NotificationTemplate>>,
    closed: Mutex<Vec<Option<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<NotificationTemplate> {
        self.shown.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<Option<String>> {
        self.closed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show(&self, notification: &NotificationTemplate) -> Result<()> {
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn close(&self, tag: Option<&str>) -> Result<()> {
        self.closed.lock().unwrap().push(tag.map(str::to_string));
        Ok(())
    }
}

/// Open application windows.
#[derive(Default)]
pub struct FakeClients {
    windows: Mutex<Vec<ClientWindow>>,
    posted: Mutex<Vec<(ClientId, BroadcastMessage)>>,
    focused: Mutex<Vec<ClientId>>,
    opened: Mutex<Vec<Url>>,
    unreachable: Mutex<HashSet<ClientId>>,
    claims: AtomicUsize,
}

impl FakeClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an open window at `url`.
    pub fn open(&self, url: &str) -> ClientId {
        let id = ClientId::new();
        self.windows.lock().unwrap().push(ClientWindow {
            id,
            url: Url::parse(url).unwrap(),
            focused: false,
        });
        id
    }

    /// Make posting to `id` fail.
    pub fn make_unreachable(&self, id: ClientId) {
        self.unreachable.lock().unwrap().insert(id);
    }

    pub fn posted(&self) -> Vec<(ClientId, BroadcastMessage)> {
        self.posted.lock().unwrap().clone()
    }

    pub fn focused(&self) -> Vec<ClientId> {
        self.focused.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<Url> {
        self.opened.lock().unwrap().clone()
    }

    pub fn claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Clients for FakeClients {
    async fn windows(&self) -> Result<Vec<ClientWindow>> {
        Ok(self.windows.lock().unwrap().clone())
    }

    async fn focus(&self, id: ClientId) -> Result<()> {
        let mut windows = self.windows.lock().unwrap();
        for window in windows.iter_mut() {
            window.focused = window.id == id;
        }
        self.focused.lock().unwrap().push(id);
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<ClientId> {
        self.opened.lock().unwrap().push(url.clone());
        Ok(ClientId::new())
    }

    async fn post(&self, id: ClientId, message: &BroadcastMessage) -> Result<()> {
        if self.unreachable.lock().unwrap().contains(&id) {
            return Err(Error::Internal(format!("client {} is gone", id)));
        }
        self.posted.lock().unwrap().push((id, message.clone()));
        Ok(())
    }

    async fn claim(&self) -> Result<()> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Storage wrapper counting every operation that reaches the inner storage.
pub struct ObservedStorage {
    inner: MemoryCacheStorage,
    operations: Arc<AtomicUsize>,
}

impl ObservedStorage {
    pub fn new(inner: MemoryCacheStorage) -> Self {
        Self {
            inner,
            operations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryCacheStorage {
        &self.inner
    }

    fn touch(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }
}

struct ObservedCache {
    inner: Arc<dyn Cache>,
    operations: Arc<AtomicUsize>,
}

#[async_trait]
impl Cache for ObservedCache {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, request: &Request) -> Result<Option<Response>> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        self.inner.get(request).await
    }

    async fn put(&self, request: &Request, response: &Response) -> Result<()> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        self.inner.put(request, response).await
    }

    async fn delete(&self, request: &Request) -> Result<bool> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(request).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        self.inner.keys().await
    }
}

#[async_trait]
impl CacheStorage for ObservedStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>> {
        self.touch();
        let inner = self.inner.open(name).await?;
        Ok(Arc::new(ObservedCache {
            inner,
            operations: Arc::clone(&self.operations),
        }))
    }

    async fn has(&self, name: &str) -> Result<bool> {
        self.touch();
        self.inner.has(name).await
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        self.touch();
        self.inner.delete(name).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.touch();
        self.inner.keys().await
    }
}

/// Storage whose every operation fails.
#[derive(Default)]
pub struct FailingStorage;

#[async_trait]
impl CacheStorage for FailingStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>> {
        Err(Error::Storage(format!("quota exceeded opening {}", name)))
    }

    async fn has(&self, _name: &str) -> Result<bool> {
        Err(Error::Storage("storage unavailable".to_string()))
    }

    async fn delete(&self, _name: &str) -> Result<bool> {
        Err(Error::Storage("storage unavailable".to_string()))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Err(Error::Storage("storage unavailable".to_string()))
    }
}

/// Memory storage that refuses writes once a quota of puts is used up.
pub struct QuotaStorage {
    inner: MemoryCacheStorage,
    remaining: Arc<AtomicUsize>,
}

impl QuotaStorage {
    pub fn new(puts: usize) -> Self {
        Self {
            inner: MemoryCacheStorage::new(),
            remaining: Arc::new(AtomicUsize::new(puts)),
        }
    }

    pub fn inner(&self) -> &MemoryCacheStorage {
        &self.inner
    }
}

struct QuotaCache {
    inner: Arc<dyn Cache>,
    remaining: Arc<AtomicUsize>,
}

#[async_trait]
impl Cache for QuotaCache {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, request: &Request) -> Result<Option<Response>> {
        self.inner.get(request).await
    }

    async fn put(&self, request: &Request, response: &Response) -> Result<()> {
        let granted = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !granted {
            return Err(Error::Storage(format!(
                "quota exceeded writing {}",
                request.url
            )));
        }
        self.inner.put(request, response).await
    }

    async fn delete(&self, request: &Request) -> Result<bool> {
        self.inner.delete(request).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.inner.keys().await
    }
}

#[async_trait]
impl CacheStorage for QuotaStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>> {
        let inner = self.inner.open(name).await?;
        Ok(Arc::new(QuotaCache {
            inner,
            remaining: Arc::clone(&self.remaining),
        }))
    }

    async fn has(&self, name: &str) -> Result<bool> {
        self.inner.has(name).await
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        self.inner.delete(name).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.inner.keys().await
    }
}

/// A full set of doubles plus the agent built on them.
pub struct TestHost {
    pub storage: Arc<ObservedStorage>,
    pub network: Arc<ScriptedNetwork>,
    pub badge: Arc<RecordingBadge>,
    pub notifier: Arc<RecordingNotifier>,
    pub clients: Arc<FakeClients>,
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHost {
    pub fn new() -> Self {
        Self::with_badge(RecordingBadge::new())
    }

    pub fn with_badge(badge: RecordingBadge) -> Self {
        Self {
            storage: Arc::new(ObservedStorage::new(MemoryCacheStorage::new())),
            network: Arc::new(ScriptedNetwork::new()),
            badge: Arc::new(badge),
            notifier: Arc::new(RecordingNotifier::new()),
            clients: Arc::new(FakeClients::new()),
        }
    }

    pub fn ports(&self) -> HostPorts {
        HostPorts {
            storage: self.storage.clone(),
            network: self.network.clone(),
            badge: self.badge.clone(),
            notifier: self.notifier.clone(),
            clients: self.clients.clone(),
        }
    }

    /// Same doubles, with a different storage behind the agent.
    pub fn ports_with_storage(&self, storage: Arc<dyn CacheStorage>) -> HostPorts {
        HostPorts {
            storage,
            ..self.ports()
        }
    }

    pub fn agent(&self, config: AgentConfig) -> OfflineAgent {
        OfflineAgent::new(config, self.ports()).expect("valid test config")
    }

    /// Stored response for `request` in partition `name`, without counting
    /// as an agent operation.
    pub async fn cached(&self, name: &str, request: &Request) -> Option<Response> {
        let partition = self.storage.inner().partition(name).await?;
        partition.get(request).await.ok().flatten()
    }

    pub async fn partition_names(&self) -> Vec<String> {
        self.storage.inner().keys().await.unwrap()
    }

    pub async fn entry_keys(&self, name: &str) -> Vec<String> {
        match self.storage.inner().partition(name).await {
            Some(partition) => partition.keys().await.unwrap(),
            None => vec![],
        }
    }
}
