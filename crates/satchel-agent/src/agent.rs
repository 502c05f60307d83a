//! The offline delivery agent.

use crate::badge::BadgeController;
use crate::config::AgentConfig;
use crate::lifecycle::LifecycleState;
use crate::notifications::{NotificationsClient, Session, parse_push_payload, unread_hint};
use crate::routing::{Router, RoutingDecision};
use crate::strategies::{FetchHandler, FetchOutcome};
use satchel_cache::PartitionName;
use satchel_core::ports::{Badge, CacheStorage, Clients, Network, Notifier};
use satchel_core::{
    BroadcastMessage, ControlMessage, Error, NotificationRecord, NotificationTemplate, Request,
    Response, Result,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use url::Url;

/// Host capabilities the agent runs against.
#[derive(Clone)]
pub struct HostPorts {
    pub storage: Arc<dyn CacheStorage>,
    pub network: Arc<dyn Network>,
    pub badge: Arc<dyn Badge>,
    pub notifier: Arc<dyn Notifier>,
    pub clients: Arc<dyn Clients>,
}

/// Everything the host can deliver to the agent.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    Install,
    Activate,
    Fetch(Request),
    Message(ControlMessage),
    /// Raw push payload, if the push carried one.
    Push(Option<Vec<u8>>),
    /// The user clicked a displayed notification.
    NotificationClick(NotificationTemplate),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Fetch(FetchOutcome),
    Handled,
}

/// Offline delivery agent.
pub struct OfflineAgent {
    config: AgentConfig,
    router: Router,
    static_cache: String,
    dynamic_cache: String,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    notifier: Arc<dyn Notifier>,
    clients: Arc<dyn Clients>,
    fetcher: FetchHandler,
    notifications: NotificationsClient,
    badge: BadgeController,
    state_tx: watch::Sender<LifecycleState>,
    state_rx: watch::Receiver<LifecycleState>,
    skip_waiting: AtomicBool,
    session: Mutex<Option<Session>>,
}

impl OfflineAgent {
    /// Create an agent in the `Installing` state.
    pub fn new(config: AgentConfig, ports: HostPorts) -> Result<Self> {
        config.validate()?;

        let static_cache = config.static_cache_name();
        let dynamic_cache = config.dynamic_cache_name();
        let fetcher = FetchHandler::new(
            Arc::clone(&ports.storage),
            Arc::clone(&ports.network),
            dynamic_cache.clone(),
            config.root_request()?,
        );
        let notifications =
            NotificationsClient::new(Arc::clone(&ports.network), config.notifications_url()?);
        let (state_tx, state_rx) = watch::channel(LifecycleState::Installing);

        Ok(Self {
            router: Router::new(&config),
            static_cache,
            dynamic_cache,
            storage: ports.storage,
            network: ports.network,
            notifier: ports.notifier,
            clients: ports.clients,
            fetcher,
            notifications,
            badge: BadgeController::new(ports.badge),
            state_tx,
            state_rx,
            skip_waiting: AtomicBool::new(false),
            session: Mutex::new(None),
            config,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn static_cache_name(&self) -> &str {
        &self.static_cache
    }

    pub fn dynamic_cache_name(&self) -> &str {
        &self.dynamic_cache
    }

    pub fn state(&self) -> LifecycleState {
        *self.state_rx.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<LifecycleState> {
        self.state_rx.clone()
    }

    /// Last badge count the platform accepted.
    pub fn badge_count(&self) -> u64 {
        self.badge.current()
    }

    fn set_state(&self, state: LifecycleState) {
        let _ = self.state_tx.send(state);
    }

    /// Dispatch one host event.
    pub async fn handle_event(&self, event: AgentEvent) -> Result<EventOutcome> {
        match event {
            AgentEvent::Install => self.install().await?,
            AgentEvent::Activate => self.activate().await?,
            AgentEvent::Fetch(request) => return Ok(EventOutcome::Fetch(self.fetch(&request).await)),
            AgentEvent::Message(message) => self.handle_message(message).await,
            AgentEvent::Push(payload) => self.push(payload.as_deref()).await,
            AgentEvent::NotificationClick(notification) => {
                self.notification_click(&notification).await
            }
        }
        Ok(EventOutcome::Handled)
    }

    /// Populate the static partition with the app shell.
    ///
    /// All-or-nothing: if any manifest asset cannot be fetched with a 200,
    /// nothing is stored and the agent becomes redundant.
    pub async fn install(&self) -> Result<()> {
        let state = self.state();
        if state != LifecycleState::Installing {
            return Err(Error::Internal(format!("Cannot install in state {}", state)));
        }

        info!(partition = %self.static_cache, assets = self.config.static_manifest.len(), "Installing");

        if let Err(e) = self.precache().await {
            error!(error = %e, "Install failed");
            self.set_state(LifecycleState::Redundant);
            return Err(e);
        }

        self.set_state(LifecycleState::Waiting);
        if self.config.skip_waiting || self.skip_waiting.load(Ordering::SeqCst) {
            return self.activate().await;
        }

        info!("Installed, waiting for activation");
        Ok(())
    }

    async fn precache(&self) -> Result<()> {
        let requests = self.config.manifest_requests()?;
        let responses =
            futures::future::join_all(requests.iter().map(|r| self.network.fetch(r))).await;

        let mut assets: Vec<(&Request, Response)> = Vec::with_capacity(requests.len());
        for (request, result) in requests.iter().zip(responses) {
            match result {
                Ok(response) if response.is_ok() => assets.push((request, response)),
                Ok(response) => {
                    return Err(Error::Install {
                        url: request.url.to_string(),
                        reason: format!("HTTP {}", response.status),
                    });
                }
                Err(e) => {
                    return Err(Error::Install {
                        url: request.url.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let cache = self.storage.open(&self.static_cache).await?;
        for (idx, (request, response)) in assets.iter().enumerate() {
            if let Err(e) = cache.put(request, response).await {
                // Roll back what this install wrote.
                for (written, _) in &assets[..idx] {
                    if let Err(rollback) = cache.delete(written).await {
                        warn!(
                            partition = %self.static_cache,
                            url = %written.url,
                            error = %rollback,
                            "Failed to roll back precached entry"
                        );
                    }
                }
                return Err(Error::Install {
                    url: request.url.to_string(),
                    reason: e.to_string(),
                });
            }
        }

        debug!(partition = %self.static_cache, entries = assets.len(), "App shell cached");
        Ok(())
    }

    /// Delete partitions from other versions, then take control of all clients.
    pub async fn activate(&self) -> Result<()> {
        match self.state() {
            LifecycleState::Active => return Ok(()),
            LifecycleState::Installing | LifecycleState::Redundant => {
                return Err(Error::Internal(format!(
                    "Cannot activate in state {}",
                    self.state()
                )));
            }
            LifecycleState::Waiting | LifecycleState::Activating => {}
        }

        self.set_state(LifecycleState::Activating);

        match self.storage.keys().await {
            Ok(names) => {
                for name in names
                    .into_iter()
                    .filter(|n| n != &self.static_cache && n != &self.dynamic_cache)
                {
                    match self.storage.delete(&name).await {
                        Ok(_) => match PartitionName::parse(&name) {
                            Some(old) => {
                                info!(partition = %name, version = %old.version, "Deleted stale partition")
                            }
                            None => info!(partition = %name, "Deleted foreign partition"),
                        },
                        Err(e) => warn!(partition = %name, error = %e, "Failed to delete partition"),
                    }
                }
            }
            Err(e) => warn!(error = %e, "Could not enumerate partitions during activation"),
        }

        if let Err(e) = self.clients.claim().await {
            warn!(error = %e, "Failed to claim clients");
        }

        self.set_state(LifecycleState::Active);
        info!(
            static_cache = %self.static_cache,
            dynamic_cache = %self.dynamic_cache,
            "Agent active"
        );
        Ok(())
    }

    /// Intercept one request.
    pub async fn fetch(&self, request: &Request) -> FetchOutcome {
        if !self.state().intercepts() {
            return FetchOutcome::PassThrough;
        }

        let decision = self.router.route(request);
        debug!(method = %request.method, url = %request.url, %decision, "Routing request");

        match decision {
            RoutingDecision::PassThrough(_) => FetchOutcome::PassThrough,
            RoutingDecision::NetworkFirstDocument => {
                self.fetcher.network_first_document(request).await
            }
            RoutingDecision::StaleWhileRevalidate => {
                self.fetcher.stale_while_revalidate(request).await
            }
            RoutingDecision::NetworkFirst => self.fetcher.network_first(request).await,
        }
    }

    /// Routing decision for a request without performing it.
    pub fn route(&self, request: &Request) -> RoutingDecision {
        self.router.route(request)
    }

    /// Wait for background revalidations started so far.
    pub async fn settle(&self) {
        self.fetcher.settle().await;
    }

    pub fn pending_revalidations(&self) -> usize {
        self.fetcher.pending_revalidations()
    }

    /// Decode a JSON control message and handle it.
    pub async fn handle_message_json(&self, raw: &str) -> Result<()> {
        let message = ControlMessage::from_json(raw).map_err(|e| {
            warn!(error = %e, "Ignoring undecodable control message");
            e
        })?;
        self.handle_message(message).await;
        Ok(())
    }

    /// Handle a control message. Failures are logged, never returned.
    pub async fn handle_message(&self, message: ControlMessage) {
        debug!(kind = message.kind(), "Control message");
        match message {
            ControlMessage::SkipWaiting => self.skip_waiting().await,
            ControlMessage::ClearCache => {
                self.clear_caches().await;
            }
            ControlMessage::UpdateBadge { count } => self.badge.update(count).await,
            ControlMessage::FetchNotifications { user_id, token } => {
                let session = Session { user_id, token };
                self.remember_session(session.clone());
                self.refresh_notifications(&session).await;
            }
        }
    }

    async fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
        match self.state() {
            LifecycleState::Waiting => {
                if let Err(e) = self.activate().await {
                    warn!(error = %e, "Skip-waiting activation failed");
                }
            }
            state => debug!(%state, "Skip-waiting noted"),
        }
    }

    /// Delete every partition. Returns how many were removed.
    pub async fn clear_caches(&self) -> usize {
        let names = match self.storage.keys().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Could not enumerate partitions to clear");
                return 0;
            }
        };

        let mut deleted = 0;
        for name in names {
            match self.storage.delete(&name).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => warn!(partition = %name, error = %e, "Failed to delete partition"),
            }
        }
        info!(deleted, "Cleared all cache partitions");
        deleted
    }

    fn remember_session(&self, session: Session) {
        match self.session.lock() {
            Ok(mut slot) => *slot = Some(session),
            Err(poisoned) => *poisoned.into_inner() = Some(session),
        }
    }

    fn current_session(&self) -> Option<Session> {
        match self.session.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Fetch the notification list, update the badge, and broadcast the
    /// result. Returns the unread count, or `None` when the fetch failed.
    pub async fn refresh_notifications(&self, session: &Session) -> Option<u64> {
        let notifications = match self.notifications.fetch(session).await {
            Ok(list) => list,
            Err(e) => {
                warn!(user = %session.user_id, error = %e, "Notification fetch failed");
                return None;
            }
        };

        let count = NotificationRecord::unread_count(&notifications);
        self.badge.update(count).await;

        let delivered = self
            .broadcast(&BroadcastMessage::NotificationsUpdated {
                count,
                notifications,
            })
            .await;
        info!(user = %session.user_id, count, delivered, "Notifications updated");
        Some(count)
    }

    /// Post a message to every connected client. Returns how many received it.
    pub async fn broadcast(&self, message: &BroadcastMessage) -> usize {
        let windows = match self.clients.windows().await {
            Ok(windows) => windows,
            Err(e) => {
                warn!(error = %e, "Could not list clients for broadcast");
                return 0;
            }
        };

        let mut delivered = 0;
        for window in windows {
            match self.clients.post(window.id, message).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(client = %window.id, error = %e, "Failed to post to client"),
            }
        }
        delivered
    }

    /// Show a push notification and bring the badge up to date.
    ///
    /// The badge follows the server's unread count when the payload carries
    /// one, otherwise a refresh with the remembered session, otherwise +1.
    pub async fn push(&self, payload: Option<&[u8]>) {
        let parsed = parse_push_payload(payload);
        let notification = match &parsed {
            Some(value) => self.config.notification.merged_with(value),
            None => self.config.notification.clone(),
        };

        if let Err(e) = self.notifier.show(&notification).await {
            warn!(error = %e, "Failed to display notification");
        }

        if let Some(count) = parsed.as_ref().and_then(unread_hint) {
            self.badge.update(count).await;
            return;
        }

        if let Some(session) = self.current_session() {
            if self.refresh_notifications(&session).await.is_some() {
                return;
            }
        }

        self.badge.increment(1).await;
    }

    /// Close the notification and focus (or open) an application window.
    pub async fn notification_click(&self, notification: &NotificationTemplate) {
        if let Err(e) = self.notifier.close(notification.tag.as_deref()).await {
            warn!(error = %e, "Failed to close notification");
        }

        let own_origin = self.config.origin.origin();
        let windows = self.clients.windows().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not list clients");
            vec![]
        });

        if let Some(window) = windows.iter().find(|w| w.url.origin() == own_origin) {
            if let Err(e) = self.clients.focus(window.id).await {
                warn!(client = %window.id, error = %e, "Failed to focus client");
            }
            return;
        }

        let target = self.click_target(notification);
        match self.clients.open_window(&target).await {
            Ok(id) => debug!(client = %id, url = %target, "Opened window"),
            Err(e) => warn!(url = %target, error = %e, "Failed to open window"),
        }
    }

    fn click_target(&self, notification: &NotificationTemplate) -> Url {
        let root = self.config.origin.join("/").unwrap_or_else(|_| self.config.origin.clone());
        notification
            .url
            .as_deref()
            .and_then(|url| self.config.origin.join(url).ok())
            .filter(|url| url.origin() == self.config.origin.origin())
            .unwrap_or(root)
    }
}
