//! Offline delivery agent for the Satchel school administration app.
//!
//! The agent sits between the application shell and the network. It
//! classifies every outgoing request into a caching policy, owns the two
//! versioned cache partitions, and relays badge and push-notification events
//! to open application windows.

pub mod agent;
pub mod badge;
pub mod config;
pub mod lifecycle;
pub mod notifications;
pub mod routing;
pub mod strategies;

pub use agent::{AgentEvent, EventOutcome, HostPorts, OfflineAgent};
pub use badge::BadgeController;
pub use config::AgentConfig;
pub use lifecycle::LifecycleState;
pub use notifications::{NotificationsClient, Session};
pub use routing::{PassReason, Router, RoutingDecision};
pub use strategies::{FetchHandler, FetchOutcome};
