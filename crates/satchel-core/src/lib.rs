//! Satchel Core
//!
//! Domain types, port traits, and error handling for the Satchel offline
//! delivery agent. This crate has minimal dependencies and defines the shared
//! vocabulary used by the cache adapters, the network adapter, and the agent.

pub mod error;
pub mod http;
pub mod ids;
pub mod messages;
pub mod notification;
pub mod ports;

pub use error::{Error, Result};
pub use http::{Destination, Method, Request, RequestMode, Response};
pub use ids::ClientId;
pub use messages::{BroadcastMessage, ControlMessage, UserRef};
pub use notification::{NotificationRecord, NotificationTemplate};
