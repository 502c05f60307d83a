//! Best-effort application badge.

use satchel_core::ports::Badge;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Mirrors the badge count to the platform and remembers the last value the
/// platform accepted. Platform failures are logged and swallowed.
pub struct BadgeController {
    port: Arc<dyn Badge>,
    current: AtomicU64,
}

impl BadgeController {
    pub fn new(port: Arc<dyn Badge>) -> Self {
        Self {
            port,
            current: AtomicU64::new(0),
        }
    }

    /// Last count successfully shown. Zero when cleared or never set.
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Zero clears the badge, anything else sets it to exactly `count`.
    pub async fn update(&self, count: u64) {
        let result = if count == 0 {
            self.port.clear().await
        } else {
            self.port.set(count).await
        };

        match result {
            Ok(()) => {
                self.current.store(count, Ordering::SeqCst);
                debug!(count, "Badge updated");
            }
            Err(e) => warn!(count, error = %e, "Badge update failed"),
        }
    }

    pub async fn increment(&self, by: u64) {
        let next = self.current().saturating_add(by);
        self.update(next).await;
    }
}
