//! Test infrastructure for the Satchel offline agent.
//!
//! Provides in-process doubles for every host port so the agent can be
//! driven end to end without a browser runtime.
//!
//! # Usage
//!
//! ```ignore
//! use satchel_tests::{TestHost, test_config};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let host = TestHost::new();
//!     let agent = host.agent(test_config());
//!     // Script host.network, drive the agent, inspect host.badge etc.
//! }
//! ```

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;

/// Initialize test logging (call once per test binary).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,satchel_agent=debug")),
        )
        .with_test_writer()
        .try_init();
}
