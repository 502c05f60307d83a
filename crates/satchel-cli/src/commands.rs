//! CLI command definitions.

use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum Commands {
    /// Cache the app shell and activate the agent
    Install,

    /// Show how a request would be routed
    Route {
        #[command(flatten)]
        request: RequestArgs,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,
    },

    /// Intercept a request through the agent
    Fetch {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// List cache partitions
    Partitions,

    /// Delete every cache partition
    Clear,

    /// Deliver a raw control message
    Message {
        /// Message JSON, e.g. '{"type":"UPDATE_BADGE","count":3}'
        json: String,
    },

    /// Simulate a push event
    Push {
        /// Push payload
        payload: Option<String>,
    },
}

#[derive(Args)]
pub struct RequestArgs {
    /// Absolute request URL
    pub url: String,

    /// Request destination (document, script, style, image, ...)
    #[arg(short, long)]
    pub destination: Option<String>,

    /// Treat as a top-level navigation
    #[arg(long)]
    pub navigate: bool,
}
