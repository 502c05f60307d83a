//! Network port over `reqwest`.

pub mod client;

pub use client::{HttpNetwork, HttpNetworkConfig};
