//! Stored entry and statistics types.

use chrono::{DateTime, Utc};
use satchel_core::ports::CacheStorage;
use satchel_core::{Request, Response, Result};
use serde::{Deserialize, Serialize};

/// A request/response pair as kept inside a partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub request: Request,
    pub response: Response,
    /// When the entry was (last) written.
    pub stored_at: DateTime<Utc>,
}

impl StoredEntry {
    pub fn new(request: Request, response: Response) -> Self {
        Self {
            request,
            response,
            stored_at: Utc::now(),
        }
    }
}

/// Summary of one partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionStats {
    pub name: String,
    pub entries: u64,
}

impl PartitionStats {
    /// Entry counts for every partition in `storage`.
    pub async fn collect(storage: &dyn CacheStorage) -> Result<Vec<PartitionStats>> {
        let mut stats = Vec::new();
        for name in storage.keys().await? {
            let cache = storage.open(&name).await?;
            let entries = cache.keys().await?.len() as u64;
            stats.push(PartitionStats { name, entries });
        }
        Ok(stats)
    }
}
