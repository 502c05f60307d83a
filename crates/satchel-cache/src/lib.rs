//! Cache storage for the Satchel offline agent (in-memory and on-disk).

pub mod filesystem;
pub mod keys;
pub mod memory;
pub mod naming;
pub mod types;

pub use filesystem::FilesystemCacheStorage;
pub use keys::{entry_digest, partition_dir_name, sanitize_partition_name};
pub use memory::MemoryCacheStorage;
pub use naming::{PartitionKind, PartitionName};
pub use types::{PartitionStats, StoredEntry};
