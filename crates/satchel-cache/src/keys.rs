//! Cache key utilities.

use satchel_core::{Error, Method, Request, Result};
use sha2::{Digest, Sha256};

/// Stable digest of a request's cache key, used as the on-disk entry name.
pub fn entry_digest(request: &Request) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.cache_key().as_bytes());
    hex::encode(hasher.finalize())
}

/// Partitions only ever hold GET requests.
pub fn ensure_cacheable(request: &Request) -> Result<()> {
    if request.method != Method::Get {
        return Err(Error::Storage(format!(
            "Only GET requests can be cached, got {}",
            request.method
        )));
    }
    Ok(())
}

/// Sanitize a partition name for use as a directory name.
pub fn sanitize_partition_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// Directory name for a partition: the sanitized name plus a short digest of
/// the exact name, so names that sanitize alike stay apart.
pub fn partition_dir_name(name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    let hash = hasher.finalize();
    format!("{}-{}", sanitize_partition_name(name), hex::encode(&hash[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_digest_depends_on_exact_url() {
        let a = Request::parse_get("https://app.example.org/static/js/app.js").unwrap();
        let b = Request::parse_get("https://app.example.org/static/js/app.js?v=2").unwrap();
        assert_eq!(entry_digest(&a), entry_digest(&a.clone()));
        assert_ne!(entry_digest(&a), entry_digest(&b));
        assert_eq!(entry_digest(&a).len(), 64);
    }

    #[test]
    fn test_ensure_cacheable() {
        let get = Request::parse_get("https://app.example.org/").unwrap();
        assert!(ensure_cacheable(&get).is_ok());
        assert!(ensure_cacheable(&get.with_method(Method::Post)).is_err());
    }

    #[test]
    fn test_sanitize_partition_name() {
        assert_eq!(sanitize_partition_name("satchel-static-v1.0.0"), "satchel-static-v1.0.0");
        assert_eq!(sanitize_partition_name("a/b:c"), "a_b_c");
    }

    #[test]
    fn test_partition_dir_name_keeps_similar_names_apart() {
        let slashed = partition_dir_name("shell/v1");
        let underscored = partition_dir_name("shell_v1");
        assert_ne!(slashed, underscored);
        assert!(underscored.starts_with("shell_v1-"));
        assert!(!slashed.contains('/'));
        assert_eq!(partition_dir_name("shell/v1"), slashed);
    }
}
