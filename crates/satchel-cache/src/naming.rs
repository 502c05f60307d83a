//! Versioned partition names: `<app-name>-<kind>-v<semver>`.

use satchel_core::{Error, Result};
use semver::Version;
use std::fmt;

/// Which of the two partitions a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionKind {
    /// App-shell assets, populated at install.
    Static,
    /// Responses fetched at runtime.
    Dynamic,
}

impl PartitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionKind::Static => "static",
            PartitionKind::Dynamic => "dynamic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionName {
    pub app: String,
    pub kind: PartitionKind,
    pub version: Version,
}

impl PartitionName {
    pub fn new(app: impl Into<String>, kind: PartitionKind, version: Version) -> Self {
        Self {
            app: app.into(),
            kind,
            version,
        }
    }

    /// Build a name from a version string, rejecting non-semver tags.
    pub fn from_parts(app: &str, kind: PartitionKind, version: &str) -> Result<Self> {
        if app.is_empty() {
            return Err(Error::Config("Application name must not be empty".to_string()));
        }
        let version = Version::parse(version)
            .map_err(|e| Error::Config(format!("Invalid cache version '{}': {}", version, e)))?;
        Ok(Self::new(app, kind, version))
    }

    /// Parse a partition name produced by this module. Foreign names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        for kind in [PartitionKind::Static, PartitionKind::Dynamic] {
            let marker = format!("-{}-v", kind.as_str());
            if let Some(idx) = name.rfind(&marker) {
                let app = &name[..idx];
                let version = &name[idx + marker.len()..];
                if app.is_empty() {
                    return None;
                }
                if let Ok(version) = Version::parse(version) {
                    return Some(Self::new(app, kind, version));
                }
            }
        }
        None
    }
}

impl fmt::Display for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-v{}", self.app, self.kind.as_str(), self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let name = PartitionName::from_parts("satchel", PartitionKind::Static, "1.2.0").unwrap();
        assert_eq!(name.to_string(), "satchel-static-v1.2.0");
    }

    #[test]
    fn test_rejects_non_semver() {
        assert!(PartitionName::from_parts("satchel", PartitionKind::Dynamic, "v2").is_err());
        assert!(PartitionName::from_parts("", PartitionKind::Dynamic, "1.0.0").is_err());
    }

    #[test]
    fn test_parse_round_trip_with_dashed_app_name() {
        let parsed = PartitionName::parse("school-admin-dynamic-v3.1.4").unwrap();
        assert_eq!(parsed.app, "school-admin");
        assert_eq!(parsed.kind, PartitionKind::Dynamic);
        assert_eq!(parsed.version, Version::new(3, 1, 4));
    }

    #[test]
    fn test_parse_foreign_names() {
        assert!(PartitionName::parse("workbox-precache").is_none());
        assert!(PartitionName::parse("satchel-static-vnext").is_none());
        assert!(PartitionName::parse("-static-v1.0.0").is_none());
    }
}
