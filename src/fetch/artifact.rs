//! Artifact descriptor.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A remote object to fetch.
///
/// `last_modified` drives the conditional request and is overwritten with the
/// server-reported value after a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub url: String,
    pub expected_size: u64,
    pub last_modified: Option<SystemTime>,
}

impl ArtifactDescriptor {
    pub fn new(url: impl Into<String>, expected_size: u64) -> Self {
        Self {
            url: url.into(),
            expected_size,
            last_modified: None,
        }
    }

    pub fn with_last_modified(mut self, mtime: SystemTime) -> Self {
        self.last_modified = Some(mtime);
        self
    }

    /// Modification time as seconds since the Unix epoch, 0 when unknown.
    pub fn mtime_secs(&self) -> u64 {
        self.last_modified
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Set the modification time from Unix seconds; 0 clears it.
    pub fn set_mtime_secs(&mut self, secs: u64) {
        self.last_modified = (secs > 0).then(|| UNIX_EPOCH + Duration::from_secs(secs));
    }
}
