use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mirror::resolver::{ARP_ATTEMPTS, ARP_FRAMES_PER_ATTEMPT, ARP_RETRY_INTERVAL};
use crate::mirror::ResolverPolicy;

/// Capture files written to disk.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSection {
    /// One capture shared by every logged connection.
    pub file: Option<PathBuf>,
    /// Directory receiving one capture per connection.
    pub directory: Option<PathBuf>,
}

impl CaptureSection {
    pub fn is_empty(&self) -> bool {
        self.file.is_none() && self.directory.is_none()
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MirrorSection {
    pub interface: String,
    pub target: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSection {
    pub attempts: u32,
    pub retry_interval_ms: u64,
    pub frames_per_attempt: usize,
    pub deadline_secs: u64,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            attempts: ARP_ATTEMPTS,
            retry_interval_ms: ARP_RETRY_INTERVAL.as_millis() as u64,
            frames_per_attempt: ARP_FRAMES_PER_ATTEMPT,
            deadline_secs: 60,
        }
    }
}

impl ResolverSection {
    pub fn policy(&self) -> ResolverPolicy {
        ResolverPolicy {
            attempts: self.attempts,
            retry_interval: Duration::from_millis(self.retry_interval_ms),
            frames_per_attempt: self.frames_per_attempt,
        }
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}
