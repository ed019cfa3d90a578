use std::net::IpAddr;
use std::path::Path;

use log::{debug, error};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::*;
use crate::error_handling::types::ConfigError;

const INTERFACE_NAME_PATTERN: &str = r"^[A-Za-z0-9_.:-]{1,15}$";
const MAX_ATTEMPTS: u32 = 1000;
const MAX_FRAMES_PER_ATTEMPT: usize = 100_000;

/// Where logged connections are written.
///
/// Loaded from a TOML file:
///
/// ```toml
/// [capture]
/// file = "/var/log/tracesynth/all.pcap"
/// directory = "/var/log/tracesynth/conns"
///
/// [mirror]
/// interface = "eth0"
/// target = "192.0.2.50"
///
/// [resolver]
/// attempts = 50
/// retry_interval_ms = 1000
/// frames_per_attempt = 1000
/// deadline_secs = 60
/// ```
///
/// Every section is optional, but at least one log target (`capture.file`,
/// `capture.directory` or `mirror`) must be present.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureSection,
    pub mirror: Option<MirrorSection>,
    pub resolver: ResolverSection,
}

impl Config {
    /// Reads, parses and validates the configuration file at `path`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents).map_err(|e| {
            error!("Invalid configuration: {}", e);
            ConfigError::TomlError(e.to_string())
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.is_empty() && self.mirror.is_none() {
            return Err(ConfigError::NoTargets(
                "at least one of capture.file, capture.directory or mirror is required"
                    .to_string(),
            ));
        }

        if let Some(directory) = &self.capture.directory {
            if !directory.is_dir() {
                return Err(ConfigError::DirectoryDoesNotExist(format!(
                    "{}",
                    directory.display()
                )));
            }
        }

        if let Some(mirror) = &self.mirror {
            Self::validate_mirror(mirror)?;
        }

        let resolver = &self.resolver;
        if !(1..=MAX_ATTEMPTS).contains(&resolver.attempts) {
            return Err(ConfigError::NotInRange(format!(
                "resolver.attempts must be within 1..={}, got {}",
                MAX_ATTEMPTS, resolver.attempts
            )));
        }
        if !(1..=MAX_FRAMES_PER_ATTEMPT).contains(&resolver.frames_per_attempt) {
            return Err(ConfigError::NotInRange(format!(
                "resolver.frames_per_attempt must be within 1..={}, got {}",
                MAX_FRAMES_PER_ATTEMPT, resolver.frames_per_attempt
            )));
        }
        Ok(())
    }

    fn validate_mirror(mirror: &MirrorSection) -> Result<(), ConfigError> {
        let pattern = Regex::new(INTERFACE_NAME_PATTERN)
            .map_err(|e| ConfigError::BadInterfaceName(e.to_string()))?;
        if !pattern.is_match(&mirror.interface) {
            return Err(ConfigError::BadInterfaceName(mirror.interface.clone()));
        }

        match mirror.target.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => Ok(()),
            Ok(IpAddr::V6(_)) => Err(ConfigError::BadIPFormatting(format!(
                "mirror target {} is not IPv4",
                mirror.target
            ))),
            Err(e) => Err(ConfigError::BadIPFormatting(format!(
                "mirror target {}: {}",
                mirror.target, e
            ))),
        }
    }
}
