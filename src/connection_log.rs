//! Connection logging.
//!
//! A [`ConnectionLog`] turns the lifecycle of one intercepted TCP connection
//! (establishment, payload in both directions, teardown) into synthetic
//! frames delivered to a single sink. [`LogTargets`] holds the configured
//! sinks and hands out one log per target for each new connection.
//!
//! Example (non-running):
//! ```ignore
//! use tracesynth::configuration::Config;
//! use tracesynth::connection_log::LogTargets;
//! use tracesynth::session::Direction;
//!
//! let config = Config::from_file("tracesynth.toml".as_ref())?;
//! let targets = LogTargets::from_config(&config)?;
//! for mut log in targets.open_connection("192.0.2.1:40000".parse()?, "192.0.2.2:443".parse()?)? {
//!     log.open()?;
//!     log.log_payload(Direction::ClientToServer, b"GET / HTTP/1.0\r\n\r\n")?;
//!     log.close(Direction::ClientToServer)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod logger;
pub mod targets;

pub use logger::{ConnectionLog, CLIENT_HW_ADDR, SERVER_HW_ADDR};
pub use targets::LogTargets;
