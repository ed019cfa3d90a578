pub mod capture_file;
pub mod configuration;
pub mod connection_log;
pub mod error_handling;
pub mod mirror;
pub mod session;
pub mod sink;
pub mod synthesis;

#[cfg(test)]
mod test_support;

pub use configuration::Config;
pub use connection_log::{ConnectionLog, LogTargets};
