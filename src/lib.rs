//! # IEEE 802.11aa group-addressed delivery
//!
//! Multicast group membership and delivery mode selection for a wireless MAC.
//! An access point registers stations in multicast groups as they join and
//! leave; before sending a group-addressed frame the transmit path asks which
//! delivery mode is configured (Legacy, DMS, GCR-UR, GCR block ack), which
//! retry is in progress, and who the current recipients are.
//!
//! ## Architecture
//!
//! - `address`: 48-bit hardware addresses for groups and stations
//! - `group`: a single multicast group and its members
//! - `registry`: all groups, plus a lock-protected shared handle
//! - `mode`: the delivery mode enumeration
//! - `selector`: mode, retries and retry progress, forwarding registration
//! - `config`: tunables and file-backed configuration management

pub mod address;
pub mod config;
pub mod group;
pub mod mode;
pub mod registry;
pub mod selector;

// Re-export commonly used types
pub use crate::{
    address::{GroupAddress, MacAddress, StationAddress},
    config::{ConfigManager, DeliveryConfig, MulticastConfig},
    group::MulticastGroup,
    mode::MulticastModeKind,
    registry::{GroupRegistry, SharedGroupRegistry},
    selector::{ModeSelector, ATTR_MODE, ATTR_RETRIES, ATTR_RETRY},
};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MulticastError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MulticastError>;

/// Install `env_logger` for library users without a logger of their own.
///
/// Honours `RUST_LOG`, defaulting to `info`. Does nothing if a logger is
/// already installed.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
