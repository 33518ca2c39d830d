//! Bitcoin network parameters and constants
//!
//! This crate provides network-specific address prefixes, consensus limits
//! and the relay policy (dust threshold, minimum relay fee) that the send
//! flow validates against.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod consensus;
pub mod network;
pub mod policy;

pub use consensus::{ConsensusParams, COIN, MAX_MONEY};
pub use network::{Network, NetworkType};
pub use policy::{
    RelayPolicy, TxSizeModel, DEFAULT_FEE_PER_KB, DUST_THRESHOLD, MIN_RELAY_FEE_PER_KB,
};

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid network specified
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;
