//! Relay policy and transaction size model
//!
//! These are not consensus rules; they mirror what the push-tx endpoint and
//! typical relay nodes accept for legacy P2PKH spends.

use serde::{Deserialize, Serialize};

/// Outputs below this value are non-standard (satoshis)
pub const DUST_THRESHOLD: u64 = 546;

/// Minimum fee rate accepted by the push-tx endpoint (satoshis per kB)
pub const MIN_RELAY_FEE_PER_KB: u64 = 10_000;

/// Hard-coded fee rate used when the dynamic fee service is unreachable
pub const DEFAULT_FEE_PER_KB: u64 = 10_000;

/// Estimated serialized size of transactions, per component (bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSizeModel {
    /// Bytes per signed P2PKH input
    pub input_bytes: u64,
    /// Bytes per P2PKH output
    pub output_bytes: u64,
    /// Fixed version/locktime/count overhead
    pub overhead_bytes: u64,
}

impl TxSizeModel {
    /// Legacy P2PKH size model
    pub const fn p2pkh() -> Self {
        Self {
            input_bytes: 148,
            output_bytes: 34,
            overhead_bytes: 10,
        }
    }

    /// Estimated size in bytes for the given shape
    pub fn estimated_size(&self, inputs: usize, outputs: usize) -> u64 {
        self.input_bytes * inputs as u64 + self.output_bytes * outputs as u64 + self.overhead_bytes
    }
}

impl Default for TxSizeModel {
    fn default() -> Self {
        Self::p2pkh()
    }
}

/// Relay policy the send flow validates against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayPolicy {
    /// Dust threshold (satoshis)
    pub dust_threshold: u64,
    /// Minimum relay fee rate (satoshis per kB)
    pub min_relay_fee_per_kb: u64,
    /// Fallback fee rate (satoshis per kB)
    pub default_fee_per_kb: u64,
    /// Size model used for fee estimation
    pub size_model: TxSizeModel,
}

impl RelayPolicy {
    /// Standard policy
    pub const fn standard() -> Self {
        Self {
            dust_threshold: DUST_THRESHOLD,
            min_relay_fee_per_kb: MIN_RELAY_FEE_PER_KB,
            default_fee_per_kb: DEFAULT_FEE_PER_KB,
            size_model: TxSizeModel::p2pkh(),
        }
    }

    /// Check if a value is below the dust threshold
    pub fn is_dust(&self, value: u64) -> bool {
        value < self.dust_threshold
    }
}

impl Default for RelayPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
