//! Consensus parameters for Bitcoin

use crate::network::{Network, NetworkType};

/// Satoshis per bitcoin
pub const COIN: u64 = 100_000_000;

/// Maximum supply (satoshis)
pub const MAX_MONEY: u64 = 21_000_000 * COIN;

/// Consensus parameters
#[derive(Debug, Clone)]
pub struct ConsensusParams {
    /// Network configuration
    pub network: Network,
    /// Target block time in seconds
    pub block_time_target: u32,
    /// Maximum supply (satoshis)
    pub max_money: u64,
}

impl ConsensusParams {
    /// Create consensus params for mainnet
    pub fn mainnet() -> Self {
        Self {
            network: Network::mainnet(),
            block_time_target: 600, // 10 minutes
            max_money: MAX_MONEY,
        }
    }

    /// Create consensus params for testnet
    pub fn testnet() -> Self {
        Self {
            network: Network::testnet(),
            block_time_target: 600,
            max_money: MAX_MONEY,
        }
    }

    /// Create consensus params for regtest
    pub fn regtest() -> Self {
        Self {
            network: Network::regtest(),
            block_time_target: 600,
            max_money: MAX_MONEY,
        }
    }

    /// Get consensus params by network type
    pub fn from_network(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Self::mainnet(),
            NetworkType::Testnet => Self::testnet(),
            NetworkType::Regtest => Self::regtest(),
        }
    }

    /// Minutes per block, used for confirmation-time estimates
    pub fn minutes_per_block(&self) -> u64 {
        u64::from(self.block_time_target / 60)
    }

    /// Check if amount is valid (within max supply)
    pub fn is_valid_amount(&self, amount: u64) -> bool {
        amount <= self.max_money
    }
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self::mainnet()
    }
}
