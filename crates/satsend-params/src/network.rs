//! Bitcoin network definitions

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Network type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Mainnet
    Mainnet,
    /// Testnet
    Testnet,
    /// Regtest (local development)
    Regtest,
}

impl FromStr for NetworkType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" | "bitcoin" => Ok(NetworkType::Mainnet),
            "testnet" | "test" => Ok(NetworkType::Testnet),
            "regtest" => Ok(NetworkType::Regtest),
            other => Err(Error::InvalidNetwork(other.to_string())),
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    /// Network type
    pub network_type: NetworkType,
    /// Human-readable name
    pub name: &'static str,
    /// Base58 version byte for pay-to-pubkey-hash addresses
    pub p2pkh_prefix: u8,
    /// Base58 version byte for pay-to-script-hash addresses
    pub p2sh_prefix: u8,
    /// Bech32 human-readable part for segwit addresses
    pub bech32_hrp: &'static str,
    /// BIP21 URI scheme
    pub uri_scheme: &'static str,
}

impl Network {
    /// Get mainnet parameters
    pub const fn mainnet() -> Self {
        Self {
            network_type: NetworkType::Mainnet,
            name: "mainnet",
            p2pkh_prefix: 0x00,
            p2sh_prefix: 0x05,
            bech32_hrp: "bc",
            uri_scheme: "bitcoin",
        }
    }

    /// Get testnet parameters
    pub const fn testnet() -> Self {
        Self {
            network_type: NetworkType::Testnet,
            name: "testnet",
            p2pkh_prefix: 0x6f,
            p2sh_prefix: 0xc4,
            bech32_hrp: "tb",
            uri_scheme: "bitcoin",
        }
    }

    /// Get regtest parameters
    pub const fn regtest() -> Self {
        Self {
            network_type: NetworkType::Regtest,
            name: "regtest",
            p2pkh_prefix: 0x6f,
            p2sh_prefix: 0xc4,
            bech32_hrp: "bcrt",
            uri_scheme: "bitcoin",
        }
    }

    /// Get network by type
    pub const fn from_type(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Self::mainnet(),
            NetworkType::Testnet => Self::testnet(),
            NetworkType::Regtest => Self::regtest(),
        }
    }

    /// Whether a base58 version byte belongs to this network
    pub const fn is_base58_prefix(&self, version: u8) -> bool {
        version == self.p2pkh_prefix || version == self.p2sh_prefix
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_params() {
        let net = Network::mainnet();
        assert_eq!(net.network_type, NetworkType::Mainnet);
        assert_eq!(net.bech32_hrp, "bc");
        assert!(net.is_base58_prefix(0x00));
        assert!(net.is_base58_prefix(0x05));
        assert!(!net.is_base58_prefix(0x6f));
    }

    #[test]
    fn test_network_from_type() {
        let net = Network::from_type(NetworkType::Testnet);
        assert_eq!(net.network_type, NetworkType::Testnet);
        assert_eq!(net.bech32_hrp, "tb");
    }

    #[test]
    fn test_network_type_parse() {
        assert_eq!("Mainnet".parse::<NetworkType>().unwrap(), NetworkType::Mainnet);
        assert_eq!("regtest".parse::<NetworkType>().unwrap(), NetworkType::Regtest);
        assert!("signet-ish".parse::<NetworkType>().is_err());
    }

    #[test]
    fn test_network_type_serde() {
        let json = serde_json::to_string(&NetworkType::Testnet).unwrap();
        assert_eq!(json, "\"testnet\"");
    }
}
