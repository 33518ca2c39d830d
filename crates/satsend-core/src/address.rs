//! Bitcoin address validation
//!
//! Accepts base58check P2PKH/P2SH addresses and bech32/bech32m segwit
//! addresses for the configured network.

use crate::{Error, Result};
use satsend_params::Network;
use std::fmt;

/// Address encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    /// Base58 pay-to-pubkey-hash
    P2pkh,
    /// Base58 pay-to-script-hash
    P2sh,
    /// Bech32/bech32m segwit program
    Segwit,
}

/// A syntactically valid Bitcoin address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitcoinAddress {
    encoded: String,
    kind: AddressKind,
}

impl BitcoinAddress {
    /// Address kind
    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    /// Encoded address string
    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for BitcoinAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

/// Parse and validate an address for `network`
pub fn parse_address(network: &Network, address: &str) -> Result<BitcoinAddress> {
    let address = address.trim();
    if address.is_empty() {
        return Err(Error::InvalidAddress("Empty address".to_string()));
    }

    if let Ok((hrp, _version, _program)) = bech32::segwit::decode(address) {
        if hrp.to_lowercase() != network.bech32_hrp {
            return Err(Error::InvalidAddress(format!(
                "Segwit address {} is not for {}",
                address, network.name
            )));
        }
        return Ok(BitcoinAddress {
            encoded: address.to_string(),
            kind: AddressKind::Segwit,
        });
    }

    let payload = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|e| Error::InvalidAddress(format!("{}: {}", address, e)))?;

    // version byte + 20-byte hash
    if payload.len() != 21 {
        return Err(Error::InvalidAddress(format!(
            "{}: unexpected payload length {}",
            address,
            payload.len()
        )));
    }

    let kind = if payload[0] == network.p2pkh_prefix {
        AddressKind::P2pkh
    } else if payload[0] == network.p2sh_prefix {
        AddressKind::P2sh
    } else {
        return Err(Error::InvalidAddress(format!(
            "{}: version byte 0x{:02x} is not for {}",
            address, payload[0], network.name
        )));
    };

    Ok(BitcoinAddress {
        encoded: address.to_string(),
        kind,
    })
}

/// Whether `address` is a valid address for `network`
pub fn is_valid_address(network: &Network, address: &str) -> bool {
    parse_address(network, address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_base58() {
        let net = Network::mainnet();
        let addr = parse_address(&net, "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa").unwrap();
        assert_eq!(addr.kind(), AddressKind::P2pkh);

        let addr = parse_address(&net, "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy").unwrap();
        assert_eq!(addr.kind(), AddressKind::P2sh);
    }

    #[test]
    fn test_mainnet_segwit() {
        let net = Network::mainnet();
        let addr = parse_address(&net, "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4").unwrap();
        assert_eq!(addr.kind(), AddressKind::Segwit);
    }

    #[test]
    fn test_bad_checksum() {
        let net = Network::mainnet();
        assert!(!is_valid_address(&net, "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNb"));
        assert!(!is_valid_address(&net, "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t5"));
    }

    #[test]
    fn test_wrong_network() {
        let net = Network::mainnet();
        assert!(!is_valid_address(&net, "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn"));
        assert!(!is_valid_address(&net, "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx"));

        let test = Network::testnet();
        assert!(is_valid_address(&test, "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn"));
        assert!(is_valid_address(&test, "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx"));
    }

    #[test]
    fn test_garbage() {
        let net = Network::mainnet();
        assert!(!is_valid_address(&net, ""));
        assert!(!is_valid_address(&net, "   "));
        assert!(!is_valid_address(&net, "not an address"));
        assert!(!is_valid_address(&net, "xpub6CUGRUonZSQ4TWtTMmzXdrXDtypWKiKrhko4egpiMZbpiaQL2jkwSB1icqYh2cfDfVxdx4df189oLKnC5fSwqPfgyP3hooxujYzAu3fDVmz"));
    }

    #[test]
    fn test_addresses_usable_as_set_keys() {
        use std::collections::HashSet;

        let net = Network::mainnet();
        let mut seen = HashSet::new();
        seen.insert(parse_address(&net, "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa").unwrap());
        seen.insert(parse_address(&net, "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa").unwrap());
        seen.insert(parse_address(&net, "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy").unwrap());
        assert_eq!(seen.len(), 2);
    }
}
