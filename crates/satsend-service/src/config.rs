//! Send service configuration

use crate::{Error, Result};
use rust_decimal::Decimal;
use satsend_core::{BitcoinUnit, FiatContext, MonetaryFormatter};
use satsend_params::{ConsensusParams, Network, NetworkType, RelayPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Send service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Network to validate addresses against
    pub network: NetworkType,
    /// Base URL of the unspent-outputs API
    pub api_base_url: String,
    /// Base URL of the dynamic fee API
    pub fee_api_url: String,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
    /// Display unit for amounts
    pub unit: BitcoinUnit,
    /// Locale decimal separator
    pub decimal_separator: char,
    /// Fiat currency code
    pub fiat_currency: String,
    /// Fiat per bitcoin
    pub exchange_rate: Decimal,
    /// Xpub of the default HD account, served from the warm cache
    pub default_account_xpub: Option<String>,
    /// Warn when receiving to a watch-only address
    pub warn_watch_only_receive: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            network: NetworkType::Mainnet,
            api_base_url: "https://blockchain.info".to_string(),
            fee_api_url: "https://api.blockchain.info".to_string(),
            request_timeout_secs: 30,
            unit: BitcoinUnit::Btc,
            decimal_separator: '.',
            fiat_currency: "USD".to_string(),
            exchange_rate: Decimal::ZERO,
            default_account_xpub: None,
            warn_watch_only_receive: true,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        tracing::debug!("Loaded service config from {}", path.display());
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::Config("API base URL is empty".to_string()));
        }
        if self.fee_api_url.trim().is_empty() {
            return Err(Error::Config("Fee API URL is empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("Request timeout must be non-zero".to_string()));
        }
        if self.decimal_separator.is_ascii_digit() || self.decimal_separator.is_whitespace() {
            return Err(Error::Config(format!(
                "Invalid decimal separator {:?}",
                self.decimal_separator
            )));
        }
        if self.exchange_rate.is_sign_negative() {
            return Err(Error::Config("Exchange rate is negative".to_string()));
        }
        Ok(())
    }

    /// Network parameters
    pub fn network_params(&self) -> Network {
        Network::from_type(self.network)
    }

    /// Consensus parameters
    pub fn consensus(&self) -> ConsensusParams {
        ConsensusParams::from_network(self.network)
    }

    /// Relay policy
    pub fn relay_policy(&self) -> RelayPolicy {
        RelayPolicy::standard()
    }

    /// Amount formatter for the configured unit and separator
    pub fn formatter(&self) -> MonetaryFormatter {
        MonetaryFormatter::new(self.unit, self.decimal_separator)
    }

    /// Fiat currency and rate
    pub fn fiat(&self) -> FiatContext {
        FiatContext {
            currency: self.fiat_currency.clone(),
            exchange_rate: self.exchange_rate,
        }
    }

    /// HTTP request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_is_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.network_params().bech32_hrp, "bc");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_validation() {
        let config = ServiceConfig {
            api_base_url: " ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ServiceConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ServiceConfig {
            decimal_separator: '7',
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "network": "testnet",
                "unit": "mBTC",
                "decimal_separator": ",",
                "fiat_currency": "EUR",
                "exchange_rate": "25000.50",
                "default_account_xpub": "tpubDefault"
            }}"#
        )
        .unwrap();

        let config = ServiceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.network, NetworkType::Testnet);
        assert_eq!(config.unit, BitcoinUnit::MilliBtc);
        assert_eq!(config.formatter().display_amount(150_000), "1,5");
        assert_eq!(config.fiat().exchange_rate, Decimal::new(2_500_050, 2));
        assert_eq!(config.default_account_xpub.as_deref(), Some("tpubDefault"));
        // unspecified fields keep their defaults
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"request_timeout_secs": 0}}"#).unwrap();
        assert!(ServiceConfig::from_file(file.path()).is_err());

        assert!(matches!(
            ServiceConfig::from_file("/nonexistent/satsend.json"),
            Err(Error::Io(_))
        ));
    }
}
