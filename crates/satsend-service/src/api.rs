//! Collaborator seams and the HTTP API client
//!
//! The send flow talks to the outside world only through the traits in this
//! module: unspent outputs and the fee schedule over HTTP, payment
//! construction/broadcast, and the wallet's key and address store.

use crate::{Error, Result};
use async_trait::async_trait;
use satsend_core::{
    ItemAccount, SecondPassword, SigningKey, SpendableUnspentOutputs, SuggestedFee,
};
use std::time::Duration;

/// Body returned by the unspent API when an address has nothing to spend
pub const NO_FREE_OUTPUTS: &str = "No free outputs to spend";

/// Source of unspent-output responses
#[async_trait]
pub trait UnspentApi: Send + Sync {
    /// Unspent outputs for an address or xpub; `None` when there are none
    async fn unspent_outputs(&self, address: &str) -> Result<Option<serde_json::Value>>;
}

/// Source of the dynamic fee schedule
#[async_trait]
pub trait FeeApi: Send + Sync {
    /// Current fee schedule
    async fn fee_schedule(&self) -> Result<SuggestedFee>;
}

/// Everything needed to build, sign and broadcast a payment
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Selected inputs
    pub bundle: SpendableUnspentOutputs,
    /// Signing keys for the inputs
    pub keys: Vec<SigningKey>,
    /// Destination address
    pub to_address: String,
    /// Change address
    pub change_address: String,
    /// Fee in satoshis
    pub fee: u64,
    /// Amount in satoshis
    pub amount: u64,
}

/// Builds, signs and broadcasts payments
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Submit a payment, returning the transaction hash
    async fn submit(&self, request: PaymentRequest) -> Result<String>;
}

/// Private key decoded from scanned data
#[derive(Debug, Clone)]
pub enum ScannedKey {
    /// Key and the address it controls
    Decoded {
        /// Address derived from the key
        address: String,
        /// Key material
        key: SigningKey,
    },
    /// BIP38-encrypted key; decode again with its passphrase
    PassphraseRequired,
}

/// The wallet's accounts, addresses and keys
pub trait WalletKeys: Send + Sync {
    /// HD accounts and imported addresses, archived ones included
    fn accounts(&self) -> Vec<ItemAccount>;

    /// Address book entries
    fn address_book(&self) -> Vec<ItemAccount>;

    /// Index of the default HD account; `None` for wallets without HD accounts
    fn default_account_index(&self) -> Option<u32>;

    /// Next unused receive address of an HD account
    fn next_receive_address(&self, account_index: u32) -> Result<String>;

    /// Next unused change address of an HD account
    fn next_change_address(&self, account_index: u32) -> Result<String>;

    /// Keys for the inputs of `bundle` owned by an HD account
    fn hd_keys(
        &self,
        account_index: u32,
        bundle: &SpendableUnspentOutputs,
        second_password: Option<&SecondPassword>,
    ) -> Result<Vec<SigningKey>>;

    /// Key of an imported address
    fn legacy_key(
        &self,
        address: &str,
        second_password: Option<&SecondPassword>,
    ) -> Result<SigningKey>;

    /// Decode a scanned private key, decrypting BIP38 keys with
    /// `bip38_passphrase`
    fn key_from_scan(&self, data: &str, bip38_passphrase: Option<&str>) -> Result<ScannedKey>;

    /// Whether private keys are protected by a second password
    fn is_double_encrypted(&self) -> bool;

    /// Check a second password
    fn validate_second_password(&self, password: &str) -> bool;

    /// Advance an HD account's change address index
    fn increment_change_index(&self, account_index: u32);
}

/// HTTP client for the unspent-outputs and fee APIs
#[derive(Debug, Clone)]
pub struct BlockchainApiClient {
    base_url: String,
    fee_url: String,
    client: reqwest::Client,
}

impl BlockchainApiClient {
    /// Create a client
    pub fn new(base_url: &str, fee_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            fee_url: fee_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// URL of the unspent outputs for `address`
    pub fn unspent_url(&self, address: &str) -> String {
        format!("{}/unspent?active={}", self.base_url, address)
    }

    /// URL of the fee schedule
    pub fn fees_url(&self) -> String {
        format!("{}/fees", self.fee_url)
    }
}

#[async_trait]
impl UnspentApi for BlockchainApiClient {
    async fn unspent_outputs(&self, address: &str) -> Result<Option<serde_json::Value>> {
        let response = self
            .client
            .get(self.unspent_url(address))
            .send()
            .await
            .map_err(|e| Error::Network(format!("HTTP error: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("HTTP body error: {}", e)))?;

        if is_no_free_outputs(status.as_u16(), &body) {
            tracing::debug!("No free outputs for {}", address);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Api(format!("Unspent API returned {}: {}", status, body)));
        }

        let value = serde_json::from_str(&body)
            .map_err(|e| Error::Api(format!("JSON decode error: {}", e)))?;
        Ok(Some(value))
    }
}

#[async_trait]
impl FeeApi for BlockchainApiClient {
    async fn fee_schedule(&self) -> Result<SuggestedFee> {
        let response = self
            .client
            .get(self.fees_url())
            .send()
            .await
            .map_err(|e| Error::Network(format!("HTTP error: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Api(format!(
                "Fee API returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("HTTP body error: {}", e)))?;

        Ok(SuggestedFee::from_json_str(&body)?)
    }
}

fn is_no_free_outputs(status: u16, body: &str) -> bool {
    status == 500 && body.contains(NO_FREE_OUTPUTS)
}
