//! Unspent outputs as returned by the unspent-outputs API

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A spendable transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    /// Funding transaction hash (big-endian hex, as shown by explorers)
    pub tx_hash: String,
    /// Output index within the funding transaction
    pub output_index: u32,
    /// Locking script (hex)
    pub script: String,
    /// Value in satoshis
    pub value: u64,
    /// Confirmation count
    pub confirmations: u32,
    /// HD derivation path (`M/0/3`) when fetched by xpub
    pub path: Option<String>,
}

impl UnspentOutput {
    /// Create an output without script/path details
    pub fn new(tx_hash: impl Into<String>, output_index: u32, value: u64) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            output_index,
            script: String::new(),
            value,
            confirmations: 1,
            path: None,
        }
    }

    /// Outpoint string `txid:vout`
    pub fn outpoint(&self) -> String {
        format!("{}:{}", self.tx_hash, self.output_index)
    }
}

/// Candidate inputs for one sender
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnspentOutputs {
    /// All outputs returned by the API
    pub outputs: Vec<UnspentOutput>,
    /// Server notice (e.g. unconfirmed funds excluded)
    pub notice: Option<String>,
}

impl UnspentOutputs {
    /// Wrap a list of outputs
    pub fn new(outputs: Vec<UnspentOutput>) -> Self {
        Self {
            outputs,
            notice: None,
        }
    }

    /// Total value of all outputs
    pub fn total_value(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }

    /// Number of outputs
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Whether there are no outputs
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

// Test helpers
#[cfg(any(test, feature = "test-helpers"))]
impl UnspentOutputs {
    /// Outputs with the given values and distinct synthetic hashes (for testing only)
    pub fn from_values(values: &[u64]) -> Self {
        Self::new(
            values
                .iter()
                .enumerate()
                .map(|(i, value)| UnspentOutput::new(format!("{:064x}", i + 1), 0, *value))
                .collect(),
        )
    }
}

#[derive(Deserialize)]
struct UnspentResponse {
    #[serde(default)]
    unspent_outputs: Vec<RawUnspentOutput>,
    #[serde(default)]
    notice: Option<String>,
}

#[derive(Deserialize)]
struct RawUnspentOutput {
    #[serde(default)]
    tx_hash: Option<String>,
    #[serde(default)]
    tx_hash_big_endian: Option<String>,
    tx_output_n: u32,
    #[serde(default)]
    script: String,
    value: u64,
    #[serde(default)]
    confirmations: u32,
    #[serde(default)]
    xpub: Option<RawXpub>,
}

#[derive(Deserialize)]
struct RawXpub {
    path: String,
}

/// Parse an unspent-outputs API response into candidate inputs
pub fn get_coins(response: &serde_json::Value) -> Result<UnspentOutputs> {
    let response: UnspentResponse = serde_json::from_value(response.clone())
        .map_err(|e| Error::InvalidUnspentOutputs(e.to_string()))?;

    let mut outputs = Vec::with_capacity(response.unspent_outputs.len());
    for raw in response.unspent_outputs {
        let tx_hash = match (raw.tx_hash_big_endian, raw.tx_hash) {
            (Some(big_endian), _) => big_endian,
            (None, Some(little_endian)) => reverse_hex(&little_endian)?,
            (None, None) => {
                return Err(Error::InvalidUnspentOutputs(
                    "Output without transaction hash".to_string(),
                ))
            }
        };
        let bytes = hex::decode(&tx_hash)
            .map_err(|e| Error::InvalidUnspentOutputs(format!("{}: {}", tx_hash, e)))?;
        if bytes.len() != 32 {
            return Err(Error::InvalidUnspentOutputs(format!(
                "Transaction hash {} is not 32 bytes",
                tx_hash
            )));
        }

        outputs.push(UnspentOutput {
            tx_hash,
            output_index: raw.tx_output_n,
            script: raw.script,
            value: raw.value,
            confirmations: raw.confirmations,
            path: raw.xpub.map(|x| x.path),
        });
    }

    tracing::debug!("Parsed {} unspent outputs", outputs.len());

    Ok(UnspentOutputs {
        outputs,
        notice: response.notice.filter(|n| !n.is_empty()),
    })
}

fn reverse_hex(hash: &str) -> Result<String> {
    let mut bytes = hex::decode(hash)
        .map_err(|e| Error::InvalidUnspentOutputs(format!("{}: {}", hash, e)))?;
    bytes.reverse();
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HASH: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";

    #[test]
    fn test_get_coins() {
        let response = json!({
            "unspent_outputs": [
                {
                    "tx_hash_big_endian": HASH,
                    "tx_output_n": 1,
                    "script": "76a914",
                    "value": 150000,
                    "confirmations": 6,
                    "xpub": {"m": "xpub...", "path": "M/0/3"}
                },
                {
                    "tx_hash_big_endian": HASH,
                    "tx_output_n": 2,
                    "value": 50000
                }
            ],
            "notice": "Some funds are pending confirmation"
        });

        let coins = get_coins(&response).unwrap();
        assert_eq!(coins.len(), 2);
        assert_eq!(coins.total_value(), 200_000);
        assert_eq!(coins.outputs[0].path.as_deref(), Some("M/0/3"));
        assert_eq!(coins.outputs[1].confirmations, 0);
        assert_eq!(coins.outputs[1].outpoint(), format!("{}:2", HASH));
        assert!(coins.notice.is_some());
    }

    #[test]
    fn test_little_endian_hash_is_reversed() {
        let response = json!({
            "unspent_outputs": [{"tx_hash": HASH, "tx_output_n": 0, "value": 1}]
        });
        let coins = get_coins(&response).unwrap();
        assert_eq!(coins.outputs[0].tx_hash, reverse_hex(HASH).unwrap());
    }

    #[test]
    fn test_empty_notice_dropped() {
        let coins = get_coins(&json!({"unspent_outputs": [], "notice": ""})).unwrap();
        assert!(coins.is_empty());
        assert_eq!(coins.notice, None);
    }

    #[test]
    fn test_rejects_bad_hash() {
        let response = json!({
            "unspent_outputs": [{"tx_hash_big_endian": "zz", "tx_output_n": 0, "value": 1}]
        });
        assert!(get_coins(&response).is_err());
    }
}
