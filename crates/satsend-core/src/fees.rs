//! Transaction fee calculation
//!
//! Fees are derived from a fee rate (satoshis per kB) and an estimated
//! transaction size. The dynamic fee schedule supplies one default rate plus
//! a list of per-confirmation-target rates, fastest first.

use crate::{Error, Result};
use satsend_params::RelayPolicy;
use serde::{Deserialize, Serialize};

/// One entry of the dynamic fee schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    /// Fee rate in satoshis per kB
    #[serde(rename = "fee")]
    pub fee_per_kb: u64,
    /// Network is experiencing a fee surge
    #[serde(default)]
    pub surge: bool,
    /// Estimate is considered reliable
    #[serde(default = "default_ok")]
    pub ok: bool,
}

fn default_ok() -> bool {
    true
}

/// Fee schedule returned by the dynamic fee service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedFee {
    /// Default fee rate in satoshis per kB
    pub default_fee_per_kb: u64,
    /// Per-confirmation-target estimates; index 0 targets the next block
    pub estimates: Vec<FeeEstimate>,
    /// Default rate reflects a fee surge
    pub is_surge: bool,
}

#[derive(Deserialize)]
struct FeeScheduleResponse {
    default: FeeEstimate,
    #[serde(default)]
    estimate: Vec<FeeEstimate>,
}

impl SuggestedFee {
    /// Hard-coded schedule used when the fee service cannot be reached
    pub fn fallback(policy: &RelayPolicy) -> Self {
        Self {
            default_fee_per_kb: policy.default_fee_per_kb,
            estimates: Vec::new(),
            is_surge: false,
        }
    }

    /// Parse the fee service response body
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let response: FeeScheduleResponse = serde_json::from_value(value.clone())
            .map_err(|e| Error::InvalidFeeSchedule(e.to_string()))?;
        Self::from_response(response)
    }

    /// Parse the fee service response from raw text
    pub fn from_json_str(body: &str) -> Result<Self> {
        let response: FeeScheduleResponse = serde_json::from_str(body)
            .map_err(|e| Error::InvalidFeeSchedule(e.to_string()))?;
        Self::from_response(response)
    }

    fn from_response(response: FeeScheduleResponse) -> Result<Self> {
        if response.default.fee_per_kb == 0 {
            return Err(Error::InvalidFeeSchedule(
                "Default fee rate is zero".to_string(),
            ));
        }
        Ok(Self {
            default_fee_per_kb: response.default.fee_per_kb,
            estimates: response.estimate,
            is_surge: response.default.surge,
        })
    }

    /// Whether per-target estimates are available
    pub fn has_estimates(&self) -> bool {
        !self.estimates.is_empty()
    }
}

// Test helpers
#[cfg(any(test, feature = "test-helpers"))]
impl SuggestedFee {
    /// Schedule with six tiers from 60 to 10 sat/B and a 10 sat/B default (for testing only)
    pub fn test_schedule() -> Self {
        Self {
            default_fee_per_kb: 10_000,
            estimates: [60_000, 50_000, 40_000, 30_000, 20_000, 10_000]
                .into_iter()
                .map(|fee_per_kb| FeeEstimate {
                    fee_per_kb,
                    surge: false,
                    ok: true,
                })
                .collect(),
            is_surge: false,
        }
    }
}

/// Fee calculator for the P2PKH size model
#[derive(Debug, Clone)]
pub struct FeeCalculator {
    policy: RelayPolicy,
}

impl FeeCalculator {
    /// Create a calculator for the given relay policy
    pub fn new(policy: RelayPolicy) -> Self {
        Self { policy }
    }

    /// Relay policy in use
    pub fn policy(&self) -> &RelayPolicy {
        &self.policy
    }

    /// Estimated size in bytes
    pub fn estimated_size(&self, inputs: usize, outputs: usize) -> u64 {
        self.policy.size_model.estimated_size(inputs, outputs)
    }

    /// Absolute fee for a transaction shape at `fee_per_kb`, rounded up
    pub fn estimated_fee(&self, inputs: usize, outputs: usize, fee_per_kb: u64) -> u64 {
        fee_for_size(self.estimated_size(inputs, outputs), fee_per_kb)
    }

    /// Cost of adding one more input at `fee_per_kb`, rounded up
    pub fn input_cost(&self, fee_per_kb: u64) -> u64 {
        fee_for_size(self.policy.size_model.input_bytes, fee_per_kb)
    }

    /// Whether `absolute_fee` meets the minimum relay rate for the shape
    pub fn is_adequate_fee(&self, inputs: usize, outputs: usize, absolute_fee: u64) -> bool {
        let size = self.estimated_size(inputs, outputs);
        absolute_fee.saturating_mul(1000) >= self.policy.min_relay_fee_per_kb.saturating_mul(size)
    }

    /// Validate a fee against the relay minimum
    pub fn validate_fee(&self, inputs: usize, outputs: usize, absolute_fee: u64) -> Result<()> {
        if !self.is_adequate_fee(inputs, outputs, absolute_fee) {
            return Err(Error::FeeTooLow(format!(
                "Fee {} is below {} sat/kB for an estimated {} bytes",
                absolute_fee,
                self.policy.min_relay_fee_per_kb,
                self.estimated_size(inputs, outputs)
            )));
        }
        Ok(())
    }
}

impl Default for FeeCalculator {
    fn default() -> Self {
        Self::new(RelayPolicy::standard())
    }
}

fn fee_for_size(size: u64, fee_per_kb: u64) -> u64 {
    size.saturating_mul(fee_per_kb).div_ceil(1000)
}

/// Which fee the send flow pays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePolicy {
    /// Size-based fee at the schedule's default rate
    Suggested,
    /// Fixed absolute fee entered by the user
    Custom(u64),
}

impl FeePolicy {
    /// Custom only when a non-zero fee was entered
    pub fn from_custom_fee(custom_fee: u64) -> Self {
        if custom_fee > 0 {
            FeePolicy::Custom(custom_fee)
        } else {
            FeePolicy::Suggested
        }
    }

    /// Whether the user supplied the fee
    pub fn is_custom(&self) -> bool {
        matches!(self, FeePolicy::Custom(_))
    }
}
