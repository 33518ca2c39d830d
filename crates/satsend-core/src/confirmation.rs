//! Confirmation time estimation from the fee schedule tiers

use crate::fees::FeeEstimate;
use crate::selection::CoinSelector;
use crate::unspent::UnspentOutputs;
use std::cmp::Ordering;
use std::fmt;

/// Absolute fees for each confirmation tier, most expensive first.
///
/// `None` marks a tier whose rate the wallet cannot afford; it ranks above
/// every affordable tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierFees {
    fees: Vec<Option<u64>>,
}

impl TierFees {
    /// Build from unordered tier fees
    pub fn new(mut fees: Vec<Option<u64>>) -> Self {
        fees.sort_by(|a, b| match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => y.cmp(x),
        });
        Self { fees }
    }

    /// Tier fees in descending order
    pub fn as_slice(&self) -> &[Option<u64>] {
        &self.fees
    }

    /// Number of tiers
    pub fn len(&self) -> usize {
        self.fees.len()
    }

    /// Whether there are no tiers
    pub fn is_empty(&self) -> bool {
        self.fees.is_empty()
    }

    /// Fee of the fastest tier
    pub fn fastest(&self) -> Option<u64> {
        self.fees.first().copied().flatten()
    }

    /// Fee of the slowest tier
    pub fn slowest(&self) -> Option<u64> {
        self.fees.last().copied().flatten()
    }
}

/// Compute the absolute fee of paying `amount` at every estimate tier
pub fn tier_fees(
    selector: &CoinSelector,
    coins: &UnspentOutputs,
    amount: u64,
    estimates: &[FeeEstimate],
) -> TierFees {
    let fees = estimates
        .iter()
        .map(|estimate| {
            selector
                .spendable_coins(coins, amount, estimate.fee_per_kb)
                .ok()
                .map(|bundle| bundle.absolute_fee)
        })
        .collect();
    TierFees::new(fees)
}

/// Expected confirmation time for a fee
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationEstimate {
    /// Likely to confirm within `blocks` blocks
    Likely {
        /// Blocks until confirmation
        blocks: u32,
        /// Minutes until confirmation
        minutes: u64,
    },
    /// Fee is below every tier
    Unlikely,
}

impl ConfirmationEstimate {
    /// Whether the fee meets at least one tier
    pub fn is_likely(&self) -> bool {
        matches!(self, ConfirmationEstimate::Likely { .. })
    }
}

impl fmt::Display for ConfirmationEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmationEstimate::Likely { blocks, minutes } => write!(
                f,
                "Estimated confirmation time: ~{} minutes ({} {})",
                minutes,
                blocks,
                if *blocks == 1 { "block" } else { "blocks" }
            ),
            ConfirmationEstimate::Unlikely => {
                write!(f, "Fee too low, transaction unlikely to confirm")
            }
        }
    }
}

/// Map `fee` onto the first tier it meets
pub fn estimate_confirmation(
    fee: u64,
    tiers: &TierFees,
    minutes_per_block: u64,
) -> ConfirmationEstimate {
    for (i, tier) in tiers.as_slice().iter().enumerate() {
        if let Some(tier_fee) = tier {
            if fee >= *tier_fee {
                let blocks = (i + 1) as u32;
                return ConfirmationEstimate::Likely {
                    blocks,
                    minutes: u64::from(blocks) * minutes_per_block,
                };
            }
        }
    }
    ConfirmationEstimate::Unlikely
}
