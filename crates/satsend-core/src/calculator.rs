//! Transaction amount calculation
//!
//! Turns the sender's unspent outputs, the requested amount and the fee
//! policy into the figures the send screen displays: maximum available
//! balance, amount, fee, selected inputs and confirmation estimate.

use crate::confirmation::{estimate_confirmation, tier_fees, ConfirmationEstimate, TierFees};
use crate::fees::{FeePolicy, SuggestedFee};
use crate::selection::{CoinSelector, SpendableUnspentOutputs};
use crate::unspent::UnspentOutputs;
use satsend_params::{ConsensusParams, RelayPolicy};

/// What the user asked to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Amount in satoshis (ignored when `spend_all` is set)
    pub amount: u64,
    /// Fee policy
    pub fee_policy: FeePolicy,
    /// Send the maximum available amount
    pub spend_all: bool,
}

impl TransactionRequest {
    /// Request to send `amount` with the suggested fee
    pub fn new(amount: u64) -> Self {
        Self {
            amount,
            fee_policy: FeePolicy::Suggested,
            spend_all: false,
        }
    }

    /// Request to send everything
    pub fn spend_all(fee_policy: FeePolicy) -> Self {
        Self {
            amount: 0,
            fee_policy,
            spend_all: true,
        }
    }

    /// Use a fee policy
    pub fn with_fee_policy(mut self, fee_policy: FeePolicy) -> Self {
        self.fee_policy = fee_policy;
        self
    }
}

/// Calculated figures for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionAmounts {
    /// Spendable balance after fees; negative when a custom fee exceeds it
    pub max_available: i64,
    /// Amount to send in satoshis
    pub amount: u64,
    /// Fee in satoshis
    pub fee: u64,
    /// Selected inputs; `None` when the sender has no spendable outputs
    pub bundle: Option<SpendableUnspentOutputs>,
    /// Fee the suggested rate would charge for `amount`
    pub absolute_suggested_fee: u64,
    /// Per-tier absolute fees
    pub tier_fees: TierFees,
    /// Confirmation estimate, when the schedule has tiers
    pub estimate: Option<ConfirmationEstimate>,
    /// Custom fee plus amount exceed the fee-free sweep amount
    pub custom_fee_exceeds_available: bool,
    /// Server notice about unconfirmed funds
    pub notice: Option<String>,
}

impl TransactionAmounts {
    /// Figures for a sender without spendable outputs
    pub fn no_outputs(amount: u64) -> Self {
        Self {
            max_available: 0,
            amount,
            fee: 0,
            bundle: None,
            absolute_suggested_fee: 0,
            tier_fees: TierFees::default(),
            estimate: None,
            custom_fee_exceeds_available: false,
            notice: None,
        }
    }

    /// Whether the sender has nothing spendable at all
    pub fn has_no_funds(&self) -> bool {
        self.bundle.is_none() || self.max_available <= 0
    }

    /// Whether the requested payment cannot be funded
    pub fn is_insufficient(&self) -> bool {
        match &self.bundle {
            None => true,
            Some(bundle) => {
                bundle.is_empty()
                    || self.max_available <= 0
                    || self.amount > self.max_available as u64
            }
        }
    }

    /// Max available clamped for display
    pub fn max_available_display(&self) -> u64 {
        self.max_available.max(0) as u64
    }
}

/// Computes [`TransactionAmounts`]
#[derive(Debug, Clone)]
pub struct TransactionCalculator {
    selector: CoinSelector,
    minutes_per_block: u64,
}

impl TransactionCalculator {
    /// Create a calculator
    pub fn new(policy: RelayPolicy, consensus: &ConsensusParams) -> Self {
        Self {
            selector: CoinSelector::new(policy),
            minutes_per_block: consensus.minutes_per_block(),
        }
    }

    /// Coin selector in use
    pub fn selector(&self) -> &CoinSelector {
        &self.selector
    }

    /// Calculate amounts for `request` against `coins`
    pub fn calculate(
        &self,
        coins: &UnspentOutputs,
        request: &TransactionRequest,
        suggested_fee: &SuggestedFee,
    ) -> TransactionAmounts {
        let default_rate = suggested_fee.default_fee_per_kb;
        let mut amounts = match request.fee_policy {
            FeePolicy::Custom(custom_fee) => self.custom_fee_payment(coins, request, custom_fee),
            FeePolicy::Suggested => self.suggested_fee_payment(coins, request, default_rate),
        };

        // priced on the final amount so spend-all quotes a real fee
        amounts.absolute_suggested_fee = self
            .selector
            .spendable_coins(coins, amounts.amount, default_rate)
            .map(|bundle| bundle.absolute_fee)
            .unwrap_or(0);
        amounts.notice = coins.notice.clone();

        if suggested_fee.has_estimates() {
            let tiers = tier_fees(
                &self.selector,
                coins,
                amounts.amount,
                &suggested_fee.estimates,
            );
            amounts.estimate = Some(estimate_confirmation(
                amounts.fee,
                &tiers,
                self.minutes_per_block,
            ));
            amounts.tier_fees = tiers;
        }

        tracing::debug!(
            "Calculated amounts: max_available={}, amount={}, fee={}, inputs={}",
            amounts.max_available,
            amounts.amount,
            amounts.fee,
            amounts.bundle.as_ref().map_or(0, |b| b.input_count())
        );

        amounts
    }

    fn custom_fee_payment(
        &self,
        coins: &UnspentOutputs,
        request: &TransactionRequest,
        custom_fee: u64,
    ) -> TransactionAmounts {
        let sweep = self.selector.sweep_bundle(coins, 0);
        let max_available = to_signed(sweep.sweep_amount) - to_signed(custom_fee);

        let amount = if request.spend_all {
            max_available.max(0) as u64
        } else {
            request.amount
        };

        let total = amount.checked_add(custom_fee);
        let custom_fee_exceeds_available = total.map_or(true, |t| t > sweep.sweep_amount);

        let bundle = total
            .and_then(|t| self.selector.spendable_coins(coins, t, 0).ok())
            .unwrap_or_else(empty_bundle);

        TransactionAmounts {
            max_available,
            amount,
            fee: custom_fee,
            bundle: Some(bundle),
            absolute_suggested_fee: 0,
            tier_fees: TierFees::default(),
            estimate: None,
            custom_fee_exceeds_available,
            notice: None,
        }
    }

    fn suggested_fee_payment(
        &self,
        coins: &UnspentOutputs,
        request: &TransactionRequest,
        fee_per_kb: u64,
    ) -> TransactionAmounts {
        let sweep = self.selector.sweep_bundle(coins, fee_per_kb);
        let amount = if request.spend_all {
            sweep.sweep_amount
        } else {
            request.amount
        };

        let bundle = self
            .selector
            .spendable_coins(coins, amount, fee_per_kb)
            .unwrap_or_else(|e| {
                tracing::debug!("No selection for {} satoshis: {}", amount, e);
                empty_bundle()
            });

        TransactionAmounts {
            max_available: to_signed(sweep.sweep_amount),
            amount,
            fee: bundle.absolute_fee,
            bundle: Some(bundle),
            absolute_suggested_fee: 0,
            tier_fees: TierFees::default(),
            estimate: None,
            custom_fee_exceeds_available: false,
            notice: None,
        }
    }
}

impl Default for TransactionCalculator {
    fn default() -> Self {
        Self::new(RelayPolicy::standard(), &ConsensusParams::default())
    }
}

fn empty_bundle() -> SpendableUnspentOutputs {
    SpendableUnspentOutputs {
        outputs: Vec::new(),
        absolute_fee: 0,
        change: 0,
        consumed_amount: 0,
    }
}

fn to_signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
