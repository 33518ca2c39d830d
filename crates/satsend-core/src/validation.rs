//! Spend validation and fee checks run before the confirmation screen

use crate::address::is_valid_address;
use crate::amount::MonetaryFormatter;
use crate::confirmation::TierFees;
use crate::fees::FeeCalculator;
use crate::transaction::PendingTransaction;
use crate::{Error, Result};
use satsend_params::{ConsensusParams, Network, RelayPolicy};

/// Suggested fee above which a payment may be large (satoshis)
pub const LARGE_TX_FEE: u64 = 80_000;

/// Estimated size above which a payment may be large (bytes)
pub const LARGE_TX_SIZE: u64 = 516;

/// Fee share of the amount above which a payment may be large (percent)
pub const LARGE_TX_PERCENTAGE: u64 = 1;

/// Outcome of the fee check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeCheck {
    /// Fee is within the schedule's tiers
    Adequate,
    /// Fee is more than the fastest tier requires
    HigherThanNeeded {
        /// Fee of the fastest tier
        suggested: u64,
    },
    /// Fee is below the slowest tier
    LowerThanSuggested {
        /// Fee of the slowest tier
        suggested: u64,
    },
}

impl FeeCheck {
    /// Whether the payment can proceed without asking the user
    pub fn is_adequate(&self) -> bool {
        matches!(self, FeeCheck::Adequate)
    }

    /// Suggested replacement fee, if any
    pub fn suggested_fee(&self) -> Option<u64> {
        match self {
            FeeCheck::Adequate => None,
            FeeCheck::HigherThanNeeded { suggested }
            | FeeCheck::LowerThanSuggested { suggested } => Some(*suggested),
        }
    }

    /// Warning text for the alter-fee dialog
    pub fn warning(&self, fee: u64, formatter: &MonetaryFormatter) -> Option<String> {
        match self {
            FeeCheck::Adequate => None,
            FeeCheck::HigherThanNeeded { suggested } => Some(format!(
                "Your fee of {} is higher than necessary. A fee of {} is enough for the next block.",
                formatter.display_with_unit(fee),
                formatter.display_with_unit(*suggested)
            )),
            FeeCheck::LowerThanSuggested { suggested } => Some(format!(
                "Your fee of {} is low and the transaction may take a long time to confirm. \
                 We suggest a fee of {}.",
                formatter.display_with_unit(fee),
                formatter.display_with_unit(*suggested)
            )),
        }
    }
}

/// Validates a pending transaction against network and relay rules
#[derive(Debug, Clone)]
pub struct SpendValidator {
    network: Network,
    consensus: ConsensusParams,
    fees: FeeCalculator,
}

impl SpendValidator {
    /// Create a validator
    pub fn new(network: Network, consensus: ConsensusParams, policy: RelayPolicy) -> Self {
        Self {
            network,
            consensus,
            fees: FeeCalculator::new(policy),
        }
    }

    /// Network addresses are validated against
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Amount is at least dust and at most the total supply
    pub fn is_valid_amount(&self, amount: u64) -> bool {
        !self.fees.policy().is_dust(amount) && self.consensus.is_valid_amount(amount)
    }

    /// Check the pending transaction can be sent.
    ///
    /// Checks run in a fixed order and the first failure is returned.
    pub fn validate_spend(&self, pending: &PendingTransaction, max_available: i64) -> Result<()> {
        if !self.is_valid_amount(pending.amount) {
            return Err(Error::InvalidAmount(format!(
                "{} satoshis is outside {}..={}",
                pending.amount,
                self.fees.policy().dust_threshold,
                self.consensus.max_money
            )));
        }

        let bundle = pending.bundle.as_ref().ok_or_else(|| {
            Error::NoConfirmedFunds("Sender has no spendable outputs".to_string())
        })?;

        if max_available < 0 || (max_available as u64) < pending.amount {
            return Err(Error::InsufficientFunds(format!(
                "Amount {} exceeds available {}",
                pending.amount, max_available
            )));
        }

        let receiving_address = match pending.receiving_address.as_deref() {
            Some(address) if is_valid_address(&self.network, address) => address,
            other => {
                return Err(Error::InvalidAddress(
                    other.unwrap_or_default().to_string(),
                ))
            }
        };

        if let Some(sending) = &pending.sending {
            let same_account = pending
                .receiving
                .as_ref()
                .is_some_and(|receiving| receiving.same_source(sending));
            let same_address = sending
                .as_legacy()
                .is_some_and(|legacy| legacy.address == receiving_address);
            if same_account || same_address {
                return Err(Error::SameAddress(sending.source_id().to_string()));
            }
        }

        if bundle.is_empty() {
            return Err(Error::InsufficientFunds(
                "No outputs selected for the amount".to_string(),
            ));
        }

        Ok(())
    }

    /// Check the fee against the relay minimum and the schedule tiers.
    ///
    /// A fee below the relay minimum is an error; tier mismatches are
    /// warnings the user may override.
    pub fn check_fee(&self, pending: &PendingTransaction, tiers: &TierFees) -> Result<FeeCheck> {
        if let Some(bundle) = pending.bundle.as_ref().filter(|b| !b.is_empty()) {
            // assume a change output
            self.fees
                .validate_fee(bundle.input_count(), 2, pending.fee)?;
        }

        if let Some(top) = tiers.fastest() {
            if pending.fee > top {
                return Ok(FeeCheck::HigherThanNeeded { suggested: top });
            }
        }
        if let Some(bottom) = tiers.slowest() {
            if pending.fee < bottom {
                return Ok(FeeCheck::LowerThanSuggested { suggested: bottom });
            }
        }

        Ok(FeeCheck::Adequate)
    }

    /// Whether the suggested fee is large in absolute and relative terms
    pub fn is_large_transaction(
        &self,
        pending: &PendingTransaction,
        absolute_suggested_fee: u64,
    ) -> bool {
        let size = self.fees.estimated_size(pending.input_count(), 2);
        let relative_fee_exceeded = u128::from(absolute_suggested_fee) * 100
            > u128::from(pending.amount) * u128::from(LARGE_TX_PERCENTAGE);

        absolute_suggested_fee > LARGE_TX_FEE && size > LARGE_TX_SIZE && relative_fee_exceeded
    }
}

impl Default for SpendValidator {
    fn default() -> Self {
        Self::new(
            Network::mainnet(),
            ConsensusParams::mainnet(),
            RelayPolicy::standard(),
        )
    }
}
