//! Coin selection for transaction building
//!
//! Largest-first selection with a fee that grows with the number of inputs.
//! Outputs that cost more to spend than they are worth are never selected.

use crate::fees::FeeCalculator;
use crate::unspent::{UnspentOutput, UnspentOutputs};
use crate::{Error, Result};
use satsend_params::RelayPolicy;

/// Outputs selected to fund a payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendableUnspentOutputs {
    /// Selected inputs, largest first
    pub outputs: Vec<UnspentOutput>,
    /// Absolute fee paid by the transaction (includes any consumed amount)
    pub absolute_fee: u64,
    /// Change returned to the sender (zero when no change output)
    pub change: u64,
    /// Leftover below the dust threshold that is given to miners
    pub consumed_amount: u64,
}

impl SpendableUnspentOutputs {
    /// Total value of selected inputs
    pub fn total_value(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }

    /// Number of selected inputs
    pub fn input_count(&self) -> usize {
        self.outputs.len()
    }

    /// Whether the transaction pays change
    pub fn has_change(&self) -> bool {
        self.change > 0
    }

    /// Whether no inputs were selected
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// The maximal spend from a set of outputs at a given fee rate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepBundle {
    /// Outputs worth spending at the rate
    pub outputs: Vec<UnspentOutput>,
    /// Amount that can be sent after fees
    pub sweep_amount: u64,
    /// Fee of the single-output sweep transaction
    pub absolute_fee: u64,
}

impl SweepBundle {
    /// Total value of the swept outputs
    pub fn total_value(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }
}

/// Coin selector
#[derive(Debug, Clone)]
pub struct CoinSelector {
    fees: FeeCalculator,
}

impl CoinSelector {
    /// Create a selector for the given relay policy
    pub fn new(policy: RelayPolicy) -> Self {
        Self {
            fees: FeeCalculator::new(policy),
        }
    }

    /// Fee calculator in use
    pub fn fees(&self) -> &FeeCalculator {
        &self.fees
    }

    /// Select inputs to pay `amount` at `fee_per_kb`.
    ///
    /// A change output is added only when the change would not be dust;
    /// otherwise the leftover is consumed into the fee.
    pub fn spendable_coins(
        &self,
        coins: &UnspentOutputs,
        amount: u64,
        fee_per_kb: u64,
    ) -> Result<SpendableUnspentOutputs> {
        let candidates = self.worthwhile_outputs(coins, fee_per_kb);
        let policy = self.fees.policy();

        tracing::debug!(
            "Selecting coins: amount={}, fee_per_kb={}, candidates={}",
            amount,
            fee_per_kb,
            candidates.len()
        );

        let mut selected = Vec::new();
        let mut collected = 0u64;

        for coin in candidates {
            collected = collected
                .checked_add(coin.value)
                .ok_or_else(|| Error::AmountOverflow("Input value overflow".to_string()))?;
            selected.push(coin.clone());
            let inputs = selected.len();

            let fee_with_change = self.fees.estimated_fee(inputs, 2, fee_per_kb);
            if let Some(required) = amount.checked_add(fee_with_change) {
                if collected >= required && !policy.is_dust(collected - required) {
                    let change = collected - required;
                    tracing::debug!(
                        "Selected {} inputs, total={}, fee={}, change={}",
                        inputs,
                        collected,
                        fee_with_change,
                        change
                    );
                    return Ok(SpendableUnspentOutputs {
                        outputs: selected,
                        absolute_fee: fee_with_change,
                        change,
                        consumed_amount: 0,
                    });
                }
            }

            let fee_without_change = self.fees.estimated_fee(inputs, 1, fee_per_kb);
            if let Some(required) = amount.checked_add(fee_without_change) {
                if collected >= required {
                    let leftover = collected - amount;
                    tracing::debug!(
                        "Selected {} inputs without change, total={}, fee={}, consumed={}",
                        inputs,
                        collected,
                        leftover,
                        leftover - fee_without_change
                    );
                    return Ok(SpendableUnspentOutputs {
                        outputs: selected,
                        absolute_fee: leftover,
                        change: 0,
                        consumed_amount: leftover - fee_without_change,
                    });
                }
            }
        }

        Err(Error::InsufficientFunds(format!(
            "Required {} satoshis plus fee, have {} satoshis spendable",
            amount, collected
        )))
    }

    /// All outputs worth spending at `fee_per_kb`, swept to one output
    pub fn sweep_bundle(&self, coins: &UnspentOutputs, fee_per_kb: u64) -> SweepBundle {
        let outputs: Vec<UnspentOutput> = self
            .worthwhile_outputs(coins, fee_per_kb)
            .into_iter()
            .cloned()
            .collect();

        if outputs.is_empty() {
            return SweepBundle {
                outputs,
                sweep_amount: 0,
                absolute_fee: 0,
            };
        }

        let total: u64 = outputs.iter().map(|o| o.value).sum();
        let absolute_fee = self.fees.estimated_fee(outputs.len(), 1, fee_per_kb);

        SweepBundle {
            sweep_amount: total.saturating_sub(absolute_fee),
            absolute_fee,
            outputs,
        }
    }

    /// Total value of the outputs worth spending at `fee_per_kb`
    pub fn sweepable_balance(&self, coins: &UnspentOutputs, fee_per_kb: u64) -> u64 {
        self.worthwhile_outputs(coins, fee_per_kb)
            .iter()
            .map(|o| o.value)
            .sum()
    }

    fn worthwhile_outputs<'a>(
        &self,
        coins: &'a UnspentOutputs,
        fee_per_kb: u64,
    ) -> Vec<&'a UnspentOutput> {
        let input_cost = self.fees.input_cost(fee_per_kb);
        let mut outputs: Vec<&UnspentOutput> = coins
            .outputs
            .iter()
            .filter(|o| o.value > input_cost)
            .collect();
        outputs.sort_by(|a, b| b.value.cmp(&a.value));
        outputs
    }
}

impl Default for CoinSelector {
    fn default() -> Self {
        Self::new(RelayPolicy::standard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_coins() -> UnspentOutputs {
        UnspentOutputs::new(vec![
            UnspentOutput::new("aa", 0, 100_000),
            UnspentOutput::new("bb", 0, 500_000),
            UnspentOutput::new("cc", 0, 250_000),
            UnspentOutput::new("dd", 0, 1_000_000),
        ])
    }

    #[test]
    fn test_largest_first_selection() {
        let selector = CoinSelector::default();
        let result = selector
            .spendable_coins(&create_test_coins(), 300_000, 10_000)
            .unwrap();

        assert_eq!(result.input_count(), 1);
        assert_eq!(result.outputs[0].value, 1_000_000);
        // 1 input, 2 outputs = 226 bytes at 10 sat/B
        assert_eq!(result.absolute_fee, 2_260);
        assert_eq!(result.change, 1_000_000 - 300_000 - 2_260);
        assert_eq!(result.consumed_amount, 0);
    }

    #[test]
    fn test_multiple_inputs() {
        let selector = CoinSelector::default();
        let result = selector
            .spendable_coins(&create_test_coins(), 1_200_000, 10_000)
            .unwrap();

        assert_eq!(result.input_count(), 2);
        assert_eq!(result.total_value(), 1_500_000);
        assert_eq!(result.absolute_fee, 3_740);
        assert_eq!(result.change, 1_500_000 - 1_200_000 - 3_740);
    }

    #[test]
    fn test_insufficient_funds() {
        let selector = CoinSelector::default();
        let result = selector.spendable_coins(&create_test_coins(), 5_000_000, 10_000);
        assert!(matches!(result, Err(Error::InsufficientFunds(_))));
    }

    #[test]
    fn test_dust_change_is_consumed() {
        let selector = CoinSelector::default();
        let coins = UnspentOutputs::new(vec![UnspentOutput::new("aa", 0, 100_000)]);
        // change with 2 outputs would be 100_000 - 97_500 - 2_260 = 240 (dust)
        let result = selector.spendable_coins(&coins, 97_500, 10_000).unwrap();

        assert_eq!(result.change, 0);
        assert_eq!(result.absolute_fee, 2_500);
        // single-output fee is 1_920
        assert_eq!(result.consumed_amount, 580);
    }

    #[test]
    fn test_uneconomical_outputs_skipped() {
        let selector = CoinSelector::default();
        let coins = UnspentOutputs::new(vec![
            UnspentOutput::new("aa", 0, 1_480),
            UnspentOutput::new("bb", 0, 50_000),
        ]);
        let bundle = selector.sweep_bundle(&coins, 10_000);
        assert_eq!(bundle.outputs.len(), 1);
        assert_eq!(bundle.absolute_fee, 1_920);
        assert_eq!(bundle.sweep_amount, 48_080);
        assert_eq!(selector.sweepable_balance(&coins, 10_000), 50_000);
        assert_eq!(selector.sweepable_balance(&coins, 0), 51_480);
    }

    #[test]
    fn test_sweep_amount_is_spendable() {
        let selector = CoinSelector::default();
        let coins = create_test_coins();
        let bundle = selector.sweep_bundle(&coins, 10_000);
        let spend = selector
            .spendable_coins(&coins, bundle.sweep_amount, 10_000)
            .unwrap();

        assert_eq!(spend.input_count(), 4);
        assert_eq!(spend.absolute_fee, bundle.absolute_fee);
        assert_eq!(spend.total_value(), bundle.sweep_amount + spend.absolute_fee);
    }

    #[test]
    fn test_empty_sweep() {
        let selector = CoinSelector::default();
        let bundle = selector.sweep_bundle(&UnspentOutputs::default(), 10_000);
        assert_eq!(bundle.sweep_amount, 0);
        assert!(bundle.outputs.is_empty());
    }

    #[test]
    fn test_zero_rate_selection() {
        let selector = CoinSelector::default();
        let result = selector
            .spendable_coins(&create_test_coins(), 1_000_000, 0)
            .unwrap();
        assert_eq!(result.input_count(), 1);
        assert_eq!(result.absolute_fee, 0);
        assert_eq!(result.change, 0);
    }
}
