//! Property-based tests for satsend-core
//!
//! Uses proptest to verify send-flow invariants across randomized inputs

use satsend_core::{
    estimate_confirmation, BitcoinUnit, ConfirmationEstimate, Error, FeePolicy, HdAccount,
    ItemAccount, MonetaryFormatter, PendingTransaction, SpendValidator, SuggestedFee, TierFees,
    TransactionCalculator, TransactionRequest, UnspentOutputs,
};
use satsend_params::{DUST_THRESHOLD, MAX_MONEY};
use proptest::prelude::*;

const RECEIVER: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Output values large enough to be spendable at any tested rate
fn coin_values_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(100_000u64..=50_000_000, 1..=12)
}

/// Fee rates from 1 to 100 sat/B
fn fee_rate_strategy() -> impl Strategy<Value = u64> {
    1_000u64..=100_000
}

/// Any amount up to the total supply
fn satoshi_strategy() -> impl Strategy<Value = u64> {
    0u64..=MAX_MONEY
}

fn unit_strategy() -> impl Strategy<Value = BitcoinUnit> {
    prop_oneof![
        Just(BitcoinUnit::Btc),
        Just(BitcoinUnit::MilliBtc),
        Just(BitcoinUnit::Bits),
    ]
}

fn separator_strategy() -> impl Strategy<Value = char> {
    prop_oneof![Just('.'), Just(',')]
}

fn tiers_strategy() -> impl Strategy<Value = TierFees> {
    prop::collection::vec(prop::option::weighted(0.9, 0u64..200_000), 0..=6)
        .prop_map(TierFees::new)
}

// ============================================================================
// Helpers
// ============================================================================

fn schedule(fee_per_kb: u64) -> SuggestedFee {
    SuggestedFee {
        default_fee_per_kb: fee_per_kb,
        ..SuggestedFee::test_schedule()
    }
}

fn sender() -> ItemAccount {
    ItemAccount::hd(
        "Spending",
        0,
        HdAccount {
            index: 0,
            xpub: "xpub-sender".to_string(),
            archived: false,
        },
    )
}

fn pending_for(
    calculator: &TransactionCalculator,
    coins: &UnspentOutputs,
    request: TransactionRequest,
    fee: &SuggestedFee,
) -> (PendingTransaction, i64) {
    let amounts = calculator.calculate(coins, &request, fee);
    let mut pending = PendingTransaction {
        sending: Some(sender()),
        receiving_address: Some(RECEIVER.to_string()),
        ..Default::default()
    };
    pending.apply(&amounts);
    (pending, amounts.max_available)
}

/// Position of an estimate; slower estimates rank higher
fn rank(estimate: ConfirmationEstimate) -> u64 {
    match estimate {
        ConfirmationEstimate::Likely { blocks, .. } => u64::from(blocks),
        ConfirmationEstimate::Unlikely => u64::MAX,
    }
}

// ============================================================================
// Validation Properties
// ============================================================================

proptest! {
    /// Property: amounts below dust never validate
    #[test]
    fn prop_dust_amount_is_invalid(
        values in coin_values_strategy(),
        amount in 0u64..DUST_THRESHOLD,
        rate in fee_rate_strategy()
    ) {
        let calculator = TransactionCalculator::default();
        let coins = UnspentOutputs::from_values(&values);
        let (pending, max_available) =
            pending_for(&calculator, &coins, TransactionRequest::new(amount), &schedule(rate));

        let result = SpendValidator::default().validate_spend(&pending, max_available);
        prop_assert!(matches!(result, Err(Error::InvalidAmount(_))));
    }

    /// Property: amounts above the spendable balance fail with insufficient funds
    #[test]
    fn prop_overspend_is_insufficient(
        values in coin_values_strategy(),
        excess in 1u64..10_000_000,
        rate in fee_rate_strategy()
    ) {
        let calculator = TransactionCalculator::default();
        let coins = UnspentOutputs::from_values(&values);
        let sweep = calculator.selector().sweep_bundle(&coins, rate);
        let amount = sweep.sweep_amount + excess;

        let (pending, max_available) =
            pending_for(&calculator, &coins, TransactionRequest::new(amount), &schedule(rate));

        let result = SpendValidator::default().validate_spend(&pending, max_available);
        prop_assert!(matches!(result, Err(Error::InsufficientFunds(_))));
    }

    /// Property: a fee below the relay minimum is always rejected
    #[test]
    fn prop_low_custom_fee_rejected(
        values in coin_values_strategy(),
        amount in 546u64..1_000_000,
        custom_fee in 1u64..2_260
    ) {
        let calculator = TransactionCalculator::default();
        let coins = UnspentOutputs::from_values(&values);
        let request = TransactionRequest::new(amount).with_fee_policy(FeePolicy::Custom(custom_fee));
        let (pending, _) = pending_for(&calculator, &coins, request, &SuggestedFee::test_schedule());
        prop_assume!(pending.input_count() > 0);

        let result = SpendValidator::default().check_fee(&pending, &TierFees::default());
        prop_assert!(matches!(result, Err(Error::FeeTooLow(_))));
    }
}

// ============================================================================
// Spend-All Properties
// ============================================================================

proptest! {
    /// Property: spend-all at the suggested rate uses the whole spendable balance
    #[test]
    fn prop_spend_all_suggested_fee(
        values in coin_values_strategy(),
        rate in fee_rate_strategy()
    ) {
        let calculator = TransactionCalculator::default();
        let coins = UnspentOutputs::from_values(&values);
        let request = TransactionRequest::spend_all(FeePolicy::Suggested);
        let amounts = calculator.calculate(&coins, &request, &schedule(rate));

        let spendable = calculator.selector().sweepable_balance(&coins, rate);
        prop_assert_eq!(amounts.amount + amounts.fee, spendable);
        prop_assert_eq!(amounts.max_available, amounts.amount as i64);
    }

    /// Property: spend-all with a custom fee uses the whole balance
    #[test]
    fn prop_spend_all_custom_fee(
        values in coin_values_strategy(),
        fee_share in 0.0f64..1.0
    ) {
        let calculator = TransactionCalculator::default();
        let coins = UnspentOutputs::from_values(&values);
        let total = coins.total_value();
        let custom_fee = ((total as f64) * fee_share) as u64 + 1;
        prop_assume!(custom_fee <= total);

        let request = TransactionRequest::spend_all(FeePolicy::Custom(custom_fee));
        let amounts = calculator.calculate(&coins, &request, &SuggestedFee::test_schedule());

        prop_assert_eq!(amounts.amount + amounts.fee, total);
        prop_assert!(!amounts.custom_fee_exceeds_available);
    }
}

// ============================================================================
// Confirmation Properties
// ============================================================================

proptest! {
    /// Property: raising the fee never moves the estimate to a slower tier
    #[test]
    fn prop_confirmation_monotonic(
        tiers in tiers_strategy(),
        fee in 0u64..250_000,
        raise in 0u64..250_000
    ) {
        let lower = estimate_confirmation(fee, &tiers, 10);
        let higher = estimate_confirmation(fee + raise, &tiers, 10);
        prop_assert!(rank(higher) <= rank(lower));
    }
}

// ============================================================================
// Amount Formatting Properties
// ============================================================================

proptest! {
    /// Property: formatting then parsing is lossless in every unit
    #[test]
    fn prop_display_round_trip(
        satoshis in satoshi_strategy(),
        unit in unit_strategy(),
        separator in separator_strategy()
    ) {
        let formatter = MonetaryFormatter::new(unit, separator);
        let text = formatter.display_amount(satoshis);
        prop_assert_eq!(formatter.satoshis_from_text(&text), satoshis);
    }
}
