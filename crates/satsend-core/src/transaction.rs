//! Pending transaction state and the confirmation summary

use crate::account::ItemAccount;
use crate::amount::MonetaryFormatter;
use crate::calculator::TransactionAmounts;
use crate::selection::SpendableUnspentOutputs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The payment being assembled by the send flow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingTransaction {
    /// Funding account
    pub sending: Option<ItemAccount>,
    /// Receiving picker entry, when chosen from a list
    pub receiving: Option<ItemAccount>,
    /// Destination address
    pub receiving_address: Option<String>,
    /// Amount in satoshis
    pub amount: u64,
    /// Fee in satoshis
    pub fee: u64,
    /// Selected inputs
    pub bundle: Option<SpendableUnspentOutputs>,
}

impl PendingTransaction {
    /// Whether the sender is an HD account
    pub fn is_hd(&self) -> bool {
        self.sending
            .as_ref()
            .is_some_and(|account| account.as_hd().is_some())
    }

    /// Amount plus fee
    pub fn total(&self) -> u64 {
        self.amount.saturating_add(self.fee)
    }

    /// Number of selected inputs
    pub fn input_count(&self) -> usize {
        self.bundle.as_ref().map_or(0, |b| b.input_count())
    }

    /// Store calculated amounts
    pub fn apply(&mut self, amounts: &TransactionAmounts) {
        self.amount = amounts.amount;
        self.fee = amounts.fee;
        self.bundle = amounts.bundle.clone();
    }

    /// Clear everything for a new payment
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Fiat currency and rate for the confirmation summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiatContext {
    /// ISO currency code
    pub currency: String,
    /// Fiat per bitcoin
    pub exchange_rate: Decimal,
}

impl Default for FiatContext {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            exchange_rate: Decimal::ZERO,
        }
    }
}

/// Everything shown on the confirm-payment screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmationDetails {
    /// Sender label
    pub from_label: String,
    /// Receiver label, or the address when unlabeled
    pub to_label: String,
    /// Amount in display units
    pub btc_amount: String,
    /// Fee in display units
    pub btc_fee: String,
    /// Amount plus fee in display units
    pub btc_total: String,
    /// Fee the suggested rate would charge, in display units
    pub btc_suggested_fee: String,
    /// Display unit label
    pub btc_unit: String,
    /// Fiat currency code
    pub fiat_unit: String,
    /// Amount in fiat
    pub fiat_amount: String,
    /// Fee in fiat
    pub fiat_fee: String,
    /// Total in fiat
    pub fiat_total: String,
    /// Fee schedule reports a surge
    pub is_surge: bool,
    /// Fee is large relative to the payment
    pub is_large_transaction: bool,
    /// Dust leftover is added to the fee
    pub has_consumed_amounts: bool,
}

/// Inputs for [`PaymentConfirmationDetails::new`] beyond the pending transaction
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationContext<'a> {
    /// Formatter for display units
    pub formatter: &'a MonetaryFormatter,
    /// Fiat currency and rate
    pub fiat: &'a FiatContext,
    /// Fee the suggested rate would charge
    pub absolute_suggested_fee: u64,
    /// Fee schedule reports a surge
    pub is_surge: bool,
    /// Result of the large-transaction check
    pub is_large_transaction: bool,
}

impl PaymentConfirmationDetails {
    /// Summarize `pending` for confirmation
    pub fn new(pending: &PendingTransaction, ctx: ConfirmationContext<'_>) -> Self {
        let fmt = ctx.formatter;
        let rate = ctx.fiat.exchange_rate;

        let from_label = pending
            .sending
            .as_ref()
            .map(|account| account.label.clone())
            .unwrap_or_default();
        let to_label = pending
            .receiving
            .as_ref()
            .map(|account| account.label.clone())
            .filter(|label| !label.is_empty())
            .or_else(|| pending.receiving_address.clone())
            .unwrap_or_default();

        let total = pending.total();

        Self {
            from_label,
            to_label,
            btc_amount: fmt.display_amount(pending.amount),
            btc_fee: fmt.display_amount(pending.fee),
            btc_total: fmt.display_amount(total),
            btc_suggested_fee: fmt.display_amount(ctx.absolute_suggested_fee),
            btc_unit: fmt.unit().label().to_string(),
            fiat_unit: ctx.fiat.currency.clone(),
            fiat_amount: fmt.display_fiat(fmt.fiat_from_satoshis(pending.amount, rate)),
            fiat_fee: fmt.display_fiat(fmt.fiat_from_satoshis(pending.fee, rate)),
            fiat_total: fmt.display_fiat(fmt.fiat_from_satoshis(total, rate)),
            is_surge: ctx.is_surge,
            is_large_transaction: ctx.is_large_transaction,
            has_consumed_amounts: pending
                .bundle
                .as_ref()
                .is_some_and(|b| b.consumed_amount > 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{HdAccount, LegacyAddress};
    use crate::amount::BitcoinUnit;
    use crate::unspent::UnspentOutput;

    fn pending() -> PendingTransaction {
        PendingTransaction {
            sending: Some(ItemAccount::hd(
                "Savings",
                1_000_000,
                HdAccount {
                    index: 0,
                    xpub: "xpub0".to_string(),
                    archived: false,
                },
            )),
            receiving: None,
            receiving_address: Some("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa".to_string()),
            amount: 150_000_000,
            fee: 10_000,
            bundle: Some(SpendableUnspentOutputs {
                outputs: vec![UnspentOutput::new("aa", 0, 200_000_000)],
                absolute_fee: 10_500,
                change: 0,
                consumed_amount: 500,
            }),
        }
    }

    #[test]
    fn test_pending_transaction() {
        let mut tx = pending();
        assert!(tx.is_hd());
        assert_eq!(tx.total(), 150_010_000);
        assert_eq!(tx.input_count(), 1);

        tx.sending = Some(ItemAccount::legacy(
            "Imported",
            0,
            LegacyAddress {
                address: "1abc".to_string(),
                watch_only: false,
                has_private_key: true,
                archived: false,
            },
        ));
        assert!(!tx.is_hd());

        tx.reset();
        assert_eq!(tx, PendingTransaction::default());
    }

    #[test]
    fn test_confirmation_details() {
        let formatter = MonetaryFormatter::new(BitcoinUnit::Btc, ',');
        let fiat = FiatContext {
            currency: "EUR".to_string(),
            exchange_rate: Decimal::new(20_000, 0),
        };
        let details = PaymentConfirmationDetails::new(
            &pending(),
            ConfirmationContext {
                formatter: &formatter,
                fiat: &fiat,
                absolute_suggested_fee: 5_000,
                is_surge: true,
                is_large_transaction: false,
            },
        );

        assert_eq!(details.from_label, "Savings");
        assert_eq!(details.to_label, "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa");
        assert_eq!(details.btc_amount, "1,5");
        assert_eq!(details.btc_fee, "0,0001");
        assert_eq!(details.btc_total, "1,5001");
        assert_eq!(details.btc_suggested_fee, "0,00005");
        assert_eq!(details.btc_unit, "BTC");
        assert_eq!(details.fiat_amount, "30000,00");
        assert_eq!(details.fiat_fee, "2,00");
        assert_eq!(details.fiat_total, "30002,00");
        assert!(details.is_surge);
        assert!(details.has_consumed_amounts);
    }

    #[test]
    fn test_receiving_label_preferred() {
        let mut tx = pending();
        tx.receiving = Some(ItemAccount::address_book("Alice", "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"));
        let formatter = MonetaryFormatter::default();
        let details = PaymentConfirmationDetails::new(
            &tx,
            ConfirmationContext {
                formatter: &formatter,
                fiat: &FiatContext::default(),
                absolute_suggested_fee: 0,
                is_surge: false,
                is_large_transaction: true,
            },
        );
        assert_eq!(details.to_label, "Alice");
        assert_eq!(details.fiat_total, "0.00");
        assert!(details.is_large_transaction);
    }
}
