//! Bitcoin send-flow core
//!
//! This crate implements the synchronous half of a wallet's send screen:
//! amount parsing and formatting, address and payment URI validation, the
//! dynamic fee schedule, coin selection, confirmation-time estimation and
//! the checks a payment must pass before it is confirmed.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod address;
pub mod amount;
pub mod calculator;
pub mod confirmation;
pub mod error;
pub mod fees;
pub mod selection;
pub mod transaction;
pub mod unspent;
pub mod uri;
pub mod validation;

pub use account::{
    AccountKind, AddressBookEntry, HdAccount, ItemAccount, LegacyAddress, SecondPassword,
    SigningKey,
};
pub use address::{is_valid_address, parse_address, AddressKind, BitcoinAddress};
pub use amount::{btc_to_satoshis, BitcoinUnit, MonetaryFormatter};
pub use calculator::{TransactionAmounts, TransactionCalculator, TransactionRequest};
pub use confirmation::{estimate_confirmation, tier_fees, ConfirmationEstimate, TierFees};
pub use error::{Error, ErrorCategory, Result};
pub use fees::{FeeCalculator, FeeEstimate, FeePolicy, SuggestedFee};
pub use selection::{CoinSelector, SpendableUnspentOutputs, SweepBundle};
pub use transaction::{
    ConfirmationContext, FiatContext, PaymentConfirmationDetails, PendingTransaction,
};
pub use unspent::{get_coins, UnspentOutput, UnspentOutputs};
pub use uri::{parse_scan, ScanResult};
pub use validation::{
    FeeCheck, SpendValidator, LARGE_TX_FEE, LARGE_TX_PERCENTAGE, LARGE_TX_SIZE,
};
