//! Async send-flow service
//!
//! Orchestrates the send screen on top of `satsend-core`: fetches unspent
//! outputs and the fee schedule over HTTP, caches them, runs amount
//! calculations with cancellation and drives a payment through validation,
//! confirmation and submission via collaborator traits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod error;
pub mod flow;

pub use api::{
    BlockchainApiClient, FeeApi, PaymentRequest, PaymentService, ScannedKey, UnspentApi,
    WalletKeys, NO_FREE_OUTPUTS,
};
pub use cache::{BalanceCache, DefaultAccountUnspentCache, DynamicFeeCache, UnspentCache};
pub use cancel::CancelToken;
pub use config::ServiceConfig;
pub use error::{Error, Result};
pub use flow::{
    AmountTextUpdate, PaymentReceipt, ReceiveWarning, ScannedPayment, SendDecision, SendFlow,
    SendFlowDeps, SendState, SharedCaches,
};
