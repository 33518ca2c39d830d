//! Send flow state machine
//!
//! `SendFlow` drives one payment from account selection to broadcast:
//!
//! ```text
//! Idle -> FetchingUnspentOutputs -> {Valid, Insufficient, Error}
//!      -> ConfirmationShown -> Submitting -> {Success, Failure}
//! ```
//!
//! Amount calculations run on spawned tasks. Starting a calculation cancels
//! the previous one, and a result that arrives after a newer calculation
//! started is discarded.

use crate::api::{FeeApi, PaymentRequest, PaymentService, ScannedKey, UnspentApi, WalletKeys};
use crate::cache::{BalanceCache, DefaultAccountUnspentCache, DynamicFeeCache, UnspentCache};
use crate::cancel::CancelToken;
use crate::config::ServiceConfig;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use satsend_core::{
    get_coins, is_valid_address, parse_scan, AccountKind, ConfirmationContext, FeeCheck,
    FeePolicy, FiatContext, ItemAccount, MonetaryFormatter, PaymentConfirmationDetails,
    PendingTransaction, SecondPassword, SigningKey, SpendValidator, SuggestedFee,
    TransactionAmounts, TransactionCalculator, TransactionRequest,
};
use satsend_params::RelayPolicy;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Where the flow currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendState {
    /// Nothing calculated yet
    Idle,
    /// Fetching unspent outputs and calculating amounts
    FetchingUnspentOutputs,
    /// Amounts calculated and affordable
    Valid,
    /// Sender cannot afford a payment
    Insufficient,
    /// Calculation failed
    Error,
    /// Confirmation details handed to the user
    ConfirmationShown,
    /// Payment is being broadcast
    Submitting,
    /// Payment broadcast
    Success,
    /// Broadcast failed
    Failure,
}

/// What the UI should do after send is pressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendDecision {
    /// Fee is outside the schedule's tiers; offer to change it
    FeeWarning {
        /// Fee check outcome with the suggested replacement
        check: FeeCheck,
        /// Warning text
        message: String,
    },
    /// Prompt for the second password, then call `provide_second_password`
    SecondPasswordRequired,
    /// Sender is watch-only without a key; scan its private key and call
    /// `provide_watch_only_key`
    WatchOnlySpend {
        /// Watch-only address
        address: String,
    },
    /// Scanned key is BIP38-encrypted; ask for its passphrase
    Bip38PassphraseRequired,
    /// Show the confirmation screen
    Confirm(PaymentConfirmationDetails),
}

/// Warning raised when picking a receiving account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveWarning {
    /// Funds sent to a watch-only address cannot be spent from this wallet
    WatchOnly {
        /// Watch-only address
        address: String,
    },
}

/// Field updates after the user edits an amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountTextUpdate {
    /// Replacement for the edited text when it had too many fraction digits
    pub corrected_text: Option<String>,
    /// New text for the other amount field
    pub converted_text: String,
}

/// Destination and amount taken from scanned or pasted data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedPayment {
    /// Destination address
    pub address: String,
    /// Requested amount in satoshis
    pub amount: Option<u64>,
    /// Requested amount in display units
    pub amount_text: Option<String>,
    /// Requested amount in fiat
    pub fiat_text: Option<String>,
    /// Label from the URI
    pub label: Option<String>,
}

/// Result of a broadcast payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// Transaction hash
    pub tx_hash: String,
    /// Amount sent in satoshis
    pub amount: u64,
    /// Fee paid in satoshis
    pub fee: u64,
    /// Broadcast time
    pub submitted_at: DateTime<Utc>,
}

/// Process-wide caches shared by every send flow
#[derive(Debug, Clone)]
pub struct SharedCaches {
    /// Dynamic fee schedule
    pub fees: DynamicFeeCache,
    /// Warm response for the default account
    pub default_account: DefaultAccountUnspentCache,
    /// Wallet balances
    pub balances: BalanceCache,
}

impl SharedCaches {
    /// Create empty caches
    pub fn new(policy: &RelayPolicy) -> Self {
        Self {
            fees: DynamicFeeCache::new(policy),
            default_account: DefaultAccountUnspentCache::new(),
            balances: BalanceCache::new(),
        }
    }
}

/// External collaborators of a send flow
#[derive(Clone)]
pub struct SendFlowDeps {
    /// Unspent outputs
    pub unspent_api: Arc<dyn UnspentApi>,
    /// Fee schedule
    pub fee_api: Arc<dyn FeeApi>,
    /// Build, sign and broadcast
    pub payments: Arc<dyn PaymentService>,
    /// Accounts, addresses and keys
    pub wallet: Arc<dyn WalletKeys>,
    /// Shared caches
    pub caches: SharedCaches,
}

/// One payment being assembled
#[derive(Clone)]
pub struct SendFlow {
    inner: Arc<FlowInner>,
}

struct FlowInner {
    deps: SendFlowDeps,
    calculator: TransactionCalculator,
    validator: SpendValidator,
    formatter: MonetaryFormatter,
    fiat: FiatContext,
    default_account_xpub: Option<String>,
    warn_watch_only_receive: bool,
    unspent_cache: UnspentCache,
    state: Mutex<FlowState>,
}

struct FlowState {
    send_state: SendState,
    pending: PendingTransaction,
    amounts: Option<TransactionAmounts>,
    max_available: Option<i64>,
    suggested_fee: SuggestedFee,
    verified_password: Option<SecondPassword>,
    watch_only_key: Option<(String, SigningKey)>,
    cancel: Option<CancelToken>,
    calculation: u64,
    last_error: Option<String>,
}

impl SendFlow {
    /// Create a flow.
    ///
    /// The suggested fee is seeded from the fee cache and refreshed in the
    /// background when a runtime is available.
    pub fn new(config: &ServiceConfig, deps: SendFlowDeps) -> Self {
        let suggested_fee = deps.caches.fees.suggested_fee();
        let policy = config.relay_policy();
        let consensus = config.consensus();

        let flow = Self {
            inner: Arc::new(FlowInner {
                calculator: TransactionCalculator::new(policy, &consensus),
                validator: SpendValidator::new(config.network_params(), consensus, policy),
                formatter: config.formatter(),
                fiat: config.fiat(),
                default_account_xpub: config.default_account_xpub.clone(),
                warn_watch_only_receive: config.warn_watch_only_receive,
                unspent_cache: UnspentCache::new(),
                state: Mutex::new(FlowState {
                    send_state: SendState::Idle,
                    pending: PendingTransaction::default(),
                    amounts: None,
                    max_available: None,
                    suggested_fee,
                    verified_password: None,
                    watch_only_key: None,
                    cancel: None,
                    calculation: 0,
                    last_error: None,
                }),
                deps,
            }),
        };

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let flow = flow.clone();
            handle.spawn(async move {
                flow.refresh_suggested_fee().await;
            });
        }

        flow
    }

    /// Fetch the fee schedule and use it for later calculations
    pub async fn refresh_suggested_fee(&self) -> SuggestedFee {
        let fee = self
            .inner
            .deps
            .caches
            .fees
            .refresh(self.inner.deps.fee_api.as_ref())
            .await;
        self.inner.state.lock().suggested_fee = fee.clone();
        fee
    }

    /// Fee schedule in use
    pub fn suggested_fee(&self) -> SuggestedFee {
        self.inner.state.lock().suggested_fee.clone()
    }

    /// Current state
    pub fn state(&self) -> SendState {
        self.inner.state.lock().send_state
    }

    /// Snapshot of the pending transaction
    pub fn pending(&self) -> PendingTransaction {
        self.inner.state.lock().pending.clone()
    }

    /// Figures from the latest calculation
    pub fn amounts(&self) -> Option<TransactionAmounts> {
        self.inner.state.lock().amounts.clone()
    }

    /// Max available from the latest calculation; `None` while calculating
    pub fn max_available(&self) -> Option<i64> {
        self.inner.state.lock().max_available
    }

    /// User message of the last failure
    pub fn last_error(&self) -> Option<String> {
        self.inner.state.lock().last_error.clone()
    }

    /// Formatter for display units
    pub fn formatter(&self) -> &MonetaryFormatter {
        &self.inner.formatter
    }

    /// Accounts and addresses for the pickers, archived entries excluded.
    ///
    /// With a single sending entry its amounts are calculated right away.
    pub fn address_list(&self, include_address_book: bool) -> Vec<ItemAccount> {
        let wallet = &self.inner.deps.wallet;
        let mut result: Vec<ItemAccount> = wallet
            .accounts()
            .into_iter()
            .filter(|account| !is_archived(account))
            .collect();

        if let [only] = result.as_slice() {
            if tokio::runtime::Handle::try_current().is_ok() {
                // result is reported through the flow state
                drop(self.calculate_transaction_amounts(only.clone(), "", ""));
            }
        }

        if include_address_book {
            result.extend(wallet.address_book());
        }
        result
    }

    /// Position of the default account among non-archived HD accounts
    pub fn default_account_index(&self) -> u32 {
        let wallet = &self.inner.deps.wallet;
        match wallet.default_account_index() {
            Some(default) => corrected_account_index(&wallet.accounts(), default),
            None => 0,
        }
    }

    /// Set the funding account
    pub fn set_sending_account(&self, account: ItemAccount) {
        self.inner.state.lock().pending.sending = Some(account);
    }

    /// Set the receiving picker entry; `None` clears the destination
    pub fn set_receiving_account(&self, account: Option<ItemAccount>) -> Option<ReceiveWarning> {
        let mut warning = None;
        let address = match account.as_ref().map(|a| &a.kind) {
            Some(AccountKind::Hd(hd)) => {
                match self.inner.deps.wallet.next_receive_address(hd.index) {
                    Ok(address) => Some(address),
                    Err(e) => {
                        tracing::warn!("No receive address for account {}: {}", hd.index, e);
                        None
                    }
                }
            }
            Some(AccountKind::Legacy(legacy)) => {
                if legacy.watch_only && self.inner.warn_watch_only_receive {
                    warning = Some(ReceiveWarning::WatchOnly {
                        address: legacy.address.clone(),
                    });
                }
                Some(legacy.address.clone())
            }
            Some(AccountKind::AddressBook(entry)) => Some(entry.address.clone()),
            None => None,
        };

        let mut state = self.inner.state.lock();
        state.pending.receiving = account;
        state.pending.receiving_address = address;
        warning
    }

    /// Use a manually entered destination
    pub fn set_receiving_address(&self, address: &str) {
        let mut state = self.inner.state.lock();
        state.pending.receiving = None;
        state.pending.receiving_address = Some(address.trim().to_string());
    }

    /// Take the destination (and amount) from scanned or pasted data
    pub fn handle_scan(&self, data: &str) -> Result<ScannedPayment> {
        let scan = parse_scan(self.inner.validator.network(), data)?;
        self.set_receiving_address(&scan.address);

        let fmt = &self.inner.formatter;
        let amount_text = scan.amount.map(|satoshis| fmt.display_amount(satoshis));
        let fiat_text = scan.amount.map(|satoshis| {
            fmt.display_fiat(fmt.fiat_from_satoshis(satoshis, self.inner.fiat.exchange_rate))
        });

        Ok(ScannedPayment {
            address: scan.address,
            amount: scan.amount,
            amount_text,
            fiat_text,
            label: scan.label,
        })
    }

    /// Amount field edited.
    ///
    /// Returns `None` when the amount exceeds the total supply and the edit
    /// should be ignored.
    pub fn amount_text_changed(&self, text: &str) -> Option<AmountTextUpdate> {
        let fmt = &self.inner.formatter;
        if fmt.exceeds_max_amount(text) {
            return None;
        }
        let truncated = fmt.truncate_input(text);
        let rate = self.inner.fiat.exchange_rate;
        Some(AmountTextUpdate {
            converted_text: fmt.fiat_text_from_amount_text(&truncated, rate),
            corrected_text: corrected(truncated),
        })
    }

    /// Fiat field edited
    pub fn fiat_text_changed(&self, text: &str) -> AmountTextUpdate {
        let fmt = &self.inner.formatter;
        let truncated = fmt.truncate_fiat_input(text);
        let rate = self.inner.fiat.exchange_rate;
        AmountTextUpdate {
            converted_text: fmt.amount_text_from_fiat_text(&truncated, rate),
            corrected_text: corrected(truncated),
        }
    }

    /// Calculate amounts for sending `amount_text` from `account`.
    ///
    /// Empty or zero `custom_fee_text` uses the suggested fee. The task
    /// resolves to `None` when a newer calculation superseded it.
    pub fn calculate_transaction_amounts(
        &self,
        account: ItemAccount,
        amount_text: &str,
        custom_fee_text: &str,
    ) -> JoinHandle<Result<Option<TransactionAmounts>>> {
        let request = TransactionRequest::new(self.inner.formatter.satoshis_from_text(amount_text))
            .with_fee_policy(self.fee_policy(custom_fee_text));
        self.start_calculation(account, request)
    }

    /// Calculate amounts for sending everything from `account`
    pub fn spend_all(
        &self,
        account: ItemAccount,
        custom_fee_text: &str,
    ) -> JoinHandle<Result<Option<TransactionAmounts>>> {
        let request = TransactionRequest::spend_all(self.fee_policy(custom_fee_text));
        self.start_calculation(account, request)
    }

    fn fee_policy(&self, custom_fee_text: &str) -> FeePolicy {
        FeePolicy::from_custom_fee(self.inner.formatter.satoshis_from_text(custom_fee_text))
    }

    fn start_calculation(
        &self,
        account: ItemAccount,
        request: TransactionRequest,
    ) -> JoinHandle<Result<Option<TransactionAmounts>>> {
        let (token, calculation) = {
            let mut state = self.inner.state.lock();
            if let Some(previous) = state.cancel.take() {
                previous.cancel();
            }
            let token = CancelToken::new();
            state.cancel = Some(token.clone());
            state.calculation += 1;
            state.send_state = SendState::FetchingUnspentOutputs;
            state.max_available = None;
            state.pending.sending = Some(account.clone());
            (token, state.calculation)
        };

        let flow = self.clone();
        tokio::spawn(async move {
            flow.run_calculation(token, calculation, account, request)
                .await
        })
    }

    async fn run_calculation(
        self,
        token: CancelToken,
        calculation: u64,
        account: ItemAccount,
        request: TransactionRequest,
    ) -> Result<Option<TransactionAmounts>> {
        let fee = self.suggested_fee();
        let Some(result) = token
            .run(self.compute_amounts(&account, &request, &fee))
            .await
        else {
            tracing::debug!("Calculation {} cancelled", calculation);
            return Ok(None);
        };

        let mut state = self.inner.state.lock();
        if state.calculation != calculation {
            tracing::debug!("Discarding superseded calculation {}", calculation);
            return Ok(None);
        }
        state.cancel = None;

        match result {
            Ok(amounts) => {
                state.max_available = Some(amounts.max_available);
                state.pending.apply(&amounts);
                state.send_state = if amounts.is_insufficient() {
                    SendState::Insufficient
                } else {
                    SendState::Valid
                };
                state.last_error = None;
                state.amounts = Some(amounts.clone());
                Ok(Some(amounts))
            }
            Err(e) => {
                tracing::warn!("Amount calculation failed ({}): {}", e.category(), e);
                state.send_state = SendState::Error;
                state.last_error = Some(e.user_message());
                Err(e)
            }
        }
    }

    async fn compute_amounts(
        &self,
        account: &ItemAccount,
        request: &TransactionRequest,
        fee: &SuggestedFee,
    ) -> Result<TransactionAmounts> {
        if !account.can_send_from() {
            return Err(Error::InvalidState(format!(
                "Cannot send from {}",
                account.label
            )));
        }

        match self.unspent_response(account.source_id()).await? {
            Some(response) => {
                let coins = get_coins(&response)?;
                Ok(self.inner.calculator.calculate(&coins, request, fee))
            }
            None => Ok(TransactionAmounts::no_outputs(request.amount)),
        }
    }

    /// Unspent response for `key`, cached for the life of the flow.
    ///
    /// The default account is served from the warm cache, which is then
    /// refreshed in the background.
    async fn unspent_response(&self, key: &str) -> Result<Option<serde_json::Value>> {
        if let Some(cached) = self.inner.unspent_cache.get(key) {
            return Ok(cached);
        }

        let deps = &self.inner.deps;
        let default_cache = &deps.caches.default_account;
        let is_default = default_cache.xpub().as_deref() == Some(key)
            || self.inner.default_account_xpub.as_deref() == Some(key);

        let response = match is_default.then(|| default_cache.get(key)).flatten() {
            Some(cached) => {
                let api = Arc::clone(&deps.unspent_api);
                let cache = default_cache.clone();
                let xpub = key.to_string();
                tokio::spawn(async move {
                    if let Err(e) = cache.refresh(api.as_ref(), &xpub).await {
                        tracing::warn!("Default account refresh failed: {}", e);
                    }
                });
                cached
            }
            None => {
                let response = deps.unspent_api.unspent_outputs(key).await?;
                if is_default {
                    default_cache.set(key, response.clone());
                }
                response
            }
        };

        self.inner.unspent_cache.insert(key, response.clone());
        Ok(response)
    }

    /// Check the fee against the relay minimum and the schedule tiers
    pub fn fee_check(&self) -> Result<FeeCheck> {
        let state = self.inner.state.lock();
        Ok(self.check_fee(&state)?)
    }

    fn check_fee(&self, state: &FlowState) -> satsend_core::Result<FeeCheck> {
        let tiers = state
            .amounts
            .as_ref()
            .map(|amounts| amounts.tier_fees.clone())
            .unwrap_or_default();
        self.inner.validator.check_fee(&state.pending, &tiers)
    }

    /// Check the pending transaction can be sent
    pub fn validate(&self) -> Result<()> {
        let state = self.inner.state.lock();
        self.validate_spend(&state)
    }

    fn validate_spend(&self, state: &FlowState) -> Result<()> {
        let max_available = state.max_available.unwrap_or(0);
        Ok(self
            .inner
            .validator
            .validate_spend(&state.pending, max_available)?)
    }

    /// Run the pre-confirmation checks.
    ///
    /// A valid `address_text` replaces the receiving address first. A fee
    /// below the relay minimum is always rejected; `bypass_fee_check` only
    /// skips the tier warnings.
    pub fn send_clicked(&self, bypass_fee_check: bool, address_text: &str) -> Result<SendDecision> {
        let mut state = self.inner.state.lock();
        if state.send_state == SendState::Submitting {
            return Err(Error::InvalidState("Payment is being submitted".to_string()));
        }

        let address = address_text.trim();
        if is_valid_address(self.inner.validator.network(), address) {
            state.pending.receiving_address = Some(address.to_string());
        }

        let check = self.check_fee(&state)?;
        if !bypass_fee_check {
            if let Some(message) = check.warning(state.pending.fee, &self.inner.formatter) {
                return Ok(SendDecision::FeeWarning { check, message });
            }
        }

        self.validate_spend(&state)?;

        let legacy = state
            .pending
            .sending
            .as_ref()
            .and_then(|account| account.as_legacy())
            .cloned();

        if let Some(legacy) = &legacy {
            let scanned = state
                .watch_only_key
                .as_ref()
                .is_some_and(|(address, _)| *address == legacy.address);
            if legacy.watch_only && !legacy.has_private_key && !scanned {
                return Ok(SendDecision::WatchOnlySpend {
                    address: legacy.address.clone(),
                });
            }
        }

        let watch_only_with_key = legacy.as_ref().is_some_and(|l| l.watch_only);
        if watch_only_with_key
            || state.verified_password.is_some()
            || !self.inner.deps.wallet.is_double_encrypted()
        {
            return Ok(SendDecision::Confirm(self.confirm(&mut state)));
        }

        Ok(SendDecision::SecondPasswordRequired)
    }

    /// Verify the second password and continue to confirmation
    pub fn provide_second_password(&self, password: &str) -> Result<PaymentConfirmationDetails> {
        if !self.inner.deps.wallet.validate_second_password(password) {
            return Err(Error::InvalidPassword);
        }
        let mut state = self.inner.state.lock();
        state.verified_password = Some(SecondPassword::new(password));
        Ok(self.confirm(&mut state))
    }

    /// Use a scanned private key to spend from the watch-only sender.
    ///
    /// The key is held for this flow only. A BIP38 key without
    /// `bip38_passphrase` asks for the passphrase first.
    pub fn provide_watch_only_key(
        &self,
        scan_data: &str,
        bip38_passphrase: Option<&str>,
    ) -> Result<SendDecision> {
        let address = {
            let state = self.inner.state.lock();
            state
                .pending
                .sending
                .as_ref()
                .and_then(|account| account.as_legacy())
                .filter(|legacy| legacy.watch_only)
                .map(|legacy| legacy.address.clone())
                .ok_or_else(|| {
                    Error::InvalidState("Sender is not a watch-only address".to_string())
                })?
        };

        match self
            .inner
            .deps
            .wallet
            .key_from_scan(scan_data.trim(), bip38_passphrase)?
        {
            ScannedKey::PassphraseRequired => Ok(SendDecision::Bip38PassphraseRequired),
            ScannedKey::Decoded {
                address: key_address,
                key,
            } => {
                if key_address != address {
                    return Err(satsend_core::Error::InvalidKey(format!(
                        "Key controls {}, not {}",
                        key_address, address
                    ))
                    .into());
                }
                let mut state = self.inner.state.lock();
                state.watch_only_key = Some((address, key));
                Ok(SendDecision::Confirm(self.confirm(&mut state)))
            }
        }
    }

    fn confirm(&self, state: &mut FlowState) -> PaymentConfirmationDetails {
        let absolute_suggested_fee = state
            .amounts
            .as_ref()
            .map_or(0, |amounts| amounts.absolute_suggested_fee);
        let details = PaymentConfirmationDetails::new(
            &state.pending,
            ConfirmationContext {
                formatter: &self.inner.formatter,
                fiat: &self.inner.fiat,
                absolute_suggested_fee,
                is_surge: state.suggested_fee.is_surge,
                is_large_transaction: self
                    .inner
                    .validator
                    .is_large_transaction(&state.pending, absolute_suggested_fee),
            },
        );
        state.send_state = SendState::ConfirmationShown;
        details
    }

    /// Sign and broadcast the confirmed payment
    pub async fn submit_payment(&self) -> Result<PaymentReceipt> {
        let (pending, password, watch_only_key) = {
            let mut state = self.inner.state.lock();
            if !matches!(
                state.send_state,
                SendState::ConfirmationShown | SendState::Failure
            ) {
                return Err(Error::InvalidState(format!(
                    "Cannot submit in state {:?}",
                    state.send_state
                )));
            }
            state.send_state = SendState::Submitting;
            (
                state.pending.clone(),
                state.verified_password.clone(),
                state.watch_only_key.clone(),
            )
        };

        let result = self
            .broadcast(&pending, password.as_ref(), watch_only_key.as_ref())
            .await;

        match result {
            Ok(tx_hash) => {
                self.after_success(&pending);
                tracing::info!(
                    "Payment submitted: hash={}, amount={}, fee={}",
                    tx_hash,
                    pending.amount,
                    pending.fee
                );
                let mut state = self.inner.state.lock();
                state.send_state = SendState::Success;
                state.last_error = None;
                Ok(PaymentReceipt {
                    tx_hash,
                    amount: pending.amount,
                    fee: pending.fee,
                    submitted_at: Utc::now(),
                })
            }
            Err(e) => {
                tracing::error!("Payment submission failed: {}", e);
                let mut state = self.inner.state.lock();
                state.send_state = SendState::Failure;
                state.last_error = Some(e.user_message());
                Err(e)
            }
        }
    }

    async fn broadcast(
        &self,
        pending: &PendingTransaction,
        password: Option<&SecondPassword>,
        watch_only_key: Option<&(String, SigningKey)>,
    ) -> Result<String> {
        let request = self.payment_request(pending, password, watch_only_key)?;
        self.inner
            .deps
            .payments
            .submit(request)
            .await
            .map_err(|e| match e {
                Error::Submission(_) => e,
                other => Error::Submission(other.to_string()),
            })
    }

    fn payment_request(
        &self,
        pending: &PendingTransaction,
        password: Option<&SecondPassword>,
        watch_only_key: Option<&(String, SigningKey)>,
    ) -> Result<PaymentRequest> {
        let wallet = &self.inner.deps.wallet;
        let sending = pending
            .sending
            .as_ref()
            .ok_or_else(|| Error::InvalidState("No sending account".to_string()))?;
        let bundle = pending
            .bundle
            .clone()
            .ok_or_else(|| Error::InvalidState("No selected outputs".to_string()))?;
        let to_address = pending
            .receiving_address
            .clone()
            .ok_or_else(|| Error::InvalidState("No receiving address".to_string()))?;

        let (change_address, keys) = match &sending.kind {
            AccountKind::Hd(hd) => {
                let change = wallet.next_change_address(hd.index);
                let keys = wallet.hd_keys(hd.index, &bundle, password);
                (change, keys)
            }
            AccountKind::Legacy(legacy) => {
                let scanned = watch_only_key.filter(|(address, _)| *address == legacy.address);
                let key = match scanned {
                    Some((_, key)) => Ok(key.clone()),
                    None if legacy.watch_only && !legacy.has_private_key => {
                        return Err(satsend_core::Error::WatchOnly(legacy.address.clone()).into())
                    }
                    None => {
                        let password = if !legacy.watch_only && wallet.is_double_encrypted() {
                            password
                        } else {
                            None
                        };
                        wallet.legacy_key(&legacy.address, password)
                    }
                };
                (Ok(legacy.address.clone()), key.map(|k| vec![k]))
            }
            AccountKind::AddressBook(_) => {
                return Err(Error::InvalidState(format!(
                    "Cannot send from {}",
                    sending.label
                )))
            }
        };

        let keys: Vec<SigningKey> =
            keys.map_err(|e| Error::Submission(format!("Key resolution failed: {}", e)))?;
        let change_address = change_address
            .map_err(|e| Error::Submission(format!("No change address: {}", e)))?;

        Ok(PaymentRequest {
            bundle,
            keys,
            to_address,
            change_address,
            fee: pending.fee,
            amount: pending.amount,
        })
    }

    fn after_success(&self, pending: &PendingTransaction) {
        let deps = &self.inner.deps;
        let Some(sending) = pending.sending.as_ref() else {
            return;
        };

        deps.caches.default_account.destroy();
        self.inner.unspent_cache.remove(sending.source_id());

        let spent = pending.total();
        match &sending.kind {
            AccountKind::Hd(hd) => {
                deps.wallet.increment_change_index(hd.index);
                deps.caches.balances.debit_hd(&hd.xpub, spent);
            }
            _ => deps.caches.balances.debit_legacy(spent),
        }
    }

    /// Start over with a new payment
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        if let Some(previous) = state.cancel.take() {
            previous.cancel();
        }
        state.calculation += 1;
        state.send_state = SendState::Idle;
        state.pending.reset();
        state.amounts = None;
        state.max_available = None;
        state.verified_password = None;
        state.watch_only_key = None;
        state.last_error = None;
        self.inner.unspent_cache.clear();
    }
}

fn corrected(text: Cow<'_, str>) -> Option<String> {
    match text {
        Cow::Owned(text) => Some(text),
        Cow::Borrowed(_) => None,
    }
}

fn is_archived(account: &ItemAccount) -> bool {
    match &account.kind {
        AccountKind::Hd(hd) => hd.archived,
        AccountKind::Legacy(legacy) => legacy.archived,
        AccountKind::AddressBook(_) => false,
    }
}

/// Position of HD account `default_index` among the non-archived HD accounts
fn corrected_account_index(accounts: &[ItemAccount], default_index: u32) -> u32 {
    accounts
        .iter()
        .filter_map(|account| account.as_hd())
        .filter(|hd| !hd.archived)
        .position(|hd| hd.index == default_index)
        .map_or(0, |position| position as u32)
}
