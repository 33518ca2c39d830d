//! Shared caches for fees, unspent outputs and balances
//!
//! Each cache is a cheap clonable handle over `Arc<RwLock<..>>` so the
//! application can build one instance and hand it to every send flow.

use crate::api::{FeeApi, UnspentApi};
use crate::Result;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use satsend_core::SuggestedFee;
use satsend_params::RelayPolicy;
use std::collections::HashMap;
use std::sync::Arc;

/// Last known dynamic fee schedule
#[derive(Debug, Clone)]
pub struct DynamicFeeCache {
    inner: Arc<RwLock<FeeCacheInner>>,
    fallback: SuggestedFee,
}

#[derive(Debug, Default)]
struct FeeCacheInner {
    cached: Option<SuggestedFee>,
    last_refreshed: Option<DateTime<Utc>>,
}

impl DynamicFeeCache {
    /// Create an empty cache falling back to the relay policy's default rate
    pub fn new(policy: &RelayPolicy) -> Self {
        Self {
            inner: Arc::new(RwLock::new(FeeCacheInner::default())),
            fallback: SuggestedFee::fallback(policy),
        }
    }

    /// Cached schedule, or the fallback when nothing was fetched yet
    pub fn suggested_fee(&self) -> SuggestedFee {
        self.inner
            .read()
            .cached
            .clone()
            .unwrap_or_else(|| self.fallback.clone())
    }

    /// Whether a schedule has been stored
    pub fn is_populated(&self) -> bool {
        self.inner.read().cached.is_some()
    }

    /// Store a schedule
    pub fn set(&self, fee: SuggestedFee) {
        let mut inner = self.inner.write();
        inner.cached = Some(fee);
        inner.last_refreshed = Some(Utc::now());
    }

    /// Time of the last store
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.inner.read().last_refreshed
    }

    /// Fetch a fresh schedule.
    ///
    /// On failure the cached schedule is kept, or the fallback stored when
    /// the cache is empty.
    pub async fn refresh(&self, api: &dyn FeeApi) -> SuggestedFee {
        match api.fee_schedule().await {
            Ok(fee) => {
                tracing::debug!(
                    "Fee schedule refreshed: default={} sat/kB, tiers={}",
                    fee.default_fee_per_kb,
                    fee.estimates.len()
                );
                self.set(fee.clone());
                fee
            }
            Err(e) => {
                tracing::warn!("Fee schedule refresh failed: {}", e);
                if !self.is_populated() {
                    self.set(self.fallback.clone());
                }
                self.suggested_fee()
            }
        }
    }
}

/// Unspent-output responses fetched during one send flow, keyed by address or xpub
#[derive(Debug, Clone, Default)]
pub struct UnspentCache {
    inner: Arc<RwLock<HashMap<String, Option<serde_json::Value>>>>,
}

impl UnspentCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached response; the outer `None` is a miss
    pub fn get(&self, key: &str) -> Option<Option<serde_json::Value>> {
        self.inner.read().get(key).cloned()
    }

    /// Store a response
    pub fn insert(&self, key: impl Into<String>, response: Option<serde_json::Value>) {
        self.inner.write().insert(key.into(), response);
    }

    /// Drop one entry
    pub fn remove(&self, key: &str) {
        self.inner.write().remove(key);
    }

    /// Drop everything
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Whether `key` is cached
    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }
}

/// Warm unspent-output response for the default HD account
#[derive(Debug, Clone, Default)]
pub struct DefaultAccountUnspentCache {
    inner: Arc<RwLock<Option<DefaultAccountEntry>>>,
}

#[derive(Debug, Clone)]
struct DefaultAccountEntry {
    xpub: String,
    response: Option<serde_json::Value>,
}

impl DefaultAccountUnspentCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Xpub of the cached response
    pub fn xpub(&self) -> Option<String> {
        self.inner.read().as_ref().map(|entry| entry.xpub.clone())
    }

    /// Cached response for `xpub`; the outer `None` is a miss
    pub fn get(&self, xpub: &str) -> Option<Option<serde_json::Value>> {
        self.inner
            .read()
            .as_ref()
            .filter(|entry| entry.xpub == xpub)
            .map(|entry| entry.response.clone())
    }

    /// Store the response for `xpub`
    pub fn set(&self, xpub: impl Into<String>, response: Option<serde_json::Value>) {
        *self.inner.write() = Some(DefaultAccountEntry {
            xpub: xpub.into(),
            response,
        });
    }

    /// Fetch and store the response for `xpub`
    pub async fn refresh(&self, api: &dyn UnspentApi, xpub: &str) -> Result<()> {
        let response = api.unspent_outputs(xpub).await?;
        self.set(xpub, response);
        Ok(())
    }

    /// Forget the cached response
    pub fn destroy(&self) {
        *self.inner.write() = None;
    }
}

/// Wallet balances shown outside the send flow
#[derive(Debug, Clone, Default)]
pub struct BalanceCache {
    inner: Arc<RwLock<BalanceInner>>,
}

#[derive(Debug, Default)]
struct BalanceInner {
    xpub_total: u64,
    xpub_amounts: HashMap<String, u64>,
    legacy_total: u64,
}

impl BalanceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the balance of one HD account and recompute the HD total
    pub fn set_xpub_balance(&self, xpub: impl Into<String>, balance: u64) {
        let mut inner = self.inner.write();
        inner.xpub_amounts.insert(xpub.into(), balance);
        inner.xpub_total = inner.xpub_amounts.values().sum();
    }

    /// Set the combined balance of imported addresses
    pub fn set_legacy_balance(&self, balance: u64) {
        self.inner.write().legacy_total = balance;
    }

    /// Balance of one HD account
    pub fn xpub_balance(&self, xpub: &str) -> u64 {
        self.inner
            .read()
            .xpub_amounts
            .get(xpub)
            .copied()
            .unwrap_or(0)
    }

    /// Combined balance of HD accounts
    pub fn total_xpub_balance(&self) -> u64 {
        self.inner.read().xpub_total
    }

    /// Combined balance of imported addresses
    pub fn legacy_balance(&self) -> u64 {
        self.inner.read().legacy_total
    }

    /// Subtract a sent payment from an HD account
    pub fn debit_hd(&self, xpub: &str, spent: u64) {
        let mut inner = self.inner.write();
        inner.xpub_total = inner.xpub_total.saturating_sub(spent);
        if let Some(balance) = inner.xpub_amounts.get_mut(xpub) {
            *balance = balance.saturating_sub(spent);
        }
    }

    /// Subtract a sent payment from the imported addresses
    pub fn debit_legacy(&self, spent: u64) {
        let mut inner = self.inner.write();
        inner.legacy_total = inner.legacy_total.saturating_sub(spent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use async_trait::async_trait;
    use serde_json::json;

    struct FailingFeeApi;

    #[async_trait]
    impl FeeApi for FailingFeeApi {
        async fn fee_schedule(&self) -> Result<SuggestedFee> {
            Err(Error::Network("unreachable".to_string()))
        }
    }

    struct StaticFeeApi(SuggestedFee);

    #[async_trait]
    impl FeeApi for StaticFeeApi {
        async fn fee_schedule(&self) -> Result<SuggestedFee> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_fee_cache_fallback() {
        let policy = RelayPolicy::standard();
        let cache = DynamicFeeCache::new(&policy);
        assert!(!cache.is_populated());
        assert_eq!(
            cache.suggested_fee().default_fee_per_kb,
            policy.default_fee_per_kb
        );
        assert!(cache.last_refreshed().is_none());
    }

    #[tokio::test]
    async fn test_fee_refresh_success() {
        let cache = DynamicFeeCache::new(&RelayPolicy::standard());
        let schedule = SuggestedFee::test_schedule();
        let fee = cache.refresh(&StaticFeeApi(schedule.clone())).await;
        assert_eq!(fee, schedule);
        assert_eq!(cache.suggested_fee(), schedule);
        assert!(cache.last_refreshed().is_some());
    }

    #[tokio::test]
    async fn test_fee_refresh_failure_keeps_cached() {
        let cache = DynamicFeeCache::new(&RelayPolicy::standard());
        cache.set(SuggestedFee::test_schedule());

        let fee = cache.refresh(&FailingFeeApi).await;
        assert_eq!(fee, SuggestedFee::test_schedule());
    }

    #[tokio::test]
    async fn test_fee_refresh_failure_stores_fallback() {
        let policy = RelayPolicy::standard();
        let cache = DynamicFeeCache::new(&policy);

        let fee = cache.refresh(&FailingFeeApi).await;
        assert_eq!(fee, SuggestedFee::fallback(&policy));
        assert!(cache.is_populated());
    }

    #[test]
    fn test_unspent_cache() {
        let cache = UnspentCache::new();
        assert_eq!(cache.get("xpub"), None);

        cache.insert("xpub", None);
        assert_eq!(cache.get("xpub"), Some(None));
        assert!(cache.contains("xpub"));

        cache.insert("addr", Some(json!({"unspent_outputs": []})));
        cache.remove("xpub");
        assert!(!cache.contains("xpub"));
        assert!(cache.contains("addr"));

        cache.clear();
        assert!(!cache.contains("addr"));
    }

    #[test]
    fn test_default_account_cache() {
        let cache = DefaultAccountUnspentCache::new();
        let response = json!({"unspent_outputs": []});
        cache.set("xpub0", Some(response.clone()));

        assert_eq!(cache.xpub().as_deref(), Some("xpub0"));
        assert_eq!(cache.get("xpub0"), Some(Some(response)));
        assert_eq!(cache.get("xpub1"), None);

        cache.destroy();
        assert_eq!(cache.get("xpub0"), None);
        assert!(cache.xpub().is_none());
    }

    #[test]
    fn test_balance_debits() {
        let balances = BalanceCache::new();
        balances.set_xpub_balance("xpub0", 100_000);
        balances.set_xpub_balance("xpub1", 50_000);
        balances.set_legacy_balance(30_000);
        assert_eq!(balances.total_xpub_balance(), 150_000);

        balances.debit_hd("xpub0", 40_000);
        assert_eq!(balances.xpub_balance("xpub0"), 60_000);
        assert_eq!(balances.total_xpub_balance(), 110_000);

        balances.debit_legacy(50_000);
        assert_eq!(balances.legacy_balance(), 0);
    }
}
