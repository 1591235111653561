use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tokio_util::sync::CancellationToken;
use trace_core::{
    AccountId, DedustPool, InformationSource, NftSaleContract, StonfiPool, StonfiPoolId,
    TraceResult,
};

use crate::config::CacheConfig;

/// Information source wrapper that remembers every answer, including
/// "not found", so repeated traces touching the same accounts skip the
/// inner source.
pub struct CachedSource<S> {
    inner: S,
    jetton_masters: Cache<AccountId, Option<AccountId>>,
    nft_sales: Cache<AccountId, Option<NftSaleContract>>,
    stonfi_pools: Cache<StonfiPoolId, Option<StonfiPool>>,
    dedust_pools: Cache<AccountId, Option<DedustPool>>,
}

fn build_cache<K, V>(config: &CacheConfig) -> Cache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    Cache::builder()
        .max_capacity(config.max_capacity)
        .time_to_live(Duration::from_secs(config.ttl_seconds))
        .build()
}

impl<S: InformationSource> CachedSource<S> {
    pub fn new(inner: S, config: &CacheConfig) -> Self {
        Self {
            inner,
            jetton_masters: build_cache(config),
            nft_sales: build_cache(config),
            stonfi_pools: build_cache(config),
            dedust_pools: build_cache(config),
        }
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.jetton_masters.entry_count()
                + self.nft_sales.entry_count()
                + self.stonfi_pools.entry_count()
                + self.dedust_pools.entry_count(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entry_count: u64,
}

/// Serves `keys` from `cache` and asks `fetch` only for the misses.
async fn cached_lookup<K, V, F, Fut>(
    cache: &Cache<K, Option<V>>,
    keys: &[K],
    account: fn(&K) -> AccountId,
    fetch: F,
) -> TraceResult<HashMap<AccountId, V>>
where
    K: Hash + Eq + Copy + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    F: FnOnce(Vec<K>) -> Fut,
    Fut: Future<Output = TraceResult<HashMap<AccountId, V>>>,
{
    let mut found = HashMap::new();
    let mut misses = Vec::new();
    for key in keys {
        match cache.get(key).await {
            Some(Some(value)) => {
                found.insert(account(key), value);
            }
            Some(None) => {}
            None => misses.push(*key),
        }
    }

    tracing::debug!(
        keys = keys.len(),
        misses = misses.len(),
        "Lookup cache consulted"
    );
    if misses.is_empty() {
        return Ok(found);
    }

    let fetched = fetch(misses.clone()).await?;
    for key in misses {
        let value = fetched.get(&account(&key)).cloned();
        cache.insert(key, value.clone()).await;
        if let Some(value) = value {
            found.insert(account(&key), value);
        }
    }
    Ok(found)
}

fn by_account(key: &AccountId) -> AccountId {
    *key
}

fn by_pool_id(key: &StonfiPoolId) -> AccountId {
    key.id
}

#[async_trait]
impl<S: InformationSource> InformationSource for CachedSource<S> {
    async fn jetton_masters_for_wallets(
        &self,
        cancel: &CancellationToken,
        wallets: &[AccountId],
    ) -> TraceResult<HashMap<AccountId, AccountId>> {
        cached_lookup(&self.jetton_masters, wallets, by_account, move |misses| async move {
            self.inner.jetton_masters_for_wallets(cancel, &misses).await
        })
        .await
    }

    async fn nft_sale_contracts(
        &self,
        cancel: &CancellationToken,
        contracts: &[AccountId],
    ) -> TraceResult<HashMap<AccountId, NftSaleContract>> {
        cached_lookup(&self.nft_sales, contracts, by_account, move |misses| async move {
            self.inner.nft_sale_contracts(cancel, &misses).await
        })
        .await
    }

    async fn stonfi_pools(
        &self,
        cancel: &CancellationToken,
        pools: &[StonfiPoolId],
    ) -> TraceResult<HashMap<AccountId, StonfiPool>> {
        cached_lookup(&self.stonfi_pools, pools, by_pool_id, move |misses| async move {
            self.inner.stonfi_pools(cancel, &misses).await
        })
        .await
    }

    async fn dedust_pools(
        &self,
        cancel: &CancellationToken,
        contracts: &[AccountId],
    ) -> TraceResult<HashMap<AccountId, DedustPool>> {
        cached_lookup(&self.dedust_pools, contracts, by_account, move |misses| async move {
            self.inner.dedust_pools(cancel, &misses).await
        })
        .await
    }
}

/// Shared source handed to every request
pub type SharedSource = Arc<dyn InformationSource>;
