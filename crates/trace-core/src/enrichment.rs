//! Additional info collection
//!
//! [`collect_additional_info`] walks a trace, works out which facts each
//! unannotated node needs from its capability set, fetches them with one
//! batched call per category and only then writes annotations back. The
//! number of round trips to the [`InformationSource`] does not depend on
//! the size of the trace.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::account::AccountId;
use crate::annotation::TraceAdditionalInfo;
use crate::error::{TraceError, TraceResult};
use crate::interfaces::{AccountInterfaces, ContractInterface};
use crate::models::{DedustPool, NftSaleContract, StonfiPool, StonfiPoolId, StonfiVersion};
use crate::trace::{visit, Trace};

const NFT_SALE_INTERFACES: &[ContractInterface] = &[
    ContractInterface::NftSaleV1,
    ContractInterface::NftSaleV2,
    ContractInterface::NftAuctionV1,
];

const STONFI_POOL_INTERFACES: &[ContractInterface] =
    &[ContractInterface::StonfiPool, ContractInterface::StonfiPoolV2];

/// Batched lookups used to build [`TraceAdditionalInfo`].
///
/// Every method receives the full key set of one category for a whole trace
/// and returns the facts it could resolve, keyed by account. Keys it could
/// not resolve are simply missing from the result.
#[async_trait]
pub trait InformationSource: Send + Sync {
    async fn jetton_masters_for_wallets(
        &self,
        cancel: &CancellationToken,
        wallets: &[AccountId],
    ) -> TraceResult<HashMap<AccountId, AccountId>>;

    async fn nft_sale_contracts(
        &self,
        cancel: &CancellationToken,
        contracts: &[AccountId],
    ) -> TraceResult<HashMap<AccountId, NftSaleContract>>;

    async fn stonfi_pools(
        &self,
        cancel: &CancellationToken,
        pools: &[StonfiPoolId],
    ) -> TraceResult<HashMap<AccountId, StonfiPool>>;

    async fn dedust_pools(
        &self,
        cancel: &CancellationToken,
        contracts: &[AccountId],
    ) -> TraceResult<HashMap<AccountId, DedustPool>>;
}

/// Keys collected from the unannotated nodes of a trace, deduplicated and
/// kept in visiting order.
#[derive(Debug, Default)]
struct LookupPlan {
    jetton_wallets: OrderedSet<AccountId>,
    sale_contracts: OrderedSet<AccountId>,
    stonfi_pools: OrderedSet<StonfiPoolId>,
    dedust_pools: OrderedSet<AccountId>,
}

impl LookupPlan {
    fn classify(trace: &Trace) -> Self {
        let mut plan = Self::default();
        visit(trace, &mut |node| {
            // Emulated traces come with additional info already built for every
            // account they touch, and some of those accounts do not exist on
            // chain yet, so annotated nodes are never queried again.
            if node.additional_info().is_some() {
                return;
            }
            let account = node.account();
            let ifaces = &node.account_interfaces;
            if ifaces.has_interface(ContractInterface::JettonWallet) {
                plan.jetton_wallets.push(account);
            }
            if ifaces.has_any(NFT_SALE_INTERFACES) {
                plan.sale_contracts.push(account);
            }
            if ifaces.has_interface(ContractInterface::StonfiPool) {
                plan.stonfi_pools.push(StonfiPoolId {
                    id: account,
                    version: StonfiVersion::V1,
                });
            }
            if ifaces.has_interface(ContractInterface::StonfiPoolV2) {
                plan.stonfi_pools.push(StonfiPoolId {
                    id: account,
                    version: StonfiVersion::V2,
                });
            }
            if ifaces.has_interface(ContractInterface::DedustPool) {
                plan.dedust_pools.push(account);
            }
        });
        plan
    }

    fn is_empty(&self) -> bool {
        self.jetton_wallets.is_empty()
            && self.sale_contracts.is_empty()
            && self.stonfi_pools.is_empty()
            && self.dedust_pools.is_empty()
    }
}

/// Results of every lookup a [`LookupPlan`] required.
#[derive(Debug, Default)]
struct LookupResults {
    jetton_masters: HashMap<AccountId, AccountId>,
    sale_contracts: HashMap<AccountId, NftSaleContract>,
    stonfi_pools: HashMap<AccountId, StonfiPool>,
    dedust_pools: HashMap<AccountId, DedustPool>,
}

impl LookupResults {
    fn additional_info_for(&self, account: AccountId, ifaces: &AccountInterfaces) -> TraceAdditionalInfo {
        let mut info = TraceAdditionalInfo::default();
        if ifaces.has_interface(ContractInterface::JettonWallet) {
            self.add_jetton_master(&mut info, account);
        }
        if ifaces.has_any(NFT_SALE_INTERFACES) {
            info.nft_sale_contract = self.sale_contracts.get(&account).cloned();
        }
        if ifaces.has_any(STONFI_POOL_INTERFACES) {
            if let Some(pool) = self.stonfi_pools.get(&account) {
                info.stonfi_pool = Some(*pool);
                self.add_jetton_master(&mut info, pool.token0);
                self.add_jetton_master(&mut info, pool.token1);
            }
        }
        if ifaces.has_interface(ContractInterface::DedustPool) {
            info.dedust_pool = self.dedust_pools.get(&account).copied();
        }
        info
    }

    /// A wallet the source could not resolve maps to the zero account.
    fn add_jetton_master(&self, info: &mut TraceAdditionalInfo, wallet: AccountId) {
        let master = self.jetton_masters.get(&wallet).copied().unwrap_or_default();
        info.set_jetton_master(wallet, master);
    }
}

/// Goes over the whole trace and populates the additional info of every node
/// that does not have one yet, using facts from `source`.
///
/// Nothing is written until all lookups have succeeded: on error or
/// cancellation the trace is left exactly as it was. Without a source this
/// is a no-op.
pub async fn collect_additional_info(
    cancel: &CancellationToken,
    source: Option<&dyn InformationSource>,
    trace: &Trace,
) -> TraceResult<()> {
    let Some(source) = source else {
        return Ok(());
    };

    let start = Instant::now();
    let mut plan = LookupPlan::classify(trace);
    if plan.is_empty() {
        tracing::debug!(
            hash = %trace.transaction.hash,
            "No lookups required for trace"
        );
    }

    let results = run_lookups(cancel, source, &mut plan).await?;

    let mut annotated = 0usize;
    visit(trace, &mut |node| {
        if node.additional_info().is_some() {
            return;
        }
        let info = results.additional_info_for(node.account(), &node.account_interfaces);
        node.set_additional_info(Some(Arc::new(info)));
        annotated += 1;
    });

    tracing::info!(
        hash = %trace.transaction.hash,
        annotated = annotated,
        duration_ms = %start.elapsed().as_millis(),
        "Additional info collected"
    );
    Ok(())
}

async fn run_lookups(
    cancel: &CancellationToken,
    source: &dyn InformationSource,
    plan: &mut LookupPlan,
) -> TraceResult<LookupResults> {
    let mut results = LookupResults::default();

    if !plan.stonfi_pools.is_empty() {
        let keys = plan.stonfi_pools.as_slice();
        results.stonfi_pools =
            lookup(cancel, "stonfi_pools", keys.len(), source.stonfi_pools(cancel, keys)).await?;
        // Pool tokens are jetton wallets too; resolve their masters in the
        // same batch as the wallets found in the trace.
        for pool in results.stonfi_pools.values() {
            plan.jetton_wallets.push(pool.token0);
            plan.jetton_wallets.push(pool.token1);
        }
    }

    if !plan.dedust_pools.is_empty() {
        let keys = plan.dedust_pools.as_slice();
        results.dedust_pools =
            lookup(cancel, "dedust_pools", keys.len(), source.dedust_pools(cancel, keys)).await?;
    }

    if !plan.jetton_wallets.is_empty() {
        let keys = plan.jetton_wallets.as_slice();
        results.jetton_masters = lookup(
            cancel,
            "jetton_masters_for_wallets",
            keys.len(),
            source.jetton_masters_for_wallets(cancel, keys),
        )
        .await?;
    }

    if !plan.sale_contracts.is_empty() {
        let keys = plan.sale_contracts.as_slice();
        results.sale_contracts = lookup(
            cancel,
            "nft_sale_contracts",
            keys.len(),
            source.nft_sale_contracts(cancel, keys),
        )
        .await?;
    }

    Ok(results)
}

async fn lookup<T, F>(cancel: &CancellationToken, name: &'static str, keys: usize, fut: F) -> TraceResult<T>
where
    F: Future<Output = TraceResult<T>>,
{
    let start = Instant::now();
    tracing::debug!(lookup = name, keys = keys, "Executing batched lookup");

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TraceError::Cancelled),
        result = fut => result,
    };

    match &result {
        Ok(_) => tracing::debug!(
            lookup = name,
            duration_ms = %start.elapsed().as_millis(),
            "Batched lookup completed"
        ),
        Err(e) => tracing::warn!(lookup = name, error = %e, "Batched lookup failed"),
    }
    result
}

/// Insertion-ordered set of lookup keys.
#[derive(Debug)]
struct OrderedSet<K> {
    seen: HashSet<K>,
    items: Vec<K>,
}

impl<K> Default for OrderedSet<K> {
    fn default() -> Self {
        Self {
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> OrderedSet<K> {
    fn push(&mut self, key: K) {
        if self.seen.insert(key) {
            self.items.push(key);
        }
    }

    fn as_slice(&self) -> &[K] {
        &self.items
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
