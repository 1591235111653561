//! Information source backed by a JSON snapshot of account facts

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use trace_core::{
    AccountId, DedustPool, InformationSource, NftSaleContract, StonfiPool, StonfiPoolId,
    StonfiVersion, TraceResult,
};

use crate::error::{InspectError, Result};

#[derive(Debug, Deserialize)]
struct StonfiEntry {
    version: StonfiVersion,
    #[serde(flatten)]
    pool: StonfiPool,
}

/// On-disk layout of a snapshot.
#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    jetton_masters: HashMap<AccountId, AccountId>,
    #[serde(default)]
    nft_sales: HashMap<AccountId, NftSaleContract>,
    #[serde(default)]
    stonfi_pools: HashMap<AccountId, StonfiEntry>,
    #[serde(default)]
    dedust_pools: HashMap<AccountId, DedustPool>,
}

/// Answers lookups from facts captured ahead of time.
#[derive(Debug, Default)]
pub struct SnapshotSource {
    snapshot: Snapshot,
}

impl SnapshotSource {
    pub fn from_json(data: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(data)
            .map_err(|e| InspectError::Source(format!("invalid snapshot: {}", e)))?;
        Ok(Self { snapshot })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let source = Self::from_json(&data)?;
        tracing::info!(
            path = %path.display(),
            jetton_masters = source.snapshot.jetton_masters.len(),
            nft_sales = source.snapshot.nft_sales.len(),
            stonfi_pools = source.snapshot.stonfi_pools.len(),
            dedust_pools = source.snapshot.dedust_pools.len(),
            "Snapshot loaded"
        );
        Ok(source)
    }
}

fn pick<V: Clone>(facts: &HashMap<AccountId, V>, keys: &[AccountId]) -> HashMap<AccountId, V> {
    keys.iter()
        .filter_map(|k| facts.get(k).map(|v| (*k, v.clone())))
        .collect()
}

#[async_trait]
impl InformationSource for SnapshotSource {
    async fn jetton_masters_for_wallets(
        &self,
        _cancel: &CancellationToken,
        wallets: &[AccountId],
    ) -> TraceResult<HashMap<AccountId, AccountId>> {
        Ok(pick(&self.snapshot.jetton_masters, wallets))
    }

    async fn nft_sale_contracts(
        &self,
        _cancel: &CancellationToken,
        contracts: &[AccountId],
    ) -> TraceResult<HashMap<AccountId, NftSaleContract>> {
        Ok(pick(&self.snapshot.nft_sales, contracts))
    }

    async fn stonfi_pools(
        &self,
        _cancel: &CancellationToken,
        pools: &[StonfiPoolId],
    ) -> TraceResult<HashMap<AccountId, StonfiPool>> {
        // A pool is only resolved through the getter of its own version.
        Ok(pools
            .iter()
            .filter_map(|key| {
                self.snapshot
                    .stonfi_pools
                    .get(&key.id)
                    .filter(|entry| entry.version == key.version)
                    .map(|entry| (key.id, entry.pool))
            })
            .collect())
    }

    async fn dedust_pools(
        &self,
        _cancel: &CancellationToken,
        contracts: &[AccountId],
    ) -> TraceResult<HashMap<AccountId, DedustPool>> {
        Ok(pick(&self.snapshot.dedust_pools, contracts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(byte: u8) -> AccountId {
        AccountId::new(0, [byte; 32])
    }

    fn snapshot_json() -> String {
        serde_json::json!({
            "jetton_masters": { account(1).to_string(): account(2).to_string() },
            "stonfi_pools": {
                account(3).to_string(): {
                    "version": "v2",
                    "Token0": account(4).to_string(),
                    "Token1": account(5).to_string(),
                }
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_resolves_known_wallets() {
        let source = SnapshotSource::from_json(&snapshot_json()).unwrap();
        let masters = source
            .jetton_masters_for_wallets(&CancellationToken::new(), &[account(1), account(9)])
            .await
            .unwrap();
        assert_eq!(masters.len(), 1);
        assert_eq!(masters[&account(1)], account(2));
    }

    #[tokio::test]
    async fn test_stonfi_version_must_match() {
        let source = SnapshotSource::from_json(&snapshot_json()).unwrap();
        let cancel = CancellationToken::new();

        let v1 = StonfiPoolId { id: account(3), version: StonfiVersion::V1 };
        assert!(source.stonfi_pools(&cancel, &[v1]).await.unwrap().is_empty());

        let v2 = StonfiPoolId { id: account(3), version: StonfiVersion::V2 };
        let pools = source.stonfi_pools(&cancel, &[v2]).await.unwrap();
        assert_eq!(pools[&account(3)].token1, account(5));
    }

    #[test]
    fn test_rejects_malformed_accounts() {
        let err = SnapshotSource::from_json(r#"{"jetton_masters":{"0:zz":"0:00"}}"#).unwrap_err();
        assert!(matches!(err, InspectError::Source(_)));
    }
}
