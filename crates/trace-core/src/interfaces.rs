//! Contract interfaces an account is known to implement
//!
//! The classifier that detects interfaces lives upstream; this module only
//! models its output and answers membership queries.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// On-chain contract behaviour recognised by the upstream classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractInterface {
    Wallet,
    JettonMaster,
    JettonWallet,
    NftItem,
    NftSaleV1,
    NftSaleV2,
    NftAuctionV1,
    StonfiPool,
    StonfiPoolV2,
    StonfiPoolV2ConstProduct,
    StonfiPoolV2Stableswap,
    StonfiPoolV2WeightedStableswap,
    DedustPool,
}

impl ContractInterface {
    /// Interfaces this one inherits from, not including itself.
    fn parents(self) -> &'static [ContractInterface] {
        use ContractInterface::*;
        match self {
            StonfiPoolV2ConstProduct | StonfiPoolV2Stableswap | StonfiPoolV2WeightedStableswap => {
                &[StonfiPoolV2]
            }
            _ => &[],
        }
    }

    /// Returns true if `self` is `other` or inherits from it.
    pub fn implements(self, other: ContractInterface) -> bool {
        self == other || self.parents().iter().any(|p| p.implements(other))
    }
}

/// The capability set of an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountInterfaces(BTreeSet<ContractInterface>);

impl AccountInterfaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_interface(&self, iface: ContractInterface) -> bool {
        self.0.iter().any(|i| i.implements(iface))
    }

    pub fn has_any(&self, ifaces: &[ContractInterface]) -> bool {
        ifaces.iter().any(|i| self.has_interface(*i))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ContractInterface> for AccountInterfaces {
    fn from_iter<I: IntoIterator<Item = ContractInterface>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[ContractInterface; N]> for AccountInterfaces {
    fn from(ifaces: [ContractInterface; N]) -> Self {
        ifaces.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_interface() {
        let ifaces = AccountInterfaces::from([ContractInterface::Wallet, ContractInterface::JettonWallet]);
        assert!(ifaces.has_interface(ContractInterface::JettonWallet));
        assert!(!ifaces.has_interface(ContractInterface::DedustPool));
        assert!(!AccountInterfaces::new().has_interface(ContractInterface::Wallet));
    }

    #[test]
    fn test_inherited_interface() {
        let ifaces = AccountInterfaces::from([ContractInterface::StonfiPoolV2Stableswap]);
        assert!(ifaces.has_interface(ContractInterface::StonfiPoolV2));
        assert!(!ifaces.has_interface(ContractInterface::StonfiPool));
        assert!(ifaces.has_any(&[ContractInterface::NftSaleV1, ContractInterface::StonfiPoolV2]));
    }

    #[test]
    fn test_serde_names() {
        let ifaces = AccountInterfaces::from([ContractInterface::NftAuctionV1]);
        assert_eq!(serde_json::to_string(&ifaces).unwrap(), r#"["nft_auction_v1"]"#);
    }
}
