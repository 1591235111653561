//! Per-account annotations attached to trace nodes
//!
//! A [`TraceAdditionalInfo`] holds facts about a node's account that are not
//! part of the transaction itself and must be fetched from an information
//! source. Once attached to a node it is considered complete for that node.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::models::{DedustPool, EmulatedTeleitemNft, NftSaleContract, StonfiPool};

/// Information about a trace node that is not extracted from its transaction.
///
/// Encoded with the field names `JettonMasters`, `NftSaleContract`,
/// `STONfiPool`, `EmulatedTeleitemNFT` and `DedustPool`. Absent facts are
/// omitted, and so is an empty jetton master mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceAdditionalInfo {
    /// Maps jetton wallets to their masters.
    #[serde(
        rename = "JettonMasters",
        default,
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub jetton_masters: HashMap<AccountId, AccountId>,

    /// Set if the account implements one of the NFT sale interfaces.
    #[serde(
        rename = "NftSaleContract",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub nft_sale_contract: Option<NftSaleContract>,

    /// Set if the account is a STON.fi pool of either version.
    #[serde(rename = "STONfiPool", default, skip_serializing_if = "Option::is_none")]
    pub stonfi_pool: Option<StonfiPool>,

    /// Only ever set for emulated traces.
    #[serde(
        rename = "EmulatedTeleitemNFT",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub emulated_teleitem_nft: Option<EmulatedTeleitemNft>,

    /// Set if the account is a DeDust pool.
    #[serde(rename = "DedustPool", default, skip_serializing_if = "Option::is_none")]
    pub dedust_pool: Option<DedustPool>,
}

impl TraceAdditionalInfo {
    pub fn jetton_master(&self, jetton_wallet: &AccountId) -> Option<AccountId> {
        self.jetton_masters.get(jetton_wallet).copied()
    }

    pub fn set_jetton_master(&mut self, jetton_wallet: AccountId, jetton_master: AccountId) {
        self.jetton_masters.insert(jetton_wallet, jetton_master);
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Currency, StonfiPool};
    use rust_decimal_macros::dec;

    fn account(byte: u8) -> AccountId {
        AccountId::new(0, [byte; 32])
    }

    #[test]
    fn test_empty_info_encodes_as_empty_object() {
        let info = TraceAdditionalInfo::default();
        let encoded = serde_json::to_string(&info).unwrap();
        assert_eq!(encoded, "{}");

        let decoded: TraceAdditionalInfo = serde_json::from_str(&encoded).unwrap();
        assert!(decoded.jetton_masters.is_empty());
        assert!(decoded.nft_sale_contract.is_none());
        assert!(decoded.stonfi_pool.is_none());
        assert!(decoded.emulated_teleitem_nft.is_none());
        assert!(decoded.dedust_pool.is_none());
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_jetton_masters_encode_as_raw_strings() {
        let mut info = TraceAdditionalInfo::default();
        info.set_jetton_master(account(1), account(2));

        let value = serde_json::to_value(&info).unwrap();
        let masters = value["JettonMasters"].as_object().unwrap();
        assert_eq!(masters.len(), 1);
        assert_eq!(masters[&account(1).to_string()], account(2).to_string());
        assert!(value.get("NftSaleContract").is_none());
    }

    #[test]
    fn test_full_info_survives_encoding() {
        let mut info = TraceAdditionalInfo {
            nft_sale_contract: Some(NftSaleContract {
                nft_price: 1_000_000_000,
                owner: Some(account(3)),
                item: account(4),
            }),
            stonfi_pool: Some(StonfiPool {
                token0: account(5),
                token1: account(6),
            }),
            emulated_teleitem_nft: Some(EmulatedTeleitemNft {
                index: dec!(123456789012345678901234567),
                collection_address: None,
                verified: true,
            }),
            dedust_pool: Some(DedustPool {
                asset0: Currency::Ton,
                asset1: Currency::Jetton(account(7)),
            }),
            ..Default::default()
        };
        info.set_jetton_master(account(5), account(8));
        info.set_jetton_master(account(6), account(9));

        let encoded = serde_json::to_string(&info).unwrap();
        assert!(encoded.contains("\"STONfiPool\""));
        assert!(encoded.contains("\"EmulatedTeleitemNFT\""));

        let decoded: TraceAdditionalInfo = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, info);
        assert_eq!(decoded.jetton_master(&account(6)), Some(account(9)));
        assert_eq!(decoded.jetton_master(&account(1)), None);
    }

    #[test]
    fn test_malformed_account_is_a_decode_error() {
        let input = r#"{"JettonMasters":{"not-an-account":"0:00"}}"#;
        let err = serde_json::from_str::<TraceAdditionalInfo>(input).unwrap_err();
        assert!(err.to_string().contains("not-an-account"));

        let input = format!(r#"{{"STONfiPool":{{"Token0":"{}","Token1":"-1:xyz"}}}}"#, account(1));
        assert!(serde_json::from_str::<TraceAdditionalInfo>(&input).is_err());
    }
}
