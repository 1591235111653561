//! Data models shared by traces and annotations
//!
//! Transactions are reduced to what trace analysis needs. The remaining
//! types hold facts fetched from an information source about a single
//! account: sale contracts, DEX pools and emulated NFTs.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::{AccountId, Bits256};
use crate::trace::{distinct_accounts, Trace};

// =============================================================================
// Transactions
// =============================================================================

/// An outbound message of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Set while the message has not been expanded into a child transaction.
    #[serde(default)]
    pub destination: Option<AccountId>,
    #[serde(default)]
    pub created_lt: u64,
    #[serde(default)]
    pub op_code: Option<u32>,
}

/// A transaction reduced to the fields trace analysis needs.
///
/// `out_msgs` keeps external outbound messages and messages whose
/// destination transaction is not part of the trace yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: Bits256,
    pub lt: u64,
    pub account: AccountId,
    #[serde(default)]
    pub utime: i64,
    #[serde(default)]
    pub success: bool,
    /// Produced by local emulation rather than observed on-chain.
    #[serde(default)]
    pub emulated: bool,
    #[serde(default)]
    pub out_msgs: Vec<Message>,
}

// =============================================================================
// Trace identity
// =============================================================================

/// Identifies a trace by the hash and logical time of its root transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId {
    pub hash: Bits256,
    pub lt: u64,
    pub utime: i64,
    pub length: usize,
    pub unique_accounts_count: usize,
}

impl TraceId {
    pub fn from_trace(trace: &Trace) -> Self {
        Self {
            hash: trace.transaction.hash,
            lt: trace.transaction.lt,
            utime: trace.transaction.utime,
            length: trace.node_count(),
            unique_accounts_count: distinct_accounts(trace).len(),
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.utime, 0).single()
    }
}

// =============================================================================
// Account facts
// =============================================================================

/// Partial results of a sale contract's `get_sale_data` method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NftSaleContract {
    pub nft_price: i64,
    /// Owner of the NFT according to the sale contract.
    #[serde(default)]
    pub owner: Option<AccountId>,
    pub item: AccountId,
}

/// Partial results of a STON.fi pool's `get_pool_data` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StonfiPool {
    pub token0: AccountId,
    pub token1: AccountId,
}

/// STON.fi pool layout; v1 and v2 pools share a capability signature but
/// not their getters, so the version travels with the lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StonfiVersion {
    V1,
    V2,
}

/// Lookup key for a STON.fi pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StonfiPoolId {
    pub id: AccountId,
    pub version: StonfiVersion,
}

/// An asset held by a DeDust pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Type", content = "Value")]
pub enum Currency {
    #[serde(rename = "native")]
    Ton,
    /// Identified by the jetton master.
    #[serde(rename = "jetton")]
    Jetton(AccountId),
    #[serde(rename = "extra_currency")]
    Extra(i32),
}

/// Results of a DeDust pool's `get_assets` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DedustPool {
    pub asset0: Currency,
    pub asset1: Currency,
}

/// A Telegram item NFT minted during emulation; it cannot be fetched from
/// the chain afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmulatedTeleitemNft {
    pub index: Decimal,
    #[serde(default)]
    pub collection_address: Option<AccountId>,
    pub verified: bool,
}
