//! Transplanting data between two versions of the same trace
//!
//! Re-emulating a trace produces a new tree that may resolve more hops than
//! the cached one. [`copy_trace_data`] moves everything already known about
//! matching transactions onto the new tree so it does not have to be
//! collected again.

use std::collections::HashMap;
use std::sync::Arc;

use crate::account::Bits256;
use crate::annotation::TraceAdditionalInfo;
use crate::interfaces::AccountInterfaces;
use crate::models::Transaction;
use crate::trace::{visit, visit_mut, Trace};

/// Data of one `from` node, looked up by transaction hash.
struct NodeData<'a> {
    transaction: &'a Transaction,
    interfaces: Option<&'a AccountInterfaces>,
    additional_info: Option<Arc<TraceAdditionalInfo>>,
}

/// Copies the transaction, account interfaces and additional info of every
/// node of `from` onto the node of `to` with the same transaction hash.
///
/// Interfaces and additional info are copied only when the `from` node has
/// them. Nodes with a zero hash are placeholders and are skipped on both
/// sides. The shape of `to` is never changed.
pub fn copy_trace_data(from: &Trace, to: &mut Trace) {
    let mut by_hash: HashMap<Bits256, NodeData<'_>> = HashMap::new();
    visit(from, &mut |node| {
        if node.transaction.hash.is_zero() {
            return;
        }
        let interfaces = (!node.account_interfaces.is_empty()).then_some(&node.account_interfaces);
        by_hash.insert(
            node.transaction.hash,
            NodeData {
                transaction: &node.transaction,
                interfaces,
                additional_info: node.additional_info(),
            },
        );
    });

    let mut copied = 0usize;
    visit_mut(to, &mut |node| {
        if node.transaction.hash.is_zero() {
            return;
        }
        let Some(data) = by_hash.get(&node.transaction.hash) else {
            return;
        };
        if let Some(info) = &data.additional_info {
            node.set_additional_info(Some(Arc::clone(info)));
        }
        if let Some(interfaces) = data.interfaces {
            node.account_interfaces = interfaces.clone();
        }
        node.transaction = data.transaction.clone();
        copied += 1;
    });

    tracing::debug!(
        hash = %to.transaction.hash,
        source_nodes = by_hash.len(),
        copied = copied,
        "Copied trace data"
    );
}
