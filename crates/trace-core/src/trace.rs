//! Trace trees and read-only traversals
//!
//! A [`Trace`] is one transaction together with every transaction its
//! outbound messages caused. Each node owns its children; there are no
//! back-pointers and no shared subtrees.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::account::AccountId;
use crate::annotation::TraceAdditionalInfo;
use crate::interfaces::AccountInterfaces;
use crate::models::Transaction;

/// Lazily populated annotation of a trace node.
///
/// Traces are cached and handed to several callers at once, and any of them
/// may try to collect additional info for the same node. Readers never block
/// each other; a write excludes everyone for its duration. There is no
/// compare-and-swap: concurrent writers derive the same value from the same
/// facts, so whichever write lands last is as good as any other.
#[derive(Debug, Default)]
pub struct AnnotationSlot(RwLock<Option<Arc<TraceAdditionalInfo>>>);

impl AnnotationSlot {
    pub fn new(info: Option<TraceAdditionalInfo>) -> Self {
        Self(RwLock::new(info.map(Arc::new)))
    }

    pub fn get(&self) -> Option<Arc<TraceAdditionalInfo>> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, info: Option<Arc<TraceAdditionalInfo>>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = info;
    }

    pub fn is_unset(&self) -> bool {
        self.get().is_none()
    }
}

impl Clone for AnnotationSlot {
    fn clone(&self) -> Self {
        Self(RwLock::new(self.get()))
    }
}

impl Serialize for AnnotationSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.get().as_deref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AnnotationSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<TraceAdditionalInfo>::deserialize(deserializer).map(Self::new)
    }
}

/// A node of a trace tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    /// Only external outbound messages and unexpanded hops are kept in
    /// `out_msgs`.
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(default)]
    pub account_interfaces: AccountInterfaces,
    #[serde(default)]
    pub children: Vec<Trace>,
    #[serde(default, skip_serializing_if = "AnnotationSlot::is_unset")]
    additional_info: AnnotationSlot,
}

impl Trace {
    pub fn new(
        transaction: Transaction,
        account_interfaces: AccountInterfaces,
        children: Vec<Trace>,
    ) -> Self {
        Self {
            transaction,
            account_interfaces,
            children,
            additional_info: AnnotationSlot::default(),
        }
    }

    pub fn with_additional_info(mut self, info: TraceAdditionalInfo) -> Self {
        self.additional_info = AnnotationSlot::new(Some(info));
        self
    }

    pub fn account(&self) -> AccountId {
        self.transaction.account
    }

    pub fn additional_info(&self) -> Option<Arc<TraceAdditionalInfo>> {
        self.additional_info.get()
    }

    pub fn set_additional_info(&self, info: Option<Arc<TraceAdditionalInfo>>) {
        self.additional_info.set(info);
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        visit(self, &mut |_| count += 1);
        count
    }

    /// Returns true while some outbound message has not been expanded into
    /// a child transaction.
    pub fn in_progress(&self) -> bool {
        self.count_uncompleted() != 0
    }

    fn count_uncompleted(&self) -> usize {
        let mut count = 0;
        visit(self, &mut |node| count += pending_messages(node));
        count
    }

    pub fn calculate_progress(&self) -> f32 {
        calculate_progress(Some(self))
    }
}

fn pending_messages(trace: &Trace) -> usize {
    trace
        .transaction
        .out_msgs
        .iter()
        .filter(|m| m.destination.is_some())
        .count()
}

/// Calls `f` on `trace` and then on every descendant, depth first, children
/// in order.
pub fn visit<'a, F>(trace: &'a Trace, f: &mut F)
where
    F: FnMut(&'a Trace),
{
    f(trace);
    for child in &trace.children {
        visit(child, f);
    }
}

/// Same walk as [`visit`], with mutable access to every node.
pub fn visit_mut<F>(trace: &mut Trace, f: &mut F)
where
    F: FnMut(&mut Trace),
{
    f(trace);
    for child in trace.children.iter_mut() {
        visit_mut(child, f);
    }
}

/// Returns the accounts involved in the trace, in no particular order.
pub fn distinct_accounts(trace: &Trace) -> Vec<AccountId> {
    let mut accounts = HashSet::new();
    visit(trace, &mut |node| {
        accounts.insert(node.account());
    });
    accounts.into_iter().collect()
}

/// Estimates how much of a trace has been resolved.
///
/// Every node counts once towards the total and, unless emulated, once
/// towards the finished count. A leaf also adds one expected node per
/// outbound message still waiting for its destination transaction.
pub fn calculate_progress(trace: Option<&Trace>) -> f32 {
    let Some(trace) = trace else {
        return 0.0;
    };

    let mut finished = 0usize;
    let mut all = 0usize;
    visit(trace, &mut |node| {
        all += 1;
        if !node.transaction.emulated {
            finished += 1;
        }
        if node.children.is_empty() {
            all += pending_messages(node);
        }
    });

    if all == 0 {
        return 0.0;
    }
    finished as f32 / all as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Bits256;
    use crate::models::Message;

    fn account(byte: u8) -> AccountId {
        AccountId::new(0, [byte; 32])
    }

    fn node(hash: u8, account_byte: u8, children: Vec<Trace>) -> Trace {
        Trace::new(
            Transaction {
                hash: Bits256([hash; 32]),
                account: account(account_byte),
                ..Default::default()
            },
            AccountInterfaces::new(),
            children,
        )
    }

    fn pending(destination: u8) -> Message {
        Message {
            destination: Some(account(destination)),
            ..Default::default()
        }
    }

    #[test]
    fn test_visit_is_preorder() {
        let trace = node(1, 1, vec![node(2, 2, vec![node(3, 3, vec![])]), node(4, 4, vec![])]);
        let mut order = Vec::new();
        visit(&trace, &mut |t| order.push(t.transaction.hash.0[0]));
        assert_eq!(order, vec![1, 2, 3, 4]);
        assert_eq!(trace.node_count(), 4);
    }

    #[test]
    fn test_distinct_accounts() {
        let single = node(1, 9, vec![]);
        assert_eq!(distinct_accounts(&single), vec![account(9)]);

        let trace = node(1, 1, vec![node(2, 2, vec![node(3, 1, vec![])]), node(4, 2, vec![])]);
        let mut accounts = distinct_accounts(&trace);
        accounts.sort();
        assert_eq!(accounts, vec![account(1), account(2)]);
    }

    #[test]
    fn test_in_progress() {
        let mut trace = node(1, 1, vec![node(2, 2, vec![])]);
        assert!(!trace.in_progress());

        trace.children[0].transaction.out_msgs.push(Message::default());
        assert!(!trace.in_progress());

        trace.children[0].transaction.out_msgs.push(pending(3));
        assert!(trace.in_progress());
        assert_eq!(trace.count_uncompleted(), 1);
    }

    #[test]
    fn test_calculate_progress() {
        assert_eq!(calculate_progress(None), 0.0);

        let confirmed = node(1, 1, vec![]);
        assert_eq!(confirmed.calculate_progress(), 1.0);

        let mut emulated = node(1, 1, vec![]);
        emulated.transaction.emulated = true;
        emulated.transaction.out_msgs.push(pending(2));
        assert_eq!(emulated.calculate_progress(), 0.0);
    }

    #[test]
    fn test_calculate_progress_counts_pending_leaf_messages_only() {
        let mut child = node(2, 2, vec![]);
        child.transaction.emulated = true;
        child.transaction.out_msgs.push(pending(3));

        let mut root = node(1, 1, vec![child]);
        // Pending messages of a node with children are not counted.
        root.transaction.out_msgs.push(pending(4));

        // finished: root; all: root, child, child's pending hop
        assert!((root.calculate_progress() - 1.0 / 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_annotation_slot() {
        let trace = node(1, 1, vec![]);
        assert!(trace.additional_info().is_none());

        let mut info = TraceAdditionalInfo::default();
        info.set_jetton_master(account(1), account(2));
        trace.set_additional_info(Some(Arc::new(info.clone())));
        assert_eq!(trace.additional_info().as_deref(), Some(&info));

        trace.set_additional_info(None);
        assert!(trace.additional_info().is_none());
    }

    #[test]
    fn test_annotation_slot_shared_between_threads() {
        let trace = Arc::new(node(1, 1, vec![]));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let trace = Arc::clone(&trace);
                std::thread::spawn(move || {
                    if trace.additional_info().is_none() {
                        let mut info = TraceAdditionalInfo::default();
                        info.set_jetton_master(account(1), account(2));
                        trace.set_additional_info(Some(Arc::new(info)));
                    }
                    trace.additional_info().is_some()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(
            trace.additional_info().unwrap().jetton_master(&account(1)),
            Some(account(2))
        );
    }

    #[test]
    fn test_trace_serde_keeps_additional_info() {
        let mut info = TraceAdditionalInfo::default();
        info.set_jetton_master(account(1), account(2));
        let trace = node(1, 1, vec![node(2, 2, vec![]).with_additional_info(info.clone())]);

        let encoded = serde_json::to_string(&trace).unwrap();
        let decoded: Trace = serde_json::from_str(&encoded).unwrap();
        assert!(decoded.additional_info().is_none());
        assert_eq!(decoded.children[0].additional_info().as_deref(), Some(&info));
        assert_eq!(decoded.children[0].transaction, trace.children[0].transaction);
    }
}
