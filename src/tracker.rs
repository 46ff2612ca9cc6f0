use std::collections::{HashMap, HashSet};

use crate::dom::{Dom, NodeId};
use crate::guard::NavigationGuard;
use crate::timers::TimerId;
use crate::value::ControlValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MemberRecord {
    /// Captured once at registration and never rewritten.
    pub(crate) original: ControlValue,
    pub(crate) blocked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BypassMarker {
    pub(crate) expiry: Option<TimerId>,
}

/// Dirty-tracking state for one page.
///
/// Holds the member records, bypass markers, frozen membership snapshot and
/// navigation guard. Every query looks only at elements still connected to
/// the document; detached elements keep their records so re-inserting them
/// restores their state.
#[derive(Debug, Clone, Default)]
pub struct SafeEdits {
    members: HashMap<NodeId, MemberRecord>,
    bypass: HashMap<NodeId, BypassMarker>,
    frozen: Option<Vec<NodeId>>,
    pub(crate) guard: NavigationGuard,
}

impl SafeEdits {
    pub fn is_member(&self, node: NodeId) -> bool {
        self.members.contains_key(&node)
    }

    pub fn is_blocked(&self, node: NodeId) -> bool {
        self.members
            .get(&node)
            .map(|record| record.blocked)
            .unwrap_or(false)
    }

    pub fn has_bypass(&self, node: NodeId) -> bool {
        self.bypass.contains_key(&node)
    }

    pub fn original_value(&self, node: NodeId) -> Option<&ControlValue> {
        self.members.get(&node).map(|record| &record.original)
    }

    /// The frozen membership snapshot in document order, `None` when not
    /// frozen.
    pub fn is_frozen(&self) -> Option<&[NodeId]> {
        self.frozen.as_deref()
    }

    /// Records `node` as a member. The first registration's original value
    /// is kept; returns `false` if the node was already a member.
    pub(crate) fn add_member(&mut self, node: NodeId, original: ControlValue) -> bool {
        if self.members.contains_key(&node) {
            return false;
        }
        self.members.insert(
            node,
            MemberRecord {
                original,
                blocked: false,
            },
        );
        true
    }

    pub(crate) fn record(&self, node: NodeId) -> Option<&MemberRecord> {
        self.members.get(&node)
    }

    /// Returns whether the flag changed.
    pub(crate) fn set_blocked(&mut self, node: NodeId, blocked: bool) -> bool {
        match self.members.get_mut(&node) {
            Some(record) if record.blocked != blocked => {
                record.blocked = blocked;
                true
            }
            _ => false,
        }
    }

    /// Clears the block marker of every member inside `scope` (inclusive)
    /// and returns the members that were unblocked.
    pub(crate) fn clear_blocks_within(&mut self, dom: &Dom, scope: NodeId) -> Vec<NodeId> {
        let mut cleared = self
            .members
            .iter_mut()
            .filter(|(node, record)| {
                record.blocked && (**node == scope || dom.is_descendant_of(**node, scope))
            })
            .map(|(node, record)| {
                record.blocked = false;
                *node
            })
            .collect::<Vec<_>>();
        cleared.sort();
        cleared
    }

    /// Arms a bypass on `node`, returning the timer of the marker it
    /// replaces so the caller can cancel it.
    pub(crate) fn arm_bypass(&mut self, node: NodeId, expiry: Option<TimerId>) -> Option<TimerId> {
        self.bypass
            .insert(node, BypassMarker { expiry })
            .and_then(|previous| previous.expiry)
    }

    pub(crate) fn disarm_bypass(&mut self, node: NodeId) -> Option<BypassMarker> {
        self.bypass.remove(&node)
    }

    /// Removes the marker on `node` only if `timer` is the one guarding it.
    pub(crate) fn expire_bypass(&mut self, node: NodeId, timer: TimerId) -> bool {
        if self.bypass.get(&node).and_then(|marker| marker.expiry) != Some(timer) {
            return false;
        }
        self.bypass.remove(&node);
        true
    }

    /// Connected members in document order.
    pub(crate) fn live_members(&self, dom: &Dom) -> Vec<NodeId> {
        dom.all_element_nodes()
            .into_iter()
            .filter(|node| self.members.contains_key(node))
            .collect()
    }

    pub(crate) fn any_live_bypass(&self, dom: &Dom) -> bool {
        self.bypass.keys().any(|node| dom.is_connected(*node))
    }

    pub(crate) fn any_live_block(&self, dom: &Dom) -> bool {
        self.members
            .iter()
            .any(|(node, record)| record.blocked && dom.is_connected(*node))
    }

    /// Whether the live member set differs from the frozen snapshot. Order
    /// is irrelevant; only membership counts.
    pub(crate) fn frozen_mismatch(&self, dom: &Dom) -> bool {
        let Some(frozen) = &self.frozen else {
            return false;
        };
        let frozen = frozen.iter().copied().collect::<HashSet<_>>();
        let live = self.live_members(dom).into_iter().collect::<HashSet<_>>();
        frozen != live
    }

    /// Bypass beats everything; then any block marker; then a structural
    /// change against the frozen snapshot.
    pub(crate) fn is_dirty(&self, dom: &Dom) -> bool {
        if self.any_live_bypass(dom) {
            return false;
        }
        if self.any_live_block(dom) {
            return true;
        }
        self.frozen_mismatch(dom)
    }

    pub(crate) fn freeze(&mut self, dom: &Dom, on: bool) {
        self.frozen = on.then(|| self.live_members(dom));
    }
}
