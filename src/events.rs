use std::collections::HashMap;

use crate::dom::NodeId;

/// What a listener does when its event reaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ListenerKind {
    /// Re-reads the element and sets or clears its block marker.
    TrackValue,
    /// Arms a self-expiring bypass marker on the element.
    Bypass,
    /// Clears block markers inside the nearest matching container.
    Reset { container_selector: String },
    /// Vetoes `beforeunload` while the page is dirty.
    NavigationGuard,
    /// Appends the `safe_edits:dirty` payload to the notification log.
    RecordDirty,
    PreventDefault,
    StopPropagation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Listener {
    pub(crate) capture: bool,
    pub(crate) kind: ListenerKind,
}

impl Listener {
    pub(crate) fn bubble(kind: ListenerKind) -> Self {
        Self {
            capture: false,
            kind,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<Listener>>>,
}

impl ListenerStore {
    /// Adds `listener` unless an equal one is already registered for the same
    /// node and event, matching `addEventListener`'s duplicate rule.
    pub(crate) fn add(&mut self, node_id: NodeId, event: &str, listener: Listener) -> bool {
        let listeners = self
            .map
            .entry(node_id)
            .or_default()
            .entry(event.to_string())
            .or_default();
        if listeners.contains(&listener) {
            return false;
        }
        listeners.push(listener);
        true
    }

    pub(crate) fn remove(&mut self, node_id: NodeId, event: &str, listener: &Listener) -> bool {
        let Some(events) = self.map.get_mut(&node_id) else {
            return false;
        };
        let Some(listeners) = events.get_mut(event) else {
            return false;
        };
        let Some(pos) = listeners.iter().position(|candidate| candidate == listener) else {
            return false;
        };

        listeners.remove(pos);
        if listeners.is_empty() {
            events.remove(event);
        }
        if events.is_empty() {
            self.map.remove(&node_id);
        }
        true
    }

    pub(crate) fn get(&self, node_id: NodeId, event: &str, capture: bool) -> Vec<Listener> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|listener| listener.capture == capture)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, node_id: NodeId, event: &str) -> usize {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EventState {
    pub(crate) event_type: String,
    pub(crate) target: NodeId,
    pub(crate) current_target: NodeId,
    pub(crate) default_prevented: bool,
    pub(crate) propagation_stopped: bool,
    /// Legacy `returnValue` of a `beforeunload` event.
    pub(crate) return_value: Option<String>,
    /// Payload of a `safe_edits:dirty` event.
    pub(crate) detail: Option<bool>,
}

impl EventState {
    pub(crate) fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            default_prevented: false,
            propagation_stopped: false,
            return_value: None,
            detail: None,
        }
    }
}
