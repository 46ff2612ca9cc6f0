use std::fmt;

use crate::ATTR_VALUE;
use crate::dom::{Dom, NodeId};

/// The comparable value of a tracked element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlValue {
    /// Taken from `data-safe-edits-value`.
    Override(String),
    /// Checked state of a checkbox or radio input.
    Checked(bool),
    /// The control's current value.
    Text(String),
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override(value) | Self::Text(value) => write!(f, "{value:?}"),
            Self::Checked(checked) => write!(f, "{checked}"),
        }
    }
}

pub(crate) fn read_value(dom: &Dom, node: NodeId) -> ControlValue {
    if let Some(value) = dom.attr(node, ATTR_VALUE) {
        return ControlValue::Override(value);
    }
    if dom.is_checkbox_input(node) || dom.is_radio_input(node) {
        return ControlValue::Checked(dom.checked(node));
    }
    ControlValue::Text(dom.value(node))
}
