//! Value controls: the host's read/write view of a document value

use serde::{Deserialize, Serialize};

use crate::reactive::EventBus;

/// Options for controlling how control events are emitted during operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitOptions {
    /// When true, only this control is notified, not its ancestors
    #[serde(default)]
    pub only_self: bool,

    /// When false, no events are emitted at all
    #[serde(default = "default_emit_event")]
    pub emit_event: bool,
}

fn default_emit_event() -> bool {
    true
}

impl EmitOptions {
    /// Suppress every notification
    pub const fn silent() -> Self {
        Self {
            only_self: false,
            emit_event: false,
        }
    }

    /// Notify the changed control only
    pub const fn only_self() -> Self {
        Self {
            only_self: true,
            emit_event: true,
        }
    }

    /// Whether listeners on the root control hear about a change made with
    /// these options to one of its descendants
    pub fn reaches_root(&self) -> bool {
        self.emit_event && !self.only_self
    }
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            only_self: false,
            emit_event: true,
        }
    }
}

/// Notification that part of a document value changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueChange {
    /// JSON pointer of the changed value relative to the control root,
    /// e.g. `/Nodes/2/NextNode`
    pub path: String,
}

impl ValueChange {
    pub fn at(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn root() -> Self {
        Self::at("")
    }
}

/// A control over a whole document value
pub trait ValueControl {
    type Value;

    /// Materialize the current value
    fn value(&self) -> Self::Value;

    /// Replace the whole value
    fn set_value(&mut self, value: Self::Value, opts: EmitOptions);

    /// Stream of value-change notifications
    fn value_changes(&self) -> &EventBus<ValueChange>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_reach_root() {
        assert!(EmitOptions::default().reaches_root());
        assert!(!EmitOptions::silent().reaches_root());
        assert!(!EmitOptions::only_self().reaches_root());
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let opts: EmitOptions = serde_json::from_str(r#"{"onlySelf": true}"#).unwrap();
        assert!(opts.only_self);
        assert!(opts.emit_event);
    }
}
