//! Restorable snapshots of the wider connection context.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::signature::FieldTarget;

/// Deep copy of the tracked connection state at capture time.
///
/// Restoring the saved profile id alone is not enough: provider fields may
/// have been edited in place while the profile stayed selected. The snapshot
/// carries those fields so a restore lands on the configuration that was
/// actually in effect, not just the same profile name. Immutable after
/// capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RestorableSnapshot {
    /// Active profile id at capture time, if any.
    pub profile_id: Option<String>,
    /// Top-level API mode at capture time.
    pub main_api_mode: Option<String>,
    /// Tracked chat-style provider fields.
    pub chat_fields: Map<String, Value>,
    /// Tracked text-style provider fields.
    pub text_fields: Map<String, Value>,
}

impl RestorableSnapshot {
    /// The captured field table for one target.
    pub fn fields(&self, target: FieldTarget) -> &Map<String, Value> {
        match target {
            FieldTarget::Chat => &self.chat_fields,
            FieldTarget::Text => &self.text_fields,
        }
    }
}

/// Result of applying a snapshot back onto the live configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Whether any live field was written or deleted.
    pub changed: bool,
    /// Whether every tracked target was reachable. Partial restoration is
    /// preferred over total failure, so `false` is a degraded success.
    pub complete: bool,
}
