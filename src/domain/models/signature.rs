//! Connection signatures: structural fingerprints of the active configuration.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which live provider field table a tracked field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldTarget {
    /// Chat-completion style provider settings.
    Chat,
    /// Text-completion style provider settings.
    Text,
}

impl FieldTarget {
    /// Both field tables, in capture order.
    pub const ALL: [Self; 2] = [Self::Chat, Self::Text];

    /// Stable name used as a signature key prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Text => "text",
        }
    }
}

/// Chat-style fields always tracked, independent of the dynamic predicate.
pub const BASE_CHAT_FIELDS: &[&str] = &["chat_completion_source", "reverse_proxy"];
/// Text-style fields always tracked, independent of the dynamic predicate.
pub const BASE_TEXT_FIELDS: &[&str] = &["api_type", "api_server"];

/// Predicate deciding whether a provider field name is tracked.
pub type FieldPredicate = dyn Fn(&str) -> bool + Send + Sync;

/// Default dynamic matching rule for provider field names.
///
/// Providers add model/source/preset/url fields over time; a static
/// allow-list would silently stop tracking them. The suffix/prefix match
/// keeps new providers covered without code changes.
pub fn default_field_predicate(name: &str) -> bool {
    name.ends_with("model")
        || name.ends_with("source")
        || name.ends_with("preset")
        || name.ends_with("url")
        || name.starts_with("api_server_")
}

/// The bounded-plus-dynamic set of provider fields the engine tracks.
pub struct TrackedFields {
    chat_base: Vec<String>,
    text_base: Vec<String>,
    predicate: Box<FieldPredicate>,
}

impl Default for TrackedFields {
    fn default() -> Self {
        Self::new(
            BASE_CHAT_FIELDS.iter().map(ToString::to_string),
            BASE_TEXT_FIELDS.iter().map(ToString::to_string),
            Box::new(default_field_predicate),
        )
    }
}

impl fmt::Debug for TrackedFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedFields")
            .field("chat_base", &self.chat_base)
            .field("text_base", &self.text_base)
            .finish_non_exhaustive()
    }
}

impl TrackedFields {
    /// Creates a tracked-field set from base lists and a dynamic predicate.
    pub fn new(
        chat_base: impl IntoIterator<Item = String>,
        text_base: impl IntoIterator<Item = String>,
        predicate: Box<FieldPredicate>,
    ) -> Self {
        Self {
            chat_base: chat_base.into_iter().collect(),
            text_base: text_base.into_iter().collect(),
            predicate,
        }
    }

    /// Replaces only the dynamic predicate, keeping the default base lists.
    pub fn with_predicate(predicate: Box<FieldPredicate>) -> Self {
        Self::new(
            BASE_CHAT_FIELDS.iter().map(ToString::to_string),
            BASE_TEXT_FIELDS.iter().map(ToString::to_string),
            predicate,
        )
    }

    /// Whether a field name is tracked for the given target.
    pub fn is_tracked(&self, target: FieldTarget, name: &str) -> bool {
        let base = match target {
            FieldTarget::Chat => &self.chat_base,
            FieldTarget::Text => &self.text_base,
        };
        base.iter().any(|f| f == name) || (self.predicate)(name)
    }

    /// Copies the tracked subset out of a live field table.
    pub fn project(
        &self,
        target: FieldTarget,
        fields: &serde_json::Map<String, Value>,
    ) -> serde_json::Map<String, Value> {
        fields
            .iter()
            .filter(|(name, _)| self.is_tracked(target, name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// Order-independent fingerprint of the active configuration.
///
/// Two signatures are equal iff every tracked field compares equal;
/// comparison is structural, not identity-based. Insertion order never
/// matters because keys live in a [`BTreeMap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConnectionSignature {
    fields: BTreeMap<String, Value>,
}

impl ConnectionSignature {
    /// Records one tracked field.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Looks up a tracked field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Number of tracked fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether nothing was tracked.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
