//! Persisted rotation settings.
//!
//! The record is owned by an external store; the engine reads and writes it
//! through the [`SettingsStore`](crate::domain::ports::SettingsStore) port.
//! Out-of-range values are normalized on load, never rejected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Weight assumed for profiles without a stored (or with an invalid) weight.
pub const DEFAULT_WEIGHT: u32 = 5;
/// Upper clamp for stored weights.
pub const MAX_WEIGHT: u32 = 10;

/// What happens to the active profile after a routed message generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreMode {
    /// The routed profile stays active.
    Keep,
    /// The previous profile is restored once the response arrives.
    Restore,
}

impl Default for RestoreMode {
    fn default() -> Self {
        Self::Restore
    }
}

/// Settings for routing new-message generations through the roulette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MessageRoutingSettings {
    /// Whether message-kind routing runs at all.
    pub enabled: bool,
    /// Keep or restore the previous profile after the response.
    pub restore_mode: RestoreMode,
}

/// Settings for the probabilistic overall-chance gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChanceGateSettings {
    /// Whether the gate is consulted at all.
    pub enabled: bool,
    /// Percent chance (0-100) that a gated rotation proceeds.
    pub percent: u8,
    /// Re-roll only when the connection signature changes.
    pub change_only: bool,
}

impl Default for ChanceGateSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            percent: 100,
            change_only: false,
        }
    }
}

/// The persisted settings record for the rotation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouletteSettings {
    /// Master switch for swipe-kind rotation.
    pub enabled: bool,
    /// Swipes to keep on the current profile before rotation starts.
    /// 0 means rotate on the first swipe.
    pub swipe_threshold: u32,
    /// Profile ids selected for rotation.
    pub selected_profiles: Vec<String>,
    /// Stored per-profile weights. Values are normalized on read.
    pub weights: BTreeMap<String, i64>,
    /// Message-kind routing configuration.
    pub message_routing: MessageRoutingSettings,
    /// Overall-chance gate configuration.
    pub overall_chance: ChanceGateSettings,
    /// Whether rotations are surfaced through the notifier.
    pub notifications: bool,
    /// Profile id chosen by the most recent explicit spin.
    pub last_spin_profile: Option<String>,
}

impl Default for RouletteSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            swipe_threshold: 0,
            selected_profiles: Vec::new(),
            weights: BTreeMap::new(),
            message_routing: MessageRoutingSettings::default(),
            overall_chance: ChanceGateSettings::default(),
            notifications: true,
            last_spin_profile: None,
        }
    }
}

impl RouletteSettings {
    /// Clamps out-of-range values and drops duplicate selections in place.
    pub fn normalize(&mut self) {
        self.overall_chance.percent = self.overall_chance.percent.min(100);

        let mut seen = std::collections::BTreeSet::new();
        self.selected_profiles.retain(|id| seen.insert(id.clone()));

        for value in self.weights.values_mut() {
            *value = i64::from(normalize_weight(Some(*value)));
        }
    }

    /// Effective weight for a profile id, defaulted and clamped.
    pub fn weight_for(&self, profile_id: &str) -> u32 {
        normalize_weight(self.weights.get(profile_id).copied())
    }

    /// Whether a profile id is selected for rotation.
    pub fn is_selected(&self, profile_id: &str) -> bool {
        self.selected_profiles.iter().any(|id| id == profile_id)
    }
}

/// Normalizes a stored weight: missing or sub-1 values fall back to
/// [`DEFAULT_WEIGHT`], values above [`MAX_WEIGHT`] clamp down.
pub fn normalize_weight(value: Option<i64>) -> u32 {
    match value {
        Some(v) if v >= 1 => u32::try_from(v.min(i64::from(MAX_WEIGHT))).unwrap_or(MAX_WEIGHT),
        _ => DEFAULT_WEIGHT,
    }
}
