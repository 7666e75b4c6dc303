//! Connection signature tracking and drift detection.
//!
//! The tracker remembers what configuration the engine last acknowledged
//! (the "expectation") and compares the live state against it. A mismatch
//! means something other than the engine changed the configuration: the
//! user picked a different profile, edited a model field, or an outside
//! actor rewrote provider settings. Callers react to that drift; the
//! tracker only reports it and adopts the new state as expected.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::debug;

use crate::domain::models::{ConnectionSignature, FieldTarget, TrackedFields};
use crate::domain::ports::ConnectionHost;

/// Expected configuration captured after the last acknowledged change.
#[derive(Debug, Clone, Default)]
struct Expectation {
    profile_id: Option<String>,
    signature: Option<ConnectionSignature>,
}

/// Outcome of a drift check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftCheck {
    /// The live configuration matches the expectation.
    Unchanged,
    /// The live configuration differs; the expectation has been updated.
    Drifted,
    /// An internal switch is in flight; the check was skipped.
    Suppressed,
}

/// Fingerprints the live configuration and detects outside changes.
pub struct SignatureTracker {
    host: Arc<dyn ConnectionHost>,
    tracked: Arc<TrackedFields>,
    expectation: Mutex<Expectation>,
    internal_depth: AtomicU32,
}

impl SignatureTracker {
    /// Creates a tracker with an empty expectation. Callers normally
    /// [`capture_expectation`](Self::capture_expectation) right away.
    pub fn new(host: Arc<dyn ConnectionHost>, tracked: Arc<TrackedFields>) -> Self {
        Self {
            host,
            tracked,
            expectation: Mutex::new(Expectation::default()),
            internal_depth: AtomicU32::new(0),
        }
    }

    /// Computes the fingerprint of the currently active configuration.
    ///
    /// Covers the API mode, the active profile id and its stored
    /// definition, and the tracked subset of both provider field tables.
    pub fn compute_signature(&self) -> ConnectionSignature {
        let mut signature = ConnectionSignature::default();

        if let Some(mode) = self.host.main_api_mode() {
            signature.insert("main_api", Value::String(mode));
        }
        if let Some(id) = self.host.active_profile_id() {
            if let Some(definition) = self.host.profile_definition(&id) {
                signature.insert("profile.def", definition);
            }
            signature.insert("profile.id", Value::String(id));
        }
        for target in FieldTarget::ALL {
            if let Some(fields) = self.host.provider_fields(target) {
                for (name, value) in self.tracked.project(target, &fields) {
                    signature.insert(format!("{}.{name}", target.as_str()), value);
                }
            }
        }
        signature
    }

    /// Adopts the live configuration as the expected one.
    pub fn capture_expectation(&self) {
        let profile_id = self.host.active_profile_id();
        let signature = self.compute_signature();
        let mut expectation = self.lock();
        expectation.profile_id = profile_id;
        expectation.signature = Some(signature);
    }

    /// The profile id the tracker currently expects to be active.
    pub fn expected_profile_id(&self) -> Option<String> {
        self.lock().profile_id.clone()
    }

    /// Compares the live configuration against the expectation.
    ///
    /// On drift the expectation is updated to the live state, so each
    /// outside change is reported exactly once. Suppressed while an
    /// internal switch is in flight, otherwise the engine would
    /// misidentify its own writes as manual changes.
    pub fn detect_drift(&self, reason: &str) -> DriftCheck {
        if self.internal_depth.load(Ordering::SeqCst) > 0 {
            debug!(reason, "drift check suppressed during internal switch");
            return DriftCheck::Suppressed;
        }

        let live_id = self.host.active_profile_id();
        let live_signature = self.compute_signature();

        let mut expectation = self.lock();
        if expectation.signature.is_none() {
            // First observation: adopt silently.
            expectation.profile_id = live_id;
            expectation.signature = Some(live_signature);
            return DriftCheck::Unchanged;
        }

        let drifted = expectation.profile_id != live_id
            || expectation.signature.as_ref() != Some(&live_signature);
        if drifted {
            debug!(
                reason,
                expected = ?expectation.profile_id,
                actual = ?live_id,
                "connection drift detected"
            );
            expectation.profile_id = live_id;
            expectation.signature = Some(live_signature);
            DriftCheck::Drifted
        } else {
            DriftCheck::Unchanged
        }
    }

    /// Marks an internally initiated switch. Drift checks are suppressed
    /// until the returned guard drops, which happens on every exit path.
    pub fn internal_switch(&self) -> InternalSwitchGuard<'_> {
        self.internal_depth.fetch_add(1, Ordering::SeqCst);
        InternalSwitchGuard { tracker: self }
    }

    fn lock(&self) -> MutexGuard<'_, Expectation> {
        self.expectation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// RAII marker for an in-flight internal switch.
pub struct InternalSwitchGuard<'a> {
    tracker: &'a SignatureTracker,
}

impl Drop for InternalSwitchGuard<'_> {
    fn drop(&mut self) {
        self.tracker.internal_depth.fetch_sub(1, Ordering::SeqCst);
    }
}
