//! Swipe-rotation gating.
//!
//! Two independent layers, both consulted only for swipe-kind rotation:
//! a swipe-count threshold and a probabilistic overall-chance gate. With
//! `change_only` set, the gate's verdict is cached per connection
//! signature and re-rolled only when the signature changes, turning the
//! per-swipe coin flip into "re-flip only when the model actually
//! changes".

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::domain::models::{ChanceGateSettings, ConnectionSignature};
use crate::domain::ports::RandomSource;

/// Whether the swipe counter has passed the configured threshold.
pub fn threshold_met(swipes_used: u32, threshold: u32) -> bool {
    swipes_used > threshold
}

#[derive(Debug, Default)]
struct GateCache {
    signature: Option<ConnectionSignature>,
    verdict: Option<bool>,
}

/// Probabilistic gate deciding whether a swipe rotation proceeds.
#[derive(Debug, Default)]
pub struct ChanceGate {
    cache: Mutex<GateCache>,
}

impl ChanceGate {
    /// Creates a gate with an empty verdict cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the cached verdict (drift, chat change).
    pub fn reset(&self) {
        let mut cache = self.lock();
        cache.signature = None;
        cache.verdict = None;
    }

    /// Evaluates the gate for the current signature.
    ///
    /// Disabled gates always permit. Rolls `[0, 100)` against the
    /// configured percent; with `change_only`, a cached verdict for the
    /// same signature is reused instead of re-rolling.
    pub fn permits(
        &self,
        settings: &ChanceGateSettings,
        signature: &ConnectionSignature,
        random: &dyn RandomSource,
    ) -> bool {
        if !settings.enabled {
            return true;
        }

        let mut cache = self.lock();
        if settings.change_only && cache.signature.as_ref() == Some(signature) {
            if let Some(verdict) = cache.verdict {
                return verdict;
            }
        }

        let roll = random.next_unit() * 100.0;
        let verdict = roll < f64::from(settings.percent);
        debug!(roll, percent = settings.percent, verdict, "overall-chance gate rolled");
        cache.signature = Some(signature.clone());
        cache.verdict = Some(verdict);
        verdict
    }

    fn lock(&self) -> MutexGuard<'_, GateCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingRandom {
        value: f64,
        calls: AtomicU32,
    }

    impl CountingRandom {
        fn new(value: f64) -> Self {
            Self {
                value,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl RandomSource for CountingRandom {
        fn next_unit(&self) -> f64 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.value
        }
    }

    fn signature(model: &str) -> ConnectionSignature {
        let mut sig = ConnectionSignature::default();
        sig.insert("chat.model", serde_json::json!(model));
        sig
    }

    #[test]
    fn test_threshold() {
        assert!(threshold_met(1, 0));
        assert!(!threshold_met(1, 1));
        assert!(!threshold_met(2, 2));
        assert!(threshold_met(3, 2));
    }

    #[test]
    fn test_disabled_gate_always_permits() {
        let gate = ChanceGate::new();
        let settings = ChanceGateSettings {
            enabled: false,
            percent: 0,
            change_only: false,
        };
        let random = CountingRandom::new(0.99);
        assert!(gate.permits(&settings, &signature("m"), &random));
        assert_eq!(random.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_zero_percent_never_permits() {
        let gate = ChanceGate::new();
        let settings = ChanceGateSettings {
            enabled: true,
            percent: 0,
            change_only: false,
        };
        let random = CountingRandom::new(0.0);
        assert!(!gate.permits(&settings, &signature("m"), &random));
    }

    #[test]
    fn test_hundred_percent_always_permits() {
        let gate = ChanceGate::new();
        let settings = ChanceGateSettings {
            enabled: true,
            percent: 100,
            change_only: false,
        };
        let random = CountingRandom::new(0.999_999);
        assert!(gate.permits(&settings, &signature("m"), &random));
    }

    #[test]
    fn test_change_only_caches_per_signature() {
        let gate = ChanceGate::new();
        let settings = ChanceGateSettings {
            enabled: true,
            percent: 50,
            change_only: true,
        };
        let random = CountingRandom::new(0.2);

        assert!(gate.permits(&settings, &signature("m1"), &random));
        assert!(gate.permits(&settings, &signature("m1"), &random));
        assert_eq!(random.calls.load(Ordering::SeqCst), 1);

        // A different signature re-rolls.
        assert!(gate.permits(&settings, &signature("m2"), &random));
        assert_eq!(random.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_without_change_only_every_call_rolls() {
        let gate = ChanceGate::new();
        let settings = ChanceGateSettings {
            enabled: true,
            percent: 50,
            change_only: false,
        };
        let random = CountingRandom::new(0.2);

        gate.permits(&settings, &signature("m1"), &random);
        gate.permits(&settings, &signature("m1"), &random);
        assert_eq!(random.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reset_clears_cached_verdict() {
        let gate = ChanceGate::new();
        let settings = ChanceGateSettings {
            enabled: true,
            percent: 50,
            change_only: true,
        };
        let random = CountingRandom::new(0.2);

        gate.permits(&settings, &signature("m1"), &random);
        gate.reset();
        gate.permits(&settings, &signature("m1"), &random);
        assert_eq!(random.calls.load(Ordering::SeqCst), 2);
    }
}
