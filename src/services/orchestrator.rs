//! Generation lifecycle orchestration.
//!
//! Subscribes to the host's lifecycle signals and sequences drift
//! detection, gating, candidate selection, session management, and the
//! external profile switch. Handlers are infallible at their signature:
//! every failure degrades to "stay on whatever profile is active" and a
//! warning, never an error surfaced into the generation pipeline.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::domain::error::DomainResult;
use crate::domain::models::{
    ConfigTopic, GenerationKind, LifecycleSignal, Profile, RestoreMode, RouletteSettings,
    SessionKind, TrackedFields,
};
use crate::domain::ports::{ConnectionHost, RandomSource, RotationNotifier, SettingsStore};

use super::context_restorer::ContextRestorer;
use super::gate::{threshold_met, ChanceGate};
use super::rotation_session::RotationSession;
use super::selector::{rotation_candidates, spin_candidates, weighted_draw};
use super::signature_tracker::{DriftCheck, SignatureTracker};

#[derive(Debug, Default)]
struct TurnState {
    swipes_used: u32,
    bypass_next_swipe: bool,
    spin_in_flight: bool,
}

/// Orchestrates profile rotation across the generation lifecycle.
pub struct RouletteOrchestrator {
    host: Arc<dyn ConnectionHost>,
    store: Arc<dyn SettingsStore>,
    random: Arc<dyn RandomSource>,
    notifier: Arc<dyn RotationNotifier>,
    tracker: Arc<SignatureTracker>,
    gate: ChanceGate,
    swipe_session: RotationSession,
    message_session: RotationSession,
    turn: Mutex<TurnState>,
}

impl RouletteOrchestrator {
    /// Creates an orchestrator with the default tracked-field set.
    pub fn new(
        host: Arc<dyn ConnectionHost>,
        store: Arc<dyn SettingsStore>,
        random: Arc<dyn RandomSource>,
        notifier: Arc<dyn RotationNotifier>,
    ) -> Self {
        Self::with_tracked_fields(host, store, random, notifier, TrackedFields::default())
    }

    /// Creates an orchestrator with a custom tracked-field set.
    pub fn with_tracked_fields(
        host: Arc<dyn ConnectionHost>,
        store: Arc<dyn SettingsStore>,
        random: Arc<dyn RandomSource>,
        notifier: Arc<dyn RotationNotifier>,
        tracked: TrackedFields,
    ) -> Self {
        let tracked = Arc::new(tracked);
        let tracker = Arc::new(SignatureTracker::new(host.clone(), tracked.clone()));
        let restorer = Arc::new(ContextRestorer::new(host.clone(), tracked));
        tracker.capture_expectation();

        let swipe_session = RotationSession::new(
            SessionKind::Swipe,
            host.clone(),
            restorer.clone(),
            tracker.clone(),
        );
        let message_session =
            RotationSession::new(SessionKind::Message, host.clone(), restorer, tracker.clone());

        Self {
            host,
            store,
            random,
            notifier,
            tracker,
            gate: ChanceGate::new(),
            swipe_session,
            message_session,
            turn: Mutex::new(TurnState::default()),
        }
    }

    /// Dispatches one lifecycle signal.
    pub async fn handle(&self, signal: LifecycleSignal) {
        match signal {
            LifecycleSignal::GenerationStarted { kind, dry_run } => {
                self.on_generation_started(kind, dry_run).await;
            }
            LifecycleSignal::MessageReceived { kind } => self.on_message_received(kind).await,
            LifecycleSignal::GenerationStopped | LifecycleSignal::GenerationEnded => {
                self.restore_all().await;
            }
            LifecycleSignal::ChatChanged => self.on_chat_changed().await,
            LifecycleSignal::ProfileCatalogChanged => self.on_profile_catalog_changed(),
            LifecycleSignal::ConfigurationChanged { topic } => {
                self.on_configuration_changed(topic);
            }
        }
    }

    /// Consumes signals from a broadcast channel until it closes.
    pub async fn run(&self, mut signals: broadcast::Receiver<LifecycleSignal>) {
        loop {
            match signals.recv().await {
                Ok(signal) => self.handle(signal).await,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "lifecycle signals dropped; resynchronizing expectation");
                    self.tracker.capture_expectation();
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// The swipe session, for embedding code that inspects rotation state.
    pub fn swipe_session(&self) -> &RotationSession {
        &self.swipe_session
    }

    /// The message session.
    pub fn message_session(&self) -> &RotationSession {
        &self.message_session
    }

    /// Swipes counted on the current profile since the last reset.
    pub fn swipes_used(&self) -> u32 {
        self.lock_turn().swipes_used
    }

    #[instrument(skip(self), fields(kind = kind.as_str(), dry_run))]
    async fn on_generation_started(&self, kind: GenerationKind, dry_run: bool) {
        if dry_run {
            return;
        }

        let drifted = self.check_drift("generation-started") == DriftCheck::Drifted;
        if drifted && kind == GenerationKind::Swipe {
            // The user's manual change takes precedence once.
            debug!("manual configuration change detected; skipping this swipe rotation");
            return;
        }

        if kind != GenerationKind::Quiet {
            self.recover_stale_sessions().await;
        }

        match kind {
            GenerationKind::Swipe => self.rotate_for_swipe().await,
            GenerationKind::Normal => {
                self.reset_swipe_counter();
                self.route_for_message().await;
            }
            GenerationKind::Quiet => {}
            GenerationKind::Other => self.reset_swipe_counter(),
        }
    }

    #[instrument(skip(self), fields(kind = kind.as_str()))]
    async fn on_message_received(&self, kind: GenerationKind) {
        match kind {
            GenerationKind::Swipe => {
                self.swipe_session.restore().await;
                self.notifier.dismiss();
            }
            GenerationKind::Normal => {
                self.message_session.restore().await;
                self.notifier.dismiss();
            }
            GenerationKind::Quiet | GenerationKind::Other => {}
        }
    }

    #[instrument(skip(self))]
    async fn on_chat_changed(&self) {
        self.restore_all().await;
        self.swipe_session.reset();
        self.message_session.reset();
        self.reset_swipe_counter();
        self.gate.reset();
        self.tracker.capture_expectation();
    }

    fn on_profile_catalog_changed(&self) {
        self.prune_stale_selections();
        if self.check_drift("profile-catalog-changed") == DriftCheck::Drifted {
            self.arm_bypass();
        }
    }

    fn on_configuration_changed(&self, topic: ConfigTopic) {
        if self.check_drift(topic.as_str()) == DriftCheck::Drifted {
            self.arm_bypass();
        }
    }

    /// Explicit immediate weighted switch over the spin pool.
    ///
    /// The active profile is eligible; no session is opened - the switch
    /// is permanent. Returns the chosen profile, or `None` when the pool
    /// is empty or another spin is already in flight.
    pub async fn spin(&self) -> Result<Option<Profile>> {
        {
            let mut turn = self.lock_turn();
            if turn.spin_in_flight {
                return Ok(None);
            }
            turn.spin_in_flight = true;
        }
        let result = self.spin_inner().await;
        self.lock_turn().spin_in_flight = false;
        result
    }

    async fn spin_inner(&self) -> Result<Option<Profile>> {
        let mut settings = self.store.load();
        let profiles = self.host.profiles();
        let pool = spin_candidates(&profiles, &settings);
        let Some(target) =
            weighted_draw(&pool, |p| settings.weight_for(&p.id), self.random.as_ref()).cloned()
        else {
            debug!("spin pool is empty");
            return Ok(None);
        };

        self.switch_internal(&target.name)
            .await
            .with_context(|| format!("failed to switch to profile {}", target.name))?;

        self.reset_swipe_counter();
        settings.last_spin_profile = Some(target.id.clone());
        self.store.save(&settings);
        self.notify(&settings, &target.name);
        info!(profile = %target.name, "spin switched the active profile");
        Ok(Some(target))
    }

    /// Drops selected ids, weight entries, and the last-spin record for
    /// profiles that no longer exist. Persists only when something
    /// changed.
    pub fn prune_stale_selections(&self) {
        let live: BTreeSet<String> = self.host.profiles().into_iter().map(|p| p.id).collect();
        let mut settings = self.store.load();
        let mut dirty = false;

        let before = settings.selected_profiles.len();
        settings.selected_profiles.retain(|id| live.contains(id));
        dirty |= settings.selected_profiles.len() != before;

        let before = settings.weights.len();
        settings.weights.retain(|id, _| live.contains(id));
        dirty |= settings.weights.len() != before;

        if settings
            .last_spin_profile
            .as_ref()
            .is_some_and(|id| !live.contains(id))
        {
            settings.last_spin_profile = None;
            dirty = true;
        }

        if dirty {
            self.store.save(&settings);
            debug!("pruned settings entries for deleted profiles");
        }
    }

    async fn rotate_for_swipe(&self) {
        let settings = self.store.load();
        if !settings.enabled {
            return;
        }

        if self.take_bypass() {
            debug!("bypassing one swipe rotation after a manual configuration change");
            return;
        }

        let swipes_used = {
            let mut turn = self.lock_turn();
            turn.swipes_used += 1;
            turn.swipes_used
        };
        if !threshold_met(swipes_used, settings.swipe_threshold) {
            debug!(
                swipes_used,
                threshold = settings.swipe_threshold,
                "swipe within threshold; skipping rotation"
            );
            return;
        }

        let signature = self.tracker.compute_signature();
        if !self
            .gate
            .permits(&settings.overall_chance, &signature, self.random.as_ref())
        {
            debug!("overall-chance gate skipped this rotation");
            return;
        }

        let profiles = self.host.profiles();
        let active_id = self.host.active_profile_id();
        let pool = rotation_candidates(&profiles, &settings, active_id.as_deref());
        let Some(target) =
            weighted_draw(&pool, |p| settings.weight_for(&p.id), self.random.as_ref()).cloned()
        else {
            debug!("no rotation candidates available");
            return;
        };
        // The listing may have raced between pool assembly and the draw.
        if Some(target.id.as_str()) == self.host.active_profile_id().as_deref() {
            debug!(profile = %target.name, "selected profile already active; skipping rotation");
            return;
        }

        let ticket = self.swipe_session.begin();
        match self.switch_internal(&target.name).await {
            Ok(()) => {
                self.notify(&settings, &target.name);
                info!(profile = %target.name, "rotated profile for swipe generation");
            }
            Err(err) => {
                warn!(
                    profile = %target.name,
                    error = %err,
                    "profile switch failed; abandoning rotation"
                );
                self.swipe_session.abort(ticket);
            }
        }
    }

    async fn route_for_message(&self) {
        let settings = self.store.load();
        if !settings.message_routing.enabled {
            return;
        }

        let profiles = self.host.profiles();
        let pool = spin_candidates(&profiles, &settings);
        let Some(target) =
            weighted_draw(&pool, |p| settings.weight_for(&p.id), self.random.as_ref()).cloned()
        else {
            debug!("no routing candidates available");
            return;
        };
        if Some(target.id.as_str()) == self.host.active_profile_id().as_deref() {
            debug!(profile = %target.name, "routed profile already active; keeping it");
            return;
        }

        match settings.message_routing.restore_mode {
            RestoreMode::Restore => {
                let ticket = self.message_session.begin();
                match self.switch_internal(&target.name).await {
                    Ok(()) => {
                        self.notify(&settings, &target.name);
                        info!(profile = %target.name, "routed message generation");
                    }
                    Err(err) => {
                        warn!(
                            profile = %target.name,
                            error = %err,
                            "profile switch failed; abandoning message routing"
                        );
                        self.message_session.abort(ticket);
                    }
                }
            }
            RestoreMode::Keep => match self.switch_internal(&target.name).await {
                Ok(()) => {
                    self.notify(&settings, &target.name);
                    info!(profile = %target.name, "switched profile for message generation");
                }
                Err(err) => {
                    warn!(
                        profile = %target.name,
                        error = %err,
                        "profile switch failed; staying on the active profile"
                    );
                }
            },
        }
    }

    /// Restores sessions a previous turn opened but never closed.
    async fn recover_stale_sessions(&self) {
        if self.swipe_session.is_open() {
            debug!("recovering swipe rotation left open by a previous turn");
            self.swipe_session.restore().await;
            self.notifier.dismiss();
        }
        if self.message_session.is_open() {
            debug!("recovering message rotation left open by a previous turn");
            self.message_session.restore().await;
            self.notifier.dismiss();
        }
    }

    async fn restore_all(&self) {
        self.swipe_session.restore().await;
        self.message_session.restore().await;
        self.notifier.dismiss();
    }

    /// Runs drift detection and applies the standard reactions: on drift
    /// the gate cache and swipe counter reset and any open session is
    /// forced idle without a restore - restoring into a configuration the
    /// user has since left is never correct.
    fn check_drift(&self, reason: &str) -> DriftCheck {
        let check = self.tracker.detect_drift(reason);
        if check == DriftCheck::Drifted {
            self.gate.reset();
            self.reset_swipe_counter();
            self.swipe_session.reset();
            self.message_session.reset();
            self.notifier.dismiss();
        }
        check
    }

    async fn switch_internal(&self, name: &str) -> DomainResult<()> {
        let _guard = self.tracker.internal_switch();
        self.host.switch_to_profile(name).await?;
        self.tracker.capture_expectation();
        Ok(())
    }

    fn notify(&self, settings: &RouletteSettings, profile_name: &str) {
        if settings.notifications {
            self.notifier.announce(profile_name);
        }
    }

    fn reset_swipe_counter(&self) {
        self.lock_turn().swipes_used = 0;
    }

    fn arm_bypass(&self) {
        self.lock_turn().bypass_next_swipe = true;
    }

    fn take_bypass(&self) -> bool {
        let mut turn = self.lock_turn();
        let armed = turn.bypass_next_swipe;
        turn.bypass_next_swipe = false;
        armed
    }

    fn lock_turn(&self) -> MutexGuard<'_, TurnState> {
        self.turn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
