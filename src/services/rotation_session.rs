//! Temporary-switch-with-guaranteed-restore sessions.
//!
//! One `RotationSession` instance exists per rotation kind (swipe,
//! message). The lifecycle is `Idle -> Open -> Restoring -> Idle`; every
//! new rotation or forced reset bumps a monotonic sequence number, and a
//! restore only finalizes when the sequence it started under is still
//! current. That guard is what keeps a stale restore, resumed after a
//! newer rotation began, from clobbering the newer session's state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::domain::error::RestoreError;
use crate::domain::models::{RestorableSnapshot, SessionKind, PROFILE_NONE};
use crate::domain::ports::ConnectionHost;

use super::context_restorer::ContextRestorer;
use super::signature_tracker::SignatureTracker;

/// Lifecycle phase of a rotation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No rotation in flight.
    Idle,
    /// A rotation switched away; a restore is owed.
    Open,
    /// A restore is currently running.
    Restoring,
}

/// Result of a restore attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Nothing to restore: the session was closed or already restoring.
    Skipped,
    /// The restore ran and the session closed.
    Restored,
    /// The restore ran, but a newer rotation superseded it mid-flight;
    /// the newer session's state was left untouched.
    Superseded,
}

/// Ticket identifying one begun rotation, used to abort it if the
/// external switch fails.
#[derive(Debug, Clone, Copy)]
pub struct BeginTicket {
    sequence: u64,
}

#[derive(Debug, Default)]
struct SessionState {
    sequence: u64,
    active: bool,
    restoring: bool,
    saved_profile_id: Option<String>,
    saved_snapshot: Option<RestorableSnapshot>,
}

/// Per-kind rotation bookkeeping with sequence-guarded restore.
///
/// State is mutated only in short critical sections; no lock is held
/// across the awaited switch and apply operations, so handlers that
/// interleave at those suspension points observe consistent state.
pub struct RotationSession {
    kind: SessionKind,
    host: Arc<dyn ConnectionHost>,
    restorer: Arc<ContextRestorer>,
    tracker: Arc<SignatureTracker>,
    state: Mutex<SessionState>,
}

impl RotationSession {
    /// Creates an idle session of the given kind.
    pub fn new(
        kind: SessionKind,
        host: Arc<dyn ConnectionHost>,
        restorer: Arc<ContextRestorer>,
        tracker: Arc<SignatureTracker>,
    ) -> Self {
        Self {
            kind,
            host,
            restorer,
            tracker,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Opens a rotation, capturing the state a later restore returns to.
    ///
    /// Always bumps the sequence number, superseding any in-flight
    /// restore. An already-open session keeps its saved state so the
    /// eventual restore lands on the true origin, not an intermediate
    /// rotation target.
    pub fn begin(&self) -> BeginTicket {
        let snapshot = self.restorer.capture();
        let mut state = self.lock();
        state.sequence += 1;
        if !state.active {
            state.saved_profile_id = snapshot.profile_id.clone();
            state.saved_snapshot = Some(snapshot);
            state.active = true;
        }
        debug!(
            kind = self.kind.as_str(),
            sequence = state.sequence,
            saved = ?state.saved_profile_id,
            "rotation session opened"
        );
        BeginTicket {
            sequence: state.sequence,
        }
    }

    /// Aborts a begun rotation whose external switch failed.
    ///
    /// No half-open session survives a failed switch; the session returns
    /// to idle with its saved fields cleared - unless a newer rotation
    /// already owns the state.
    pub fn abort(&self, ticket: BeginTicket) {
        let mut state = self.lock();
        if state.sequence != ticket.sequence {
            return;
        }
        state.active = false;
        state.saved_profile_id = None;
        state.saved_snapshot = None;
        debug!(kind = self.kind.as_str(), "rotation session aborted");
    }

    /// Unconditionally forces the session to idle, superseding anything
    /// in flight. Used when upstream state (chat switch, drift)
    /// invalidates the rotation regardless of its phase.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.sequence += 1;
        state.active = false;
        state.restoring = false;
        state.saved_profile_id = None;
        state.saved_snapshot = None;
    }

    /// Restores the saved profile and context.
    ///
    /// No-op unless the session is open and not already restoring. A
    /// deleted saved profile restores to [`PROFILE_NONE`]. Failures are
    /// logged and the session still closes - the engine degrades to
    /// "stay on whatever profile is active" rather than blocking the
    /// generation pipeline. The `restoring` latch is cleared on every
    /// path.
    pub async fn restore(&self) -> RestoreOutcome {
        let (sequence, saved_profile_id, saved_snapshot) = {
            let mut state = self.lock();
            if !state.active || state.restoring {
                return RestoreOutcome::Skipped;
            }
            state.restoring = true;
            (
                state.sequence,
                state.saved_profile_id.clone(),
                state.saved_snapshot.clone(),
            )
        };

        let result = self
            .perform_restore(saved_profile_id.as_deref(), saved_snapshot.as_ref())
            .await;
        if let Err(err) = &result {
            warn!(
                kind = self.kind.as_str(),
                error = %err,
                "restore failed; staying on the current profile"
            );
        }

        let mut state = self.lock();
        state.restoring = false;
        if state.sequence == sequence {
            state.active = false;
            state.saved_profile_id = None;
            state.saved_snapshot = None;
            debug!(kind = self.kind.as_str(), sequence, "rotation session closed");
            RestoreOutcome::Restored
        } else {
            debug!(
                kind = self.kind.as_str(),
                started = sequence,
                current = state.sequence,
                "stale restore completion; leaving newer session untouched"
            );
            RestoreOutcome::Superseded
        }
    }

    /// Whether the session is open and not mid-restore.
    pub fn is_open(&self) -> bool {
        let state = self.lock();
        state.active && !state.restoring
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        let state = self.lock();
        if state.restoring {
            SessionPhase::Restoring
        } else if state.active {
            SessionPhase::Open
        } else {
            SessionPhase::Idle
        }
    }

    /// Current sequence number.
    pub fn sequence(&self) -> u64 {
        self.lock().sequence
    }

    /// Profile id a restore would return to, if the session is open.
    pub fn saved_profile_id(&self) -> Option<String> {
        self.lock().saved_profile_id.clone()
    }

    async fn perform_restore(
        &self,
        saved_profile_id: Option<&str>,
        saved_snapshot: Option<&RestorableSnapshot>,
    ) -> Result<(), RestoreError> {
        let _guard = self.tracker.internal_switch();

        let target_name = saved_profile_id.and_then(|id| {
            self.host
                .profiles()
                .into_iter()
                .find(|p| p.id == id)
                .map(|p| p.name)
        });
        match target_name {
            Some(name) => {
                self.host.switch_to_profile(&name).await?;
                debug!(kind = self.kind.as_str(), profile = %name, "restored profile");
            }
            None => {
                // Saved profile deleted meanwhile, or none was active.
                self.host.switch_to_profile(PROFILE_NONE).await?;
                debug!(kind = self.kind.as_str(), "restored to no profile");
            }
        }

        if let Some(snapshot) = saved_snapshot {
            self.restorer.apply(snapshot).await?;
        }

        self.tracker.capture_expectation();
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
