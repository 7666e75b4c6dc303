//! Core rotation services.

pub mod context_restorer;
pub mod gate;
pub mod orchestrator;
pub mod rotation_session;
pub mod selector;
pub mod signature_tracker;

pub use context_restorer::ContextRestorer;
pub use gate::{threshold_met, ChanceGate};
pub use orchestrator::RouletteOrchestrator;
pub use rotation_session::{BeginTicket, RestoreOutcome, RotationSession, SessionPhase};
pub use selector::{rotation_candidates, spin_candidates, weighted_draw};
pub use signature_tracker::{DriftCheck, InternalSwitchGuard, SignatureTracker};
