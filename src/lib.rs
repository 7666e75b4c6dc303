//! Roulette - connection profile rotation engine
//!
//! Roulette temporarily redirects a generation request to a different
//! connection profile (model/provider endpoint), chosen by weighted random
//! draw, and guarantees the prior configuration is restored once the
//! redirected work completes - across overlapping, asynchronous, and
//! partially-failing operations driven by an external event stream.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture
//! principles:
//!
//! - **Domain Layer** (`domain`): data models, error types, and the port
//!   contracts external collaborators implement
//! - **Service Layer** (`services`): the rotation state machine and its
//!   supporting primitives - weighted selection, signature tracking,
//!   context restoration, gating, and lifecycle orchestration
//! - **Infrastructure Layer** (`infrastructure`): in-process adapters for
//!   the ports (randomness, in-memory host)
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use roulette::domain::models::{GenerationKind, LifecycleSignal, RouletteSettings};
//! use roulette::domain::ports::NullNotifier;
//! use roulette::infrastructure::{EntropyRandom, InMemoryHost, InMemorySettingsStore};
//! use roulette::services::RouletteOrchestrator;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let host = Arc::new(InMemoryHost::new());
//!     host.add_profile("p1", "Alpha");
//!     host.add_profile("p2", "Beta");
//!     host.set_active(Some("p1"));
//!
//!     let settings = RouletteSettings {
//!         enabled: true,
//!         selected_profiles: vec!["p1".into(), "p2".into()],
//!         ..Default::default()
//!     };
//!
//!     let orchestrator = RouletteOrchestrator::new(
//!         host,
//!         Arc::new(InMemorySettingsStore::new(settings)),
//!         Arc::new(EntropyRandom::new()),
//!         Arc::new(NullNotifier),
//!     );
//!
//!     orchestrator
//!         .handle(LifecycleSignal::GenerationStarted {
//!             kind: GenerationKind::Swipe,
//!             dry_run: false,
//!         })
//!         .await;
//!     orchestrator.handle(LifecycleSignal::GenerationEnded).await;
//! }
//! ```

pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::error::{DomainResult, HostError, RestoreError};
pub use domain::models::{
    ConfigTopic, ConnectionSignature, FieldTarget, GenerationKind, LifecycleSignal, Profile,
    RestorableSnapshot, RestoreMode, RouletteSettings, SessionKind, TrackedFields, PROFILE_NONE,
};
pub use domain::ports::{
    ConnectionHost, NullNotifier, RandomSource, RotationNotifier, SettingsStore,
};
pub use services::{
    ChanceGate, ContextRestorer, DriftCheck, RestoreOutcome, RotationSession,
    RouletteOrchestrator, SessionPhase, SignatureTracker,
};
