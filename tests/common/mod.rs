//! Shared test doubles for the integration suites.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Semaphore;

use roulette::domain::error::DomainResult;
use roulette::domain::models::{FieldTarget, Profile};
use roulette::domain::ports::ConnectionHost;
use roulette::infrastructure::InMemoryHost;

/// Host wrapper whose switches can be suspended until released, so tests
/// can interleave other work at the switch suspension point.
pub struct SlowSwitchHost {
    inner: Arc<InMemoryHost>,
    hold: AtomicBool,
    gate: Semaphore,
}

impl SlowSwitchHost {
    pub fn new(inner: Arc<InMemoryHost>) -> Self {
        Self {
            inner,
            hold: AtomicBool::new(false),
            gate: Semaphore::new(0),
        }
    }

    pub fn inner(&self) -> &InMemoryHost {
        &self.inner
    }

    /// Start (or stop) suspending switch calls.
    pub fn hold_switches(&self, on: bool) {
        self.hold.store(on, Ordering::SeqCst);
    }

    /// Let one suspended switch proceed.
    pub fn release_one(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl ConnectionHost for SlowSwitchHost {
    fn profiles(&self) -> Vec<Profile> {
        self.inner.profiles()
    }

    fn active_profile_id(&self) -> Option<String> {
        self.inner.active_profile_id()
    }

    fn profile_definition(&self, profile_id: &str) -> Option<Value> {
        self.inner.profile_definition(profile_id)
    }

    fn main_api_mode(&self) -> Option<String> {
        self.inner.main_api_mode()
    }

    fn provider_fields(&self, target: FieldTarget) -> Option<Map<String, Value>> {
        self.inner.provider_fields(target)
    }

    async fn switch_to_profile(&self, name: &str) -> DomainResult<()> {
        if self.hold.load(Ordering::SeqCst) {
            let permit = self.gate.acquire().await.expect("gate closed");
            permit.forget();
        }
        self.inner.switch_to_profile(name).await
    }

    async fn update_provider_fields(
        &self,
        target: FieldTarget,
        writes: Vec<(String, Value)>,
        deletes: Vec<String>,
    ) -> DomainResult<bool> {
        self.inner.update_provider_fields(target, writes, deletes).await
    }

    async fn set_main_api_mode(&self, mode: &str) -> DomainResult<()> {
        self.inner.set_main_api_mode(mode).await
    }
}

/// Host wrapper that claims field updates succeeded without applying
/// them, to force the post-apply verification mismatch path.
pub struct LyingHost {
    inner: Arc<InMemoryHost>,
}

impl LyingHost {
    pub fn new(inner: Arc<InMemoryHost>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ConnectionHost for LyingHost {
    fn profiles(&self) -> Vec<Profile> {
        self.inner.profiles()
    }

    fn active_profile_id(&self) -> Option<String> {
        self.inner.active_profile_id()
    }

    fn profile_definition(&self, profile_id: &str) -> Option<Value> {
        self.inner.profile_definition(profile_id)
    }

    fn main_api_mode(&self) -> Option<String> {
        self.inner.main_api_mode()
    }

    fn provider_fields(&self, target: FieldTarget) -> Option<Map<String, Value>> {
        self.inner.provider_fields(target)
    }

    async fn switch_to_profile(&self, name: &str) -> DomainResult<()> {
        self.inner.switch_to_profile(name).await
    }

    async fn update_provider_fields(
        &self,
        _target: FieldTarget,
        _writes: Vec<(String, Value)>,
        _deletes: Vec<String>,
    ) -> DomainResult<bool> {
        // Claim success, change nothing.
        Ok(true)
    }

    async fn set_main_api_mode(&self, mode: &str) -> DomainResult<()> {
        self.inner.set_main_api_mode(mode).await
    }
}
