//! In-memory host adapter.
//!
//! Backs the port traits with plain in-process state: the test double for
//! the engine's own suite, and a starting point for embedding without a
//! live host. Switch failures can be scripted and every switch attempt is
//! logged for assertions.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::error::{DomainResult, HostError};
use crate::domain::models::{FieldTarget, Profile, RouletteSettings, PROFILE_NONE};
use crate::domain::ports::{ConnectionHost, RotationNotifier, SettingsStore};

#[derive(Debug, Clone)]
struct StoredProfile {
    profile: Profile,
    definition: Option<Value>,
}

#[derive(Debug, Default)]
struct HostState {
    profiles: Vec<StoredProfile>,
    active: Option<String>,
    api_mode: Option<String>,
    chat_fields: Option<Map<String, Value>>,
    text_fields: Option<Map<String, Value>>,
    fail_switches: u32,
    switch_log: Vec<String>,
}

impl HostState {
    fn table_mut(&mut self, target: FieldTarget) -> &mut Option<Map<String, Value>> {
        match target {
            FieldTarget::Chat => &mut self.chat_fields,
            FieldTarget::Text => &mut self.text_fields,
        }
    }

    fn table(&self, target: FieldTarget) -> &Option<Map<String, Value>> {
        match target {
            FieldTarget::Chat => &self.chat_fields,
            FieldTarget::Text => &self.text_fields,
        }
    }
}

/// In-memory [`ConnectionHost`] with scripted failures and a switch log.
#[derive(Debug)]
pub struct InMemoryHost {
    state: Mutex<HostState>,
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHost {
    /// Creates an empty host: no profiles, no active selection, both
    /// provider field tables present but empty. Use
    /// [`drop_field_table`](Self::drop_field_table) to simulate an
    /// unavailable table.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HostState {
                chat_fields: Some(Map::new()),
                text_fields: Some(Map::new()),
                ..HostState::default()
            }),
        }
    }

    /// Adds a profile without a stored definition.
    pub fn add_profile(&self, id: &str, name: &str) {
        self.lock().profiles.push(StoredProfile {
            profile: Profile::new(id, name),
            definition: None,
        });
    }

    /// Adds a profile with a stored definition payload.
    pub fn add_profile_with_definition(&self, id: &str, name: &str, definition: Value) {
        self.lock().profiles.push(StoredProfile {
            profile: Profile::new(id, name),
            definition: Some(definition),
        });
    }

    /// Removes a profile from the listing.
    pub fn remove_profile(&self, id: &str) {
        self.lock().profiles.retain(|stored| stored.profile.id != id);
    }

    /// Sets the active profile id directly (an "outside actor" change).
    pub fn set_active(&self, id: Option<&str>) {
        self.lock().active = id.map(ToString::to_string);
    }

    /// Sets the top-level API mode directly.
    pub fn set_api_mode(&self, mode: Option<&str>) {
        self.lock().api_mode = mode.map(ToString::to_string);
    }

    /// Writes one provider field, creating the table when absent.
    pub fn set_field(&self, target: FieldTarget, name: &str, value: Value) {
        let mut state = self.lock();
        state
            .table_mut(target)
            .get_or_insert_with(Map::new)
            .insert(name.to_string(), value);
    }

    /// Removes one provider field.
    pub fn remove_field(&self, target: FieldTarget, name: &str) {
        let mut state = self.lock();
        if let Some(table) = state.table_mut(target).as_mut() {
            table.remove(name);
        }
    }

    /// Drops a whole field table, simulating an unavailable target.
    pub fn drop_field_table(&self, target: FieldTarget) {
        *self.lock().table_mut(target) = None;
    }

    /// Makes the next `count` switch attempts fail.
    pub fn fail_next_switches(&self, count: u32) {
        self.lock().fail_switches = count;
    }

    /// Every switch attempt so far, by requested profile name.
    pub fn switch_log(&self) -> Vec<String> {
        self.lock().switch_log.clone()
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ConnectionHost for InMemoryHost {
    fn profiles(&self) -> Vec<Profile> {
        self.lock()
            .profiles
            .iter()
            .map(|stored| stored.profile.clone())
            .collect()
    }

    fn active_profile_id(&self) -> Option<String> {
        self.lock().active.clone()
    }

    fn profile_definition(&self, profile_id: &str) -> Option<Value> {
        self.lock()
            .profiles
            .iter()
            .find(|stored| stored.profile.id == profile_id)
            .and_then(|stored| stored.definition.clone())
    }

    fn main_api_mode(&self) -> Option<String> {
        self.lock().api_mode.clone()
    }

    fn provider_fields(&self, target: FieldTarget) -> Option<Map<String, Value>> {
        self.lock().table(target).clone()
    }

    async fn switch_to_profile(&self, name: &str) -> DomainResult<()> {
        let mut state = self.lock();
        state.switch_log.push(name.to_string());

        if state.fail_switches > 0 {
            state.fail_switches -= 1;
            return Err(HostError::SwitchFailed(format!(
                "scripted failure switching to {name}"
            )));
        }

        if name == PROFILE_NONE {
            state.active = None;
            return Ok(());
        }
        match state.profiles.iter().find(|s| s.profile.name == name) {
            Some(stored) => {
                state.active = Some(stored.profile.id.clone());
                Ok(())
            }
            None => Err(HostError::SwitchFailed(format!("unknown profile: {name}"))),
        }
    }

    async fn update_provider_fields(
        &self,
        target: FieldTarget,
        writes: Vec<(String, Value)>,
        deletes: Vec<String>,
    ) -> DomainResult<bool> {
        let mut state = self.lock();
        let Some(table) = state.table_mut(target).as_mut() else {
            return Ok(false);
        };
        for (name, value) in writes {
            table.insert(name, value);
        }
        for name in deletes {
            table.remove(&name);
        }
        Ok(true)
    }

    async fn set_main_api_mode(&self, mode: &str) -> DomainResult<()> {
        self.lock().api_mode = Some(mode.to_string());
        Ok(())
    }
}

/// In-memory [`SettingsStore`] that counts saves.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    settings: Mutex<RouletteSettings>,
    saves: AtomicU32,
}

impl InMemorySettingsStore {
    /// Creates a store holding a normalized copy of `settings`.
    pub fn new(mut settings: RouletteSettings) -> Self {
        settings.normalize();
        Self {
            settings: Mutex::new(settings),
            saves: AtomicU32::new(0),
        }
    }

    /// Copy of the stored record.
    pub fn snapshot(&self) -> RouletteSettings {
        self.lock().clone()
    }

    /// How many times `save` was called.
    pub fn save_count(&self) -> u32 {
        self.saves.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, RouletteSettings> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn load(&self) -> RouletteSettings {
        let mut settings = self.lock().clone();
        settings.normalize();
        settings
    }

    fn save(&self, settings: &RouletteSettings) {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.lock() = settings.clone();
    }
}

/// What a [`RecordingNotifier`] saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierEvent {
    /// A rotation was announced with the given profile name.
    Announced(String),
    /// The visible notice was dismissed.
    Dismissed,
}

/// Notifier that records every call, for assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotifierEvent>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<NotifierEvent> {
        self.lock().clone()
    }

    /// Profile names announced so far.
    pub fn announced(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                NotifierEvent::Announced(name) => Some(name.clone()),
                NotifierEvent::Dismissed => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<NotifierEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RotationNotifier for RecordingNotifier {
    fn announce(&self, profile_name: &str) {
        self.lock().push(NotifierEvent::Announced(profile_name.to_string()));
    }

    fn dismiss(&self) {
        self.lock().push(NotifierEvent::Dismissed);
    }
}
