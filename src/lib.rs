//! Simple interface for keeping time-locked notes ("time capsules") in the
//! browser's local storage.
//!
//! This crate is intended for use in front-end WebAssembly environments; a note
//! carries an unlock date and time-of-day, and its content is meant to stay
//! hidden by the presenting UI until the wall clock reaches that instant. Notes
//! are stored in plaintext; the lock is a display gate, not a security
//! boundary.
//!
//! The whole collection is persisted as one JSON entry on every mutation, and
//! each note's cached lock state is re-evaluated at load, on every listing, and
//! once per second while the [`TickManager`] is running.

use crate::storage::{CapsuleStorage, KEY_NOTES};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use thiserror::Error;
#[cfg(feature = "tracing")]
use tracing::{error, info, warn};

pub mod clock;
pub mod lock;
pub mod note;
pub mod storage;
pub mod tick_manager;

pub use clock::{Clock, SystemClock};
pub use lock::UnlockPreset;
pub use note::{Note, NoteDraft, NoteId};
pub use storage::{CapsuleStorageType, LocalStorage, MemoryStorage, StorageError};
pub use tick_manager::{TickManager, TickManagerOptions};

/// A user-correctable rejection from [`CapsuleStore::create`].
///
/// Surfaced to the caller as a user-visible message; never fatal, never
/// retried automatically.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("content must not be empty")]
    EmptyContent,
    #[error("unlock instant must be in the future")]
    UnlockNotInFuture,
}

/// The error type for the note store.
#[derive(Error, Debug)]
pub enum CapsuleStoreError {
    /// The creation input was rejected.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    /// An error from the storage backend.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// The store for time-locked notes.
///
/// Owns the note collection, persists it as a whole on every mutation, and
/// keeps each note's cached lock state fresh. Constructed over the browser's
/// local storage by default; clones share the same collection.
#[derive(Clone)]
pub struct CapsuleStore {
    notes: Arc<Mutex<Vec<Note>>>,
    storage: CapsuleStorageType,
    clock: Arc<dyn Clock>,
    /// The tick manager that refreshes lock state while running.
    pub tick_manager: Option<TickManager>,
}

impl std::fmt::Debug for CapsuleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapsuleStore")
            .field("notes", &{
                if let Ok(notes) = self.notes.lock() {
                    notes.len()
                } else {
                    0
                }
            })
            .field("storage", &self.storage)
            .field("tick_manager", &self.tick_manager)
            .finish()
    }
}

impl CapsuleStore {
    /// Create a new [`CapsuleStoreBuilder`] for building a store.
    pub fn builder() -> CapsuleStoreBuilder {
        CapsuleStoreBuilder::new()
    }

    /// Creates a new [`CapsuleStore`] with default options.
    pub fn new() -> Self {
        Self::new_with_options(CapsuleStoreCreateOptions::default())
    }

    /// Creates a new [`CapsuleStore`] with the provided options.
    ///
    /// Loads the persisted collection once, re-evaluates every note's lock
    /// state against the clock, and writes the reconciled collection back so
    /// stale flags from a previous session do not survive the load. Missing or
    /// malformed persisted data is treated as an empty collection, never as a
    /// fatal error.
    ///
    /// Unless ticking is disabled, a [`TickManager`] is started; when the
    /// caller registered no tick callbacks of their own, a default callback is
    /// installed that calls [`refresh`](Self::refresh) on every tick.
    pub fn new_with_options(options: CapsuleStoreCreateOptions) -> Self {
        let mut storage = options.storage.unwrap_or_default();
        let clock = options
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let mut notes = Self::load(&mut storage);
        let now = clock.now().naive_local();
        for note in notes.iter_mut() {
            note.is_unlocked = lock::evaluate(note.unlock_instant(), now);
        }
        if let Err(_e) = Self::persist(&mut storage, &notes) {
            #[cfg(feature = "tracing")]
            error!("Could not write reconciled notes back to storage: {_e}");
        }

        let mut tick_manager: Option<TickManager> = None;
        if !options
            .tick_options
            .as_ref()
            .and_then(|o| o.disable_tick)
            .unwrap_or(false)
        {
            let tick_manager_options: Option<TickManagerOptions> = options
                .tick_options
                .as_ref()
                .map(|o| o.tick_manager_options.clone());
            tick_manager = Some(TickManager::new(tick_manager_options));
        }

        let instance = Self {
            notes: Arc::new(Mutex::new(notes)),
            storage,
            clock,
            tick_manager,
        };
        instance.register_default_tick_callback(options.tick_options.as_ref());
        instance
    }

    /// Registers the default refresh callback, unless the caller disabled it
    /// or supplied callbacks of their own.
    fn register_default_tick_callback(&self, tick_options: Option<&TickOptions>) {
        if tick_options
            .and_then(|o| o.disable_default_tick_callback)
            .unwrap_or(false)
        {
            return;
        }

        let caller_supplied = tick_options
            .map(|o| {
                o.tick_manager_options
                    .on_tick
                    .lock()
                    .is_ok_and(|callbacks| !callbacks.is_empty())
            })
            .unwrap_or(false);
        if caller_supplied {
            return;
        }

        if let Some(tick_manager) = self.tick_manager.as_ref() {
            let notes = self.notes.clone();
            let mut storage = self.storage.clone();
            let clock = self.clock.clone();
            tick_manager.register_callback(move || {
                if let Err(_e) = Self::refresh_core(&notes, &mut storage, clock.as_ref()) {
                    #[cfg(feature = "tracing")]
                    error!("Could not persist refreshed lock state: {_e}");
                }
            });
        }
    }

    /// Returns all notes in insertion order, each with its lock state freshly
    /// recomputed against the clock at call time.
    pub fn list(&self) -> Vec<Note> {
        let now = self.clock.now().naive_local();
        let notes = match self.notes.lock() {
            Ok(notes) => notes,
            Err(_) => {
                #[cfg(feature = "tracing")]
                error!("Could not acquire lock on notes during list");
                return Vec::new();
            }
        };
        notes
            .iter()
            .cloned()
            .map(|mut note| {
                note.is_unlocked = lock::evaluate(note.unlock_instant(), now);
                note
            })
            .collect()
    }

    /// Returns the `(unlocked, locked)` halves of [`list`](Self::list), each
    /// preserving insertion order.
    pub fn list_partitioned(&self) -> (Vec<Note>, Vec<Note>) {
        self.list().into_iter().partition(|note| note.is_unlocked)
    }

    /// Creates a note and persists the grown collection.
    ///
    /// The title and content are trimmed before the emptiness check. The
    /// unlock instant must lie strictly in the future; a note that would
    /// already be unlocked is rejected rather than created open.
    pub fn create(&mut self, draft: NoteDraft) -> Result<Note, CapsuleStoreError> {
        let now = self.clock.now();

        let title = draft.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        let content = draft.content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }

        let unlock_time = draft.unlock_time.unwrap_or(lock::DEFAULT_UNLOCK_TIME);
        let unlock_at = lock::unlock_instant(draft.unlock_date, unlock_time);
        if unlock_at <= now.naive_local() {
            return Err(ValidationError::UnlockNotInFuture.into());
        }

        let created_at = now.with_timezone(&Utc);
        let note = Note {
            id: NoteId::generate(created_at),
            title: title.to_owned(),
            content: content.to_owned(),
            unlock_date: draft.unlock_date,
            unlock_time,
            created_at,
            is_unlocked: lock::evaluate(unlock_at, now.naive_local()),
        };

        let Ok(mut notes) = self.notes.lock() else {
            #[cfg(feature = "tracing")]
            error!("Could not acquire lock on notes during create");
            return Err(StorageError::Unavailable.into());
        };
        notes.push(note.clone());
        Self::persist(&mut self.storage, &notes)?;

        Ok(note)
    }

    /// Removes the note with the given id and persists the result.
    ///
    /// Deleting an id that is not present is not an error; the collection is
    /// persisted either way.
    pub fn delete(&mut self, id: &NoteId) -> Result<(), CapsuleStoreError> {
        let Ok(mut notes) = self.notes.lock() else {
            #[cfg(feature = "tracing")]
            error!("Could not acquire lock on notes during delete");
            return Err(StorageError::Unavailable.into());
        };
        notes.retain(|note| &note.id != id);
        Self::persist(&mut self.storage, &notes)?;
        Ok(())
    }

    /// Re-evaluates every note's cached lock state against the clock.
    ///
    /// Persists and returns `true` only when at least one note flipped. This
    /// is what the default tick callback runs once per second.
    pub fn refresh(&mut self) -> Result<bool, CapsuleStoreError> {
        Self::refresh_core(&self.notes, &mut self.storage, self.clock.as_ref())
    }

    /// Stops the periodic refresh. Call when tearing down the surface that
    /// owns the store.
    pub fn stop_ticking(&mut self) {
        if let Some(tick_manager) = self.tick_manager.as_mut() {
            tick_manager.stop();
        }
        self.tick_manager = None;
    }

    fn refresh_core(
        notes: &Arc<Mutex<Vec<Note>>>,
        storage: &mut CapsuleStorageType,
        clock: &dyn Clock,
    ) -> Result<bool, CapsuleStoreError> {
        let now = clock.now().naive_local();
        let Ok(mut notes) = notes.lock() else {
            #[cfg(feature = "tracing")]
            error!("Could not acquire lock on notes during refresh");
            return Ok(false);
        };

        let mut changed = false;
        for note in notes.iter_mut() {
            let unlocked = lock::evaluate(note.unlock_instant(), now);
            if note.is_unlocked != unlocked {
                note.is_unlocked = unlocked;
                changed = true;
                #[cfg(feature = "tracing")]
                info!("Note {} is now {}", note.id, if unlocked { "unlocked" } else { "locked" });
            }
        }

        if changed {
            Self::persist(storage, &notes)?;
        }
        Ok(changed)
    }

    fn load(storage: &mut CapsuleStorageType) -> Vec<Note> {
        let raw = match storage.get(KEY_NOTES) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                warn!("Could not read persisted notes, starting empty: {_e}");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(notes) => notes,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                warn!("Persisted notes are malformed, starting empty: {_e}");
                Vec::new()
            }
        }
    }

    fn persist(storage: &mut CapsuleStorageType, notes: &[Note]) -> Result<(), StorageError> {
        let raw =
            serde_json::to_string(notes).map_err(|e| StorageError::Backend(e.to_string()))?;
        storage.set(KEY_NOTES, &raw)
    }
}

/// Options for creating a new [`CapsuleStore`].
#[derive(Default, Clone)]
pub struct CapsuleStoreCreateOptions {
    /// Optional storage backend. Defaults to [`LocalStorage`].
    pub storage: Option<CapsuleStorageType>,
    /// Optional clock. Defaults to [`SystemClock`](crate::clock::SystemClock).
    pub clock: Option<Arc<dyn Clock>>,
    /// Options for the periodic lock-state refresh. If not provided, default
    /// options will be used.
    pub tick_options: Option<TickOptions>,
}

/// Options for handling the periodic lock-state refresh.
#[derive(Default, Clone, Debug)]
pub struct TickOptions {
    /// If set to `true`, no tick manager is started.
    pub disable_tick: Option<bool>,
    /// If set to `true`, disables the default refresh callback.
    pub disable_default_tick_callback: Option<bool>,
    /// Options for the [`TickManager`] that drives the refresh.
    pub tick_manager_options: TickManagerOptions,
}

impl TickOptions {
    /// Returns a new `TickOptionsBuilder` to construct a `TickOptions` struct.
    pub fn builder() -> TickOptionsBuilder {
        TickOptionsBuilder::default()
    }
}

/// Builder for the [`TickOptions`].
#[derive(Default)]
pub struct TickOptionsBuilder {
    disable_tick: Option<bool>,
    disable_default_tick_callback: Option<bool>,
    tick_manager_options: Option<TickManagerOptions>,
}

impl TickOptionsBuilder {
    /// If set to `true`, no tick manager is started.
    pub fn disable_tick(mut self, disable_tick: bool) -> Self {
        self.disable_tick = Some(disable_tick);
        self
    }

    /// If set to `true`, disables the default refresh callback.
    pub fn disable_default_tick_callback(mut self, disable: bool) -> Self {
        self.disable_default_tick_callback = Some(disable);
        self
    }

    /// Options for the [`TickManager`] that drives the refresh.
    pub fn tick_manager_options(mut self, tick_manager_options: TickManagerOptions) -> Self {
        self.tick_manager_options = Some(tick_manager_options);
        self
    }

    /// Builds the [`TickOptions`] struct.
    pub fn build(self) -> TickOptions {
        TickOptions {
            disable_tick: self.disable_tick,
            disable_default_tick_callback: self.disable_default_tick_callback,
            tick_manager_options: self.tick_manager_options.unwrap_or_default(),
        }
    }
}

/// Builder for the [`CapsuleStore`].
pub struct CapsuleStoreBuilder {
    storage: Option<CapsuleStorageType>,
    clock: Option<Arc<dyn Clock>>,
    tick_options: Option<TickOptions>,
}

impl CapsuleStoreBuilder {
    fn new() -> Self {
        Self {
            storage: None,
            clock: None,
            tick_options: None,
        }
    }

    /// Storage backend for the note collection.
    pub fn storage(mut self, storage: CapsuleStorageType) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Source of the current instant.
    pub fn clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Options for the periodic lock-state refresh.
    pub fn tick_options(mut self, tick_options: TickOptions) -> Self {
        self.tick_options = Some(tick_options);
        self
    }

    /// If set to `true`, no tick manager is started.
    pub fn disable_tick(mut self, disable_tick: bool) -> Self {
        self.tick_options
            .get_or_insert_with(TickOptions::default)
            .disable_tick = Some(disable_tick);
        self
    }

    /// If set to `true`, disables the default refresh callback.
    pub fn disable_default_tick_callback(mut self, disable: bool) -> Self {
        self.tick_options
            .get_or_insert_with(TickOptions::default)
            .disable_default_tick_callback = Some(disable);
        self
    }

    /// The tick interval in milliseconds.
    pub fn tick_interval(mut self, interval: u32) -> Self {
        self.tick_options
            .get_or_insert_with(TickOptions::default)
            .tick_manager_options
            .interval = Some(interval);
        self
    }

    /// Adds a closure to be executed on every tick, replacing the default
    /// refresh callback.
    pub fn add_on_tick<F>(mut self, on_tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let options = self.tick_options.get_or_insert_with(TickOptions::default);
        if let Ok(mut callbacks) = options.tick_manager_options.on_tick.lock() {
            callbacks.push(Box::new(on_tick));
        }
        self
    }

    /// Builds the [`CapsuleStore`].
    pub fn build(self) -> CapsuleStore {
        CapsuleStore::new_with_options(CapsuleStoreCreateOptions {
            storage: self.storage,
            clock: self.clock,
            tick_options: self.tick_options,
        })
    }
}
