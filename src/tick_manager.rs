//! Periodic tick driver for refreshing note lock state.
//!
//! A [`TickManager`] fires its registered callbacks once per interval until it
//! is stopped or the last clone is dropped. On the web the interval is a
//! `setInterval` handle; natively it is a background tokio task, so a tokio
//! runtime must be running when the manager is created.

use std::{
    mem,
    sync::{Arc, Mutex},
};

#[cfg(not(target_family = "wasm"))]
mod native;
#[cfg(target_family = "wasm")]
mod wasm_js;

#[cfg(not(target_family = "wasm"))]
pub use native::TickManager;
#[cfg(target_family = "wasm")]
pub use wasm_js::TickManager;

pub(crate) type Callback = Box<dyn FnMut() + Send>;

/// State shared between a manager and its clones.
pub(crate) struct Context {
    pub(crate) callbacks: Arc<Mutex<Vec<Callback>>>,
}

/// Default tick interval in milliseconds (1 second).
pub const DEFAULT_TICK_INTERVAL: u32 = 1000;

/// Options for configuring a [`TickManager`].
#[derive(Default, Clone)]
pub struct TickManagerOptions {
    /// Callbacks to be executed on every tick.
    pub on_tick: Arc<Mutex<Vec<Callback>>>,
    /// The tick interval in milliseconds. Defaults to [`DEFAULT_TICK_INTERVAL`].
    pub interval: Option<u32>,
}

impl std::fmt::Debug for TickManagerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let callback_count = if let Ok(callbacks) = self.on_tick.lock() {
            callbacks.len()
        } else {
            0
        };
        f.debug_struct("TickManagerOptions")
            .field("on_tick", &format!("{} callbacks", callback_count))
            .field("interval", &self.interval)
            .finish()
    }
}

impl TickManagerOptions {
    /// Returns a new `TickManagerOptionsBuilder` to construct a
    /// `TickManagerOptions` struct.
    pub fn builder() -> TickManagerOptionsBuilder {
        TickManagerOptionsBuilder::default()
    }
}

/// Builder for the [`TickManagerOptions`].
#[derive(Default)]
pub struct TickManagerOptionsBuilder {
    on_tick: Vec<Callback>,
    interval: Option<u32>,
}

impl TickManagerOptionsBuilder {
    /// A callback function to be executed on every tick.
    pub fn on_tick(&mut self, on_tick: fn()) -> &mut Self {
        self.on_tick.push(Box::new(on_tick) as Callback);
        self
    }

    /// Adds a closure to be executed on every tick.
    pub fn add_on_tick<F>(&mut self, on_tick: F) -> &mut Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_tick.push(Box::new(on_tick));
        self
    }

    /// The tick interval in milliseconds.
    pub fn interval(&mut self, interval: u32) -> &mut Self {
        self.interval = Some(interval);
        self
    }

    /// Builds the [`TickManagerOptions`] struct.
    pub fn build(&mut self) -> TickManagerOptions {
        TickManagerOptions {
            on_tick: Arc::new(Mutex::new(mem::take(&mut self.on_tick))),
            interval: self.interval,
        }
    }
}
