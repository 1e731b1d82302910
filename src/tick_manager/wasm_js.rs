use super::{Context, TickManagerOptions, DEFAULT_TICK_INTERVAL};
use gloo_timers::callback::Interval;
use std::{
    cell::RefCell,
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
#[cfg(feature = "tracing")]
use tracing::error;

thread_local! {
    // The `setInterval` handles are not Send, so they live here, keyed by the
    // owning manager's instance id.
    static INTERVALS: RefCell<HashMap<usize, Interval>> = RefCell::new(HashMap::new());
}

/// Fires registered callbacks on a fixed interval via `setInterval`.
///
/// Ticking ends when [`stop`](TickManager::stop) is called or when the last
/// clone of the manager is dropped.
#[derive(Clone)]
pub struct TickManager {
    context: Arc<Mutex<Context>>,
    interval: u32,
    /// A unique identifier for this instance and its clones, used to associate
    /// it with its thread-local interval handle. Wrapped in Arc so cleanup
    /// happens only when the last clone is dropped.
    id: Arc<usize>,
}

impl std::fmt::Debug for TickManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickManager")
            .field("interval", &self.interval)
            .field("callbacks", &{
                if let Ok(context) = self.context.lock() {
                    if let Ok(callbacks) = context.callbacks.lock() {
                        callbacks.len()
                    } else {
                        0
                    }
                } else {
                    0
                }
            })
            .finish()
    }
}

impl Drop for TickManager {
    fn drop(&mut self) {
        if Arc::strong_count(&self.id) == 1 {
            let id = *self.id;
            INTERVALS.with(|cell| match cell.try_borrow_mut() {
                Ok(mut map) => {
                    if let Some(handle) = map.remove(&id) {
                        handle.cancel();
                    }
                }
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    error!(
                        "TickManager::drop: could not remove interval for id {} (already borrowed)",
                        id
                    );
                }
            });
        }
    }
}

impl TickManager {
    /// Constructs a new [`TickManager`] with the given options and starts
    /// ticking.
    pub fn new(options: Option<TickManagerOptions>) -> Self {
        let callbacks = options
            .as_ref()
            .map(|options| options.on_tick.clone())
            .unwrap_or_else(|| Arc::new(Mutex::new(Vec::new())));

        let interval = options
            .as_ref()
            .and_then(|options| options.interval)
            .unwrap_or(DEFAULT_TICK_INTERVAL);

        // Generate a unique ID for this instance
        let id = {
            static NEXT_ID: AtomicUsize = AtomicUsize::new(1);
            // Relaxed ordering: only atomicity is needed, not synchronization.
            Arc::new(NEXT_ID.fetch_add(1, Ordering::Relaxed))
        };

        let tick_callbacks = callbacks.clone();
        let handle = Interval::new(interval, move || {
            if let Ok(mut callbacks) = tick_callbacks.lock() {
                for callback in callbacks.iter_mut() {
                    (callback)();
                }
            }
        });
        INTERVALS.with(|cell| {
            cell.borrow_mut().insert(*id, handle);
        });

        Self {
            context: Arc::new(Mutex::new(Context { callbacks })),
            interval,
            id,
        }
    }

    /// Registers a callback to be executed on every tick.
    pub fn register_callback<F>(&self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        if let Ok(context) = self.context.lock() {
            if let Ok(mut callbacks) = context.callbacks.lock() {
                callbacks.push(Box::new(callback));
            }
        }
    }

    /// Stops ticking. Affects every clone of this manager.
    pub fn stop(&mut self) {
        let id = *self.id;
        INTERVALS.with(|cell| {
            if let Some(handle) = cell.borrow_mut().remove(&id) {
                handle.cancel();
            }
        });
    }
}
