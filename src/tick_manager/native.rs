use super::{Context, TickManagerOptions, DEFAULT_TICK_INTERVAL};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::sync::watch;

/// Fires registered callbacks on a fixed interval from a background task.
///
/// The task ends when [`stop`](TickManager::stop) is called or when the last
/// clone of the manager is dropped.
#[derive(Clone)]
pub struct TickManager {
    context: Arc<Mutex<Context>>,
    interval: u32,
    running: Arc<AtomicBool>,
    _shutdown: Arc<watch::Receiver<()>>,
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

impl TickManager {
    /// Constructs a new [`TickManager`] with the given options and starts
    /// ticking.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(options: Option<TickManagerOptions>) -> Self {
        let callbacks = options
            .as_ref()
            .map(|options| options.on_tick.clone())
            .unwrap_or_else(|| Arc::new(Mutex::new(Vec::new())));

        let interval = options
            .as_ref()
            .and_then(|options| options.interval)
            .unwrap_or(DEFAULT_TICK_INTERVAL);

        let (shutdown_sender, shutdown_receiver) = watch::channel(());
        let running = Arc::new(AtomicBool::new(true));

        let task_callbacks = callbacks.clone();
        let task_running = running.clone();
        tokio::spawn(async move {
            let period = Duration::from_millis(interval as u64);
            // interval_at so the first tick lands one full period out.
            let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = ticks.tick() => {
                        if !task_running.load(Ordering::SeqCst) {
                            break;
                        }
                        if let Ok(mut callbacks) = task_callbacks.lock() {
                            for callback in callbacks.iter_mut() {
                                (callback)();
                            }
                        }
                    }
                    _ = shutdown_sender.closed() => {
                        // Last manager clone dropped
                        break;
                    }
                }
            }
        });

        Self {
            context: Arc::new(Mutex::new(Context { callbacks })),
            interval,
            running,
            _shutdown: Arc::new(shutdown_receiver),
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
        self.running.store(false, Ordering::SeqCst);
    }
}
