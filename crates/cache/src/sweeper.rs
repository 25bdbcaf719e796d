//! Age-based cache maintenance
//!
//! The sweeper is a background thread owned by an unbounded cache strategy.
//! On a fixed interval it drops entries whose last touch is older than a
//! configured age. It must be stopped (and is joined) when the owning
//! connection disconnects; otherwise the thread would leak.

use crate::entry::{now_millis, CacheMap};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

struct SweeperInner {
    stopped: AtomicBool,
    wakeup: Condvar,
    gate: Mutex<()>,
}

/// Periodic age-based eviction worker
pub struct Sweeper {
    inner: Arc<SweeperInner>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    /// Spawn a sweeper over the shared cache map
    ///
    /// Entries older than `max_age` (by last touch) are dropped every
    /// `interval`.
    pub fn spawn(map: Arc<Mutex<CacheMap>>, max_age: Duration, interval: Duration) -> Self {
        let inner = Arc::new(SweeperInner {
            stopped: AtomicBool::new(false),
            wakeup: Condvar::new(),
            gate: Mutex::new(()),
        });

        let worker_inner = Arc::clone(&inner);
        let handle = std::thread::Builder::new()
            .name("docket-sweep".to_string())
            .spawn(move || loop {
                {
                    let mut gate = worker_inner.gate.lock();
                    if worker_inner.stopped.load(Ordering::Acquire) {
                        return;
                    }
                    let _ = worker_inner.wakeup.wait_for(&mut gate, interval);
                    if worker_inner.stopped.load(Ordering::Acquire) {
                        return;
                    }
                }

                let cutoff = now_millis().saturating_sub(max_age.as_millis() as u64);
                let mut map = map.lock();
                let before = map.len();
                map.retain(|_, entry| entry.touched_at >= cutoff);
                let dropped = before - map.len();
                if dropped > 0 {
                    debug!(dropped, "swept aged cache entries");
                }
            })
            .expect("failed to spawn cache sweeper thread");

        Sweeper {
            inner,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Signal the worker to exit and join it
    ///
    /// Idempotent: later calls find no handle and return immediately.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);

        // Lock the gate before notifying to prevent a lost wakeup: the
        // worker holds this lock between its stop check and its wait.
        {
            let _gate = self.inner.gate.lock();
            self.inner.wakeup.notify_all();
        }

        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}
