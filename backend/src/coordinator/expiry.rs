//! Background expiry sweeping
//!
//! Hosts that want periodic expiry (rather than calling
//! `SettlementCoordinator::sweep_expired` from their own scheduler) can spawn
//! an `ExpirySweeper`: a plain thread that sweeps on a fixed interval until
//! stopped. The sweep itself takes the per-proposal locks, so it is safe to
//! run alongside concurrent signature submissions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::coordinator::SettlementCoordinator;

/// Handle to a running background sweep thread
pub struct ExpirySweeper {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ExpirySweeper {
    /// Spawn a sweeper over `coordinator`, sweeping every `interval`.
    pub fn spawn(coordinator: Arc<SettlementCoordinator>, interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            debug!(interval_ms = interval.as_millis() as u64, "expiry sweeper started");
            while !stop_flag.load(Ordering::Relaxed) {
                coordinator.sweep_expired();
                thread::park_timeout(interval);
            }
            debug!("expiry sweeper stopped");
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signal the thread to stop and wait for it to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
