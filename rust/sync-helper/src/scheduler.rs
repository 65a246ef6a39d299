//! Periodic task runner
//!
//! Each task fires on a fixed period. A tick that lands while the previous
//! run is still in flight is dropped, never queued. Every run executes in its
//! own spawned task so an error or panic stays inside that run.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub struct PeriodicTask {
    name: &'static str,
    period: Duration,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the run ends, panics included
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl PeriodicTask {
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            period,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start one run unless the previous one is still going.
    ///
    /// Returns the handle of the supervising task, which completes once the
    /// run has finished and its outcome has been logged.
    pub fn try_launch<F, Fut, T, E>(&self, job: &F) -> Option<JoinHandle<()>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("⏭️  {} still running, skipping tick", self.name);
            return None;
        }

        let guard = InFlightGuard(self.in_flight.clone());
        let name = self.name;
        let run = tokio::spawn(job());

        Some(tokio::spawn(async move {
            let _guard = guard;
            match run.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("⚠️  {} failed: {}", name, e),
                Err(e) if e.is_panic() => error!("💥 {} panicked", name),
                Err(_) => debug!("{} cancelled", name),
            }
        }))
    }

    /// Run `job` every period, first run one period from now
    pub fn spawn<F, Fut, T, E>(self, job: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!("⏱️  {} scheduled every {:?}", self.name, self.period);

            loop {
                interval.tick().await;
                self.try_launch(&job);
            }
        })
    }
}
