// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job runners used by the session state machine.
//!
//! [`SingleDelayedJobRunner`] coalesces restart storms: while one restart is
//! pending or running, further schedule calls are rejected.
//! [`SinglePeriodicJobRunner`] drives the jittered auto-restart loop.

use std::future::Future;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs at most one delayed job at a time.
pub struct SingleDelayedJobRunner {
    name: String,
    delay: Duration,
    busy: AtomicBool,
    token: StdMutex<CancellationToken>,
}

impl SingleDelayedJobRunner {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        SingleDelayedJobRunner {
            name: name.into(),
            delay,
            busy: AtomicBool::new(false),
            token: StdMutex::new(CancellationToken::new()),
        }
    }

    /// Schedules `job` to run after the configured delay.
    ///
    /// Returns `false` without scheduling when a previous job is still
    /// pending or running; the flag clears only once that job finishes.
    pub fn schedule<F, Fut>(&self, job: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        if self.busy.swap(true, Ordering::AcqRel) {
            debug!(runner = %self.name, "job already scheduled, ignoring");
            return false;
        }
        let token = self
            .token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let delay = self.delay;
        let name = self.name.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(runner = %name, "scheduled job cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    job().await;
                }
            }
        });
        true
    }

    /// Cancels a pending job (a job already running is not interrupted) and
    /// clears the single-flight flag.
    pub fn cancel(&self) {
        let mut guard = self.token.lock().unwrap_or_else(|e| e.into_inner());
        guard.cancel();
        *guard = CancellationToken::new();
        self.busy.store(false, Ordering::Release);
    }

    /// Clears the single-flight flag once a job has finished.
    pub fn finished(&self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Runs a job periodically with random jitter on every tick.
pub struct SinglePeriodicJobRunner {
    name: String,
    running: AtomicBool,
    token: StdMutex<CancellationToken>,
}

impl SinglePeriodicJobRunner {
    pub fn new(name: impl Into<String>) -> Self {
        SinglePeriodicJobRunner {
            name: name.into(),
            running: AtomicBool::new(false),
            token: StdMutex::new(CancellationToken::new()),
        }
    }

    /// Starts the loop; a second start while running is a no-op.
    pub fn start<F, Fut>(&self, period: Duration, jitter: Duration, job: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        if self.running.swap(true, Ordering::AcqRel) {
            debug!(runner = %self.name, "periodic job already running");
            return;
        }
        let token = self
            .token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let name = self.name.clone();
        tokio::spawn(async move {
            loop {
                let pause = period + random_jitter(jitter);
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!(runner = %name, "periodic job stopped");
                        break;
                    }
                    _ = tokio::time::sleep(pause) => {
                        job().await;
                    }
                }
            }
        });
    }

    pub fn stop(&self) {
        let mut guard = self.token.lock().unwrap_or_else(|e| e.into_inner());
        guard.cancel();
        *guard = CancellationToken::new();
        self.running.store(false, Ordering::Release);
    }
}

fn random_jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let millis = rand::thread_rng().gen_range(0..=max.as_millis() as u64);
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn delayed_runner_is_single_flight() {
        let runner = Arc::new(SingleDelayedJobRunner::new("restart", Duration::from_secs(2)));
        let runs = Arc::new(AtomicUsize::new(0));

        let r = runs.clone();
        assert!(runner.schedule(move || async move {
            r.fetch_add(1, Ordering::SeqCst);
        }));
        // Second schedule while the first is pending is rejected.
        let r = runs.clone();
        assert!(!runner.schedule(move || async move {
            r.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // After finishing, a new job can be scheduled again.
        runner.finished();
        let r = runs.clone();
        assert!(runner.schedule(move || async move {
            r.fetch_add(1, Ordering::SeqCst);
        }));
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_a_pending_job() {
        let runner = SingleDelayedJobRunner::new("restart", Duration::from_secs(2));
        let runs = Arc::new(AtomicUsize::new(0));
        let r = runs.clone();
        runner.schedule(move || async move {
            r.fetch_add(1, Ordering::SeqCst);
        });
        runner.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_runner_fires_until_stopped() {
        let runner = Arc::new(SinglePeriodicJobRunner::new("auto-restart"));
        let runs = Arc::new(AtomicUsize::new(0));
        let r = runs.clone();
        runner.start(Duration::from_secs(60), Duration::ZERO, move || {
            let r = r.clone();
            async move {
                r.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_secs(185)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        runner.stop();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
