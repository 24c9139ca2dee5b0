// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session status tracking and the status publication pipeline.

use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use wahub_bus::EventBus;
use wahub_core::SessionStatus;
use wahub_core::dto::MeInfo;
use wahub_core::dto::events::{EventPayload, SessionStatusEvent};

/// How long a session may sit in `STARTING` before it counts as stuck.
pub const STUCK_IN_STARTING_WINDOW: Duration = Duration::from_secs(120);

/// How long a `WORKING` publication is deferred while me-info is missing.
pub const WORKING_STATUS_DELAY: Duration = Duration::from_secs(2);

struct TrackerInner {
    status: SessionStatus,
    entered_at: Instant,
}

/// Remembers the current status and when it was entered.
pub struct StatusTracker {
    inner: StdMutex<TrackerInner>,
}

impl Default for StatusTracker {
    fn default() -> Self {
        StatusTracker {
            inner: StdMutex::new(TrackerInner {
                status: SessionStatus::Stopped,
                entered_at: Instant::now(),
            }),
        }
    }
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, status: SessionStatus) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.status != status {
            inner.status = status;
            inner.entered_at = Instant::now();
        }
    }

    pub fn current(&self) -> SessionStatus {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).status
    }

    /// True when the session has been `STARTING` for longer than `window`.
    pub fn stuck_in_starting(&self, window: Duration) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.status == SessionStatus::Starting && inner.entered_at.elapsed() >= window
    }
}

/// Publishes status changes onto the bus with the engine-independent rules:
/// `WORKING` is deferred while me-info is missing, consecutive `WORKING`
/// publications collapse into one, and while an unpair is in progress every
/// status except `STOPPED` is suppressed.
pub struct StatusPipeline {
    session: String,
    bus: Arc<EventBus>,
    tracker: Arc<StatusTracker>,
    me: StdRwLock<Option<MeInfo>>,
    unpairing: AtomicBool,
    pending_working: StdMutex<Option<JoinHandle<()>>>,
    last_published: StdMutex<Option<SessionStatus>>,
}

impl StatusPipeline {
    pub fn new(session: impl Into<String>, bus: Arc<EventBus>, tracker: Arc<StatusTracker>) -> Arc<Self> {
        Arc::new(StatusPipeline {
            session: session.into(),
            bus,
            tracker,
            me: StdRwLock::new(None),
            unpairing: AtomicBool::new(false),
            pending_working: StdMutex::new(None),
            last_published: StdMutex::new(None),
        })
    }

    pub fn me(&self) -> Option<MeInfo> {
        self.me.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_me(&self, me: Option<MeInfo>) {
        *self.me.write().unwrap_or_else(|e| e.into_inner()) = me;
    }

    pub fn set_unpairing(&self, unpairing: bool) {
        self.unpairing.store(unpairing, Ordering::Release);
    }

    pub fn is_unpairing(&self) -> bool {
        self.unpairing.load(Ordering::Acquire)
    }

    /// Accepts a raw status change from the engine.
    pub fn publish(self: &Arc<Self>, status: SessionStatus) {
        self.cancel_pending_working();
        if self.is_unpairing() && status != SessionStatus::Stopped {
            debug!(session = %self.session, status = %status,
                "suppressing status while unpairing");
            return;
        }
        self.tracker.record(status);
        if status == SessionStatus::Working && self.me().is_none() {
            // Me-info usually arrives right after the socket opens; give it
            // a moment so subscribers see WORKING with the account attached.
            let pipeline = Arc::clone(self);
            let handle = tokio::spawn(async move {
                tokio::time::sleep(WORKING_STATUS_DELAY).await;
                pipeline.publish_now(SessionStatus::Working);
            });
            *self
                .pending_working
                .lock()
                .unwrap_or_else(|e| e.into_inner()) = Some(handle);
            return;
        }
        self.publish_now(status);
    }

    fn cancel_pending_working(&self) {
        if let Some(handle) = self
            .pending_working
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
    }

    fn publish_now(&self, status: SessionStatus) {
        {
            let mut last = self.last_published.lock().unwrap_or_else(|e| e.into_inner());
            if status == SessionStatus::Working && *last == Some(SessionStatus::Working) {
                return;
            }
            *last = Some(status);
        }
        info!(session = %self.session, status = %status, "session status changed");
        self.bus.emit(EventPayload::SessionStatus(SessionStatusEvent {
            name: self.session.clone(),
            status,
        }));
    }
}

#[cfg(test)]
mod tests {
    use wahub_core::EventKind;

    use super::*;

    fn pipeline() -> (Arc<StatusPipeline>, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new("default"));
        let tracker = Arc::new(StatusTracker::new());
        (StatusPipeline::new("default", bus.clone(), tracker), bus)
    }

    fn status_of(envelope: &wahub_core::dto::events::EventEnvelope) -> SessionStatus {
        match &envelope.payload {
            EventPayload::SessionStatus(e) => e.status,
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn working_is_delayed_until_me_info_or_timeout() {
        let (pipeline, bus) = pipeline();
        let mut rx = bus.subscribe(EventKind::SessionStatus);

        pipeline.publish(SessionStatus::Working);
        // Nothing published yet; the delay is pending.
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(WORKING_STATUS_DELAY + Duration::from_millis(100)).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(status_of(&event), SessionStatus::Working);
    }

    #[tokio::test]
    async fn working_with_me_info_publishes_immediately() {
        let (pipeline, bus) = pipeline();
        let mut rx = bus.subscribe(EventKind::SessionStatus);
        pipeline.set_me(Some(MeInfo {
            id: "111@c.us".into(),
            push_name: Some("me".into()),
        }));
        pipeline.publish(SessionStatus::Working);
        let event = rx.recv().await.unwrap();
        assert_eq!(status_of(&event), SessionStatus::Working);
    }

    #[tokio::test]
    async fn consecutive_working_collapses() {
        let (pipeline, bus) = pipeline();
        let mut rx = bus.subscribe(EventKind::SessionStatus);
        pipeline.set_me(Some(MeInfo {
            id: "111@c.us".into(),
            push_name: None,
        }));
        pipeline.publish(SessionStatus::Working);
        pipeline.publish(SessionStatus::Working);
        pipeline.publish(SessionStatus::Stopped);
        pipeline.publish(SessionStatus::Working);

        assert_eq!(status_of(&rx.recv().await.unwrap()), SessionStatus::Working);
        assert_eq!(status_of(&rx.recv().await.unwrap()), SessionStatus::Stopped);
        assert_eq!(status_of(&rx.recv().await.unwrap()), SessionStatus::Working);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unpairing_suppresses_everything_but_stopped() {
        let (pipeline, bus) = pipeline();
        let mut rx = bus.subscribe(EventKind::SessionStatus);
        pipeline.set_unpairing(true);
        pipeline.publish(SessionStatus::Failed);
        pipeline.publish(SessionStatus::Starting);
        pipeline.publish(SessionStatus::Stopped);
        assert_eq!(status_of(&rx.recv().await.unwrap()), SessionStatus::Stopped);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_in_starting_detection() {
        let tracker = StatusTracker::new();
        tracker.record(SessionStatus::Starting);
        assert!(!tracker.stuck_in_starting(STUCK_IN_STARTING_WINDOW));
        tokio::time::sleep(STUCK_IN_STARTING_WINDOW + Duration::from_secs(1)).await;
        assert!(tracker.stuck_in_starting(STUCK_IN_STARTING_WINDOW));
        tracker.record(SessionStatus::Working);
        assert!(!tracker.stuck_in_starting(STUCK_IN_STARTING_WINDOW));
    }
}
