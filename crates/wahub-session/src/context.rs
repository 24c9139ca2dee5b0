// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine-independent state every session carries.

use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use wahub_bus::EventBus;
use wahub_core::MessageSource;

use crate::cache::TtlCache;
use crate::qr;
use crate::status::{StatusPipeline, StatusTracker};

/// Profile picture urls stay cached for a day; `None` is cached too.
pub const PROFILE_PICTURES_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Ids of messages sent through the API, kept long enough to classify acks.
pub const SENT_MESSAGE_IDS_TTL: Duration = Duration::from_secs(10 * 60);

/// How long a profile update waits before re-resolving the own picture.
pub const PICTURE_REFRESH_DELAY: Duration = Duration::from_secs(3);

/// Shared, engine-independent session state: the bus, the status pipeline,
/// the current QR, and the TTL caches.
pub struct SessionContext {
    pub name: String,
    pub bus: Arc<EventBus>,
    pub tracker: Arc<StatusTracker>,
    pub status: Arc<StatusPipeline>,
    /// Cached picture urls keyed by chat id; `Some(None)` means "known to
    /// have no picture".
    pub profile_pictures: TtlCache<Option<String>>,
    sent_message_ids: TtlCache<()>,
    qr: StdMutex<Option<String>>,
    print_qr: bool,
    deferred_refresh: StdMutex<Option<JoinHandle<()>>>,
}

impl SessionContext {
    pub fn new(name: impl Into<String>, print_qr: bool) -> Arc<Self> {
        let name = name.into();
        let bus = Arc::new(EventBus::new(name.clone()));
        let tracker = Arc::new(StatusTracker::new());
        let status = StatusPipeline::new(name.clone(), bus.clone(), tracker.clone());
        Arc::new(SessionContext {
            name,
            bus,
            tracker,
            status,
            profile_pictures: TtlCache::new(PROFILE_PICTURES_TTL),
            sent_message_ids: TtlCache::new(SENT_MESSAGE_IDS_TTL),
            qr: StdMutex::new(None),
            print_qr,
            deferred_refresh: StdMutex::new(None),
        })
    }

    /// Stores the current QR payload; `None` clears it (pairing finished).
    pub fn set_qr(&self, raw: Option<String>) {
        if let Some(raw) = &raw {
            if self.print_qr {
                match qr::render_terminal(raw) {
                    Ok(rendered) => {
                        info!(session = %self.name, "scan the QR code to pair:\n{rendered}");
                    }
                    Err(err) => {
                        info!(session = %self.name, error = %err, "could not render QR");
                    }
                }
            }
        }
        *self.qr.lock().unwrap_or_else(|e| e.into_inner()) = raw;
    }

    pub fn qr(&self) -> Option<String> {
        self.qr.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Remembers an id of a message sent through this API.
    pub fn record_sent_id(&self, id: &str) {
        self.sent_message_ids.insert(id, ());
    }

    /// Classifies an outgoing message: sent via this API, or from the
    /// account's own app.
    pub fn message_source(&self, id: &str) -> MessageSource {
        if self.sent_message_ids.contains(id) {
            MessageSource::Api
        } else {
            MessageSource::App
        }
    }

    /// Schedules a deferred task owned by this session, cancelling any
    /// previously scheduled one. Used for the post-update picture refresh.
    pub fn schedule_deferred<Fut>(&self, delay: Duration, task: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut guard = self
            .deferred_refresh
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = guard.take() {
            previous.abort();
        }
        *guard = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    /// Tears down everything the context owns.
    pub fn close(&self) {
        if let Some(task) = self
            .deferred_refresh
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            task.abort();
        }
        self.bus.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sent_id_cache_drives_message_source() {
        let ctx = SessionContext::new("default", false);
        ctx.record_sent_id("AAAA");
        assert_eq!(ctx.message_source("AAAA"), MessageSource::Api);
        assert_eq!(ctx.message_source("BBBB"), MessageSource::App);
    }

    #[tokio::test(start_paused = true)]
    async fn deferred_tasks_replace_each_other() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let ctx = SessionContext::new("default", false);
        let runs = Arc::new(AtomicUsize::new(0));

        let r = runs.clone();
        ctx.schedule_deferred(Duration::from_secs(3), async move {
            r.fetch_add(1, Ordering::SeqCst);
        });
        // Scheduling again cancels the first task.
        let r = runs.clone();
        ctx.schedule_deferred(Duration::from_secs(3), async move {
            r.fetch_add(10, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn qr_roundtrip() {
        let ctx = SessionContext::new("default", false);
        assert_eq!(ctx.qr(), None);
        ctx.set_qr(Some("2@payload".into()));
        assert_eq!(ctx.qr().as_deref(), Some("2@payload"));
        ctx.set_qr(None);
        assert_eq!(ctx.qr(), None);
    }
}
