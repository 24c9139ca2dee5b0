// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-session event bus.
//!
//! Each event kind gets its own lane: a broadcast channel whose subscriber
//! handles stay valid for the lifetime of the session, plus at most one
//! producer task feeding it. When the engine reconnects it calls
//! [`EventBus::switch`] with a fresh producer stream; subscribers never
//! notice. Failed items on a producer stream are logged and skipped so one
//! bad conversion can never wedge a lane.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use wahub_core::dto::events::{EventEnvelope, EventPayload};
use wahub_core::ids::prefixed_id;
use wahub_core::{EngineError, EventKind};

const LANE_CAPACITY: usize = 512;

struct Lane {
    sender: broadcast::Sender<EventEnvelope>,
    producer: Option<JoinHandle<()>>,
}

/// One bus per session. Cheap to share behind an `Arc`.
pub struct EventBus {
    session: String,
    lanes: Mutex<HashMap<EventKind, Lane>>,
    completed: AtomicBool,
}

impl EventBus {
    pub fn new(session: impl Into<String>) -> Self {
        EventBus {
            session: session.into(),
            lanes: Mutex::new(HashMap::new()),
            completed: AtomicBool::new(false),
        }
    }

    /// Subscribes to one lane, creating it lazily.
    ///
    /// After [`complete`](Self::complete) the returned receiver is already
    /// closed, so late subscribers observe a deterministic end of stream.
    pub fn subscribe(&self, kind: EventKind) -> broadcast::Receiver<EventEnvelope> {
        if self.completed.load(Ordering::Acquire) {
            let (sender, receiver) = broadcast::channel(1);
            drop(sender);
            return receiver;
        }
        let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
        let lane = lanes.entry(kind).or_insert_with(Self::new_lane);
        lane.sender.subscribe()
    }

    /// Publishes one payload directly onto its lane, tagging it on the way.
    pub fn emit(&self, payload: EventPayload) {
        if self.completed.load(Ordering::Acquire) {
            return;
        }
        let kind = payload.kind();
        let sender = {
            let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
            let lane = lanes.entry(kind).or_insert_with(Self::new_lane);
            lane.sender.clone()
        };
        // A send error just means nobody is listening right now.
        let _ = sender.send(envelope(&self.session, payload));
    }

    /// Atomically replaces the producer of one lane.
    ///
    /// The previous producer task (if any) is aborted first, so events from
    /// an old engine incarnation can never interleave with the new one.
    /// `Err` items on the stream are logged and dropped.
    pub fn switch(
        &self,
        kind: EventKind,
        mut stream: mpsc::UnboundedReceiver<Result<EventPayload, EngineError>>,
    ) {
        if self.completed.load(Ordering::Acquire) {
            return;
        }
        let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
        let lane = lanes.entry(kind).or_insert_with(Self::new_lane);
        if let Some(old) = lane.producer.take() {
            old.abort();
        }
        let sender = lane.sender.clone();
        let session = self.session.clone();
        lane.producer = Some(tokio::spawn(async move {
            while let Some(item) = stream.recv().await {
                match item {
                    Ok(payload) => {
                        let _ = sender.send(envelope(&session, payload));
                    }
                    Err(err) => {
                        warn!(session = %session, event = %kind, error = %err,
                            "dropping failed event conversion");
                    }
                }
            }
            debug!(session = %session, event = %kind, "event producer finished");
        }));
    }

    /// Shuts the bus down: aborts every producer and closes every lane so
    /// all subscribers observe the end of stream.
    pub fn complete(&self) {
        self.completed.store(true, Ordering::Release);
        let lanes = {
            let mut guard = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        for (_, lane) in lanes {
            if let Some(producer) = lane.producer {
                producer.abort();
            }
            // Dropping the sender closes the lane for its subscribers.
        }
        debug!(session = %self.session, "event bus completed");
    }

    fn new_lane() -> Lane {
        let (sender, _) = broadcast::channel(LANE_CAPACITY);
        Lane {
            sender,
            producer: None,
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        let lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
        for lane in lanes.values() {
            if let Some(producer) = &lane.producer {
                producer.abort();
            }
        }
    }
}

fn envelope(session: &str, payload: EventPayload) -> EventEnvelope {
    EventEnvelope {
        id: prefixed_id("evt"),
        timestamp: chrono::Utc::now().timestamp_millis(),
        session: session.to_string(),
        payload,
    }
}

#[cfg(test)]
mod tests {
    use wahub_core::SessionStatus;
    use wahub_core::dto::events::SessionStatusEvent;

    use super::*;

    fn status_payload(status: SessionStatus) -> EventPayload {
        EventPayload::SessionStatus(SessionStatusEvent {
            name: "default".into(),
            status,
        })
    }

    #[tokio::test]
    async fn emit_tags_each_event_once() {
        let bus = EventBus::new("default");
        let mut rx = bus.subscribe(EventKind::SessionStatus);
        bus.emit(status_payload(SessionStatus::Starting));
        bus.emit(status_payload(SessionStatus::Working));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(first.id.starts_with("evt_"));
        assert_ne!(first.id, second.id);
        assert_eq!(first.session, "default");
    }

    #[tokio::test]
    async fn producer_errors_are_skipped() {
        let bus = EventBus::new("default");
        let mut rx = bus.subscribe(EventKind::SessionStatus);

        let (tx, stream) = mpsc::unbounded_channel();
        bus.switch(EventKind::SessionStatus, stream);
        tx.send(Err(EngineError::transient("boom"))).unwrap();
        tx.send(Ok(status_payload(SessionStatus::Working))).unwrap();

        let delivered = rx.recv().await.unwrap();
        assert_eq!(
            delivered.payload,
            status_payload(SessionStatus::Working)
        );
    }

    #[tokio::test]
    async fn subscribers_survive_a_producer_switch() {
        let bus = EventBus::new("default");
        let mut rx = bus.subscribe(EventKind::SessionStatus);

        let (tx1, stream1) = mpsc::unbounded_channel();
        bus.switch(EventKind::SessionStatus, stream1);
        tx1.send(Ok(status_payload(SessionStatus::Starting))).unwrap();
        assert!(rx.recv().await.is_ok());

        // Reconnect: new producer, same subscriber handle.
        let (tx2, stream2) = mpsc::unbounded_channel();
        bus.switch(EventKind::SessionStatus, stream2);
        tx2.send(Ok(status_payload(SessionStatus::Working))).unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.payload, status_payload(SessionStatus::Working));
    }

    #[tokio::test]
    async fn complete_closes_every_lane() {
        let bus = EventBus::new("default");
        let mut rx = bus.subscribe(EventKind::Message);
        bus.complete();
        assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Closed)));

        // Late subscribers get an already-closed receiver.
        let mut late = bus.subscribe(EventKind::Message);
        assert!(matches!(late.recv().await, Err(broadcast::error::RecvError::Closed)));
    }
}
