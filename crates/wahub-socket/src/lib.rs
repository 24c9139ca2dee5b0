// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The headless-socket engine.
//!
//! [`SocketSession`] drives one paired account over a [`SocketFactory`]
//! transport: it owns the reconnect state machine, normalizes the raw
//! socket events onto the bus lanes, projects them into the store, and
//! implements the [`Session`](wahub_core::Session) facade on top of both.

mod api;
mod convert;
mod events;
mod media;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use wahub_config::{SessionConfig, SocketEngineConfig};
use wahub_core::{EngineError, SessionStatus};
use wahub_proto::{
    CallStatus, GetMessageFn, MediaManager, SocketClient, SocketConfig, SocketFactory,
};
use wahub_session::{SessionContext, SingleDelayedJobRunner, SinglePeriodicJobRunner, TtlCache};
use wahub_store::{Repositories, SocketStore};

/// How long a reconnect waits before the next attempt.
const RESTART_DELAY: Duration = Duration::from_secs(2);

/// Jitter added on top of the configured auto-restart period.
const AUTO_RESTART_JITTER: Duration = Duration::from_secs(30);

const TEARDOWN_POLL: Duration = Duration::from_secs(1);
const TEARDOWN_CAP: Duration = Duration::from_secs(10);

/// How long a call id is remembered for duplicate-event suppression.
const CALL_LOG_TTL: Duration = Duration::from_secs(10 * 60);

/// A socket-backed session.
///
/// Construct with [`SocketSession::new`] and drive it through the
/// [`Session`](wahub_core::Session) trait. Dropping the last `Arc` without
/// calling [`destroy`](Self::destroy) leaks nothing but leaves bus
/// subscribers waiting forever.
pub struct SocketSession {
    weak: Weak<SocketSession>,
    ctx: Arc<SessionContext>,
    store: Arc<SocketStore>,
    factory: Arc<dyn SocketFactory>,
    media: Arc<dyn MediaManager>,
    engine_config: SocketEngineConfig,
    socket: StdRwLock<Option<Arc<dyn SocketClient>>>,
    pump: StdMutex<Option<JoinHandle<()>>>,
    restart: SingleDelayedJobRunner,
    auto_restart: SinglePeriodicJobRunner,
    should_restart: AtomicBool,
    /// Last observed status per call id, to suppress duplicate rejections
    /// and terminations of calls accepted on another device. Entries expire
    /// after [`CALL_LOG_TTL`] so the log cannot grow without bound.
    calls: TtlCache<CallStatus>,
}

impl SocketSession {
    pub fn new(
        config: &SessionConfig,
        print_qr: bool,
        factory: Arc<dyn SocketFactory>,
        media: Arc<dyn MediaManager>,
        repos: Repositories,
    ) -> Arc<Self> {
        let ctx = SessionContext::new(config.name.clone(), print_qr);
        let store = SocketStore::new(config.name.clone(), repos);
        Arc::new_cyclic(|weak| SocketSession {
            weak: weak.clone(),
            ctx,
            store,
            factory,
            media,
            engine_config: config.socket.clone(),
            socket: StdRwLock::new(None),
            pump: StdMutex::new(None),
            restart: SingleDelayedJobRunner::new(
                format!("{}-restart", config.name),
                RESTART_DELAY,
            ),
            auto_restart: SinglePeriodicJobRunner::new(format!("{}-auto-restart", config.name)),
            should_restart: AtomicBool::new(false),
            calls: TtlCache::new(CALL_LOG_TTL),
        })
    }

    /// Tears the session down for good: closes the bus so every subscriber
    /// observes the end of stream. Call after `stop`.
    pub fn destroy(&self) {
        self.media.close(&self.ctx.name);
        self.ctx.close();
    }

    fn arc(&self) -> Result<Arc<SocketSession>, EngineError> {
        self.weak
            .upgrade()
            .ok_or_else(|| EngineError::Internal("session handle dropped".into()))
    }

    fn socket_handle(&self) -> Option<Arc<dyn SocketClient>> {
        self.socket
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn client(&self) -> Result<Arc<dyn SocketClient>, EngineError> {
        self.socket_handle()
            .ok_or_else(|| EngineError::precondition("socket is not connected"))
    }

    fn store_backed(&self) -> Result<&SocketStore, EngineError> {
        if self.engine_config.store.enabled {
            Ok(&self.store)
        } else {
            Err(EngineError::precondition(
                "the store is disabled for this session",
            ))
        }
    }

    fn me_chat_id(&self) -> Option<String> {
        self.ctx.status.me().map(|m| m.id)
    }

    /// Connects a fresh socket and swaps the event pump over to it.
    ///
    /// Bus subscriber handles stay untouched; only the producer side of
    /// every lane is replaced.
    async fn connect(self: &Arc<Self>) -> Result<(), EngineError> {
        let store = Arc::clone(&self.store);
        let get_message: GetMessageFn = Arc::new(move |key| {
            let store = Arc::clone(&store);
            Box::pin(async move { store.get_message_content(&key).await })
        });
        let socket_config = SocketConfig {
            mark_online: self.engine_config.mark_online,
            full_sync: self.engine_config.store.full_sync,
        };
        let socket = self
            .factory
            .connect(&self.ctx.name, &socket_config, get_message)
            .await?;
        if self.engine_config.store.enabled {
            self.store.attach(Arc::clone(&socket));
        }
        *self.socket.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&socket));

        let lanes = events::switch_lanes(&self.ctx.bus);
        let stream = socket.subscribe();
        let pump = tokio::spawn(events::pump(Arc::clone(self), socket, stream, lanes));
        let mut guard = self.pump.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = guard.take() {
            old.abort();
        }
        *guard = Some(pump);
        Ok(())
    }

    async fn start_inner(self: &Arc<Self>) -> Result<(), EngineError> {
        match self.ctx.tracker.current() {
            SessionStatus::Starting | SessionStatus::ScanQrCode | SessionStatus::Working => {
                return Err(EngineError::precondition("session is already started"));
            }
            SessionStatus::Stopped | SessionStatus::Failed => {}
        }
        self.ctx.status.set_unpairing(false);
        self.should_restart.store(true, Ordering::Release);
        self.ctx.status.publish(SessionStatus::Starting);
        if let Err(err) = self.connect().await {
            warn!(session = %self.ctx.name, error = %err, "initial connect failed");
            self.ctx.status.publish(SessionStatus::Failed);
            self.schedule_restart();
            return Err(err);
        }
        if self.engine_config.auto_restart.enabled {
            let period = Duration::from_secs(self.engine_config.auto_restart.every_minutes * 60);
            let weak = self.weak.clone();
            self.auto_restart.start(period, AUTO_RESTART_JITTER, move || {
                let weak = weak.clone();
                async move {
                    if let Some(session) = weak.upgrade() {
                        session.auto_restart_tick().await;
                    }
                }
            });
        }
        Ok(())
    }

    /// Periodic proactive reconnect, keeps long-lived sockets healthy.
    async fn auto_restart_tick(self: &Arc<Self>) {
        let Some(socket) = self.socket_handle() else {
            return;
        };
        if socket.is_connecting() {
            debug!(session = %self.ctx.name, "skipping auto-restart, socket is connecting");
            return;
        }
        info!(session = %self.ctx.name, "auto-restarting session");
        socket.end().await;
        self.schedule_restart();
    }

    /// Schedules a delayed reconnect; storms coalesce into one attempt.
    fn schedule_restart(self: &Arc<Self>) {
        if !self.should_restart.load(Ordering::Acquire) {
            return;
        }
        let weak = self.weak.clone();
        let scheduled = self.restart.schedule(move || async move {
            let Some(session) = weak.upgrade() else {
                return;
            };
            if !session.should_restart.load(Ordering::Acquire) {
                session.restart.finished();
                return;
            }
            session.ctx.status.publish(SessionStatus::Starting);
            match session.connect().await {
                Ok(()) => session.restart.finished(),
                Err(err) => {
                    warn!(session = %session.ctx.name, error = %err, "reconnect failed");
                    session.ctx.status.publish(SessionStatus::Failed);
                    session.restart.finished();
                    session.schedule_restart();
                }
            }
        });
        if !scheduled {
            debug!(session = %self.ctx.name, "restart already pending");
        }
    }

    async fn stop_inner(&self) -> Result<(), EngineError> {
        self.should_restart.store(false, Ordering::Release);
        self.restart.cancel();
        self.auto_restart.stop();
        self.teardown(false).await;
        self.ctx.set_qr(None);
        self.ctx.status.publish(SessionStatus::Stopped);
        Ok(())
    }

    async fn unpair_inner(&self) -> Result<(), EngineError> {
        self.ctx.status.set_unpairing(true);
        self.should_restart.store(false, Ordering::Release);
        self.restart.cancel();
        self.auto_restart.stop();
        self.teardown(true).await;
        self.ctx.set_qr(None);
        self.ctx.status.publish(SessionStatus::Stopped);
        self.ctx.status.set_unpairing(false);
        Ok(())
    }

    /// Releases the current socket and its pump. A socket still in its
    /// connecting phase gets a bounded grace period before being ended.
    async fn teardown(&self, logout: bool) {
        let socket = self
            .socket
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(socket) = socket {
            if logout {
                if let Err(err) = socket.logout().await {
                    warn!(session = %self.ctx.name, error = %err, "logout failed");
                }
            }
            let started = tokio::time::Instant::now();
            while socket.is_connecting() && started.elapsed() < TEARDOWN_CAP {
                tokio::time::sleep(TEARDOWN_POLL).await;
            }
            socket.end().await;
        }
        if let Some(pump) = self
            .pump
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            pump.abort();
        }
    }
}
