// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The event pump: raw socket events in, normalized bus payloads out.
//!
//! Each connected socket gets its own pump task. Events are projected into
//! the store first, then emitted on the bus, so a subscriber reacting to an
//! event always finds the store already consistent with it. Every raw event
//! is additionally mirrored untyped onto the `engine.event` lane.

use std::collections::HashMap;
use std::sync::Arc;

use strum::IntoEnumIterator;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use wahub_bus::EventBus;
use wahub_core::dto::events::{
    EventPayload, MessageAckEvent, MessageReactionEvent, MessageRevokedEvent, ReactionBody,
    StateChangeEvent,
};
use wahub_core::dto::groups::{
    GroupParticipantChange, GroupV2JoinEvent, GroupV2LeaveEvent, GroupV2ParticipantsEvent,
    GroupV2UpdateEvent,
};
use wahub_core::dto::labels::LabelChatAssociation;
use wahub_core::dto::polls::{MessageDestination, PollVote, PollVotePayload};
use wahub_core::dto::{MeInfo, PaginationParams};
use wahub_core::{EngineError, EventKind, MessageAck, SessionStatus, jid};
use wahub_proto::{
    CallEvent, CallStatus, ConnectionState, ConnectionUpdate, ContactUpdate, DisconnectReason,
    LabelAssociationAction, LabelAssociationKind, MessageContent, MessageReaction, MessageUpdate,
    MessageUpdateFields, MessageUpsertType, ParticipantAction, PresenceEntry, ProfilePictureHint,
    ProtocolMessage, SocketClient, SocketEvent, SocketMessage, SocketMessageKey, SocketPresence,
};
use wahub_session::STUCK_IN_STARTING_WINDOW;

use crate::SocketSession;
use crate::convert;
use crate::media::SocketMediaProcessor;

pub(crate) type Lanes = HashMap<EventKind, mpsc::UnboundedSender<Result<EventPayload, EngineError>>>;

/// Replaces the producer of every bus lane with a fresh channel and returns
/// the sending ends. Subscriber handles survive the switch.
pub(crate) fn switch_lanes(bus: &EventBus) -> Lanes {
    let mut lanes = Lanes::new();
    for kind in EventKind::iter() {
        let (tx, rx) = mpsc::unbounded_channel();
        bus.switch(kind, rx);
        lanes.insert(kind, tx);
    }
    lanes
}

fn emit(lanes: &Lanes, payload: EventPayload) {
    if let Some(tx) = lanes.get(&payload.kind()) {
        let _ = tx.send(Ok(payload));
    }
}

/// Consumes one socket's event stream until it closes. The receiver is
/// subscribed before the pump task is spawned, so no event can slip between
/// connecting and consuming.
pub(crate) async fn pump(
    session: Arc<SocketSession>,
    socket: Arc<dyn SocketClient>,
    mut events: broadcast::Receiver<SocketEvent>,
    lanes: Lanes,
) {
    loop {
        match events.recv().await {
            Ok(event) => handle_event(&session, &socket, &lanes, event).await,
            Err(RecvError::Lagged(skipped)) => {
                warn!(session = %session.ctx.name, skipped, "event pump lagged behind the socket");
            }
            Err(RecvError::Closed) => break,
        }
    }
    debug!(session = %session.ctx.name, "event pump finished");
}

/// Projects the event into the store when enabled.
async fn project(session: &SocketSession, event: SocketEvent) {
    if session.engine_config.store.enabled {
        session.store.apply(event).await;
    }
}

async fn handle_event(
    session: &Arc<SocketSession>,
    socket: &Arc<dyn SocketClient>,
    lanes: &Lanes,
    event: SocketEvent,
) {
    match serde_json::to_value(&event) {
        Ok(raw) => emit(lanes, EventPayload::EngineEvent(raw)),
        Err(err) => {
            warn!(session = %session.ctx.name, error = %err, "could not mirror raw event");
        }
    }

    match event {
        SocketEvent::ConnectionUpdate(update) => {
            on_connection_update(session, socket, lanes, update).await;
        }
        SocketEvent::MessagesUpsert {
            messages,
            upsert_type,
        } => {
            on_messages_upsert(session, lanes, messages, upsert_type).await;
        }
        SocketEvent::MessagesUpdate(updates) => {
            on_messages_update(session, lanes, updates).await;
        }
        SocketEvent::MessagesReaction(reactions) => {
            project(session, SocketEvent::MessagesReaction(reactions.clone())).await;
            let me = session.me_chat_id();
            for reaction in reactions {
                emit(lanes, reaction_payload(&reaction, me.as_deref()));
            }
        }
        SocketEvent::MessageReceiptUpdate(receipts) => {
            project(session, SocketEvent::MessageReceiptUpdate(receipts.clone())).await;
            let me = session.me_chat_id();
            for receipt in receipts {
                let ack = if receipt.receipt.played_timestamp.is_some() {
                    MessageAck::Played
                } else if receipt.receipt.read_timestamp.is_some() {
                    MessageAck::Read
                } else {
                    continue;
                };
                let mut event = ack_event(&receipt.key, ack, me.as_deref());
                event.participant = Some(jid::to_chat_id(&receipt.receipt.user_jid));
                emit(lanes, EventPayload::MessageAck(event));
            }
        }
        SocketEvent::GroupsUpsert(groups) => {
            project(session, SocketEvent::GroupsUpsert(groups.clone())).await;
            for group in groups {
                emit(
                    lanes,
                    EventPayload::GroupV2Join(GroupV2JoinEvent {
                        group: convert::to_group(&group),
                    }),
                );
            }
        }
        SocketEvent::GroupsUpdate(updates) => {
            project(session, SocketEvent::GroupsUpdate(updates.clone())).await;
            for update in updates {
                emit(
                    lanes,
                    EventPayload::GroupV2Update(GroupV2UpdateEvent {
                        group_id: update.id,
                        subject: update.subject,
                        description: update.description,
                        members_can_send_messages: update.announce.map(|a| !a),
                        members_can_edit_group_info: update.restrict.map(|r| !r),
                    }),
                );
            }
        }
        SocketEvent::GroupParticipantsUpdate {
            id,
            author,
            action,
            participants,
        } => {
            project(
                session,
                SocketEvent::GroupParticipantsUpdate {
                    id: id.clone(),
                    author,
                    action,
                    participants: participants.clone(),
                },
            )
            .await;
            let me = session.me_chat_id();
            let mapped: Vec<String> = participants.iter().map(|p| jid::to_chat_id(p)).collect();
            if action == ParticipantAction::Remove {
                if let Some(me) = &me {
                    if mapped.iter().any(|p| p == me) {
                        emit(
                            lanes,
                            EventPayload::GroupV2Leave(GroupV2LeaveEvent {
                                group_id: id.clone(),
                            }),
                        );
                    }
                }
            }
            emit(
                lanes,
                EventPayload::GroupV2Participants(GroupV2ParticipantsEvent {
                    group_id: id,
                    action: match action {
                        ParticipantAction::Add => GroupParticipantChange::Add,
                        ParticipantAction::Remove => GroupParticipantChange::Remove,
                        ParticipantAction::Promote => GroupParticipantChange::Promote,
                        ParticipantAction::Demote => GroupParticipantChange::Demote,
                    },
                    participants: mapped,
                    timestamp: chrono::Utc::now().timestamp(),
                }),
            );
        }
        SocketEvent::LabelsEdit(label) => {
            project(session, SocketEvent::LabelsEdit(label.clone())).await;
            let payload = if label.deleted {
                EventPayload::LabelDeleted(convert::to_label(&label))
            } else {
                EventPayload::LabelUpsert(convert::to_label(&label))
            };
            emit(lanes, payload);
        }
        SocketEvent::LabelsAssociation {
            association,
            action,
        } => {
            project(
                session,
                SocketEvent::LabelsAssociation {
                    association: association.clone(),
                    action,
                },
            )
            .await;
            if association.kind != LabelAssociationKind::Chat {
                return;
            }
            let label = match session.store_backed() {
                Ok(store) => store
                    .get_label(&association.label_id)
                    .await
                    .ok()
                    .flatten()
                    .map(|l| convert::to_label(&l)),
                Err(_) => None,
            };
            let payload = LabelChatAssociation {
                label_id: association.label_id,
                chat_id: jid::to_chat_id(&association.chat_id),
                label,
            };
            emit(
                lanes,
                match action {
                    LabelAssociationAction::Add => EventPayload::LabelChatAdded(payload),
                    LabelAssociationAction::Remove => EventPayload::LabelChatDeleted(payload),
                },
            );
        }
        SocketEvent::PresenceUpdate { id, presences } => {
            project(
                session,
                SocketEvent::PresenceUpdate {
                    id: id.clone(),
                    presences: presences.clone(),
                },
            )
            .await;
            emit(
                lanes,
                EventPayload::PresenceUpdate(convert::to_chat_presences(&id, &presences)),
            );
        }
        SocketEvent::Call(calls) => {
            for call in calls {
                on_call(session, lanes, call);
            }
        }
        SocketEvent::ContactsUpdate(updates) => {
            project(session, SocketEvent::ContactsUpdate(updates.clone())).await;
            on_contacts_update(session, socket, updates).await;
        }
        // Store-only and lifecycle events; already mirrored raw above.
        SocketEvent::MessagingHistorySet { .. }
        | SocketEvent::ChatsUpsert(_)
        | SocketEvent::ChatsUpdate(_)
        | SocketEvent::ChatsDelete(_)
        | SocketEvent::ContactsUpsert(_)
        | SocketEvent::MessagesDelete(_) => {
            project(session, event).await;
        }
        SocketEvent::CredsUpdate => {}
    }
}

/// Keeps the profile-picture cache in step with `contacts.update` hints.
/// A changed picture is re-resolved once and cached under both the public
/// chat id and the bare number, so lookups by either form stay warm.
async fn on_contacts_update(
    session: &Arc<SocketSession>,
    socket: &Arc<dyn SocketClient>,
    updates: Vec<ContactUpdate>,
) {
    for update in updates {
        let url = match &update.img_url {
            Some(ProfilePictureHint::Changed) => {
                match socket.profile_picture_url(&update.id).await {
                    Ok(url) => url,
                    Err(err) => {
                        warn!(
                            session = %session.ctx.name,
                            contact = %update.id,
                            error = %err,
                            "could not refresh profile picture"
                        );
                        continue;
                    }
                }
            }
            Some(ProfilePictureHint::Url(url)) => Some(url.clone()),
            Some(ProfilePictureHint::Removed) => None,
            None => continue,
        };
        let chat_id = jid::to_chat_id(&update.id);
        if let Some(bare) = chat_id.split('@').next() {
            session
                .ctx
                .profile_pictures
                .insert(bare.to_string(), url.clone());
        }
        session.ctx.profile_pictures.insert(chat_id, url);
    }
}

// --- connection ---

async fn on_connection_update(
    session: &Arc<SocketSession>,
    socket: &Arc<dyn SocketClient>,
    lanes: &Lanes,
    update: ConnectionUpdate,
) {
    if let Some(qr) = update.qr {
        session.ctx.set_qr(Some(qr));
        session.ctx.status.publish(SessionStatus::ScanQrCode);
    }
    match update.connection {
        Some(ConnectionState::Connecting) => {
            emit(lanes, state_change("connecting"));
        }
        Some(ConnectionState::Open) => {
            session.ctx.set_qr(None);
            let me = socket.me().map(|m| MeInfo {
                id: jid::to_chat_id(&m.id),
                push_name: m.push_name,
            });
            session.ctx.status.set_me(me.clone());
            session.store.set_me(me.map(|m| m.id));
            session.ctx.status.publish(SessionStatus::Working);
            emit(lanes, state_change("open"));
            resubscribe_presences(session, socket);
        }
        Some(ConnectionState::Close) => {
            emit(lanes, state_change("close"));
            on_close(session, update.last_disconnect);
        }
        None => {}
    }
}

fn state_change(state: &str) -> EventPayload {
    EventPayload::StateChange(StateChangeEvent {
        state: state.to_string(),
    })
}

/// Decides what a socket close means for the session lifecycle.
fn on_close(session: &Arc<SocketSession>, reason: Option<DisconnectReason>) {
    let reason = reason.unwrap_or(DisconnectReason::Unknown);
    if reason == DisconnectReason::RestartRequired {
        session.ctx.status.publish(SessionStatus::Starting);
        session.schedule_restart();
        return;
    }
    if session.ctx.tracker.stuck_in_starting(STUCK_IN_STARTING_WINDOW) {
        warn!(session = %session.ctx.name, "stuck in STARTING, giving up on reconnects");
        session.ctx.status.publish(SessionStatus::Failed);
        return;
    }
    if session.ctx.tracker.current() == SessionStatus::ScanQrCode {
        // The QR expired without a scan; a silent reconnect loop would just
        // print codes forever.
        session.ctx.status.publish(SessionStatus::Failed);
        return;
    }
    if reason != DisconnectReason::LoggedOut {
        session.ctx.status.publish(SessionStatus::Starting);
        session.schedule_restart();
    } else {
        session.ctx.status.publish(SessionStatus::Failed);
    }
}

/// Presence subscriptions do not survive a reconnect; renew them for every
/// chat the store knows.
fn resubscribe_presences(session: &Arc<SocketSession>, socket: &Arc<dyn SocketClient>) {
    if !session.engine_config.store.enabled {
        return;
    }
    let session = Arc::clone(session);
    let socket = Arc::clone(socket);
    tokio::spawn(async move {
        let chats = match session.store.get_chats(&PaginationParams::default()).await {
            Ok(chats) => chats,
            Err(err) => {
                warn!(session = %session.ctx.name, error = %err, "presence resubscribe skipped");
                return;
            }
        };
        for chat in chats {
            if !jid::is_jid_user(&chat.id) && !jid::is_jid_group(&chat.id) {
                continue;
            }
            if let Err(err) = socket.presence_subscribe(&chat.id).await {
                debug!(session = %session.ctx.name, chat = %chat.id, error = %err,
                    "presence subscribe failed");
            }
        }
    });
}

// --- messages ---

async fn on_messages_upsert(
    session: &Arc<SocketSession>,
    lanes: &Lanes,
    messages: Vec<SocketMessage>,
    upsert_type: MessageUpsertType,
) {
    let me = session.me_chat_id();
    let mut real = Vec::new();
    for mut message in messages {
        match &message.content {
            Some(MessageContent::Protocol(ProtocolMessage::Edit { key, edited, .. })) => {
                project(
                    session,
                    SocketEvent::MessagesUpdate(vec![MessageUpdate {
                        key: key.clone(),
                        update: MessageUpdateFields {
                            status: None,
                            content: Some((**edited).clone()),
                            poll_updates: vec![],
                        },
                    }]),
                )
                .await;
            }
            Some(MessageContent::Protocol(ProtocolMessage::Revoke { key })) => {
                on_revoke(session, lanes, &message, key.clone(), me.as_deref()).await;
            }
            Some(MessageContent::Protocol(_)) | Some(MessageContent::Reaction { .. })
            | Some(MessageContent::PollUpdate { .. }) | None => {}
            Some(_) => {
                // The wire often omits the status on live deliveries; a
                // delivered inbound message is at least at DEVICE.
                if message.status.is_none() {
                    message.status = Some(MessageAck::Device.to_engine_status());
                }
                real.push(message);
            }
        }
    }
    if real.is_empty() {
        return;
    }
    project(
        session,
        SocketEvent::MessagesUpsert {
            messages: real.clone(),
            upsert_type,
        },
    )
    .await;
    for message in real {
        let processed = match session
            .media
            .process(&SocketMediaProcessor, &session.ctx.name, message.clone())
            .await
        {
            Ok(processed) => processed,
            Err(err) => {
                warn!(session = %session.ctx.name, error = %err,
                    "media processing failed, delivering without media");
                message
            }
        };
        let source = processed
            .key
            .from_me
            .then(|| session.ctx.message_source(&processed.key.id));
        let public = convert::to_message(&processed, me.as_deref(), source);
        if !public.from_me {
            emit(lanes, EventPayload::Message(public.clone()));
        }
        emit(lanes, EventPayload::MessageAny(public));
        if !processed.key.from_me && upsert_type == MessageUpsertType::Notify {
            settle_sender_presence(session, lanes, &processed).await;
        }
    }
}

async fn on_revoke(
    session: &Arc<SocketSession>,
    lanes: &Lanes,
    carrier: &SocketMessage,
    key: SocketMessageKey,
    me: Option<&str>,
) {
    let before = match session.store_backed() {
        Ok(store) => store
            .get_message(&key.remote_jid, &key.id)
            .await
            .ok()
            .flatten()
            .map(|m| convert::to_message(&m, me, None)),
        Err(_) => None,
    };
    // The merged row turns into a protocol artifact, which drops it.
    project(
        session,
        SocketEvent::MessagesUpdate(vec![MessageUpdate {
            key: key.clone(),
            update: MessageUpdateFields {
                status: None,
                content: Some(MessageContent::Protocol(ProtocolMessage::Revoke { key })),
                poll_updates: vec![],
            },
        }]),
    )
    .await;
    emit(
        lanes,
        EventPayload::MessageRevoked(MessageRevokedEvent {
            after: Some(convert::to_message(carrier, me, None)),
            before,
        }),
    );
}

/// Some clients never send the trailing `paused` presence; a delivered
/// message from someone still marked as composing settles them to available.
async fn settle_sender_presence(
    session: &Arc<SocketSession>,
    lanes: &Lanes,
    message: &SocketMessage,
) {
    if !session.engine_config.store.enabled {
        return;
    }
    let chat = message.key.remote_jid.as_str();
    let sender = message.key.participant.as_deref().unwrap_or(chat);
    let Some(entries) = session.store.get_presence(chat) else {
        return;
    };
    let Some(entry) = entries.get(sender) else {
        return;
    };
    if !matches!(
        entry.presence,
        SocketPresence::Composing | SocketPresence::Recording
    ) {
        return;
    }
    let mut presences = HashMap::new();
    presences.insert(
        sender.to_string(),
        PresenceEntry {
            presence: SocketPresence::Available,
            last_seen: Some(chrono::Utc::now().timestamp()),
        },
    );
    session
        .store
        .apply(SocketEvent::PresenceUpdate {
            id: chat.to_string(),
            presences: presences.clone(),
        })
        .await;
    emit(
        lanes,
        EventPayload::PresenceUpdate(convert::to_chat_presences(chat, &presences)),
    );
}

async fn on_messages_update(
    session: &Arc<SocketSession>,
    lanes: &Lanes,
    updates: Vec<MessageUpdate>,
) {
    project(session, SocketEvent::MessagesUpdate(updates.clone())).await;
    let me = session.me_chat_id();
    for update in updates {
        if update.update.is_status_only() {
            let status = update.update.status.unwrap_or_default();
            if let Some(ack) = MessageAck::from_engine_status(status) {
                emit(
                    lanes,
                    EventPayload::MessageAck(ack_event(&update.key, ack, me.as_deref())),
                );
            }
            continue;
        }
        for vote in &update.update.poll_updates {
            let poll_found = match session.store_backed() {
                Ok(store) => matches!(
                    store
                        .get_message(&update.key.remote_jid, &update.key.id)
                        .await,
                    Ok(Some(SocketMessage {
                        content: Some(MessageContent::PollCreation { .. }),
                        ..
                    }))
                ),
                Err(_) => false,
            };
            let payload = PollVotePayload {
                vote: PollVote {
                    selected_options: if poll_found {
                        vote.selected_options.clone()
                    } else {
                        vec![]
                    },
                    timestamp: vote.sender_timestamp_ms / 1000,
                    voter: jid::to_chat_id(&vote.voter),
                },
                poll: destination(&update.key, me.as_deref()),
            };
            emit(
                lanes,
                if poll_found {
                    EventPayload::PollVote(payload)
                } else {
                    EventPayload::PollVoteFailed(payload)
                },
            );
        }
    }
}

fn destination(key: &SocketMessageKey, me: Option<&str>) -> MessageDestination {
    let chat_id = jid::to_chat_id(&key.remote_jid);
    let me = me.unwrap_or(jid::MY_SELF).to_string();
    let (from, to) = if key.from_me {
        (me, chat_id)
    } else {
        (chat_id, me)
    };
    MessageDestination {
        id: convert::exposed_id(key),
        to,
        from,
        from_me: key.from_me,
    }
}

fn ack_event(key: &SocketMessageKey, ack: MessageAck, me: Option<&str>) -> MessageAckEvent {
    let destination = destination(key, me);
    MessageAckEvent {
        id: destination.id,
        from: destination.from,
        to: destination.to,
        participant: key.participant.as_deref().map(jid::to_chat_id),
        from_me: key.from_me,
        ack: ack.value(),
        ack_name: ack,
    }
}

fn reaction_payload(reaction: &MessageReaction, me: Option<&str>) -> EventPayload {
    let sender = reaction
        .reaction_key
        .participant
        .as_deref()
        .unwrap_or(&reaction.reaction_key.remote_jid);
    let from = if reaction.reaction_key.from_me {
        me.unwrap_or(jid::MY_SELF).to_string()
    } else {
        jid::to_chat_id(sender)
    };
    EventPayload::MessageReaction(MessageReactionEvent {
        id: convert::exposed_id(&reaction.reaction_key),
        from,
        from_me: reaction.reaction_key.from_me,
        participant: reaction
            .reaction_key
            .participant
            .as_deref()
            .map(jid::to_chat_id),
        timestamp: reaction.sender_timestamp_ms / 1000,
        reaction: ReactionBody {
            text: reaction.text.clone(),
            message_id: convert::exposed_id(&reaction.key),
        },
    })
}

// --- calls ---

fn on_call(session: &Arc<SocketSession>, lanes: &Lanes, call: CallEvent) {
    let previous = session.calls.get(&call.id);
    match call.status {
        CallStatus::Offer => {
            session.calls.insert(call.id.clone(), CallStatus::Offer);
            emit(lanes, EventPayload::CallReceived(convert::to_call_data(&call)));
        }
        CallStatus::Accept => {
            session.calls.insert(call.id.clone(), CallStatus::Accept);
            emit(lanes, EventPayload::CallAccepted(convert::to_call_data(&call)));
        }
        CallStatus::Reject | CallStatus::Timeout | CallStatus::Terminate => {
            match previous {
                // Accepted elsewhere; the terminate is not a rejection.
                Some(CallStatus::Accept) => {}
                // Duplicate rejection of the same call.
                Some(CallStatus::Reject | CallStatus::Timeout | CallStatus::Terminate) => {}
                _ => {
                    session.calls.insert(call.id.clone(), call.status);
                    emit(lanes, EventPayload::CallRejected(convert::to_call_data(&call)));
                }
            }
        }
    }
}
