// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end flows through a scripted socket: lifecycle, messaging and
//! event normalization as a host of the engine would observe them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;

use wahub_config::SessionConfig;
use wahub_core::dto::events::{EventEnvelope, EventPayload};
use wahub_core::dto::chats::ReadChatMessagesRequest;
use wahub_core::dto::chatting::{MessageStarRequest, MessageTextRequest, PinMessageRequest};
use wahub_core::dto::{MeInfo, PaginationParams};
use wahub_core::{EventKind, MessageAck, MessageSource, Session, SessionStatus};
use wahub_proto::{
    CallEvent, CallStatus, ChatModification, ConnectionState, ConnectionUpdate, DisconnectReason,
    GroupMetadata, MessageUpsertType, NoopMediaManager, OutgoingContent, SocketEvent,
};
use wahub_socket::SocketSession;
use wahub_store::Repositories;
use wahub_test_utils::builders::make_text_message;
use wahub_test_utils::{MockSocket, MockSocketFactory, RecordedCall};

const ME_JID: &str = "11111111111@s.whatsapp.net";
const ME_CHAT_ID: &str = "11111111111@c.us";

fn make_session(factory: &Arc<MockSocketFactory>) -> Arc<SocketSession> {
    let mut config = SessionConfig::default();
    config.name = "e2e".into();
    // Keep timing deterministic; the periodic restart has its own tests.
    config.socket.auto_restart.enabled = false;
    SocketSession::new(
        &config,
        false,
        factory.clone(),
        Arc::new(NoopMediaManager),
        Repositories::in_memory(),
    )
}

fn paired_socket() -> Arc<MockSocket> {
    let socket = MockSocket::new();
    socket.set_me(Some(MeInfo {
        id: ME_JID.into(),
        push_name: Some("Tester".into()),
    }));
    socket
}

fn open_update() -> SocketEvent {
    SocketEvent::ConnectionUpdate(ConnectionUpdate {
        connection: Some(ConnectionState::Open),
        qr: None,
        is_new_login: false,
        last_disconnect: None,
    })
}

fn close_update(reason: DisconnectReason) -> SocketEvent {
    SocketEvent::ConnectionUpdate(ConnectionUpdate {
        connection: Some(ConnectionState::Close),
        qr: None,
        is_new_login: false,
        last_disconnect: Some(reason),
    })
}

async fn next_event(rx: &mut broadcast::Receiver<EventEnvelope>) -> EventPayload {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event lane closed")
        .payload
}

async fn next_status(rx: &mut broadcast::Receiver<EventEnvelope>) -> SessionStatus {
    match next_event(rx).await {
        EventPayload::SessionStatus(event) => event.status,
        other => panic!("expected a status event, got {other:?}"),
    }
}

#[tokio::test]
async fn start_reaches_working_and_exposes_me() {
    let factory = MockSocketFactory::new();
    let socket = paired_socket();
    factory.push(socket.clone());
    let session = make_session(&factory);
    let mut status_rx = session.subscribe(EventKind::SessionStatus);

    session.start().await.unwrap();
    assert_eq!(next_status(&mut status_rx).await, SessionStatus::Starting);

    socket.inject(open_update());
    assert_eq!(next_status(&mut status_rx).await, SessionStatus::Working);

    let me = session.get_me().await.unwrap().unwrap();
    assert_eq!(me.id, ME_CHAT_ID);
    assert_eq!(me.push_name.as_deref(), Some("Tester"));
}

#[tokio::test]
async fn qr_pairing_serves_code_and_formats_pairing_code() {
    let factory = MockSocketFactory::new();
    let socket = MockSocket::new();
    factory.push(socket.clone());
    let session = make_session(&factory);
    let mut status_rx = session.subscribe(EventKind::SessionStatus);

    session.start().await.unwrap();
    assert_eq!(next_status(&mut status_rx).await, SessionStatus::Starting);

    socket.inject(SocketEvent::ConnectionUpdate(ConnectionUpdate {
        connection: None,
        qr: Some("2@raw-qr-payload".into()),
        is_new_login: false,
        last_disconnect: None,
    }));
    assert_eq!(next_status(&mut status_rx).await, SessionStatus::ScanQrCode);

    assert_eq!(session.get_qr().await.unwrap().raw, "2@raw-qr-payload");
    let code = session.request_code("5511999999999").await.unwrap();
    assert_eq!(code, "ABCD-EFGH");
    let screenshot = session.get_screenshot().await.unwrap();
    assert!(String::from_utf8(screenshot).unwrap().contains("<svg"));
}

#[tokio::test]
async fn inbound_message_is_normalized_and_stored() {
    let factory = MockSocketFactory::new();
    let socket = paired_socket();
    factory.push(socket.clone());
    let session = make_session(&factory);
    let mut status_rx = session.subscribe(EventKind::SessionStatus);
    let mut message_rx = session.subscribe(EventKind::Message);

    session.start().await.unwrap();
    socket.inject(open_update());
    while next_status(&mut status_rx).await != SessionStatus::Working {}

    // No status on the wire; the engine defaults a live delivery to DEVICE.
    let mut inbound = make_text_message("33333333333@s.whatsapp.net", "AAA1", false, "hello");
    inbound.status = None;
    socket.inject(SocketEvent::MessagesUpsert {
        messages: vec![inbound],
        upsert_type: MessageUpsertType::Notify,
    });

    let EventPayload::Message(message) = next_event(&mut message_rx).await else {
        panic!("expected a message event");
    };
    assert_eq!(message.id, "false_33333333333@c.us_AAA1");
    assert_eq!(message.from, "33333333333@c.us");
    assert_eq!(message.to, ME_CHAT_ID);
    assert_eq!(message.body.as_deref(), Some("hello"));
    assert_eq!(message.ack_name, MessageAck::Device);
    assert!(!message.from_me);

    // The store was projected before the event went out.
    let stored = session
        .get_chat_messages("33333333333@c.us", Default::default())
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, message.id);
}

#[tokio::test]
async fn send_text_goes_through_the_socket_and_lands_in_the_store() {
    let factory = MockSocketFactory::new();
    let socket = paired_socket();
    factory.push(socket.clone());
    let session = make_session(&factory);
    let mut status_rx = session.subscribe(EventKind::SessionStatus);

    session.start().await.unwrap();
    socket.inject(open_update());
    while next_status(&mut status_rx).await != SessionStatus::Working {}

    let sent = session
        .send_text(MessageTextRequest {
            chat_id: "22222222222@c.us".into(),
            text: "hi there".into(),
            mentions: vec![],
            reply_to: None,
            link_preview: false,
        })
        .await
        .unwrap();
    assert!(sent.from_me);
    assert_eq!(sent.source, Some(MessageSource::Api));
    assert_eq!(sent.from, ME_CHAT_ID);
    assert_eq!(sent.to, "22222222222@c.us");
    assert!(sent.id.starts_with("true_22222222222@c.us_MOCK"));

    let send_call = socket
        .calls()
        .into_iter()
        .find_map(|call| match call {
            RecordedCall::SendMessage { jid, .. } => Some(jid),
            _ => None,
        })
        .expect("no send was recorded");
    assert_eq!(send_call, "22222222222@s.whatsapp.net");

    let replayed = session
        .get_chat_message("22222222222@c.us", &sent.id, false)
        .await
        .unwrap()
        .expect("sent message not found in the store");
    assert_eq!(replayed.body.as_deref(), Some("hi there"));
}

#[tokio::test(start_paused = true)]
async fn connection_lost_reconnects_and_keeps_subscribers() {
    let factory = MockSocketFactory::new();
    let first = paired_socket();
    let second = paired_socket();
    factory.push(first.clone());
    factory.push(second.clone());
    let session = make_session(&factory);
    let mut status_rx = session.subscribe(EventKind::SessionStatus);

    session.start().await.unwrap();
    first.inject(open_update());
    while next_status(&mut status_rx).await != SessionStatus::Working {}

    first.inject(close_update(DisconnectReason::ConnectionLost));
    assert_eq!(next_status(&mut status_rx).await, SessionStatus::Starting);

    // The delayed restart connects the next scripted socket.
    while factory.connected().len() < 2 {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    second.inject(open_update());
    // Same subscriber handle observes the new incarnation going WORKING.
    assert_eq!(next_status(&mut status_rx).await, SessionStatus::Working);
}

#[tokio::test(start_paused = true)]
async fn logged_out_close_fails_without_reconnecting() {
    let factory = MockSocketFactory::new();
    let socket = paired_socket();
    factory.push(socket.clone());
    let session = make_session(&factory);
    let mut status_rx = session.subscribe(EventKind::SessionStatus);

    session.start().await.unwrap();
    socket.inject(open_update());
    while next_status(&mut status_rx).await != SessionStatus::Working {}

    socket.inject(close_update(DisconnectReason::LoggedOut));
    assert_eq!(next_status(&mut status_rx).await, SessionStatus::Failed);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(factory.connected().len(), 1);
    assert_eq!(session.status(), SessionStatus::Failed);
}

#[tokio::test]
async fn read_chat_messages_makes_no_socket_call_when_nothing_is_unread() {
    let factory = MockSocketFactory::new();
    let socket = paired_socket();
    factory.push(socket.clone());
    let session = make_session(&factory);
    let mut status_rx = session.subscribe(EventKind::SessionStatus);

    session.start().await.unwrap();
    socket.inject(open_update());
    while next_status(&mut status_rx).await != SessionStatus::Working {}

    let response = session
        .read_chat_messages("55555555555@c.us", ReadChatMessagesRequest::default())
        .await
        .unwrap();
    assert!(response.ids.is_empty());
    assert!(
        !socket
            .calls()
            .iter()
            .any(|call| matches!(call, RecordedCall::ReadMessages(_))),
        "an empty unread window must not hit the socket"
    );
}

#[tokio::test]
async fn duplicate_call_rejections_are_suppressed() {
    let factory = MockSocketFactory::new();
    let socket = paired_socket();
    factory.push(socket.clone());
    let session = make_session(&factory);
    let mut status_rx = session.subscribe(EventKind::SessionStatus);
    let mut received_rx = session.subscribe(EventKind::CallReceived);
    let mut rejected_rx = session.subscribe(EventKind::CallRejected);

    session.start().await.unwrap();
    socket.inject(open_update());
    while next_status(&mut status_rx).await != SessionStatus::Working {}

    let call = |id: &str, status: CallStatus| {
        SocketEvent::Call(vec![CallEvent {
            id: id.into(),
            from: "44444444444@s.whatsapp.net".into(),
            status,
            is_video: false,
            is_group: false,
            date: 1_700_000_000,
        }])
    };

    socket.inject(call("call-1", CallStatus::Offer));
    let EventPayload::CallReceived(received) = next_event(&mut received_rx).await else {
        panic!("expected a call.received event");
    };
    assert_eq!(received.id, "call-1");
    assert_eq!(received.from, "44444444444@c.us");

    socket.inject(call("call-1", CallStatus::Reject));
    // The trailing terminate of an already rejected call is noise.
    socket.inject(call("call-1", CallStatus::Terminate));
    socket.inject(call("call-2", CallStatus::Offer));
    socket.inject(call("call-2", CallStatus::Timeout));

    let EventPayload::CallRejected(first) = next_event(&mut rejected_rx).await else {
        panic!("expected a call.rejected event");
    };
    assert_eq!(first.id, "call-1");
    let EventPayload::CallRejected(second) = next_event(&mut rejected_rx).await else {
        panic!("expected a call.rejected event");
    };
    assert_eq!(second.id, "call-2");
}

#[tokio::test]
async fn failed_picture_fetch_is_cached_as_absent() {
    let factory = MockSocketFactory::new();
    let socket = paired_socket();
    factory.push(socket.clone());
    let session = make_session(&factory);
    let mut status_rx = session.subscribe(EventKind::SessionStatus);

    session.start().await.unwrap();
    socket.inject(open_update());
    while next_status(&mut status_rx).await != SessionStatus::Working {}

    socket.fail_picture_fetches(true);
    let first = session
        .get_contact_profile_picture("33333333333@c.us", false)
        .await
        .unwrap();
    assert_eq!(first, None);
    let second = session
        .get_contact_profile_picture("33333333333@c.us", false)
        .await
        .unwrap();
    assert_eq!(second, None);

    let fetches = socket
        .calls()
        .iter()
        .filter(|call| matches!(call, RecordedCall::ProfilePictureUrl(_)))
        .count();
    assert_eq!(fetches, 1, "the cached miss must absorb the second lookup");
}

#[tokio::test]
async fn group_permission_getters_read_the_metadata_switches() {
    let factory = MockSocketFactory::new();
    let socket = paired_socket();
    factory.push(socket.clone());
    let session = make_session(&factory);
    let mut status_rx = session.subscribe(EventKind::SessionStatus);

    session.start().await.unwrap();
    socket.inject(open_update());
    while next_status(&mut status_rx).await != SessionStatus::Working {}

    socket.put_group(GroupMetadata {
        id: "123456789@g.us".into(),
        subject: "announcements".into(),
        description: None,
        owner: Some(ME_JID.into()),
        participants: vec![],
        restrict: false,
        announce: true,
        invite_code: None,
        creation: Some(1_700_000_000),
    });

    let messages = session
        .get_messages_admins_only("123456789@g.us")
        .await
        .unwrap();
    assert!(messages.enabled);
    let info = session.get_info_admins_only("123456789@g.us").await.unwrap();
    assert!(!info.enabled);
}

#[tokio::test]
async fn star_message_rides_a_chat_modification() {
    let factory = MockSocketFactory::new();
    let socket = paired_socket();
    factory.push(socket.clone());
    let session = make_session(&factory);
    let mut status_rx = session.subscribe(EventKind::SessionStatus);

    session.start().await.unwrap();
    socket.inject(open_update());
    while next_status(&mut status_rx).await != SessionStatus::Working {}

    session
        .star_message(MessageStarRequest {
            chat_id: "22222222222@c.us".into(),
            message_id: "true_22222222222@c.us_AAA1".into(),
            star: true,
        })
        .await
        .unwrap();

    let (jid, modification) = socket
        .calls()
        .into_iter()
        .find_map(|call| match call {
            RecordedCall::ChatModify { jid, modification } => Some((jid, modification)),
            _ => None,
        })
        .expect("no chat modification was recorded");
    assert_eq!(jid, "22222222222@s.whatsapp.net");
    match modification {
        ChatModification::Star { messages, star } => {
            assert!(star);
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].id, "AAA1");
            assert!(messages[0].from_me);
            assert_eq!(messages[0].remote_jid, "22222222222@s.whatsapp.net");
        }
        other => panic!("expected a star modification, got {other:?}"),
    }
}

#[tokio::test]
async fn pin_and_unpin_translate_the_message_key() {
    let factory = MockSocketFactory::new();
    let socket = paired_socket();
    factory.push(socket.clone());
    let session = make_session(&factory);
    let mut status_rx = session.subscribe(EventKind::SessionStatus);

    session.start().await.unwrap();
    socket.inject(open_update());
    while next_status(&mut status_rx).await != SessionStatus::Working {}

    session
        .pin_message(
            "22222222222@c.us",
            "false_22222222222@c.us_BBB2",
            PinMessageRequest { duration: 86_400 },
        )
        .await
        .unwrap();
    session
        .unpin_message("22222222222@c.us", "false_22222222222@c.us_BBB2")
        .await
        .unwrap();

    let pins: Vec<_> = socket
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            RecordedCall::SendMessage {
                jid,
                content:
                    OutgoingContent::Pin {
                        key,
                        pinned,
                        duration_secs,
                    },
                ..
            } => Some((jid, key, pinned, duration_secs)),
            _ => None,
        })
        .collect();
    assert_eq!(pins.len(), 2);
    assert_eq!(pins[0].0, "22222222222@s.whatsapp.net");
    assert_eq!(pins[0].1.id, "BBB2");
    assert!(!pins[0].1.from_me);
    assert!(pins[0].2);
    assert_eq!(pins[0].3, 86_400);
    assert!(!pins[1].2);
    assert_eq!(pins[1].3, 0);
}

#[tokio::test(start_paused = true)]
async fn call_log_entries_expire() {
    let factory = MockSocketFactory::new();
    let socket = paired_socket();
    factory.push(socket.clone());
    let session = make_session(&factory);
    let mut status_rx = session.subscribe(EventKind::SessionStatus);
    let mut rejected_rx = session.subscribe(EventKind::CallRejected);

    session.start().await.unwrap();
    socket.inject(open_update());
    while next_status(&mut status_rx).await != SessionStatus::Working {}

    let call = |status: CallStatus| {
        SocketEvent::Call(vec![CallEvent {
            id: "call-1".into(),
            from: "44444444444@s.whatsapp.net".into(),
            status,
            is_video: false,
            is_group: false,
            date: 1_700_000_000,
        }])
    };

    socket.inject(call(CallStatus::Reject));
    let EventPayload::CallRejected(first) = next_event(&mut rejected_rx).await else {
        panic!("expected a call.rejected event");
    };
    assert_eq!(first.id, "call-1");

    // Long after the call, its id is forgotten; a stray terminate for the
    // same id is treated as a fresh rejection instead of a duplicate.
    tokio::time::sleep(Duration::from_secs(20 * 60)).await;
    socket.inject(call(CallStatus::Terminate));
    let EventPayload::CallRejected(second) = next_event(&mut rejected_rx).await else {
        panic!("expected a call.rejected event");
    };
    assert_eq!(second.id, "call-1");
}

#[tokio::test]
async fn get_chat_messages_requires_the_store() {
    let factory = MockSocketFactory::new();
    factory.push(paired_socket());
    let mut config = SessionConfig::default();
    config.name = "storeless".into();
    config.socket.store.enabled = false;
    config.socket.auto_restart.enabled = false;
    let session = SocketSession::new(
        &config,
        false,
        factory.clone(),
        Arc::new(NoopMediaManager),
        Repositories::in_memory(),
    );

    session.start().await.unwrap();
    let err = session
        .get_chat_messages("22222222222@c.us", Default::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("store is disabled"));
    let _ = session.get_chats(PaginationParams::default()).await.unwrap_err();
}
