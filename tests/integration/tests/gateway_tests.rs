//! End-to-end gateway tests
//!
//! Each test spawns a real server on an ephemeral port and drives it with
//! WebSocket clients speaking the envelope protocol.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use classline_core::entities::UserRole;
use classline_core::Snowflake;
use classline_gateway::protocol::{ClientEvent, PresenceStatus, ServerEvent};
use integration_tests::{unique_email, GatewayClient, TestServer};

// ============================================================================
// Handshake and liveness
// ============================================================================

#[tokio::test]
async fn hello_then_ready_handshake() {
    let server = TestServer::start().await.unwrap();
    let session = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();

    // connect() already consumed the hello frame
    let mut client = server.connect().await.unwrap();
    let ready = client.authenticate(&session.tokens.access_token).await.unwrap();

    match ready {
        ServerEvent::Ready { user, channels, .. } => {
            assert_eq!(user.id, session.user.id);
            assert!(user.online);
            assert!(channels.is_empty());
        }
        other => panic!("expected ready, got {other:?}"),
    }
}

#[tokio::test]
async fn heartbeat_is_acknowledged() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();

    client.send(&ClientEvent::Heartbeat).await.unwrap();
    let event = client.recv().await.unwrap();
    assert!(matches!(event, ServerEvent::HeartbeatAck));
}

#[tokio::test]
async fn second_authenticate_closes_the_connection() {
    let server = TestServer::start().await.unwrap();
    let session = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();

    let mut client = server.connect().await.unwrap();
    client.authenticate(&session.tokens.access_token).await.unwrap();

    client
        .send(&ClientEvent::Authenticate {
            token: session.tokens.access_token.clone(),
        })
        .await
        .unwrap();

    let code = client.expect_close().await.unwrap();
    assert_eq!(code, Some(4005));
}

#[tokio::test]
async fn invalid_token_closes_the_connection() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();

    client
        .send(&ClientEvent::Authenticate {
            token: "not-a-token".to_string(),
        })
        .await
        .unwrap();

    let code = client.expect_close().await.unwrap();
    assert_eq!(code, Some(4004));
}

// ============================================================================
// Protocol errors keep the connection open
// ============================================================================

#[tokio::test]
async fn malformed_envelopes_get_protocol_error_and_stay_open() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();

    client.send_raw("this is not json").await.unwrap();
    match client.recv().await.unwrap() {
        ServerEvent::Error { code, .. } => assert_eq!(code, "PROTOCOL_ERROR"),
        other => panic!("expected error, got {other:?}"),
    }

    client.send_raw(r#"{"type":"warp_drive"}"#).await.unwrap();
    match client.recv().await.unwrap() {
        ServerEvent::Error { code, .. } => assert_eq!(code, "PROTOCOL_ERROR"),
        other => panic!("expected error, got {other:?}"),
    }

    // Connection still works
    client.send(&ClientEvent::Heartbeat).await.unwrap();
    assert!(matches!(
        client.recv().await.unwrap(),
        ServerEvent::HeartbeatAck
    ));
}

#[tokio::test]
async fn channel_events_before_authentication_are_rejected() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();

    client
        .send(&ClientEvent::SendMessage {
            channel_id: Snowflake::from(1i64),
            content: "hi".to_string(),
        })
        .await
        .unwrap();

    match client.recv().await.unwrap() {
        ServerEvent::Error { code, .. } => assert_eq!(code, "UNAUTHORIZED"),
        other => panic!("expected error, got {other:?}"),
    }

    // Still open, still in Connecting: authentication succeeds afterwards
    let session = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();
    client.authenticate(&session.tokens.access_token).await.unwrap();
}

// ============================================================================
// Direct channels
// ============================================================================

async fn connect_and_auth(server: &TestServer, token: &str) -> GatewayClient {
    let mut client = server.connect().await.unwrap();
    client.authenticate(token).await.unwrap();
    client
}

#[tokio::test]
async fn direct_channel_creation_is_idempotent() {
    let server = TestServer::start().await.unwrap();
    let ana = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();
    let bo = server
        .register(&unique_email("bo"), UserRole::Student)
        .await
        .unwrap();

    let mut client = connect_and_auth(&server, &ana.tokens.access_token).await;

    client
        .send(&ClientEvent::CreateDirectChannel {
            target_user_id: bo.user.id,
        })
        .await
        .unwrap();
    let first = client
        .recv_until(|e| matches!(e, ServerEvent::ChannelCreated { .. }))
        .await
        .unwrap();
    let (first_id, created) = match first {
        ServerEvent::ChannelCreated { channel, created } => (channel.id, created),
        other => panic!("unexpected: {other:?}"),
    };
    assert!(created);

    client
        .send(&ClientEvent::CreateDirectChannel {
            target_user_id: bo.user.id,
        })
        .await
        .unwrap();
    let second = client
        .recv_until(|e| matches!(e, ServerEvent::ChannelCreated { .. }))
        .await
        .unwrap();
    match second {
        ServerEvent::ChannelCreated { channel, created } => {
            assert_eq!(channel.id, first_id);
            assert!(!created);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

// ============================================================================
// Group channels
// ============================================================================

#[tokio::test]
async fn group_creation_is_forbidden_for_students() {
    let server = TestServer::start().await.unwrap();
    let ana = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();

    let mut client = connect_and_auth(&server, &ana.tokens.access_token).await;

    client
        .send(&ClientEvent::CreateGroupChannel {
            name: "Physics 101".to_string(),
            description: None,
            member_ids: vec![],
        })
        .await
        .unwrap();

    match client.recv().await.unwrap() {
        ServerEvent::Error { code, .. } => assert_eq!(code, "FORBIDDEN"),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn educators_create_groups_and_members_are_notified() {
    let server = TestServer::start().await.unwrap();
    let prof = server
        .register(&unique_email("prof"), UserRole::Educator)
        .await
        .unwrap();
    let ana = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();

    let mut prof_client = connect_and_auth(&server, &prof.tokens.access_token).await;
    let mut ana_client = connect_and_auth(&server, &ana.tokens.access_token).await;

    prof_client
        .send(&ClientEvent::CreateGroupChannel {
            name: "Physics 101".to_string(),
            description: Some("Mechanics and waves".to_string()),
            member_ids: vec![ana.user.id],
        })
        .await
        .unwrap();

    for client in [&mut prof_client, &mut ana_client] {
        let event = client
            .recv_until(|e| matches!(e, ServerEvent::ChannelCreated { .. }))
            .await
            .unwrap();
        match event {
            ServerEvent::ChannelCreated { channel, created } => {
                assert!(created);
                assert_eq!(channel.name.as_deref(), Some("Physics 101"));
                assert_eq!(channel.description.as_deref(), Some("Mechanics and waves"));
                assert_eq!(channel.created_by, prof.user.id);
                let member_ids: Vec<_> = channel.members.iter().map(|m| m.id).collect();
                assert!(member_ids.contains(&prof.user.id));
                assert!(member_ids.contains(&ana.user.id));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}

// ============================================================================
// Message fanout and ordering
// ============================================================================

#[tokio::test]
async fn members_see_identical_order_and_sender_gets_the_broadcast() {
    let server = TestServer::start().await.unwrap();
    let ana = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();
    let prof = server
        .register(&unique_email("prof"), UserRole::Educator)
        .await
        .unwrap();

    let mut ana_client = connect_and_auth(&server, &ana.tokens.access_token).await;
    let mut prof_client = connect_and_auth(&server, &prof.tokens.access_token).await;

    ana_client
        .send(&ClientEvent::CreateDirectChannel {
            target_user_id: prof.user.id,
        })
        .await
        .unwrap();
    let channel_id = match ana_client
        .recv_until(|e| matches!(e, ServerEvent::ChannelCreated { .. }))
        .await
        .unwrap()
    {
        ServerEvent::ChannelCreated { channel, .. } => channel.id,
        other => panic!("unexpected: {other:?}"),
    };

    for content in ["first", "second", "third"] {
        ana_client
            .send(&ClientEvent::SendMessage {
                channel_id,
                content: content.to_string(),
            })
            .await
            .unwrap();
    }

    // Both members, the sender included, observe the same order with
    // strictly increasing seq and Ana's sender id.
    for client in [&mut ana_client, &mut prof_client] {
        let mut received = Vec::new();
        while received.len() < 3 {
            if let ServerEvent::NewMessage { message, .. } = client
                .recv_until(|e| matches!(e, ServerEvent::NewMessage { .. }))
                .await
                .unwrap()
            {
                received.push(message);
            }
        }

        let contents: Vec<_> = received.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);

        let seqs: Vec<_> = received.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, [1, 2, 3]);

        assert!(received.iter().all(|m| m.sender_id == ana.user.id));
    }
}

// ============================================================================
// Unread counts
// ============================================================================

#[tokio::test]
async fn unread_accumulates_while_not_viewing_and_resets_on_select() {
    let server = TestServer::start().await.unwrap();
    let ana = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();
    let bo = server
        .register(&unique_email("bo"), UserRole::Student)
        .await
        .unwrap();

    let mut ana_client = connect_and_auth(&server, &ana.tokens.access_token).await;

    ana_client
        .send(&ClientEvent::CreateDirectChannel {
            target_user_id: bo.user.id,
        })
        .await
        .unwrap();
    let channel_id = match ana_client
        .recv_until(|e| matches!(e, ServerEvent::ChannelCreated { .. }))
        .await
        .unwrap()
    {
        ServerEvent::ChannelCreated { channel, .. } => channel.id,
        other => panic!("unexpected: {other:?}"),
    };

    for content in ["hello", "are you there?"] {
        ana_client
            .send(&ClientEvent::SendMessage {
                channel_id,
                content: content.to_string(),
            })
            .await
            .unwrap();
        ana_client
            .recv_until(|e| matches!(e, ServerEvent::NewMessage { .. }))
            .await
            .unwrap();
    }

    // Bo was not viewing: the ready snapshot shows both messages unread
    let mut bo_client = connect_and_auth(&server, &bo.tokens.access_token).await;
    let mut bo_check = server.connect().await.unwrap();
    match bo_check.authenticate(&bo.tokens.access_token).await.unwrap() {
        ServerEvent::Ready { channels, .. } => {
            assert_eq!(channels.len(), 1);
            assert_eq!(channels[0].unread_count, 2);
        }
        other => panic!("unexpected: {other:?}"),
    }

    bo_client
        .send(&ClientEvent::SelectChannel { channel_id })
        .await
        .unwrap();

    // Selecting marked the channel read; a fresh snapshot shows zero
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let mut bo_after = server.connect().await.unwrap();
    match bo_after.authenticate(&bo.tokens.access_token).await.unwrap() {
        ServerEvent::Ready { channels, .. } => {
            assert_eq!(channels[0].unread_count, 0);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn viewing_members_do_not_accumulate_unread() {
    let server = TestServer::start().await.unwrap();
    let ana = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();
    let bo = server
        .register(&unique_email("bo"), UserRole::Student)
        .await
        .unwrap();

    let mut ana_client = connect_and_auth(&server, &ana.tokens.access_token).await;
    let mut bo_client = connect_and_auth(&server, &bo.tokens.access_token).await;

    ana_client
        .send(&ClientEvent::CreateDirectChannel {
            target_user_id: bo.user.id,
        })
        .await
        .unwrap();
    let channel_id = match bo_client
        .recv_until(|e| matches!(e, ServerEvent::ChannelCreated { .. }))
        .await
        .unwrap()
    {
        ServerEvent::ChannelCreated { channel, .. } => channel.id,
        other => panic!("unexpected: {other:?}"),
    };

    bo_client
        .send(&ClientEvent::SelectChannel { channel_id })
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    ana_client
        .send(&ClientEvent::SendMessage {
            channel_id,
            content: "seen live".to_string(),
        })
        .await
        .unwrap();
    bo_client
        .recv_until(|e| matches!(e, ServerEvent::NewMessage { .. }))
        .await
        .unwrap();

    // Bo was viewing, so nothing is unread
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let mut bo_check = server.connect().await.unwrap();
    match bo_check.authenticate(&bo.tokens.access_token).await.unwrap() {
        ServerEvent::Ready { channels, .. } => {
            assert_eq!(channels[0].unread_count, 0);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

// ============================================================================
// Typing indicators
// ============================================================================

#[tokio::test]
async fn typing_indicators_reach_other_members_and_expire() {
    let server = TestServer::start_with_typing_ttl(300).await.unwrap();
    let ana = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();
    let bo = server
        .register(&unique_email("bo"), UserRole::Student)
        .await
        .unwrap();

    let mut ana_client = connect_and_auth(&server, &ana.tokens.access_token).await;
    let mut bo_client = connect_and_auth(&server, &bo.tokens.access_token).await;

    ana_client
        .send(&ClientEvent::CreateDirectChannel {
            target_user_id: bo.user.id,
        })
        .await
        .unwrap();
    let channel_id = match bo_client
        .recv_until(|e| matches!(e, ServerEvent::ChannelCreated { .. }))
        .await
        .unwrap()
    {
        ServerEvent::ChannelCreated { channel, .. } => channel.id,
        other => panic!("unexpected: {other:?}"),
    };

    ana_client
        .send(&ClientEvent::TypingStarted { channel_id })
        .await
        .unwrap();

    match bo_client
        .recv_until(|e| matches!(e, ServerEvent::UserTyping { .. }))
        .await
        .unwrap()
    {
        ServerEvent::UserTyping { user_id, .. } => assert_eq!(user_id, ana.user.id),
        other => panic!("unexpected: {other:?}"),
    }

    // No explicit stop: the sweeper evicts the indicator
    match bo_client
        .recv_until(|e| matches!(e, ServerEvent::UserStoppedTyping { .. }))
        .await
        .unwrap()
    {
        ServerEvent::UserStoppedTyping { user_id, .. } => assert_eq!(user_id, ana.user.id),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn abrupt_disconnect_clears_typing() {
    let server = TestServer::start().await.unwrap();
    let ana = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();
    let bo = server
        .register(&unique_email("bo"), UserRole::Student)
        .await
        .unwrap();

    let mut ana_client = connect_and_auth(&server, &ana.tokens.access_token).await;
    let mut bo_client = connect_and_auth(&server, &bo.tokens.access_token).await;

    ana_client
        .send(&ClientEvent::CreateDirectChannel {
            target_user_id: bo.user.id,
        })
        .await
        .unwrap();
    let channel_id = match bo_client
        .recv_until(|e| matches!(e, ServerEvent::ChannelCreated { .. }))
        .await
        .unwrap()
    {
        ServerEvent::ChannelCreated { channel, .. } => channel.id,
        other => panic!("unexpected: {other:?}"),
    };

    ana_client
        .send(&ClientEvent::TypingStarted { channel_id })
        .await
        .unwrap();
    bo_client
        .recv_until(|e| matches!(e, ServerEvent::UserTyping { .. }))
        .await
        .unwrap();

    ana_client.close().await.unwrap();

    bo_client
        .recv_until(|e| matches!(e, ServerEvent::UserStoppedTyping { .. }))
        .await
        .unwrap();
}

// ============================================================================
// Presence
// ============================================================================

#[tokio::test]
async fn presence_transitions_only_on_first_and_last_session() {
    let server = TestServer::start().await.unwrap();
    let ana = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();
    let bo = server
        .register(&unique_email("bo"), UserRole::Student)
        .await
        .unwrap();

    let mut ana_client = connect_and_auth(&server, &ana.tokens.access_token).await;

    // Share a channel so Ana is in Bo's presence audience
    ana_client
        .send(&ClientEvent::CreateDirectChannel {
            target_user_id: bo.user.id,
        })
        .await
        .unwrap();
    ana_client
        .recv_until(|e| matches!(e, ServerEvent::ChannelCreated { .. }))
        .await
        .unwrap();

    // First session: Bo comes online
    let mut bo_first = connect_and_auth(&server, &bo.tokens.access_token).await;
    match ana_client
        .recv_until(|e| matches!(e, ServerEvent::PresenceUpdate { .. }))
        .await
        .unwrap()
    {
        ServerEvent::PresenceUpdate { user_id, status } => {
            assert_eq!(user_id, bo.user.id);
            assert_eq!(status, PresenceStatus::Online);
        }
        other => panic!("unexpected: {other:?}"),
    }

    // Second session: no transition
    let mut bo_second = connect_and_auth(&server, &bo.tokens.access_token).await;

    // Closing the first session: Bo is still online via the second
    bo_first.close().await.unwrap();

    // Closing the last session: Bo goes offline; that offline update must
    // be the next presence event Ana sees (no spurious transitions from
    // the second connect or the first disconnect).
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    bo_second.close().await.unwrap();

    match ana_client
        .recv_until(|e| matches!(e, ServerEvent::PresenceUpdate { .. }))
        .await
        .unwrap()
    {
        ServerEvent::PresenceUpdate { user_id, status } => {
            assert_eq!(user_id, bo.user.id);
            assert_eq!(status, PresenceStatus::Offline);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

// ============================================================================
// History and contacts
// ============================================================================

#[tokio::test]
async fn history_returns_messages_after_a_cursor() {
    let server = TestServer::start().await.unwrap();
    let ana = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();
    let bo = server
        .register(&unique_email("bo"), UserRole::Student)
        .await
        .unwrap();

    let mut ana_client = connect_and_auth(&server, &ana.tokens.access_token).await;

    ana_client
        .send(&ClientEvent::CreateDirectChannel {
            target_user_id: bo.user.id,
        })
        .await
        .unwrap();
    let channel_id = match ana_client
        .recv_until(|e| matches!(e, ServerEvent::ChannelCreated { .. }))
        .await
        .unwrap()
    {
        ServerEvent::ChannelCreated { channel, .. } => channel.id,
        other => panic!("unexpected: {other:?}"),
    };

    for content in ["one", "two", "three"] {
        ana_client
            .send(&ClientEvent::SendMessage {
                channel_id,
                content: content.to_string(),
            })
            .await
            .unwrap();
        ana_client
            .recv_until(|e| matches!(e, ServerEvent::NewMessage { .. }))
            .await
            .unwrap();
    }

    ana_client
        .send(&ClientEvent::FetchHistory {
            channel_id,
            after_seq: 1,
            limit: None,
        })
        .await
        .unwrap();

    match ana_client
        .recv_until(|e| matches!(e, ServerEvent::History { .. }))
        .await
        .unwrap()
    {
        ServerEvent::History { messages, .. } => {
            let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
            assert_eq!(contents, ["two", "three"]);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn contacts_exclude_the_requester() {
    let server = TestServer::start().await.unwrap();
    let ana = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();
    let bo = server
        .register(&unique_email("bo"), UserRole::Student)
        .await
        .unwrap();

    let mut client = connect_and_auth(&server, &ana.tokens.access_token).await;

    client.send(&ClientEvent::ListContacts).await.unwrap();
    match client
        .recv_until(|e| matches!(e, ServerEvent::Contacts { .. }))
        .await
        .unwrap()
    {
        ServerEvent::Contacts { users } => {
            assert!(users.iter().any(|u| u.id == bo.user.id));
            assert!(users.iter().all(|u| u.id != ana.user.id));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

// ============================================================================
// Group membership management
// ============================================================================

#[tokio::test]
async fn creator_adds_and_removes_group_members() {
    let server = TestServer::start().await.unwrap();
    let prof = server
        .register(&unique_email("prof"), UserRole::Educator)
        .await
        .unwrap();
    let ana = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();
    let bo = server
        .register(&unique_email("bo"), UserRole::Student)
        .await
        .unwrap();

    let mut prof_client = connect_and_auth(&server, &prof.tokens.access_token).await;
    let mut ana_client = connect_and_auth(&server, &ana.tokens.access_token).await;
    let mut bo_client = connect_and_auth(&server, &bo.tokens.access_token).await;

    prof_client
        .send(&ClientEvent::CreateGroupChannel {
            name: "Physics 101".to_string(),
            description: None,
            member_ids: vec![ana.user.id],
        })
        .await
        .unwrap();
    let channel_id = match prof_client
        .recv_until(|e| matches!(e, ServerEvent::ChannelCreated { .. }))
        .await
        .unwrap()
    {
        ServerEvent::ChannelCreated { channel, .. } => channel.id,
        other => panic!("unexpected: {other:?}"),
    };

    // Adding Bo: he gets the full channel, existing members get a notice
    prof_client
        .send(&ClientEvent::AddChannelMember {
            channel_id,
            user_id: bo.user.id,
        })
        .await
        .unwrap();

    match bo_client
        .recv_until(|e| matches!(e, ServerEvent::ChannelCreated { .. }))
        .await
        .unwrap()
    {
        ServerEvent::ChannelCreated { channel, created } => {
            assert!(created);
            assert_eq!(channel.id, channel_id);
            assert!(channel.members.iter().any(|m| m.id == bo.user.id));
        }
        other => panic!("unexpected: {other:?}"),
    }

    for client in [&mut prof_client, &mut ana_client] {
        match client
            .recv_until(|e| matches!(e, ServerEvent::MemberAdded { .. }))
            .await
            .unwrap()
        {
            ServerEvent::MemberAdded {
                channel_id: in_channel,
                user,
            } => {
                assert_eq!(in_channel, channel_id);
                assert_eq!(user.id, bo.user.id);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    // Removing Bo: remaining members and Bo himself are told
    prof_client
        .send(&ClientEvent::RemoveChannelMember {
            channel_id,
            user_id: bo.user.id,
        })
        .await
        .unwrap();

    for client in [&mut prof_client, &mut ana_client, &mut bo_client] {
        match client
            .recv_until(|e| matches!(e, ServerEvent::MemberRemoved { .. }))
            .await
            .unwrap()
        {
            ServerEvent::MemberRemoved {
                channel_id: in_channel,
                user_id,
            } => {
                assert_eq!(in_channel, channel_id);
                assert_eq!(user_id, bo.user.id);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}

#[tokio::test]
async fn membership_mutation_is_creator_only() {
    let server = TestServer::start().await.unwrap();
    let prof = server
        .register(&unique_email("prof"), UserRole::Educator)
        .await
        .unwrap();
    let ana = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();
    let bo = server
        .register(&unique_email("bo"), UserRole::Student)
        .await
        .unwrap();

    let mut prof_client = connect_and_auth(&server, &prof.tokens.access_token).await;
    let mut ana_client = connect_and_auth(&server, &ana.tokens.access_token).await;

    prof_client
        .send(&ClientEvent::CreateGroupChannel {
            name: "Physics 101".to_string(),
            description: None,
            member_ids: vec![ana.user.id],
        })
        .await
        .unwrap();
    let channel_id = match ana_client
        .recv_until(|e| matches!(e, ServerEvent::ChannelCreated { .. }))
        .await
        .unwrap()
    {
        ServerEvent::ChannelCreated { channel, .. } => channel.id,
        other => panic!("unexpected: {other:?}"),
    };

    ana_client
        .send(&ClientEvent::AddChannelMember {
            channel_id,
            user_id: bo.user.id,
        })
        .await
        .unwrap();

    match ana_client
        .recv_until(|e| matches!(e, ServerEvent::Error { .. }))
        .await
        .unwrap()
    {
        ServerEvent::Error { code, .. } => assert_eq!(code, "FORBIDDEN"),
        other => panic!("unexpected: {other:?}"),
    }
}

// ============================================================================
// Away status
// ============================================================================

#[tokio::test]
async fn away_status_reaches_channel_partners() {
    let server = TestServer::start().await.unwrap();
    let ana = server
        .register(&unique_email("ana"), UserRole::Student)
        .await
        .unwrap();
    let bo = server
        .register(&unique_email("bo"), UserRole::Student)
        .await
        .unwrap();

    let mut ana_client = connect_and_auth(&server, &ana.tokens.access_token).await;
    let mut bo_client = connect_and_auth(&server, &bo.tokens.access_token).await;

    ana_client
        .send(&ClientEvent::CreateDirectChannel {
            target_user_id: bo.user.id,
        })
        .await
        .unwrap();
    ana_client
        .recv_until(|e| matches!(e, ServerEvent::ChannelCreated { .. }))
        .await
        .unwrap();

    bo_client
        .send(&ClientEvent::StatusUpdate {
            status: PresenceStatus::Away,
        })
        .await
        .unwrap();

    match ana_client
        .recv_until(|e| matches!(e, ServerEvent::PresenceUpdate { .. }))
        .await
        .unwrap()
    {
        ServerEvent::PresenceUpdate { user_id, status } => {
            assert_eq!(user_id, bo.user.id);
            assert_eq!(status, PresenceStatus::Away);
        }
        other => panic!("unexpected: {other:?}"),
    }

    bo_client
        .send(&ClientEvent::StatusUpdate {
            status: PresenceStatus::Online,
        })
        .await
        .unwrap();

    match ana_client
        .recv_until(|e| matches!(e, ServerEvent::PresenceUpdate { .. }))
        .await
        .unwrap()
    {
        ServerEvent::PresenceUpdate { user_id, status } => {
            assert_eq!(user_id, bo.user.id);
            assert_eq!(status, PresenceStatus::Online);
        }
        other => panic!("unexpected: {other:?}"),
    }

    // Declaring offline is a protocol error and the socket stays open
    bo_client
        .send(&ClientEvent::StatusUpdate {
            status: PresenceStatus::Offline,
        })
        .await
        .unwrap();
    match bo_client
        .recv_until(|e| matches!(e, ServerEvent::Error { .. }))
        .await
        .unwrap()
    {
        ServerEvent::Error { code, .. } => assert_eq!(code, "PROTOCOL_ERROR"),
        other => panic!("unexpected: {other:?}"),
    }
}
