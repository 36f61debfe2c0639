//! End-to-end scenarios against the in-memory remote.
//!
//! Each scenario drives a session the way a chat screen would and checks what
//! a reader of the published state observes.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use kindred::remote::Operation;
use kindred::{Session, SessionConfig, SyncError};
use kindred_core::{is_ordered, Provenance, UserId};
use kindred_testkit::{init_tracing, users, EventBatch, TestFixture, FRIEND_NAME};
use proptest::prelude::*;

async fn session_for(fixture: &TestFixture) -> Session<kindred::MemoryRemote> {
    Session::start(
        Arc::clone(&fixture.remote),
        fixture.me.clone(),
        SessionConfig::default(),
    )
    .await
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversation List
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn burst_of_events_costs_one_reload() -> Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let session = session_for(&fixture).await;
    fixture.remote.reset_calls();

    for i in 0..5 {
        fixture.friend_says(&format!("m{}", i), 1_000 + i);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(fixture.remote.calls(Operation::LoadConversations), 1);

    let list = session.conversations();
    let c1 = &list.conversations()[0];
    assert_eq!(c1.last_message.preview(), "hello m4");
    assert_eq!(c1.unread_count, 5);
    assert_eq!(list.unread_total(), 5);
    assert_eq!(list.stats().events_received, 5);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn manual_refresh_works_without_realtime() -> Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    fixture.remote.set_failing(Operation::Subscribe, true);
    let session = session_for(&fixture).await;

    let list = session.conversations();
    assert!(!list.is_realtime_active());

    fixture.friend_says("m1", 1_000);
    list.refresh().await?;
    assert_eq!(list.conversations()[0].last_message.preview(), "hello m1");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn switching_identity_releases_old_subscription_first() -> Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let mut session = session_for(&fixture).await;
    assert_eq!(fixture.remote.open_subscriptions(), 1);

    session.switch_identity(fixture.friend.clone()).await?;

    assert_eq!(fixture.remote.open_subscriptions(), 1);
    assert_eq!(fixture.remote.calls(Operation::Unsubscribe), 1);
    assert_eq!(session.conversations().identity(), &fixture.friend);
    assert_eq!(session.conversations().conversations()[0].display_name, "Me");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Message Stream
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn placeholder_then_patch() -> Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    fixture
        .remote
        .set_latency(Operation::ResolveDisplayName, Duration::from_millis(80));
    let session = session_for(&fixture).await;
    let chat = session.open_conversation(fixture.conversation.clone()).await?;

    fixture.friend_says("m1", 1_000);
    tokio::time::sleep(Duration::from_millis(1)).await;

    let before = chat.messages();
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].sender_name, "User u9");

    tokio::time::sleep(Duration::from_millis(100)).await;

    let after = chat.messages();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, before[0].id);
    assert_eq!(after[0].sender_name, FRIEND_NAME);
    assert_eq!(chat.resolver().get(&fixture.friend).as_deref(), Some(FRIEND_NAME));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn own_message_appears_once() -> Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let session = session_for(&fixture).await;
    let chat = session.open_conversation(fixture.conversation.clone()).await?;

    let sent = chat.send("see you at 6").await?;
    tokio::time::sleep(Duration::from_millis(10)).await;

    let messages = chat.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, sent.id);
    assert_eq!(messages[0].provenance, Provenance::LocalSend);
    assert!(messages[0].is_me);
    assert_eq!(chat.stats().self_echoes_dropped, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_sends_leave_the_list_alone() -> Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let session = session_for(&fixture).await;
    let chat = session.open_conversation(fixture.conversation.clone()).await?;
    let before = chat.snapshot();

    assert!(matches!(chat.send("").await, Err(SyncError::EmptyMessage)));
    assert!(matches!(chat.send("   ").await, Err(SyncError::EmptyMessage)));
    assert_eq!(chat.snapshot(), before);

    fixture.remote.set_failing(Operation::SendMessage, true);
    let err = chat.send("hello").await.unwrap_err();
    assert!(matches!(err, SyncError::Send(_)));

    let state = chat.snapshot();
    assert!(state.messages.is_empty());
    assert_eq!(state.error, Some(err.user_message()));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn two_parties_see_the_same_conversation() -> Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let mine = session_for(&fixture).await;
    let theirs = Session::start(
        Arc::clone(&fixture.remote),
        fixture.friend.clone(),
        SessionConfig::default(),
    )
    .await;

    let my_chat = mine.open_conversation(fixture.conversation.clone()).await?;
    let their_chat = theirs.open_conversation(fixture.conversation.clone()).await?;

    my_chat.send("ping").await?;
    tokio::time::sleep(Duration::from_millis(1)).await;
    their_chat.send("pong").await?;
    tokio::time::sleep(Duration::from_millis(10)).await;

    let texts = |chat: &kindred::MessageStreamSync<kindred::MemoryRemote>| {
        chat.messages()
            .into_iter()
            .map(|m| m.text)
            .collect::<Vec<_>>()
    };
    assert_eq!(texts(&my_chat), vec!["ping", "pong"]);
    assert_eq!(texts(&their_chat), vec!["ping", "pong"]);
    assert_eq!(their_chat.messages()[0].sender_name, "User me");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn each_open_gets_its_own_subscription() -> Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let session = session_for(&fixture).await;

    let first = session.open_conversation(fixture.conversation.clone()).await?;
    let second = session.open_conversation(fixture.conversation.clone()).await?;
    assert_eq!(fixture.remote.open_subscriptions(), 3);

    drop(first);
    second.shutdown();
    second.shutdown();
    assert_eq!(fixture.remote.open_subscriptions(), 1);

    session.shutdown();
    assert_eq!(fixture.remote.open_subscriptions(), 0);
    assert_eq!(fixture.remote.calls(Operation::Unsubscribe), 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn group_conversation_resolves_each_sender_once() -> Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let members = users(3);
    for (i, member) in members.iter().enumerate() {
        fixture.remote.add_profile(member, format!("Member {}", i));
    }
    fixture
        .remote
        .set_latency(Operation::ResolveDisplayName, Duration::from_millis(50));
    let session = session_for(&fixture).await;
    let chat = session.open_conversation(fixture.conversation.clone()).await?;

    for round in 0..2 {
        for (i, member) in members.iter().enumerate() {
            let id = format!("g{}-{}", round, i);
            let at = 1_000 + (round * 10 + i) as i64;
            fixture
                .remote
                .insert_message(fixture.record(&id, member, "hi", at));
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(fixture.remote.calls(Operation::ResolveDisplayName), 3);
    let messages = chat.messages();
    assert_eq!(messages.len(), 6);
    assert!(is_ordered(&messages));
    assert!(messages.iter().all(|m| m.sender_name.starts_with("Member ")));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn stream_stays_ordered_without_self_duplicates(batch: EventBatch) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();

        let (count, ordered, mine) = rt.block_on(async {
            let fixture = TestFixture::new();
            let session = Session::start(
                Arc::clone(&fixture.remote),
                batch.identity.clone(),
                SessionConfig::default(),
            )
            .await;
            let chat = session.open_conversation(batch.conversation.clone()).await.unwrap();

            let sent = chat.send("from this device").await.unwrap();
            for event in batch.events() {
                fixture.remote.publish(event);
            }
            tokio::time::sleep(Duration::from_millis(200)).await;

            let messages = chat.messages();
            let mine = messages.iter().filter(|m| m.sender_id == UserId::new("me")).count();
            assert!(messages.iter().any(|m| m.id == sent.id));
            (messages.len(), is_ordered(&messages), mine)
        });

        prop_assert!(ordered);
        prop_assert_eq!(mine, 1);
        prop_assert_eq!(count, batch.foreign().count() + 1);
    }
}
