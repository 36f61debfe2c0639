//! Proptest generators for property-based testing.

use proptest::prelude::*;

use kindred_core::{
    ChangeEvent, ChangeKind, ConversationId, MessageId, MessageRecord, OrderingKey, UserId,
};

/// Generate a user id.
pub fn user_id() -> impl Strategy<Value = UserId> {
    "[a-z0-9]{1,12}".prop_map(UserId::new)
}

/// Generate message text, never blank.
pub fn message_text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 ]{0,39}".prop_map(String::from)
}

/// Generate text that a send must reject.
pub fn blank_text() -> impl Strategy<Value = String> {
    "[ \t\n]{0,8}".prop_map(String::from)
}

/// Generate a ChangeKind.
pub fn change_kind() -> impl Strategy<Value = ChangeKind> {
    prop_oneof![
        Just(ChangeKind::Insert),
        Just(ChangeKind::Update),
        Just(ChangeKind::Delete),
    ]
}

/// Inbound records for one conversation, in delivery order.
///
/// Delivery order is a shuffle of send order, and some records are authored
/// by `identity` itself, as a transport that echoes writes would deliver.
#[derive(Debug, Clone)]
pub struct EventBatch {
    pub identity: UserId,
    pub conversation: ConversationId,
    pub records: Vec<MessageRecord>,
}

impl EventBatch {
    /// Records not authored by `identity`.
    pub fn foreign(&self) -> impl Iterator<Item = &MessageRecord> {
        self.records.iter().filter(|r| r.sender_id != self.identity)
    }

    /// Insert events, in delivery order.
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.records.iter().cloned().map(ChangeEvent::insert).collect()
    }
}

/// Generate an [`EventBatch`] of 1 to `max_len` records.
pub fn event_batch(max_len: usize) -> impl Strategy<Value = EventBatch> {
    prop::collection::vec((0usize..3, 0i64..100_000), 1..=max_len.max(1))
        .prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(i, (sender, at))| MessageRecord {
                    id: MessageId::new(format!("m{}", i)),
                    conversation_id: ConversationId::new("c1"),
                    sender_id: UserId::new(["me", "u1", "u2"][sender]),
                    sender_name: None,
                    text: format!("text {}", i),
                    sent_at: OrderingKey::from_millis(at),
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
        .prop_map(|records| EventBatch {
            identity: UserId::new("me"),
            conversation: ConversationId::new("c1"),
            records,
        })
}

impl Arbitrary for EventBatch {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        event_batch(32).boxed()
    }
}
