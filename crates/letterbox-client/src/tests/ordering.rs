//! Merged message view ordering.

use super::harness::TestEnv;
use crate::{Direction, OutboundStatus};
use std::time::Duration;

async fn tick() {
    tokio::time::sleep(Duration::from_millis(2)).await;
}

#[tokio::test]
async fn conversation_reads_in_timestamp_order() {
    let env = TestEnv::new();
    let alice = env.client("alice").await;
    let bob = env.client("bob").await;

    bob.send("alice", "1").await.unwrap();
    bob.flush().await.unwrap();
    tick().await;
    alice.send("bob", "2").await.unwrap();
    alice.flush().await.unwrap();
    tick().await;
    bob.send("alice", "3").await.unwrap();
    bob.flush().await.unwrap();

    let view: Vec<(Direction, String)> = alice
        .list_messages()
        .await
        .unwrap()
        .into_iter()
        .map(|m| (m.direction, m.content()))
        .collect();
    assert_eq!(
        view,
        vec![
            (Direction::Received, "1".to_string()),
            (Direction::Sent, "2".to_string()),
            (Direction::Received, "3".to_string()),
        ]
    );
}

#[tokio::test]
async fn pending_messages_use_enqueue_time() {
    let env = TestEnv::new();
    let alice = env.client("alice").await;

    let first = alice.send("bob", "first").await.unwrap();
    tick().await;
    let second = alice.send("carol", "second").await.unwrap();

    let messages = alice.list_messages().await.unwrap();
    let ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![first, second]);
    assert!(messages
        .iter()
        .all(|m| m.status == Some(OutboundStatus::Pending)));
    assert!(messages[0].timestamp <= messages[1].timestamp);
}

#[tokio::test]
async fn sent_serialization_matches_caller_shape() {
    let env = TestEnv::new();
    let alice = env.client("alice").await;
    alice.send("bob", "hello").await.unwrap();
    alice.flush().await.unwrap();

    let messages = alice.list_messages().await.unwrap();
    let value = serde_json::to_value(&messages[0]).unwrap();
    assert_eq!(value["type"], "sent");
    assert_eq!(value["user"], "bob");
    assert_eq!(value["content"], "hello");
    assert_eq!(value["status"], "sent");
    assert!(value["timestamp"].as_f64().unwrap() > 0.0);
}
