use std::sync::Arc;

use tokio::sync::broadcast;

use super::*;
use crate::test_support::{channel_record, message_record};
use shared::domain::{ChannelId, MessageId};
use shared::protocol::MirrorEvent;

fn ingester() -> (
    Arc<MessageIngester>,
    Arc<LocalStateStore>,
    broadcast::Receiver<MirrorEvent>,
) {
    let store = Arc::new(LocalStateStore::new());
    let (events, rx) = broadcast::channel(64);
    let ingester = Arc::new(MessageIngester::new(Arc::clone(&store), events));
    (ingester, store, rx)
}

fn drain(rx: &mut broadcast::Receiver<MirrorEvent>) -> Vec<MirrorEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test]
async fn non_text_channel_is_suppressed_silently() {
    let (ingester, store, mut rx) = ingester();
    let voice = channel_record("99", Some("7"), 2).into_channel();

    let out = ingester
        .ingest(&voice, &message_record("1", "99", Some("7")))
        .await;
    assert!(out.is_none());
    assert_eq!(store.message_count(&ChannelId::new("99")).await, 0);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn sequential_redelivery_returns_the_stored_message_without_reemitting() {
    let (ingester, store, mut rx) = ingester();
    let channel = channel_record("9", None, 0).into_channel();
    store.insert_channel_if_absent(channel.clone()).await;

    let first = ingester
        .ingest(&channel, &message_record("5", "9", None))
        .await
        .expect("first ingest");
    let second = ingester
        .ingest(&channel, &message_record("5", "9", None))
        .await
        .expect("second ingest");
    assert_eq!(second, first);
    assert_eq!(store.message_count(&ChannelId::new("9")).await, 1);

    let created: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, MirrorEvent::MessageCreated { .. }))
        .collect();
    assert_eq!(created.len(), 1);

    let stored = store.channel(&ChannelId::new("9")).await.expect("channel");
    assert_eq!(stored.last_message_id, Some(MessageId::new("5")));
}

#[tokio::test]
async fn concurrent_redelivery_stores_and_notifies_once() {
    let (ingester, store, mut rx) = ingester();
    let channel = channel_record("9", None, 0).into_channel();
    store.insert_channel_if_absent(channel.clone()).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let ingester = Arc::clone(&ingester);
        let channel = channel.clone();
        tasks.push(tokio::spawn(async move {
            ingester
                .ingest(&channel, &message_record("5", "9", None))
                .await
        }));
    }
    for task in tasks {
        assert!(task.await.expect("join").is_some());
    }

    assert_eq!(store.message_count(&ChannelId::new("9")).await, 1);
    let created = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, MirrorEvent::MessageCreated { .. }))
        .count();
    assert_eq!(created, 1);
}

#[tokio::test]
async fn legacy_notification_fires_per_message_but_warns_once() {
    let (ingester, store, mut rx) = ingester();
    let channel = channel_record("9", None, 0).into_channel();
    store.insert_channel_if_absent(channel.clone()).await;

    for id in ["1", "2", "3"] {
        ingester
            .ingest(&channel, &message_record(id, "9", None))
            .await
            .expect("ingest");
    }

    let events = drain(&mut rx);
    let legacy = events
        .iter()
        .filter(|e| matches!(e, MirrorEvent::LegacyMessage { .. }))
        .count();
    let deprecations = events
        .iter()
        .filter(|e| matches!(e, MirrorEvent::LegacyMessageDeprecation))
        .count();
    assert_eq!(legacy, 3);
    assert_eq!(deprecations, 1);
}
