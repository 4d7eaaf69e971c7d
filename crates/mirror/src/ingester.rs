use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{trace, warn};

use shared::domain::{Channel, Message};
use shared::protocol::{MessageRecord, MirrorEvent};

use crate::store::LocalStateStore;

/// Idempotently materializes messages and emits notifications. The legacy
/// `message` notification fires for every ingested message; the deprecation
/// warning for it fires once per ingester instance.
pub struct MessageIngester {
    store: Arc<LocalStateStore>,
    events: broadcast::Sender<MirrorEvent>,
    legacy_warning_emitted: AtomicBool,
}

impl MessageIngester {
    pub fn new(store: Arc<LocalStateStore>, events: broadcast::Sender<MirrorEvent>) -> Self {
        Self {
            store,
            events,
            legacy_warning_emitted: AtomicBool::new(false),
        }
    }

    /// Returns `None` for non-text-capable channels. Re-delivery of an
    /// already-stored message id returns the stored message unchanged and
    /// emits nothing.
    pub async fn ingest(&self, channel: &Channel, record: &MessageRecord) -> Option<Message> {
        if !channel.kind.is_text_capable() {
            trace!(
                channel_id = %channel.id,
                kind = ?channel.kind,
                "dropping message for non-text channel"
            );
            return None;
        }

        let (message, inserted) = self
            .store
            .insert_message_if_absent(&channel.id, record.clone().into_message())
            .await;
        if !inserted {
            return Some(message);
        }

        let _ = self.events.send(MirrorEvent::MessageCreated {
            message: message.clone(),
        });
        let _ = self.events.send(MirrorEvent::LegacyMessage {
            message: message.clone(),
        });
        if !self.legacy_warning_emitted.swap(true, Ordering::SeqCst) {
            warn!("the legacy `message` notification is deprecated, subscribe to `message_created` instead");
            let _ = self.events.send(MirrorEvent::LegacyMessageDeprecation);
        }

        Some(message)
    }
}

#[cfg(test)]
#[path = "tests/ingester_tests.rs"]
mod tests;
