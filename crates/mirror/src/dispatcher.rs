use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, trace, warn};

use shared::domain::GuildId;
use shared::protocol::{ChannelRecord, GatewayPacket, MessageRecord, MirrorEvent};

use crate::hydrator::GuildHydrator;
use crate::ingester::MessageIngester;
use crate::resolver::ChannelResolver;
use crate::store::LocalStateStore;

/// Decoded gateway event. One variant per wire tag the mirror handles;
/// every other tag is ignored.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    MessageCreate(MessageRecord),
    MessageCreateRaw(serde_json::Value),
    ChannelCreate(ChannelRecord),
}

impl GatewayEvent {
    /// `Ok(None)` for tags the mirror does not handle.
    pub fn decode(event_type: &str, payload: serde_json::Value) -> Result<Option<Self>> {
        let event = match event_type {
            "MESSAGE_CREATE" => Some(GatewayEvent::MessageCreate(
                serde_json::from_value(payload).context("malformed MESSAGE_CREATE payload")?,
            )),
            "MESSAGE_CREATE_RAW" => Some(GatewayEvent::MessageCreateRaw(payload)),
            "CHANNEL_CREATE" => Some(GatewayEvent::ChannelCreate(
                serde_json::from_value(payload).context("malformed CHANNEL_CREATE payload")?,
            )),
            _ => None,
        };
        Ok(event)
    }

    /// Guild the event belongs to, when its payload names one. Drives the
    /// hydrate-before-handle step.
    pub fn guild_id(&self) -> Option<&GuildId> {
        match self {
            GatewayEvent::MessageCreate(record) => record.guild_id.as_ref(),
            GatewayEvent::MessageCreateRaw(_) => None,
            GatewayEvent::ChannelCreate(record) => record.guild_id.as_ref(),
        }
    }
}

/// Everything a handler needs, passed explicitly instead of threading an
/// implicit client through the call tree.
pub struct MirrorContext {
    pub store: Arc<LocalStateStore>,
    pub hydrator: GuildHydrator,
    pub resolver: ChannelResolver,
    pub ingester: MessageIngester,
    pub events: broadcast::Sender<MirrorEvent>,
}

/// Routes decoded packets to handlers. Hydrates the referenced guild before
/// the handler runs, and absorbs handler failures so one bad packet cannot
/// take down a shard stream.
pub struct EventDispatcher {
    ctx: MirrorContext,
}

impl EventDispatcher {
    pub fn new(ctx: MirrorContext) -> Self {
        Self { ctx }
    }

    /// At-most-once: the packet is considered handled on every path out of
    /// here, including decode failures and handler errors.
    pub async fn dispatch(&self, packet: GatewayPacket) {
        let event = match GatewayEvent::decode(&packet.event_type, packet.payload) {
            Ok(Some(event)) => event,
            Ok(None) => {
                trace!(event_type = %packet.event_type, "ignoring unhandled event type");
                return;
            }
            Err(err) => {
                warn!(event_type = %packet.event_type, %err, "dropping undecodable packet");
                return;
            }
        };

        if let Some(guild_id) = event.guild_id() {
            // Miss is fine: the handler still runs, its guild-dependent
            // lookups simply miss too.
            let _ = self.ctx.hydrator.ensure(guild_id).await;
        }

        let event_type = packet.event_type;
        if let Err(err) = self.handle(event).await {
            error!(%event_type, %err, "event handler failed, packet consumed");
        }
    }

    async fn handle(&self, event: GatewayEvent) -> Result<()> {
        match event {
            GatewayEvent::MessageCreate(record) => {
                // The message payload carries no channel type tag; a message
                // implies a text-capable channel, so the inline fallback
                // assumes tag 0.
                let inline = ChannelRecord {
                    id: record.channel_id.clone(),
                    guild_id: record.guild_id.clone(),
                    kind_tag: 0,
                    last_message_id: None,
                };
                let channel = self.ctx.resolver.resolve(&record.channel_id, &inline).await;
                self.ctx.ingester.ingest(&channel, &record).await;
            }
            GatewayEvent::MessageCreateRaw(payload) => {
                let _ = self
                    .ctx
                    .events
                    .send(MirrorEvent::RawMessageCreate { payload });
            }
            GatewayEvent::ChannelCreate(record) => {
                self.ctx
                    .store
                    .insert_channel_if_absent(record.into_channel())
                    .await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
