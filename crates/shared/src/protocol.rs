use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Channel, ChannelId, ChannelKind, GuildId, Message, MessageId, RoleId, ShardId, UserId,
};

/// One event delivered over the inbound queue. The envelope keys match the
/// upstream gateway framing: `t` carries the event-type tag, `d` the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPacket {
    #[serde(rename = "t")]
    pub event_type: String,
    #[serde(rename = "d")]
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_id: Option<ShardId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildRecord {
    pub id: GuildId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub guild_id: GuildId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: ChannelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<GuildId>,
    #[serde(rename = "type")]
    pub kind_tag: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<MessageId>,
}

impl ChannelRecord {
    pub fn into_channel(self) -> Channel {
        Channel {
            id: self.id,
            guild_id: self.guild_id,
            kind: ChannelKind::from_tag(self.kind_tag),
            last_message_id: self.last_message_id,
        }
    }
}

/// The author object nested in gateway message payloads. Only the id is
/// mirrored; the remaining profile fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: MessageId,
    pub channel_id: ChannelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<GuildId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorRecord>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MessageRecord {
    pub fn into_message(self) -> Message {
        Message {
            id: self.id,
            channel_id: self.channel_id,
            author_id: self.author.map(|a| a.id),
            content: self.content,
            created_at: self.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

/// Notifications emitted into the rest of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MirrorEvent {
    MessageCreated {
        message: Message,
    },
    /// Fires for every ingested message alongside `MessageCreated`.
    /// Deprecated: subscribe to `MessageCreated` instead.
    LegacyMessage {
        message: Message,
    },
    /// Emitted once per ingester instance, the first time `LegacyMessage`
    /// fires.
    LegacyMessageDeprecation,
    RawMessageCreate {
        payload: serde_json::Value,
    },
}
