use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(GuildId);
id_newtype!(RoleId);
id_newtype!(ChannelId);
id_newtype!(MessageId);
id_newtype!(UserId);

pub type ShardId = u32;

/// Channel classification decoded from the gateway's integer `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    Dm,
    Voice,
    Category,
    Unknown(u8),
}

impl ChannelKind {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            0 => ChannelKind::Text,
            1 => ChannelKind::Dm,
            2 => ChannelKind::Voice,
            4 => ChannelKind::Category,
            other => ChannelKind::Unknown(other),
        }
    }

    /// Whether messages can be ingested for this channel.
    pub fn is_text_capable(self) -> bool {
        matches!(self, ChannelKind::Text | ChannelKind::Dm)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: GuildId,
    pub roles: HashSet<RoleId>,
    pub channels: HashSet<ChannelId>,
}

impl Guild {
    pub fn new(id: GuildId) -> Self {
        Self {
            id,
            roles: HashSet::new(),
            channels: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub guild_id: GuildId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub kind: ChannelKind,
    pub last_message_id: Option<MessageId>,
}

/// Immutable once stored; only the owning channel's last-message pointer
/// moves afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: Option<UserId>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
