use std::collections::HashMap;

use tokio::sync::Mutex;

use shared::domain::{Channel, ChannelId, Guild, GuildId, Message, MessageId, Role, RoleId};

#[derive(Default)]
struct StoreInner {
    guilds: HashMap<GuildId, Guild>,
    roles: HashMap<RoleId, Role>,
    channels: HashMap<ChannelId, Channel>,
    messages: HashMap<ChannelId, HashMap<MessageId, Message>>,
}

/// In-memory mirror of the remote authoritative state. All mutation goes
/// through insert-if-absent methods under one lock, so concurrent shard
/// streams cannot construct the same entity twice. Membership only grows.
#[derive(Default)]
pub struct LocalStateStore {
    inner: Mutex<StoreInner>,
}

impl LocalStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn guild(&self, id: &GuildId) -> Option<Guild> {
        self.inner.lock().await.guilds.get(id).cloned()
    }

    pub async fn role(&self, id: &RoleId) -> Option<Role> {
        self.inner.lock().await.roles.get(id).cloned()
    }

    pub async fn channel(&self, id: &ChannelId) -> Option<Channel> {
        self.inner.lock().await.channels.get(id).cloned()
    }

    pub async fn message(&self, channel_id: &ChannelId, id: &MessageId) -> Option<Message> {
        self.inner
            .lock()
            .await
            .messages
            .get(channel_id)
            .and_then(|m| m.get(id))
            .cloned()
    }

    /// Returns the stored guild, inserting `guild` when the id is new.
    pub async fn insert_guild_if_absent(&self, guild: Guild) -> Guild {
        let mut inner = self.inner.lock().await;
        inner
            .guilds
            .entry(guild.id.clone())
            .or_insert(guild)
            .clone()
    }

    /// Inserts the role and registers it on its owning guild's role set.
    pub async fn insert_role_if_absent(&self, role: Role) -> Role {
        let mut inner = self.inner.lock().await;
        let stored = inner.roles.entry(role.id.clone()).or_insert(role).clone();
        if let Some(guild) = inner.guilds.get_mut(&stored.guild_id) {
            guild.roles.insert(stored.id.clone());
        }
        stored
    }

    /// Inserts the channel and, when guild-scoped, registers it on the
    /// owning guild's channel set.
    pub async fn insert_channel_if_absent(&self, channel: Channel) -> Channel {
        let mut inner = self.inner.lock().await;
        let stored = inner
            .channels
            .entry(channel.id.clone())
            .or_insert(channel)
            .clone();
        if let Some(guild_id) = stored.guild_id.as_ref() {
            if let Some(guild) = inner.guilds.get_mut(guild_id) {
                guild.channels.insert(stored.id.clone());
            }
        }
        stored
    }

    /// First insert wins; later deliveries of the same (channel, message) id
    /// return the stored entity with `false`. A fresh insert also advances
    /// the stored channel's last-message pointer.
    pub async fn insert_message_if_absent(
        &self,
        channel_id: &ChannelId,
        message: Message,
    ) -> (Message, bool) {
        let mut inner = self.inner.lock().await;
        let per_channel = inner.messages.entry(channel_id.clone()).or_default();
        if let Some(existing) = per_channel.get(&message.id) {
            return (existing.clone(), false);
        }
        let message_id = message.id.clone();
        per_channel.insert(message_id.clone(), message.clone());
        if let Some(channel) = inner.channels.get_mut(channel_id) {
            channel.last_message_id = Some(message_id);
        }
        (message, true)
    }

    pub async fn guild_count(&self) -> usize {
        self.inner.lock().await.guilds.len()
    }

    pub async fn role_count(&self) -> usize {
        self.inner.lock().await.roles.len()
    }

    pub async fn channel_count(&self) -> usize {
        self.inner.lock().await.channels.len()
    }

    pub async fn message_count(&self, channel_id: &ChannelId) -> usize {
        self.inner
            .lock()
            .await
            .messages
            .get(channel_id)
            .map_or(0, HashMap::len)
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
