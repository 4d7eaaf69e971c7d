use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use shared::domain::{ChannelId, GuildId};
use shared::protocol::{ChannelRecord, GuildRecord, RoleRecord};

use crate::{RemoteCache, RemoteCacheError};

#[derive(Default)]
struct MemoryState {
    guilds: HashMap<GuildId, GuildRecord>,
    roles: HashMap<GuildId, Vec<RoleRecord>>,
    channels: HashMap<ChannelId, ChannelRecord>,
}

/// In-memory `RemoteCache` for tests and the replay tool. Lookups never
/// fail; absence is the only miss mode.
#[derive(Default)]
pub struct MemoryRemoteCache {
    state: Mutex<MemoryState>,
}

impl MemoryRemoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_guild(&self, record: GuildRecord) {
        self.state.lock().await.guilds.insert(record.id.clone(), record);
    }

    pub async fn put_role(&self, record: RoleRecord) {
        self.state
            .lock()
            .await
            .roles
            .entry(record.guild_id.clone())
            .or_default()
            .push(record);
    }

    pub async fn put_channel(&self, record: ChannelRecord) {
        self.state
            .lock()
            .await
            .channels
            .insert(record.id.clone(), record);
    }
}

#[async_trait]
impl RemoteCache for MemoryRemoteCache {
    async fn guild(&self, id: &GuildId) -> Result<Option<GuildRecord>, RemoteCacheError> {
        Ok(self.state.lock().await.guilds.get(id).cloned())
    }

    async fn channel(&self, id: &ChannelId) -> Result<Option<ChannelRecord>, RemoteCacheError> {
        Ok(self.state.lock().await.channels.get(id).cloned())
    }

    async fn roles_for_guild(&self, id: &GuildId) -> Result<Vec<RoleRecord>, RemoteCacheError> {
        Ok(self
            .state
            .lock()
            .await
            .roles
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn channels_for_guild(
        &self,
        id: &GuildId,
    ) -> Result<Vec<ChannelRecord>, RemoteCacheError> {
        Ok(self
            .state
            .lock()
            .await
            .channels
            .values()
            .filter(|c| c.guild_id.as_ref() == Some(id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scoped_channel_scan_filters_by_guild() {
        let cache = MemoryRemoteCache::new();
        cache
            .put_channel(ChannelRecord {
                id: ChannelId::new("1"),
                guild_id: Some(GuildId::new("7")),
                kind_tag: 0,
                last_message_id: None,
            })
            .await;
        cache
            .put_channel(ChannelRecord {
                id: ChannelId::new("2"),
                guild_id: Some(GuildId::new("8")),
                kind_tag: 0,
                last_message_id: None,
            })
            .await;

        let channels = cache
            .channels_for_guild(&GuildId::new("7"))
            .await
            .expect("scan");
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].id, ChannelId::new("1"));
    }

    #[tokio::test]
    async fn missing_guild_is_a_non_error_miss() {
        let cache = MemoryRemoteCache::new();
        let hit = cache.guild(&GuildId::new("404")).await.expect("lookup");
        assert!(hit.is_none());
    }
}
