use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use remote_cache::{RemoteCache, RemoteCacheError};
use shared::domain::{ChannelId, GuildId, MessageId, RoleId};
use shared::protocol::{ChannelRecord, GuildRecord, MessageRecord, RoleRecord};

/// Remote-cache fake that counts calls and can inject failures or delays.
#[derive(Default)]
pub struct ScriptedCache {
    guilds: Mutex<HashMap<GuildId, GuildRecord>>,
    roles: Mutex<HashMap<GuildId, Vec<RoleRecord>>>,
    channels: Mutex<HashMap<ChannelId, ChannelRecord>>,
    pub guild_fetches: AtomicUsize,
    pub channel_fetches: AtomicUsize,
    pub role_scans: AtomicUsize,
    pub channel_scans: AtomicUsize,
    pub fail_guild_fetch: AtomicBool,
    pub fail_channel_fetch: AtomicBool,
    pub fail_role_scan: AtomicBool,
    pub guild_fetch_delay: Mutex<Option<Duration>>,
}

impl ScriptedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_guild(&self, id: &str) {
        let record = guild_record(id);
        self.guilds
            .lock()
            .expect("guilds lock")
            .insert(record.id.clone(), record);
    }

    pub fn seed_role(&self, id: &str, guild_id: &str) {
        let record = role_record(id, guild_id);
        self.roles
            .lock()
            .expect("roles lock")
            .entry(record.guild_id.clone())
            .or_default()
            .push(record);
    }

    pub fn seed_channel(&self, id: &str, guild_id: Option<&str>, kind_tag: u8) {
        let record = channel_record(id, guild_id, kind_tag);
        self.channels
            .lock()
            .expect("channels lock")
            .insert(record.id.clone(), record);
    }
}

#[async_trait]
impl RemoteCache for ScriptedCache {
    async fn guild(&self, id: &GuildId) -> Result<Option<GuildRecord>, RemoteCacheError> {
        self.guild_fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.guild_fetch_delay.lock().expect("delay lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_guild_fetch.load(Ordering::SeqCst) {
            return Err(RemoteCacheError::Transport("cache node unreachable".into()));
        }
        Ok(self.guilds.lock().expect("guilds lock").get(id).cloned())
    }

    async fn channel(&self, id: &ChannelId) -> Result<Option<ChannelRecord>, RemoteCacheError> {
        self.channel_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_channel_fetch.load(Ordering::SeqCst) {
            return Err(RemoteCacheError::Transport("cache node unreachable".into()));
        }
        Ok(self.channels.lock().expect("channels lock").get(id).cloned())
    }

    async fn roles_for_guild(&self, id: &GuildId) -> Result<Vec<RoleRecord>, RemoteCacheError> {
        self.role_scans.fetch_add(1, Ordering::SeqCst);
        if self.fail_role_scan.load(Ordering::SeqCst) {
            return Err(RemoteCacheError::Transport("cache node unreachable".into()));
        }
        Ok(self
            .roles
            .lock()
            .expect("roles lock")
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    // Deliberately unscoped: returns every channel it holds, so callers'
    // own guild-id filtering is observable in tests.
    async fn channels_for_guild(
        &self,
        _id: &GuildId,
    ) -> Result<Vec<ChannelRecord>, RemoteCacheError> {
        self.channel_scans.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .channels
            .lock()
            .expect("channels lock")
            .values()
            .cloned()
            .collect())
    }
}

pub fn guild_record(id: &str) -> GuildRecord {
    GuildRecord {
        id: GuildId::new(id),
        name: None,
    }
}

pub fn role_record(id: &str, guild_id: &str) -> RoleRecord {
    RoleRecord {
        id: RoleId::new(id),
        guild_id: GuildId::new(guild_id),
    }
}

pub fn channel_record(id: &str, guild_id: Option<&str>, kind_tag: u8) -> ChannelRecord {
    ChannelRecord {
        id: ChannelId::new(id),
        guild_id: guild_id.map(GuildId::new),
        kind_tag,
        last_message_id: None,
    }
}

pub fn message_record(id: &str, channel_id: &str, guild_id: Option<&str>) -> MessageRecord {
    MessageRecord {
        id: MessageId::new(id),
        channel_id: ChannelId::new(channel_id),
        guild_id: guild_id.map(GuildId::new),
        author: None,
        content: format!("message {id}"),
        timestamp: None,
    }
}
