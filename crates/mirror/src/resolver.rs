use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use remote_cache::{with_deadline, RemoteCache};
use shared::domain::{Channel, ChannelId};
use shared::protocol::ChannelRecord;

use crate::store::LocalStateStore;

/// Resolves a channel through a fixed fallback chain: local mirror, remote
/// point lookup, then a channel built from the event's own inline payload.
pub struct ChannelResolver {
    store: Arc<LocalStateStore>,
    cache: Arc<dyn RemoteCache>,
    remote_timeout: Duration,
    persist_fallback: bool,
}

impl ChannelResolver {
    pub fn new(
        store: Arc<LocalStateStore>,
        cache: Arc<dyn RemoteCache>,
        remote_timeout: Duration,
        persist_fallback: bool,
    ) -> Self {
        Self {
            store,
            cache,
            remote_timeout,
            persist_fallback,
        }
    }

    /// Always yields a usable channel. When both the local mirror and the
    /// remote cache miss, the returned channel is built from `inline`; with
    /// `persist_fallback` off it is ephemeral and a later lookup for the
    /// same id may yield a different instance.
    pub async fn resolve(&self, channel_id: &ChannelId, inline: &ChannelRecord) -> Channel {
        if let Some(channel) = self.store.channel(channel_id).await {
            return channel;
        }

        match with_deadline(self.remote_timeout, self.cache.channel(channel_id)).await {
            Ok(Some(record)) => {
                return self.store.insert_channel_if_absent(record.into_channel()).await;
            }
            Ok(None) => {
                debug!(channel_id = %channel_id, "channel absent from remote cache");
            }
            Err(err) => {
                warn!(channel_id = %channel_id, %err, "remote channel fetch failed, treating as miss");
            }
        }

        let fallback = inline.clone().into_channel();
        if self.persist_fallback {
            self.store.insert_channel_if_absent(fallback).await
        } else {
            fallback
        }
    }
}

#[cfg(test)]
#[path = "tests/resolver_tests.rs"]
mod tests;
