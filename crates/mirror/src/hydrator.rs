use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use remote_cache::{with_deadline, RemoteCache};
use shared::domain::{Guild, GuildId, Role};

use crate::store::LocalStateStore;

type HydrationFuture = Shared<BoxFuture<'static, Option<Guild>>>;

/// Ensures a guild and its dependent roles and channels are mirrored
/// locally before guild-dependent logic runs. Concurrent `ensure` calls for
/// the same absent id share one in-flight hydration instead of issuing
/// independent remote fetches.
pub struct GuildHydrator {
    store: Arc<LocalStateStore>,
    cache: Arc<dyn RemoteCache>,
    remote_timeout: Duration,
    in_flight: Arc<Mutex<HashMap<GuildId, HydrationFuture>>>,
}

impl GuildHydrator {
    pub fn new(
        store: Arc<LocalStateStore>,
        cache: Arc<dyn RemoteCache>,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            remote_timeout,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the mirrored guild, hydrating it from the remote cache when
    /// absent. `None` means the guild could not be resolved for this event:
    /// either the cache confirmed absence or the fetch failed; callers drop
    /// guild-dependent work for the current event only.
    pub async fn ensure(&self, guild_id: &GuildId) -> Option<Guild> {
        if let Some(guild) = self.store.guild(guild_id).await {
            return Some(guild);
        }

        let fut = {
            let mut in_flight = self.in_flight.lock().await;
            // The hydration that beat us to the slot may already have
            // completed and cleared it.
            if let Some(guild) = self.store.guild(guild_id).await {
                return Some(guild);
            }
            match in_flight.get(guild_id) {
                Some(pending) => pending.clone(),
                None => {
                    let fut = Self::hydrate(
                        Arc::clone(&self.store),
                        Arc::clone(&self.cache),
                        Arc::clone(&self.in_flight),
                        guild_id.clone(),
                        self.remote_timeout,
                    )
                    .boxed()
                    .shared();
                    in_flight.insert(guild_id.clone(), fut.clone());
                    fut
                }
            }
        };

        fut.await
    }

    /// The slot clears itself as the hydration's final step, so cleanup
    /// holds even when the caller that created it is dropped mid-flight.
    async fn hydrate(
        store: Arc<LocalStateStore>,
        cache: Arc<dyn RemoteCache>,
        in_flight: Arc<Mutex<HashMap<GuildId, HydrationFuture>>>,
        guild_id: GuildId,
        remote_timeout: Duration,
    ) -> Option<Guild> {
        let outcome =
            Self::fetch_and_populate(store, cache, guild_id.clone(), remote_timeout).await;
        in_flight.lock().await.remove(&guild_id);
        outcome
    }

    async fn fetch_and_populate(
        store: Arc<LocalStateStore>,
        cache: Arc<dyn RemoteCache>,
        guild_id: GuildId,
        remote_timeout: Duration,
    ) -> Option<Guild> {
        let record = match with_deadline(remote_timeout, cache.guild(&guild_id)).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(guild_id = %guild_id, "guild absent from remote cache");
                return None;
            }
            Err(err) => {
                warn!(guild_id = %guild_id, %err, "remote guild fetch failed, treating as miss");
                return None;
            }
        };

        store.insert_guild_if_absent(Guild::new(record.id)).await;

        // A failed dependent scan leaves the guild inserted; the missing
        // entities hydrate on their next reference.
        match with_deadline(remote_timeout, cache.roles_for_guild(&guild_id)).await {
            Ok(roles) => {
                for role in roles {
                    store
                        .insert_role_if_absent(Role {
                            id: role.id,
                            guild_id: role.guild_id,
                        })
                        .await;
                }
            }
            Err(err) => {
                warn!(guild_id = %guild_id, %err, "role scan failed during hydration");
            }
        }

        match with_deadline(remote_timeout, cache.channels_for_guild(&guild_id)).await {
            Ok(channels) => {
                for record in channels {
                    if record.guild_id.as_ref() != Some(&guild_id) {
                        continue;
                    }
                    store.insert_channel_if_absent(record.into_channel()).await;
                }
            }
            Err(err) => {
                warn!(guild_id = %guild_id, %err, "channel scan failed during hydration");
            }
        }

        store.guild(&guild_id).await
    }
}

#[cfg(test)]
#[path = "tests/hydrator_tests.rs"]
mod tests;
