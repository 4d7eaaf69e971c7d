use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use shared::domain::{ChannelId, GuildId};
use shared::protocol::{ChannelRecord, GuildRecord, RoleRecord};

pub mod memory;

pub use memory::MemoryRemoteCache;

/// Failure modes of the distributed cache, kept distinguishable from a
/// confirmed absence (`Ok(None)` / empty scan).
#[derive(Debug, Error)]
pub enum RemoteCacheError {
    #[error("remote cache call timed out after {limit:?}")]
    Timeout { limit: Duration },
    #[error("remote cache transport failed: {0}")]
    Transport(String),
}

/// Point lookups and guild-scoped scans against the authoritative remote
/// cache. Implementations live with the transport; this crate only carries
/// the contract and an in-memory stand-in.
#[async_trait]
pub trait RemoteCache: Send + Sync {
    async fn guild(&self, id: &GuildId) -> Result<Option<GuildRecord>, RemoteCacheError>;

    async fn channel(&self, id: &ChannelId) -> Result<Option<ChannelRecord>, RemoteCacheError>;

    /// All roles owned by the guild. An empty list is a valid result.
    async fn roles_for_guild(&self, id: &GuildId) -> Result<Vec<RoleRecord>, RemoteCacheError>;

    /// All channels the cache associates with the guild. Callers filter on
    /// `guild_id` before trusting the association.
    async fn channels_for_guild(
        &self,
        id: &GuildId,
    ) -> Result<Vec<ChannelRecord>, RemoteCacheError>;
}

/// Bounds a remote-cache call; expiry becomes `RemoteCacheError::Timeout`
/// so the caller's degradation path is the same as for transport failure.
pub async fn with_deadline<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, RemoteCacheError>>,
) -> Result<T, RemoteCacheError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RemoteCacheError::Timeout { limit }),
    }
}
