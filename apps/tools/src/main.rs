use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use mirror::{
    load_settings, ChannelResolver, EventDispatcher, GuildHydrator, LocalStateStore,
    MessageIngester, MirrorContext, QueueConsumer,
};
use remote_cache::{MemoryRemoteCache, RemoteCache};
use shared::protocol::{ChannelRecord, GatewayPacket, GuildRecord, RoleRecord};

#[derive(Parser, Debug)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a JSON-lines packet capture through the pipeline against a
    /// seeded in-memory cache, printing emitted notifications.
    Replay {
        packets_file: String,
        #[arg(long)]
        cache_file: Option<String>,
        #[arg(long)]
        persist_fallback: bool,
    },
    /// Print a synthetic MESSAGE_CREATE capture suitable for `replay`.
    Synth {
        #[arg(long, default_value_t = 10)]
        count: u32,
        #[arg(long, default_value = "9")]
        channel_id: String,
        #[arg(long)]
        guild_id: Option<String>,
        #[arg(long, default_value_t = 1)]
        shards: u32,
    },
}

/// Seed-file shape: the entities the in-memory cache should answer with.
#[derive(Debug, Default, Deserialize)]
struct CacheSeed {
    #[serde(default)]
    guilds: Vec<GuildRecord>,
    #[serde(default)]
    roles: Vec<RoleRecord>,
    #[serde(default)]
    channels: Vec<ChannelRecord>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();
    match cli.command {
        Command::Replay {
            packets_file,
            cache_file,
            persist_fallback,
        } => replay(&packets_file, cache_file.as_deref(), persist_fallback).await,
        Command::Synth {
            count,
            channel_id,
            guild_id,
            shards,
        } => synth(count, &channel_id, guild_id.as_deref(), shards),
    }
}

async fn replay(packets_file: &str, cache_file: Option<&str>, persist_fallback: bool) -> Result<()> {
    let cache = Arc::new(MemoryRemoteCache::new());
    if let Some(path) = cache_file {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read cache seed '{path}'"))?;
        let seed: CacheSeed =
            serde_json::from_str(&raw).with_context(|| format!("invalid cache seed '{path}'"))?;
        for guild in seed.guilds {
            cache.put_guild(guild).await;
        }
        for role in seed.roles {
            cache.put_role(role).await;
        }
        for channel in seed.channels {
            cache.put_channel(channel).await;
        }
    }

    let mut settings = load_settings();
    settings.persist_fallback_channel = settings.persist_fallback_channel || persist_fallback;

    let cache: Arc<dyn RemoteCache> = cache;
    let store = Arc::new(LocalStateStore::new());
    let (events, mut rx) = broadcast::channel(settings.event_buffer);
    let ctx = MirrorContext {
        store: Arc::clone(&store),
        hydrator: GuildHydrator::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            settings.remote_timeout(),
        ),
        resolver: ChannelResolver::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            settings.remote_timeout(),
            settings.persist_fallback_channel,
        ),
        ingester: MessageIngester::new(Arc::clone(&store), events.clone()),
        events,
    };
    let dispatcher = Arc::new(EventDispatcher::new(ctx));
    let consumer = QueueConsumer::new(dispatcher, settings.lane_buffer);

    let printer = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(err) => eprintln!("unserializable notification: {err}"),
            }
        }
    });

    let raw = fs::read_to_string(packets_file)
        .with_context(|| format!("failed to read packet capture '{packets_file}'"))?;
    let (tx, inbound) = mpsc::channel(settings.lane_buffer);
    let feeder = tokio::spawn(async move {
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<GatewayPacket>(line) {
                Ok(packet) => {
                    if tx.send(packet).await.is_err() {
                        break;
                    }
                }
                Err(err) => eprintln!("skipping malformed packet line: {err}"),
            }
        }
    });

    consumer.run(inbound).await;
    feeder.await.context("packet feeder crashed")?;
    // All notification senders are gone once the consumer returns, so the
    // printer drains and exits on its own.
    printer.await.context("notification printer crashed")?;

    println!(
        "# mirrored: {} guilds, {} roles, {} channels",
        store.guild_count().await,
        store.role_count().await,
        store.channel_count().await,
    );
    Ok(())
}

fn synth(count: u32, channel_id: &str, guild_id: Option<&str>, shards: u32) -> Result<()> {
    let shards = shards.max(1);
    for i in 0..count {
        let mut payload = serde_json::json!({
            "id": Uuid::new_v4().to_string(),
            "channel_id": channel_id,
            "content": format!("synthetic message {i}"),
        });
        if let Some(guild_id) = guild_id {
            payload["guild_id"] = serde_json::Value::String(guild_id.to_string());
        }
        let packet = GatewayPacket {
            event_type: "MESSAGE_CREATE".to_string(),
            payload,
            shard_id: Some(i % shards),
        };
        println!("{}", serde_json::to_string(&packet)?);
    }
    Ok(())
}
