pub mod config;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

pub mod consumer;
pub mod dispatcher;
pub mod hydrator;
pub mod ingester;
pub mod resolver;
pub mod store;

pub use config::{load_settings, Settings};
pub use consumer::QueueConsumer;
pub use dispatcher::{EventDispatcher, GatewayEvent, MirrorContext};
pub use hydrator::GuildHydrator;
pub use ingester::MessageIngester;
pub use resolver::ChannelResolver;
pub use store::LocalStateStore;
