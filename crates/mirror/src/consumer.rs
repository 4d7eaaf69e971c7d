use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use shared::domain::ShardId;
use shared::protocol::GatewayPacket;

use crate::dispatcher::EventDispatcher;

struct ShardLane {
    tx: mpsc::Sender<GatewayPacket>,
    handle: JoinHandle<()>,
}

/// Drives packets from the transport into the dispatcher. Packets routed to
/// the same shard are dispatched strictly in delivery order on one lane
/// task; lanes for different shards run concurrently.
pub struct QueueConsumer {
    dispatcher: Arc<EventDispatcher>,
    lane_buffer: usize,
    lanes: HashMap<ShardId, ShardLane>,
}

impl QueueConsumer {
    pub fn new(dispatcher: Arc<EventDispatcher>, lane_buffer: usize) -> Self {
        Self {
            dispatcher,
            lane_buffer,
            lanes: HashMap::new(),
        }
    }

    /// Consumes `inbound` until the transport closes it, then drains every
    /// lane before returning.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<GatewayPacket>) {
        while let Some(packet) = inbound.recv().await {
            self.forward(packet).await;
        }
        for (shard_id, lane) in self.lanes.drain() {
            drop(lane.tx);
            if lane.handle.await.is_err() {
                debug!(shard_id, "shard lane task aborted during drain");
            }
        }
    }

    async fn forward(&mut self, packet: GatewayPacket) {
        let shard_id = packet.shard_id.unwrap_or(0);
        let lane = self.lanes.entry(shard_id).or_insert_with(|| {
            let (tx, mut rx) = mpsc::channel::<GatewayPacket>(self.lane_buffer);
            let dispatcher = Arc::clone(&self.dispatcher);
            let handle = tokio::spawn(async move {
                while let Some(packet) = rx.recv().await {
                    dispatcher.dispatch(packet).await;
                }
            });
            debug!(shard_id, "started shard lane");
            ShardLane { tx, handle }
        });
        // Send only fails when the lane task died; the packet is lost either
        // way under at-most-once delivery.
        let _ = lane.tx.send(packet).await;
    }
}

#[cfg(test)]
#[path = "tests/consumer_tests.rs"]
mod tests;
