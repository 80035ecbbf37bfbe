//! Block header feed
//!
//! Polls the node for new blocks and publishes a `BlockHeader` per block on
//! the bus, which is where the reporter's gas accounting comes from.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use shared::{BlockHeader, BusEvent, EventBus, ProcessId, process_debug, process_warn};

use crate::error::RunnerResult;
use crate::traits::ChainClient;

pub const DEFAULT_POLL: Duration = Duration::from_millis(100);

pub struct BlockWatcher {
    chain: Arc<dyn ChainClient>,
    bus: EventBus,
    poll: Duration,
}

impl BlockWatcher {
    pub fn new(chain: Arc<dyn ChainClient>, bus: EventBus) -> Self {
        Self {
            chain,
            bus,
            poll: DEFAULT_POLL,
        }
    }

    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    /// Start watching from the current head; blocks already mined are skipped
    pub async fn spawn(self) -> RunnerResult<JoinHandle<()>> {
        let mut last = self.chain.block_number().await?;
        process_debug!(ProcessId::current(), "⛓️ Watching blocks after #{}", last);

        Ok(tokio::spawn(async move {
            let mut ticker = interval(self.poll);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.publish_new(last).await {
                    Ok(head) => last = head,
                    Err(e) => process_warn!(ProcessId::current(), "⚠️ Block poll failed: {}", e),
                }
            }
        }))
    }

    /// Publish every block after `last`; returns the last published number
    async fn publish_new(&self, last: u64) -> RunnerResult<u64> {
        let head = self.chain.block_number().await?;
        let mut published = last;
        for number in last + 1..=head {
            let Some(block) = self.chain.block_by_number(number).await? else {
                break;
            };
            self.bus.publish(BusEvent::BlockHeader(BlockHeader {
                number,
                gas_used: block.gas_used,
            }));
            published = number;
        }
        Ok(published)
    }
}
