//! In-memory implementation of MessageRepository
//!
//! Each channel owns an append-only log guarded by its own mutex. Appends
//! to one channel serialize; distinct channels never contend. Seq numbers
//! are dense and start at 1, so the entry at index `i` has seq `i + 1`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::instrument;

use classline_core::entities::Message;
use classline_core::traits::{MessageRepository, RepoResult};
use classline_core::value_objects::Snowflake;

/// In-memory implementation of MessageRepository
#[derive(Default)]
pub struct MemoryMessageRepository {
    logs: DashMap<Snowflake, Arc<Mutex<ChannelLog>>>,
}

#[derive(Default)]
struct ChannelLog {
    entries: Vec<Message>,
}

impl MemoryMessageRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self, channel_id: Snowflake) -> Arc<Mutex<ChannelLog>> {
        self.logs
            .entry(channel_id)
            .or_insert_with(|| Arc::new(Mutex::new(ChannelLog::default())))
            .clone()
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    #[instrument(skip(self, message), fields(channel_id = %message.channel_id))]
    async fn append(&self, mut message: Message) -> RepoResult<Message> {
        let log = self.log(message.channel_id);
        let mut log = log.lock();

        // Seq is assigned under the lock; no two appends observe the same
        // value and readers never see a gap.
        message.seq = log.entries.len() as u64 + 1;
        log.entries.push(message.clone());
        Ok(message)
    }

    async fn read_since(
        &self,
        channel_id: Snowflake,
        after_seq: u64,
        limit: usize,
    ) -> RepoResult<Vec<Message>> {
        let Some(log) = self.logs.get(&channel_id).map(|l| l.clone()) else {
            return Ok(Vec::new());
        };
        let log = log.lock();

        let start = (after_seq as usize).min(log.entries.len());
        Ok(log.entries[start..].iter().take(limit).cloned().collect())
    }

    async fn latest_seq(&self, channel_id: Snowflake) -> RepoResult<u64> {
        Ok(self
            .logs
            .get(&channel_id)
            .map(|log| log.lock().entries.len() as u64)
            .unwrap_or(0))
    }

    async fn count_since(&self, channel_id: Snowflake, after_seq: u64) -> RepoResult<u64> {
        Ok(self.latest_seq(channel_id).await?.saturating_sub(after_seq))
    }
}
