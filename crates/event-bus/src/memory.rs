use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{RwLock, mpsc};

use crate::bus::PartitionFeed;
use crate::{
    BusConfig, EventBus, EventBusError, Message, MessagePosition, MessageStream, Result,
    Subscription,
};

/// Append-only log and consumer registrations for a single topic.
struct TopicState {
    log: Vec<Message>,
    next_offsets: Vec<u64>,
    /// Per consumer group, one sender per partition.
    groups: HashMap<String, Vec<mpsc::UnboundedSender<Message>>>,
}

impl TopicState {
    fn new(partitions: u32) -> Self {
        Self {
            log: Vec::new(),
            next_offsets: vec![0; partitions as usize],
            groups: HashMap::new(),
        }
    }
}

struct Inner {
    config: BusConfig,
    topics: RwLock<HashMap<String, TopicState>>,
    closed: AtomicBool,
}

/// In-process event bus with partitioned, append-only topic logs.
///
/// Topics are created on first use. Every consumer group subscribed to a
/// topic receives every message published to it after subscribing. Cloning
/// yields another handle to the same bus.
#[derive(Clone)]
pub struct InMemoryEventBus {
    inner: Arc<Inner>,
}

impl InMemoryEventBus {
    /// Creates a bus with the default configuration.
    pub fn new() -> Self {
        Self::build(BusConfig::default())
    }

    /// Creates a bus with the given configuration.
    pub fn with_config(config: BusConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                topics: RwLock::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Rejects all further publishes and subscriptions.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        tracing::info!("event bus closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Returns every message published to `topic`, in append order.
    pub async fn messages(&self, topic: &str) -> Vec<Message> {
        self.inner
            .topics
            .read()
            .await
            .get(topic)
            .map(|state| state.log.clone())
            .unwrap_or_default()
    }

    /// Returns the number of messages published to `topic`.
    pub async fn message_count(&self, topic: &str) -> usize {
        self.inner
            .topics
            .read()
            .await
            .get(topic)
            .map_or(0, |state| state.log.len())
    }

    /// Streams a snapshot of the `topic` log from the beginning.
    pub async fn replay(&self, topic: &str) -> MessageStream {
        let messages = self.messages(topic).await;
        Box::pin(futures_util::stream::iter(messages))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(EventBusError::Connection("bus is closed".to_string()));
        }
        Ok(())
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a key to a partition. Stable for the lifetime of the process.
fn partition_for(key: &str, partitions: u32) -> u32 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % u64::from(partitions)) as u32
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<MessagePosition> {
        self.ensure_open()?;
        let partitions = self.inner.config.partitions;
        let partition = partition_for(key, partitions);

        let mut topics = self.inner.topics.write().await;
        let state = topics
            .entry(topic.to_string())
            .or_insert_with(|| TopicState::new(partitions));

        let offset = state.next_offsets[partition as usize];
        state.next_offsets[partition as usize] += 1;

        let message = Message {
            topic: topic.to_string(),
            partition,
            offset,
            key: key.to_string(),
            payload,
            published_at: Utc::now(),
        };

        for (group, senders) in &state.groups {
            if senders[partition as usize].send(message.clone()).is_err() {
                tracing::debug!(%group, topic, partition, "consumer gone, message not delivered");
            }
        }
        state.log.push(message);

        metrics::counter!("bus_messages_published_total", "topic" => topic.to_string())
            .increment(1);
        tracing::trace!(topic, partition, offset, "message published");

        Ok(MessagePosition { partition, offset })
    }

    async fn subscribe(&self, group: &str, topics: &[&str]) -> Result<Subscription> {
        self.ensure_open()?;
        let partitions = self.inner.config.partitions;
        let mut state = self.inner.topics.write().await;

        // Validate everything first so a rejected call registers nothing.
        for topic in topics {
            if state
                .get(*topic)
                .is_some_and(|t| t.groups.contains_key(group))
            {
                return Err(EventBusError::AlreadySubscribed {
                    group: group.to_string(),
                    topic: topic.to_string(),
                });
            }
        }

        let mut feeds = Vec::new();
        for topic in topics {
            let topic_state = state
                .entry(topic.to_string())
                .or_insert_with(|| TopicState::new(partitions));
            let mut senders = Vec::with_capacity(partitions as usize);
            for partition in 0..partitions {
                let (tx, rx) = mpsc::unbounded_channel();
                senders.push(tx);
                feeds.push(PartitionFeed {
                    topic: topic.to_string(),
                    partition,
                    receiver: rx,
                });
            }
            topic_state.groups.insert(group.to_string(), senders);
            tracing::info!(group, topic, "subscribed");
        }

        Ok(Subscription::new(
            group.to_string(),
            feeds,
            self.inner.config.retry.clone(),
        ))
    }
}
