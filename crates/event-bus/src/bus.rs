//! The event bus seam: publishing, subscribing, and per-message delivery.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_core::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::Result;
use crate::retry::{DeliveryOutcome, RetryPolicy, deliver};

/// A message as stored in a topic partition and handed to consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
    /// Partitioning key supplied by the publisher.
    pub key: String,
    /// Raw payload bytes; decoding is the consumer's concern.
    pub payload: Vec<u8>,
    pub published_at: DateTime<Utc>,
}

/// Where a published message landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessagePosition {
    pub partition: u32,
    pub offset: u64,
}

/// Stream of messages replayed from a topic log.
pub type MessageStream = Pin<Box<dyn Stream<Item = Message> + Send>>;

/// Callback invoked once per delivered message.
///
/// Returning an error asks the bus to redeliver the message according to
/// its retry policy. Handlers that want to drop a message (for example an
/// undecodable payload) log it and return `Ok(())`.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn on_message(&self, message: &Message) -> Result<()>;
}

/// Publish/subscribe access to named topics.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Appends `payload` to `topic`, choosing the partition from `key`.
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<MessagePosition>;

    /// Registers `group` as a consumer of `topics`.
    ///
    /// Only messages published after this call are delivered.
    async fn subscribe(&self, group: &str, topics: &[&str]) -> Result<Subscription>;
}

/// Messages flowing to one consumer group from a single topic partition.
pub(crate) struct PartitionFeed {
    pub(crate) topic: String,
    pub(crate) partition: u32,
    pub(crate) receiver: mpsc::UnboundedReceiver<Message>,
}

/// A consumer group's registration, ready to be attached to a handler.
pub struct Subscription {
    group: String,
    feeds: Vec<PartitionFeed>,
    retry: RetryPolicy,
}

impl Subscription {
    pub(crate) fn new(group: String, feeds: Vec<PartitionFeed>, retry: RetryPolicy) -> Self {
        Self {
            group,
            feeds,
            retry,
        }
    }

    /// The consumer group this subscription belongs to.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Retry policy the bus applies to failed deliveries.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Number of topic partitions feeding this subscription.
    pub fn partition_count(&self) -> usize {
        self.feeds.len()
    }

    /// Starts delivering messages to `handler`.
    ///
    /// One task is spawned per topic partition. Within a partition the
    /// handler sees messages strictly in offset order, one at a time;
    /// partitions are consumed concurrently. Dropping the returned handle
    /// stops delivery.
    pub fn run<H: MessageHandler>(self, handler: Arc<H>) -> SubscriptionHandle {
        let mut tasks = JoinSet::new();
        for feed in self.feeds {
            let handler = Arc::clone(&handler);
            let retry = self.retry.clone();
            let group = self.group.clone();
            tasks.spawn(consume_partition(feed, handler, retry, group));
        }
        tracing::debug!(group = %self.group, tasks = tasks.len(), "subscription running");
        SubscriptionHandle {
            group: self.group,
            tasks,
        }
    }
}

async fn consume_partition<H: MessageHandler>(
    mut feed: PartitionFeed,
    handler: Arc<H>,
    retry: RetryPolicy,
    group: String,
) {
    while let Some(message) = feed.receiver.recv().await {
        if let DeliveryOutcome::Exhausted { attempts, .. } =
            deliver(handler.as_ref(), &message, &retry, &group).await
        {
            tracing::debug!(%group, offset = message.offset, attempts, "message skipped");
        }
    }
    tracing::debug!(
        %group,
        topic = %feed.topic,
        partition = feed.partition,
        "partition feed closed"
    );
}

/// Running delivery tasks for one subscription.
pub struct SubscriptionHandle {
    group: String,
    tasks: JoinSet<()>,
}

impl SubscriptionHandle {
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Number of delivery tasks still running.
    pub fn active_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Stops delivery immediately; in-flight handler calls are cancelled.
    pub async fn shutdown(mut self) {
        self.tasks.shutdown().await;
        tracing::info!(group = %self.group, "subscription stopped");
    }
}
