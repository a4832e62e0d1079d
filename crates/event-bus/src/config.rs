use crate::{EventBusError, Result, RetryPolicy};

/// Settings for an event bus instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Partitions created for every topic.
    pub partitions: u32,
    /// Redelivery policy for failed handler invocations.
    pub retry: RetryPolicy,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            partitions: 3,
            retry: RetryPolicy::default(),
        }
    }
}

impl BusConfig {
    /// Sets the partition count.
    pub fn with_partitions(mut self, partitions: u32) -> Self {
        self.partitions = partitions;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.partitions == 0 {
            return Err(EventBusError::InvalidConfig(
                "partitions must be at least 1".to_string(),
            ));
        }
        if self.retry.initial_backoff > self.retry.max_backoff {
            return Err(EventBusError::InvalidConfig(
                "initial backoff exceeds max backoff".to_string(),
            ));
        }
        Ok(())
    }
}
