//! Starts every saga participant on one bus.

use std::sync::Arc;

use event_bus::{EventBus, SubscriptionHandle};

use crate::ledger::CATALOG_SIZE;
use crate::{
    InventoryLedger, InventoryManager, Latency, NotificationDispatcher, OrderCoordinator,
    PartitionKey, PaymentProcessor, Randomness, Result, ShipmentPreparer, start_service,
};

/// How the pipeline is wired.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub partition_key: PartitionKey,
    /// When false every stage completes immediately.
    pub simulate_latency: bool,
    /// Stock to start from; a random catalog is seeded when absent.
    pub ledger: Option<Arc<InventoryLedger>>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            partition_key: PartitionKey::default(),
            simulate_latency: true,
            ledger: None,
        }
    }
}

impl PipelineOptions {
    pub fn without_latency(mut self) -> Self {
        self.simulate_latency = false;
        self
    }

    pub fn with_partition_key(mut self, key: PartitionKey) -> Self {
        self.partition_key = key;
        self
    }

    pub fn with_ledger(mut self, ledger: Arc<InventoryLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }
}

/// The running coordinator and stage services.
pub struct SagaPipeline {
    handles: Vec<SubscriptionHandle>,
    ledger: Arc<InventoryLedger>,
}

impl SagaPipeline {
    /// Subscribes all participants. Only events published after this
    /// returns are processed.
    pub async fn start<B>(
        bus: &B,
        rng: Arc<dyn Randomness>,
        options: PipelineOptions,
    ) -> Result<Self>
    where
        B: EventBus + Clone + 'static,
    {
        let key = options.partition_key;
        let ledger = match options.ledger {
            Some(ledger) => ledger,
            None => Arc::new(InventoryLedger::with_catalog(CATALOG_SIZE, rng.as_ref())),
        };
        let latency = |default: Latency| {
            if options.simulate_latency {
                default
            } else {
                Latency::NONE
            }
        };

        let payment = PaymentProcessor::new(Arc::clone(&rng))
            .with_latency(latency(crate::services::payment::LATENCY));
        let inventory = InventoryManager::with_ledger(Arc::clone(&ledger), Arc::clone(&rng))
            .with_latency(latency(crate::services::inventory::LATENCY));
        let shipping = ShipmentPreparer::new(Arc::clone(&rng))
            .with_latency(latency(crate::services::shipping::LATENCY));
        let notification = NotificationDispatcher::new(Arc::clone(&rng))
            .with_latency(latency(crate::services::notification::LATENCY));

        let handles = vec![
            start_service(bus, Arc::new(OrderCoordinator::new()), key).await?,
            start_service(bus, Arc::new(payment), key).await?,
            start_service(bus, Arc::new(inventory), key).await?,
            start_service(bus, Arc::new(shipping), key).await?,
            start_service(bus, Arc::new(notification), key).await?,
        ];
        tracing::info!(services = handles.len(), ?key, "saga pipeline started");

        Ok(Self { handles, ledger })
    }

    pub fn ledger(&self) -> &Arc<InventoryLedger> {
        &self.ledger
    }

    /// Consumer groups of the running services.
    pub fn groups(&self) -> Vec<&str> {
        self.handles.iter().map(SubscriptionHandle::group).collect()
    }

    pub async fn shutdown(self) {
        for handle in self.handles {
            handle.shutdown().await;
        }
        tracing::info!("saga pipeline stopped");
    }
}
