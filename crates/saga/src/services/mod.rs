//! Simulated downstream services.
//!
//! Each one sleeps for a random delay, draws its outcome from the injected
//! [`Randomness`](crate::Randomness), and publishes the result as data.

pub mod inventory;
pub mod notification;
pub mod payment;
pub mod shipping;

pub use inventory::InventoryManager;
pub use notification::NotificationDispatcher;
pub use payment::PaymentProcessor;
pub use shipping::ShipmentPreparer;
