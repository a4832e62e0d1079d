//! The order model carried through every stage of the saga.

mod model;
mod value_objects;

pub use model::{Address, Customer, LineItem, Order};
pub use value_objects::{Money, ProductId};
