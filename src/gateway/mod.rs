//! Gateways: the store-facing contracts the pipeline is written against.
//!
//! Each gateway owns one transport handle and reuses it for every item of a
//! batch. There is no internal locking, so a gateway must not be shared between
//! concurrently running batches.

pub mod object_store;
pub mod relational;

pub use object_store::ObjectStore;
pub use relational::{Container, RelationalStore, TablePlan};
