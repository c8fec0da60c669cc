//! Infrastructure layer: persistence adapters and the marketplace workflows
//! that run on top of them.

pub mod marketplace;
pub mod store;

pub use marketplace::{Marketplace, ServiceError, ServiceResult};
pub use store::{InMemoryStore, PostgresStore, Store, StoreError, UnitOfWork};

#[cfg(test)]
mod integration_tests;
