//! Persistence adapter.
//!
//! Records are stored as whole documents keyed by id. Every multi-record
//! mutation goes through a [`UnitOfWork`]: records read through it are held
//! for the lifetime of the unit, writes are invisible to other callers until
//! [`UnitOfWork::commit`], and dropping an uncommitted unit discards them.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use thiserror::Error;

use bazaar_core::{OrderId, ProductId, UserId, VendorId};
use bazaar_parties::{User, UserQuery, Vendor, VendorQuery};
use bazaar_products::{Product, ProductQuery};
use bazaar_sales::{Order, OrderQuery};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness rule was violated (email, one vendor per user).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store failed (connection, serialization, ...).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Read access plus a way to open units of work.
///
/// List methods return records newest first unless the query carries its own
/// ordering (products).
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn users(&self, query: &UserQuery) -> Result<Vec<User>, StoreError>;

    async fn vendor(&self, id: VendorId) -> Result<Option<Vendor>, StoreError>;
    async fn vendor_by_user(&self, user_id: UserId) -> Result<Option<Vendor>, StoreError>;
    async fn vendors(&self, query: &VendorQuery) -> Result<Vec<Vendor>, StoreError>;

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
    async fn products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError>;

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;
    async fn orders(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError>;
}

/// A transaction scope over several records.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn user(&mut self, id: UserId) -> Result<Option<User>, StoreError>;
    async fn user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError>;
    async fn vendor(&mut self, id: VendorId) -> Result<Option<Vendor>, StoreError>;
    async fn vendor_by_user(&mut self, user_id: UserId) -> Result<Option<Vendor>, StoreError>;
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;
    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;

    async fn save_user(&mut self, user: &User) -> Result<(), StoreError>;
    async fn save_vendor(&mut self, vendor: &Vendor) -> Result<(), StoreError>;
    async fn save_product(&mut self, product: &Product) -> Result<(), StoreError>;
    async fn save_order(&mut self, order: &Order) -> Result<(), StoreError>;

    async fn delete_user(&mut self, id: UserId) -> Result<(), StoreError>;
    async fn delete_product(&mut self, id: ProductId) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
