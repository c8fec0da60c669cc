//! Marketplace workflows.
//!
//! Every operation that touches more than one record runs inside a single
//! unit of work, so it either commits completely or leaves no trace.

mod accounts;
mod admin;
mod orders;
mod products;
mod vendors;

pub use accounts::{AuthSession, LoginInput, SignupInput, UserStats};
pub use admin::{Dashboard, DashboardStats};
pub use orders::{StatusUpdateInput, VendorOrders};
pub use products::{ProductListing, VendorSummary};
pub use vendors::{OwnerSummary, RegisterVendorInput, VendorDetail, VendorListing, VendorStats};

use std::sync::Arc;

use thiserror::Error;

use bazaar_auth::{Actor, AuthError, AuthzError, Capability, Hs256TokenService, authorize};
use bazaar_core::DomainError;

use crate::store::{Store, StoreError, UnitOfWork};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => ServiceError::Domain(DomainError::conflict(msg)),
            other => ServiceError::Store(other),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::Signing(msg) => ServiceError::Internal(format!("token signing failed: {msg}")),
            other => ServiceError::Domain(other.into()),
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(value: AuthzError) -> Self {
        ServiceError::Domain(value.into())
    }
}

/// Shared handle to the marketplace operations.
#[derive(Clone)]
pub struct Marketplace {
    store: Arc<dyn Store>,
    tokens: Arc<Hs256TokenService>,
}

impl Marketplace {
    pub fn new(store: Arc<dyn Store>, tokens: Arc<Hs256TokenService>) -> Self {
        Self { store, tokens }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    async fn begin(&self) -> ServiceResult<Box<dyn UnitOfWork>> {
        Ok(self.store.begin().await?)
    }
}

fn require(actor: &Actor, capability: Capability<'_>) -> ServiceResult<()> {
    Ok(authorize(actor, &capability)?)
}
