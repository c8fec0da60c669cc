use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use bazaar_auth::{Actor, Capability, Role};
use bazaar_core::{DomainError, Money, UserId, VendorId};
use bazaar_parties::{AccountStatus, UserProfile, UserQuery, Vendor, VendorQuery, VendorStatus};
use bazaar_products::{Product, ProductQuery};
use bazaar_sales::{Order, OrderQuery, PaymentStatus};

use super::{Marketplace, ServiceResult, require};

const RECENT_ORDERS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Accounts with the plain `user` role.
    pub total_users: usize,
    pub total_vendors: usize,
    pub total_products: usize,
    pub total_orders: usize,
    pub pending_vendors: usize,
    pub active_vendors: usize,
    /// Σ total over paid orders.
    pub total_revenue: Money,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_orders: Vec<Order>,
}

impl Marketplace {
    pub async fn dashboard(&self, actor: &Actor) -> ServiceResult<Dashboard> {
        require(actor, Capability::Administer)?;

        let users = self
            .store
            .users(&UserQuery {
                role: Some(Role::User),
                ..UserQuery::default()
            })
            .await?;
        let vendors = self.store.vendors(&VendorQuery::default()).await?;
        let products = self.store.products(&ProductQuery::default()).await?;
        let orders = self.store.orders(&OrderQuery::default()).await?;

        let vendors_in = |status: VendorStatus| vendors.iter().filter(|v| v.status == status).count();
        let stats = DashboardStats {
            total_users: users.len(),
            total_vendors: vendors.len(),
            total_products: products.len(),
            total_orders: orders.len(),
            pending_vendors: vendors_in(VendorStatus::Pending),
            active_vendors: vendors_in(VendorStatus::Active),
            total_revenue: orders
                .iter()
                .filter(|o| o.payment_status == PaymentStatus::Paid)
                .map(|o| o.amounts.total)
                .sum(),
        };

        let recent_orders = orders.into_iter().take(RECENT_ORDERS).collect();
        Ok(Dashboard { stats, recent_orders })
    }

    pub async fn admin_users(&self, actor: &Actor, query: &UserQuery) -> ServiceResult<Vec<UserProfile>> {
        require(actor, Capability::Administer)?;
        let users = self.store.users(query).await?;
        Ok(users.iter().map(|u| u.profile()).collect())
    }

    #[instrument(skip(self), fields(admin = %actor.user_id), err)]
    pub async fn set_user_status(
        &self,
        actor: &Actor,
        id: UserId,
        status: AccountStatus,
    ) -> ServiceResult<UserProfile> {
        require(actor, Capability::Administer)?;
        let mut uow = self.begin().await?;
        let mut user = uow
            .user(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;
        user.set_status(status, Utc::now());
        uow.save_user(&user).await?;
        uow.commit().await?;

        info!(user_id = %id, status = %status.as_str(), "user status changed");
        Ok(user.profile())
    }

    #[instrument(skip(self), fields(admin = %actor.user_id), err)]
    pub async fn delete_user(&self, actor: &Actor, id: UserId) -> ServiceResult<()> {
        require(actor, Capability::Administer)?;
        let mut uow = self.begin().await?;
        let user = uow
            .user(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;
        if user.role == Role::Admin {
            warn!(user_id = %id, "refused to delete an admin account");
            return Err(DomainError::forbidden("Cannot delete admin accounts").into());
        }
        uow.delete_user(id).await?;
        uow.commit().await?;

        info!(user_id = %id, "user deleted");
        Ok(())
    }

    pub async fn admin_vendors(&self, actor: &Actor, query: &VendorQuery) -> ServiceResult<Vec<Vendor>> {
        require(actor, Capability::Administer)?;
        Ok(self.store.vendors(query).await?)
    }

    /// Approve (`active`) or reject (`inactive`) a vendor registration.
    /// Approval also promotes the owning account to the vendor role.
    #[instrument(skip(self), fields(admin = %actor.user_id), err)]
    pub async fn approve_vendor(&self, actor: &Actor, id: VendorId, status: VendorStatus) -> ServiceResult<Vendor> {
        require(actor, Capability::Administer)?;
        let now = Utc::now();

        let mut uow = self.begin().await?;
        let mut vendor = uow
            .vendor(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vendor not found"))?;
        vendor.decide(status, actor.user_id, now)?;

        if status == VendorStatus::Active {
            if let Some(mut owner) = uow.user(vendor.user_id).await? {
                owner.promote_to_vendor(now);
                uow.save_user(&owner).await?;
            }
        }
        uow.save_vendor(&vendor).await?;
        uow.commit().await?;

        info!(vendor_id = %id, status = %status.as_str(), "vendor decision recorded");
        Ok(vendor)
    }

    pub async fn admin_products(&self, actor: &Actor, query: &ProductQuery) -> ServiceResult<Vec<Product>> {
        require(actor, Capability::Administer)?;
        Ok(self.store.products(query).await?)
    }

    pub async fn admin_orders(&self, actor: &Actor, query: &OrderQuery) -> ServiceResult<Vec<Order>> {
        require(actor, Capability::Administer)?;
        Ok(self.store.orders(query).await?)
    }
}
