use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use bazaar_auth::{Actor, Capability};
use bazaar_core::{Category, DomainError, Money, UserId, VendorId};
use bazaar_parties::{NewVendor, Vendor, VendorProfileUpdate, VendorQuery, VendorStatus, sort_for_directory};
use bazaar_products::{Product, ProductQuery, SortKey};

use super::{Marketplace, ServiceResult, require};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVendorInput {
    #[serde(default)]
    pub store_name: String,
    pub category: Option<Category>,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// Public slice of the account behind a vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorListing {
    #[serde(flatten)]
    pub vendor: Vendor,
    pub user: Option<OwnerSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VendorDetail {
    pub vendor: Vendor,
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorStats {
    pub total_products: u32,
    pub total_revenue: Money,
    pub total_stock: u64,
    pub total_sold: u64,
    pub rating: f64,
    pub status: VendorStatus,
}

impl Marketplace {
    #[instrument(skip(self, input), fields(user_id = %actor.user_id), err)]
    pub async fn register_vendor(&self, actor: &Actor, input: RegisterVendorInput) -> ServiceResult<Vendor> {
        require(actor, Capability::RegisterVendor)?;
        let Some(category) = input.category else {
            return Err(DomainError::validation("Store name and category are required").into());
        };

        let vendor = Vendor::register(
            NewVendor {
                user_id: actor.user_id,
                store_name: input.store_name,
                category,
                description: input.description,
                location: input.location,
            },
            Utc::now(),
        )?;

        let mut uow = self.begin().await?;
        if uow.vendor_by_user(actor.user_id).await?.is_some() {
            return Err(DomainError::validation("You already have a vendor account").into());
        }
        uow.save_vendor(&vendor).await?;
        uow.commit().await?;

        info!(vendor_id = %vendor.id, "vendor registration submitted");
        Ok(vendor)
    }

    pub async fn list_vendors(
        &self,
        status: Option<VendorStatus>,
        category: Option<Category>,
    ) -> ServiceResult<Vec<VendorListing>> {
        let mut vendors = self.store.vendors(&VendorQuery::public(status, category)).await?;
        sort_for_directory(&mut vendors);

        let mut out = Vec::with_capacity(vendors.len());
        for vendor in vendors {
            let user = self.store.user(vendor.user_id).await?.map(|u| OwnerSummary {
                id: u.id,
                name: u.name,
                email: u.email,
            });
            out.push(VendorListing { vendor, user });
        }
        Ok(out)
    }

    pub async fn vendor_detail(&self, id: VendorId) -> ServiceResult<VendorDetail> {
        let vendor = self
            .store
            .vendor(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vendor not found"))?;
        let products = self
            .store
            .products(&ProductQuery {
                vendor_id: Some(id),
                ..ProductQuery::catalog()
            })
            .await?;
        Ok(VendorDetail { vendor, products })
    }

    /// The acting vendor's profile, whatever its approval state.
    pub async fn my_vendor(&self, actor: &Actor) -> ServiceResult<Vendor> {
        require(actor, Capability::ManageCatalog)?;
        self.store
            .vendor_by_user(actor.user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vendor profile not found").into())
    }

    pub async fn my_vendor_detail(&self, actor: &Actor) -> ServiceResult<VendorDetail> {
        let vendor = self.my_vendor(actor).await?;
        let products = self.store.products(&ProductQuery::for_vendor(vendor.id)).await?;
        Ok(VendorDetail { vendor, products })
    }

    #[instrument(skip(self, update), fields(user_id = %actor.user_id), err)]
    pub async fn update_my_vendor(&self, actor: &Actor, update: VendorProfileUpdate) -> ServiceResult<Vendor> {
        require(actor, Capability::ManageCatalog)?;
        let mut uow = self.begin().await?;
        let mut vendor = uow
            .vendor_by_user(actor.user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vendor profile not found"))?;
        vendor.apply_profile(update, Utc::now())?;
        uow.save_vendor(&vendor).await?;
        uow.commit().await?;
        Ok(vendor)
    }

    pub async fn my_products(&self, actor: &Actor) -> ServiceResult<Vec<Product>> {
        let vendor = self.my_vendor(actor).await?;
        Ok(self
            .store
            .products(&ProductQuery {
                sort: SortKey::Newest,
                ..ProductQuery::for_vendor(vendor.id)
            })
            .await?)
    }

    pub async fn my_stats(&self, actor: &Actor) -> ServiceResult<VendorStats> {
        let vendor = self.my_vendor(actor).await?;
        let products = self.store.products(&ProductQuery::for_vendor(vendor.id)).await?;
        Ok(VendorStats {
            total_products: vendor.total_products,
            total_revenue: vendor.total_revenue,
            total_stock: products.iter().map(|p| u64::from(p.stock)).sum(),
            total_sold: products.iter().map(|p| u64::from(p.sold)).sum(),
            rating: vendor.rating,
            status: vendor.status,
        })
    }
}
