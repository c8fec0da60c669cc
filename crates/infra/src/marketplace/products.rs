use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use bazaar_auth::{Actor, Capability};
use bazaar_core::{Category, DomainError, ProductId, VendorId};
use bazaar_parties::Vendor;
use bazaar_products::{NewProduct, Product, ProductQuery, ProductUpdate};

use super::{Marketplace, ServiceResult, require};

/// Vendor display fields attached to catalog entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorSummary {
    pub id: VendorId,
    pub store_name: String,
    pub rating: f64,
    pub location: String,
    pub category: Category,
}

impl From<&Vendor> for VendorSummary {
    fn from(v: &Vendor) -> Self {
        Self {
            id: v.id,
            store_name: v.store_name.clone(),
            rating: v.rating,
            location: v.location.clone(),
            category: v.category,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: Product,
    /// `None` once the vendor has been removed.
    pub vendor: Option<VendorSummary>,
}

impl Marketplace {
    pub async fn list_products(&self, query: &ProductQuery) -> ServiceResult<Vec<ProductListing>> {
        let products = self.store.products(query).await?;
        self.with_vendors(products).await
    }

    pub async fn product_detail(&self, id: ProductId) -> ServiceResult<ProductListing> {
        let product = self
            .store
            .product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product not found"))?;
        let vendor = self.store.vendor(product.vendor_id).await?;
        Ok(ProductListing {
            vendor: vendor.as_ref().map(VendorSummary::from),
            product,
        })
    }

    pub fn categories(&self) -> &'static [Category] {
        &Category::ALL
    }

    async fn with_vendors(&self, products: Vec<Product>) -> ServiceResult<Vec<ProductListing>> {
        let mut vendors: HashMap<VendorId, Option<VendorSummary>> = HashMap::new();
        let mut out = Vec::with_capacity(products.len());
        for product in products {
            let vendor = match vendors.get(&product.vendor_id) {
                Some(cached) => cached.clone(),
                None => {
                    let summary = self
                        .store
                        .vendor(product.vendor_id)
                        .await?
                        .as_ref()
                        .map(VendorSummary::from);
                    vendors.insert(product.vendor_id, summary.clone());
                    summary
                }
            };
            out.push(ProductListing { product, vendor });
        }
        Ok(out)
    }

    /// Creates a product under the acting account's vendor profile.
    #[instrument(skip(self, new), fields(user_id = %actor.user_id), err)]
    pub async fn create_product(&self, actor: &Actor, new: NewProduct) -> ServiceResult<Product> {
        require(actor, Capability::ManageCatalog)?;
        let now = Utc::now();

        let mut uow = self.begin().await?;
        let mut vendor = uow
            .vendor_by_user(actor.user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vendor profile not found"))?;
        if !vendor.is_active() {
            return Err(DomainError::forbidden("Your vendor account is not active").into());
        }

        let product = Product::create(vendor.id, new, now)?;
        vendor.product_added(now);
        uow.save_product(&product).await?;
        uow.save_vendor(&vendor).await?;
        uow.commit().await?;

        info!(product_id = %product.id, vendor_id = %vendor.id, "product created");
        Ok(product)
    }

    #[instrument(skip(self, update), fields(user_id = %actor.user_id), err)]
    pub async fn update_product(
        &self,
        actor: &Actor,
        id: ProductId,
        update: ProductUpdate,
    ) -> ServiceResult<Product> {
        let mut uow = self.begin().await?;
        let mut product = uow
            .product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product not found"))?;
        let actor_vendor = uow.vendor_by_user(actor.user_id).await?.map(|v| v.id);
        require(
            actor,
            Capability::EditProduct {
                product_vendor: product.vendor_id,
                actor_vendor,
            },
        )
        .map_err(|_| DomainError::forbidden("Not authorized to update this product"))?;

        product.apply_update(update, Utc::now())?;
        uow.save_product(&product).await?;
        uow.commit().await?;
        Ok(product)
    }

    #[instrument(skip(self), fields(user_id = %actor.user_id), err)]
    pub async fn delete_product(&self, actor: &Actor, id: ProductId) -> ServiceResult<()> {
        let mut uow = self.begin().await?;
        let product = uow
            .product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product not found"))?;
        let actor_vendor = uow.vendor_by_user(actor.user_id).await?.map(|v| v.id);
        require(
            actor,
            Capability::EditProduct {
                product_vendor: product.vendor_id,
                actor_vendor,
            },
        )
        .map_err(|_| DomainError::forbidden("Not authorized to delete this product"))?;

        uow.delete_product(id).await?;
        if let Some(mut owner) = uow.vendor(product.vendor_id).await? {
            owner.product_removed(Utc::now());
            uow.save_vendor(&owner).await?;
        }
        uow.commit().await?;

        info!(product_id = %id, "product deleted");
        Ok(())
    }
}
