//! Checkout, order lifecycle and the vendor order desk.
//!
//! Creation and every transition into `cancelled` touch products, vendors
//! and the customer together. Each runs in one unit of work, and products are
//! always loaded in ascending id order so concurrent units lock rows in the
//! same sequence.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use bazaar_auth::{Actor, Capability, Role};
use bazaar_core::{DomainError, OrderId, ProductId, VendorId};
use bazaar_parties::Vendor;
use bazaar_products::Product;
use bazaar_sales::{
    LineItem, Order, OrderQuery, OrderRequest, OrderStatus, StatusChange, VendorOrderStats,
    VendorOrderView,
};

use super::{Marketplace, ServiceResult, require};
use crate::store::UnitOfWork;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateInput {
    pub status: OrderStatus,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VendorOrders {
    pub orders: Vec<VendorOrderView>,
    pub stats: VendorOrderStats,
}

// ─────────────────────────────────────────────────────────────────────────────
// Unit-of-work helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Load products for `ids` in ascending order; missing ids are left out.
async fn load_products(
    uow: &mut dyn UnitOfWork,
    ids: impl IntoIterator<Item = ProductId>,
) -> ServiceResult<BTreeMap<ProductId, Product>> {
    let ids: BTreeSet<ProductId> = ids.into_iter().collect();
    let mut out = BTreeMap::new();
    for id in ids {
        if let Some(product) = uow.product(id).await? {
            out.insert(id, product);
        }
    }
    Ok(out)
}

async fn load_vendors(
    uow: &mut dyn UnitOfWork,
    ids: impl IntoIterator<Item = VendorId>,
) -> ServiceResult<BTreeMap<VendorId, Vendor>> {
    let ids: BTreeSet<VendorId> = ids.into_iter().collect();
    let mut out = BTreeMap::new();
    for id in ids {
        if let Some(vendor) = uow.vendor(id).await? {
            out.insert(id, vendor);
        }
    }
    Ok(out)
}

/// Undo everything placing `order` did: stock, sold, vendor revenue and the
/// customer's counters. Records deleted since placement are skipped.
async fn reverse_effects(uow: &mut dyn UnitOfWork, order: &Order, now: DateTime<Utc>) -> ServiceResult<()> {
    let mut products = load_products(uow, order.items.iter().map(|i| i.product_id)).await?;
    for item in &order.items {
        if let Some(product) = products.get_mut(&item.product_id) {
            product.release(item.quantity, now);
        }
    }
    for product in products.values() {
        uow.save_product(product).await?;
    }

    let revenue = order.revenue_by_vendor();
    let mut vendors = load_vendors(uow, revenue.keys().copied()).await?;
    for (vendor_id, amount) in &revenue {
        if let Some(vendor) = vendors.get_mut(vendor_id) {
            vendor.debit_revenue(*amount, now);
            uow.save_vendor(vendor).await?;
        }
    }

    if let Some(mut customer) = uow.user(order.user_id).await? {
        customer.reverse_order(order.amounts.total, now);
        uow.save_user(&customer).await?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Operations
// ─────────────────────────────────────────────────────────────────────────────

impl Marketplace {
    #[instrument(skip(self, request), fields(user_id = %actor.user_id, items = request.items.len()), err)]
    pub async fn create_order(&self, actor: &Actor, request: OrderRequest) -> ServiceResult<Order> {
        require(actor, Capability::PlaceOrder)?;
        request.validate()?;
        let now = Utc::now();

        let mut uow = self.begin().await?;
        let mut products =
            load_products(uow.as_mut(), request.items.iter().map(|i| i.product_id)).await?;

        for requested in &request.items {
            let product = products
                .get_mut(&requested.product_id)
                .ok_or_else(|| DomainError::not_found("Product not found"))?;
            if requested.price.is_some_and(|p| p != product.price) {
                return Err(DomainError::validation(format!("Price changed for {}", product.name)).into());
            }
            product.reserve(requested.quantity, now)?;
        }

        let mut vendors = load_vendors(uow.as_mut(), products.values().map(|p| p.vendor_id)).await?;

        let mut items = Vec::with_capacity(request.items.len());
        for requested in &request.items {
            let Some(product) = products.get(&requested.product_id) else {
                return Err(DomainError::not_found("Product not found").into());
            };
            let vendor = vendors
                .get(&product.vendor_id)
                .ok_or_else(|| DomainError::not_found("Vendor not found"))?;
            items.push(LineItem {
                product_id: product.id,
                vendor_id: product.vendor_id,
                name: product.name.clone(),
                price: product.price,
                quantity: requested.quantity,
                image: product.first_image().map(str::to_string),
                category: product.category,
                vendor_name: vendor.store_name.clone(),
            });
        }

        let payment_method = request.payment_method();
        let customer_info = request.customer_info.unwrap_or_default();
        let order = Order::place(actor.user_id, items, customer_info, request.amounts, payment_method, now)?;

        let mut customer = uow
            .user(actor.user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;
        customer.record_order(order.amounts.total, now);

        for (vendor_id, amount) in order.revenue_by_vendor() {
            if let Some(vendor) = vendors.get_mut(&vendor_id) {
                vendor.credit_revenue(amount, now);
            }
        }

        for product in products.values() {
            uow.save_product(product).await?;
        }
        for vendor in vendors.values() {
            uow.save_vendor(vendor).await?;
        }
        uow.save_user(&customer).await?;
        uow.save_order(&order).await?;
        uow.commit().await?;

        info!(order_id = %order.id, order_number = %order.order_number, total = order.amounts.total, "order placed");
        Ok(order)
    }

    async fn actor_vendor(&self, actor: &Actor) -> ServiceResult<Option<VendorId>> {
        if actor.role != Role::Vendor {
            return Ok(None);
        }
        Ok(self.store.vendor_by_user(actor.user_id).await?.map(|v| v.id))
    }

    pub async fn order_detail(&self, actor: &Actor, id: OrderId) -> ServiceResult<Order> {
        let order = self
            .store
            .order(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order not found"))?;
        let vendors = order.vendor_ids();
        let actor_vendor = self.actor_vendor(actor).await?;
        require(
            actor,
            Capability::ViewOrder {
                owner: order.user_id,
                vendors: &vendors,
                actor_vendor,
            },
        )
        .map_err(|_| DomainError::forbidden("Not authorized to view this order"))?;
        Ok(order)
    }

    /// Vendor/admin transition. Moving into `cancelled` is a rejection and
    /// reverses the order's effects inside the same unit of work.
    #[instrument(skip(self, input), fields(user_id = %actor.user_id, status = %input.status), err)]
    pub async fn update_order_status(
        &self,
        actor: &Actor,
        id: OrderId,
        input: StatusUpdateInput,
    ) -> ServiceResult<Order> {
        let now = Utc::now();
        let mut uow = self.begin().await?;
        let mut order = uow
            .order(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order not found"))?;

        let actor_vendor = match actor.role {
            Role::Vendor => uow.vendor_by_user(actor.user_id).await?.map(|v| v.id),
            _ => None,
        };
        let vendors = order.vendor_ids();
        require(
            actor,
            Capability::UpdateOrderStatus {
                vendors: &vendors,
                actor_vendor,
            },
        )
        .map_err(|_| DomainError::forbidden("Not authorized to update this order"))?;

        if order.set_status(input.status, input.message, now)? == StatusChange::Cancelled {
            reverse_effects(uow.as_mut(), &order, now).await?;
        }
        uow.save_order(&order).await?;
        uow.commit().await?;

        info!(order_id = %order.id, status = %order.status(), "order status updated");
        Ok(order)
    }

    #[instrument(skip(self), fields(user_id = %actor.user_id), err)]
    pub async fn cancel_order(&self, actor: &Actor, id: OrderId) -> ServiceResult<Order> {
        let now = Utc::now();
        let mut uow = self.begin().await?;
        let mut order = uow
            .order(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order not found"))?;
        require(actor, Capability::CancelOrder { owner: order.user_id })
            .map_err(|_| DomainError::forbidden("Not authorized to cancel this order"))?;

        order.cancel_by_customer(now)?;
        reverse_effects(uow.as_mut(), &order, now).await?;
        uow.save_order(&order).await?;
        uow.commit().await?;

        info!(order_id = %order.id, "order cancelled by customer");
        Ok(order)
    }

    /// Orders holding the acting vendor's lines, restricted to those lines.
    pub async fn vendor_orders(&self, actor: &Actor, status: Option<OrderStatus>) -> ServiceResult<VendorOrders> {
        require(actor, Capability::ViewVendorOrders)?;
        let vendor = self
            .store
            .vendor_by_user(actor.user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vendor profile not found"))?;

        let all = self
            .store
            .orders(&OrderQuery {
                vendor_id: Some(vendor.id),
                ..OrderQuery::default()
            })
            .await?;
        let stats = VendorOrderStats::tally(&all);
        let orders = all
            .iter()
            .filter(|o| status.is_none_or(|s| s == o.status()))
            .map(|o| VendorOrderView::new(o, vendor.id))
            .collect();
        Ok(VendorOrders { orders, stats })
    }

    pub async fn vendor_pending_orders(&self, actor: &Actor) -> ServiceResult<Vec<VendorOrderView>> {
        Ok(self.vendor_orders(actor, Some(OrderStatus::Pending)).await?.orders)
    }
}
