use std::collections::BTreeMap;

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{
    Category, DomainError, DomainResult, Entity, Money, OrderId, ProductId, UserId, VendorId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Enums
// ─────────────────────────────────────────────────────────────────────────────

/// Order status lifecycle.
///
/// pending → confirmed → processing → shipped → delivered, or → cancelled
/// from pending/confirmed. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Customer-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending Confirmation",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::validation(format!("Invalid order status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(DomainError::validation(format!("Invalid payment status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Upi,
    Cod,
}

impl PaymentMethod {
    /// Cash on delivery is collected later; every other method is paid up front.
    pub fn initial_payment_status(&self) -> PaymentStatus {
        match self {
            PaymentMethod::Cod => PaymentStatus::Pending,
            PaymentMethod::Upi => PaymentStatus::Paid,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Value types
// ─────────────────────────────────────────────────────────────────────────────

/// Snapshot of a product at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub vendor_id: VendorId,
    pub name: String,
    /// Unit price in smallest currency unit.
    pub price: Money,
    pub quantity: u32,
    pub image: Option<String>,
    pub category: Category,
    /// Vendor store name at order time.
    pub vendor_name: String,
}

impl LineItem {
    /// `price × quantity`, or `None` when it does not fit in [`Money`].
    pub fn checked_total(&self) -> Option<Money> {
        self.price.checked_mul(Money::from(self.quantity))
    }

    /// Saturating `price × quantity`; exact for any placed order.
    pub fn line_total(&self) -> Money {
        self.price.saturating_mul(Money::from(self.quantity))
    }
}

fn too_large() -> DomainError {
    DomainError::validation("Order amount is too large")
}

/// Σ line totals with every step checked.
fn items_subtotal(items: &[LineItem]) -> DomainResult<Money> {
    items.iter().try_fold(0, |acc: Money, item| {
        item.checked_total()
            .and_then(|line| acc.checked_add(line))
            .ok_or_else(too_large)
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pin_code: String,
    pub payment_method: PaymentMethod,
}

impl CustomerInfo {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() {
            return Err(DomainError::validation("Customer information is required"));
        }
        Ok(())
    }
}

/// Order amounts; `total` is the basis of every reversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Amounts {
    pub subtotal: Money,
    #[serde(default)]
    pub service_fee: Money,
    #[serde(default)]
    pub gst: Money,
    pub total: Money,
}

impl Amounts {
    pub fn validate(&self) -> DomainResult<()> {
        if self.subtotal < 0 || self.service_fee < 0 || self.gst < 0 || self.total < 0 {
            return Err(DomainError::validation("Order amounts cannot be negative"));
        }
        let sum = self
            .subtotal
            .checked_add(self.service_fee)
            .and_then(|s| s.checked_add(self.gst))
            .ok_or_else(too_large)?;
        if sum != self.total {
            return Err(DomainError::validation(
                "Order total must equal subtotal + service fee + GST",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingUpdate {
    pub status: OrderStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Current status mirror plus the append-only history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingInfo {
    status: OrderStatus,
    updates: Vec<TrackingUpdate>,
}

impl TrackingInfo {
    fn opened(status: OrderStatus, message: &str, now: DateTime<Utc>) -> Self {
        let mut info = Self {
            status,
            updates: Vec::new(),
        };
        info.record(status, message.to_string(), now);
        info
    }

    fn record(&mut self, status: OrderStatus, message: String, now: DateTime<Utc>) {
        self.status = status;
        self.updates.push(TrackingUpdate {
            status,
            message,
            timestamp: now,
        });
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn updates(&self) -> &[TrackingUpdate] {
        &self.updates
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price the client saw; must match the current price when present.
    #[serde(default)]
    pub price: Option<Money>,
}

/// Checkout request as submitted by a customer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default)]
    pub items: Vec<RequestedItem>,
    pub customer_info: Option<CustomerInfo>,
    #[serde(default)]
    pub amounts: Amounts,
    pub payment_method: Option<PaymentMethod>,
}

impl OrderRequest {
    /// Checks that need no stored records. Runs before any product is touched.
    pub fn validate(&self) -> DomainResult<()> {
        if self.items.is_empty() {
            return Err(DomainError::validation("Order must contain at least one item"));
        }
        if self.items.iter().any(|i| i.quantity == 0) {
            return Err(DomainError::validation("Quantity must be at least 1"));
        }
        self.customer_info
            .as_ref()
            .ok_or_else(|| DomainError::validation("Customer information is required"))?
            .validate()?;
        self.amounts.validate()
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
            .or_else(|| self.customer_info.as_ref().map(|c| c.payment_method))
            .unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Order
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of a status change, so callers know whether to reverse effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Progressed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    pub customer_info: CustomerInfo,
    pub amounts: Amounts,
    status: OrderStatus,
    pub payment_status: PaymentStatus,
    tracking_info: TrackingInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `ORD` + last eight digits of the epoch millis + four digits from the id.
fn order_number(id: &OrderId, now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().rem_euclid(100_000_000);
    let suffix = id.as_uuid().as_u128() % 10_000;
    format!("ORD{millis:08}{suffix:04}")
}

impl Order {
    /// Create a pending order from already-resolved line snapshots.
    pub fn place(
        user_id: UserId,
        items: Vec<LineItem>,
        mut customer_info: CustomerInfo,
        amounts: Amounts,
        payment_method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("Order must contain at least one item"));
        }
        if items.iter().any(|i| i.quantity == 0) {
            return Err(DomainError::validation("Quantity must be at least 1"));
        }
        customer_info.validate()?;
        amounts.validate()?;
        if items_subtotal(&items)? != amounts.subtotal {
            return Err(DomainError::validation("Order subtotal does not match items"));
        }
        customer_info.payment_method = payment_method;

        let id = OrderId::new();
        Ok(Self {
            id,
            order_number: order_number(&id, now),
            user_id,
            items,
            customer_info,
            amounts,
            status: OrderStatus::Pending,
            payment_status: payment_method.initial_payment_status(),
            tracking_info: TrackingInfo::opened(
                OrderStatus::Pending,
                "Order placed, waiting for vendor confirmation",
                now,
            ),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn tracking(&self) -> &TrackingInfo {
        &self.tracking_info
    }

    pub fn can_cancel(&self) -> bool {
        self.status.is_cancellable()
    }

    pub fn status_label(&self) -> &'static str {
        self.status.label()
    }

    /// Distinct vendors with at least one line, ascending.
    pub fn vendor_ids(&self) -> Vec<VendorId> {
        self.revenue_by_vendor().into_keys().collect()
    }

    pub fn contains_vendor(&self, vendor_id: VendorId) -> bool {
        self.items.iter().any(|i| i.vendor_id == vendor_id)
    }

    /// Σ price × quantity per vendor.
    pub fn revenue_by_vendor(&self) -> BTreeMap<VendorId, Money> {
        let mut out = BTreeMap::new();
        for item in &self.items {
            let total = out.entry(item.vendor_id).or_insert(0);
            *total = item.line_total().saturating_add(*total);
        }
        out
    }

    /// Σ price × quantity over one vendor's lines.
    pub fn vendor_amount(&self, vendor_id: VendorId) -> Money {
        self.items
            .iter()
            .filter(|i| i.vendor_id == vendor_id)
            .map(LineItem::line_total)
            .fold(0, Money::saturating_add)
    }

    /// Vendor/admin status update.
    ///
    /// Moving into `Cancelled` is a rejection and follows the customer
    /// cancellation rule; the caller must reverse stock and counters when
    /// this returns [`StatusChange::Cancelled`].
    pub fn set_status(
        &mut self,
        status: OrderStatus,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<StatusChange> {
        if self.status == OrderStatus::Cancelled {
            return Err(DomainError::invalid_state("Order is already cancelled"));
        }
        if status == OrderStatus::Cancelled && !self.can_cancel() {
            return Err(DomainError::invalid_state(
                "Order cannot be cancelled at this stage",
            ));
        }

        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Order {status}"));
        self.status = status;
        self.tracking_info.record(status, message, now);
        self.updated_at = now;

        Ok(if status == OrderStatus::Cancelled {
            StatusChange::Cancelled
        } else {
            StatusChange::Progressed
        })
    }

    /// Owner cancellation; legal only from pending/confirmed.
    pub fn cancel_by_customer(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.can_cancel() {
            return Err(DomainError::invalid_state(
                "Order cannot be cancelled at this stage",
            ));
        }
        self.status = OrderStatus::Cancelled;
        self.tracking_info.record(
            OrderStatus::Cancelled,
            "Order cancelled by customer".to_string(),
            now,
        );
        self.updated_at = now;
        Ok(())
    }

    /// Copy of this order holding only `vendor_id`'s lines.
    pub fn restricted_to(&self, vendor_id: VendorId) -> Order {
        let mut copy = self.clone();
        copy.items.retain(|i| i.vendor_id == vendor_id);
        copy
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Order listing filter.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub user_id: Option<UserId>,
    /// Orders with at least one line from this vendor.
    pub vendor_id: Option<VendorId>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl OrderQuery {
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.is_none_or(|u| u == order.user_id)
            && self.vendor_id.is_none_or(|v| order.contains_vendor(v))
            && self.status.is_none_or(|s| s == order.status)
            && self.payment_status.is_none_or(|p| p == order.payment_status)
    }
}
