//! Read-side projections of orders for customers and vendors.

use serde::Serialize;

use bazaar_core::{Money, VendorId};

use crate::order::{Order, OrderStatus};

/// An order as its customer sees it in their order history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerOrderView {
    #[serde(flatten)]
    pub order: Order,
    pub status_label: &'static str,
    pub can_cancel: bool,
}

impl From<Order> for CustomerOrderView {
    fn from(order: Order) -> Self {
        Self {
            status_label: order.status_label(),
            can_cancel: order.can_cancel(),
            order,
        }
    }
}

/// An order restricted to one vendor's lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorOrderView {
    #[serde(flatten)]
    pub order: Order,
    /// Σ price × quantity over the vendor's own lines.
    pub vendor_amount: Money,
}

impl VendorOrderView {
    pub fn new(order: &Order, vendor_id: VendorId) -> Self {
        Self {
            vendor_amount: order.vendor_amount(vendor_id),
            order: order.restricted_to(vendor_id),
        }
    }
}

/// Per-status counts over a vendor's orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VendorOrderStats {
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub processing: usize,
    pub shipped: usize,
    pub delivered: usize,
    pub cancelled: usize,
}

impl VendorOrderStats {
    pub fn tally<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut stats = Self::default();
        for order in orders {
            stats.total += 1;
            match order.status() {
                OrderStatus::Pending => stats.pending += 1,
                OrderStatus::Confirmed => stats.confirmed += 1,
                OrderStatus::Processing => stats.processing += 1,
                OrderStatus::Shipped => stats.shipped += 1,
                OrderStatus::Delivered => stats.delivered += 1,
                OrderStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use bazaar_core::{Category, ProductId, UserId};

    use super::*;
    use crate::order::{Amounts, CustomerInfo, LineItem, PaymentMethod};

    fn two_vendor_order(a: VendorId, b: VendorId) -> Order {
        let item = |vendor_id, price| LineItem {
            product_id: ProductId::new(),
            vendor_id,
            name: "Item".to_string(),
            price,
            quantity: 1,
            image: None,
            category: Category::Books,
            vendor_name: "Store".to_string(),
        };
        Order::place(
            UserId::new(),
            vec![item(a, 300), item(b, 700)],
            CustomerInfo {
                name: "Ravi".to_string(),
                email: "ravi@example.com".to_string(),
                ..CustomerInfo::default()
            },
            Amounts {
                subtotal: 1000,
                service_fee: 0,
                gst: 0,
                total: 1000,
            },
            PaymentMethod::Upi,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn vendor_view_hides_other_vendors_lines() {
        let (a, b) = (VendorId::new(), VendorId::new());
        let order = two_vendor_order(a, b);

        let view = VendorOrderView::new(&order, a);
        assert_eq!(view.vendor_amount, 300);
        assert_eq!(view.order.items.len(), 1);
        assert_eq!(view.order.amounts.total, 1000);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["vendorAmount"], 300);
        assert_eq!(json["items"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn customer_view_flattens_label_and_cancel_flag() {
        let order = two_vendor_order(VendorId::new(), VendorId::new());
        let json = serde_json::to_value(CustomerOrderView::from(order)).unwrap();
        assert_eq!(json["statusLabel"], "Pending Confirmation");
        assert_eq!(json["canCancel"], true);
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn stats_count_each_status() {
        let (a, b) = (VendorId::new(), VendorId::new());
        let pending = two_vendor_order(a, b);
        let mut cancelled = two_vendor_order(a, b);
        cancelled.cancel_by_customer(Utc::now()).unwrap();

        let stats = VendorOrderStats::tally([&pending, &cancelled]);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.delivered, 0);
    }
}
