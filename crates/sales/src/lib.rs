//! Orders domain module.
//!
//! This crate contains business rules for marketplace orders, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage). Stock,
//! revenue and account counters live in other records; the workflows that
//! move them together are in `bazaar-infra`.

pub mod order;
pub mod views;

pub use order::{
    Amounts, CustomerInfo, LineItem, Order, OrderQuery, OrderRequest, OrderStatus, PaymentMethod,
    PaymentStatus, RequestedItem, StatusChange, TrackingInfo, TrackingUpdate,
};
pub use views::{CustomerOrderView, VendorOrderStats, VendorOrderView};
