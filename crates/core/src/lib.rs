//! `bazaar-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by every marketplace
//! module (no infrastructure concerns).

pub mod category;
pub mod entity;
pub mod error;
pub mod id;

pub use category::Category;
pub use entity::{Entity, newest_first};
pub use error::{DomainError, DomainResult};
pub use id::{OrderId, ProductId, UserId, VendorId};

/// Monetary amount in the smallest currency unit (paise).
///
/// Running totals may legitimately pass through negative values while a
/// reversal is being applied, so amounts are signed.
pub type Money = i64;

/// Ceiling for a single unit price (₹10 crore).
pub const MAX_PRICE: Money = 10_000_000_000;
