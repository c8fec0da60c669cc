//! Products domain module.
//!
//! This crate contains business rules for the catalog, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod product;
pub mod query;

pub use product::{NewProduct, Product, ProductStatus, ProductUpdate};
pub use query::{ProductQuery, SortKey};
