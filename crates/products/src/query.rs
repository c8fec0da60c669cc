//! Catalog filtering and ordering.

use core::str::FromStr;

use bazaar_core::{Category, DomainError, Money, VendorId, newest_first};

use crate::product::{Product, ProductStatus};

/// Catalog sort order. Unknown keys fall back to `Newest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    PriceAsc,
    PriceDesc,
    Rating,
    #[default]
    Newest,
}

impl FromStr for SortKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "price_asc" => SortKey::PriceAsc,
            "price_desc" => SortKey::PriceDesc,
            "rating" => SortKey::Rating,
            _ => SortKey::Newest,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub status: Option<ProductStatus>,
    pub category: Option<Category>,
    pub vendor_id: Option<VendorId>,
    /// Case-insensitive substring over name and description.
    pub search: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub sort: SortKey,
}

impl ProductQuery {
    /// Public catalog: active products only.
    pub fn catalog() -> Self {
        Self {
            status: Some(ProductStatus::Active),
            ..Self::default()
        }
    }

    pub fn for_vendor(vendor_id: VendorId) -> Self {
        Self {
            vendor_id: Some(vendor_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        if self.status.is_some_and(|s| s != product.status) {
            return false;
        }
        if self.category.is_some_and(|c| c != product.category) {
            return false;
        }
        if self.vendor_id.is_some_and(|v| v != product.vendor_id) {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                product.name.to_lowercase().contains(&needle)
                    || product.description.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }

    /// Filter and order `products` in one pass.
    pub fn apply(&self, products: impl IntoIterator<Item = Product>) -> Vec<Product> {
        let mut out: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        match self.sort {
            SortKey::PriceAsc => out.sort_by_key(|p| p.price),
            SortKey::PriceDesc => out.sort_by(|a, b| b.price.cmp(&a.price)),
            SortKey::Rating => out.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
            SortKey::Newest => newest_first(&mut out),
        }
        out
    }
}
