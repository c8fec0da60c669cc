use std::collections::BTreeMap;

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{
    Category, DomainError, DomainResult, Entity, MAX_PRICE, Money, ProductId, VendorId,
};

/// Product status lifecycle.
///
/// `OutOfStock` is derived from stock: it is entered when stock reaches zero
/// and left (back to `Active`) as soon as stock is positive again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
    OutOfStock,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
            ProductStatus::OutOfStock => "out_of_stock",
        }
    }
}

impl FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProductStatus::Active),
            "inactive" => Ok(ProductStatus::Inactive),
            "out_of_stock" => Ok(ProductStatus::OutOfStock),
            other => Err(DomainError::validation(format!("unknown product status '{other}'"))),
        }
    }
}

/// Catalog product record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub vendor_id: VendorId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Price in smallest currency unit (paise).
    pub price: Money,
    pub original_price: Money,
    /// Percentage, 0..=100.
    pub discount: u8,
    pub category: Category,
    #[serde(default)]
    pub images: Vec<String>,
    pub stock: u32,
    pub sold: u32,
    pub rating: f64,
    pub review_count: u32,
    pub status: ProductStatus,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for product creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub original_price: Option<Money>,
    #[serde(default)]
    pub discount: Option<u8>,
    pub category: Option<Category>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
}

/// Partial product edit; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub original_price: Option<Money>,
    pub discount: Option<u8>,
    pub category: Option<Category>,
    pub images: Option<Vec<String>>,
    pub stock: Option<u32>,
    pub status: Option<ProductStatus>,
    pub specifications: Option<BTreeMap<String, String>>,
}

fn validate_price(price: Money) -> DomainResult<()> {
    if price < 0 {
        return Err(DomainError::validation("Price cannot be negative"));
    }
    if price > MAX_PRICE {
        return Err(DomainError::validation("Price is too large"));
    }
    Ok(())
}

fn validate_discount(discount: u8) -> DomainResult<()> {
    if discount > 100 {
        return Err(DomainError::validation("Discount must be between 0 and 100"));
    }
    Ok(())
}

impl Product {
    pub fn create(vendor_id: VendorId, new: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("Product name is required"));
        }
        let category = new
            .category
            .ok_or_else(|| DomainError::validation("Category is required"))?;
        validate_price(new.price)?;
        let original_price = new.original_price.unwrap_or(new.price);
        validate_price(original_price)?;
        let discount = new.discount.unwrap_or(0);
        validate_discount(discount)?;

        let mut product = Self {
            id: ProductId::new(),
            vendor_id,
            name,
            description: new.description.unwrap_or_default(),
            price: new.price,
            original_price,
            discount,
            category,
            images: new.images,
            stock: new.stock,
            sold: 0,
            rating: 0.0,
            review_count: 0,
            status: ProductStatus::Active,
            specifications: new.specifications,
            created_at: now,
            updated_at: now,
        };
        product.sync_stock_status();
        Ok(product)
    }

    pub fn first_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn is_listed(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Take `quantity` units out of stock for an order line.
    pub fn reserve(&mut self, quantity: u32, now: DateTime<Utc>) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::validation("Quantity must be at least 1"));
        }
        if quantity > self.stock {
            return Err(DomainError::invalid_state(format!(
                "Insufficient stock for {}",
                self.name
            )));
        }
        self.stock -= quantity;
        self.sold = self.sold.saturating_add(quantity);
        self.sync_stock_status();
        self.updated_at = now;
        Ok(())
    }

    /// Exact inverse of [`Product::reserve`].
    pub fn release(&mut self, quantity: u32, now: DateTime<Utc>) {
        self.stock = self.stock.saturating_add(quantity);
        self.sold = self.sold.saturating_sub(quantity);
        self.sync_stock_status();
        self.updated_at = now;
    }

    pub fn apply_update(&mut self, update: ProductUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(price) = update.price {
            validate_price(price)?;
        }
        if let Some(original_price) = update.original_price {
            validate_price(original_price)?;
        }
        if let Some(discount) = update.discount {
            validate_discount(discount)?;
        }
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("Product name is required"));
            }
        }

        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(original_price) = update.original_price {
            self.original_price = original_price;
        }
        if let Some(discount) = update.discount {
            self.discount = discount;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(images) = update.images {
            self.images = images;
        }
        if let Some(stock) = update.stock {
            self.stock = stock;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(specifications) = update.specifications {
            self.specifications = specifications;
        }
        self.sync_stock_status();
        self.updated_at = now;
        Ok(())
    }

    fn sync_stock_status(&mut self) {
        match self.status {
            ProductStatus::Active if self.stock == 0 => self.status = ProductStatus::OutOfStock,
            ProductStatus::OutOfStock if self.stock > 0 => self.status = ProductStatus::Active,
            _ => {}
        }
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
