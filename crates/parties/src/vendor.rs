use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{Category, DomainError, DomainResult, Entity, Money, UserId, VendorId};

/// Vendor status lifecycle.
///
/// Registrations start `Pending`; an admin moves them to `Active` (approval)
/// or `Inactive` (rejection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorStatus {
    #[default]
    Pending,
    Active,
    Inactive,
    Suspended,
}

impl VendorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VendorStatus::Pending => "pending",
            VendorStatus::Active => "active",
            VendorStatus::Inactive => "inactive",
            VendorStatus::Suspended => "suspended",
        }
    }
}

impl FromStr for VendorStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(VendorStatus::Pending),
            "active" => Ok(VendorStatus::Active),
            "inactive" => Ok(VendorStatus::Inactive),
            "suspended" => Ok(VendorStatus::Suspended),
            other => Err(DomainError::validation(format!("unknown vendor status '{other}'"))),
        }
    }
}

/// Stored vendor (store) profile. One per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: VendorId,
    pub user_id: UserId,
    pub store_name: String,
    pub category: Category,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub rating: f64,
    pub total_products: u32,
    pub total_revenue: Money,
    pub status: VendorStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVendor {
    pub user_id: UserId,
    pub store_name: String,
    pub category: Category,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// Owner edit of the store profile; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorProfileUpdate {
    pub store_name: Option<String>,
    pub category: Option<Category>,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl Vendor {
    pub fn register(new: NewVendor, now: DateTime<Utc>) -> DomainResult<Self> {
        let store_name = new.store_name.trim().to_string();
        if store_name.is_empty() {
            return Err(DomainError::validation("Store name is required"));
        }

        Ok(Self {
            id: VendorId::new(),
            user_id: new.user_id,
            store_name,
            category: new.category,
            description: new.description.unwrap_or_default(),
            location: new.location.unwrap_or_default(),
            rating: 0.0,
            total_products: 0,
            total_revenue: 0,
            status: VendorStatus::Pending,
            approved_at: None,
            approved_by: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == VendorStatus::Active
    }

    /// Admin decision on a registration: `Active` approves, `Inactive` rejects.
    pub fn decide(&mut self, status: VendorStatus, admin: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        match status {
            VendorStatus::Active => {
                self.approved_at = Some(now);
                self.approved_by = Some(admin);
            }
            VendorStatus::Inactive => {
                self.approved_at = None;
                self.approved_by = None;
            }
            _ => {
                return Err(DomainError::validation(
                    "Status must be either active or inactive",
                ));
            }
        }
        self.status = status;
        self.updated_at = now;
        Ok(())
    }

    pub fn apply_profile(&mut self, update: VendorProfileUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = update.store_name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::validation("Store name is required"));
            }
            self.store_name = name.to_string();
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(location) = update.location {
            self.location = location;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn credit_revenue(&mut self, amount: Money, now: DateTime<Utc>) {
        self.total_revenue = self.total_revenue.saturating_add(amount);
        self.updated_at = now;
    }

    pub fn debit_revenue(&mut self, amount: Money, now: DateTime<Utc>) {
        self.total_revenue = self.total_revenue.saturating_sub(amount);
        self.updated_at = now;
    }

    pub fn product_added(&mut self, now: DateTime<Utc>) {
        self.total_products += 1;
        self.updated_at = now;
    }

    /// Floors at zero.
    pub fn product_removed(&mut self, now: DateTime<Utc>) {
        self.total_products = self.total_products.saturating_sub(1);
        self.updated_at = now;
    }
}

impl Entity for Vendor {
    type Id = VendorId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Vendor listing filter.
#[derive(Debug, Clone, Default)]
pub struct VendorQuery {
    pub status: Option<VendorStatus>,
    pub category: Option<Category>,
}

impl VendorQuery {
    /// Public directory: active vendors unless a status is requested.
    pub fn public(status: Option<VendorStatus>, category: Option<Category>) -> Self {
        Self {
            status: Some(status.unwrap_or(VendorStatus::Active)),
            category,
        }
    }

    pub fn matches(&self, vendor: &Vendor) -> bool {
        self.status.is_none_or(|s| s == vendor.status)
            && self.category.is_none_or(|c| c == vendor.category)
    }
}

/// Directory order: best rated first, then newest.
pub fn sort_for_directory(vendors: &mut [Vendor]) {
    vendors.sort_by(|a, b| {
        b.rating
            .total_cmp(&a.rating)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}
