use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_auth::{Actor, Role};
use bazaar_core::{DomainError, DomainResult, Entity, Money, UserId};

/// Account status lifecycle. Only `Active` accounts pass the authentication gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Suspended => "suspended",
        }
    }
}

impl FromStr for AccountStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "inactive" => Ok(AccountStatus::Inactive),
            "suspended" => Ok(AccountStatus::Suspended),
            _ => Err(DomainError::validation("Invalid status value")),
        }
    }
}

/// Postal address; every part optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pin_code: Option<String>,
}

/// Stored account record.
///
/// Carries the password hash, so it must never be serialized to clients;
/// use [`User::profile`] for anything leaving the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Lower-cased; unique across accounts.
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: Address,
    pub role: Role,
    pub status: AccountStatus,
    pub order_count: u32,
    pub total_spent: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for account creation (password already hashed).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub role: Role,
}

/// Self-service profile edit; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
}

/// Client-facing view of an account (no credential material).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub role: Role,
    pub status: AccountStatus,
    pub order_count: u32,
    pub total_spent: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Normalize an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    pub fn register(new: NewUser, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = new.name.trim().to_string();
        let email = normalize_email(&new.email);
        if name.is_empty() || email.is_empty() || new.password_hash.is_empty() {
            return Err(DomainError::validation("Please provide name, email and password"));
        }

        Ok(Self {
            id: UserId::new(),
            name,
            email,
            password_hash: new.password_hash,
            phone: new.phone.unwrap_or_default(),
            address: new.address.unwrap_or_default(),
            role: new.role,
            status: AccountStatus::Active,
            order_count: 0,
            total_spent: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            role: self.role,
            status: self.status,
            order_count: self.order_count,
            total_spent: self.total_spent,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn apply_profile(&mut self, update: ProfileUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::validation("Name cannot be empty"));
            }
            self.name = name.to_string();
        }
        if let Some(phone) = update.phone {
            self.phone = phone;
        }
        if let Some(address) = update.address {
            self.address = address;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn set_password_hash(&mut self, hash: String, now: DateTime<Utc>) {
        self.password_hash = hash;
        self.updated_at = now;
    }

    pub fn set_status(&mut self, status: AccountStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    pub fn promote_to_vendor(&mut self, now: DateTime<Utc>) {
        if self.role != Role::Admin {
            self.role = Role::Vendor;
        }
        self.updated_at = now;
    }

    /// Counters for a newly placed order.
    pub fn record_order(&mut self, total: Money, now: DateTime<Utc>) {
        self.order_count = self.order_count.saturating_add(1);
        self.total_spent = self.total_spent.saturating_add(total);
        self.updated_at = now;
    }

    /// Exact inverse of [`User::record_order`].
    pub fn reverse_order(&mut self, total: Money, now: DateTime<Utc>) {
        self.order_count = self.order_count.saturating_sub(1);
        self.total_spent = self.total_spent.saturating_sub(total);
        self.updated_at = now;
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Admin listing filter.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
    /// Case-insensitive substring over name and email.
    pub search: Option<String>,
}

impl UserQuery {
    pub fn matches(&self, user: &User) -> bool {
        if self.role.is_some_and(|r| r != user.role) {
            return false;
        }
        if self.status.is_some_and(|s| s != user.status) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                user.name.to_lowercase().contains(&needle) || user.email.contains(&needle)
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Asha Rao".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            phone: None,
            address: None,
            role: Role::User,
        }
    }

    #[test]
    fn register_normalizes_email_and_starts_active() {
        let user = User::register(new_user("  Asha@Example.COM "), Utc::now()).unwrap();
        assert_eq!(user.email, "asha@example.com");
        assert!(user.is_active());
        assert_eq!(user.order_count, 0);
        assert_eq!(user.total_spent, 0);
    }

    #[test]
    fn register_requires_name_and_email() {
        let mut input = new_user("");
        assert!(matches!(
            User::register(input.clone(), Utc::now()),
            Err(DomainError::Validation(_))
        ));
        input.email = "a@b.c".to_string();
        input.name = "   ".to_string();
        assert!(User::register(input, Utc::now()).is_err());
    }

    #[test]
    fn reverse_order_is_exact_inverse() {
        let mut user = User::register(new_user("a@b.c"), Utc::now()).unwrap();
        user.record_order(1_999_00, Utc::now());
        user.record_order(500_00, Utc::now());
        user.reverse_order(1_999_00, Utc::now());

        assert_eq!(user.order_count, 1);
        assert_eq!(user.total_spent, 500_00);
    }

    #[test]
    fn spend_counter_saturates_instead_of_wrapping() {
        let mut user = User::register(new_user("a@b.c"), Utc::now()).unwrap();
        user.record_order(i64::MAX, Utc::now());
        user.record_order(1, Utc::now());
        assert_eq!(user.total_spent, i64::MAX);
        assert_eq!(user.order_count, 2);
    }

    #[test]
    fn profile_never_carries_password_hash() {
        let user = User::register(new_user("a@b.c"), Utc::now()).unwrap();
        let json = serde_json::to_value(user.profile()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["orderCount"], 0);
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn promotion_keeps_admins_admin() {
        let mut admin = User::register(new_user("root@b.c"), Utc::now()).unwrap();
        admin.role = Role::Admin;
        admin.promote_to_vendor(Utc::now());
        assert_eq!(admin.role, Role::Admin);

        let mut user = User::register(new_user("u@b.c"), Utc::now()).unwrap();
        user.promote_to_vendor(Utc::now());
        assert_eq!(user.role, Role::Vendor);
    }

    #[test]
    fn query_search_is_case_insensitive() {
        let user = User::register(new_user("asha@example.com"), Utc::now()).unwrap();
        let query = UserQuery {
            search: Some("ASHA".to_string()),
            ..UserQuery::default()
        };
        assert!(query.matches(&user));

        let by_role = UserQuery {
            role: Some(Role::Vendor),
            ..UserQuery::default()
        };
        assert!(!by_role.matches(&user));
    }
}
