//! Sign-up, login, the authentication gate and self-service account edits.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use bazaar_auth::{JwtValidator, Role, hash_password, verify_password};
use bazaar_core::{DomainError, Money, UserId};
use bazaar_parties::{Address, NewUser, ProfileUpdate, User, Vendor};
use bazaar_sales::{CustomerOrderView, OrderQuery, OrderStatus};

use super::{Marketplace, ServiceError, ServiceResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Portal the client is logging into; must match the account role.
    pub role: Option<Role>,
}

/// A freshly authenticated account.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub vendor: Option<Vendor>,
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_orders: u32,
    pub total_spent: Money,
    /// Pending or confirmed.
    pub pending_orders: usize,
    pub delivered_orders: usize,
    pub cancelled_orders: usize,
}

fn hashing_failed(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Internal(e.to_string())
}

impl Marketplace {
    /// Resolve a bearer credential to an active account.
    pub async fn authenticate(&self, token: &str) -> ServiceResult<User> {
        let claims = self.tokens.validate(token).map_err(DomainError::from)?;

        let user = self
            .store
            .user(claims.sub)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;

        if !user.is_active() {
            return Err(DomainError::forbidden("Account is not active").into());
        }
        Ok(user)
    }

    #[instrument(skip(self, input), fields(email = %input.email), err)]
    pub async fn signup(&self, input: SignupInput) -> ServiceResult<AuthSession> {
        if input.name.trim().is_empty() || input.email.trim().is_empty() || input.password.is_empty() {
            return Err(DomainError::validation("Please provide name, email and password").into());
        }
        let role = input.role.unwrap_or_default();
        if role == Role::Admin {
            return Err(DomainError::forbidden("Admin accounts cannot be created through signup").into());
        }

        let password_hash = hash_password(&input.password).map_err(hashing_failed)?;
        let user = User::register(
            NewUser {
                name: input.name,
                email: input.email,
                password_hash,
                phone: input.phone,
                address: input.address,
                role,
            },
            Utc::now(),
        )?;

        let mut uow = self.begin().await?;
        if uow.user_by_email(&user.email).await?.is_some() {
            return Err(DomainError::validation("User already exists with this email").into());
        }
        uow.save_user(&user).await?;
        uow.commit().await?;

        let token = self.tokens.issue(user.id)?;
        info!(user_id = %user.id, role = %user.role, "account created");
        Ok(AuthSession {
            user,
            vendor: None,
            token,
        })
    }

    #[instrument(skip(self, input), fields(email = %input.email), err)]
    pub async fn login(&self, input: LoginInput) -> ServiceResult<AuthSession> {
        if input.email.trim().is_empty() || input.password.is_empty() {
            return Err(DomainError::validation("Please provide email and password").into());
        }

        let Some(user) = self.store.user_by_email(&input.email).await? else {
            return Err(DomainError::unauthenticated("Invalid credentials").into());
        };
        if let Some(role) = input.role {
            if user.role != role {
                return Err(DomainError::forbidden(format!(
                    "This account is not registered as {role}"
                ))
                .into());
            }
        }
        if !verify_password(&input.password, &user.password_hash).map_err(hashing_failed)? {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(DomainError::unauthenticated("Invalid credentials").into());
        }
        if !user.is_active() {
            return Err(DomainError::forbidden(
                "Your account is not active. Please contact support.",
            )
            .into());
        }

        let token = self.tokens.issue(user.id)?;
        let vendor = self.vendor_for(user.id, user.role).await?;
        Ok(AuthSession { user, vendor, token })
    }

    /// Create the operator account at startup unless the email is taken.
    /// Returns `true` when an account was created.
    #[instrument(skip(self, password), err)]
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> ServiceResult<bool> {
        let mut uow = self.begin().await?;
        if let Some(existing) = uow.user_by_email(email).await? {
            if existing.role != Role::Admin {
                warn!(user_id = %existing.id, "bootstrap admin email belongs to a non-admin account");
            }
            return Ok(false);
        }

        let password_hash = hash_password(password).map_err(hashing_failed)?;
        let admin = User::register(
            NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
                phone: None,
                address: None,
                role: Role::Admin,
            },
            Utc::now(),
        )?;
        uow.save_user(&admin).await?;
        uow.commit().await?;

        info!(user_id = %admin.id, "admin account bootstrapped");
        Ok(true)
    }

    /// The vendor profile shown alongside a vendor account.
    pub async fn vendor_for(&self, user_id: UserId, role: Role) -> ServiceResult<Option<Vendor>> {
        if role != Role::Vendor {
            return Ok(None);
        }
        Ok(self.store.vendor_by_user(user_id).await?)
    }

    #[instrument(skip(self, update), err)]
    pub async fn update_profile(&self, user_id: UserId, update: ProfileUpdate) -> ServiceResult<User> {
        let mut uow = self.begin().await?;
        let mut user = uow
            .user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;
        user.apply_profile(update, Utc::now())?;
        uow.save_user(&user).await?;
        uow.commit().await?;
        Ok(user)
    }

    #[instrument(skip(self, current, new), err)]
    pub async fn change_password(&self, user_id: UserId, current: &str, new: &str) -> ServiceResult<()> {
        if current.is_empty() || new.is_empty() {
            return Err(DomainError::validation("Please provide current and new password").into());
        }

        let mut uow = self.begin().await?;
        let mut user = uow
            .user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;
        if !verify_password(current, &user.password_hash).map_err(hashing_failed)? {
            return Err(DomainError::unauthenticated("Current password is incorrect").into());
        }
        let hash = hash_password(new).map_err(hashing_failed)?;
        user.set_password_hash(hash, Utc::now());
        uow.save_user(&user).await?;
        uow.commit().await?;
        Ok(())
    }

    pub async fn user_orders(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
    ) -> ServiceResult<Vec<CustomerOrderView>> {
        let orders = self
            .store
            .orders(&OrderQuery {
                user_id: Some(user_id),
                status,
                ..OrderQuery::default()
            })
            .await?;
        Ok(orders.into_iter().map(CustomerOrderView::from).collect())
    }

    pub async fn user_stats(&self, user_id: UserId) -> ServiceResult<UserStats> {
        let user = self
            .store
            .user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;
        let orders = self
            .store
            .orders(&OrderQuery {
                user_id: Some(user_id),
                ..OrderQuery::default()
            })
            .await?;

        let count = |pred: fn(OrderStatus) -> bool| orders.iter().filter(|o| pred(o.status())).count();
        Ok(UserStats {
            total_orders: user.order_count,
            total_spent: user.total_spent,
            pending_orders: count(|s| s.is_cancellable()),
            delivered_orders: count(|s| s == OrderStatus::Delivered),
            cancelled_orders: count(|s| s == OrderStatus::Cancelled),
        })
    }
}
