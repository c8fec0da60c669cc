//! Route-level role guards.
//!
//! Resource-scoped checks (ownership, vendor lines) happen inside the
//! marketplace operations; these guards only reject whole route groups by
//! role before a handler runs.

use axum::{extract::Request, middleware::Next, response::Response};

use bazaar_auth::{AuthzError, Role};

use crate::app::errors::ApiError;
use crate::context::CurrentUser;

/// Fail with the role-denied message unless the account holds one of `roles`.
pub fn require_role(current: &CurrentUser, roles: &[Role]) -> Result<(), ApiError> {
    if roles.contains(&current.role()) {
        Ok(())
    } else {
        Err(AuthzError::RoleDenied { role: current.role() }.into())
    }
}

/// Guard for the vendor self-service surface. Must sit inside the auth layer.
pub async fn vendor_only(req: Request, next: Next) -> Result<Response, ApiError> {
    let current = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token provided".to_string()))?;
    require_role(current, &[Role::Vendor])?;
    Ok(next.run(req).await)
}
