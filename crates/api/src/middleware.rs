use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use bazaar_infra::Marketplace;

use crate::app::errors::ApiError;
use crate::context::CurrentUser;

const NO_TOKEN: &str = "Not authorized, no token provided";

#[derive(Clone)]
pub struct AuthState {
    pub market: Marketplace,
}

/// Resolve the bearer token to an active account and attach it to the
/// request as [`CurrentUser`].
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;

    let user = state.market.authenticate(token).await?;

    req.extensions_mut().insert(CurrentUser::new(&user));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let unauthorized = || ApiError::Unauthorized(NO_TOKEN.to_string());

    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(unauthorized)?;

    let header = header.to_str().map_err(|_| unauthorized())?;

    let header = header.strip_prefix("Bearer ").ok_or_else(unauthorized)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(unauthorized());
    }

    Ok(token)
}
