use axum::{
    Extension, Router,
    response::IntoResponse,
    routing::{get, post},
};

use bazaar_infra::Marketplace;
use bazaar_infra::marketplace::{LoginInput, SignupInput};

use crate::app::dto::{Envelope, JsonBody, SessionPayload};
use crate::app::errors::ApiResult;
use crate::context::CurrentUser;
use crate::middleware::AuthState;

pub fn router(auth: AuthState) -> Router {
    let protected = super::authenticated(
        Router::new()
            .route("/me", get(me))
            .route("/logout", post(logout)),
        auth,
    );

    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .merge(protected)
}

pub async fn signup(
    Extension(market): Extension<Marketplace>,
    JsonBody(body): JsonBody<SignupInput>,
) -> ApiResult<impl IntoResponse> {
    let session = market.signup(body).await?;

    Ok(Envelope::data(SessionPayload {
        user: session.user.profile(),
        vendor: None,
        token: Some(session.token),
    })
    .with_message("User registered successfully")
    .created())
}

pub async fn login(
    Extension(market): Extension<Marketplace>,
    JsonBody(body): JsonBody<LoginInput>,
) -> ApiResult<impl IntoResponse> {
    let session = market.login(body).await?;

    Ok(Envelope::data(SessionPayload {
        user: session.user.profile(),
        vendor: session.vendor,
        token: Some(session.token),
    })
    .with_message("Login successful"))
}

pub async fn me(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let vendor = market.vendor_for(current.id(), current.role()).await?;

    Ok(Envelope::data(SessionPayload {
        user: current.profile().clone(),
        vendor,
        token: None,
    }))
}

/// Tokens are stateless; the client discards its copy.
pub async fn logout(Extension(_current): Extension<CurrentUser>) -> impl IntoResponse {
    Envelope::message("Logged out successfully")
}
