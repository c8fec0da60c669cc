use axum::{
    Extension, Router,
    extract::Query,
    response::IntoResponse,
    routing::{get, put},
};

use bazaar_infra::Marketplace;
use bazaar_parties::ProfileUpdate;

use crate::app::dto::{ChangePasswordRequest, Envelope, JsonBody, ListParams, parse_filter};
use crate::app::errors::ApiResult;
use crate::context::CurrentUser;
use crate::middleware::AuthState;

pub fn router(auth: AuthState) -> Router {
    super::authenticated(
        Router::new()
            .route("/profile", get(get_profile).put(update_profile))
            .route("/change-password", put(change_password))
            .route("/orders", get(my_orders))
            .route("/stats", get(my_stats)),
        auth,
    )
}

pub async fn get_profile(Extension(current): Extension<CurrentUser>) -> impl IntoResponse {
    Envelope::data(current.profile().clone())
}

pub async fn update_profile(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(body): JsonBody<ProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    let user = market.update_profile(current.id(), body).await?;
    Ok(Envelope::data(user.profile()).with_message("Profile updated successfully"))
}

pub async fn change_password(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(body): JsonBody<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    market
        .change_password(current.id(), &body.current_password, &body.new_password)
        .await?;
    Ok(Envelope::message("Password changed successfully"))
}

pub async fn my_orders(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let status = parse_filter(params.status.as_deref())?;
    let orders = market.user_orders(current.id(), status).await?;
    Ok(Envelope::list(orders))
}

pub async fn my_stats(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Envelope::data(market.user_stats(current.id()).await?))
}
