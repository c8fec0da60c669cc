use axum::{
    Extension, Router,
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post, put},
};

use bazaar_core::VendorId;
use bazaar_infra::Marketplace;
use bazaar_infra::marketplace::RegisterVendorInput;
use bazaar_parties::VendorProfileUpdate;

use crate::app::dto::{Envelope, JsonBody, ListParams, parse, parse_filter};
use crate::app::errors::ApiResult;
use crate::authz::vendor_only;
use crate::context::CurrentUser;
use crate::middleware::AuthState;

pub fn router(auth: AuthState) -> Router {
    let own_store = Router::new()
        .route("/me", put(update_own))
        .route("/me/profile", get(own_profile))
        .route("/me/products", get(own_products))
        .route("/me/stats", get(own_stats))
        .route_layer(axum::middleware::from_fn(vendor_only));

    let protected = super::authenticated(
        Router::new()
            .route("/register", post(register))
            .merge(own_store),
        auth,
    );

    Router::new()
        .route("/", get(list_vendors))
        .route("/:id", get(get_vendor))
        .merge(protected)
}

pub async fn register(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(body): JsonBody<RegisterVendorInput>,
) -> ApiResult<impl IntoResponse> {
    let vendor = market.register_vendor(&current.actor(), body).await?;
    Ok(Envelope::data(vendor)
        .with_message("Vendor registration submitted. Awaiting admin approval.")
        .created())
}

pub async fn list_vendors(
    Extension(market): Extension<Marketplace>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let status = parse_filter(params.status.as_deref())?;
    let category = parse_filter(params.category.as_deref())?;
    Ok(Envelope::list(market.list_vendors(status, category).await?))
}

pub async fn get_vendor(
    Extension(market): Extension<Marketplace>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: VendorId = parse(&id)?;
    Ok(Envelope::data(market.vendor_detail(id).await?))
}

pub async fn own_profile(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Envelope::data(market.my_vendor_detail(&current.actor()).await?))
}

pub async fn update_own(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(body): JsonBody<VendorProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    let vendor = market.update_my_vendor(&current.actor(), body).await?;
    Ok(Envelope::data(vendor).with_message("Vendor profile updated successfully"))
}

pub async fn own_products(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Envelope::list(market.my_products(&current.actor()).await?))
}

pub async fn own_stats(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Envelope::data(market.my_stats(&current.actor()).await?))
}
