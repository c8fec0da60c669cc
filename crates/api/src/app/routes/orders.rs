use axum::{
    Extension, Router,
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post, put},
};

use bazaar_core::OrderId;
use bazaar_infra::Marketplace;
use bazaar_infra::marketplace::StatusUpdateInput;
use bazaar_sales::OrderRequest;

use crate::app::dto::{Envelope, JsonBody, ListParams, parse, parse_filter};
use crate::app::errors::ApiResult;
use crate::authz::vendor_only;
use crate::context::CurrentUser;
use crate::middleware::AuthState;

pub fn router(auth: AuthState) -> Router {
    let vendor_desk = Router::new()
        .route("/vendor/all", get(vendor_orders))
        .route("/vendor/pending", get(vendor_pending))
        .route_layer(axum::middleware::from_fn(vendor_only));

    super::authenticated(
        Router::new()
            .route("/", post(create_order).get(my_orders))
            .route("/:id", get(get_order))
            .route("/:id/status", put(update_status))
            .route("/:id/cancel", put(cancel_order))
            .merge(vendor_desk),
        auth,
    )
}

pub async fn create_order(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(body): JsonBody<OrderRequest>,
) -> ApiResult<impl IntoResponse> {
    let order = market.create_order(&current.actor(), body).await?;
    Ok(Envelope::data(order)
        .with_message("Order placed successfully. Waiting for vendor confirmation.")
        .created())
}

pub async fn my_orders(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let status = parse_filter(params.status.as_deref())?;
    Ok(Envelope::list(market.user_orders(current.id(), status).await?))
}

pub async fn get_order(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: OrderId = parse(&id)?;
    Ok(Envelope::data(market.order_detail(&current.actor(), id).await?))
}

pub async fn update_status(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<StatusUpdateInput>,
) -> ApiResult<impl IntoResponse> {
    let id: OrderId = parse(&id)?;
    let order = market.update_order_status(&current.actor(), id, body).await?;
    Ok(Envelope::data(order).with_message("Order status updated successfully"))
}

pub async fn cancel_order(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: OrderId = parse(&id)?;
    let order = market.cancel_order(&current.actor(), id).await?;
    Ok(Envelope::data(order).with_message("Order cancelled successfully"))
}

pub async fn vendor_orders(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let status = parse_filter(params.status.as_deref())?;
    let desk = market.vendor_orders(&current.actor(), status).await?;
    Ok(Envelope::list(desk.orders).with_stats(desk.stats))
}

pub async fn vendor_pending(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Envelope::list(market.vendor_pending_orders(&current.actor()).await?))
}
