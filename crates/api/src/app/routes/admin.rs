use axum::{
    Extension, Router,
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, put},
};

use bazaar_core::{UserId, VendorId};
use bazaar_infra::Marketplace;
use bazaar_parties::{AccountStatus, UserQuery, VendorQuery, VendorStatus};
use bazaar_products::ProductQuery;
use bazaar_sales::OrderQuery;

use crate::app::dto::{Envelope, JsonBody, ListParams, StatusRequest, parse, parse_filter};
use crate::app::errors::ApiResult;
use crate::context::CurrentUser;
use crate::middleware::AuthState;

pub fn router(auth: AuthState) -> Router {
    super::authenticated(
        Router::new()
            .route("/dashboard", get(dashboard))
            .route("/users", get(list_users))
            .route("/users/:id", axum::routing::delete(delete_user))
            .route("/users/:id/status", put(set_user_status))
            .route("/vendors", get(list_vendors))
            .route("/vendors/:id/approve", put(approve_vendor))
            .route("/products", get(list_products))
            .route("/orders", get(list_orders)),
        auth,
    )
}

pub async fn dashboard(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Envelope::data(market.dashboard(&current.actor()).await?))
}

pub async fn list_users(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let query = UserQuery {
        role: parse_filter(params.role.as_deref())?,
        status: parse_filter(params.status.as_deref())?,
        search: params.search(),
    };
    Ok(Envelope::list(market.admin_users(&current.actor(), &query).await?))
}

pub async fn set_user_status(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<StatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let id: UserId = parse(&id)?;
    let status: AccountStatus = parse(&body.status)?;
    let user = market.set_user_status(&current.actor(), id, status).await?;
    Ok(Envelope::data(user).with_message("User status updated successfully"))
}

pub async fn delete_user(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: UserId = parse(&id)?;
    market.delete_user(&current.actor(), id).await?;
    Ok(Envelope::message("User deleted successfully"))
}

pub async fn list_vendors(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let query = VendorQuery {
        status: parse_filter(params.status.as_deref())?,
        category: parse_filter(params.category.as_deref())?,
    };
    Ok(Envelope::list(market.admin_vendors(&current.actor(), &query).await?))
}

pub async fn approve_vendor(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<StatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let id: VendorId = parse(&id)?;
    let status: VendorStatus = parse(&body.status)?;
    let vendor = market.approve_vendor(&current.actor(), id, status).await?;
    let verdict = if vendor.is_active() { "approved" } else { "rejected" };
    Ok(Envelope::data(vendor).with_message(format!("Vendor {verdict} successfully")))
}

pub async fn list_products(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let query = ProductQuery {
        status: parse_filter(params.status.as_deref())?,
        category: parse_filter(params.category.as_deref())?,
        ..ProductQuery::default()
    };
    Ok(Envelope::list(market.admin_products(&current.actor(), &query).await?))
}

pub async fn list_orders(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let query = OrderQuery {
        status: parse_filter(params.status.as_deref())?,
        payment_status: parse_filter(params.payment_status.as_deref())?,
        ..OrderQuery::default()
    };
    Ok(Envelope::list(market.admin_orders(&current.actor(), &query).await?))
}
