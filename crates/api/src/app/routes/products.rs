use axum::{
    Extension, Router,
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post, put},
};

use bazaar_core::ProductId;
use bazaar_infra::Marketplace;
use bazaar_products::{NewProduct, ProductQuery, ProductUpdate, SortKey};

use crate::app::dto::{Envelope, JsonBody, ListParams, parse, parse_filter};
use crate::app::errors::{ApiError, ApiResult};
use crate::context::CurrentUser;
use crate::middleware::AuthState;

pub fn router(auth: AuthState) -> Router {
    let protected = super::authenticated(
        Router::new()
            .route("/", post(create_product))
            .route("/:id", put(update_product).delete(delete_product)),
        auth,
    );

    Router::new()
        .route("/", get(list_products))
        .route("/categories/list", get(categories))
        .route("/:id", get(get_product))
        .merge(protected)
}

fn catalog_query(params: &ListParams) -> Result<ProductQuery, ApiError> {
    Ok(ProductQuery {
        category: parse_filter(params.category.as_deref())?,
        search: params.search(),
        min_price: ListParams::price(params.min_price.as_deref(), "minPrice")?,
        max_price: ListParams::price(params.max_price.as_deref(), "maxPrice")?,
        sort: params.sort.as_deref().map(parse::<SortKey>).transpose()?.unwrap_or_default(),
        ..ProductQuery::catalog()
    })
}

pub async fn list_products(
    Extension(market): Extension<Marketplace>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let query = catalog_query(&params)?;
    Ok(Envelope::list(market.list_products(&query).await?))
}

pub async fn get_product(
    Extension(market): Extension<Marketplace>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: ProductId = parse(&id)?;
    Ok(Envelope::data(market.product_detail(id).await?))
}

pub async fn categories(Extension(market): Extension<Marketplace>) -> impl IntoResponse {
    Envelope::data(market.categories())
}

pub async fn create_product(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(body): JsonBody<NewProduct>,
) -> ApiResult<impl IntoResponse> {
    let product = market.create_product(&current.actor(), body).await?;
    Ok(Envelope::data(product)
        .with_message("Product created successfully")
        .created())
}

pub async fn update_product(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ProductUpdate>,
) -> ApiResult<impl IntoResponse> {
    let id: ProductId = parse(&id)?;
    let product = market.update_product(&current.actor(), id, body).await?;
    Ok(Envelope::data(product).with_message("Product updated successfully"))
}

pub async fn delete_product(
    Extension(market): Extension<Marketplace>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: ProductId = parse(&id)?;
    market.delete_product(&current.actor(), id).await?;
    Ok(Envelope::message("Product deleted successfully"))
}
