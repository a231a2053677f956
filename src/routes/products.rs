use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::products::{ProductList, ProductQuery},
    error::AppResult,
    middleware::auth::GatewayAuth,
    response::{ApiResponse, Meta},
    state::AppState,
    storage::Storage,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_products))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Products of one seller", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    _auth: GatewayAuth,
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let deps = state.bot.deps();
    let items = deps
        .io("list products", deps.storage.products_by_owner(query.owner_id))
        .await?;
    let meta = Meta::count(items.len());
    Ok(Json(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    )))
}
