use axum::{
    Router,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
};

use crate::{
    error::{AppError, AppResult},
    middleware::auth::GatewayAuth,
    models::ImageId,
    state::AppState,
    storage::Storage,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(get_image))
}

#[utoipa::path(
    get,
    path = "/api/images/{id}",
    params(
        ("id" = i64, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Stored photo", content_type = "image/jpeg", body = Vec<u8>),
        (status = 404, description = "Image not found"),
    ),
    tag = "Images"
)]
pub async fn get_image(
    _auth: GatewayAuth,
    State(state): State<AppState>,
    Path(id): Path<ImageId>,
) -> AppResult<impl IntoResponse> {
    let deps = state.bot.deps();
    let bytes = deps
        .io("load image", deps.storage.image_bytes(id))
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}
