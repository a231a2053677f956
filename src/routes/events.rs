use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::events::{EventReplies, InboundEvent},
    error::AppResult,
    ingress::ChatEvent,
    middleware::auth::GatewayAuth,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(handle_event))
}

#[utoipa::path(
    post,
    path = "/api/events",
    request_body = InboundEvent,
    responses(
        (status = 200, description = "Replies to render", body = ApiResponse<EventReplies>),
        (status = 400, description = "Malformed event or action payload"),
        (status = 401, description = "Missing or invalid gateway token"),
    ),
    tag = "Events"
)]
pub async fn handle_event(
    auth: GatewayAuth,
    State(state): State<AppState>,
    Json(payload): Json<InboundEvent>,
) -> AppResult<Json<ApiResponse<EventReplies>>> {
    let event = ChatEvent::try_from(payload)?;
    tracing::debug!(gateway = %auth.gateway, chat_id = %event.chat_id(), "event received");
    let replies = state.bot.handle(event).await;
    Ok(Json(ApiResponse::success(
        "Handled",
        EventReplies { replies },
        Some(Meta::empty()),
    )))
}
