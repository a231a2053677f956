use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

/// Claims carried by the chat gateway's bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayClaims {
    pub sub: String,
    pub exp: usize,
}

/// Proof that the request came from the configured chat gateway.
#[derive(Debug, Clone)]
pub struct GatewayAuth {
    pub gateway: String,
}

impl FromRequestParts<AppState> for GatewayAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AppError::Unauthorized)?;

        let auth_str = auth_header.to_str().map_err(|_| AppError::Unauthorized)?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or(AppError::Unauthorized)?;

        let decoded = decode::<GatewayClaims>(
            token,
            &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|err| {
            tracing::debug!(error = %err, "gateway token rejected");
            AppError::Unauthorized
        })?;

        Ok(GatewayAuth {
            gateway: decoded.claims.sub,
        })
    }
}
