use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::models::ProductId;
use crate::response::{ApiResponse, Meta};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not Found")]
    NotFound,

    #[error("Cart not found")]
    CartNotFound,

    #[error("Product {0} is not in the cart")]
    LineNotFound(ProductId),

    #[error("Count {requested} is outside 0..={available}")]
    OutOfRange { requested: i64, available: i64 },

    #[error("Discount {0} is outside 0..=100")]
    InvalidDiscount(i64),

    #[error("Vectors have different dimensions: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("Insufficient stock for product {0}")]
    CommitConflict(ProductId),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalService(err.to_string())
    }
}

impl From<rust_decimal::Error> for AppError {
    fn from(err: rust_decimal::Error) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl AppError {
    /// Text shown to the chat user when a handler fails with this error.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(_) => "Please enter a valid value.".into(),
            AppError::NotFound => "Product not found.".into(),
            AppError::CartNotFound => "Cart not found.".into(),
            AppError::LineNotFound(_) => "This product is not in the cart.".into(),
            AppError::OutOfRange { available, .. } => {
                format!("Quantity must be between 0 and {available}.")
            }
            AppError::InvalidDiscount(_) => "Enter a discount from 0 to 100.".into(),
            AppError::DimensionMismatch { .. } => "Photo processing error.".into(),
            AppError::ExternalService(_) | AppError::Timeout(_) => {
                "Service is temporarily unavailable, please try again.".into()
            }
            AppError::CommitConflict(_) => {
                "Not enough stock to complete the order. Adjust quantities and try again.".into()
            }
            AppError::Unauthorized => "Unauthorized.".into(),
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                "Something went wrong, please try again.".into()
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound | AppError::CartNotFound | AppError::LineNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::Validation(_)
            | AppError::OutOfRange { .. }
            | AppError::InvalidDiscount(_)
            | AppError::DimensionMismatch { .. } => StatusCode::BAD_REQUEST,
            AppError::CommitConflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
