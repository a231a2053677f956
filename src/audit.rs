use rust_decimal::Decimal;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppResult,
    models::{OrderId, OwnerId, ProductId},
};

/// One audit row, written after the change it describes is durable.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub owner_id: Option<OwnerId>,
    pub action: &'static str,
    pub resource: &'static str,
    pub metadata: Value,
}

impl AuditEntry {
    pub fn product_created(owner_id: OwnerId, product_id: ProductId) -> Self {
        Self {
            owner_id: Some(owner_id),
            action: "product_created",
            resource: "products",
            metadata: json!({ "product_id": product_id }),
        }
    }

    pub fn product_updated(owner_id: OwnerId, product_id: ProductId, field: &str) -> Self {
        Self {
            owner_id: Some(owner_id),
            action: "product_updated",
            resource: "products",
            metadata: json!({ "product_id": product_id, "field": field }),
        }
    }

    pub fn product_deleted(owner_id: OwnerId, product_id: ProductId) -> Self {
        Self {
            owner_id: Some(owner_id),
            action: "product_deleted",
            resource: "products",
            metadata: json!({ "product_id": product_id }),
        }
    }

    pub fn order_committed(
        buyer_id: OwnerId,
        order_id: OrderId,
        amount: Decimal,
        lines: usize,
    ) -> Self {
        Self {
            owner_id: Some(buyer_id),
            action: "order_committed",
            resource: "orders",
            metadata: json!({ "order_id": order_id, "amount": amount, "lines": lines }),
        }
    }
}

pub async fn log_audit(
    pool: &DbPool,
    owner_id: Option<OwnerId>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, owner_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .bind(action)
    .bind(resource)
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}
