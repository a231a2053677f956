use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::vector::FeatureVector;

pub type ChatId = i64;
pub type OwnerId = i64;
pub type ProductId = i64;
pub type ImageId = i64;
pub type OrderId = i64;
pub type MessageId = i32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: ProductId,
    pub owner_id: OwnerId,
    pub name: String,
    pub description: String,
    pub count: i32,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
}

/// A photo attached to a draft before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub url: String,
    pub bytes: Vec<u8>,
    pub vector: FeatureVector,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredVector {
    pub product_id: ProductId,
    pub image_id: ImageId,
    pub vector: FeatureVector,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub owner_id: OwnerId,
    pub name: String,
    pub description: String,
    pub count: i32,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub images: Vec<ImageRecord>,
}

impl ProductDraft {
    pub fn new(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            name: String::new(),
            description: String::new(),
            count: 0,
            purchase_price: Decimal::ZERO,
            selling_price: Decimal::ZERO,
            images: Vec::new(),
        }
    }
}

/// A single typed column update. The set of updatable columns is closed.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Name(String),
    Description(String),
    Count(i32),
    PurchasePrice(Decimal),
    SellingPrice(Decimal),
}

impl FieldUpdate {
    pub fn column(&self) -> &'static str {
        match self {
            FieldUpdate::Name(_) => "name",
            FieldUpdate::Description(_) => "description",
            FieldUpdate::Count(_) => "count",
            FieldUpdate::PurchasePrice(_) => "purchase_price",
            FieldUpdate::SellingPrice(_) => "selling_price",
        }
    }

    pub fn apply(&self, product: &mut Product) {
        match self {
            FieldUpdate::Name(v) => product.name = v.clone(),
            FieldUpdate::Description(v) => product.description = v.clone(),
            FieldUpdate::Count(v) => product.count = *v,
            FieldUpdate::PurchasePrice(v) => product.purchase_price = *v,
            FieldUpdate::SellingPrice(v) => product.selling_price = *v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PayType {
    Cash,
    Kaspi,
}

impl PayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayType::Cash => "cash",
            PayType::Kaspi => "kaspi",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PayType::Cash => "Cash",
            PayType::Kaspi => "Kaspi",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub buyer_id: OwnerId,
    pub amount: Decimal,
    pub pay_type: PayType,
    pub phone: Option<String>,
    pub details: Vec<NewOrderDetail>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderDetail {
    pub product_id: ProductId,
    pub unit_amount: Decimal,
    pub count: i32,
    pub discount: i16,
    pub fact_sum: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: OwnerId,
    pub amount: Decimal,
    pub pay_type: PayType,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderDetail {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub unit_amount: Decimal,
    pub count: i32,
    pub discount: i16,
    pub fact_sum: Decimal,
}
