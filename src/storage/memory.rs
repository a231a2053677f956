use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::audit::AuditEntry;
use crate::error::{AppError, AppResult};
use crate::models::{
    FieldUpdate, ImageId, NewOrder, Order, OrderDetail, OrderId, OwnerId, Product, ProductDraft,
    ProductId, StoredVector,
};
use crate::storage::Storage;
use crate::vector::FeatureVector;

#[derive(Debug, Clone)]
struct ImageRow {
    product_id: ProductId,
    owner_id: OwnerId,
    bytes: Vec<u8>,
    vector: FeatureVector,
}

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    products: BTreeMap<ProductId, Product>,
    images: BTreeMap<ImageId, ImageRow>,
    orders: Vec<Order>,
    details: Vec<OrderDetail>,
    audits: Vec<AuditEntry>,
    reject_images: bool,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// In-process storage with the same contract as the Postgres one.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("memory storage lock poisoned")))
    }

    /// Overwrites the stock of a product, as another seller device would.
    pub fn set_stock(&self, product_id: ProductId, count: i32) -> AppResult<()> {
        let mut tables = self.lock()?;
        let product = tables
            .products
            .get_mut(&product_id)
            .ok_or(AppError::NotFound)?;
        product.count = count;
        Ok(())
    }

    /// Makes every following `save_image` fail.
    pub fn reject_images(&self, reject: bool) -> AppResult<()> {
        self.lock()?.reject_images = reject;
        Ok(())
    }

    pub fn orders(&self) -> AppResult<Vec<Order>> {
        Ok(self.lock()?.orders.clone())
    }

    pub fn order_details(&self) -> AppResult<Vec<OrderDetail>> {
        Ok(self.lock()?.details.clone())
    }

    pub fn audits(&self) -> AppResult<Vec<AuditEntry>> {
        Ok(self.lock()?.audits.clone())
    }
}

impl Storage for MemoryStorage {
    async fn save_product(&self, draft: &ProductDraft) -> AppResult<ProductId> {
        let mut tables = self.lock()?;
        let id = tables.next_id();
        tables.products.insert(
            id,
            Product {
                id,
                owner_id: draft.owner_id,
                name: draft.name.clone(),
                description: draft.description.clone(),
                count: draft.count,
                purchase_price: draft.purchase_price,
                selling_price: draft.selling_price,
            },
        );
        Ok(id)
    }

    async fn save_image(
        &self,
        product_id: ProductId,
        owner_id: OwnerId,
        bytes: &[u8],
        vector: &FeatureVector,
    ) -> AppResult<ImageId> {
        let mut tables = self.lock()?;
        if tables.reject_images {
            return Err(AppError::ExternalService("image store unavailable".into()));
        }
        if !tables.products.contains_key(&product_id) {
            return Err(AppError::NotFound);
        }
        let id = tables.next_id();
        tables.images.insert(
            id,
            ImageRow {
                product_id,
                owner_id,
                bytes: bytes.to_vec(),
                vector: vector.clone(),
            },
        );
        Ok(id)
    }

    async fn products_by_owner(&self, owner_id: OwnerId) -> AppResult<Vec<Product>> {
        let tables = self.lock()?;
        Ok(tables
            .products
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn product_by_id(&self, product_id: ProductId) -> AppResult<Product> {
        let tables = self.lock()?;
        tables
            .products
            .get(&product_id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn update_field(&self, product_id: ProductId, update: &FieldUpdate) -> AppResult<()> {
        let mut tables = self.lock()?;
        let product = tables
            .products
            .get_mut(&product_id)
            .ok_or(AppError::NotFound)?;
        update.apply(product);
        Ok(())
    }

    async fn remove_product(&self, product_id: ProductId) -> AppResult<()> {
        let mut tables = self.lock()?;
        if tables.products.remove(&product_id).is_none() {
            return Err(AppError::NotFound);
        }
        tables.images.retain(|_, image| image.product_id != product_id);
        Ok(())
    }

    async fn vectors_by_owner(&self, owner_id: OwnerId) -> AppResult<Vec<StoredVector>> {
        let tables = self.lock()?;
        Ok(tables
            .images
            .iter()
            .filter(|(_, image)| image.owner_id == owner_id)
            .map(|(id, image)| StoredVector {
                product_id: image.product_id,
                image_id: *id,
                vector: image.vector.clone(),
            })
            .collect())
    }

    async fn image_ids_by_product(&self, product_id: ProductId) -> AppResult<Vec<ImageId>> {
        let tables = self.lock()?;
        Ok(tables
            .images
            .iter()
            .filter(|(_, image)| image.product_id == product_id)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn image_bytes(&self, image_id: ImageId) -> AppResult<Option<Vec<u8>>> {
        let tables = self.lock()?;
        Ok(tables.images.get(&image_id).map(|image| image.bytes.clone()))
    }

    async fn commit_order(&self, order: &NewOrder) -> AppResult<OrderId> {
        let mut tables = self.lock()?;
        if order.details.is_empty() {
            return Err(AppError::Validation("order has no lines".into()));
        }

        // stage every decrement before touching anything
        let mut remaining: BTreeMap<ProductId, i32> = BTreeMap::new();
        for detail in &order.details {
            let stock = match remaining.get(&detail.product_id) {
                Some(stock) => *stock,
                None => tables
                    .products
                    .get(&detail.product_id)
                    .map(|p| p.count)
                    .ok_or(AppError::CommitConflict(detail.product_id))?,
            };
            if detail.count <= 0 || stock < detail.count {
                return Err(AppError::CommitConflict(detail.product_id));
            }
            remaining.insert(detail.product_id, stock - detail.count);
        }

        for (product_id, stock) in remaining {
            if let Some(product) = tables.products.get_mut(&product_id) {
                product.count = stock;
            }
        }
        let order_id = tables.next_id();
        tables.orders.push(Order {
            id: order_id,
            buyer_id: order.buyer_id,
            amount: order.amount,
            pay_type: order.pay_type,
            phone: order.phone.clone(),
            created_at: Utc::now(),
        });
        for detail in &order.details {
            let id = tables.next_id();
            tables.details.push(OrderDetail {
                id,
                order_id,
                product_id: detail.product_id,
                unit_amount: detail.unit_amount,
                count: detail.count,
                discount: detail.discount,
                fact_sum: detail.fact_sum,
            });
        }
        Ok(order_id)
    }

    async fn audit(&self, entry: AuditEntry) -> AppResult<()> {
        self.lock()?.audits.push(entry);
        Ok(())
    }
}
