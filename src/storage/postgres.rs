use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};

use crate::{
    audit::{self, AuditEntry},
    db::{DbPool, OrmConn, create_orm_conn},
    entity::{
        Images, Products,
        images::{ActiveModel as ImageActive, Column as ImageCol},
        order_details::ActiveModel as DetailActive,
        orders::ActiveModel as OrderActive,
        products::{ActiveModel as ProductActive, Column as ProdCol, Model as ProductModel},
    },
    error::{AppError, AppResult},
    models::{
        FieldUpdate, ImageId, NewOrder, OrderId, OwnerId, Product, ProductDraft, ProductId,
        StoredVector,
    },
    storage::Storage,
    vector::FeatureVector,
};

/// PostgreSQL storage: SeaORM for entity work, the raw pool for audit rows.
#[derive(Clone)]
pub struct PgStorage {
    pool: DbPool,
    orm: OrmConn,
}

impl PgStorage {
    pub fn new(pool: DbPool) -> Self {
        let orm = create_orm_conn(&pool);
        Self { pool, orm }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn orm(&self) -> &OrmConn {
        &self.orm
    }
}

impl Storage for PgStorage {
    async fn save_product(&self, draft: &ProductDraft) -> AppResult<ProductId> {
        let product = ProductActive {
            id: NotSet,
            owner_id: Set(draft.owner_id),
            name: Set(draft.name.clone()),
            description: Set(draft.description.clone()),
            count: Set(draft.count),
            purchase_price: Set(draft.purchase_price),
            selling_price: Set(draft.selling_price),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(product.id)
    }

    async fn save_image(
        &self,
        product_id: ProductId,
        owner_id: OwnerId,
        bytes: &[u8],
        vector: &FeatureVector,
    ) -> AppResult<ImageId> {
        let image = ImageActive {
            id: NotSet,
            product_id: Set(product_id),
            owner_id: Set(owner_id),
            bytes: Set(bytes.to_vec()),
            vector: Set(vector.encode()),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(image.id)
    }

    async fn products_by_owner(&self, owner_id: OwnerId) -> AppResult<Vec<Product>> {
        let products = Products::find()
            .filter(ProdCol::OwnerId.eq(owner_id))
            .order_by_asc(ProdCol::Id)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect();
        Ok(products)
    }

    async fn product_by_id(&self, product_id: ProductId) -> AppResult<Product> {
        let product = Products::find_by_id(product_id).one(&self.orm).await?;
        match product {
            Some(p) => Ok(product_from_entity(p)),
            None => Err(AppError::NotFound),
        }
    }

    async fn update_field(&self, product_id: ProductId, update: &FieldUpdate) -> AppResult<()> {
        let query = Products::update_many().filter(ProdCol::Id.eq(product_id));
        let query = match update {
            FieldUpdate::Name(v) => query.col_expr(ProdCol::Name, Expr::value(v.clone())),
            FieldUpdate::Description(v) => {
                query.col_expr(ProdCol::Description, Expr::value(v.clone()))
            }
            FieldUpdate::Count(v) => query.col_expr(ProdCol::Count, Expr::value(*v)),
            FieldUpdate::PurchasePrice(v) => {
                query.col_expr(ProdCol::PurchasePrice, Expr::value(*v))
            }
            FieldUpdate::SellingPrice(v) => query.col_expr(ProdCol::SellingPrice, Expr::value(*v)),
        };
        let result = query.exec(&self.orm).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn remove_product(&self, product_id: ProductId) -> AppResult<()> {
        let txn = self.orm.begin().await?;
        Images::delete_many()
            .filter(ImageCol::ProductId.eq(product_id))
            .exec(&txn)
            .await?;
        let result = Products::delete_by_id(product_id).exec(&txn).await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Err(AppError::NotFound);
        }
        txn.commit().await?;
        Ok(())
    }

    async fn vectors_by_owner(&self, owner_id: OwnerId) -> AppResult<Vec<StoredVector>> {
        let rows: Vec<(i64, i64, String)> = Images::find()
            .select_only()
            .column(ImageCol::Id)
            .column(ImageCol::ProductId)
            .column(ImageCol::Vector)
            .filter(ImageCol::OwnerId.eq(owner_id))
            .order_by_asc(ImageCol::Id)
            .into_tuple()
            .all(&self.orm)
            .await?;

        rows.into_iter()
            .map(|(image_id, product_id, encoded)| {
                Ok(StoredVector {
                    product_id,
                    image_id,
                    vector: FeatureVector::decode(&encoded)?,
                })
            })
            .collect()
    }

    async fn image_ids_by_product(&self, product_id: ProductId) -> AppResult<Vec<ImageId>> {
        let ids: Vec<i64> = Images::find()
            .select_only()
            .column(ImageCol::Id)
            .filter(ImageCol::ProductId.eq(product_id))
            .order_by_asc(ImageCol::Id)
            .into_tuple()
            .all(&self.orm)
            .await?;
        Ok(ids)
    }

    async fn image_bytes(&self, image_id: ImageId) -> AppResult<Option<Vec<u8>>> {
        let bytes: Option<Vec<u8>> = Images::find_by_id(image_id)
            .select_only()
            .column(ImageCol::Bytes)
            .into_tuple()
            .one(&self.orm)
            .await?;
        Ok(bytes)
    }

    async fn commit_order(&self, order: &NewOrder) -> AppResult<OrderId> {
        if order.details.is_empty() {
            return Err(AppError::Validation("order has no lines".into()));
        }

        let txn = self.orm.begin().await?;

        let header = OrderActive {
            id: NotSet,
            buyer_id: Set(order.buyer_id),
            amount: Set(order.amount),
            pay_type: Set(order.pay_type.as_str().to_string()),
            phone: Set(order.phone.clone()),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;

        for detail in &order.details {
            DetailActive {
                id: NotSet,
                order_id: Set(header.id),
                product_id: Set(detail.product_id),
                unit_amount: Set(detail.unit_amount),
                count: Set(detail.count),
                discount: Set(detail.discount),
                fact_sum: Set(detail.fact_sum),
            }
            .insert(&txn)
            .await?;

            // decrement only while enough stock is left
            let result = Products::update_many()
                .col_expr(ProdCol::Count, Expr::col(ProdCol::Count).sub(detail.count))
                .filter(ProdCol::Id.eq(detail.product_id))
                .filter(ProdCol::Count.gte(detail.count))
                .exec(&txn)
                .await?;
            if result.rows_affected == 0 {
                txn.rollback().await?;
                tracing::warn!(
                    product_id = detail.product_id,
                    count = detail.count,
                    "order rolled back on insufficient stock"
                );
                return Err(AppError::CommitConflict(detail.product_id));
            }
        }

        txn.commit().await?;
        Ok(header.id)
    }

    async fn audit(&self, entry: AuditEntry) -> AppResult<()> {
        audit::log_audit(
            &self.pool,
            entry.owner_id,
            entry.action,
            Some(entry.resource),
            Some(entry.metadata),
        )
        .await
    }
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        owner_id: model.owner_id,
        name: model.name,
        description: model.description,
        count: model.count,
        purchase_price: model.purchase_price,
        selling_price: model.selling_price,
    }
}
