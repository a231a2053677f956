use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use vector_shop::{
    audit::AuditEntry,
    db::{create_pool, run_migrations},
    entity::{AuditLogs, OrderDetails, Orders, audit_logs, order_details, orders},
    error::AppError,
    models::{FieldUpdate, NewOrder, NewOrderDetail, OwnerId, PayType, ProductDraft, ProductId},
    storage::{PgStorage, Storage},
    vector::FeatureVector,
};

// Storage flows against a live database: product lifecycle and atomic order commit.
async fn setup() -> anyhow::Result<Option<PgStorage>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run storage tests.");
            return Ok(None);
        }
    };
    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    Ok(Some(PgStorage::new(pool)))
}

// Each test works under its own seller so runs never see each other's rows.
fn unique_owner() -> OwnerId {
    let low = uuid::Uuid::new_v4().as_u128() as u64;
    (low >> 2) as OwnerId
}

async fn seed(
    storage: &PgStorage,
    owner: OwnerId,
    name: &str,
    count: i32,
    price: &str,
) -> anyhow::Result<ProductId> {
    let draft = ProductDraft {
        name: name.to_string(),
        description: "seeded".to_string(),
        count,
        purchase_price: "1.00".parse()?,
        selling_price: price.parse()?,
        ..ProductDraft::new(owner)
    };
    Ok(storage.save_product(&draft).await?)
}

fn line(product_id: ProductId, count: i32, unit: &str) -> NewOrderDetail {
    let unit_amount: Decimal = unit.parse().unwrap();
    NewOrderDetail {
        product_id,
        unit_amount,
        count,
        discount: 0,
        fact_sum: unit_amount * Decimal::from(count),
    }
}

#[tokio::test]
async fn product_lifecycle_with_images() -> anyhow::Result<()> {
    let Some(storage) = setup().await? else {
        return Ok(());
    };
    let owner = unique_owner();

    let id = seed(&storage, owner, "Mug", 4, "150").await?;
    let vector = FeatureVector::new(vec![0.25, -1.0, 3.5])?;
    let image = storage.save_image(id, owner, b"jpeg-bytes", &vector).await?;

    let stored = storage.vectors_by_owner(owner).await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].image_id, image);
    assert_eq!(stored[0].product_id, id);
    assert_eq!(stored[0].vector, vector);
    assert_eq!(
        storage.image_bytes(image).await?,
        Some(b"jpeg-bytes".to_vec())
    );

    storage
        .update_field(id, &FieldUpdate::SellingPrice("175.50".parse()?))
        .await?;
    let product = storage.product_by_id(id).await?;
    assert_eq!(product.selling_price, "175.50".parse::<Decimal>()?);
    assert_eq!(storage.products_by_owner(owner).await?.len(), 1);

    storage.remove_product(id).await?;
    assert!(matches!(
        storage.product_by_id(id).await,
        Err(AppError::NotFound)
    ));
    assert!(storage.vectors_by_owner(owner).await?.is_empty());
    assert!(matches!(
        storage.remove_product(id).await,
        Err(AppError::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn order_commit_decrements_stock_and_audit_row_is_stored() -> anyhow::Result<()> {
    let Some(storage) = setup().await? else {
        return Ok(());
    };
    let owner = unique_owner();
    let mug = seed(&storage, owner, "Mug", 5, "150").await?;
    let plate = seed(&storage, owner, "Plate", 2, "40").await?;

    let order_id = storage
        .commit_order(&NewOrder {
            buyer_id: owner,
            amount: "340.00".parse()?,
            pay_type: PayType::Cash,
            phone: None,
            details: vec![line(mug, 2, "150"), line(plate, 1, "40")],
        })
        .await?;

    assert_eq!(storage.product_by_id(mug).await?.count, 3);
    assert_eq!(storage.product_by_id(plate).await?.count, 1);

    let header = Orders::find_by_id(order_id)
        .one(storage.orm())
        .await?
        .expect("order header");
    assert_eq!(header.pay_type, "cash");
    assert_eq!(header.amount, "340.00".parse::<Decimal>()?);
    let details = OrderDetails::find()
        .filter(order_details::Column::OrderId.eq(order_id))
        .count(storage.orm())
        .await?;
    assert_eq!(details, 2);

    let before_audit = AuditLogs::find()
        .filter(audit_logs::Column::OwnerId.eq(owner))
        .count(storage.orm())
        .await?;
    assert_eq!(before_audit, 0);
    storage
        .audit(AuditEntry::order_committed(owner, order_id, header.amount, 2))
        .await?;
    let audited = AuditLogs::find()
        .filter(audit_logs::Column::OwnerId.eq(owner))
        .filter(audit_logs::Column::Action.eq("order_committed"))
        .count(storage.orm())
        .await?;
    assert_eq!(audited, 1);
    Ok(())
}

#[tokio::test]
async fn order_commit_is_all_or_nothing() -> anyhow::Result<()> {
    let Some(storage) = setup().await? else {
        return Ok(());
    };
    let owner = unique_owner();
    let a = seed(&storage, owner, "A", 5, "10").await?;
    let b = seed(&storage, owner, "B", 1, "20").await?;
    let c = seed(&storage, owner, "C", 5, "30").await?;

    let result = storage
        .commit_order(&NewOrder {
            buyer_id: owner,
            amount: "100.00".parse()?,
            pay_type: PayType::Kaspi,
            phone: None,
            details: vec![line(a, 1, "10"), line(b, 3, "20"), line(c, 1, "30")],
        })
        .await;

    assert!(matches!(result, Err(AppError::CommitConflict(id)) if id == b));
    let headers = Orders::find()
        .filter(orders::Column::BuyerId.eq(owner))
        .count(storage.orm())
        .await?;
    assert_eq!(headers, 0);
    assert_eq!(storage.product_by_id(a).await?.count, 5);
    assert_eq!(storage.product_by_id(b).await?.count, 1);
    assert_eq!(storage.product_by_id(c).await?.count, 5);
    Ok(())
}
