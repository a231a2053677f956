//! Persistence seam for products, images and orders.

use crate::audit::AuditEntry;
use crate::error::AppResult;
use crate::models::{
    FieldUpdate, ImageId, NewOrder, OrderId, OwnerId, Product, ProductDraft, ProductId,
    StoredVector,
};
use crate::vector::FeatureVector;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

/// Product catalog and order persistence.
///
/// Uses native async fn in traits (no async_trait macro).
pub trait Storage: Send + Sync + 'static {
    /// Persists the draft's product columns. Images are saved separately.
    fn save_product(
        &self,
        draft: &ProductDraft,
    ) -> impl std::future::Future<Output = AppResult<ProductId>> + Send;

    fn save_image(
        &self,
        product_id: ProductId,
        owner_id: OwnerId,
        bytes: &[u8],
        vector: &FeatureVector,
    ) -> impl std::future::Future<Output = AppResult<ImageId>> + Send;

    fn products_by_owner(
        &self,
        owner_id: OwnerId,
    ) -> impl std::future::Future<Output = AppResult<Vec<Product>>> + Send;

    /// Fails with `NotFound` when the product does not exist.
    fn product_by_id(
        &self,
        product_id: ProductId,
    ) -> impl std::future::Future<Output = AppResult<Product>> + Send;

    /// Fails with `NotFound` when no row was updated.
    fn update_field(
        &self,
        product_id: ProductId,
        update: &FieldUpdate,
    ) -> impl std::future::Future<Output = AppResult<()>> + Send;

    /// Removes the product together with its images.
    fn remove_product(
        &self,
        product_id: ProductId,
    ) -> impl std::future::Future<Output = AppResult<()>> + Send;

    fn vectors_by_owner(
        &self,
        owner_id: OwnerId,
    ) -> impl std::future::Future<Output = AppResult<Vec<StoredVector>>> + Send;

    fn image_ids_by_product(
        &self,
        product_id: ProductId,
    ) -> impl std::future::Future<Output = AppResult<Vec<ImageId>>> + Send;

    fn image_bytes(
        &self,
        image_id: ImageId,
    ) -> impl std::future::Future<Output = AppResult<Option<Vec<u8>>>> + Send;

    /// Inserts the order and its details and decrements stock, all or nothing.
    ///
    /// A line whose count exceeds the stock at commit time fails the whole
    /// order with `CommitConflict`.
    fn commit_order(
        &self,
        order: &NewOrder,
    ) -> impl std::future::Future<Output = AppResult<OrderId>> + Send;

    /// Writes an audit row. Called only once the audited change is stored, so
    /// a slow or failed write never undoes it.
    fn audit(&self, entry: AuditEntry) -> impl std::future::Future<Output = AppResult<()>> + Send;
}
