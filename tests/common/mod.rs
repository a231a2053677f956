#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rust_decimal::Decimal;
use vector_shop::{
    audit::AuditEntry,
    bot::{Bot, Deps},
    detector::DuplicateDetector,
    error::{AppError, AppResult},
    ingress::ChatEvent,
    models::{
        ChatId, FieldUpdate, ImageId, MessageId, NewOrder, OrderId, OwnerId, Product,
        ProductDraft, ProductId, StoredVector,
    },
    recognize::Recognizer,
    render::Reply,
    storage::{MemoryStorage, Storage},
    vector::FeatureVector,
};

pub const CHAT: ChatId = 500;
pub const SELLER: OwnerId = 42;
pub const FILE_BASE: &str = "http://files";

/// Recognizer answering from a table of file refs.
#[derive(Default)]
pub struct FakeRecognizer {
    vectors: Mutex<HashMap<String, Vec<f64>>>,
    delay: Option<Duration>,
}

impl FakeRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn with(self, file_ref: &str, components: Vec<f64>) -> Self {
        self.vectors
            .lock()
            .unwrap()
            .insert(format!("{FILE_BASE}/{file_ref}"), components);
        self
    }

    fn lookup(&self, url: &str) -> AppResult<FeatureVector> {
        let components = self
            .vectors
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::ExternalService(format!("no features for {url}")))?;
        FeatureVector::new(components)
    }
}

impl Recognizer for FakeRecognizer {
    async fn extract(&self, image_url: &str) -> AppResult<FeatureVector> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.lookup(image_url)
    }

    async fn fetch_image(&self, image_url: &str) -> AppResult<Vec<u8>> {
        Ok(image_url.as_bytes().to_vec())
    }
}

/// Memory storage with switchable slow audits and failing product lookups.
#[derive(Default)]
pub struct FlakyStorage {
    pub inner: MemoryStorage,
    audit_delay: Option<Duration>,
    fail_lookups: AtomicBool,
}

impl FlakyStorage {
    pub fn slow_audit(delay: Duration) -> Self {
        Self {
            audit_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }
}

impl Storage for FlakyStorage {
    async fn save_product(&self, draft: &ProductDraft) -> AppResult<ProductId> {
        self.inner.save_product(draft).await
    }

    async fn save_image(
        &self,
        product_id: ProductId,
        owner_id: OwnerId,
        bytes: &[u8],
        vector: &FeatureVector,
    ) -> AppResult<ImageId> {
        self.inner.save_image(product_id, owner_id, bytes, vector).await
    }

    async fn products_by_owner(&self, owner_id: OwnerId) -> AppResult<Vec<Product>> {
        self.inner.products_by_owner(owner_id).await
    }

    async fn product_by_id(&self, product_id: ProductId) -> AppResult<Product> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(AppError::ExternalService("database unavailable".into()));
        }
        self.inner.product_by_id(product_id).await
    }

    async fn update_field(&self, product_id: ProductId, update: &FieldUpdate) -> AppResult<()> {
        self.inner.update_field(product_id, update).await
    }

    async fn remove_product(&self, product_id: ProductId) -> AppResult<()> {
        self.inner.remove_product(product_id).await
    }

    async fn vectors_by_owner(&self, owner_id: OwnerId) -> AppResult<Vec<StoredVector>> {
        self.inner.vectors_by_owner(owner_id).await
    }

    async fn image_ids_by_product(&self, product_id: ProductId) -> AppResult<Vec<ImageId>> {
        self.inner.image_ids_by_product(product_id).await
    }

    async fn image_bytes(&self, image_id: ImageId) -> AppResult<Option<Vec<u8>>> {
        self.inner.image_bytes(image_id).await
    }

    async fn commit_order(&self, order: &NewOrder) -> AppResult<OrderId> {
        self.inner.commit_order(order).await
    }

    async fn audit(&self, entry: AuditEntry) -> AppResult<()> {
        if let Some(delay) = self.audit_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.audit(entry).await
    }
}

pub type TestBot = Bot<MemoryStorage, FakeRecognizer>;

pub fn bot(recognizer: FakeRecognizer) -> TestBot {
    bot_with(MemoryStorage::new(), recognizer)
}

pub fn bot_with<S: Storage>(storage: S, recognizer: FakeRecognizer) -> Bot<S, FakeRecognizer> {
    Bot::new(Deps {
        storage,
        recognizer,
        detector: DuplicateDetector::new(0.5),
        io_timeout: Duration::from_millis(100),
        file_base_url: FILE_BASE.to_string(),
    })
}

pub fn text(body: &str) -> ChatEvent {
    ChatEvent::Text {
        chat_id: CHAT,
        sender_id: SELLER,
        message_id: None,
        text: body.to_string(),
    }
}

pub fn photo(file_ref: &str) -> ChatEvent {
    ChatEvent::Photo {
        chat_id: CHAT,
        sender_id: SELLER,
        message_id: None,
        file_ref: file_ref.to_string(),
    }
}

pub fn press(payload: &str, message_id: Option<MessageId>) -> ChatEvent {
    ChatEvent::Action {
        chat_id: CHAT,
        sender_id: SELLER,
        message_id,
        action: payload.parse().unwrap(),
    }
}

pub fn money(raw: &str) -> Decimal {
    raw.parse().unwrap()
}

/// Stores a product with one photo directly, bypassing the conversation.
pub async fn seed_product<S: Storage>(
    bot: &Bot<S, FakeRecognizer>,
    name: &str,
    count: i32,
    price: &str,
    components: Vec<f64>,
) -> ProductId {
    let draft = ProductDraft {
        name: name.to_string(),
        description: format!("{name} description"),
        count,
        purchase_price: money("1.00"),
        selling_price: money(price),
        ..ProductDraft::new(SELLER)
    };
    let storage = bot.storage();
    let id = storage.save_product(&draft).await.unwrap();
    let vector = FeatureVector::new(components).unwrap();
    storage.save_image(id, SELLER, b"jpeg", &vector).await.unwrap();
    id
}

pub fn texts(replies: &[Reply]) -> Vec<&str> {
    replies
        .iter()
        .filter_map(|reply| match reply {
            Reply::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}
