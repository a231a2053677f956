use std::sync::Arc;

use crate::bot::Bot;
use crate::recognize::HttpRecognizer;
use crate::storage::PgStorage;

pub type ShopBot = Bot<PgStorage, HttpRecognizer>;

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<ShopBot>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(bot: ShopBot, jwt_secret: &str) -> Self {
        Self {
            bot: Arc::new(bot),
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}
