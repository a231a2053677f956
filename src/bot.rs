//! Event entry point: one lane per chat, handlers run under the lane's lock.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::audit::AuditEntry;
use crate::cart::Cart;
use crate::detector::DuplicateDetector;
use crate::error::{AppError, AppResult};
use crate::ingress::ChatEvent;
use crate::models::ChatId;
use crate::recognize::Recognizer;
use crate::render::Reply;
use crate::services;
use crate::session::{ChatSession, Step};
use crate::storage::Storage;

/// Everything the chat remembers between events.
#[derive(Debug, Default)]
pub struct ChatState {
    pub session: Option<ChatSession>,
    pub cart: Option<Cart>,
}

impl ChatState {
    pub fn step(&self) -> Option<Step> {
        self.session.as_ref().map(|s| s.step)
    }
}

pub struct Deps<S, R> {
    pub storage: S,
    pub recognizer: R,
    pub detector: DuplicateDetector,
    pub io_timeout: Duration,
    pub file_base_url: String,
}

impl<S, R> Deps<S, R> {
    /// Runs one storage or recognizer call under the I/O timeout.
    pub async fn io<T>(
        &self,
        what: &'static str,
        call: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        match tokio::time::timeout(self.io_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(what)),
        }
    }

    pub fn file_url(&self, file_ref: &str) -> String {
        format!(
            "{}/{}",
            self.file_base_url.trim_end_matches('/'),
            file_ref.trim_start_matches('/')
        )
    }
}

impl<S: Storage, R> Deps<S, R> {
    /// Writes an audit row for a change that is already stored. Never fails the caller.
    pub async fn audit(&self, entry: AuditEntry) {
        let action = entry.action;
        match tokio::time::timeout(self.io_timeout, self.storage.audit(entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, action, "audit log failed"),
            Err(_) => tracing::warn!(action, "audit log timed out"),
        }
    }
}

pub struct Bot<S, R> {
    deps: Deps<S, R>,
    lanes: DashMap<ChatId, Arc<Mutex<ChatState>>>,
}

impl<S: Storage, R: Recognizer> Bot<S, R> {
    pub fn new(deps: Deps<S, R>) -> Self {
        Self {
            deps,
            lanes: DashMap::new(),
        }
    }

    pub fn deps(&self) -> &Deps<S, R> {
        &self.deps
    }

    pub fn storage(&self) -> &S {
        &self.deps.storage
    }

    // Lanes are never pruned, so two events of one chat always share a mutex.
    fn lane(&self, chat_id: ChatId) -> Arc<Mutex<ChatState>> {
        self.lanes.entry(chat_id).or_default().value().clone()
    }

    /// Handles one event to completion. Failures become chat replies.
    pub async fn handle(&self, event: ChatEvent) -> Vec<Reply> {
        let chat_id = event.chat_id();
        let lane = self.lane(chat_id);
        let mut state = lane.lock().await;

        match services::dispatch(&self.deps, &mut state, &event).await {
            Ok(replies) => replies,
            Err(err) => {
                tracing::warn!(chat_id = %chat_id, error = %err, "event failed");
                services::failure_replies(&err, &state)
            }
        }
    }

    pub async fn cart(&self, chat_id: ChatId) -> Option<Cart> {
        let lane = self.lane(chat_id);
        let state = lane.lock().await;
        state.cart.clone()
    }

    pub async fn step(&self, chat_id: ChatId) -> Option<Step> {
        let lane = self.lane(chat_id);
        let state = lane.lock().await;
        state.step()
    }
}
