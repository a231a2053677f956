//! Per-chat cart with an incrementally maintained, exact running total.
//!
//! Each mutation computes a signed delta and adds exactly that delta to the
//! cart amount. Unit prices are rounded to cents before they are multiplied,
//! so the amount always equals the sum of `unit_price * count` over lines.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::{ChatId, MessageId, Product, ProductId};

/// Currency precision, in decimal places.
pub const MONEY_SCALE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub store_count: i32,
    pub count: i32,
    pub store_price: Decimal,
    pub unit_price: Decimal,
    pub discount: i16,
    pub message_id: Option<MessageId>,
}

impl CartItem {
    fn from_product(product: &Product) -> Self {
        let price = round_money(product.selling_price);
        Self {
            product_id: product.id,
            name: product.name.clone(),
            store_count: product.count.max(0),
            count: 0,
            store_price: price,
            unit_price: price,
            discount: 0,
            message_id: None,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.count)
    }
}

/// Result of a ledger operation: the amount change to display and the line after it.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChange {
    pub delta: Decimal,
    pub line: CartItem,
}

/// Quantity input for `SetCount`: `+N` and `-N` adjust, `N` sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountToken {
    Relative(i64),
    Absolute(i64),
}

impl FromStr for CountToken {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let invalid = || AppError::Validation(format!("'{input}' is not a quantity"));
        let (relative, sign, digits) = match input.chars().next() {
            Some('+') => (true, 1, &input[1..]),
            Some('-') => (true, -1, &input[1..]),
            Some(_) => (false, 1, input),
            None => return Err(invalid()),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let value: i64 = digits.parse().map_err(|_| invalid())?;
        Ok(if relative {
            CountToken::Relative(sign * value)
        } else {
            CountToken::Absolute(value)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cart {
    chat_id: ChatId,
    items: BTreeMap<ProductId, CartItem>,
    amount: Decimal,
}

impl Cart {
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            items: BTreeMap::new(),
            amount: Decimal::ZERO,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.get(&product_id)
    }

    pub fn lines(&self) -> impl Iterator<Item = &CartItem> {
        self.items.values()
    }

    /// True when no line has a positive count.
    pub fn is_empty(&self) -> bool {
        self.items.values().all(|item| item.count == 0)
    }

    /// Inserts a zero-count line for `product`, or refreshes the store count of
    /// an existing line. A line holding more than the refreshed stock is cut
    /// down to it and the amount follows.
    pub fn stock_line(&mut self, product: &Product) -> AppResult<LineChange> {
        let store_count = product.count.max(0);
        let line = self
            .items
            .entry(product.id)
            .or_insert_with(|| CartItem::from_product(product));
        line.store_count = store_count;
        let mut delta = Decimal::ZERO;
        if line.count > store_count {
            delta = line.unit_price * Decimal::from(store_count - line.count);
            line.count = store_count;
        }
        self.settle(product.id, delta)
    }

    pub fn set_message(&mut self, product_id: ProductId, message_id: MessageId) -> AppResult<()> {
        self.item_mut(product_id)?.message_id = Some(message_id);
        Ok(())
    }

    pub fn add_one(&mut self, product_id: ProductId) -> AppResult<LineChange> {
        let item = self.item_mut(product_id)?;
        let delta = if item.count < item.store_count {
            item.count += 1;
            item.unit_price
        } else {
            Decimal::ZERO
        };
        self.settle(product_id, delta)
    }

    pub fn reduce_one(&mut self, product_id: ProductId) -> AppResult<LineChange> {
        let item = self.item_mut(product_id)?;
        let delta = if item.count > 0 {
            item.count -= 1;
            -item.unit_price
        } else {
            Decimal::ZERO
        };
        self.settle(product_id, delta)
    }

    pub fn set_count(&mut self, product_id: ProductId, token: CountToken) -> AppResult<LineChange> {
        let item = self.item_mut(product_id)?;
        let current = i64::from(item.count);
        let target = match token {
            CountToken::Relative(n) => current.checked_add(n),
            CountToken::Absolute(n) => Some(n),
        };
        let available = i64::from(item.store_count);
        let target = match target {
            Some(t) if (0..=available).contains(&t) => t,
            Some(t) => {
                return Err(AppError::OutOfRange {
                    requested: t,
                    available,
                });
            }
            None => {
                return Err(AppError::OutOfRange {
                    requested: i64::MAX,
                    available,
                });
            }
        };
        let change = target - current;
        // target is within 0..=store_count, which fits in i32
        item.count = target as i32;
        let delta = item.unit_price * Decimal::from(change);
        self.settle(product_id, delta)
    }

    /// Sets the line discount. The unit price is always derived from the store price.
    pub fn apply_discount(&mut self, product_id: ProductId, percent: i64) -> AppResult<LineChange> {
        if !(0..=100).contains(&percent) {
            return Err(AppError::InvalidDiscount(percent));
        }
        let item = self.item_mut(product_id)?;
        let old_total = item.line_total();
        let factor = Decimal::ONE - Decimal::new(percent, 2);
        item.unit_price = round_money(item.store_price * factor);
        item.discount = percent as i16;
        let delta = item.line_total() - old_total;
        self.settle(product_id, delta)
    }

    pub fn remove_line(&mut self, product_id: ProductId) -> AppResult<LineChange> {
        let item = self.item_mut(product_id)?;
        let delta = -item.line_total();
        item.count = 0;
        self.settle(product_id, delta)
    }

    fn item_mut(&mut self, product_id: ProductId) -> AppResult<&mut CartItem> {
        self.items
            .get_mut(&product_id)
            .ok_or(AppError::LineNotFound(product_id))
    }

    fn settle(&mut self, product_id: ProductId, delta: Decimal) -> AppResult<LineChange> {
        let line = self
            .items
            .get(&product_id)
            .cloned()
            .ok_or(AppError::LineNotFound(product_id))?;
        self.amount += delta;
        Ok(LineChange { delta, line })
    }
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
