//! Per-chat conversation state: which step the chat is on and what it has entered so far.
//!
//! Everything here is pure; the services perform the I/O around these transitions.

use std::collections::BTreeSet;

use rust_decimal::Decimal;

use crate::cart::round_money;
use crate::error::{AppError, AppResult};
use crate::models::{ChatId, FieldUpdate, ImageRecord, MessageId, OwnerId, ProductDraft, ProductId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EditField {
    Name,
    Count,
    PurchasePrice,
    SellingPrice,
}

impl EditField {
    /// Order in which selected fields are asked for.
    pub const ORDER: [EditField; 4] = [
        EditField::Name,
        EditField::Count,
        EditField::PurchasePrice,
        EditField::SellingPrice,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EditField::Name => "Name",
            EditField::Count => "Count",
            EditField::PurchasePrice => "Purchase price",
            EditField::SellingPrice => "Selling price",
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            EditField::Name => "Enter the new name:",
            EditField::Count => "Enter the new count:",
            EditField::PurchasePrice => "Enter the new purchase price:",
            EditField::SellingPrice => "Enter the new selling price:",
        }
    }

    pub fn parse(&self, input: &str) -> AppResult<FieldUpdate> {
        Ok(match self {
            EditField::Name => FieldUpdate::Name(parse_text(input)?),
            EditField::Count => FieldUpdate::Count(parse_count(input)?),
            EditField::PurchasePrice => FieldUpdate::PurchasePrice(parse_price(input)?),
            EditField::SellingPrice => FieldUpdate::SellingPrice(parse_price(input)?),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    WaitingPhoto,
    WaitingName,
    WaitingDescription,
    WaitingCount,
    WaitingPurchasePrice,
    WaitingSellingPrice,
    SelectingEditFields,
    WaitingEdit(EditField),
    WaitingCartCount(ProductId),
    WaitingDiscount(ProductId),
}

impl Step {
    pub fn prompt(&self) -> &'static str {
        match self {
            Step::WaitingPhoto => "Send a photo of the product.",
            Step::WaitingName => "Enter the product name:",
            Step::WaitingDescription => "Enter the product description:",
            Step::WaitingCount => "Enter the product count:",
            Step::WaitingPurchasePrice => "Enter the purchase price:",
            Step::WaitingSellingPrice => "Enter the selling price:",
            Step::SelectingEditFields => "Select the fields to change and press Continue.",
            Step::WaitingEdit(field) => field.prompt(),
            Step::WaitingCartCount(_) => "Enter the quantity (N, +N or -N):",
            Step::WaitingDiscount(_) => "Enter the discount, 0 to 100:",
        }
    }

    pub fn is_add_product(&self) -> bool {
        matches!(
            self,
            Step::WaitingPhoto
                | Step::WaitingName
                | Step::WaitingDescription
                | Step::WaitingCount
                | Step::WaitingPurchasePrice
                | Step::WaitingSellingPrice
        )
    }

    pub fn is_edit_product(&self) -> bool {
        matches!(self, Step::SelectingEditFields | Step::WaitingEdit(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    pub chat_id: ChatId,
    pub step: Step,
    pub draft: Option<ProductDraft>,
    pub target: Option<ProductId>,
    pub selected: BTreeSet<EditField>,
    pub prompt_message: Option<MessageId>,
}

impl ChatSession {
    fn blank(chat_id: ChatId, step: Step) -> Self {
        Self {
            chat_id,
            step,
            draft: None,
            target: None,
            selected: BTreeSet::new(),
            prompt_message: None,
        }
    }

    pub fn add_product(chat_id: ChatId, owner_id: OwnerId) -> Self {
        let mut session = Self::blank(chat_id, Step::WaitingPhoto);
        session.draft = Some(ProductDraft::new(owner_id));
        session
    }

    pub fn edit_product(
        chat_id: ChatId,
        product_id: ProductId,
        prompt_message: Option<MessageId>,
    ) -> Self {
        let mut session = Self::blank(chat_id, Step::SelectingEditFields);
        session.target = Some(product_id);
        session.prompt_message = prompt_message;
        session
    }

    pub fn cart_input(chat_id: ChatId, step: Step) -> Self {
        Self::blank(chat_id, step)
    }

    /// Attaches the photo and moves on to the name.
    pub fn attach_image(&mut self, image: ImageRecord) -> AppResult<Step> {
        self.expect_step(Step::WaitingPhoto)?;
        self.draft_mut()?.images.push(image);
        self.step = Step::WaitingName;
        Ok(self.step)
    }

    /// Applies text to one of the intermediate add-product steps.
    ///
    /// The selling price completes the draft and is handled by `complete_draft`.
    pub fn fill_draft(&mut self, input: &str) -> AppResult<Step> {
        let next = match self.step {
            Step::WaitingName => {
                let name = parse_text(input)?;
                self.draft_mut()?.name = name;
                Step::WaitingDescription
            }
            Step::WaitingDescription => {
                let description = parse_text(input)?;
                self.draft_mut()?.description = description;
                Step::WaitingCount
            }
            Step::WaitingCount => {
                let count = parse_count(input)?;
                self.draft_mut()?.count = count;
                Step::WaitingPurchasePrice
            }
            Step::WaitingPurchasePrice => {
                let price = parse_price(input)?;
                self.draft_mut()?.purchase_price = price;
                Step::WaitingSellingPrice
            }
            Step::WaitingPhoto => {
                return Err(AppError::Validation("a photo is expected".into()));
            }
            other => {
                return Err(AppError::Validation(format!(
                    "{other:?} does not take product details"
                )));
            }
        };
        self.step = next;
        Ok(next)
    }

    /// Returns the finished draft without changing the session, so a failed
    /// save leaves the chat on the selling price step.
    pub fn complete_draft(&self, input: &str) -> AppResult<ProductDraft> {
        self.expect_step(Step::WaitingSellingPrice)?;
        let mut draft = self
            .draft
            .clone()
            .ok_or_else(|| AppError::Validation("no product draft".into()))?;
        draft.selling_price = parse_price(input)?;
        Ok(draft)
    }

    pub fn toggle(&mut self, field: EditField) -> AppResult<()> {
        self.expect_step(Step::SelectingEditFields)?;
        if !self.selected.remove(&field) {
            self.selected.insert(field);
        }
        Ok(())
    }

    /// First selected field in asking order.
    pub fn next_edit_field(&self) -> Option<EditField> {
        EditField::ORDER
            .into_iter()
            .find(|field| self.selected.contains(field))
    }

    /// Moves to the next selected field, or returns `None` when all are done.
    pub fn advance_edit(&mut self) -> Option<EditField> {
        let next = self.next_edit_field()?;
        self.step = Step::WaitingEdit(next);
        Some(next)
    }

    /// Marks the field currently asked for as done.
    pub fn finish_edit_field(&mut self) -> AppResult<EditField> {
        match self.step {
            Step::WaitingEdit(field) => {
                self.selected.remove(&field);
                Ok(field)
            }
            other => Err(AppError::Validation(format!(
                "{other:?} is not an edit step"
            ))),
        }
    }

    fn expect_step(&self, step: Step) -> AppResult<()> {
        if self.step == step {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "expected {step:?}, chat is on {:?}",
                self.step
            )))
        }
    }

    fn draft_mut(&mut self) -> AppResult<&mut ProductDraft> {
        self.draft
            .as_mut()
            .ok_or_else(|| AppError::Validation("no product draft".into()))
    }
}

pub fn parse_text(input: &str) -> AppResult<String> {
    let value = input.trim();
    if value.is_empty() {
        return Err(AppError::Validation("text must not be empty".into()));
    }
    Ok(value.to_string())
}

pub fn parse_count(input: &str) -> AppResult<i32> {
    let value: i32 = input
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("'{}' is not a whole number", input.trim())))?;
    if value < 0 {
        return Err(AppError::Validation("count must not be negative".into()));
    }
    Ok(value)
}

/// Accepts `12`, `12.5` and `12,50`; rounds to cents.
pub fn parse_price(input: &str) -> AppResult<Decimal> {
    let normalized = input.trim().replace(',', ".");
    let value: Decimal = normalized
        .parse()
        .map_err(|_| AppError::Validation(format!("'{}' is not a price", input.trim())))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AppError::Validation("price must not be negative".into()));
    }
    Ok(round_money(value))
}
