//! Inbound chat events, parsed once at the edge.
//!
//! Button payloads follow the `verb` or `verb_<id>` convention. They are
//! turned into an [`Action`] here and never re-parsed downstream.

use std::fmt;
use std::str::FromStr;

use crate::dto::events::{InboundEvent, InboundKind};
use crate::error::{AppError, AppResult};
use crate::models::{ChatId, MessageId, OwnerId, PayType, ProductId};
use crate::session::EditField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionVerb {
    AddProduct,
    List,
    EditProduct,
    ToggleEditField(EditField),
    ConfirmEdit,
    ConfirmDelete,
    Delete,
    ShowActions,
    AddToCart,
    ReduceInCart,
    EditCountInCart,
    DiscountInCart,
    RemoveFromCart,
    Pay(PayType),
    /// Inert button shown once an edit or delete is finished.
    Done,
}

impl ActionVerb {
    const ALL: [ActionVerb; 19] = [
        ActionVerb::AddProduct,
        ActionVerb::List,
        ActionVerb::EditProduct,
        ActionVerb::ToggleEditField(EditField::Name),
        ActionVerb::ToggleEditField(EditField::Count),
        ActionVerb::ToggleEditField(EditField::PurchasePrice),
        ActionVerb::ToggleEditField(EditField::SellingPrice),
        ActionVerb::ConfirmEdit,
        ActionVerb::ConfirmDelete,
        ActionVerb::Delete,
        ActionVerb::ShowActions,
        ActionVerb::AddToCart,
        ActionVerb::ReduceInCart,
        ActionVerb::EditCountInCart,
        ActionVerb::DiscountInCart,
        ActionVerb::RemoveFromCart,
        ActionVerb::Pay(PayType::Cash),
        ActionVerb::Pay(PayType::Kaspi),
        ActionVerb::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionVerb::AddProduct => "add_product",
            ActionVerb::List => "list",
            ActionVerb::EditProduct => "edit_product",
            ActionVerb::ToggleEditField(EditField::Name) => "edit_product_name",
            ActionVerb::ToggleEditField(EditField::Count) => "edit_product_count",
            ActionVerb::ToggleEditField(EditField::PurchasePrice) => "edit_product_purchase",
            ActionVerb::ToggleEditField(EditField::SellingPrice) => "edit_product_selling",
            ActionVerb::ConfirmEdit => "confirm_edit_product",
            ActionVerb::ConfirmDelete => "confirm_del_product",
            ActionVerb::Delete => "del_product",
            ActionVerb::ShowActions => "actions_product",
            ActionVerb::AddToCart => "add_item_to_cart",
            ActionVerb::ReduceInCart => "reduce_item_in_cart",
            ActionVerb::EditCountInCart => "edit_count_item_in_cart",
            ActionVerb::DiscountInCart => "discount_item_in_cart",
            ActionVerb::RemoveFromCart => "remove_item_from_cart",
            ActionVerb::Pay(PayType::Cash) => "pay_type_cash",
            ActionVerb::Pay(PayType::Kaspi) => "pay_type_kaspi",
            ActionVerb::Done => "done",
        }
    }

    pub fn needs_target(&self) -> bool {
        matches!(
            self,
            ActionVerb::EditProduct
                | ActionVerb::ConfirmDelete
                | ActionVerb::Delete
                | ActionVerb::ShowActions
                | ActionVerb::AddToCart
                | ActionVerb::ReduceInCart
                | ActionVerb::EditCountInCart
                | ActionVerb::DiscountInCart
                | ActionVerb::RemoveFromCart
        )
    }
}

impl FromStr for ActionVerb {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|verb| verb.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("unknown action '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub verb: ActionVerb,
    pub target: Option<ProductId>,
}

impl Action {
    pub fn new(verb: ActionVerb) -> Self {
        Self { verb, target: None }
    }

    pub fn on(verb: ActionVerb, target: ProductId) -> Self {
        Self {
            verb,
            target: Some(target),
        }
    }

    /// The target id; every verb that needs one was checked at parse time.
    pub fn product_id(&self) -> AppResult<ProductId> {
        self.target.ok_or_else(|| {
            AppError::Validation(format!("action '{}' needs a product", self.verb.as_str()))
        })
    }

    pub fn payload(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            Some(id) => write!(f, "{}_{}", self.verb.as_str(), id),
            None => f.write_str(self.verb.as_str()),
        }
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = s.trim();
        let split = payload.rsplit_once('_').and_then(|(verb, suffix)| {
            let is_id = !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit());
            if is_id {
                suffix.parse::<ProductId>().ok().map(|id| (verb, id))
            } else {
                None
            }
        });
        let action = match split {
            Some((verb, id)) => Action::on(verb.parse()?, id),
            None => Action::new(payload.parse()?),
        };
        if action.verb.needs_target() != action.target.is_some() {
            return Err(AppError::Validation(format!(
                "malformed action payload '{payload}'"
            )));
        }
        Ok(action)
    }
}

/// Reply-keyboard commands recognised in free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Start,
    AddProduct,
    Sale,
    Menu,
    Checkout,
    Cancel,
    CartSummary,
}

impl MenuCommand {
    pub const CART_PREFIX: &'static str = "🛍";

    pub fn label(&self) -> &'static str {
        match self {
            MenuCommand::Start => "/start",
            MenuCommand::AddProduct => "Add product",
            MenuCommand::Sale => "Sale",
            MenuCommand::Menu => "Menu",
            MenuCommand::Checkout => "Checkout",
            MenuCommand::Cancel => "Cancel",
            MenuCommand::CartSummary => Self::CART_PREFIX,
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.starts_with(Self::CART_PREFIX) {
            return Some(MenuCommand::CartSummary);
        }
        [
            MenuCommand::Start,
            MenuCommand::AddProduct,
            MenuCommand::Sale,
            MenuCommand::Menu,
            MenuCommand::Checkout,
            MenuCommand::Cancel,
        ]
        .into_iter()
        .find(|command| command.label().eq_ignore_ascii_case(text))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Text {
        chat_id: ChatId,
        sender_id: OwnerId,
        message_id: Option<MessageId>,
        text: String,
    },
    Photo {
        chat_id: ChatId,
        sender_id: OwnerId,
        message_id: Option<MessageId>,
        file_ref: String,
    },
    Action {
        chat_id: ChatId,
        sender_id: OwnerId,
        message_id: Option<MessageId>,
        action: Action,
    },
}

impl ChatEvent {
    pub fn chat_id(&self) -> ChatId {
        match self {
            ChatEvent::Text { chat_id, .. }
            | ChatEvent::Photo { chat_id, .. }
            | ChatEvent::Action { chat_id, .. } => *chat_id,
        }
    }

    pub fn sender_id(&self) -> OwnerId {
        match self {
            ChatEvent::Text { sender_id, .. }
            | ChatEvent::Photo { sender_id, .. }
            | ChatEvent::Action { sender_id, .. } => *sender_id,
        }
    }

    pub fn message_id(&self) -> Option<MessageId> {
        match self {
            ChatEvent::Text { message_id, .. }
            | ChatEvent::Photo { message_id, .. }
            | ChatEvent::Action { message_id, .. } => *message_id,
        }
    }
}

impl TryFrom<InboundEvent> for ChatEvent {
    type Error = AppError;

    fn try_from(event: InboundEvent) -> Result<Self, Self::Error> {
        let InboundEvent {
            chat_id,
            sender_id,
            message_id,
            kind,
        } = event;
        Ok(match kind {
            InboundKind::Text { text } => ChatEvent::Text {
                chat_id,
                sender_id,
                message_id,
                text,
            },
            InboundKind::Photo { file_ref } => {
                if file_ref.trim().is_empty() {
                    return Err(AppError::Validation("photo without a file reference".into()));
                }
                ChatEvent::Photo {
                    chat_id,
                    sender_id,
                    message_id,
                    file_ref,
                }
            }
            InboundKind::Action { payload } => ChatEvent::Action {
                chat_id,
                sender_id,
                message_id,
                action: payload.parse()?,
            },
        })
    }
}
