//! Render requests sent back to the chat gateway.
//!
//! The gateway owns layout; these types only say what to show and which
//! action payload each button carries.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::cart::{CartItem, round_money};
use crate::ingress::{Action, ActionVerb, MenuCommand};
use crate::models::{ImageId, MessageId, PayType, Product, ProductId};
use crate::session::EditField;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            payload: action.payload(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Keyboard {
    /// Persistent reply keyboard; pressing a key sends its label as text.
    Menu { rows: Vec<Vec<String>> },
    /// Buttons attached to one message.
    Inline { rows: Vec<Vec<Button>> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Text {
        text: String,
        keyboard: Option<Keyboard>,
    },
    Photo {
        image_id: ImageId,
        caption: Option<String>,
    },
    EditControls {
        message_id: MessageId,
        keyboard: Keyboard,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Reply::Text {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    pub fn photo(image_id: ImageId) -> Self {
        Reply::Photo {
            image_id,
            caption: None,
        }
    }

    /// Replaces the buttons of `message_id`, or sends them under `fallback`
    /// when the gateway did not say which message was pressed.
    pub fn controls(message_id: Option<MessageId>, fallback: &str, keyboard: Keyboard) -> Self {
        match message_id {
            Some(message_id) => Reply::EditControls {
                message_id,
                keyboard,
            },
            None => Reply::with_keyboard(fallback, keyboard),
        }
    }
}

pub fn money(value: Decimal) -> String {
    format!("{:.2}", round_money(value))
}

/// `+270.00`, `-45.00`, `0.00`.
pub fn signed_amount(delta: Decimal) -> String {
    if delta > Decimal::ZERO {
        format!("+{}", money(delta))
    } else {
        money(delta)
    }
}

pub fn product_card(product: &Product) -> String {
    format!(
        "🛒 {}\n📦 In stock: {}\n💰 Selling price: {}",
        product.name,
        product.count,
        money(product.selling_price)
    )
}

pub fn main_menu() -> Keyboard {
    Keyboard::Menu {
        rows: vec![
            vec![
                MenuCommand::AddProduct.label().to_string(),
                MenuCommand::Sale.label().to_string(),
            ],
            vec![MenuCommand::Menu.label().to_string()],
        ],
    }
}

/// Reply keyboard shown while a sale is in progress.
pub fn selling_menu(amount: Decimal) -> Keyboard {
    Keyboard::Menu {
        rows: vec![
            vec![format!("{} {}", MenuCommand::CART_PREFIX, money(amount))],
            vec![
                MenuCommand::Cancel.label().to_string(),
                MenuCommand::Checkout.label().to_string(),
            ],
        ],
    }
}

pub fn catalog_menu() -> Keyboard {
    Keyboard::Inline {
        rows: vec![
            vec![Button::new("📋 List products", Action::new(ActionVerb::List))],
            vec![Button::new("➕ Add product", Action::new(ActionVerb::AddProduct))],
        ],
    }
}

pub fn add_product_offer() -> Keyboard {
    Keyboard::Inline {
        rows: vec![vec![Button::new(
            "➕ Add product",
            Action::new(ActionVerb::AddProduct),
        )]],
    }
}

pub fn product_actions(product_id: ProductId) -> Keyboard {
    Keyboard::Inline {
        rows: vec![vec![
            Button::new("✏️ Edit", Action::on(ActionVerb::EditProduct, product_id)),
            Button::new("Delete ❓", Action::on(ActionVerb::ConfirmDelete, product_id)),
        ]],
    }
}

pub fn confirm_delete(product_id: ProductId) -> Keyboard {
    Keyboard::Inline {
        rows: vec![vec![
            Button::new("Delete", Action::on(ActionVerb::Delete, product_id)),
            Button::new("No", Action::on(ActionVerb::ShowActions, product_id)),
        ]],
    }
}

pub fn done(label: &str) -> Keyboard {
    Keyboard::Inline {
        rows: vec![vec![Button::new(label, Action::new(ActionVerb::Done))]],
    }
}

pub fn edit_fields(selected: &BTreeSet<EditField>) -> Keyboard {
    let toggle = |field: EditField| {
        let mark = if selected.contains(&field) { " ✅" } else { "" };
        Button::new(
            format!("{}{}", field.label(), mark),
            Action::new(ActionVerb::ToggleEditField(field)),
        )
    };
    Keyboard::Inline {
        rows: vec![
            vec![toggle(EditField::Name), toggle(EditField::Count)],
            vec![
                toggle(EditField::PurchasePrice),
                toggle(EditField::SellingPrice),
            ],
            vec![Button::new("Continue", Action::new(ActionVerb::ConfirmEdit))],
        ],
    }
}

pub fn add_to_cart(product_id: ProductId) -> Keyboard {
    Keyboard::Inline {
        rows: vec![vec![Button::new(
            "Add to cart ➕",
            Action::on(ActionVerb::AddToCart, product_id),
        )]],
    }
}

/// `−  count  +`, the discount button, and remove.
pub fn line_controls(line: &CartItem) -> Keyboard {
    let id = line.product_id;
    let discount = if line.discount > 0 {
        format!("Discount {}%", line.discount)
    } else {
        "Discount".to_string()
    };
    Keyboard::Inline {
        rows: vec![
            vec![
                Button::new("  ➖  ", Action::on(ActionVerb::ReduceInCart, id)),
                Button::new(
                    line.count.to_string(),
                    Action::on(ActionVerb::EditCountInCart, id),
                ),
                Button::new("  ➕  ", Action::on(ActionVerb::AddToCart, id)),
            ],
            vec![Button::new(discount, Action::on(ActionVerb::DiscountInCart, id))],
            vec![Button::new(
                "Remove from cart",
                Action::on(ActionVerb::RemoveFromCart, id),
            )],
        ],
    }
}

pub fn pay_types() -> Keyboard {
    let button = |pay_type: PayType| {
        Button::new(pay_type.label(), Action::new(ActionVerb::Pay(pay_type)))
    };
    Keyboard::Inline {
        rows: vec![vec![button(PayType::Cash), button(PayType::Kaspi)]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_amount_formats_direction() {
        assert_eq!(signed_amount(Decimal::new(27000, 2)), "+270.00");
        assert_eq!(signed_amount(Decimal::new(-45, 0)), "-45.00");
        assert_eq!(signed_amount(Decimal::ZERO), "0.00");
    }

    #[test]
    fn selling_menu_shows_running_total() {
        let Keyboard::Menu { rows } = selling_menu(Decimal::new(675, 0)) else {
            panic!("expected a menu keyboard");
        };
        assert_eq!(rows[0][0], "🛍 675.00");
        assert_eq!(MenuCommand::parse(&rows[0][0]), Some(MenuCommand::CartSummary));
    }

    #[test]
    fn edit_fields_marks_selection() {
        let selected = BTreeSet::from([EditField::Count]);
        let Keyboard::Inline { rows } = edit_fields(&selected) else {
            panic!("expected inline buttons");
        };
        assert_eq!(rows[0][0].label, "Name");
        assert_eq!(rows[0][1].label, "Count ✅");
        assert_eq!(rows[2][0].payload, "confirm_edit_product");
    }

    #[test]
    fn line_controls_carry_product_payloads() {
        let line = CartItem {
            product_id: 9,
            name: "Mug".into(),
            store_count: 5,
            count: 2,
            store_price: Decimal::new(150, 0),
            unit_price: Decimal::new(135, 0),
            discount: 10,
            message_id: None,
        };
        let Keyboard::Inline { rows } = line_controls(&line) else {
            panic!("expected inline buttons");
        };
        assert_eq!(rows[0][0].payload, "reduce_item_in_cart_9");
        assert_eq!(rows[0][1].label, "2");
        assert_eq!(rows[1][0].label, "Discount 10%");
        assert_eq!(rows[2][0].payload, "remove_item_from_cart_9");
    }
}
