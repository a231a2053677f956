use crate::audit::AuditEntry;
use crate::bot::{ChatState, Deps};
use crate::cart::Cart;
use crate::error::{AppError, AppResult};
use crate::models::{NewOrder, NewOrderDetail, PayType, ProductId};
use crate::recognize::Recognizer;
use crate::render::{self, Reply};
use crate::services::{Origin, cart_service};
use crate::storage::Storage;

pub fn choose_pay_type(state: &ChatState) -> AppResult<Vec<Reply>> {
    let cart = state.cart.as_ref().ok_or(AppError::CartNotFound)?;
    if cart.is_empty() {
        return Ok(vec![Reply::with_keyboard(
            "Cart is empty.",
            render::main_menu(),
        )]);
    }
    Ok(vec![Reply::with_keyboard(
        format!(
            "Total: {}\nChoose the payment type:",
            render::money(cart.amount())
        ),
        render::pay_types(),
    )])
}

/// Commits the cart as an order. The cart is cleared only after a successful commit.
pub async fn commit<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    state: &mut ChatState,
    origin: Origin,
    pay_type: PayType,
) -> AppResult<Vec<Reply>> {
    let cart = state.cart.as_ref().ok_or(AppError::CartNotFound)?;
    if cart.is_empty() {
        return Ok(vec![Reply::with_keyboard(
            "Cart is empty.",
            render::main_menu(),
        )]);
    }
    let order = build_order(cart, origin, pay_type);

    let order_id = match deps
        .io("commit order", deps.storage.commit_order(&order))
        .await
    {
        Ok(order_id) => order_id,
        Err(AppError::CommitConflict(product_id)) => {
            return conflict_replies(deps, state, origin, product_id).await;
        }
        Err(err) => return Err(err),
    };

    state.cart = None;
    if state.step().is_some_and(|step| {
        !step.is_add_product() && !step.is_edit_product()
    }) {
        state.session = None;
    }
    tracing::info!(
        chat_id = %origin.chat_id,
        order_id,
        amount = %order.amount,
        pay_type = pay_type.as_str(),
        "order committed"
    );
    deps.audit(AuditEntry::order_committed(
        order.buyer_id,
        order_id,
        order.amount,
        order.details.len(),
    ))
    .await;

    let mut replies = Vec::new();
    if let Some(message_id) = origin.message_id {
        replies.push(Reply::EditControls {
            message_id,
            keyboard: render::done(&format!("Paid: {}", pay_type.label())),
        });
    }
    replies.push(Reply::with_keyboard(
        format!("Order #{order_id} saved!"),
        render::main_menu(),
    ));
    Ok(replies)
}

/// Shows the stock left for the line that could not be committed. The cart is kept.
async fn conflict_replies<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    state: &mut ChatState,
    origin: Origin,
    product_id: ProductId,
) -> AppResult<Vec<Reply>> {
    let conflict = AppError::CommitConflict(product_id);
    tracing::warn!(chat_id = %origin.chat_id, error = %conflict, "order refused");
    let refreshed = match cart_service::restock(deps, state, origin, product_id).await {
        Ok(replies) => replies,
        Err(err) => {
            tracing::warn!(product_id, error = %err, "could not refresh stock");
            return Err(conflict);
        }
    };
    let mut replies = vec![Reply::text(conflict.user_message())];
    replies.extend(refreshed);
    Ok(replies)
}

fn build_order(cart: &Cart, origin: Origin, pay_type: PayType) -> NewOrder {
    let details = cart
        .lines()
        .filter(|line| line.count > 0)
        .map(|line| NewOrderDetail {
            product_id: line.product_id,
            unit_amount: line.unit_price,
            count: line.count,
            discount: line.discount,
            fact_sum: line.line_total(),
        })
        .collect();
    NewOrder {
        buyer_id: origin.sender_id,
        amount: cart.amount(),
        pay_type,
        phone: None,
        details,
    }
}
