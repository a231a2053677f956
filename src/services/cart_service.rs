use crate::bot::{ChatState, Deps};
use crate::cart::{Cart, CountToken, LineChange};
use crate::error::{AppError, AppResult};
use crate::models::{MessageId, ProductId};
use crate::recognize::Recognizer;
use crate::render::{self, Reply};
use crate::services::{Origin, catalog_service};
use crate::session::{ChatSession, Step};
use crate::storage::Storage;

/// Adds one unit. The first add of a product loads it and opens the cart.
pub async fn add<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    state: &mut ChatState,
    origin: Origin,
    product_id: ProductId,
) -> AppResult<Vec<Reply>> {
    let opened = state.cart.is_none();
    let has_line = state
        .cart
        .as_ref()
        .is_some_and(|cart| cart.line(product_id).is_some());
    if !has_line {
        let product = catalog_service::load_owned(deps, origin, product_id).await?;
        state
            .cart
            .get_or_insert_with(|| Cart::new(origin.chat_id))
            .stock_line(&product)?;
    }

    let cart = cart_mut(state)?;
    let before = cart.line(product_id).map(|line| line.count);
    let change = cart.add_one(product_id)?;
    let limited = before == Some(change.line.count);
    let limit_reply = Reply::text(format!(
        "Stock limit reached: {}",
        change.line.store_count
    ));
    if limited && opened {
        // nothing was added, so no cart is opened
        state.cart = None;
        return Ok(vec![limit_reply]);
    }

    let mut replies = Vec::new();
    if limited {
        replies.push(limit_reply);
    }
    replies.extend(line_replies(cart, &change, origin.message_id)?);
    Ok(replies)
}

/// Reloads the stock of a cart line, cutting its count down if it no longer fits.
pub async fn restock<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    state: &mut ChatState,
    origin: Origin,
    product_id: ProductId,
) -> AppResult<Vec<Reply>> {
    let product = catalog_service::load_owned(deps, origin, product_id).await?;
    let cart = cart_mut(state)?;
    let change = cart.stock_line(&product)?;
    let mut replies = vec![Reply::text(format!(
        "{} in stock: {}",
        change.line.name, change.line.store_count
    ))];
    replies.extend(line_replies(cart, &change, None)?);
    Ok(replies)
}

pub fn reduce(
    state: &mut ChatState,
    origin: Origin,
    product_id: ProductId,
) -> AppResult<Vec<Reply>> {
    let cart = cart_mut(state)?;
    let change = cart.reduce_one(product_id)?;
    line_replies(cart, &change, origin.message_id)
}

pub fn remove(
    state: &mut ChatState,
    origin: Origin,
    product_id: ProductId,
) -> AppResult<Vec<Reply>> {
    let cart = cart_mut(state)?;
    let change = cart.remove_line(product_id)?;
    let mut replies = Vec::new();
    if let Some(message_id) = origin.message_id.or(change.line.message_id) {
        replies.push(Reply::EditControls {
            message_id,
            keyboard: render::add_to_cart(product_id),
        });
    }
    replies.push(total_reply(cart, &change));
    Ok(replies)
}

pub fn ask_count(
    state: &mut ChatState,
    origin: Origin,
    product_id: ProductId,
) -> AppResult<Vec<Reply>> {
    ask(state, origin, product_id, Step::WaitingCartCount(product_id))
}

pub fn ask_discount(
    state: &mut ChatState,
    origin: Origin,
    product_id: ProductId,
) -> AppResult<Vec<Reply>> {
    ask(state, origin, product_id, Step::WaitingDiscount(product_id))
}

/// Applies a `N`, `+N` or `-N` quantity typed after pressing the count button.
pub fn count_input(
    state: &mut ChatState,
    product_id: ProductId,
    text: &str,
) -> AppResult<Vec<Reply>> {
    let token: CountToken = text.parse()?;
    let cart = cart_mut(state)?;
    let change = cart.set_count(product_id, token)?;
    let replies = line_replies(cart, &change, None)?;
    state.session = None;
    Ok(replies)
}

pub fn discount_input(
    state: &mut ChatState,
    product_id: ProductId,
    text: &str,
) -> AppResult<Vec<Reply>> {
    let percent: i64 = text
        .trim()
        .trim_end_matches('%')
        .parse()
        .map_err(|_| AppError::Validation(format!("'{}' is not a percentage", text.trim())))?;
    let cart = cart_mut(state)?;
    let change = cart.apply_discount(product_id, percent)?;
    let replies = line_replies(cart, &change, None)?;
    state.session = None;
    Ok(replies)
}

/// Drops the cart and any pending input. Nothing persisted is touched.
pub fn cancel(state: &mut ChatState) -> Vec<Reply> {
    let had_cart = state.cart.take().is_some();
    state.session = None;
    let text = if had_cart { "Sale cancelled." } else { "Cart is empty." };
    vec![Reply::with_keyboard(text, render::main_menu())]
}

pub fn summary(state: &ChatState) -> Vec<Reply> {
    let Some(cart) = state.cart.as_ref().filter(|cart| !cart.is_empty()) else {
        return vec![Reply::with_keyboard("Cart is empty.", render::main_menu())];
    };
    let mut text = String::new();
    for line in cart.lines().filter(|line| line.count > 0) {
        text.push_str(&format!(
            "{} × {} = {}",
            line.name,
            line.count,
            render::money(line.line_total())
        ));
        if line.discount > 0 {
            text.push_str(&format!(" (−{}%)", line.discount));
        }
        text.push('\n');
    }
    text.push_str(&format!("Total: {}", render::money(cart.amount())));
    vec![Reply::with_keyboard(text, render::selling_menu(cart.amount()))]
}

fn ask(
    state: &mut ChatState,
    origin: Origin,
    product_id: ProductId,
    step: Step,
) -> AppResult<Vec<Reply>> {
    let cart = cart_mut(state)?;
    if cart.line(product_id).is_none() {
        return Err(AppError::LineNotFound(product_id));
    }
    if let Some(message_id) = origin.message_id {
        cart.set_message(product_id, message_id)?;
    }
    state.session = Some(ChatSession::cart_input(origin.chat_id, step));
    Ok(vec![Reply::text(step.prompt())])
}

/// Refreshed line controls plus the signed change and running total.
fn line_replies(
    cart: &mut Cart,
    change: &LineChange,
    pressed: Option<MessageId>,
) -> AppResult<Vec<Reply>> {
    let line = &change.line;
    if let Some(message_id) = pressed {
        cart.set_message(line.product_id, message_id)?;
    }
    let message_id = pressed.or(line.message_id);
    let mut replies = vec![Reply::controls(
        message_id,
        &line.name,
        render::line_controls(line),
    )];
    replies.push(total_reply(cart, change));
    Ok(replies)
}

fn total_reply(cart: &Cart, change: &LineChange) -> Reply {
    Reply::with_keyboard(
        render::signed_amount(change.delta),
        render::selling_menu(cart.amount()),
    )
}

fn cart_mut(state: &mut ChatState) -> AppResult<&mut Cart> {
    state.cart.as_mut().ok_or(AppError::CartNotFound)
}
