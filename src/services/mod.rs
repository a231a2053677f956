//! Event routing and the handlers behind it.

use crate::bot::{ChatState, Deps};
use crate::error::{AppError, AppResult};
use crate::ingress::{Action, ActionVerb, ChatEvent, MenuCommand};
use crate::models::{ChatId, MessageId, OwnerId};
use crate::recognize::Recognizer;
use crate::render::{self, Reply};
use crate::session::Step;
use crate::storage::Storage;

pub mod cart_service;
pub mod catalog_service;
pub mod order_service;
pub mod workflow_service;

/// Who sent the event and which message it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub chat_id: ChatId,
    pub sender_id: OwnerId,
    pub message_id: Option<MessageId>,
}

impl From<&ChatEvent> for Origin {
    fn from(event: &ChatEvent) -> Self {
        Self {
            chat_id: event.chat_id(),
            sender_id: event.sender_id(),
            message_id: event.message_id(),
        }
    }
}

pub async fn dispatch<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    state: &mut ChatState,
    event: &ChatEvent,
) -> AppResult<Vec<Reply>> {
    let origin = Origin::from(event);
    match event {
        ChatEvent::Text { text, .. } => match MenuCommand::parse(text) {
            Some(command) => menu(state, origin, command),
            None => step_input(deps, state, origin, text).await,
        },
        ChatEvent::Photo { file_ref, .. } => {
            workflow_service::handle_photo(deps, state, origin, file_ref).await
        }
        ChatEvent::Action { action, .. } => on_action(deps, state, origin, *action).await,
    }
}

fn menu(
    state: &mut ChatState,
    origin: Origin,
    command: MenuCommand,
) -> AppResult<Vec<Reply>> {
    tracing::debug!(chat_id = %origin.chat_id, command = command.label(), "menu command");
    match command {
        MenuCommand::Start => {
            state.session = None;
            Ok(vec![Reply::with_keyboard(
                "Welcome! Add products to your catalog or start a sale.",
                render::main_menu(),
            )])
        }
        MenuCommand::AddProduct => Ok(workflow_service::start_add_product(state, origin)),
        MenuCommand::Sale => {
            state.session = None;
            let keyboard = match &state.cart {
                Some(cart) => render::selling_menu(cart.amount()),
                None => render::main_menu(),
            };
            Ok(vec![Reply::with_keyboard(
                "Send a photo of the product to sell.",
                keyboard,
            )])
        }
        MenuCommand::Menu => Ok(vec![Reply::with_keyboard(
            "Catalog",
            render::catalog_menu(),
        )]),
        MenuCommand::Checkout => order_service::choose_pay_type(state),
        MenuCommand::Cancel => Ok(cart_service::cancel(state)),
        MenuCommand::CartSummary => Ok(cart_service::summary(state)),
    }
}

async fn step_input<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    state: &mut ChatState,
    origin: Origin,
    text: &str,
) -> AppResult<Vec<Reply>> {
    let Some(step) = state.step() else {
        return Ok(vec![Reply::with_keyboard(
            "Unknown command.",
            render::main_menu(),
        )]);
    };
    match step {
        Step::WaitingSellingPrice => {
            workflow_service::finish_add_product(deps, state, origin, text).await
        }
        step if step.is_add_product() => workflow_service::fill_draft(state, text),
        Step::SelectingEditFields => Err(AppError::Validation(
            "pick the fields with the buttons".into(),
        )),
        Step::WaitingEdit(_) => workflow_service::apply_edit(deps, state, origin, text).await,
        Step::WaitingCartCount(product_id) => {
            cart_service::count_input(state, product_id, text)
        }
        Step::WaitingDiscount(product_id) => {
            cart_service::discount_input(state, product_id, text)
        }
        other => Err(AppError::Validation(format!("no input expected on {other:?}"))),
    }
}

async fn on_action<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    state: &mut ChatState,
    origin: Origin,
    action: Action,
) -> AppResult<Vec<Reply>> {
    tracing::debug!(chat_id = %origin.chat_id, action = %action, "button pressed");
    match action.verb {
        ActionVerb::AddProduct => Ok(workflow_service::start_add_product(state, origin)),
        ActionVerb::List => catalog_service::list_products(deps, origin).await,
        ActionVerb::EditProduct => {
            workflow_service::start_edit(deps, state, origin, action.product_id()?).await
        }
        ActionVerb::ToggleEditField(field) => workflow_service::toggle_field(state, origin, field),
        ActionVerb::ConfirmEdit => workflow_service::confirm_edit(state),
        ActionVerb::ConfirmDelete => {
            catalog_service::confirm_delete(deps, origin, action.product_id()?).await
        }
        ActionVerb::Delete => {
            catalog_service::delete(deps, state, origin, action.product_id()?).await
        }
        ActionVerb::ShowActions => {
            catalog_service::show_actions(deps, origin, action.product_id()?).await
        }
        ActionVerb::AddToCart => {
            cart_service::add(deps, state, origin, action.product_id()?).await
        }
        ActionVerb::ReduceInCart => cart_service::reduce(state, origin, action.product_id()?),
        ActionVerb::EditCountInCart => {
            cart_service::ask_count(state, origin, action.product_id()?)
        }
        ActionVerb::DiscountInCart => {
            cart_service::ask_discount(state, origin, action.product_id()?)
        }
        ActionVerb::RemoveFromCart => cart_service::remove(state, origin, action.product_id()?),
        ActionVerb::Pay(pay_type) => order_service::commit(deps, state, origin, pay_type).await,
        ActionVerb::Done => Ok(Vec::new()),
    }
}

/// Replies for a failed event: the error for the user, then the pending prompt again.
pub fn failure_replies(err: &AppError, state: &ChatState) -> Vec<Reply> {
    let mut replies = vec![Reply::text(err.user_message())];
    if let Some(step) = state.step() {
        replies.push(Reply::text(step.prompt()));
    }
    replies
}
