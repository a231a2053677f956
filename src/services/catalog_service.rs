use crate::audit::AuditEntry;
use crate::bot::{ChatState, Deps};
use crate::detector::Match;
use crate::error::{AppError, AppResult};
use crate::models::{Product, ProductId};
use crate::recognize::Recognizer;
use crate::render::{self, Reply};
use crate::services::Origin;
use crate::storage::Storage;

/// Loads a product of the sender. Other sellers' products read as missing.
pub async fn load_owned<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    origin: Origin,
    product_id: ProductId,
) -> AppResult<Product> {
    let product = deps
        .io("load product", deps.storage.product_by_id(product_id))
        .await?;
    if product.owner_id != origin.sender_id {
        return Err(AppError::NotFound);
    }
    Ok(product)
}

pub async fn list_products<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    origin: Origin,
) -> AppResult<Vec<Reply>> {
    let products = deps
        .io("list products", deps.storage.products_by_owner(origin.sender_id))
        .await?;
    if products.is_empty() {
        return Ok(vec![Reply::with_keyboard(
            "You have no products yet.",
            render::add_product_offer(),
        )]);
    }

    let mut replies = Vec::new();
    for product in &products {
        let images = deps
            .io("list images", deps.storage.image_ids_by_product(product.id))
            .await?;
        replies.extend(images.into_iter().map(Reply::photo));
        replies.push(Reply::with_keyboard(
            render::product_card(product),
            render::product_actions(product.id),
        ));
    }
    Ok(replies)
}

/// Shows each matched product with its closest photo and a way to sell it.
pub async fn offer_matches<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    state: &ChatState,
    origin: Origin,
    matches: &[Match],
) -> AppResult<Vec<Reply>> {
    let mut replies = Vec::new();
    for found in matches {
        let product = match load_owned(deps, origin, found.product_id).await {
            Ok(product) => product,
            // removed since the vectors were loaded
            Err(AppError::NotFound) => continue,
            Err(err) => return Err(err),
        };
        let in_cart = state
            .cart
            .as_ref()
            .and_then(|cart| cart.line(product.id))
            .filter(|line| line.count > 0);
        let keyboard = match in_cart {
            Some(line) => render::line_controls(line),
            None => render::add_to_cart(product.id),
        };
        replies.push(Reply::photo(found.image_id));
        replies.push(Reply::with_keyboard(render::product_card(&product), keyboard));
    }
    Ok(replies)
}

pub async fn confirm_delete<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    origin: Origin,
    product_id: ProductId,
) -> AppResult<Vec<Reply>> {
    let product = load_owned(deps, origin, product_id).await?;
    Ok(vec![Reply::controls(
        origin.message_id,
        &format!("Delete {}?", product.name),
        render::confirm_delete(product_id),
    )])
}

pub async fn show_actions<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    origin: Origin,
    product_id: ProductId,
) -> AppResult<Vec<Reply>> {
    let product = load_owned(deps, origin, product_id).await?;
    Ok(vec![Reply::controls(
        origin.message_id,
        &render::product_card(&product),
        render::product_actions(product_id),
    )])
}

pub async fn delete<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    state: &mut ChatState,
    origin: Origin,
    product_id: ProductId,
) -> AppResult<Vec<Reply>> {
    load_owned(deps, origin, product_id).await?;
    deps.io("remove product", deps.storage.remove_product(product_id))
        .await?;
    deps.audit(AuditEntry::product_deleted(origin.sender_id, product_id))
        .await;

    let editing_it = state
        .session
        .as_ref()
        .is_some_and(|s| s.step.is_edit_product() && s.target == Some(product_id));
    if editing_it {
        state.session = None;
    }
    tracing::info!(chat_id = %origin.chat_id, product_id, "product deleted");

    Ok(vec![Reply::controls(
        origin.message_id,
        "Product deleted.",
        render::done("Deleted"),
    )])
}
