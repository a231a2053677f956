//! Add-product and edit-product conversations, and photo handling.

use crate::audit::AuditEntry;
use crate::bot::{ChatState, Deps};
use crate::error::{AppError, AppResult};
use crate::models::{ImageRecord, Product, ProductId};
use crate::recognize::Recognizer;
use crate::render::{self, Reply};
use crate::services::{Origin, catalog_service};
use crate::session::{ChatSession, EditField, Step};
use crate::storage::Storage;

/// Starts a new add-product sequence, dropping whatever the chat was doing.
pub fn start_add_product(state: &mut ChatState, origin: Origin) -> Vec<Reply> {
    if let Some(previous) = state.session.replace(ChatSession::add_product(
        origin.chat_id,
        origin.sender_id,
    )) {
        tracing::debug!(chat_id = %origin.chat_id, step = ?previous.step, "session replaced");
    }
    vec![Reply::text(Step::WaitingPhoto.prompt())]
}

pub fn fill_draft(state: &mut ChatState, text: &str) -> AppResult<Vec<Reply>> {
    let session = active_session(state)?;
    let next = session.fill_draft(text)?;
    Ok(vec![Reply::text(next.prompt())])
}

/// Persists the draft on the selling price input. The session survives a failed save.
pub async fn finish_add_product<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    state: &mut ChatState,
    origin: Origin,
    text: &str,
) -> AppResult<Vec<Reply>> {
    let draft = active_session(state)?.complete_draft(text)?;

    let product_id = deps
        .io("save product", deps.storage.save_product(&draft))
        .await?;
    for image in &draft.images {
        let saved = deps
            .io(
                "save image",
                deps.storage
                    .save_image(product_id, draft.owner_id, &image.bytes, &image.vector),
            )
            .await;
        if let Err(err) = saved {
            // keep the catalog free of products without photos
            if let Err(cleanup) = deps
                .io("remove product", deps.storage.remove_product(product_id))
                .await
            {
                tracing::warn!(product_id, error = %cleanup, "could not undo product save");
            }
            return Err(err);
        }
    }

    state.session = None;
    tracing::info!(chat_id = %origin.chat_id, product_id, "product added");
    deps.audit(AuditEntry::product_created(draft.owner_id, product_id))
        .await;

    let product = Product {
        id: product_id,
        owner_id: draft.owner_id,
        name: draft.name,
        description: draft.description,
        count: draft.count,
        purchase_price: draft.purchase_price,
        selling_price: draft.selling_price,
    };
    Ok(vec![
        Reply::text("Product saved!"),
        Reply::with_keyboard(
            render::product_card(&product),
            render::product_actions(product_id),
        ),
    ])
}

/// A photo either continues add-product or, outside a workflow, starts a sale lookup.
pub async fn handle_photo<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    state: &mut ChatState,
    origin: Origin,
    file_ref: &str,
) -> AppResult<Vec<Reply>> {
    let adding = match state.step() {
        Some(Step::WaitingPhoto) => true,
        Some(step) if step.is_add_product() || step.is_edit_product() => {
            return Err(AppError::Validation("a photo is not expected now".into()));
        }
        _ => false,
    };

    let url = deps.file_url(file_ref);
    let vector = deps.io("recognizer", deps.recognizer.extract(&url)).await?;
    let stored = deps
        .io("load vectors", deps.storage.vectors_by_owner(origin.sender_id))
        .await?;
    let matches = deps.detector.find_matches(&vector, &stored)?;
    tracing::debug!(
        chat_id = %origin.chat_id,
        candidates = stored.len(),
        matches = matches.len(),
        "photo matched"
    );

    if !matches.is_empty() {
        let offers = catalog_service::offer_matches(deps, state, origin, &matches).await?;
        // the draft is dropped only once the offers are ready
        if adding {
            state.session = None;
        }
        let mut replies = vec![Reply::text(if adding {
            "A similar product is already in your catalog:"
        } else {
            "Found similar products:"
        })];
        replies.extend(offers);
        return Ok(replies);
    }

    if !adding {
        return Ok(vec![Reply::with_keyboard(
            "No similar products found. Add a new one?",
            render::add_product_offer(),
        )]);
    }

    let bytes = deps.io("download photo", deps.recognizer.fetch_image(&url)).await?;
    let session = active_session(state)?;
    let next = session.attach_image(ImageRecord { url, bytes, vector })?;
    Ok(vec![Reply::text(next.prompt())])
}

pub async fn start_edit<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    state: &mut ChatState,
    origin: Origin,
    product_id: ProductId,
) -> AppResult<Vec<Reply>> {
    catalog_service::load_owned(deps, origin, product_id).await?;
    let session = ChatSession::edit_product(origin.chat_id, product_id, origin.message_id);
    let keyboard = render::edit_fields(&session.selected);
    state.session = Some(session);
    Ok(vec![Reply::controls(
        origin.message_id,
        Step::SelectingEditFields.prompt(),
        keyboard,
    )])
}

pub fn toggle_field(
    state: &mut ChatState,
    origin: Origin,
    field: EditField,
) -> AppResult<Vec<Reply>> {
    let session = edit_session(state)?;
    session.toggle(field)?;
    let message_id = session.prompt_message.or(origin.message_id);
    Ok(vec![Reply::controls(
        message_id,
        Step::SelectingEditFields.prompt(),
        render::edit_fields(&session.selected),
    )])
}

pub fn confirm_edit(state: &mut ChatState) -> AppResult<Vec<Reply>> {
    let session = edit_session(state)?;
    if session.step != Step::SelectingEditFields {
        return Err(AppError::Validation("fields were already confirmed".into()));
    }
    match session.advance_edit() {
        Some(field) => Ok(vec![Reply::text(field.prompt())]),
        None => Ok(vec![Reply::with_keyboard(
            "Select at least one field.",
            render::edit_fields(&session.selected),
        )]),
    }
}

/// Persists one edited field and moves on to the next selected one.
pub async fn apply_edit<S: Storage, R: Recognizer>(
    deps: &Deps<S, R>,
    state: &mut ChatState,
    origin: Origin,
    text: &str,
) -> AppResult<Vec<Reply>> {
    let session = edit_session(state)?;
    let Step::WaitingEdit(field) = session.step else {
        return Err(AppError::Validation("no field is being edited".into()));
    };
    let product_id = session
        .target
        .ok_or_else(|| AppError::Validation("no product is being edited".into()))?;
    let update = field.parse(text)?;

    deps.io("update product", deps.storage.update_field(product_id, &update))
        .await?;
    deps.audit(AuditEntry::product_updated(
        origin.sender_id,
        product_id,
        update.column(),
    ))
    .await;
    session.finish_edit_field()?;

    if let Some(next) = session.advance_edit() {
        return Ok(vec![Reply::text(next.prompt())]);
    }

    let prompt_message = session.prompt_message;
    state.session = None;
    tracing::info!(product_id, "product edited");

    let mut replies = vec![Reply::text("Product updated!")];
    if let Some(message_id) = prompt_message {
        replies.push(Reply::EditControls {
            message_id,
            keyboard: render::done("Edited"),
        });
    }
    Ok(replies)
}

fn active_session(state: &mut ChatState) -> AppResult<&mut ChatSession> {
    state
        .session
        .as_mut()
        .ok_or_else(|| AppError::Validation("no active workflow".into()))
}

fn edit_session(state: &mut ChatState) -> AppResult<&mut ChatSession> {
    match state.session.as_mut() {
        Some(session) if session.step.is_edit_product() => Ok(session),
        _ => Err(AppError::Validation("no product is being edited".into())),
    }
}
