use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        events::{EventReplies, InboundEvent, InboundKind},
        products::ProductList,
    },
    models::Product,
    render::{Button, Keyboard, Reply},
    response::{ApiResponse, Meta},
    routes::{events, health, images, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "gateway_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        events::handle_event,
        images::get_image,
        products::list_products
    ),
    components(
        schemas(
            Product,
            ProductList,
            InboundEvent,
            InboundKind,
            EventReplies,
            Reply,
            Keyboard,
            Button,
            Meta,
            ApiResponse<EventReplies>,
            ApiResponse<ProductList>
        )
    ),
    security(
        ("gateway_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Events", description = "Chat events posted by the gateway"),
        (name = "Images", description = "Stored product photos"),
        (name = "Products", description = "Seller catalogs"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
