//! API route definitions.

use axum::{Router, middleware};

use crate::{
    AppState,
    middleware::{auth::auth_middleware, csrf::csrf_middleware},
};

pub mod attachments;
pub mod health;

/// Creates the router with public routes and the protected attachment routes.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Authentication runs before the anti-forgery check
    let protected_routes = Router::new()
        .merge(attachments::routes(state.max_upload_bytes))
        .layer(middleware::from_fn(csrf_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}
