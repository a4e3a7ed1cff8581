use axum::{
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;

pub fn v1_router() -> Router<AppState> {
    let family = Router::new()
        .route(
            "/",
            get(handlers::family::list_members).post(handlers::family::create_member),
        )
        .route("/tree", get(handlers::family::get_tree))
        .route(
            "/{memberId}",
            get(handlers::family::get_member).patch(handlers::family::update_member),
        )
        .route(
            "/{memberId}/subscribe",
            post(handlers::family::subscribe_member),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router())
        .nest("/memorials/{memorialId}/family", family)
}
