//! HTTP route assembly.

pub mod apps;
pub mod audit;
pub mod batch;
pub mod cache_admin;
pub mod dashboard;
pub mod lookup;
pub mod media;
pub mod posts;
pub mod schema;
pub mod system;

use crate::state::AppState;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Assemble the full router. Admin routes carry their own gate through
/// the `RequireAdmin` extractor; everything else is gated per handler.
pub fn build_router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/audit-log", get(audit::list_audit_log))
        .route("/cache/clear", post(cache_admin::clear_cache))
        .route("/apps", get(apps::list_apps))
        .route("/apps/:user_id/:app_id", delete(apps::remove_app));

    let cors_enabled = state.config.cors_enabled;
    let router = Router::new()
        .route("/version", get(system::version))
        .route("/health", get(system::health))
        .route("/me", get(system::me))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/types", get(lookup::types))
        .route("/hidden-types", get(lookup::hidden_types))
        .route(
            "/posts/:post_type",
            get(posts::list_posts).post(posts::create_post),
        )
        .route(
            "/post/:id",
            get(posts::get_post)
                .post(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/batch", post(batch::execute_batch))
        .route("/media", get(media::list_media))
        .route("/media/upload", post(media::upload_media))
        .route(
            "/media/:id",
            get(media::get_media).delete(media::delete_media),
        )
        .route("/media/:id/optimized", get(media::optimized_media))
        .route("/schema", get(schema::full_schema))
        .route("/fields/:post_type", get(schema::fields_for_type))
        .route("/search/:post_type", get(lookup::search))
        .route("/terms/:taxonomy", get(lookup::terms))
        .route("/users", get(lookup::users))
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
