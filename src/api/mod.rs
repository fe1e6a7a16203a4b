pub mod auth;
mod classes;
pub mod error;
mod instructor;
mod notifications;
mod reservations;
mod users;
mod validation;

#[cfg(test)]
mod tests;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    // Catalogue and reservations; role checks happen per handler
    let student_routes = Router::new()
        .route("/classes", get(classes::list_classes))
        .route("/classes/mine-reservations", get(reservations::list_my_reservations))
        .route("/classes/:id/reserve", post(classes::reserve_class))
        .route("/reservations/:id", delete(reservations::cancel_reservation));

    let instructor_routes = Router::new()
        .route("/classes", get(instructor::list_all_classes))
        .route("/classes", post(instructor::create_class))
        .route("/classes/mine", get(instructor::list_my_classes))
        .route("/classes/:id", put(instructor::update_class))
        .route("/classes/:id", delete(instructor::delete_class))
        .route("/classes/:id/reservations", get(instructor::class_roster))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/:id/read", post(notifications::mark_read));

    let user_routes = Router::new()
        .route("/me", get(users::me))
        .route("/photo", post(users::upload_photo));

    let uploads = ServeDir::new(state.accounts.uploads_dir());
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", student_routes)
        .nest("/api/instructor", instructor_routes)
        .nest("/api/users", user_routes)
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
