//! sendor-api — the HTTP/JSON front end.
//!
//! A thin axum service exposing the stash and the task queue so the
//! daemon is runnable end-to-end. Upload-page rendering and WebSocket
//! push live in a separate front-end and aren't reimplemented here.

pub mod handlers;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

pub async fn serve(state: ApiState, port: u16) -> anyhow::Result<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/stash", get(handlers::stash::handle_list).post(handlers::stash::handle_ingest))
        .route(
            "/stash/{id}",
            get(handlers::stash::handle_get).delete(handlers::stash::handle_remove),
        )
        .route("/stash/{id}/lock", post(handlers::stash::handle_lock))
        .route("/stash/{id}/unlock", post(handlers::stash::handle_unlock))
        .route("/targets", get(handlers::tasks::handle_list_targets))
        .route(
            "/tasks",
            get(handlers::tasks::handle_list_tasks).post(handlers::tasks::handle_create_task),
        )
        .route(
            "/tasks/{id}",
            get(handlers::tasks::handle_get_task).delete(handlers::tasks::handle_remove_task),
        )
        .route("/tasks/{id}/cancel", post(handlers::tasks::handle_cancel_task))
        .with_state(state);

    let app = Router::new().nest("/api", api_routes).layer(cors);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!(port, "sendor API listening on 127.0.0.1");
    axum::serve(listener, app).await?;
    Ok(())
}
