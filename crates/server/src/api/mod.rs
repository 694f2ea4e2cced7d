//! # API Routes

pub mod command;
pub mod pipeline;

use axum::routing::{get, post};
use axum::Router;

use crate::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/command", post(command::handle_command))
        .route("/command/stream", post(command::stream_command))
        .route("/site/:project_id", get(command::get_site))
        .route("/pipeline/:session_id/start", post(pipeline::start_step))
        .route("/pipeline/:session_id/input", post(pipeline::set_input))
        .route(
            "/pipeline/:session_id/complete",
            post(pipeline::complete_step),
        )
        .route("/pipeline/:session_id", get(pipeline::get_state))
}
