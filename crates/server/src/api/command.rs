//! # Command API
//!
//! The endpoint the editor UI calls with each chat instruction, plus a
//! streaming variant for long generations.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::Stream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::error;

use sitewright_core::capabilities::UserContext;
use sitewright_core::command::CommandRequest;
use sitewright_core::providers::{AiMessage, AiRequest};
use sitewright_core::state::BlockInstance;

use crate::SharedState;

/// A block as the editor describes it in request context.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRef {
    pub id: String,
    pub block_type: String,
    pub variant: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandContext {
    pub selected_block_id: Option<String>,
    #[serde(default)]
    pub current_blocks: Vec<BlockRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCommandRequest {
    pub project_id: String,
    pub command: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub context: Option<CommandContext>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCommandResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<BlockInstance>>,
}

impl ApiCommandRequest {
    fn into_core(self) -> CommandRequest {
        let session_id = self
            .session_id
            .unwrap_or_else(|| format!("session-{}", self.project_id));
        let user_id = self.user_id.unwrap_or_else(|| "anonymous".to_string());
        CommandRequest {
            selected_block_id: self.context.and_then(|c| c.selected_block_id),
            project_id: self.project_id,
            user_id,
            session_id,
            command: self.command,
        }
    }
}

pub async fn handle_command(
    State(state): State<SharedState>,
    Json(request): Json<ApiCommandRequest>,
) -> Result<Json<ApiCommandResponse>, StatusCode> {
    let core_request = request.into_core();

    // Serialize turns per project so concurrent commands cannot race the
    // site state
    let lock = state.project_lock(&core_request.project_id).await;
    let _guard = lock.lock().await;

    match state
        .service
        .handle(&core_request, &UserContext::default())
        .await
    {
        Ok(response) => Ok(Json(ApiCommandResponse {
            response: response.response,
            blocks: response.blocks,
        })),
        Err(e) => {
            error!(%e, "command handling failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Stream a plain-chat answer as SSE deltas. Tool execution is not
/// streamed; mutations go through `handle_command`.
pub async fn stream_command(
    State(state): State<SharedState>,
    Json(request): Json<ApiCommandRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let ai_request = AiRequest {
        messages: vec![AiMessage::user(&request.command)],
        ..Default::default()
    };

    let chunks = state.router.stream(&ai_request).await.map_err(|e| {
        error!(%e, "stream open failed");
        StatusCode::BAD_GATEWAY
    })?;

    let events = chunks.map(|chunk| {
        let event = match chunk {
            Ok(chunk) => Event::default()
                .json_data(serde_json::json!({
                    "provider": chunk.provider,
                    "delta": chunk.delta,
                    "done": chunk.done,
                }))
                .unwrap_or_else(|_| Event::default().data("")),
            Err(e) => Event::default()
                .event("error")
                .data(e.to_string()),
        };
        Ok(event)
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

pub async fn get_site(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<BlockInstance>>, StatusCode> {
    match state.db.get_site(&project_id) {
        Ok(Some(site)) => Ok(Json(site.to_blocks())),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!(%e, "site lookup failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
