//! Session lifecycle endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use learnflow_core::{open_session, SessionRng};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::services::recorder::ClientMicrophone;
use crate::services::sessions::{LiveSession, SharedSession};
use crate::AppState;

pub(crate) async fn find(state: &AppState, id: Uuid) -> Result<SharedSession> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("session {id}")))
}

/// POST /api/sessions
/// Fetches the task batch and starts a session over it
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>)> {
    let rng = match state.session_seed {
        Some(seed) => SessionRng::seeded(seed),
        None => SessionRng::from_entropy(),
    };
    let microphone = ClientMicrophone::new();
    let sequencer = open_session(
        state.upstream.clone(),
        payload.collection_id,
        &payload.mode,
        Box::new(microphone.clone()),
        rng,
    )
    .await?;

    let (id, shared) = state
        .sessions
        .insert(LiveSession::new(sequencer, microphone))
        .await;
    let live = shared.lock().await;

    tracing::info!(session_id = %id, collection_id = payload.collection_id, "Created session");

    let response = CreateSessionResponse {
        id,
        started_at: live.started_at,
        session: live.sequencer.view(),
    };
    // An empty batch finishes on creation; nothing is left to act on.
    state.sessions.release_if_over(id, &live).await;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/sessions/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>> {
    let shared = find(&state, id).await?;
    let live = shared.lock().await;
    Ok(Json(live.sequencer.view()))
}

/// DELETE /api/sessions/:id
/// Abandons the session and forgets it
pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    let shared = state
        .sessions
        .remove(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("session {id}")))?;

    let abandoned = shared.lock().await.sequencer.abandon();
    tracing::info!(session_id = %id, abandoned, "Removed session");

    Ok(StatusCode::NO_CONTENT)
}
