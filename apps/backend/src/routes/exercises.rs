//! Learner action endpoints, one per exercise interaction

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use learnflow_core::{FlowError, PendingPronunciation, Transport};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::sessions::find;
use crate::services::sessions::{LiveSession, SessionStore, SharedSession};
use crate::AppState;

/// Snapshot the session after an action, releasing it if it just ended.
async fn respond(
    sessions: &SessionStore,
    id: Uuid,
    live: &LiveSession,
    feedback: Option<Feedback>,
) -> Json<ActionResponse> {
    let response = Json(ActionResponse {
        feedback,
        session: live.sequencer.view(),
    });
    sessions.release_if_over(id, live).await;
    response
}

/// POST /api/sessions/:id/translation/choose
pub async fn choose_option(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChooseOptionRequest>,
) -> Result<Json<ActionResponse>> {
    let shared = find(&state, id).await?;
    let mut live = shared.lock().await;
    let feedback = live.sequencer.choose_option(payload.option)?;
    Ok(respond(&state.sessions, id, &live, Some(feedback)).await)
}

/// POST /api/sessions/:id/translation/skip
pub async fn skip_translation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>> {
    let shared = find(&state, id).await?;
    let mut live = shared.lock().await;
    let feedback = live.sequencer.skip_translation()?;
    Ok(respond(&state.sessions, id, &live, Some(feedback)).await)
}

/// POST /api/sessions/:id/spelling
pub async fn submit_spelling(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SpellingRequest>,
) -> Result<Json<ActionResponse>> {
    let shared = find(&state, id).await?;
    let mut live = shared.lock().await;
    let feedback = live.sequencer.submit_spelling(&payload.answer)?;
    Ok(respond(&state.sessions, id, &live, Some(feedback)).await)
}

/// POST /api/sessions/:id/pronunciation/start
pub async fn start_recording(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartRecordingRequest>,
) -> Result<Json<ActionResponse>> {
    let shared = find(&state, id).await?;
    let mut live = shared.lock().await;
    live.microphone
        .set_permission(payload.microphone == MicrophonePermission::Granted);
    let feedback = live.sequencer.start_recording()?;
    Ok(respond(&state.sessions, id, &live, Some(feedback)).await)
}

/// POST /api/sessions/:id/pronunciation/stop
///
/// The clip is scored upstream without holding the session lock, on a task
/// of its own: the ticket resolves even if this request is dropped. A score
/// that arrives after the session was abandoned is discarded.
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StopRecordingRequest>,
) -> Result<Json<ActionResponse>> {
    let audio = STANDARD
        .decode(payload.audio_base64.trim())
        .map_err(|e| ApiError::BadRequest(format!("audioBase64: {e}")))?;
    let shared = find(&state, id).await?;

    let pending = {
        let mut live = shared.lock().await;
        live.microphone.deliver(audio);
        live.sequencer.stop_recording()?
    };

    let scoring = tokio::spawn(score_clip(
        state.upstream.clone(),
        state.sessions.clone(),
        id,
        shared,
        pending,
        state.scoring_timeout,
    ));
    scoring
        .await
        .map_err(|e| ApiError::Internal(format!("pronunciation scoring: {e}")))?
}

async fn score_clip(
    upstream: Arc<dyn Transport>,
    sessions: Arc<SessionStore>,
    id: Uuid,
    shared: SharedSession,
    pending: PendingPronunciation,
    limit: Duration,
) -> Result<Json<ActionResponse>> {
    let submission = upstream.submit_pronunciation(&pending.task_id, &pending.word, pending.audio);
    let scored = match tokio::time::timeout(limit, submission).await {
        Ok(scored) => scored,
        Err(_) => Err(FlowError::Transport(format!(
            "pronunciation scoring timed out after {}ms",
            limit.as_millis()
        ))),
    };

    let mut live = shared.lock().await;
    let feedback = live.sequencer.resolve_pronunciation(pending.ticket, scored)?;
    Ok(respond(&sessions, id, &live, feedback).await)
}

/// POST /api/sessions/:id/context/pick
pub async fn pick_token(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PickTokenRequest>,
) -> Result<Json<ActionResponse>> {
    let shared = find(&state, id).await?;
    let mut live = shared.lock().await;
    let feedback = live.sequencer.pick_token(payload.index)?;
    let response = respond(&state.sessions, id, &live, Some(feedback)).await;
    // The flag is transient; the response carries it, the stored state does not.
    live.sequencer.clear_wrong_flag();
    Ok(response)
}

/// POST /api/sessions/:id/matching/select
pub async fn select_match(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectMatchRequest>,
) -> Result<Json<ActionResponse>> {
    let shared = find(&state, id).await?;
    let mut live = shared.lock().await;
    let feedback = live.sequencer.select_match(payload.side, payload.pair_id)?;
    Ok(respond(&state.sessions, id, &live, Some(feedback)).await)
}
