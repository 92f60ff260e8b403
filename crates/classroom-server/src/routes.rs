//! JSON request handlers.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use classroom_coordination::{
    require_price, AnalyticsReport, Briefing, FrameworkChoice, JoinReceipt, Pair, Phase, ReconnectReceipt, Remedy,
    SessionId, SessionView, SharedClassroom, Viewer, VoteProgress, VoteResult,
};

use crate::error::ApiResult;
use crate::ws;

/// Build the application router.
pub fn app(classroom: SharedClassroom) -> Router {
    Router::new()
        .route("/api/session", post(create_session))
        .route("/api/session/:id", get(get_session))
        .route("/api/session/:id/join", post(join))
        .route("/api/session/:id/reconnect", post(reconnect))
        .route("/api/session/:id/vote-phase1", post(vote_phase1))
        .route("/api/session/:id/vote-phase2", post(vote_phase2))
        .route("/api/session/:id/reveal-phase1", post(reveal_phase1))
        .route("/api/session/:id/reveal-phase2", post(reveal_phase2))
        .route("/api/session/:id/advance-phase", post(advance_phase))
        .route("/api/session/:id/form-buysell-pairs", post(form_pairs))
        .route("/api/session/:id/character/:participant_id", get(briefing))
        .route("/api/session/:id/analytics", get(analytics))
        .route("/api/session/:id/events", get(ws::session_events))
        .route(
            "/api/session/:id/buysell/:pair_id/vote-mechanism",
            post(vote_mechanism),
        )
        .route("/api/session/:id/buysell/:pair_id/offer", post(make_offer))
        .route("/api/session/:id/buysell/:pair_id/respond", post(respond))
        .route("/api/session/:id/buysell/:pair_id/timed-ready", post(timed_ready))
        .route("/api/session/:id/buysell/:pair_id/lock-timed", post(lock_timed))
        .route("/api/session/:id/buysell/:pair_id/final-choice", post(final_choice))
        .with_state(classroom)
}

// ── Request and response bodies ────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub config: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
}

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    #[serde(default = "default_viewer")]
    pub role: Viewer,
}

fn default_viewer() -> Viewer {
    Viewer::Student
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ParticipantRequest {
    pub participant_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FrameworkVoteRequest {
    pub participant_id: String,
    pub choice: String,
}

#[derive(Debug, Deserialize)]
pub struct RemedyVoteRequest {
    pub participant_id: String,
    pub remedy: String,
}

#[derive(Debug, Deserialize)]
pub struct MechanismRequest {
    pub participant_id: String,
    pub mechanism: String,
}

#[derive(Debug, Deserialize)]
pub struct PriceRequest {
    pub participant_id: String,
    pub price: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceRequest {
    pub participant_id: String,
    pub choice: String,
}

#[derive(Debug, Serialize)]
pub struct PhaseResponse {
    pub phase: Phase,
}

// ── Session handlers ───────────────────────────────────────────────

async fn create_session(
    State(classroom): State<SharedClassroom>,
    body: Option<Json<CreateSessionRequest>>,
) -> ApiResult<Json<CreateSessionResponse>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let session_id = classroom.create_session(&request.config)?;
    Ok(Json(CreateSessionResponse { session_id }))
}

async fn get_session(
    State(classroom): State<SharedClassroom>,
    Path(id): Path<String>,
    Query(query): Query<ViewQuery>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(classroom.session_view(&id, query.role)?))
}

async fn join(
    State(classroom): State<SharedClassroom>,
    Path(id): Path<String>,
    Json(request): Json<JoinRequest>,
) -> ApiResult<Json<JoinReceipt>> {
    Ok(Json(classroom.join(&id, &request.name)?))
}

async fn reconnect(
    State(classroom): State<SharedClassroom>,
    Path(id): Path<String>,
    Json(request): Json<ParticipantRequest>,
) -> ApiResult<Json<ReconnectReceipt>> {
    Ok(Json(classroom.reconnect(&id, &request.participant_id)?))
}

async fn vote_phase1(
    State(classroom): State<SharedClassroom>,
    Path(id): Path<String>,
    Json(request): Json<FrameworkVoteRequest>,
) -> ApiResult<Json<VoteProgress<FrameworkChoice>>> {
    Ok(Json(classroom.cast_framework_vote(
        &id,
        &request.participant_id,
        &request.choice,
    )?))
}

async fn vote_phase2(
    State(classroom): State<SharedClassroom>,
    Path(id): Path<String>,
    Json(request): Json<RemedyVoteRequest>,
) -> ApiResult<Json<VoteProgress<Remedy>>> {
    Ok(Json(classroom.cast_remedy_vote(
        &id,
        &request.participant_id,
        &request.remedy,
    )?))
}

async fn reveal_phase1(
    State(classroom): State<SharedClassroom>,
    Path(id): Path<String>,
) -> ApiResult<Json<VoteResult<FrameworkChoice>>> {
    Ok(Json(classroom.reveal_framework(&id)?))
}

async fn reveal_phase2(
    State(classroom): State<SharedClassroom>,
    Path(id): Path<String>,
) -> ApiResult<Json<VoteResult<Remedy>>> {
    Ok(Json(classroom.reveal_remedy(&id)?))
}

async fn advance_phase(
    State(classroom): State<SharedClassroom>,
    Path(id): Path<String>,
) -> ApiResult<Json<PhaseResponse>> {
    let phase = classroom.advance_phase(&id)?;
    info!(session_id = %id, %phase, "Advanced via API");
    Ok(Json(PhaseResponse { phase }))
}

async fn form_pairs(
    State(classroom): State<SharedClassroom>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Pair>>> {
    Ok(Json(classroom.form_pairs(&id)?))
}

async fn briefing(
    State(classroom): State<SharedClassroom>,
    Path((id, participant_id)): Path<(String, String)>,
) -> ApiResult<Json<Briefing>> {
    Ok(Json(classroom.briefing(&id, &participant_id)?))
}

async fn analytics(
    State(classroom): State<SharedClassroom>,
    Path(id): Path<String>,
) -> ApiResult<Json<AnalyticsReport>> {
    Ok(Json(classroom.analytics(&id)?))
}

// ── Pair handlers ──────────────────────────────────────────────────

async fn vote_mechanism(
    State(classroom): State<SharedClassroom>,
    Path((id, pair_id)): Path<(String, String)>,
    Json(request): Json<MechanismRequest>,
) -> ApiResult<Json<Pair>> {
    Ok(Json(classroom.vote_mechanism(
        &id,
        &pair_id,
        &request.participant_id,
        &request.mechanism,
    )?))
}

async fn make_offer(
    State(classroom): State<SharedClassroom>,
    Path((id, pair_id)): Path<(String, String)>,
    Json(request): Json<PriceRequest>,
) -> ApiResult<Json<Pair>> {
    let price = require_price(request.price)?;
    Ok(Json(classroom.make_offer(
        &id,
        &pair_id,
        &request.participant_id,
        price,
    )?))
}

async fn respond(
    State(classroom): State<SharedClassroom>,
    Path((id, pair_id)): Path<(String, String)>,
    Json(request): Json<ChoiceRequest>,
) -> ApiResult<Json<Pair>> {
    Ok(Json(classroom.respond(
        &id,
        &pair_id,
        &request.participant_id,
        &request.choice,
    )?))
}

async fn timed_ready(
    State(classroom): State<SharedClassroom>,
    Path((id, pair_id)): Path<(String, String)>,
    Json(request): Json<ParticipantRequest>,
) -> ApiResult<Json<Pair>> {
    Ok(Json(classroom.signal_ready(
        &id,
        &pair_id,
        &request.participant_id,
    )?))
}

async fn lock_timed(
    State(classroom): State<SharedClassroom>,
    Path((id, pair_id)): Path<(String, String)>,
    Json(request): Json<PriceRequest>,
) -> ApiResult<Json<Pair>> {
    // Omitted price is only acceptable when the server computes it.
    let reported = request
        .price
        .map(|price| require_price(Some(price)))
        .transpose()?;
    Ok(Json(classroom.lock_price(
        &id,
        &pair_id,
        &request.participant_id,
        reported,
    )?))
}

async fn final_choice(
    State(classroom): State<SharedClassroom>,
    Path((id, pair_id)): Path<(String, String)>,
    Json(request): Json<ChoiceRequest>,
) -> ApiResult<Json<Pair>> {
    Ok(Json(classroom.final_choice(
        &id,
        &pair_id,
        &request.participant_id,
        &request.choice,
    )?))
}
