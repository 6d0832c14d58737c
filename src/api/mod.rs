//! REST endpoints for roster browsing, composing, rewriting and handoff.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::composer::{self, Composer, RewriteFacts, SUBJECT};
use crate::error::{Error, MailError, RewriteError, SessionError};
use crate::rewrite::{RewriteRequest, Rewriter};
use crate::roster::{self, LegislatorRecord, RosterSource};
use crate::session::{OutreachSession, RewriteOutcome, SessionStore};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub roster: Arc<dyn RosterSource>,
    pub composer: Arc<Composer>,
    /// None when no rewriting provider is configured.
    pub rewriter: Option<Arc<Rewriter>>,
    pub sessions: Arc<SessionStore>,
    /// Sender for `.eml` drafts.
    pub from_address: Option<String>,
    /// Web-mail compose endpoint for the send handoff.
    pub compose_base: String,
}

/// Build the Axum router.
pub fn outreach_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/reps", get(list_reps))
        .route("/api/states", get(list_states))
        .route("/api/compose", post(compose))
        .route("/api/personalize", post(personalize))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/reload", post(reload_session))
        .route("/api/sessions/{id}/filter", post(filter_session))
        .route("/api/sessions/{id}/select", post(select_record))
        .route("/api/sessions/{id}/close", post(close_selection))
        .route("/api/sessions/{id}/org", post(set_org_name))
        .route("/api/sessions/{id}/text", post(edit_text))
        .route("/api/sessions/{id}/personalize", post(personalize_session))
        .route("/api/sessions/{id}/send", post(send_email))
        .route("/api/sessions/{id}/draft", get(download_draft))
        .route(
            "/api/sessions/{id}/notices/{notice_id}/dismiss",
            post(dismiss_notice),
        )
        .with_state(state)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

// ── Errors ──────────────────────────────────────────────────────────────

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Error::Fetch(_) => StatusCode::BAD_GATEWAY,
            Error::Rewrite(e) => match e {
                RewriteError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                RewriteError::NoSelection | RewriteError::InFlight => StatusCode::CONFLICT,
                RewriteError::Llm(_) | RewriteError::EmptyOutput => StatusCode::BAD_GATEWAY,
            },
            Error::Mail(e) => match e {
                MailError::SenderNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                MailError::NoRecipients | MailError::InvalidAddress { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                MailError::InvalidUrl(_) | MailError::Build(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Session(e) => match e {
                SessionError::InvalidId(_) | SessionError::RecordOutOfRange { .. } => {
                    StatusCode::BAD_REQUEST
                }
                SessionError::NotFound(_) => StatusCode::NOT_FOUND,
                SessionError::NoSelection => StatusCode::CONFLICT,
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, Error>;

fn parse_id(raw: &str) -> Result<Uuid, SessionError> {
    Uuid::parse_str(raw).map_err(|_| SessionError::InvalidId(raw.to_string()))
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "rep-outreach"
    }))
}

// ── Roster ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct RosterQuery {
    state: Option<String>,
    #[serde(default)]
    q: String,
}

async fn list_reps(
    State(state): State<AppState>,
    Query(query): Query<RosterQuery>,
) -> ApiResult<impl IntoResponse> {
    let roster = roster::load_roster(state.roster.as_ref()).await?;
    let reps: Vec<LegislatorRecord> =
        roster::filter_records(&roster.records, query.state.as_deref(), &query.q)
            .into_iter()
            .map(|(_, r)| r.clone())
            .collect();
    Ok(Json(reps))
}

async fn list_states(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let roster = roster::load_roster(state.roster.as_ref()).await?;
    Ok(Json(serde_json::json!({
        "states": roster.jurisdictions(),
        "counts": roster::jurisdiction_counts(&roster.records),
    })))
}

// ── Stateless compose / personalize ─────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComposeBody {
    rep: LegislatorRecord,
    #[serde(default)]
    org_name: String,
}

async fn compose(
    State(state): State<AppState>,
    Json(body): Json<ComposeBody>,
) -> impl IntoResponse {
    let email = state.composer.compose(&body.rep, &body.org_name);
    Json(serde_json::json!({
        "email": email,
        "subject": SUBJECT,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonalizeBody {
    original_email: String,
    rep_name: String,
    rep_info: LegislatorRecord,
}

async fn personalize(
    State(state): State<AppState>,
    Json(body): Json<PersonalizeBody>,
) -> ApiResult<impl IntoResponse> {
    let rewriter = state.rewriter.as_ref().ok_or(RewriteError::NotConfigured)?;
    // Only reattach the letter if it was stripped; otherwise the model saw it.
    let stripped = composer::split_reference(&body.original_email);
    let request = RewriteRequest {
        main_body_text: stripped.unwrap_or(&body.original_email).to_string(),
        legislator_name: body.rep_name.clone(),
        facts: RewriteFacts::from(&body.rep_info),
    };
    let rewritten = rewriter.rewrite(&request).await?;
    let personalized = match stripped {
        Some(_) => composer::reattach_reference(&rewritten),
        None => rewritten,
    };
    Ok(Json(serde_json::json!({
        "personalizedEmail": personalized,
    })))
}

// ── Sessions ────────────────────────────────────────────────────────────

async fn create_session(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let roster = roster::load_roster(state.roster.as_ref()).await?;
    let session = OutreachSession::new(roster);
    let snapshot = session.snapshot();
    state.sessions.insert(session).await;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let snapshot = state.sessions.with_session(id, |s| s.snapshot()).await?;
    Ok(Json(snapshot))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(SessionError::NotFound(id).into())
    }
}

async fn reload_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    // Fail fast on unknown ids before going to the network.
    state.sessions.with_session(id, |_| ()).await?;

    match roster::load_roster(state.roster.as_ref()).await {
        Ok(roster) => {
            let snapshot = state
                .sessions
                .with_session(id, |s| {
                    s.replace_roster(roster);
                    s.snapshot()
                })
                .await?;
            Ok(Json(snapshot).into_response())
        }
        Err(e) => {
            let notice = state
                .sessions
                .with_session(id, |s| s.roster_load_failed(&e))
                .await?;
            Ok((
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({
                    "error": e.to_string(),
                    "notice": notice,
                })),
            )
                .into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
struct FilterBody {
    state: Option<String>,
    #[serde(default)]
    q: String,
}

async fn filter_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<FilterBody>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let visible = state
        .sessions
        .with_session(id, |s| {
            s.set_filter(body.state);
            s.set_search(body.q);
            s.visible()
        })
        .await?;
    Ok(Json(visible))
}

#[derive(Debug, Deserialize)]
struct SelectBody {
    index: usize,
}

async fn select_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SelectBody>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let composer = Arc::clone(&state.composer);
    let snapshot = state
        .sessions
        .with_session(id, |s| {
            s.select(&composer, body.index)?;
            Ok::<_, SessionError>(s.snapshot())
        })
        .await??;
    Ok(Json(snapshot))
}

async fn close_selection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let snapshot = state
        .sessions
        .with_session(id, |s| {
            s.close_selection();
            s.snapshot()
        })
        .await?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrgBody {
    org_name: String,
}

async fn set_org_name(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<OrgBody>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let composer = Arc::clone(&state.composer);
    let snapshot = state
        .sessions
        .with_session(id, |s| {
            s.set_org_name(&composer, body.org_name);
            s.snapshot()
        })
        .await?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
struct TextBody {
    text: String,
}

async fn edit_text(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<TextBody>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let view = state
        .sessions
        .with_session(id, |s| s.edit_text(body.text).cloned())
        .await??;
    Ok(Json(view))
}

/// Rewrite round-trip. The session lock is released while the provider
/// call is outstanding; the ticket decides whether the result still applies.
async fn personalize_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let rewriter = state
        .rewriter
        .clone()
        .ok_or(RewriteError::NotConfigured)?;
    let composer = Arc::clone(&state.composer);

    let (ticket, request) = state
        .sessions
        .with_session(id, |s| s.begin_rewrite(&composer))
        .await??;
    info!(
        session = %id,
        request_id = ticket.request_id,
        legislator = %request.legislator_name,
        model = rewriter.model_name(),
        "Rewrite started"
    );

    let result = rewriter.rewrite(&request).await;

    let (outcome, view) = state
        .sessions
        .with_session(id, |s| {
            let outcome = s.complete_rewrite(ticket, result);
            (outcome, s.view().cloned())
        })
        .await?;

    let response = match outcome {
        RewriteOutcome::Applied => Json(serde_json::json!({
            "outcome": "applied",
            "composer": view,
        }))
        .into_response(),
        RewriteOutcome::Stale => Json(serde_json::json!({
            "outcome": "stale",
            "composer": view,
        }))
        .into_response(),
        RewriteOutcome::Failed(notice) => {
            warn!(session = %id, "Rewrite failed, text kept");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({
                    "outcome": "failed",
                    "error": notice.message,
                    "notice": notice,
                    "composer": view,
                })),
            )
                .into_response()
        }
    };
    Ok(response)
}

async fn send_email(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let sent = state
        .sessions
        .with_session(id, |s| s.send(&state.compose_base))
        .await??;
    Ok(Json(sent))
}

async fn download_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let from = state
        .from_address
        .clone()
        .ok_or(MailError::SenderNotConfigured)?;
    let eml = state.sessions.with_session(id, |s| s.draft(&from)).await??;
    Ok((
        [
            (header::CONTENT_TYPE, "message/rfc822"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"outreach.eml\""),
        ],
        eml,
    ))
}

async fn dismiss_notice(
    State(state): State<AppState>,
    Path((id, notice_id)): Path<(String, u64)>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let dismissed = state
        .sessions
        .with_session(id, |s| s.dismiss_notice(notice_id))
        .await?;
    Ok(Json(serde_json::json!({ "dismissed": dismissed })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, LlmError};

    #[test]
    fn error_status_mapping() {
        let cases: Vec<(Error, StatusCode)> = vec![
            (FetchError::Transport("x".into()).into(), StatusCode::BAD_GATEWAY),
            (RewriteError::NotConfigured.into(), StatusCode::SERVICE_UNAVAILABLE),
            (RewriteError::InFlight.into(), StatusCode::CONFLICT),
            (RewriteError::EmptyOutput.into(), StatusCode::BAD_GATEWAY),
            (
                RewriteError::Llm(LlmError::RequestFailed {
                    provider: "p".into(),
                    reason: "r".into(),
                })
                .into(),
                StatusCode::BAD_GATEWAY,
            ),
            (MailError::SenderNotConfigured.into(), StatusCode::SERVICE_UNAVAILABLE),
            (MailError::NoRecipients.into(), StatusCode::UNPROCESSABLE_ENTITY),
            (SessionError::InvalidId("nope".into()).into(), StatusCode::BAD_REQUEST),
            (SessionError::NotFound(Uuid::nil()).into(), StatusCode::NOT_FOUND),
            (
                SessionError::RecordOutOfRange { index: 9, len: 1 }.into(),
                StatusCode::BAD_REQUEST,
            ),
            (SessionError::NoSelection.into(), StatusCode::CONFLICT),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err}");
        }
    }

    #[test]
    fn parse_id_rejects_garbage() {
        assert!(matches!(parse_id("not-a-uuid"), Err(SessionError::InvalidId(_))));
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
    }
}
