//! REST handlers: assignment redirects, survey content, submissions, and
//! operational endpoints.

use crate::cookies;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use survey_core::{AssignmentResolver, ResultRecorder, SurveyFamily};
use tracing::{error, info, warn};

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<AssignmentResolver>,
    pub results: Arc<dyn ResultRecorder>,
    pub service_name: String,
    pub content_dir: PathBuf,
    pub static_dir: PathBuf,
    pub cookie_max_age_secs: u64,
}

/// The optional language path segment must be exactly two ASCII
/// lowercase letters.
fn valid_lang(lang: &str) -> bool {
    lang.len() == 2 && lang.bytes().all(|b| b.is_ascii_lowercase())
}

/// Shared assignment flow for the three family endpoints.
fn assign(
    state: &AppState,
    family: SurveyFamily,
    lang: Option<String>,
    headers: &HeaderMap,
) -> Response {
    if let Some(lang) = &lang {
        if !valid_lang(lang) {
            return StatusCode::NOT_FOUND.into_response();
        }
    }

    let cookie_name = format!(
        "{}-{}",
        family.cookie_prefix(),
        lang.as_deref().unwrap_or(survey_core::resolver::DEFAULT_LANGUAGE)
    );
    let existing = cookies::get_cookie(headers, &cookie_name);

    let assignment = state
        .resolver
        .resolve(family, lang.as_deref(), existing.as_deref());

    let location = format!("/survey/{}/{}", assignment.variant, assignment.language);
    let mut response = Redirect::to(&location).into_response();

    if let Some(token) = &assignment.token {
        info!(
            %family,
            survey = %assignment.variant,
            language = %assignment.language,
            "Assigned survey variant"
        );
        let cookie =
            cookies::assignment_cookie(&assignment.cookie_name, token, state.cookie_max_age_secs);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => {
                // Tokens are base64; this indicates a codec bug.
                error!(error = %e, cookie = %assignment.cookie_name, "Assignment cookie is not a valid header value");
            }
        }
    }

    response
}

/// GET /feedback and /feedback/{lang} — feedback assignment endpoint.
pub async fn assign_feedback(
    State(state): State<AppState>,
    lang: Option<Path<String>>,
    headers: HeaderMap,
) -> Response {
    assign(&state, SurveyFamily::Feedback, lang.map(|Path(l)| l), &headers)
}

/// GET /poll and /poll/{lang} — poll assignment endpoint.
pub async fn assign_poll(
    State(state): State<AppState>,
    lang: Option<Path<String>>,
    headers: HeaderMap,
) -> Response {
    assign(&state, SurveyFamily::Poll, lang.map(|Path(l)| l), &headers)
}

/// GET /employee and /employee/{lang} — employee assignment endpoint.
pub async fn assign_employee(
    State(state): State<AppState>,
    lang: Option<Path<String>>,
    headers: HeaderMap,
) -> Response {
    assign(&state, SurveyFamily::Employee, lang.map(|Path(l)| l), &headers)
}

/// A path segment that is safe to join under a content directory.
fn safe_component(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// GET /survey/{survey_name}/{lang} — serves the survey-rendering shell.
pub async fn survey_page(State(state): State<AppState>) -> Response {
    match tokio::fs::read_to_string(state.static_dir.join("index.html")).await {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            error!(error = %e, "Survey shell index.html is missing");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// GET /api/surveys/{survey_name}/{lang} — survey definition document.
pub async fn get_survey(
    State(state): State<AppState>,
    Path((survey_name, lang)): Path<(String, String)>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    if !safe_component(&survey_name) || !safe_component(&lang) {
        return Err(not_found("Survey not found"));
    }

    let path = state
        .content_dir
        .join(&survey_name)
        .join(format!("{lang}.json"));

    match tokio::fs::read(&path).await {
        Ok(body) => Ok((
            [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body,
        )
            .into_response()),
        Err(_) => {
            warn!(survey = %survey_name, language = %lang, "Survey definition not found");
            Err(not_found("Survey not found"))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveSurveyRequest {
    pub survey_name: String,
    pub survey_language: String,
    pub survey_data: serde_json::Value,
}

#[derive(Serialize)]
pub struct SaveSurveyResponse {
    pub message: String,
    pub id: i64,
}

/// POST /api/save-survey — persist a completed submission.
pub async fn save_survey(
    State(state): State<AppState>,
    body: Result<Json<SaveSurveyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SaveSurveyResponse>), (StatusCode, Json<ErrorResponse>)> {
    // Reject malformed bodies at the boundary; nothing is persisted.
    let Json(request) = body.map_err(|e| {
        warn!(error = %e, "Rejected malformed save-survey body");
        metrics::counter!("api.validation_errors").increment(1);
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "invalid_request_body".to_string(),
                message: "Invalid request body".to_string(),
            }),
        )
    })?;

    match state.results.save_result(
        &request.survey_name,
        &request.survey_language,
        &request.survey_data,
    ) {
        Ok(id) => {
            info!(id, survey = %request.survey_name, "Survey saved");
            metrics::counter!("api.surveys_saved").increment(1);
            Ok((
                StatusCode::CREATED,
                Json(SaveSurveyResponse {
                    message: "Survey saved successfully!".to_string(),
                    id,
                }),
            ))
        }
        Err(e) => {
            error!(error = %e, survey = %request.survey_name, "Failed to save survey");
            metrics::counter!("api.errors").increment(1);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "save_failed".to_string(),
                    message: "Error saving survey data".to_string(),
                }),
            ))
        }
    }
}

/// GET /health — health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.service_name.clone(),
    })
}

/// Fallback: thin static file serving from the public directory.
pub async fn static_file(State(state): State<AppState>, uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };

    if path.split('/').any(|segment| {
        segment.is_empty() || segment.starts_with('.') || !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }) {
        return StatusCode::NOT_FOUND.into_response();
    }

    match tokio::fs::read(state.static_dir.join(path)).await {
        Ok(body) => {
            let content_type = match path.rsplit('.').next() {
                Some("html") => "text/html; charset=utf-8",
                Some("js") => "application/javascript",
                Some("css") => "text/css",
                Some("json") => "application/json",
                Some("svg") => "image/svg+xml",
                Some("png") => "image/png",
                Some("ico") => "image/x-icon",
                _ => "application/octet-stream",
            };
            (
                [(CONTENT_TYPE, HeaderValue::from_static(content_type))],
                body,
            )
                .into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

fn not_found(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "not_found".to_string(),
            message: message.to_string(),
        }),
    )
}
