//! Classifier page: GET / and the POST /classify form target

use axum::{
    extract::{Multipart, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classify::classify_bytes;
use crate::error::{ApiError, ApiResult};
use crate::render::{render_page, PageView};
use crate::session::{session_cookie, session_id_from_headers, SessionContext};
use crate::AppState;

const IMAGE_FIELD: &str = "image";

const MODEL_NOT_LOADED: &str =
    "The classifier model is not loaded yet. Submitting an image retries loading it.";

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub label: Option<String>,
}

/// GET /
pub async fn root_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response {
    let session = match session_id_from_headers(&headers) {
        Some(id) => state.sessions.get(id).await,
        None => None,
    };
    let error = (!state.model.loaded()).then_some(MODEL_NOT_LOADED);

    Html(page_html(&state, session.as_ref(), query.label.as_deref(), error)).into_response()
}

/// POST /classify
///
/// Success stores the result in the caller's session and redirects to `/`.
/// Failure re-renders the page with the error and the error's status.
pub async fn classify_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let session_id = session_id_from_headers(&headers).unwrap_or_else(Uuid::new_v4);

    let result = async {
        let bytes = read_image_field(multipart).await?;
        classify_bytes(&state, bytes).await
    }
    .await;

    let mut response = match result {
        Ok(classified) => {
            info!(
                "Session {}: predicted {:?}",
                session_id, classified.prediction.label
            );
            state
                .sessions
                .record(session_id, classified.preview, classified.prediction)
                .await;
            Redirect::to("/").into_response()
        }
        Err(e) => {
            warn!("Session {}: classify failed: {}", session_id, e);
            let message = e.to_string();
            let session = state.sessions.get(session_id).await;
            (
                e.status(),
                Html(page_html(&state, session.as_ref(), None, Some(&message))),
            )
                .into_response()
        }
    };

    match HeaderValue::from_str(&session_cookie(session_id)) {
        Ok(cookie) => {
            response.headers_mut().insert(header::SET_COOKIE, cookie);
        }
        Err(e) => warn!("Invalid session cookie value: {}", e),
    }
    response
}

fn page_html(
    state: &AppState,
    session: Option<&SessionContext>,
    requested_label: Option<&str>,
    error: Option<&str>,
) -> String {
    let vocab = state.vocab();
    render_page(&PageView {
        vocab: &vocab,
        registry: &state.registry,
        session,
        requested_label,
        error,
    })
}

/// Bytes of the `image` form field; other fields are skipped
async fn read_image_field(mut multipart: Multipart) -> ApiResult<axum::body::Bytes> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e.status(), e.body_text()))?
    {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| multipart_error(e.status(), e.body_text()))?;
            debug!("Received {} byte image field", bytes.len());
            return Ok(bytes);
        }
    }
    Err(ApiError::BadRequest(format!(
        "Form field {:?} is missing",
        IMAGE_FIELD
    )))
}

fn multipart_error(status: StatusCode, message: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("The uploaded image is too large".to_string())
    } else {
        ApiError::BadRequest(message)
    }
}
