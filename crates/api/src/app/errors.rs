use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use shopdesk_ai::InsightError;
use shopdesk_store::RepoError;

pub fn insight_error_to_response(err: InsightError) -> axum::response::Response {
    let status = match &err {
        InsightError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        InsightError::ShopContextMissing => StatusCode::BAD_REQUEST,
        InsightError::DataUnavailable(_) => StatusCode::NOT_FOUND,
        InsightError::GenerationFailure(_) | InsightError::ParseFailure(_) => StatusCode::BAD_GATEWAY,
    };
    json_error(status, err.code(), err.to_string())
}

pub fn repo_error_to_response(err: RepoError) -> axum::response::Response {
    match err {
        RepoError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        RepoError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        RepoError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        RepoError::Storage(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", "storage failure")
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
