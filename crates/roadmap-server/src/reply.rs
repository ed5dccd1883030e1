//! Error responses
//!
//! Every failure leaves the server as `{"error": "...", ...}` with a stable
//! status code. Provider and store detail is attached only in development.

use roadmap_artifact::FieldIssue;
use roadmap_core::{CoreError, GenerationCause, IdentityError, StoreError, Tool};
use serde::Serialize;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

/// JSON body with a status code
pub(crate) fn json_response<T: Serialize>(body: &T, status: StatusCode) -> Response {
    reply::with_status(reply::json(body), status).into_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuotaBody {
    error: &'static str,
    limit_reached: bool,
    count: u32,
    limit: u32,
    tool: Tool,
}

#[derive(Debug, Serialize)]
struct ValidationBody<'a> {
    error: &'static str,
    fields: &'a [FieldIssue],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationBody {
    error: &'static str,
    cause: GenerationCause,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// Message and status for a generator failure class
#[must_use]
pub fn generation_status(cause: GenerationCause) -> (StatusCode, &'static str) {
    match cause {
        GenerationCause::Auth => (
            StatusCode::UNAUTHORIZED,
            "The generation service rejected our credentials",
        ),
        GenerationCause::Quota | GenerationCause::RateLimited => (
            StatusCode::SERVICE_UNAVAILABLE,
            "The generation service is busy, please try again later",
        ),
        GenerationCause::Timeout => (
            StatusCode::GATEWAY_TIMEOUT,
            "The generation service took too long to respond",
        ),
        GenerationCause::Unexpected => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Roadmap generation failed",
        ),
    }
}

/// Convert a core error to its response
#[must_use]
pub fn error_response(err: &CoreError, expose_detail: bool) -> Response {
    if err.is_client_error() {
        tracing::debug!(error = %err, "request refused");
    } else if let CoreError::Store(e) = err {
        tracing::error!(error = %e, "store failure");
    }

    match err {
        CoreError::QuotaExceeded { tool, count, limit } => json_response(
            &QuotaBody {
                error: "Usage limit reached",
                limit_reached: true,
                count: *count,
                limit: *limit,
                tool: *tool,
            },
            StatusCode::TOO_MANY_REQUESTS,
        ),
        CoreError::Validation(v) => json_response(
            &ValidationBody {
                error: "Invalid request",
                fields: &v.fields,
            },
            StatusCode::BAD_REQUEST,
        ),
        CoreError::IdentityUnresolved(e) => {
            let message = match e {
                IdentityError::MissingOwnership => "X-Client-Id header is required",
                IdentityError::InvalidOwnership => {
                    "X-Client-Id header must be 1-128 visible ASCII characters"
                }
            };
            json_response(
                &ErrorBody {
                    error: message,
                    detail: None,
                },
                StatusCode::BAD_REQUEST,
            )
        }
        CoreError::Generation(e) => {
            let (status, message) = generation_status(e.cause);
            json_response(
                &GenerationBody {
                    error: message,
                    cause: e.cause,
                    detail: expose_detail.then(|| e.detail.clone()),
                },
                status,
            )
        }
        CoreError::Store(e) => {
            let (status, message) = match e {
                StoreError::Unavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "Storage is unavailable")
                }
                StoreError::Corrupt(_) | StoreError::Conflict(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Storage error")
                }
            };
            json_response(
                &ErrorBody {
                    error: message,
                    detail: expose_detail.then(|| e.to_string()),
                },
                status,
            )
        }
        CoreError::NotFound => json_response(
            &ErrorBody {
                error: "Report not found",
                detail: None,
            },
            StatusCode::NOT_FOUND,
        ),
    }
}

/// `{error, detail?}` response; callers decide whether detail may be shown
pub(crate) fn detail_response(message: &str, detail: Option<String>, status: StatusCode) -> Response {
    json_response(
        &ErrorBody {
            error: message,
            detail,
        },
        status,
    )
}
