//! Route table
//!
//! Filters only extract identities, bodies and state; every decision is made
//! in [`crate::handlers`]. Rejections that escape the handlers (unknown path,
//! wrong method, malformed body) are rendered by [`handle_rejection`] in the
//! same `{error}` shape as handler failures.

use crate::handlers;
use crate::reply::detail_response;
use crate::state::AppState;
use roadmap_core::{IdentityResolver, QuotaIdentity, FORWARDED_FOR_HEADER, OWNERSHIP_HEADER};
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::net::SocketAddr;
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::reject;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Quota identity from the peer address, or the first forwarded hop when trusted
fn quota_identity(
    resolver: IdentityResolver,
) -> impl Filter<Extract = (Option<QuotaIdentity>,), Error = Rejection> + Clone {
    warp::addr::remote()
        .and(warp::header::optional::<String>(FORWARDED_FOR_HEADER))
        .map(move |peer: Option<SocketAddr>, forwarded: Option<String>| {
            resolver.quota_identity(peer, forwarded.as_deref())
        })
}

/// Raw ownership header; validated in the handler so absence is a 400, not a rejection
fn ownership_header() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::header::optional::<String>(OWNERSHIP_HEADER)
}

fn json_body<T: DeserializeOwned + Send>(
    limit: u64,
) -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(limit).and(warp::body::json())
}

/// Build the full filter tree
pub fn routes(
    state: AppState,
    max_body_bytes: u64,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let resolver = state.resolver;
    let expose_detail = state.environment.exposes_detail();

    let generate = warp::path!("generate")
        .and(warp::post())
        .and(quota_identity(resolver))
        .and(json_body(max_body_bytes))
        .and(with_state(state.clone()))
        .and_then(handlers::generate);

    let usage = warp::path!("usage")
        .and(warp::get())
        .and(quota_identity(resolver))
        .and(warp::query::<handlers::UsageQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::usage);

    let render = warp::path!("render")
        .and(warp::post())
        .and(json_body(max_body_bytes))
        .and_then(handlers::render);

    let verify = warp::path!("verify")
        .and(warp::post())
        .and(json_body(max_body_bytes))
        .and_then(handlers::verify);

    let save = warp::path!("save")
        .and(warp::post())
        .and(ownership_header())
        .and(json_body(max_body_bytes))
        .and(with_state(state.clone()))
        .and_then(handlers::save);

    let list = warp::path!("reports")
        .and(warp::get())
        .and(ownership_header())
        .and(warp::query::<handlers::ListQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::list);

    let get = warp::path!("reports" / String)
        .and(warp::get())
        .and(ownership_header())
        .and(with_state(state.clone()))
        .and_then(handlers::get);

    let delete = warp::path!("reports" / String)
        .and(warp::delete())
        .and(ownership_header())
        .and(with_state(state.clone()))
        .and_then(handlers::delete);

    let export = warp::path!("reports" / String / "export")
        .and(warp::get())
        .and(ownership_header())
        .and(with_state(state.clone()))
        .and_then(handlers::export);

    let health = warp::path!("healthz")
        .and(warp::get())
        .and(with_state(state))
        .and_then(handlers::health);

    generate
        .or(usage)
        .or(render)
        .or(verify)
        .or(save)
        .or(list)
        .or(get)
        .or(delete)
        .or(export)
        .or(health)
        .recover(move |err| handle_rejection(err, expose_detail))
        .with(warp::trace::request())
}

/// Render a rejection as `{error}`
///
/// Body parse errors carry the serde message as `detail` only when
/// `expose_detail` is set.
pub async fn handle_rejection(err: Rejection, expose_detail: bool) -> Result<Response, Infallible> {
    let mut detail = None;
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        detail = expose_detail.then(|| e.to_string());
        (StatusCode::BAD_REQUEST, "Invalid JSON body")
    } else if err.find::<reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large")
    } else if err.find::<reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length header is required")
    } else if err.find::<reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Request body must be application/json",
        )
    } else if err.find::<reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string")
    } else if err.find::<reject::InvalidHeader>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid header value")
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        tracing::error!(rejection = ?err, "unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    };

    metrics::counter!("roadmap_http_rejections_total", "status" => status.as_u16().to_string())
        .increment(1);
    Ok(detail_response(message, detail, status))
}
