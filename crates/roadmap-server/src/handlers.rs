//! Request handlers
//!
//! Handlers never reject: every outcome, including failures, is turned into
//! a response here so the error shape stays under our control.

use crate::reply::{error_response, json_response};
use crate::state::AppState;
use chrono::Utc;
use roadmap_artifact::{
    export_document, export_filename, BusinessProfile, Checksum, GeneratedContent, RenderedHtml,
};
use roadmap_core::{
    CoreError, GenerateRequest, OwnershipIdentity, QuotaIdentity, SaveReport, Tool,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::{Rejection, Reply};

type HandlerResult = Result<Response, Rejection>;

fn failure(state: &AppState, err: &CoreError) -> Response {
    error_response(err, state.environment.exposes_detail())
}

fn resolve_owner(state: &AppState, header: Option<&str>) -> Result<OwnershipIdentity, CoreError> {
    Ok(state.resolver.ownership_identity(header)?)
}

/// `POST /generate`
pub async fn generate(
    identity: Option<QuotaIdentity>,
    request: GenerateRequest,
    state: AppState,
) -> HandlerResult {
    Ok(match state.orchestrator.generate(identity.as_ref(), request).await {
        Ok(response) => json_response(&response, StatusCode::OK),
        Err(e) => failure(&state, &e),
    })
}

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    pub tool: Option<String>,
}

/// `GET /usage?tool=`
pub async fn usage(
    identity: Option<QuotaIdentity>,
    query: UsageQuery,
    state: AppState,
) -> HandlerResult {
    let Some(tool) = query.tool.as_deref().and_then(|t| t.parse::<Tool>().ok()) else {
        let err = ValidationError::field("tool", "must be 'business-credit' or 'funding-readiness'");
        return Ok(failure(&state, &err.into()));
    };
    let snapshot = state
        .orchestrator
        .governor()
        .usage(identity.as_ref(), tool)
        .await;
    Ok(json_response(&snapshot, StatusCode::OK))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenderRequest {
    pub profile: BusinessProfile,
    pub content: Value,
}

/// `POST /render`: re-render cached content; no quota, no generator
pub async fn render(request: RenderRequest) -> HandlerResult {
    let content = GeneratedContent::from_value(request.content);
    let rendered = RenderedHtml::new(&request.profile, &content);
    Ok(json_response(&rendered, StatusCode::OK))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyRequest {
    pub html: String,
    pub checksum: String,
}

#[derive(Debug, Serialize)]
struct VerifyResponse {
    valid: bool,
    checksum: Checksum,
}

/// `POST /verify`: does `checksum` still match `html`
pub async fn verify(request: VerifyRequest) -> HandlerResult {
    let actual = Checksum::of(&request.html);
    let valid = request
        .checksum
        .parse::<Checksum>()
        .is_ok_and(|claimed| claimed == actual);
    Ok(json_response(
        &VerifyResponse {
            valid,
            checksum: actual,
        },
        StatusCode::OK,
    ))
}

/// `POST /save`
pub async fn save(header: Option<String>, request: SaveReport, state: AppState) -> HandlerResult {
    let owner = match resolve_owner(&state, header.as_deref()) {
        Ok(owner) => owner,
        Err(e) => return Ok(failure(&state, &e)),
    };
    Ok(match state.reports.save(&owner, request).await {
        Ok(report) => json_response(&report.summary(), StatusCode::CREATED),
        Err(e) => failure(&state, &e),
    })
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub toolkit: Option<String>,
}

/// `GET /reports?toolkit=`
pub async fn list(header: Option<String>, query: ListQuery, state: AppState) -> HandlerResult {
    let result = async {
        let owner = resolve_owner(&state, header.as_deref())?;
        let toolkit = query
            .toolkit
            .ok_or_else(|| ValidationError::field("toolkit", "is required"))?;
        state.reports.list(&owner, &toolkit).await
    }
    .await;
    Ok(match result {
        Ok(summaries) => json_response(&json!({ "reports": summaries }), StatusCode::OK),
        Err(e) => failure(&state, &e),
    })
}

/// `GET /reports/:id`
pub async fn get(id: String, header: Option<String>, state: AppState) -> HandlerResult {
    let result = async {
        let owner = resolve_owner(&state, header.as_deref())?;
        state.reports.get(&owner, &id).await
    }
    .await;
    Ok(match result {
        Ok(report) => json_response(&report, StatusCode::OK),
        Err(e) => failure(&state, &e),
    })
}

/// `DELETE /reports/:id`
pub async fn delete(id: String, header: Option<String>, state: AppState) -> HandlerResult {
    let result = async {
        let owner = resolve_owner(&state, header.as_deref())?;
        state.reports.delete(&owner, &id).await
    }
    .await;
    Ok(match result {
        Ok(()) => reply::with_status(warp::reply(), StatusCode::NO_CONTENT).into_response(),
        Err(e) => failure(&state, &e),
    })
}

/// `GET /reports/:id/export`: stored HTML in a downloadable document
pub async fn export(id: String, header: Option<String>, state: AppState) -> HandlerResult {
    let result = async {
        let owner = resolve_owner(&state, header.as_deref())?;
        state.reports.get(&owner, &id).await
    }
    .await;
    let report = match result {
        Ok(report) => report,
        Err(e) => return Ok(failure(&state, &e)),
    };

    let document = export_document(&report.name, &report.html, &report.checksum, Utc::now());
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_filename(&report.name, &report.checksum)
    );
    Ok(reply::with_header(reply::html(document), "content-disposition", disposition).into_response())
}

/// `GET /healthz`
pub async fn health(state: AppState) -> HandlerResult {
    let usage = state.orchestrator.governor().store().ping().await;
    let reports = state.reports.store().ping().await;
    let status = |r: &Result<(), roadmap_core::StoreError>| if r.is_ok() { "ok" } else { "down" };

    let body = json!({
        "status": if usage.is_ok() && reports.is_ok() { "ok" } else { "degraded" },
        "usageStore": status(&usage),
        "reportStore": status(&reports),
        "version": crate::VERSION,
    });
    let code = if usage.is_ok() && reports.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok(json_response(&body, code))
}
