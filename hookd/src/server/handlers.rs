//! HTTP request handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::deploy::coordinator::{PushEvent, TriggerOutcome};
use crate::deploy::lock::LockStatus;
use crate::registry::ProjectSummary;
use crate::server::state::ServerState;

/// Generic error payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Health check handler (minimal info, unauthenticated)
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Project listing response
#[derive(Debug, Serialize)]
pub struct ProjectsResponse {
    pub projects: Vec<ProjectSummary>,
}

/// Project listing handler
pub async fn projects_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let snapshot = state.registry.snapshot().await;
    Json(ProjectsResponse {
        projects: snapshot.summaries(),
    })
}

/// Deployment status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub deploying: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StatusResponse {
    pub fn from_status(status: &LockStatus) -> Self {
        match status {
            LockStatus::Idle => Self {
                deploying: false,
                project: None,
                pid: None,
                started: None,
                note: None,
            },
            LockStatus::Busy {
                project,
                pid,
                started,
            } => Self {
                deploying: true,
                project: Some(project.clone()),
                pid: Some(*pid),
                started: Some(started.clone()),
                note: None,
            },
            LockStatus::Stale { .. } => Self {
                deploying: false,
                project: None,
                pid: None,
                started: None,
                note: Some("stale lock detected".to_string()),
            },
        }
    }
}

/// Deployment status handler (read-only, unauthenticated)
pub async fn status_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let status = state.lock.status().await;
    Json(StatusResponse::from_status(&status))
}

/// Soft no-op response for unconfigured repos and branches
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Accepted deployment response
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: String,
    pub message: String,
    pub project: String,
    pub repo: String,
    pub branch: String,
    pub triggered_by: String,
}

/// Busy response, carrying the in-progress deployment's identity
#[derive(Debug, Serialize)]
pub struct BusyResponse {
    pub status: String,
    pub message: String,
    pub details: StatusResponse,
}

/// Main deployment webhook handler.
///
/// Answers immediately: 202 means a supervised run was started, not that
/// it will succeed.
pub async fn deploy_handler(State(state): State<Arc<ServerState>>, body: Bytes) -> Response {
    let event = PushEvent::from_body(&body);

    match state.coordinator.trigger(&event).await {
        Ok(TriggerOutcome::NotConfigured { repo }) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: format!("Repository {} not configured", repo),
            }),
        )
            .into_response(),
        Ok(TriggerOutcome::BranchNotConfigured { branch }) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: format!("Branch {} not configured for deployment", branch),
            }),
        )
            .into_response(),
        Ok(TriggerOutcome::Busy { status }) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(BusyResponse {
                status: "busy".to_string(),
                message: "Another deployment is in progress".to_string(),
                details: StatusResponse::from_status(&status),
            }),
        )
            .into_response(),
        Ok(TriggerOutcome::Accepted {
            project,
            repo,
            branch,
            triggered_by,
        }) => (
            StatusCode::ACCEPTED,
            Json(AcceptedResponse {
                status: "accepted".to_string(),
                message: "Deployment started".to_string(),
                project,
                repo,
                branch,
                triggered_by,
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// Config reload response
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub message: String,
    pub projects: Vec<String>,
}

/// Config reload handler (synchronous)
pub async fn reload_config_handler(State(state): State<Arc<ServerState>>) -> Response {
    match state.registry.reload().await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(ReloadResponse {
                message: "Configuration reloaded".to_string(),
                projects: snapshot.project_names(),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}
