//! Mock project catalogue for the front page. Lives in memory only; records
//! added through `POST /api/projects` are gone on restart.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::routes::{ApiError, AppState};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub status: String,
    pub industry: String,
    pub funding_goal: f64,
    pub amount_raised: f64,
    pub investor_count: u32,
}

pub fn fixtures() -> Vec<Project> {
    [
        (
            "SolarGrid Co-op",
            "Community-owned rooftop solar for rural schools",
            "active",
            "Energy",
            50_000.0,
            32_500.0,
            41,
        ),
        (
            "MedChain Records",
            "Patient-held medical records with audited access",
            "active",
            "Healthcare",
            120_000.0,
            87_000.0,
            63,
        ),
        (
            "AquaSense",
            "Low-cost water quality sensors for smallholder farms",
            "funded",
            "Agriculture",
            25_000.0,
            25_000.0,
            29,
        ),
        (
            "OpenLedger Academy",
            "Free smart-contract security courses",
            "active",
            "Education",
            15_000.0,
            4_200.0,
            12,
        ),
        (
            "Harbor Logistics",
            "Container tracking for regional ports",
            "completed",
            "Logistics",
            200_000.0,
            200_000.0,
            118,
        ),
    ]
    .into_iter()
    .zip(1..)
    .map(
        |((name, description, status, industry, goal, raised, investors), id)| Project {
            id,
            name: name.to_string(),
            description: description.to_string(),
            status: status.to_string(),
            industry: industry.to_string(),
            funding_goal: goal,
            amount_raised: raised,
            investor_count: investors,
        },
    )
    .collect()
}

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    status: Option<String>,
    industry: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectList {
    success: bool,
    projects: Vec<Project>,
    total: usize,
    total_all: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    name: Option<String>,
    description: Option<String>,
    status: Option<String>,
    industry: Option<String>,
    funding_goal: Option<f64>,
}

fn matches(filter: &Option<String>, value: &str) -> bool {
    filter
        .as_deref()
        .is_none_or(|f| f.trim().is_empty() || f.trim().eq_ignore_ascii_case(value))
}

/// GET /api/projects — filter by `status` and `industry`, cap with `limit`.
pub async fn list<S, D>(
    State(state): State<Arc<AppState<S, D>>>,
    Query(query): Query<ProjectQuery>,
) -> impl IntoResponse {
    let projects = state.projects.read().await;
    let mut selected: Vec<Project> = projects
        .iter()
        .filter(|p| matches(&query.status, &p.status) && matches(&query.industry, &p.industry))
        .cloned()
        .collect();
    if let Some(limit) = query.limit {
        selected.truncate(limit);
    }

    Json(ProjectList {
        success: true,
        total: selected.len(),
        total_all: projects.len(),
        projects: selected,
    })
}

/// POST /api/projects — append a mock project.
pub async fn create<S, D>(
    State(state): State<Arc<AppState<S, D>>>,
    payload: Result<Json<NewProject>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let Some(name) = body.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) else {
        return Err(ApiError::bad_request("Project name is required"));
    };

    let mut projects = state.projects.write().await;
    let project = Project {
        id: projects.iter().map(|p| p.id).max().unwrap_or(0) + 1,
        name,
        description: body.description.unwrap_or_default(),
        status: body.status.unwrap_or_else(|| "active".to_string()),
        industry: body.industry.unwrap_or_else(|| "Other".to_string()),
        funding_goal: body.funding_goal.unwrap_or(0.0),
        amount_raised: 0.0,
        investor_count: 0,
    };
    projects.push(project.clone());
    tracing::debug!(id = project.id, "Mock project added");

    Ok((
        axum::http::StatusCode::CREATED,
        Json(serde_json::json!({ "success": true, "project": project })),
    ))
}

#[cfg(test)]
mod tests {
    use crate::routes::tests::{MemoryStore, send, state_with};
    use axum::http::StatusCode;
    use tranche_core::MilestoneFailurePolicy;

    #[tokio::test]
    async fn filters_are_case_insensitive() {
        let state = state_with(MemoryStore::default(), MilestoneFailurePolicy::Keep);

        let uri = "/api/projects?status=ACTIVE&industry=energy";
        let (status, json) = send(state, "GET", uri, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 1);
        assert_eq!(json["totalAll"], 5);
        assert_eq!(json["projects"][0]["name"], "SolarGrid Co-op");
    }

    #[tokio::test]
    async fn limit_caps_the_page_not_the_total() {
        let state = state_with(MemoryStore::default(), MilestoneFailurePolicy::Keep);

        let (_, json) = send(state, "GET", "/api/projects?status=active&limit=2", None).await;

        assert_eq!(json["projects"].as_array().unwrap().len(), 2);
        assert_eq!(json["total"], 2);
        assert_eq!(json["totalAll"], 5);
    }

    #[tokio::test]
    async fn created_project_is_listed() {
        let state = state_with(MemoryStore::default(), MilestoneFailurePolicy::Keep);

        let (status, _) = send(
            state.clone(),
            "POST",
            "/api/projects",
            Some(serde_json::json!({"description": "no name"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = send(
            state.clone(),
            "POST",
            "/api/projects",
            Some(serde_json::json!({"name": "Tidal Labs", "industry": "Energy"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["project"]["id"], 6);

        let (status, json) = send(
            state.clone(),
            "POST",
            "/api/projects",
            Some(serde_json::json!({"name": "Tidal Labs", "fundingGoal": "lots"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let (_, json) = send(state, "GET", "/api/projects?industry=Energy", None).await;
        assert_eq!(json["total"], 2);
        assert_eq!(json["totalAll"], 6);
    }
}
