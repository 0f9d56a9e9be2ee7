use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::{Error, Result},
    services::stats_service::{ReportKind, StatsReport},
    AppState,
};

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(default)]
#[into_params(parameter_in = Query)]
pub struct StatsQuery {
    /// Report name, `geral` when omitted
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[utoipa::path(
    get,
    path = "/stats",
    params(StatsQuery),
    responses(
        (status = 200, description = "Report wrapped under its own name"),
        (status = 400, description = "Unsupported report type"),
        (status = 500, description = "Storage failure")
    )
)]
#[axum::debug_handler]
pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsReport>> {
    let kind = query
        .kind
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .unwrap_or("geral")
        .parse::<ReportKind>()
        .map_err(|e| {
            tracing::warn!(report = ?query.kind, "Unsupported report type requested");
            e
        })?;

    let report = state.stats_service.report(kind).await.map_err(|e| {
        tracing::error!(error = ?e, report = %kind, "Failed to build report");
        Error::Internal("Erro ao obter estatísticas".to_string())
    })?;
    Ok(Json(report))
}
