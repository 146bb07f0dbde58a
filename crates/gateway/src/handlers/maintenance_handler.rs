//! Machine diagnostics handler.

use axum::{
    extract::{Extension, State},
    response::Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use common::AppResult;
use domain::Request;
use marketplace_lib::service::{Analysis, HealthStatus, MachineReading, SensorSample};

use crate::extractors::ValidatedJson;
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SampleBody {
    /// Degrees Celsius
    pub temp: f64,
    /// Hz
    pub vibration: f64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsRequest {
    #[validate(length(min = 1, message = "Machine name is required"))]
    #[schema(example = "Hydraulic Press HP5")]
    pub name: String,
    #[schema(example = "Hydraulic Press")]
    pub machine_type: String,
    #[serde(default)]
    pub location: Option<String>,
    #[schema(example = "Normal")]
    pub mode: String,
    #[validate(length(min = 1, message = "At least one sensor sample is required"))]
    pub samples: Vec<SampleBody>,
}

impl From<DiagnosticsRequest> for MachineReading {
    fn from(body: DiagnosticsRequest) -> Self {
        MachineReading {
            name: body.name,
            machine_type: body.machine_type,
            location: body.location,
            mode: body.mode,
            samples: body
                .samples
                .into_iter()
                .map(|s| SensorSample {
                    temp: s.temp,
                    vibration: s.vibration,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsResponse {
    /// `Normal`, `Warning` or `Critical`
    pub status: String,
    pub health_score: u8,
    pub advice: String,
    pub urgent_action: bool,
    /// Request raised for an urgent diagnosis
    pub automated_request: Option<Request>,
}

impl From<Analysis> for DiagnosticsResponse {
    fn from(analysis: Analysis) -> Self {
        let status = match analysis.diagnosis.status {
            HealthStatus::Normal => "Normal",
            HealthStatus::Warning => "Warning",
            HealthStatus::Critical => "Critical",
        };
        Self {
            status: status.to_string(),
            health_score: analysis.diagnosis.health_score,
            advice: analysis.diagnosis.advice,
            urgent_action: analysis.diagnosis.urgent_action,
            automated_request: analysis.automated_request,
        }
    }
}

pub fn maintenance_routes() -> Router<AppState> {
    Router::new().route("/diagnostics", post(run_diagnostics))
}

/// Diagnose a machine; an urgent result raises a critical request
#[utoipa::path(
    post,
    path = "/maintenance/diagnostics",
    tag = "Maintenance",
    security(("bearer_auth" = [])),
    request_body = DiagnosticsRequest,
    responses(
        (status = 200, description = "Diagnosis", body = DiagnosticsResponse),
        (status = 403, description = "Only companies can run diagnostics")
    )
)]
pub async fn run_diagnostics(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<DiagnosticsRequest>,
) -> AppResult<Json<DiagnosticsResponse>> {
    let analysis = state
        .market
        .maintenance
        .analyze_machine(current_user.id, payload.into())
        .await?;

    Ok(Json(analysis.into()))
}
