//! Machine health checks.
//!
//! The diagnosis itself is delegated to a [`Diagnoser`]; a hosted model client
//! lives outside this crate. [`ThresholdDiagnoser`] is the offline fallback used
//! by in-memory deployments.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{AppResult, MarketplaceConfig};
use domain::{authorize, Action, NotificationKind, Request, User};

use crate::infra::DocumentStore;
use crate::repository::Records;
use crate::service::notifications::NotificationService;

const DEFAULT_LOCATION: &str = "Headquarters";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Normal,
    Warning,
    Critical,
}

/// Structured answer of a diagnoser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub status: HealthStatus,
    /// 0 (failed) to 100 (healthy)
    pub health_score: u8,
    pub advice: String,
    pub urgent_action: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Degrees Celsius
    pub temp: f64,
    /// Hz
    pub vibration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineReading {
    pub name: String,
    pub machine_type: String,
    #[serde(default)]
    pub location: Option<String>,
    /// Operating mode reported by the telemetry source
    pub mode: String,
    pub samples: Vec<SensorSample>,
}

impl MachineReading {
    /// Prompt handed to text-based diagnosers
    pub fn prompt(&self) -> String {
        let readings = self
            .samples
            .iter()
            .map(|s| format!("{{\"t\":{},\"v\":\"{:.2}\"}}", s.temp.round(), s.vibration))
            .collect::<Vec<_>>()
            .join(",");

        format!(
            "Analyze this sensor data stream for {}.\n\
             Recent Readings (Temp C, Vibration Hz): [{}]\n\
             Operating Mode: {}\n\n\
             Return JSON: {{ \"status\": \"Normal\"|\"Warning\"|\"Critical\", \"health_score\": 0-100, \"advice\": \"string\", \"urgent_action\": boolean }}",
            self.name, readings, self.mode
        )
    }
}

/// Result of [`MaintenanceService::analyze_machine`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub diagnosis: Diagnosis,
    /// Request raised because the diagnosis asked for urgent action
    pub automated_request: Option<Request>,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait Diagnoser: Send + Sync {
    async fn diagnose(&self, prompt: &str, reading: &MachineReading) -> AppResult<Diagnosis>;
}

/// Rule-based diagnoser over the latest sample
#[derive(Debug, Clone, Copy)]
pub struct ThresholdDiagnoser {
    pub warning_temp: f64,
    pub critical_temp: f64,
    pub warning_vibration: f64,
    pub critical_vibration: f64,
}

impl Default for ThresholdDiagnoser {
    fn default() -> Self {
        Self {
            warning_temp: 75.0,
            critical_temp: 90.0,
            warning_vibration: 3.5,
            critical_vibration: 5.0,
        }
    }
}

#[async_trait]
impl Diagnoser for ThresholdDiagnoser {
    async fn diagnose(&self, _prompt: &str, reading: &MachineReading) -> AppResult<Diagnosis> {
        let Some(latest) = reading.samples.last() else {
            return Ok(Diagnosis {
                status: HealthStatus::Normal,
                health_score: 100,
                advice: "No sensor data received yet.".to_string(),
                urgent_action: false,
            });
        };

        let temp_load = (latest.temp / self.critical_temp).clamp(0.0, 1.5);
        let vibration_load = (latest.vibration / self.critical_vibration).clamp(0.0, 1.5);
        let health_score = (100.0 - temp_load.max(vibration_load) * 66.0).clamp(0.0, 100.0) as u8;

        let diagnosis = if latest.temp >= self.critical_temp || latest.vibration >= self.critical_vibration {
            Diagnosis {
                status: HealthStatus::Critical,
                health_score,
                advice: format!(
                    "Shut down {} and inspect bearings and cooling ({:.0}C, {:.2}Hz).",
                    reading.name, latest.temp, latest.vibration
                ),
                urgent_action: true,
            }
        } else if latest.temp >= self.warning_temp || latest.vibration >= self.warning_vibration {
            Diagnosis {
                status: HealthStatus::Warning,
                health_score,
                advice: format!("Schedule an inspection of {} within the week.", reading.name),
                urgent_action: false,
            }
        } else {
            Diagnosis {
                status: HealthStatus::Normal,
                health_score,
                advice: "Operating within normal parameters.".to_string(),
                urgent_action: false,
            }
        };
        Ok(diagnosis)
    }
}

pub struct MaintenanceService {
    requests: Records<Request>,
    users: Records<User>,
    diagnoser: Arc<dyn Diagnoser>,
    notifications: Arc<NotificationService>,
    automated_budget: u64,
}

impl MaintenanceService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        diagnoser: Arc<dyn Diagnoser>,
        notifications: Arc<NotificationService>,
        config: &MarketplaceConfig,
    ) -> Self {
        Self {
            requests: Records::new(store.clone()),
            users: Records::new(store),
            diagnoser,
            notifications,
            automated_budget: config.automated_request_budget,
        }
    }

    /// Diagnose a machine and dispatch a critical request when action is urgent.
    pub async fn analyze_machine(&self, actor_id: Uuid, reading: MachineReading) -> AppResult<Analysis> {
        let actor = self.users.require(actor_id).await?;
        authorize(&actor, &Action::RunDiagnostics)?;

        let diagnosis = self.diagnoser.diagnose(&reading.prompt(), &reading).await?;
        tracing::debug!(
            machine = %reading.name,
            status = ?diagnosis.status,
            health_score = diagnosis.health_score,
            "Machine diagnosed"
        );

        if !diagnosis.urgent_action {
            return Ok(Analysis {
                diagnosis,
                automated_request: None,
            });
        }

        let location = reading
            .location
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
        let mut request = Request::automated(
            Uuid::new_v4(),
            &actor,
            reading.name.clone(),
            reading.machine_type.clone(),
            location,
            &diagnosis.advice,
        )?;
        request.budget = self.automated_budget;
        self.requests.insert(&request).await?;

        tracing::info!(
            request_id = %request.id,
            company_id = %actor_id,
            machine = %reading.name,
            "Automated maintenance request raised"
        );

        let short_id: String = request.id.simple().to_string().chars().take(6).collect();
        self.notifications
            .notify(
                actor_id,
                format!(
                    "CRITICAL ALERT: {} failure detected. Maintenance request #{} auto-generated.",
                    reading.name, short_id
                ),
                NotificationKind::Error,
                Some(request.id),
            )
            .await;

        Ok(Analysis {
            diagnosis,
            automated_request: Some(request),
        })
    }
}
