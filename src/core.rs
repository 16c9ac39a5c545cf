//! Core domain types and collaborator traits.
//!
//! This module defines the alert, notification-channel and evaluation data
//! structures that flow through the bus, along with the trait contracts of the
//! collaborators the core depends on but does not implement.

use crate::error::BusError;
use crate::secrets::EncryptedSettings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The lifecycle state of an alert rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    Pending,
    Alerting,
    Ok,
    Paused,
    #[default]
    Unknown,
    NoData,
}

impl AlertState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::Pending => "pending",
            AlertState::Alerting => "alerting",
            AlertState::Ok => "ok",
            AlertState::Paused => "paused",
            AlertState::Unknown => "unknown",
            AlertState::NoData => "no_data",
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, AlertState::Paused)
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertState {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(AlertState::Pending),
            "alerting" => Ok(AlertState::Alerting),
            "ok" => Ok(AlertState::Ok),
            "paused" => Ok(AlertState::Paused),
            "unknown" => Ok(AlertState::Unknown),
            "no_data" => Ok(AlertState::NoData),
            other => Err(BusError::validation(format!("invalid alert state: {}", other))),
        }
    }
}

/// The caller's role inside an organization.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum OrgRole {
    #[default]
    Viewer,
    Editor,
    Admin,
}

/// The authenticated identity on whose behalf a request runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SignedInUser {
    pub user_id: i64,
    pub org_id: i64,
    pub login: String,
    pub org_role: OrgRole,
}

/// A stored alert rule, attached to one dashboard panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertRule {
    pub id: i64,
    pub version: i64,
    pub org_id: i64,
    pub dashboard_id: i64,
    pub panel_id: i64,
    pub name: String,
    pub message: String,
    pub severity: String,
    pub state: AlertState,
    pub handler: i64,
    pub silenced: bool,
    pub execution_error: String,
    /// Evaluation interval in seconds.
    pub frequency: i64,
    /// Pending period in seconds before the rule starts alerting.
    #[serde(rename = "for")]
    pub for_seconds: i64,
    pub eval_data: Value,
    pub new_state_date: DateTime<Utc>,
    pub state_changes: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub settings: Value,
}

/// A row of the alert list, joined with its dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertListItem {
    pub id: i64,
    pub dashboard_id: i64,
    pub dashboard_uid: String,
    pub dashboard_slug: String,
    pub panel_id: i64,
    pub name: String,
    pub state: AlertState,
    pub new_state_date: DateTime<Utc>,
    pub execution_error: String,
    pub eval_data: Value,
    pub url: String,
}

/// The current state of one alert on a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStateInfo {
    pub id: i64,
    pub dashboard_id: i64,
    pub panel_id: i64,
    pub state: AlertState,
    pub new_state_date: DateTime<Utc>,
}

/// The minimal dashboard record the alert list and the search need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Dashboard {
    pub id: i64,
    pub uid: String,
    pub org_id: i64,
    pub title: String,
    pub slug: String,
    pub folder_id: i64,
    pub is_folder: bool,
    pub tags: Vec<String>,
}

/// Builds the relative URL of a dashboard.
pub fn dashboard_url(uid: &str, slug: &str) -> String {
    format!("/d/{}/{}", uid, slug)
}

/// A data source definition, either configured for the org or supplied by
/// the caller for a single evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DataSource {
    pub id: i64,
    pub uid: String,
    pub org_id: i64,
    pub version: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub access: String,
    pub url: String,
    pub user: String,
    pub database: String,
    pub basic_auth: bool,
    pub basic_auth_user: String,
    pub with_credentials: bool,
    pub is_default: bool,
    pub read_only: bool,
    pub json_data: Value,
    pub secure_json_data: BTreeMap<String, String>,
}

/// A configured notification channel, with its secure settings still encrypted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotificationChannel {
    pub id: i64,
    pub uid: String,
    pub org_id: i64,
    pub name: String,
    pub kind: String,
    pub is_default: bool,
    pub send_reminder: bool,
    pub disable_resolve_message: bool,
    /// Reminder frequency.
    pub frequency: Duration,
    pub settings: Value,
    pub secure_settings: EncryptedSettings,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// One entry of the evaluation trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultLogEntry {
    pub message: String,
    pub data: Value,
}

/// A series that matched the rule's condition, with its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalMatch {
    pub metric: String,
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// The outcome of one evaluation attempt, as reported by the engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvaluationResult {
    pub firing: bool,
    pub no_data: bool,
    /// Human-readable rendering of the evaluated conditions, e.g. `"true AND false = false"`.
    pub condition_evals: String,
    pub logs: Vec<ResultLogEntry>,
    pub eval_matches: Vec<EvalMatch>,
    pub rule_state: AlertState,
    pub error: Option<String>,
    pub duration: Duration,
}

impl EvaluationResult {
    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

// =============================================================================
// Collaborator Traits
// =============================================================================

/// Answers permission questions about dashboards.
pub trait DashboardGuardian: Send + Sync {
    /// Whether `user` may edit the dashboard (and its alerts).
    ///
    /// # Returns
    /// * `Ok(true)` / `Ok(false)` with the decision
    /// * `Err` if the permission lookup itself failed
    fn can_edit(
        &self,
        dashboard_id: i64,
        org_id: i64,
        user: &SignedInUser,
    ) -> Result<bool, BusError>;
}

/// Encrypts and decrypts secure setting values.
pub trait SecretsCodec: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, BusError>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, BusError>;
}
