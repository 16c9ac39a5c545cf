//! Commands answered by the alert evaluation engine.

use crate::bus::Message;
use crate::core::{AlertRule, DataSource, EvaluationResult, SignedInUser};
use crate::error::BusError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

pub const ERR_DATA_SOURCE_ACCESS_DENIED: &str = "data source access denied";

pub fn data_source_access_denied() -> BusError {
    BusError::access_denied(ERR_DATA_SOURCE_ACCESS_DENIED)
}

/// Evaluates the alert defined on `panel_id` of an in-flight dashboard model.
///
/// The engine fails with `ValidationFailed` for an unusable rule and
/// `AccessDenied` when a referenced data source is off limits to `user`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertTestCommand {
    pub org_id: i64,
    pub dashboard: Value,
    pub panel_id: i64,
    pub user: SignedInUser,
    /// Request headers forwarded to data source queries.
    pub headers: BTreeMap<String, String>,
}

impl Message for AlertTestCommand {
    type Output = EvaluationResult;
}

/// Evaluates an inline rule definition at `eval_time`.
///
/// `custom_data_sources` override the organization's configured data sources
/// for this evaluation only. The handler may succeed without producing a
/// result.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluateAlertCommand {
    pub alert: AlertRule,
    pub eval_time: DateTime<Utc>,
    pub data_source_url: Option<String>,
    pub custom_data_sources: Vec<DataSource>,
    pub headers: BTreeMap<String, String>,
}

impl Message for EvaluateAlertCommand {
    type Output = Option<EvaluationResult>;
}

/// Evaluates a stored rule at `eval_time`.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluateAlertByIdCommand {
    pub alert_id: i64,
    pub eval_time: DateTime<Utc>,
    pub headers: BTreeMap<String, String>,
}

impl Message for EvaluateAlertByIdCommand {
    type Output = Option<EvaluationResult>;
}
