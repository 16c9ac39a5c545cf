//! Builds alert evaluation requests and normalizes the engine's answer.
//!
//! Three entry points reach the evaluation engine through the bus: testing
//! the rule of a dashboard panel before it is saved, evaluating an inline rule
//! definition, and evaluating a stored rule by id. All three produce an
//! [`AlertTestResult`].

use crate::bus::{Bus, DispatchContext};
use crate::core::{AlertRule, DataSource, EvaluationResult, SignedInUser};
use crate::error::{BusError, ErrorKind};
use crate::models::{AlertTestCommand, EvaluateAlertByIdCommand, EvaluateAlertCommand};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

pub const ERR_DASHBOARD_NOT_SAVED: &str =
    "The dashboard needs to be saved at least once before you can test an alert rule";

/// Errors from the evaluation entry points.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The dashboard model has no id yet.
    #[error("{}", ERR_DASHBOARD_NOT_SAVED)]
    DashboardNotSaved,

    /// The dispatch itself failed; carries the handler's error unchanged.
    #[error(transparent)]
    Dispatch(#[from] BusError),

    /// The engine ran without error but reported no result.
    #[error("result not found for {subject} at {eval_time}")]
    ResultNotFound {
        subject: String,
        eval_time: DateTime<Utc>,
    },
}

impl EvaluationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvaluationError::DashboardNotSaved => ErrorKind::ValidationFailed,
            EvaluationError::Dispatch(e) => e.kind(),
            EvaluationError::ResultNotFound { .. } => ErrorKind::UpstreamFailure,
        }
    }
}

/// One entry of the evaluation trace in a test result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertTestResultLog {
    pub message: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalMatchDto {
    pub metric: String,
    pub value: Option<f64>,
}

/// The normalized answer of every evaluation entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertTestResult {
    pub firing: bool,
    pub state: String,
    pub condition_evals: String,
    pub time_ms: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub eval_matches: Vec<EvalMatchDto>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<AlertTestResultLog>,
}

impl From<&EvaluationResult> for AlertTestResult {
    fn from(res: &EvaluationResult) -> Self {
        Self {
            firing: res.firing,
            state: res.rule_state.as_str().to_string(),
            condition_evals: res.condition_evals.clone(),
            time_ms: format_duration_ms(res.duration),
            error: res.error.clone(),
            eval_matches: res
                .eval_matches
                .iter()
                .map(|m| EvalMatchDto {
                    metric: m.metric.clone(),
                    value: m.value,
                })
                .collect(),
            logs: res
                .logs
                .iter()
                .map(|l| AlertTestResultLog {
                    message: l.message.clone(),
                    data: l.data.clone(),
                })
                .collect(),
        }
    }
}

/// Renders a duration in milliseconds with three decimals, e.g. `"12.346ms"`.
pub fn format_duration_ms(duration: Duration) -> String {
    format!("{:.3}ms", duration.as_secs_f64() * 1000.0)
}

/// Inline rule evaluation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateAlertRequest {
    pub alert: AlertRule,
    pub eval_time: DateTime<Utc>,
    #[serde(default)]
    pub data_source_url: Option<String>,
    #[serde(default)]
    pub custom_data_sources: Vec<DataSource>,
}

/// Stored rule evaluation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateAlertByIdRequest {
    pub alert_id: i64,
    pub eval_time: DateTime<Utc>,
}

/// Request to test the rule on one panel of a dashboard model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertTestRequest {
    pub dashboard: Value,
    pub panel_id: i64,
}

/// Tests the rule on `req.panel_id` of a dashboard model, in the caller's
/// organization.
///
/// The dashboard must have been saved (carry a non-zero `id`); otherwise this
/// fails before anything is dispatched.
#[instrument(skip_all, fields(org_id = user.org_id, panel_id = req.panel_id))]
pub fn test_alert_rule(
    bus: &Bus,
    ctx: &DispatchContext,
    user: &SignedInUser,
    req: &AlertTestRequest,
    headers: &BTreeMap<String, String>,
) -> Result<AlertTestResult, EvaluationError> {
    let dashboard_id = req
        .dashboard
        .get("id")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    if dashboard_id == 0 {
        return Err(EvaluationError::DashboardNotSaved);
    }

    let cmd = AlertTestCommand {
        org_id: user.org_id,
        dashboard: req.dashboard.clone(),
        panel_id: req.panel_id,
        user: user.clone(),
        headers: headers.clone(),
    };
    let res = bus.dispatch_with_context(ctx, &cmd)?;
    debug!(dashboard_id, firing = res.firing, "Alert rule tested");
    Ok(AlertTestResult::from(&res))
}

/// Evaluates an inline rule, with optional per-request data sources.
#[instrument(skip_all, fields(alert_id = req.alert.id, eval_time = %req.eval_time))]
pub fn evaluate_alert(
    bus: &Bus,
    ctx: &DispatchContext,
    req: &EvaluateAlertRequest,
    headers: &BTreeMap<String, String>,
) -> Result<AlertTestResult, EvaluationError> {
    let cmd = EvaluateAlertCommand {
        alert: req.alert.clone(),
        eval_time: req.eval_time,
        data_source_url: req.data_source_url.clone(),
        custom_data_sources: req.custom_data_sources.clone(),
        headers: headers.clone(),
    };

    match bus.dispatch_with_context(ctx, &cmd)? {
        Some(res) => Ok(AlertTestResult::from(&res)),
        None => Err(EvaluationError::ResultNotFound {
            subject: format!("alert {}", req.alert.id),
            eval_time: req.eval_time,
        }),
    }
}

/// Evaluates a stored rule.
#[instrument(skip_all, fields(alert_id = req.alert_id, eval_time = %req.eval_time))]
pub fn evaluate_alert_by_id(
    bus: &Bus,
    ctx: &DispatchContext,
    req: &EvaluateAlertByIdRequest,
    headers: &BTreeMap<String, String>,
) -> Result<AlertTestResult, EvaluationError> {
    let cmd = EvaluateAlertByIdCommand {
        alert_id: req.alert_id,
        eval_time: req.eval_time,
        headers: headers.clone(),
    };

    match bus.dispatch_with_context(ctx, &cmd)? {
        Some(res) => Ok(AlertTestResult::from(&res)),
        None => Err(EvaluationError::ResultNotFound {
            subject: format!("alert by id {}", req.alert_id),
            eval_time: req.eval_time,
        }),
    }
}
