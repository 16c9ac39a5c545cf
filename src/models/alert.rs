//! Alert rule queries and the pause commands.

use crate::bus::Message;
use crate::core::{AlertListItem, AlertRule, AlertStateInfo, SignedInUser};

/// Fetches one alert rule. Fails with `NotFound` if it does not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct GetAlertByIdQuery {
    pub id: i64,
}

impl Message for GetAlertByIdQuery {
    type Output = AlertRule;
}

/// Lists the alerts of an organization.
///
/// Empty `dashboard_ids` / `state` and a zero `panel_id` / `limit` mean "no
/// filter".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetAlertsQuery {
    pub org_id: i64,
    pub dashboard_ids: Vec<i64>,
    pub panel_id: i64,
    pub limit: i64,
    pub query: String,
    pub state: Vec<String>,
    pub user: SignedInUser,
}

impl Message for GetAlertsQuery {
    type Output = Vec<AlertListItem>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetAlertStatesForDashboardQuery {
    pub org_id: i64,
    pub dashboard_id: i64,
}

impl Message for GetAlertStatesForDashboardQuery {
    type Output = Vec<AlertStateInfo>;
}

/// Pauses or un-pauses the given alerts. Outputs the number of alerts changed.
#[derive(Debug, Clone, PartialEq)]
pub struct PauseAlertCommand {
    pub org_id: i64,
    pub alert_ids: Vec<i64>,
    pub paused: bool,
}

impl Message for PauseAlertCommand {
    type Output = usize;
}

/// Pauses or un-pauses every alert of an organization. Outputs the number of
/// alerts changed.
#[derive(Debug, Clone, PartialEq)]
pub struct PauseAllAlertsCommand {
    pub org_id: i64,
    pub paused: bool,
}

impl Message for PauseAllAlertsCommand {
    type Output = usize;
}
