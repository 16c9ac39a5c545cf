//! Alert rule operations: listing, state queries, testing, evaluation and
//! pausing.

use super::{
    api_error, AlertListFilter, AlertingApi, ApiError, ApiResult, PauseAlertResponse,
    PauseAllAlertsResponse, ReqContext,
};
use crate::core::{dashboard_url, AlertListItem, AlertRule, AlertStateInfo};
use crate::error::{BusError, ErrorKind};
use crate::evaluation::{
    self, AlertTestRequest, AlertTestResult, EvaluateAlertByIdRequest, EvaluateAlertRequest,
    EvaluationError,
};
use crate::models::{
    DashboardHitType, GetAlertByIdQuery, GetAlertStatesForDashboardQuery, GetAlertsQuery,
    GetNotifierPluginsQuery, NotifierPlugin, Permission, SearchDashboardsQuery,
};
use crate::pause;
use tracing::{debug, instrument};

/// Maximum number of dashboards a dashboard filter can resolve to.
const DASHBOARD_SEARCH_LIMIT: usize = 1000;

impl AlertingApi {
    /// Loads an alert and checks it belongs to the caller's organization.
    pub fn validate_org_alert(&self, req: &ReqContext, alert_id: i64) -> ApiResult<AlertRule> {
        let alert = self
            .bus
            .dispatch_with_context(&req.ctx, &GetAlertByIdQuery { id: alert_id })
            .map_err(|e| api_error(404, "Alert not found", e))?;
        ensure_same_org(req, &alert)?;
        Ok(alert)
    }

    pub fn get_alert_states_for_dashboard(
        &self,
        req: &ReqContext,
        dashboard_id: i64,
    ) -> ApiResult<Vec<AlertStateInfo>> {
        if dashboard_id == 0 {
            return Err(ApiError::new(400, "Missing query parameter dashboardId"));
        }
        let query = GetAlertStatesForDashboardQuery {
            org_id: req.org_id(),
            dashboard_id,
        };
        self.bus
            .dispatch_with_context(&req.ctx, &query)
            .map_err(|e| api_error(500, "Failed to fetch alert states", e))
    }

    /// Lists the alerts of the caller's organization.
    ///
    /// A dashboard title, tag or folder filter first resolves to the matching
    /// dashboards; when none match the list is empty.
    #[instrument(skip_all, fields(org_id = req.org_id()))]
    pub fn get_alerts(
        &self,
        req: &ReqContext,
        filter: &AlertListFilter,
    ) -> ApiResult<Vec<AlertListItem>> {
        let mut dashboard_ids = filter.dashboard_ids.clone();

        if filter.needs_dashboard_search() {
            let search = SearchDashboardsQuery {
                title: filter.dashboard_query.clone(),
                tags: filter.dashboard_tags.clone(),
                org_id: req.org_id(),
                user: req.user.clone(),
                limit: DASHBOARD_SEARCH_LIMIT,
                dashboard_ids: filter.dashboard_ids.clone(),
                folder_ids: filter.folder_ids.clone(),
                hit_type: Some(DashboardHitType::Dashboard),
                permission: Permission::View,
            };
            let hits = self
                .bus
                .dispatch_with_context(&req.ctx, &search)
                .map_err(|e| api_error(500, "List alerts failed", e))?;

            dashboard_ids.extend(
                hits.iter()
                    .filter(|h| h.hit_type == DashboardHitType::Dashboard && h.id > 0)
                    .map(|h| h.id),
            );
            if dashboard_ids.is_empty() {
                debug!("No dashboards matched the alert list filter");
                return Ok(Vec::new());
            }
        }

        let query = GetAlertsQuery {
            org_id: req.org_id(),
            dashboard_ids,
            panel_id: filter.panel_id,
            limit: filter.limit,
            query: filter.query.clone(),
            state: filter.state.clone(),
            user: req.user.clone(),
        };
        let mut alerts = self
            .bus
            .dispatch_with_context(&req.ctx, &query)
            .map_err(|e| api_error(500, "List alerts failed", e))?;

        for alert in &mut alerts {
            alert.url = dashboard_url(&alert.dashboard_uid, &alert.dashboard_slug);
        }
        Ok(alerts)
    }

    pub fn get_alert(&self, req: &ReqContext, alert_id: i64) -> ApiResult<AlertRule> {
        let alert = self
            .bus
            .dispatch_with_context(&req.ctx, &GetAlertByIdQuery { id: alert_id })
            .map_err(|e| api_error(500, "List alerts failed", e))?;
        ensure_same_org(req, &alert)?;
        Ok(alert)
    }

    /// Tests the rule of one panel of a dashboard model.
    pub fn alert_test(&self, req: &ReqContext, body: &AlertTestRequest) -> ApiResult<AlertTestResult> {
        evaluation::test_alert_rule(&self.bus, &req.ctx, &req.user, body, &req.headers).map_err(
            |e| match e {
                EvaluationError::DashboardNotSaved => {
                    ApiError::new(400, evaluation::ERR_DASHBOARD_NOT_SAVED)
                }
                EvaluationError::Dispatch(e) if e.is(ErrorKind::ValidationFailed) => {
                    ApiError::new(422, e.message().to_string())
                }
                EvaluationError::Dispatch(e) if e.is(ErrorKind::AccessDenied) => {
                    api_error(403, "Access denied to datasource", e)
                }
                other => api_error(500, "Failed to test rule", other),
            },
        )
    }

    pub fn evaluate_alert(
        &self,
        req: &ReqContext,
        body: &EvaluateAlertRequest,
    ) -> ApiResult<AlertTestResult> {
        evaluation::evaluate_alert(&self.bus, &req.ctx, body, &req.headers)
            .map_err(|e| evaluation_error(e, "Failed to check alert", body.alert.id))
    }

    pub fn evaluate_alert_by_id(
        &self,
        req: &ReqContext,
        body: &EvaluateAlertByIdRequest,
    ) -> ApiResult<AlertTestResult> {
        evaluation::evaluate_alert_by_id(&self.bus, &req.ctx, body, &req.headers)
            .map_err(|e| evaluation_error(e, "Failed to check alert by Id", body.alert_id))
    }

    /// Pauses or un-pauses one alert, if the caller may edit its dashboard.
    #[instrument(skip_all, fields(org_id = req.org_id(), alert_id = alert_id, paused = paused))]
    pub fn pause_alert(
        &self,
        req: &ReqContext,
        alert_id: i64,
        paused: bool,
    ) -> ApiResult<PauseAlertResponse> {
        let alert = self
            .bus
            .dispatch_with_context(&req.ctx, &GetAlertByIdQuery { id: alert_id })
            .map_err(|e| api_error(500, "Get Alert failed", e))?;

        let allowed = self
            .guardian
            .can_edit(alert.dashboard_id, alert.org_id, &req.user)
            .map_err(|e| api_error(500, "Error while checking permissions for Alert", e))?;
        if !allowed {
            return Err(ApiError::new(403, "Access denied to this dashboard and alert"));
        }

        let outcome = pause::pause_alert(&self.bus, &req.ctx, &alert, paused)
            .map_err(|e| api_error(500, e.message().to_string(), e))?;
        Ok(PauseAlertResponse {
            alert_id,
            state: outcome.state_label().to_string(),
            message: outcome.message().to_string(),
        })
    }

    pub fn pause_all_alerts(
        &self,
        req: &ReqContext,
        paused: bool,
    ) -> ApiResult<PauseAllAlertsResponse> {
        let outcome = pause::pause_all_alerts(&self.bus, &req.ctx, req.org_id(), paused)
            .map_err(|e| api_error(500, "Failed to pause alerts", e))?;
        Ok(PauseAllAlertsResponse {
            state: outcome.state_label().to_string(),
            message: outcome.message().to_string(),
            alerts_affected: outcome.alerts_affected,
        })
    }

    pub fn get_alert_notifiers(&self, req: &ReqContext) -> ApiResult<Vec<NotifierPlugin>> {
        let query = GetNotifierPluginsQuery {
            unified_alerting: self.unified_alerting,
        };
        self.bus
            .dispatch_with_context(&req.ctx, &query)
            .map_err(|e| api_error(500, "Failed to get alert notifiers", e))
    }
}

fn ensure_same_org(req: &ReqContext, alert: &AlertRule) -> ApiResult<()> {
    if alert.org_id != req.org_id() {
        return Err(ApiError::new(403, "You are not allowed to edit/view alert"));
    }
    Ok(())
}

/// `prefix` names the entry point; a missing result also reports the alert
/// and evaluation time.
fn evaluation_error(err: EvaluationError, prefix: &str, alert_id: i64) -> ApiError {
    match err {
        EvaluationError::ResultNotFound { eval_time, .. } => api_error(
            500,
            format!("{}: {}, date: {}", prefix, alert_id, eval_time),
            BusError::upstream("result not found"),
        ),
        other => api_error(500, "Failed to check alert", other),
    }
}
