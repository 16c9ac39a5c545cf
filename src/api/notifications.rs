//! Notification channel operations.

use super::{
    api_error, AlertNotificationDto, AlertNotificationLookup, AlertingApi, ApiError, ApiResult,
    DeleteByUidResponse, ReqContext, SuccessResponse,
};
use crate::core::NotificationChannel;
use crate::error::ErrorKind;
use crate::models::{
    CreateAlertNotificationCommand, DeleteAlertNotificationCommand,
    DeleteAlertNotificationWithUidCommand, GetAlertNotificationsQuery,
    GetAlertNotificationsWithUidQuery, GetAllAlertNotificationsQuery, NotificationTestCommand,
    UpdateAlertNotificationCommand, UpdateAlertNotificationWithUidCommand,
};
use crate::secure_settings::fill_with_secure_settings;
use tracing::{info, instrument};

const NOT_FOUND: &str = "Alert notification not found";

impl AlertingApi {
    pub fn get_alert_notifications(&self, req: &ReqContext) -> ApiResult<Vec<AlertNotificationDto>> {
        Ok(self
            .all_channels(req)?
            .iter()
            .map(AlertNotificationDto::from)
            .collect())
    }

    pub fn get_alert_notification_lookup(
        &self,
        req: &ReqContext,
    ) -> ApiResult<Vec<AlertNotificationLookup>> {
        Ok(self
            .all_channels(req)?
            .iter()
            .map(AlertNotificationLookup::from)
            .collect())
    }

    pub fn get_alert_notification_by_id(
        &self,
        req: &ReqContext,
        id: i64,
    ) -> ApiResult<AlertNotificationDto> {
        if id == 0 {
            return Err(ApiError::new(404, NOT_FOUND));
        }
        let query = GetAlertNotificationsQuery {
            org_id: req.org_id(),
            id,
        };
        self.bus
            .dispatch_with_context(&req.ctx, &query)
            .map_err(|e| api_error(500, "Failed to get alert notifications", e))?
            .map(|c| AlertNotificationDto::from(&c))
            .ok_or_else(|| ApiError::new(404, NOT_FOUND))
    }

    pub fn get_alert_notification_by_uid(
        &self,
        req: &ReqContext,
        uid: &str,
    ) -> ApiResult<AlertNotificationDto> {
        if uid.is_empty() {
            return Err(ApiError::new(404, NOT_FOUND));
        }
        self.channel_by_uid(req, uid, "Failed to get alert notifications")?
            .map(|c| AlertNotificationDto::from(&c))
            .ok_or_else(|| ApiError::new(404, NOT_FOUND))
    }

    #[instrument(skip_all, fields(org_id = req.org_id()))]
    pub fn create_alert_notification(
        &self,
        req: &ReqContext,
        mut cmd: CreateAlertNotificationCommand,
    ) -> ApiResult<AlertNotificationDto> {
        cmd.org_id = req.org_id();
        let channel = self
            .bus
            .dispatch_with_context(&req.ctx, &cmd)
            .map_err(|e| {
                let status = if e.is(ErrorKind::Conflict) { 409 } else { 500 };
                api_error(status, "Failed to create alert notification", e)
            })?;
        Ok(AlertNotificationDto::from(&channel))
    }

    /// Updates a channel by id. Secure settings the caller leaves out keep
    /// their stored values.
    #[instrument(skip_all, fields(org_id = req.org_id(), id = cmd.id))]
    pub fn update_alert_notification(
        &self,
        req: &ReqContext,
        mut cmd: UpdateAlertNotificationCommand,
    ) -> ApiResult<AlertNotificationDto> {
        cmd.org_id = req.org_id();
        fill_with_secure_settings(&self.bus, &req.ctx, self.codec.as_ref(), &mut cmd)
            .map_err(|e| api_error(500, "Failed to update alert notification", e))?;

        self.bus
            .dispatch_with_context(&req.ctx, &cmd)
            .map_err(update_error)?;

        let query = GetAlertNotificationsQuery {
            org_id: req.org_id(),
            id: cmd.id,
        };
        let stored = self
            .bus
            .dispatch_with_context(&req.ctx, &query)
            .map_err(|e| api_error(500, "Failed to get alert notification", e))?
            .ok_or_else(|| ApiError::new(500, "Failed to get alert notification"))?;
        Ok(AlertNotificationDto::from(&stored))
    }

    /// Updates a channel by uid. A non-empty uid in the body renames it.
    #[instrument(skip_all, fields(org_id = req.org_id(), uid = uid))]
    pub fn update_alert_notification_by_uid(
        &self,
        req: &ReqContext,
        uid: &str,
        mut cmd: UpdateAlertNotificationWithUidCommand,
    ) -> ApiResult<AlertNotificationDto> {
        cmd.org_id = req.org_id();
        cmd.uid = uid.to_string();
        fill_with_secure_settings(&self.bus, &req.ctx, self.codec.as_ref(), &mut cmd)
            .map_err(|e| api_error(500, "Failed to update alert notification", e))?;

        let updated = self
            .bus
            .dispatch_with_context(&req.ctx, &cmd)
            .map_err(update_error)?;

        let stored = self
            .channel_by_uid(req, &updated.uid, "Failed to get alert notification")?
            .ok_or_else(|| ApiError::new(500, "Failed to get alert notification"))?;
        Ok(AlertNotificationDto::from(&stored))
    }

    pub fn delete_alert_notification(&self, req: &ReqContext, id: i64) -> ApiResult<SuccessResponse> {
        let cmd = DeleteAlertNotificationCommand {
            org_id: req.org_id(),
            id,
        };
        self.bus
            .dispatch_with_context(&req.ctx, &cmd)
            .map_err(delete_error)?;
        Ok(SuccessResponse::new("Notification deleted"))
    }

    pub fn delete_alert_notification_by_uid(
        &self,
        req: &ReqContext,
        uid: &str,
    ) -> ApiResult<DeleteByUidResponse> {
        let cmd = DeleteAlertNotificationWithUidCommand {
            org_id: req.org_id(),
            uid: uid.to_string(),
        };
        let id = self
            .bus
            .dispatch_with_context(&req.ctx, &cmd)
            .map_err(delete_error)?;
        Ok(DeleteByUidResponse {
            message: "Notification deleted".to_string(),
            id,
        })
    }

    /// Sends a test notification through the channel described by `cmd`.
    #[instrument(skip_all, fields(org_id = req.org_id(), kind = %cmd.kind))]
    pub fn notification_test(
        &self,
        req: &ReqContext,
        mut cmd: NotificationTestCommand,
    ) -> ApiResult<SuccessResponse> {
        cmd.org_id = req.org_id();
        self.bus
            .dispatch_with_context(&req.ctx, &cmd)
            .map_err(|e| match e.kind() {
                ErrorKind::PreconditionFailed => ApiError::new(412, e.message().to_string()),
                ErrorKind::ValidationFailed => ApiError::new(400, e.message().to_string()),
                _ => api_error(500, "Failed to send alert notifications", e),
            })?;
        info!(name = %cmd.name, "Test notification sent");
        Ok(SuccessResponse::new("Test notification sent"))
    }

    fn all_channels(&self, req: &ReqContext) -> ApiResult<Vec<NotificationChannel>> {
        let query = GetAllAlertNotificationsQuery {
            org_id: req.org_id(),
        };
        self.bus
            .dispatch_with_context(&req.ctx, &query)
            .map_err(|e| api_error(500, "Failed to get alert notifications", e))
    }

    fn channel_by_uid(
        &self,
        req: &ReqContext,
        uid: &str,
        failure: &'static str,
    ) -> ApiResult<Option<NotificationChannel>> {
        let query = GetAlertNotificationsWithUidQuery {
            org_id: req.org_id(),
            uid: uid.to_string(),
        };
        self.bus
            .dispatch_with_context(&req.ctx, &query)
            .map_err(|e| api_error(500, failure, e))
    }
}

fn update_error(e: crate::error::BusError) -> ApiError {
    match e.kind() {
        ErrorKind::NotFound => ApiError::new(404, e.message().to_string()).with_source(e),
        _ => api_error(500, "Failed to update alert notification", e),
    }
}

fn delete_error(e: crate::error::BusError) -> ApiError {
    match e.kind() {
        ErrorKind::NotFound => ApiError::new(404, e.message().to_string()).with_source(e),
        _ => api_error(500, "Failed to delete alert notification", e),
    }
}
