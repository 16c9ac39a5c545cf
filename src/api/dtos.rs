//! Response and request bodies of the alerting operations.

use crate::core::NotificationChannel;
use crate::models::format_frequency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A notification channel as returned to callers. Secure values are never
/// included; `secure_fields` only tells which keys are set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertNotificationDto {
    pub id: i64,
    pub uid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_default: bool,
    pub send_reminder: bool,
    pub disable_resolve_message: bool,
    pub frequency: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub settings: Value,
    pub secure_fields: BTreeMap<String, bool>,
}

impl From<&NotificationChannel> for AlertNotificationDto {
    fn from(c: &NotificationChannel) -> Self {
        Self {
            id: c.id,
            uid: c.uid.clone(),
            name: c.name.clone(),
            kind: c.kind.clone(),
            is_default: c.is_default,
            send_reminder: c.send_reminder,
            disable_resolve_message: c.disable_resolve_message,
            frequency: format_frequency(c.frequency),
            created: c.created,
            updated: c.updated,
            settings: c.settings.clone(),
            secure_fields: c.secure_settings.secure_fields(),
        }
    }
}

/// The short form of a channel used by pickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertNotificationLookup {
    pub id: i64,
    pub uid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_default: bool,
}

impl From<&NotificationChannel> for AlertNotificationLookup {
    fn from(c: &NotificationChannel) -> Self {
        Self {
            id: c.id,
            uid: c.uid.clone(),
            name: c.name.clone(),
            kind: c.kind.clone(),
            is_default: c.is_default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseAlertResponse {
    pub alert_id: i64,
    pub state: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseAllAlertsResponse {
    pub state: String,
    pub message: String,
    pub alerts_affected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub message: String,
}

impl SuccessResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteByUidResponse {
    pub message: String,
    pub id: i64,
}

/// Query parameters of the alert list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertListFilter {
    #[serde(rename = "dashboardId")]
    pub dashboard_ids: Vec<i64>,
    pub panel_id: i64,
    pub limit: i64,
    pub query: String,
    pub state: Vec<String>,
    /// Title filter for the dashboards whose alerts are listed.
    pub dashboard_query: String,
    #[serde(rename = "dashboardTag")]
    pub dashboard_tags: Vec<String>,
    #[serde(rename = "folderId")]
    pub folder_ids: Vec<i64>,
}

impl AlertListFilter {
    /// Whether the dashboards must be found by a search first.
    pub fn needs_dashboard_search(&self) -> bool {
        !self.dashboard_query.is_empty()
            || !self.dashboard_tags.is_empty()
            || !self.folder_ids.is_empty()
    }
}
