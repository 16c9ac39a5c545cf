//! Notification channel queries and commands.

use crate::bus::Message;
use crate::core::NotificationChannel;
use crate::error::BusError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const ERR_NOTIFICATION_NOT_FOUND: &str = "alert notification not found";
pub const ERR_NOTIFICATION_SAME_NAME: &str = "alert notification with same name already exists";
pub const ERR_NOTIFICATION_SAME_UID: &str = "alert notification with same uid already exists";
pub const ERR_SMTP_NOT_ENABLED: &str =
    "SMTP not configured, check your config file's [smtp] section";

pub fn notification_not_found() -> BusError {
    BusError::not_found(ERR_NOTIFICATION_NOT_FOUND)
}

pub fn notification_same_name_exists() -> BusError {
    BusError::conflict(ERR_NOTIFICATION_SAME_NAME)
}

pub fn notification_same_uid_exists() -> BusError {
    BusError::conflict(ERR_NOTIFICATION_SAME_UID)
}

pub fn smtp_not_enabled() -> BusError {
    BusError::precondition_failed(ERR_SMTP_NOT_ENABLED)
}

/// Every channel of an organization.
#[derive(Debug, Clone, PartialEq)]
pub struct GetAllAlertNotificationsQuery {
    pub org_id: i64,
}

impl Message for GetAllAlertNotificationsQuery {
    type Output = Vec<NotificationChannel>;
}

/// One channel by numeric id; `None` if it does not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct GetAlertNotificationsQuery {
    pub org_id: i64,
    pub id: i64,
}

impl Message for GetAlertNotificationsQuery {
    type Output = Option<NotificationChannel>;
}

/// One channel by uid; `None` if it does not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct GetAlertNotificationsWithUidQuery {
    pub org_id: i64,
    pub uid: String,
}

impl Message for GetAlertNotificationsWithUidQuery {
    type Output = Option<NotificationChannel>;
}

/// Creates a channel. An empty `uid` gets a generated one.
///
/// Fails with `Conflict` when the name or uid is taken in the organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateAlertNotificationCommand {
    #[serde(skip)]
    pub org_id: i64,
    pub uid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub send_reminder: bool,
    pub disable_resolve_message: bool,
    /// Reminder frequency, e.g. `"15m"`.
    pub frequency: String,
    pub is_default: bool,
    pub settings: Value,
    pub secure_settings: BTreeMap<String, String>,
}

impl Message for CreateAlertNotificationCommand {
    type Output = NotificationChannel;
}

/// Replaces a channel addressed by numeric id.
///
/// The handler stores `secure_settings` verbatim: keys missing from the map
/// are dropped. Callers run the secure settings merge first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateAlertNotificationCommand {
    pub id: i64,
    #[serde(skip)]
    pub org_id: i64,
    pub uid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub send_reminder: bool,
    pub disable_resolve_message: bool,
    pub frequency: String,
    pub is_default: bool,
    pub settings: Value,
    pub secure_settings: BTreeMap<String, String>,
}

impl Message for UpdateAlertNotificationCommand {
    type Output = NotificationChannel;
}

/// Replaces a channel addressed by uid. A non-empty `new_uid` renames it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateAlertNotificationWithUidCommand {
    #[serde(skip)]
    pub org_id: i64,
    #[serde(skip)]
    pub uid: String,
    #[serde(rename = "uid")]
    pub new_uid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub send_reminder: bool,
    pub disable_resolve_message: bool,
    pub frequency: String,
    pub is_default: bool,
    pub settings: Value,
    pub secure_settings: BTreeMap<String, String>,
}

impl Message for UpdateAlertNotificationWithUidCommand {
    type Output = NotificationChannel;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteAlertNotificationCommand {
    pub org_id: i64,
    pub id: i64,
}

impl Message for DeleteAlertNotificationCommand {
    type Output = ();
}

/// Deletes a channel by uid. Outputs the numeric id of the deleted channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteAlertNotificationWithUidCommand {
    pub org_id: i64,
    pub uid: String,
}

impl Message for DeleteAlertNotificationWithUidCommand {
    type Output = i64;
}

/// Sends a test notification through a (possibly unsaved) channel definition.
///
/// Delivery handlers fail with `PreconditionFailed` when their transport is
/// disabled and `ValidationFailed` when the settings are unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationTestCommand {
    #[serde(skip)]
    pub org_id: i64,
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub settings: Value,
    pub secure_settings: BTreeMap<String, String>,
}

impl Message for NotificationTestCommand {
    type Output = ();
}

/// A notifier plugin that channels can be created for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifierPlugin {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub heading: String,
    pub description: String,
    /// Setting keys that are stored as secure settings.
    pub secure_options: Vec<String>,
}

/// The notifier plugins available under the legacy or the unified alerting
/// engine.
#[derive(Debug, Clone, PartialEq)]
pub struct GetNotifierPluginsQuery {
    pub unified_alerting: bool,
}

impl Message for GetNotifierPluginsQuery {
    type Output = Vec<NotifierPlugin>;
}

/// Parses a reminder frequency such as `"90s"`, `"15m"`, `"2h"` or `"1d"`.
/// An empty string is a zero frequency.
pub fn parse_frequency(frequency: &str) -> Result<std::time::Duration, BusError> {
    let frequency = frequency.trim();
    if frequency.is_empty() {
        return Ok(std::time::Duration::ZERO);
    }
    humantime::parse_duration(frequency).map_err(|e| {
        BusError::validation(format!("invalid frequency: {}", frequency)).with_source(e)
    })
}

/// Renders a reminder frequency, e.g. `"15m"` or `"1h 30m"`.
pub fn format_frequency(frequency: std::time::Duration) -> String {
    if frequency.is_zero() {
        return String::new();
    }
    humantime::format_duration(frequency).to_string()
}
