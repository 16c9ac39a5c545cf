//! Preserves stored secrets across partial notification-channel updates.
//!
//! Update handlers persist whatever secure-settings map they receive. Before
//! an update that touches secrets is dispatched, every stored key the caller
//! did not resend is decrypted and copied into the command, so a partial
//! update never drops a secret.
//!
//! The fetch and the later update are two separate dispatches with no
//! isolation between them; a concurrent update of the same channel in that
//! window can be overwritten.

use crate::bus::{Bus, DispatchContext};
use crate::core::{NotificationChannel, SecretsCodec};
use crate::error::BusError;
use crate::models::{
    notification_not_found, GetAlertNotificationsQuery, GetAlertNotificationsWithUidQuery,
    UpdateAlertNotificationCommand, UpdateAlertNotificationWithUidCommand,
};
use std::collections::BTreeMap;
use tracing::debug;

/// An update command that carries secure settings and knows how to fetch the
/// channel it targets.
pub trait SecureSettingsUpdate {
    fn secure_settings_mut(&mut self) -> &mut BTreeMap<String, String>;

    /// Loads the stored channel this update addresses.
    fn fetch_stored(
        &self,
        bus: &Bus,
        ctx: &DispatchContext,
    ) -> Result<NotificationChannel, BusError>;
}

impl SecureSettingsUpdate for UpdateAlertNotificationCommand {
    fn secure_settings_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.secure_settings
    }

    fn fetch_stored(
        &self,
        bus: &Bus,
        ctx: &DispatchContext,
    ) -> Result<NotificationChannel, BusError> {
        let query = GetAlertNotificationsQuery {
            org_id: self.org_id,
            id: self.id,
        };
        bus.dispatch_with_context(ctx, &query)?
            .ok_or_else(notification_not_found)
    }
}

impl SecureSettingsUpdate for UpdateAlertNotificationWithUidCommand {
    fn secure_settings_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.secure_settings
    }

    fn fetch_stored(
        &self,
        bus: &Bus,
        ctx: &DispatchContext,
    ) -> Result<NotificationChannel, BusError> {
        let query = GetAlertNotificationsWithUidQuery {
            org_id: self.org_id,
            uid: self.uid.clone(),
        };
        bus.dispatch_with_context(ctx, &query)?
            .ok_or_else(notification_not_found)
    }
}

/// Fills every stored secure-setting key missing from `cmd` with its
/// decrypted stored value. Keys already present keep the caller's value.
///
/// Does nothing (and fetches nothing) when `cmd` carries no secure settings.
/// Returns the number of keys copied in. On error `cmd` is left unchanged.
pub fn fill_with_secure_settings<C: SecureSettingsUpdate>(
    bus: &Bus,
    ctx: &DispatchContext,
    codec: &dyn SecretsCodec,
    cmd: &mut C,
) -> Result<usize, BusError> {
    if cmd.secure_settings_mut().is_empty() {
        return Ok(0);
    }

    let stored = cmd.fetch_stored(bus, ctx)?;
    let decrypted = stored.secure_settings.decrypt(codec)?;

    let incoming = cmd.secure_settings_mut();
    let mut filled = 0;
    for (key, value) in decrypted {
        if !incoming.contains_key(&key) {
            incoming.insert(key, value);
            filled += 1;
        }
    }

    debug!(
        channel_id = stored.id,
        channel_uid = %stored.uid,
        filled,
        "Merged stored secure settings into update"
    );
    Ok(filled)
}
