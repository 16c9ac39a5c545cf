//! An in-memory implementation of the alert, notification and dashboard
//! search handlers.
//!
//! Every handler checks the dispatch context for cancellation before it
//! touches state. Secure settings are encrypted on the way in and are never
//! decrypted by the store.

use crate::bus::{Bus, DispatchContext, Message};
use crate::core::{
    dashboard_url, AlertListItem, AlertRule, AlertState, AlertStateInfo, Dashboard,
    NotificationChannel, SecretsCodec,
};
use crate::error::BusError;
use crate::models::{
    notification_not_found, notification_same_name_exists, notification_same_uid_exists,
    parse_frequency, CreateAlertNotificationCommand, DashboardHit, DashboardHitType,
    DeleteAlertNotificationCommand, DeleteAlertNotificationWithUidCommand,
    GetAlertByIdQuery, GetAlertNotificationsQuery, GetAlertNotificationsWithUidQuery,
    GetAlertStatesForDashboardQuery, GetAlertsQuery, GetAllAlertNotificationsQuery,
    PauseAlertCommand, PauseAllAlertsCommand, SearchDashboardsQuery,
    UpdateAlertNotificationCommand, UpdateAlertNotificationWithUidCommand,
};
use crate::secrets::EncryptedSettings;
use chrono::Utc;
use itertools::Itertools;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

const SHORT_UID_LEN: usize = 9;

#[derive(Default)]
struct StoreState {
    dashboards: BTreeMap<i64, Dashboard>,
    alerts: BTreeMap<i64, AlertRule>,
    channels: BTreeMap<i64, NotificationChannel>,
    next_channel_id: i64,
}

/// The writable fields shared by both notification update commands.
struct ChannelChanges<'a> {
    uid: &'a str,
    name: &'a str,
    kind: &'a str,
    send_reminder: bool,
    disable_resolve_message: bool,
    frequency: &'a str,
    is_default: bool,
    settings: &'a Value,
    secure_settings: &'a BTreeMap<String, String>,
}

/// In-memory storage for dashboards, alert rules and notification channels.
pub struct MemoryStore {
    state: RwLock<StoreState>,
    codec: Arc<dyn SecretsCodec>,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    pub fn new(codec: Arc<dyn SecretsCodec>) -> Self {
        Self {
            state: RwLock::new(StoreState {
                next_channel_id: 1,
                ..Default::default()
            }),
            codec,
        }
    }

    pub fn insert_dashboard(&self, dashboard: Dashboard) -> Result<(), BusError> {
        self.write()?.dashboards.insert(dashboard.id, dashboard);
        Ok(())
    }

    pub fn insert_alert(&self, alert: AlertRule) -> Result<(), BusError> {
        self.write()?.alerts.insert(alert.id, alert);
        Ok(())
    }

    /// Inserts an already-built channel, keeping its id.
    pub fn insert_channel(&self, channel: NotificationChannel) -> Result<(), BusError> {
        let mut state = self.write()?;
        state.next_channel_id = state.next_channel_id.max(channel.id + 1);
        state.channels.insert(channel.id, channel);
        Ok(())
    }

    pub fn alert(&self, id: i64) -> Result<Option<AlertRule>, BusError> {
        Ok(self.read()?.alerts.get(&id).cloned())
    }

    pub fn channel(&self, id: i64) -> Result<Option<NotificationChannel>, BusError> {
        Ok(self.read()?.channels.get(&id).cloned())
    }

    /// Registers a handler for every query and command this store answers.
    pub fn register(self: Arc<Self>, bus: &mut Bus) -> Result<(), BusError> {
        route(&self, bus, MemoryStore::get_alert_by_id)?;
        route(&self, bus, MemoryStore::get_alerts)?;
        route(&self, bus, MemoryStore::get_alert_states_for_dashboard)?;
        route(&self, bus, MemoryStore::pause_alert)?;
        route(&self, bus, MemoryStore::pause_all_alerts)?;
        route(&self, bus, MemoryStore::search_dashboards)?;
        route(&self, bus, MemoryStore::get_all_notifications)?;
        route(&self, bus, MemoryStore::get_notification)?;
        route(&self, bus, MemoryStore::get_notification_by_uid)?;
        route(&self, bus, MemoryStore::create_notification)?;
        route(&self, bus, MemoryStore::update_notification)?;
        route(&self, bus, MemoryStore::update_notification_by_uid)?;
        route(&self, bus, MemoryStore::delete_notification)?;
        route(&self, bus, MemoryStore::delete_notification_by_uid)?;
        info!(handlers = bus.registered().len(), "Memory store handlers registered");
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, BusError> {
        self.state
            .read()
            .map_err(|_| BusError::upstream("memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, BusError> {
        self.state
            .write()
            .map_err(|_| BusError::upstream("memory store lock poisoned"))
    }

    // --- Alerts ---

    fn get_alert_by_id(&self, q: &GetAlertByIdQuery) -> Result<AlertRule, BusError> {
        self.read()?
            .alerts
            .get(&q.id)
            .cloned()
            .ok_or_else(|| BusError::not_found("alert not found"))
    }

    fn get_alerts(&self, q: &GetAlertsQuery) -> Result<Vec<AlertListItem>, BusError> {
        let state = self.read()?;
        let needle = q.query.to_lowercase();

        let items = state
            .alerts
            .values()
            .filter(|a| a.org_id == q.org_id)
            .filter(|a| q.dashboard_ids.is_empty() || q.dashboard_ids.contains(&a.dashboard_id))
            .filter(|a| q.panel_id == 0 || a.panel_id == q.panel_id)
            .filter(|a| {
                q.state.is_empty()
                    || q.state
                        .iter()
                        .any(|s| s == "all" || s.as_str() == a.state.as_str())
            })
            .filter(|a| needle.is_empty() || a.name.to_lowercase().contains(&needle))
            .sorted_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)))
            .take(if q.limit > 0 { q.limit as usize } else { usize::MAX })
            .map(|a| {
                let (uid, slug) = state
                    .dashboards
                    .get(&a.dashboard_id)
                    .map(|d| (d.uid.clone(), d.slug.clone()))
                    .unwrap_or_default();
                AlertListItem {
                    id: a.id,
                    dashboard_id: a.dashboard_id,
                    dashboard_uid: uid,
                    dashboard_slug: slug,
                    panel_id: a.panel_id,
                    name: a.name.clone(),
                    state: a.state,
                    new_state_date: a.new_state_date,
                    execution_error: a.execution_error.clone(),
                    eval_data: a.eval_data.clone(),
                    url: String::new(),
                }
            })
            .collect();
        Ok(items)
    }

    fn get_alert_states_for_dashboard(
        &self,
        q: &GetAlertStatesForDashboardQuery,
    ) -> Result<Vec<AlertStateInfo>, BusError> {
        Ok(self
            .read()?
            .alerts
            .values()
            .filter(|a| a.org_id == q.org_id && a.dashboard_id == q.dashboard_id)
            .map(|a| AlertStateInfo {
                id: a.id,
                dashboard_id: a.dashboard_id,
                panel_id: a.panel_id,
                state: a.state,
                new_state_date: a.new_state_date,
            })
            .collect())
    }

    fn pause_alert(&self, cmd: &PauseAlertCommand) -> Result<usize, BusError> {
        let mut state = self.write()?;
        let now = Utc::now();
        let mut affected = 0;
        for id in &cmd.alert_ids {
            if let Some(alert) = state.alerts.get_mut(id) {
                if alert.org_id != cmd.org_id {
                    continue;
                }
                alert.state = paused_state(cmd.paused);
                alert.new_state_date = now;
                affected += 1;
            }
        }
        debug!(affected, paused = cmd.paused, "Paused alerts");
        Ok(affected)
    }

    fn pause_all_alerts(&self, cmd: &PauseAllAlertsCommand) -> Result<usize, BusError> {
        let mut state = self.write()?;
        let now = Utc::now();
        let mut affected = 0;
        for alert in state
            .alerts
            .values_mut()
            .filter(|a| a.org_id == cmd.org_id)
        {
            alert.state = paused_state(cmd.paused);
            alert.new_state_date = now;
            affected += 1;
        }
        debug!(affected, org_id = cmd.org_id, paused = cmd.paused, "Paused all alerts");
        Ok(affected)
    }

    // --- Dashboards ---

    // No per-dashboard permissions are kept here; every dashboard of the org
    // is visible.
    fn search_dashboards(&self, q: &SearchDashboardsQuery) -> Result<Vec<DashboardHit>, BusError> {
        let state = self.read()?;
        let title = q.title.to_lowercase();

        let hits = state
            .dashboards
            .values()
            .filter(|d| d.org_id == q.org_id)
            .filter(|d| match q.hit_type {
                Some(DashboardHitType::Dashboard) => !d.is_folder,
                Some(DashboardHitType::Folder) => d.is_folder,
                None => true,
            })
            .filter(|d| title.is_empty() || d.title.to_lowercase().contains(&title))
            .filter(|d| q.tags.iter().all(|t| d.tags.contains(t)))
            .filter(|d| q.dashboard_ids.is_empty() || q.dashboard_ids.contains(&d.id))
            .filter(|d| q.folder_ids.is_empty() || q.folder_ids.contains(&d.folder_id))
            .take(if q.limit > 0 { q.limit } else { usize::MAX })
            .map(|d| DashboardHit {
                id: d.id,
                uid: d.uid.clone(),
                title: d.title.clone(),
                hit_type: if d.is_folder {
                    DashboardHitType::Folder
                } else {
                    DashboardHitType::Dashboard
                },
                url: dashboard_url(&d.uid, &d.slug),
                tags: d.tags.clone(),
                folder_id: d.folder_id,
            })
            .collect();
        Ok(hits)
    }

    // --- Notification channels ---

    fn get_all_notifications(
        &self,
        q: &GetAllAlertNotificationsQuery,
    ) -> Result<Vec<NotificationChannel>, BusError> {
        Ok(self
            .read()?
            .channels
            .values()
            .filter(|c| c.org_id == q.org_id)
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .cloned()
            .collect())
    }

    fn get_notification(
        &self,
        q: &GetAlertNotificationsQuery,
    ) -> Result<Option<NotificationChannel>, BusError> {
        Ok(self
            .read()?
            .channels
            .get(&q.id)
            .filter(|c| c.org_id == q.org_id)
            .cloned())
    }

    fn get_notification_by_uid(
        &self,
        q: &GetAlertNotificationsWithUidQuery,
    ) -> Result<Option<NotificationChannel>, BusError> {
        Ok(self
            .read()?
            .channels
            .values()
            .find(|c| c.org_id == q.org_id && c.uid == q.uid)
            .cloned())
    }

    fn create_notification(
        &self,
        cmd: &CreateAlertNotificationCommand,
    ) -> Result<NotificationChannel, BusError> {
        validate_reminder(cmd.send_reminder, &cmd.frequency)?;
        let frequency = parse_frequency(&cmd.frequency)?;
        let secure_settings = EncryptedSettings::encrypt(&cmd.secure_settings, self.codec.as_ref())?;

        let mut state = self.write()?;
        if state
            .channels
            .values()
            .any(|c| c.org_id == cmd.org_id && c.name == cmd.name)
        {
            return Err(notification_same_name_exists());
        }
        let uid = if cmd.uid.is_empty() {
            generate_short_uid()
        } else {
            cmd.uid.clone()
        };
        if state
            .channels
            .values()
            .any(|c| c.org_id == cmd.org_id && c.uid == uid)
        {
            return Err(notification_same_uid_exists());
        }

        let now = Utc::now();
        let channel = NotificationChannel {
            id: state.next_channel_id,
            uid,
            org_id: cmd.org_id,
            name: cmd.name.clone(),
            kind: cmd.kind.clone(),
            is_default: cmd.is_default,
            send_reminder: cmd.send_reminder,
            disable_resolve_message: cmd.disable_resolve_message,
            frequency,
            settings: cmd.settings.clone(),
            secure_settings,
            created: now,
            updated: now,
        };
        state.next_channel_id += 1;
        state.channels.insert(channel.id, channel.clone());
        info!(id = channel.id, uid = %channel.uid, org_id = channel.org_id, "Created alert notification");
        Ok(channel)
    }

    fn update_notification(
        &self,
        cmd: &UpdateAlertNotificationCommand,
    ) -> Result<NotificationChannel, BusError> {
        let changes = ChannelChanges {
            uid: &cmd.uid,
            name: &cmd.name,
            kind: &cmd.kind,
            send_reminder: cmd.send_reminder,
            disable_resolve_message: cmd.disable_resolve_message,
            frequency: &cmd.frequency,
            is_default: cmd.is_default,
            settings: &cmd.settings,
            secure_settings: &cmd.secure_settings,
        };
        self.apply_update(cmd.org_id, |c| c.id == cmd.id, changes)
    }

    fn update_notification_by_uid(
        &self,
        cmd: &UpdateAlertNotificationWithUidCommand,
    ) -> Result<NotificationChannel, BusError> {
        let changes = ChannelChanges {
            uid: &cmd.new_uid,
            name: &cmd.name,
            kind: &cmd.kind,
            send_reminder: cmd.send_reminder,
            disable_resolve_message: cmd.disable_resolve_message,
            frequency: &cmd.frequency,
            is_default: cmd.is_default,
            settings: &cmd.settings,
            secure_settings: &cmd.secure_settings,
        };
        self.apply_update(cmd.org_id, |c| c.uid == cmd.uid, changes)
    }

    /// Replaces the channel of `org_id` matching `target`. An empty uid in
    /// `changes` keeps the current uid. Secure settings are stored exactly as
    /// given.
    fn apply_update(
        &self,
        org_id: i64,
        target: impl Fn(&NotificationChannel) -> bool,
        changes: ChannelChanges<'_>,
    ) -> Result<NotificationChannel, BusError> {
        validate_reminder(changes.send_reminder, changes.frequency)?;
        let frequency = parse_frequency(changes.frequency)?;
        let secure_settings =
            EncryptedSettings::encrypt(changes.secure_settings, self.codec.as_ref())?;

        let mut state = self.write()?;
        let existing = state
            .channels
            .values()
            .find(|c| c.org_id == org_id && target(c))
            .cloned()
            .ok_or_else(notification_not_found)?;

        let uid = if changes.uid.is_empty() {
            existing.uid.clone()
        } else {
            changes.uid.to_string()
        };
        let others = || {
            state
                .channels
                .values()
                .filter(|c| c.org_id == org_id && c.id != existing.id)
        };
        if others().any(|c| c.name == changes.name) {
            return Err(notification_same_name_exists());
        }
        if others().any(|c| c.uid == uid) {
            return Err(notification_same_uid_exists());
        }

        let channel = NotificationChannel {
            uid,
            name: changes.name.to_string(),
            kind: changes.kind.to_string(),
            is_default: changes.is_default,
            send_reminder: changes.send_reminder,
            disable_resolve_message: changes.disable_resolve_message,
            frequency,
            settings: changes.settings.clone(),
            secure_settings,
            updated: Utc::now(),
            ..existing
        };
        state.channels.insert(channel.id, channel.clone());
        info!(id = channel.id, uid = %channel.uid, org_id, "Updated alert notification");
        Ok(channel)
    }

    fn delete_notification(&self, cmd: &DeleteAlertNotificationCommand) -> Result<(), BusError> {
        let mut state = self.write()?;
        match state.channels.get(&cmd.id) {
            Some(c) if c.org_id == cmd.org_id => {
                state.channels.remove(&cmd.id);
                info!(id = cmd.id, org_id = cmd.org_id, "Deleted alert notification");
                Ok(())
            }
            _ => Err(notification_not_found()),
        }
    }

    fn delete_notification_by_uid(
        &self,
        cmd: &DeleteAlertNotificationWithUidCommand,
    ) -> Result<i64, BusError> {
        let mut state = self.write()?;
        let id = state
            .channels
            .values()
            .find(|c| c.org_id == cmd.org_id && c.uid == cmd.uid)
            .map(|c| c.id)
            .ok_or_else(notification_not_found)?;
        state.channels.remove(&id);
        info!(id, uid = %cmd.uid, org_id = cmd.org_id, "Deleted alert notification");
        Ok(id)
    }
}

/// Binds `handler` on `store` to message type `M`, checking the dispatch
/// context for cancellation first.
fn route<M, F>(store: &Arc<MemoryStore>, bus: &mut Bus, handler: F) -> Result<(), BusError>
where
    M: Message,
    F: Fn(&MemoryStore, &M) -> Result<M::Output, BusError> + Send + Sync + 'static,
{
    let store = Arc::clone(store);
    bus.register_fn::<M, _>(move |ctx: &DispatchContext, msg: &M| {
        ctx.check()?;
        handler(&store, msg)
    })
}

fn paused_state(paused: bool) -> AlertState {
    if paused {
        AlertState::Paused
    } else {
        AlertState::Unknown
    }
}

fn validate_reminder(send_reminder: bool, frequency: &str) -> Result<(), BusError> {
    if send_reminder && frequency.trim().is_empty() {
        return Err(BusError::validation("notification frequency not specified"));
    }
    Ok(())
}

/// A random 9 character alphanumeric uid.
pub fn generate_short_uid() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SHORT_UID_LEN)
        .map(char::from)
        .collect()
}
