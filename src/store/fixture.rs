//! YAML fixtures that seed a [`MemoryStore`].
//!
//! ```yaml
//! dashboards:
//!   - { id: 1, uid: ops, orgId: 1, title: Ops, slug: ops }
//! alerts:
//!   - { id: 10, orgId: 1, dashboardId: 1, panelId: 2, name: High CPU, state: alerting }
//! notifications:
//!   - id: 1
//!     uid: slack-ops
//!     orgId: 1
//!     name: Ops Slack
//!     type: slack
//!     frequency: 15m
//!     secureSettings: { url: "https://hooks.slack.com/services/..." }
//! ```

use super::MemoryStore;
use crate::core::{AlertRule, Dashboard, NotificationChannel, SecretsCodec};
use crate::models::parse_frequency;
use crate::secrets::EncryptedSettings;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use itertools::Itertools;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A notification channel as written in a fixture, secrets in plaintext.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FixtureChannel {
    pub id: i64,
    pub uid: String,
    pub org_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_default: bool,
    pub send_reminder: bool,
    pub disable_resolve_message: bool,
    pub frequency: String,
    pub settings: Value,
    pub secure_settings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct Fixture {
    pub dashboards: Vec<Dashboard>,
    pub alerts: Vec<AlertRule>,
    pub notifications: Vec<FixtureChannel>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to load fixture file: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let fixture: Fixture =
            serde_yml::from_str(content).context("Failed to parse fixture YAML")?;
        fixture.validate()?;
        Ok(fixture)
    }

    fn validate(&self) -> Result<()> {
        if let Some(id) = self.dashboards.iter().map(|d| d.id).duplicates().next() {
            bail!("duplicate dashboard id {}", id);
        }
        if let Some(id) = self.alerts.iter().map(|a| a.id).duplicates().next() {
            bail!("duplicate alert id {}", id);
        }
        if let Some(id) = self.notifications.iter().map(|c| c.id).duplicates().next() {
            bail!("duplicate notification id {}", id);
        }
        if let Some((org_id, uid)) = self
            .notifications
            .iter()
            .filter(|c| !c.uid.is_empty())
            .map(|c| (c.org_id, c.uid.as_str()))
            .duplicates()
            .next()
        {
            bail!("duplicate notification uid '{}' in org {}", uid, org_id);
        }
        Ok(())
    }
}

impl MemoryStore {
    /// Builds a store seeded with `fixture`, encrypting channel secrets with
    /// `codec`.
    pub fn from_fixture(fixture: Fixture, codec: Arc<dyn SecretsCodec>) -> Result<Self> {
        let store = MemoryStore::new(codec.clone());
        let (dashboards, alerts, channels) = (
            fixture.dashboards.len(),
            fixture.alerts.len(),
            fixture.notifications.len(),
        );

        for dashboard in fixture.dashboards {
            store.insert_dashboard(dashboard)?;
        }
        for alert in fixture.alerts {
            store.insert_alert(alert)?;
        }

        let now = Utc::now();
        for channel in fixture.notifications {
            let frequency = parse_frequency(&channel.frequency)
                .with_context(|| format!("Invalid frequency for notification '{}'", channel.name))?;
            let secure_settings = EncryptedSettings::encrypt(&channel.secure_settings, codec.as_ref())?;
            let uid = if channel.uid.is_empty() {
                super::memory::generate_short_uid()
            } else {
                channel.uid
            };
            store.insert_channel(NotificationChannel {
                id: channel.id,
                uid,
                org_id: channel.org_id,
                name: channel.name,
                kind: channel.kind,
                is_default: channel.is_default,
                send_reminder: channel.send_reminder,
                disable_resolve_message: channel.disable_resolve_message,
                frequency,
                settings: channel.settings,
                secure_settings,
                created: now,
                updated: now,
            })?;
        }

        info!(dashboards, alerts, channels, "Memory store seeded from fixture");
        Ok(store)
    }
}
