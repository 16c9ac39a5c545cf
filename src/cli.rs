//! Command-Line Interface (CLI) argument parsing.
//!
//! The arguments are parsed at startup and merged over the configuration from
//! `alertbus.toml` and the environment. Each subcommand maps to one alerting
//! operation, run as the configured organization's admin.

use crate::api::{AlertListFilter, AlertingApi, ApiError, ApiResult, ReqContext};
use clap::{Args, Parser, Subcommand};
use figment::{
    util::nest,
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use serde::Serialize;
use std::path::PathBuf;

/// Inspect and manage alert rules and notification channels.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// YAML fixture seeding the store.
    #[arg(long, value_name = "FILE", global = true)]
    pub fixture: Option<PathBuf>,

    /// Organization to act in.
    #[arg(long, value_name = "ID", global = true)]
    pub org_id: Option<i64>,

    /// Log level (overridden by RUST_LOG).
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// List the notifiers of the unified alerting engine.
    #[arg(long, global = true)]
    pub unified_alerting: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Alert rules.
    #[command(subcommand)]
    Alerts(AlertsCommand),
    /// Notification channels.
    #[command(subcommand)]
    Notifications(NotificationsCommand),
}

#[derive(Subcommand, Debug, Clone)]
pub enum AlertsCommand {
    /// List alert rules.
    List(ListArgs),
    /// Show one alert rule.
    Get { alert_id: i64 },
    /// Show the alert states of a dashboard.
    States { dashboard_id: i64 },
    /// Pause an alert rule.
    Pause {
        alert_id: i64,
        /// Un-pause instead.
        #[arg(long)]
        resume: bool,
    },
    /// Pause every alert rule.
    PauseAll {
        /// Un-pause instead.
        #[arg(long)]
        resume: bool,
    },
    /// List the available notifier plugins.
    Notifiers,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(long = "dashboard-id", value_name = "ID")]
    pub dashboard_ids: Vec<i64>,
    #[arg(long, default_value_t = 0)]
    pub panel_id: i64,
    #[arg(long, default_value_t = 0)]
    pub limit: i64,
    /// Free-text filter on the alert name.
    #[arg(long, default_value = "")]
    pub query: String,
    /// Alert states to include (e.g. alerting, paused, all).
    #[arg(long)]
    pub state: Vec<String>,
    /// Filter on dashboard title.
    #[arg(long, default_value = "")]
    pub dashboard_query: String,
    #[arg(long = "dashboard-tag", value_name = "TAG")]
    pub dashboard_tags: Vec<String>,
    #[arg(long = "folder-id", value_name = "ID")]
    pub folder_ids: Vec<i64>,
}

impl From<&ListArgs> for AlertListFilter {
    fn from(args: &ListArgs) -> Self {
        Self {
            dashboard_ids: args.dashboard_ids.clone(),
            panel_id: args.panel_id,
            limit: args.limit,
            query: args.query.clone(),
            state: args.state.clone(),
            dashboard_query: args.dashboard_query.clone(),
            dashboard_tags: args.dashboard_tags.clone(),
            folder_ids: args.folder_ids.clone(),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum NotificationsCommand {
    /// List notification channels.
    List,
    /// List notification channels in short form.
    Lookup,
    /// Show one notification channel.
    Get(ChannelRef),
    /// Delete a notification channel.
    Delete(ChannelRef),
}

/// Addresses a channel by id, or by uid with `--uid`.
#[derive(Args, Debug, Clone)]
pub struct ChannelRef {
    #[arg(required_unless_present = "uid")]
    pub id: Option<i64>,
    #[arg(long, conflicts_with = "id")]
    pub uid: Option<String>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }
        if let Some(org_id) = self.org_id {
            dict.insert("org_id".into(), Value::from(org_id));
        }
        // Only an explicit flag overrides the file.
        if self.unified_alerting {
            dict.insert("unified_alerting".into(), Value::from(true));
        }
        if let Some(path) = &self.fixture {
            let nested = nest("fixture.path", Value::from(path.display().to_string()));
            if let Value::Dict(_, nested) = nested {
                dict.extend(nested);
            }
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}

/// Runs `command` and returns its JSON body.
pub fn execute(api: &AlertingApi, req: &ReqContext, command: &Command) -> ApiResult<serde_json::Value> {
    match command {
        Command::Alerts(cmd) => match cmd {
            AlertsCommand::List(args) => to_json(api.get_alerts(req, &AlertListFilter::from(args))?),
            AlertsCommand::Get { alert_id } => to_json(api.get_alert(req, *alert_id)?),
            AlertsCommand::States { dashboard_id } => {
                to_json(api.get_alert_states_for_dashboard(req, *dashboard_id)?)
            }
            AlertsCommand::Pause { alert_id, resume } => {
                to_json(api.pause_alert(req, *alert_id, !resume)?)
            }
            AlertsCommand::PauseAll { resume } => to_json(api.pause_all_alerts(req, !resume)?),
            AlertsCommand::Notifiers => to_json(api.get_alert_notifiers(req)?),
        },
        Command::Notifications(cmd) => match cmd {
            NotificationsCommand::List => to_json(api.get_alert_notifications(req)?),
            NotificationsCommand::Lookup => to_json(api.get_alert_notification_lookup(req)?),
            NotificationsCommand::Get(ChannelRef { uid: Some(uid), .. }) => {
                to_json(api.get_alert_notification_by_uid(req, uid)?)
            }
            NotificationsCommand::Get(ChannelRef { id, .. }) => {
                to_json(api.get_alert_notification_by_id(req, id.unwrap_or_default())?)
            }
            NotificationsCommand::Delete(ChannelRef { uid: Some(uid), .. }) => {
                to_json(api.delete_alert_notification_by_uid(req, uid)?)
            }
            NotificationsCommand::Delete(ChannelRef { id, .. }) => {
                to_json(api.delete_alert_notification(req, id.unwrap_or_default())?)
            }
        },
    }
}

fn to_json<T: Serialize>(body: T) -> ApiResult<serde_json::Value> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::new(500, "Failed to serialize response").with_source(e))
}
