//! The catalog of notifier plugins channels can be created for.

use crate::bus::{Bus, DispatchContext};
use crate::error::BusError;
use crate::models::{GetNotifierPluginsQuery, NotifierPlugin};

struct CatalogEntry {
    kind: &'static str,
    name: &'static str,
    heading: &'static str,
    description: &'static str,
    secure_options: &'static [&'static str],
    legacy: bool,
    unified: bool,
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        kind: "email",
        name: "Email",
        heading: "Email settings",
        description: "Sends notifications using the configured SMTP settings",
        secure_options: &[],
        legacy: true,
        unified: true,
    },
    CatalogEntry {
        kind: "slack",
        name: "Slack",
        heading: "Slack settings",
        description: "Sends notifications to Slack",
        secure_options: &["url", "token"],
        legacy: true,
        unified: true,
    },
    CatalogEntry {
        kind: "webhook",
        name: "webhook",
        heading: "Webhook settings",
        description: "Sends HTTP POST request to a URL",
        secure_options: &["password"],
        legacy: true,
        unified: true,
    },
    CatalogEntry {
        kind: "pagerduty",
        name: "PagerDuty",
        heading: "PagerDuty settings",
        description: "Sends notifications to PagerDuty",
        secure_options: &["integrationKey"],
        legacy: true,
        unified: true,
    },
    CatalogEntry {
        kind: "opsgenie",
        name: "OpsGenie",
        heading: "OpsGenie settings",
        description: "Sends notifications to OpsGenie",
        secure_options: &["apiKey"],
        legacy: true,
        unified: true,
    },
    CatalogEntry {
        kind: "teams",
        name: "Microsoft Teams",
        heading: "Teams settings",
        description: "Sends notifications using Incoming Webhook connector to Microsoft Teams",
        secure_options: &[],
        legacy: true,
        unified: true,
    },
    CatalogEntry {
        kind: "telegram",
        name: "Telegram",
        heading: "Telegram API settings",
        description: "Sends notifications to Telegram",
        secure_options: &["bottoken"],
        legacy: true,
        unified: true,
    },
    CatalogEntry {
        kind: "hipchat",
        name: "HipChat",
        heading: "HipChat settings",
        description: "Sends notifications to a HipChat Room",
        secure_options: &[],
        legacy: true,
        unified: false,
    },
    CatalogEntry {
        kind: "sensugo",
        name: "Sensu Go",
        heading: "Sensu Go Settings",
        description: "Sends HTTP POST request to a Sensu Go API",
        secure_options: &["apikey"],
        legacy: false,
        unified: true,
    },
];

/// The notifier plugins available under the chosen alerting engine.
pub fn available_notifiers(unified_alerting: bool) -> Vec<NotifierPlugin> {
    CATALOG
        .iter()
        .filter(|e| if unified_alerting { e.unified } else { e.legacy })
        .map(|e| NotifierPlugin {
            kind: e.kind.to_string(),
            name: e.name.to_string(),
            heading: e.heading.to_string(),
            description: e.description.to_string(),
            secure_options: e.secure_options.iter().map(|o| o.to_string()).collect(),
        })
        .collect()
}

/// Registers the catalog as the [`GetNotifierPluginsQuery`] handler.
pub fn register(bus: &mut Bus) -> Result<(), BusError> {
    bus.register_fn::<GetNotifierPluginsQuery, _>(|_: &DispatchContext, q| {
        Ok(available_notifiers(q.unified_alerting))
    })
}
