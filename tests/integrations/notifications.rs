use alertbus::models::{
    smtp_not_enabled, CreateAlertNotificationCommand, NotificationTestCommand,
    UpdateAlertNotificationCommand, UpdateAlertNotificationWithUidCommand,
};
use serde_json::json;
use std::collections::BTreeMap;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::{admin, test_metrics::TestMetrics, user, TestEnvBuilder};

fn secrets(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_list_and_lookup() {
    let env = TestEnvBuilder::new().build();

    let all = env.api.get_alert_notifications(&admin()).unwrap();
    let names: Vec<_> = all.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Ops Email", "Ops Slack"]);

    let lookup = env.api.get_alert_notification_lookup(&admin()).unwrap();
    let body = serde_json::to_value(&lookup).unwrap();
    assert_eq!(body[0]["isDefault"], true);
    assert!(body[0].get("settings").is_none());

    assert!(env
        .api
        .get_alert_notifications(&user(2, alertbus::core::OrgRole::Admin))
        .unwrap()
        .is_empty());
}

#[test]
fn test_secure_values_are_never_returned() {
    let env = TestEnvBuilder::new().build();

    let dto = env.api.get_alert_notification_by_uid(&admin(), "ops-slack").unwrap();
    let body = serde_json::to_value(&dto).unwrap();

    assert_eq!(body["secureFields"], json!({"token": true, "url": true}));
    assert_eq!(body["frequency"], "15m");
    assert!(!body.to_string().contains("xoxb-1"));
}

#[test]
fn test_lookup_errors() {
    let env = TestEnvBuilder::new().build();

    let err = env.api.get_alert_notification_by_id(&admin(), 0).unwrap_err();
    assert_eq!(err.status(), 404);

    let err = env.api.get_alert_notification_by_id(&admin(), 99).unwrap_err();
    assert_eq!(err.status(), 404);
    assert_eq!(err.message(), "Alert notification not found");

    let err = env.api.get_alert_notification_by_uid(&admin(), "nope").unwrap_err();
    assert_eq!(err.status(), 404);
}

#[test]
fn test_create_forces_caller_org_and_rejects_duplicates() {
    let env = TestEnvBuilder::new().build();
    let cmd = CreateAlertNotificationCommand {
        org_id: 42,
        name: "Pager".to_string(),
        kind: "pagerduty".to_string(),
        secure_settings: secrets(&[("integrationKey", "pd-key")]),
        ..Default::default()
    };

    let created = env.api.create_alert_notification(&admin(), cmd.clone()).unwrap();
    assert_eq!(created.id, 3);
    assert_eq!(env.store.channel(created.id).unwrap().unwrap().org_id, 1);

    let err = env.api.create_alert_notification(&admin(), cmd).unwrap_err();
    assert_eq!(err.status(), 409);
    assert_eq!(err.message(), "Failed to create alert notification");
}

#[test]
fn test_create_with_out_of_range_frequency_fails_cleanly() {
    let env = TestEnvBuilder::new().build();
    let cmd = CreateAlertNotificationCommand {
        name: "Pager".to_string(),
        kind: "pagerduty".to_string(),
        frequency: "300000000000000d".to_string(),
        send_reminder: true,
        ..Default::default()
    };

    let err = env.api.create_alert_notification(&admin(), cmd).unwrap_err();
    assert_eq!(err.status(), 500);
    assert_eq!(err.message(), "Failed to create alert notification");
    assert_eq!(env.api.get_alert_notifications(&admin()).unwrap().len(), 2);
}

#[test]
fn test_partial_update_keeps_stored_secrets() {
    let env = TestEnvBuilder::new().build();
    let cmd = UpdateAlertNotificationCommand {
        id: 1,
        uid: "ops-slack".to_string(),
        name: "Ops Slack".to_string(),
        kind: "slack".to_string(),
        frequency: "1h".to_string(),
        send_reminder: true,
        secure_settings: secrets(&[("token", "xoxb-2")]),
        ..Default::default()
    };

    let dto = env.api.update_alert_notification(&admin(), cmd).unwrap();
    assert_eq!(dto.frequency, "1h");

    let stored = env.store.channel(1).unwrap().unwrap();
    let plain = stored.secure_settings.decrypt(env.codec.as_ref()).unwrap();
    assert_eq!(
        plain,
        secrets(&[("token", "xoxb-2"), ("url", "https://hooks.slack.com/services/T000")])
    );
}

#[test]
fn test_update_without_secrets_does_not_fetch() {
    let env = TestEnvBuilder::new().build();
    let metrics = TestMetrics::new();
    let cmd = UpdateAlertNotificationCommand {
        id: 2,
        name: "Ops Mail".to_string(),
        kind: "email".to_string(),
        settings: json!({"addresses": "oncall@example.com"}),
        ..Default::default()
    };

    let dto = metrics::with_local_recorder(&metrics, || {
        env.api.update_alert_notification(&admin(), cmd)
    })
    .unwrap();

    assert_eq!(dto.name, "Ops Mail");
    assert_eq!(dto.uid, "ops-email");
    // Only the re-fetch after the update.
    assert_eq!(metrics.dispatches("GetAlertNotificationsQuery"), 1);
}

#[test]
fn test_update_unknown_channel() {
    let env = TestEnvBuilder::new().build();

    let err = env
        .api
        .update_alert_notification(
            &admin(),
            UpdateAlertNotificationCommand {
                id: 77,
                name: "Ghost".to_string(),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.status(), 404);

    // With secrets the merge fetch fails first.
    let err = env
        .api
        .update_alert_notification(
            &admin(),
            UpdateAlertNotificationCommand {
                id: 77,
                name: "Ghost".to_string(),
                secure_settings: secrets(&[("a", "1")]),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.status(), 500);
    assert_eq!(err.message(), "Failed to update alert notification");
}

#[test]
fn test_update_by_uid_can_rename_uid() {
    let env = TestEnvBuilder::new().build();
    let cmd = UpdateAlertNotificationWithUidCommand {
        new_uid: "slack-ops".to_string(),
        name: "Ops Slack".to_string(),
        kind: "slack".to_string(),
        secure_settings: secrets(&[("url", "https://hooks.slack.com/services/T111")]),
        ..Default::default()
    };

    let dto = env
        .api
        .update_alert_notification_by_uid(&admin(), "ops-slack", cmd)
        .unwrap();
    assert_eq!(dto.uid, "slack-ops");
    assert_eq!(dto.id, 1);
    assert_eq!(dto.secure_fields.len(), 2);

    let plain = env
        .store
        .channel(1)
        .unwrap()
        .unwrap()
        .secure_settings
        .decrypt(env.codec.as_ref())
        .unwrap();
    assert_eq!(plain["token"], "xoxb-1");
    assert_eq!(plain["url"], "https://hooks.slack.com/services/T111");
}

#[test]
fn test_delete() {
    let env = TestEnvBuilder::new().build();

    let res = env.api.delete_alert_notification(&admin(), 2).unwrap();
    assert_eq!(res.message, "Notification deleted");
    assert_eq!(env.api.delete_alert_notification(&admin(), 2).unwrap_err().status(), 404);

    let res = env
        .api
        .delete_alert_notification_by_uid(&admin(), "ops-slack")
        .unwrap();
    assert_eq!(res.id, 1);
    assert!(env.api.get_alert_notifications(&admin()).unwrap().is_empty());
}

#[test]
fn test_notifier_catalog_depends_on_engine() {
    let legacy = TestEnvBuilder::new().build();
    let unified = TestEnvBuilder::new().with_unified_alerting().build();

    let kinds = |env: &helpers::TestEnv| -> Vec<String> {
        env.api
            .get_alert_notifiers(&admin())
            .unwrap()
            .into_iter()
            .map(|n| n.kind)
            .collect()
    };

    assert!(kinds(&legacy).contains(&"hipchat".to_string()));
    assert!(!kinds(&unified).contains(&"hipchat".to_string()));
    assert!(kinds(&unified).contains(&"sensugo".to_string()));
}

#[test]
fn test_notification_test_reports_missing_smtp() {
    let env = TestEnvBuilder::new()
        .with_handlers(|bus| {
            bus.register_fn::<NotificationTestCommand, _>(|_, cmd| {
                if cmd.kind == "email" {
                    Err(smtp_not_enabled())
                } else {
                    Ok(())
                }
            })
            .unwrap();
        })
        .build();

    let email = NotificationTestCommand {
        name: "Ops Email".to_string(),
        kind: "email".to_string(),
        ..Default::default()
    };
    let err = env.api.notification_test(&admin(), email).unwrap_err();
    assert_eq!(err.status(), 412);
    assert_eq!(err.message(), alertbus::models::ERR_SMTP_NOT_ENABLED);

    let slack = NotificationTestCommand {
        name: "Ops Slack".to_string(),
        kind: "slack".to_string(),
        ..Default::default()
    };
    let res = env.api.notification_test(&admin(), slack).unwrap();
    assert_eq!(res.message, "Test notification sent");
}
