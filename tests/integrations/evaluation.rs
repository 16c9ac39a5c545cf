use alertbus::bus::{Bus, DispatchContext};
use alertbus::core::{AlertRule, AlertState, DataSource, EvaluationResult, ResultLogEntry};
use alertbus::error::{BusError, ErrorKind};
use alertbus::evaluation::{
    self, AlertTestRequest, EvaluateAlertByIdRequest, EvaluateAlertRequest, EvaluationError,
};
use alertbus::models::{AlertTestCommand, EvaluateAlertByIdCommand, EvaluateAlertCommand};
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::{api_over, editor, record};

fn firing_result() -> EvaluationResult {
    EvaluationResult {
        firing: true,
        condition_evals: "true = true".to_string(),
        rule_state: AlertState::Alerting,
        logs: vec![ResultLogEntry {
            message: "Condition[0]: Eval: true".to_string(),
            data: json!(null),
        }],
        duration: Duration::from_nanos(12_345_600),
        ..Default::default()
    }
}

#[test]
fn test_unsaved_dashboard_fails_before_dispatch() {
    let mut bus = Bus::new();
    let seen = record::<AlertTestCommand, _>(&mut bus, |_| Ok(firing_result()));
    let req = AlertTestRequest {
        dashboard: json!({"id": 0, "panels": [{"id": 5}]}),
        panel_id: 5,
    };

    let err = evaluation::test_alert_rule(
        &bus,
        &DispatchContext::background(),
        &editor().user,
        &req,
        &BTreeMap::new(),
    )
    .unwrap_err();

    assert!(matches!(err, EvaluationError::DashboardNotSaved));
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_alert_test_forwards_caller_and_headers() {
    let mut bus = Bus::new();
    let seen = record::<AlertTestCommand, _>(&mut bus, |_| Ok(firing_result()));
    let api = api_over(bus);
    let req = editor().with_header("X-Grafana-Org-Id", "1");

    let res = api
        .alert_test(
            &req,
            &AlertTestRequest {
                dashboard: json!({"id": 8, "title": "Ops"}),
                panel_id: 2,
            },
        )
        .unwrap();

    assert!(res.firing);
    assert_eq!(res.state, "alerting");
    assert_eq!(res.time_ms, "12.346ms");

    let sent = seen.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].org_id, 1);
    assert_eq!(sent[0].panel_id, 2);
    assert_eq!(sent[0].user.login, "editor");
    assert_eq!(sent[0].headers["X-Grafana-Org-Id"], "1");
}

#[test]
fn test_missing_result_is_reported() {
    let mut bus = Bus::new();
    record::<EvaluateAlertCommand, _>(&mut bus, |_| Ok(None));
    let eval_time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let req = EvaluateAlertRequest {
        alert: AlertRule {
            id: 3,
            ..Default::default()
        },
        eval_time,
        data_source_url: None,
        custom_data_sources: Vec::new(),
    };

    let err = evaluation::evaluate_alert(
        &bus,
        &DispatchContext::background(),
        &req,
        &BTreeMap::new(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("result not found"));

    let err = api_over_evaluate_none().evaluate_alert(&editor(), &req).unwrap_err();
    assert_eq!(err.status(), 500);
    assert_eq!(
        err.message(),
        format!("Failed to check alert: 3, date: {}", eval_time)
    );
    assert_eq!(err.body()["error"], "result not found");
}

fn api_over_evaluate_none() -> alertbus::api::AlertingApi {
    let mut bus = Bus::new();
    record::<EvaluateAlertCommand, _>(&mut bus, |_| Ok(None));
    api_over(bus)
}

#[test]
fn test_custom_data_sources_are_forwarded() {
    let mut bus = Bus::new();
    let seen = record::<EvaluateAlertCommand, _>(&mut bus, |_| Ok(Some(firing_result())));
    let req = EvaluateAlertRequest {
        alert: AlertRule {
            id: 3,
            name: "High CPU".to_string(),
            ..Default::default()
        },
        eval_time: Utc::now(),
        data_source_url: Some("http://prometheus:9090".to_string()),
        custom_data_sources: vec![DataSource {
            uid: "prom".to_string(),
            kind: "prometheus".to_string(),
            url: "http://prometheus:9090".to_string(),
            ..Default::default()
        }],
    };

    let res = api_over(bus).evaluate_alert(&editor(), &req).unwrap();
    assert_eq!(res.condition_evals, "true = true");
    assert_eq!(res.logs.len(), 1);

    let sent = seen.lock().unwrap();
    assert_eq!(sent[0].custom_data_sources[0].uid, "prom");
    assert_eq!(sent[0].data_source_url.as_deref(), Some("http://prometheus:9090"));
}

#[test]
fn test_evaluate_by_id() {
    let mut bus = Bus::new();
    let seen = record::<EvaluateAlertByIdCommand, _>(&mut bus, |cmd| {
        if cmd.alert_id == 1 {
            Ok(Some(firing_result()))
        } else {
            Err(BusError::not_found("alert not found"))
        }
    });
    let api = api_over(bus);
    let eval_time = Utc::now();

    let res = api
        .evaluate_alert_by_id(&editor(), &EvaluateAlertByIdRequest { alert_id: 1, eval_time })
        .unwrap();
    assert!(res.firing);
    assert_eq!(seen.lock().unwrap()[0].eval_time, eval_time);

    let err = api
        .evaluate_alert_by_id(&editor(), &EvaluateAlertByIdRequest { alert_id: 2, eval_time })
        .unwrap_err();
    assert_eq!(err.status(), 500);
    assert_eq!(err.message(), "Failed to check alert");
}

#[test]
fn test_missing_result_by_id_names_the_entry_point() {
    let mut bus = Bus::new();
    record::<EvaluateAlertByIdCommand, _>(&mut bus, |_| Ok(None));
    let eval_time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

    let err = api_over(bus)
        .evaluate_alert_by_id(&editor(), &EvaluateAlertByIdRequest { alert_id: 4, eval_time })
        .unwrap_err();
    assert_eq!(err.status(), 500);
    assert_eq!(
        err.message(),
        format!("Failed to check alert by Id: 4, date: {}", eval_time)
    );
    assert_eq!(err.body()["error"], "result not found");
}

#[test]
fn test_engine_error_kind_is_kept() {
    let mut bus = Bus::new();
    record::<AlertTestCommand, _>(&mut bus, |_| Err(BusError::validation("no condition")));

    let err = evaluation::test_alert_rule(
        &bus,
        &DispatchContext::background(),
        &editor().user,
        &AlertTestRequest {
            dashboard: json!({"id": 1}),
            panel_id: 1,
        },
        &BTreeMap::new(),
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert_eq!(err.to_string(), "no condition");
}
