#![allow(dead_code)]

pub mod test_metrics;

use alertbus::api::{AlertingApi, ReqContext};
use alertbus::bus::{Bus, Message};
use alertbus::core::{OrgRole, SecretsCodec, SignedInUser};
use alertbus::error::BusError;
use alertbus::guardian::OrgRoleGuardian;
use alertbus::notifiers;
use alertbus::secrets::SivSecretsCodec;
use alertbus::store::{Fixture, MemoryStore};
use std::sync::{Arc, Mutex};

/// Two dashboards and a folder in org 1, seven alerts in org 1, one in org 2
/// and two notification channels.
pub const FIXTURE: &str = r##"
dashboards:
  - { id: 1, uid: ops, orgId: 1, title: Ops Overview, slug: ops-overview, tags: [prod] }
  - { id: 2, uid: db, orgId: 1, title: Databases, slug: databases, folderId: 3 }
  - { id: 3, uid: infra, orgId: 1, title: Infra, slug: infra, isFolder: true }
alerts:
  - { id: 1, orgId: 1, dashboardId: 1, panelId: 1, name: High CPU, state: alerting }
  - { id: 2, orgId: 1, dashboardId: 1, panelId: 2, name: Disk Full, state: ok }
  - { id: 3, orgId: 1, dashboardId: 1, panelId: 3, name: Memory, state: paused }
  - { id: 4, orgId: 1, dashboardId: 2, panelId: 1, name: Replication Lag, state: pending }
  - { id: 5, orgId: 1, dashboardId: 2, panelId: 2, name: Connections, state: no_data }
  - { id: 6, orgId: 1, dashboardId: 2, panelId: 3, name: Slow Queries, state: unknown }
  - { id: 7, orgId: 1, dashboardId: 2, panelId: 4, name: Deadlocks, state: ok }
  - { id: 8, orgId: 2, dashboardId: 9, panelId: 1, name: Other Org, state: alerting }
notifications:
  - id: 1
    uid: ops-slack
    orgId: 1
    name: Ops Slack
    type: slack
    frequency: 15m
    sendReminder: true
    settings: { recipient: "#ops" }
    secureSettings: { url: "https://hooks.slack.com/services/T000", token: xoxb-1 }
  - id: 2
    uid: ops-email
    orgId: 1
    name: Ops Email
    type: email
    isDefault: true
    settings: { addresses: ops@example.com }
"##;

pub const SECRET_KEY: &str = "integration-secret";

pub fn user(org_id: i64, org_role: OrgRole) -> ReqContext {
    ReqContext::new(SignedInUser {
        user_id: 10,
        org_id,
        login: format!("{:?}", org_role).to_lowercase(),
        org_role,
    })
}

pub fn admin() -> ReqContext {
    user(1, OrgRole::Admin)
}

pub fn editor() -> ReqContext {
    user(1, OrgRole::Editor)
}

pub fn viewer() -> ReqContext {
    user(1, OrgRole::Viewer)
}

/// Registers a handler for `M` that records every message it receives and
/// answers with `respond`.
pub fn record<M, F>(bus: &mut Bus, respond: F) -> Arc<Mutex<Vec<M>>>
where
    M: Message + Clone,
    F: Fn(&M) -> Result<M::Output, BusError> + Send + Sync + 'static,
{
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    bus.register_fn::<M, _>(move |_, msg| {
        recorder.lock().unwrap().push(msg.clone());
        respond(msg)
    })
    .unwrap();
    seen
}

/// A store seeded from a fixture, its bus and the operations on top.
pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub codec: Arc<dyn SecretsCodec>,
    pub api: AlertingApi,
}

pub struct TestEnvBuilder {
    fixture: String,
    unified_alerting: bool,
    extra: Vec<Box<dyn FnOnce(&mut Bus)>>,
}

impl TestEnvBuilder {
    pub fn new() -> Self {
        Self {
            fixture: FIXTURE.to_string(),
            unified_alerting: false,
            extra: Vec::new(),
        }
    }

    pub fn with_fixture(mut self, fixture: &str) -> Self {
        self.fixture = fixture.to_string();
        self
    }

    pub fn with_unified_alerting(mut self) -> Self {
        self.unified_alerting = true;
        self
    }

    /// Registers additional handlers, e.g. an evaluation engine stand-in.
    pub fn with_handlers(mut self, register: impl FnOnce(&mut Bus) + 'static) -> Self {
        self.extra.push(Box::new(register));
        self
    }

    pub fn build(self) -> TestEnv {
        let codec: Arc<dyn SecretsCodec> = Arc::new(SivSecretsCodec::new(SECRET_KEY));
        let fixture = Fixture::from_yaml(&self.fixture).unwrap();
        let store = Arc::new(MemoryStore::from_fixture(fixture, codec.clone()).unwrap());

        let mut bus = Bus::new();
        store.clone().register(&mut bus).unwrap();
        notifiers::register(&mut bus).unwrap();
        for register in self.extra {
            register(&mut bus);
        }

        let api = AlertingApi::new(Arc::new(bus), Arc::new(OrgRoleGuardian), codec.clone())
            .with_unified_alerting(self.unified_alerting);
        TestEnv { store, codec, api }
    }
}

/// The operations over a bus built by the test, without a store.
pub fn api_over(bus: Bus) -> AlertingApi {
    AlertingApi::new(
        Arc::new(bus),
        Arc::new(OrgRoleGuardian),
        Arc::new(SivSecretsCodec::new(SECRET_KEY)),
    )
}
