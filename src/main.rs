//! alertbus - alert rule and notification channel operations over a
//! command/query bus.

use alertbus::{
    api::{AlertingApi, ReqContext},
    bus::{Bus, DispatchContext},
    cli::{self, Cli},
    config::Config,
    core::{OrgRole, SecretsCodec, SignedInUser},
    guardian::OrgRoleGuardian,
    notifiers,
    secrets::SivSecretsCodec,
    store::{Fixture, MemoryStore},
};
use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {:#}", err);
            return Ok(ExitCode::FAILURE);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(
        org_id = config.org_id,
        unified_alerting = config.unified_alerting,
        fixture = ?config.fixture.path,
        "Configuration loaded"
    );

    let api = build_api(&config)?;
    let req = ReqContext::new(SignedInUser {
        user_id: 0,
        org_id: config.org_id,
        login: "admin".to_string(),
        org_role: OrgRole::Admin,
    });

    // Ctrl-C cancels the in-flight operation.
    let (cancel, ctx) = DispatchContext::cancellable();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });
    let req = req.with_context(ctx);

    let command = args.command;
    let result = tokio::task::spawn_blocking(move || cli::execute(&api, &req, &command))
        .await
        .context("Command task failed")?;

    match result {
        Ok(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!(status = err.status(), "{}", err.message());
            eprintln!("{}", serde_json::json!({ "status": err.status(), "message": err.message() }));
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Wires the bus with the in-memory store and the notifier catalog.
fn build_api(config: &Config) -> Result<AlertingApi> {
    let codec: Arc<dyn SecretsCodec> = Arc::new(SivSecretsCodec::new(&config.secrets.secret_key));

    let fixture = match &config.fixture.path {
        Some(path) => Fixture::load(path)?,
        None => {
            info!("No fixture configured, starting with an empty store");
            Fixture::default()
        }
    };
    let store = Arc::new(MemoryStore::from_fixture(fixture, codec.clone())?);

    let mut bus = Bus::new();
    store.register(&mut bus)?;
    notifiers::register(&mut bus)?;
    debug!(handlers = ?bus.registered(), "Bus ready");

    Ok(AlertingApi::new(Arc::new(bus), Arc::new(OrgRoleGuardian), codec)
        .with_unified_alerting(config.unified_alerting))
}
