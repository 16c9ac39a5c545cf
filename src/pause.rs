//! The alert pause/un-pause state machine.
//!
//! Pausing is idempotent: a request that would not change whether the alert
//! is paused is answered without dispatching anything. The state an alert
//! lands in after being un-paused is decided by the evaluation engine on its
//! next run, so this module only reports a placeholder for it.

use crate::bus::{Bus, DispatchContext};
use crate::core::{AlertRule, AlertState};
use crate::error::BusError;
use crate::models::{PauseAlertCommand, PauseAllAlertsCommand};
use serde::Serialize;
use tracing::{debug, info};

/// What a pause request did to a single alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    AlreadyPaused,
    AlreadyUnpaused,
    Paused,
    Unpaused,
}

impl PauseOutcome {
    /// Whether a pause command was dispatched.
    pub fn changed(&self) -> bool {
        matches!(self, PauseOutcome::Paused | PauseOutcome::Unpaused)
    }

    /// The state label reported to the caller.
    pub fn state_label(&self) -> &'static str {
        match self {
            PauseOutcome::AlreadyPaused | PauseOutcome::Paused => AlertState::Paused.as_str(),
            PauseOutcome::AlreadyUnpaused => "un-paused",
            PauseOutcome::Unpaused => AlertState::Unknown.as_str(),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            PauseOutcome::AlreadyPaused => "Alert is already paused",
            PauseOutcome::AlreadyUnpaused => "Alert is already un-paused",
            PauseOutcome::Paused => "Alert paused",
            PauseOutcome::Unpaused => "Alert un-paused",
        }
    }
}

/// Decides whether moving an alert in `current` state to `paused` is a no-op.
///
/// Returns the no-op outcome, or `None` if a pause command must be dispatched.
pub fn redundant_transition(current: AlertState, paused: bool) -> Option<PauseOutcome> {
    match (current.is_paused(), paused) {
        (false, false) => Some(PauseOutcome::AlreadyUnpaused),
        (true, true) => Some(PauseOutcome::AlreadyPaused),
        _ => None,
    }
}

/// Pauses or un-pauses `alert`, dispatching a [`PauseAlertCommand`] only when
/// the request changes its paused-ness.
pub fn pause_alert(
    bus: &Bus,
    ctx: &DispatchContext,
    alert: &AlertRule,
    paused: bool,
) -> Result<PauseOutcome, BusError> {
    if let Some(outcome) = redundant_transition(alert.state, paused) {
        debug!(alert_id = alert.id, state = %alert.state, paused, "Pause request is a no-op");
        return Ok(outcome);
    }

    let cmd = PauseAlertCommand {
        org_id: alert.org_id,
        alert_ids: vec![alert.id],
        paused,
    };
    bus.dispatch_with_context(ctx, &cmd)?;

    let outcome = if paused {
        PauseOutcome::Paused
    } else {
        PauseOutcome::Unpaused
    };
    info!(alert_id = alert.id, org_id = alert.org_id, paused, "Alert pause state changed");
    Ok(outcome)
}

/// The result of pausing or un-pausing every alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseAllOutcome {
    pub paused: bool,
    pub alerts_affected: usize,
}

impl PauseAllOutcome {
    pub fn state_label(&self) -> &'static str {
        if self.paused {
            AlertState::Paused.as_str()
        } else {
            AlertState::Pending.as_str()
        }
    }

    pub fn message(&self) -> &'static str {
        if self.paused {
            "alerts paused"
        } else {
            "alerts un paused"
        }
    }
}

/// Applies `paused` to every alert of `org_id` in one batch command.
///
/// Unlike [`pause_alert`] this always dispatches.
pub fn pause_all_alerts(
    bus: &Bus,
    ctx: &DispatchContext,
    org_id: i64,
    paused: bool,
) -> Result<PauseAllOutcome, BusError> {
    let alerts_affected =
        bus.dispatch_with_context(ctx, &PauseAllAlertsCommand { org_id, paused })?;
    info!(org_id, paused, alerts_affected, "Pause state applied to all alerts");
    Ok(PauseAllOutcome {
        paused,
        alerts_affected,
    })
}
