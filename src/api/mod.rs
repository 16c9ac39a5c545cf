//! Request-level operations over the bus.
//!
//! Each operation takes the caller's [`ReqContext`], dispatches the messages
//! it needs and maps handler errors to an outward status code and message.
//! Nothing here is tied to an HTTP framework; an [`ApiError`] carries what a
//! transport would need to build its response.

pub mod alerts;
pub mod dtos;
pub mod notifications;

use crate::bus::{Bus, DispatchContext};
use crate::core::{DashboardGuardian, SecretsCodec, SignedInUser};
use crate::error::BoxError;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

pub use dtos::*;

/// A failed operation, with the status a transport should answer.
#[derive(Debug, Error)]
#[error("{status} {message}")]
pub struct ApiError {
    status: u16,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The response body: the message, plus the cause when there is one.
    pub fn body(&self) -> Value {
        match &self.source {
            Some(source) => json!({ "message": self.message, "error": source.to_string() }),
            None => json!({ "message": self.message }),
        }
    }

    // Server-side failures are logged with their cause; client errors are not.
    fn logged(self) -> Self {
        if self.status >= 500 {
            match &self.source {
                Some(source) => warn!(status = self.status, error = %source, "{}", self.message),
                None => warn!(status = self.status, "{}", self.message),
            }
        }
        self
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Shorthand for an [`ApiError`] with a cause, logged when it is a server error.
pub(crate) fn api_error(
    status: u16,
    message: impl Into<String>,
    source: impl Into<BoxError>,
) -> ApiError {
    ApiError::new(status, message).with_source(source).logged()
}

/// The caller of an operation.
#[derive(Debug, Clone)]
pub struct ReqContext {
    pub user: SignedInUser,
    /// Cancelled when the caller goes away.
    pub ctx: DispatchContext,
    /// Request headers forwarded to data source queries during evaluation.
    pub headers: BTreeMap<String, String>,
}

impl ReqContext {
    pub fn new(user: SignedInUser) -> Self {
        Self {
            user,
            ctx: DispatchContext::background(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, ctx: DispatchContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn org_id(&self) -> i64 {
        self.user.org_id
    }
}

/// The alerting operations, bound to their collaborators.
#[derive(Clone)]
pub struct AlertingApi {
    bus: Arc<Bus>,
    guardian: Arc<dyn DashboardGuardian>,
    codec: Arc<dyn SecretsCodec>,
    unified_alerting: bool,
}

impl fmt::Debug for AlertingApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertingApi")
            .field("bus", &self.bus)
            .field("unified_alerting", &self.unified_alerting)
            .finish_non_exhaustive()
    }
}

impl AlertingApi {
    pub fn new(
        bus: Arc<Bus>,
        guardian: Arc<dyn DashboardGuardian>,
        codec: Arc<dyn SecretsCodec>,
    ) -> Self {
        Self {
            bus,
            guardian,
            codec,
            unified_alerting: false,
        }
    }

    pub fn with_unified_alerting(mut self, enabled: bool) -> Self {
        self.unified_alerting = enabled;
        self
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }
}
