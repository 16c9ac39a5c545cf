//! The command/query dispatch bus.
//!
//! A [`Bus`] maps each message type to exactly one [`Handler`]. It is built
//! once at startup, then shared (usually behind an `Arc`) with every component
//! that needs to reach storage or the evaluation engine. Dispatch is
//! synchronous: the calling thread runs the handler to completion and gets its
//! typed output or its error back, unmodified.

use crate::error::{BusError, ErrorKind};
use metrics::Unit;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, trace};

/// A command or query that can be routed by the [`Bus`].
///
/// `Output` is what the single bound handler produces on success.
pub trait Message: Any + Send + Sync {
    type Output: Send;
}

/// Handles one message type.
pub trait Handler<M: Message>: Send + Sync {
    fn handle(&self, ctx: &DispatchContext, msg: &M) -> Result<M::Output, BusError>;
}

impl<M, F> Handler<M> for F
where
    M: Message,
    F: Fn(&DispatchContext, &M) -> Result<M::Output, BusError> + Send + Sync,
{
    fn handle(&self, ctx: &DispatchContext, msg: &M) -> Result<M::Output, BusError> {
        self(ctx, msg)
    }
}

/// Cancellation signal handed to every handler.
///
/// Cancellation is cooperative: handlers poll [`DispatchContext::is_cancelled`]
/// or call [`DispatchContext::check`] at convenient points. The bus never
/// interrupts a running handler.
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    cancel_rx: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl DispatchContext {
    /// A context that is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Creates a context together with the handle that cancels it.
    pub fn cancellable() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, Self::with_cancellation(rx))
    }

    /// Ties the context to an existing shutdown/cancel channel.
    pub fn with_cancellation(cancel_rx: watch::Receiver<bool>) -> Self {
        Self {
            cancel_rx: Some(cancel_rx),
            deadline: None,
        }
    }

    /// Adds a deadline after which the context reports itself cancelled.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn is_cancelled(&self) -> bool {
        let signalled = self
            .cancel_rx
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false);
        let expired = self
            .deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false);
        signalled || expired
    }

    /// Returns [`BusError::cancelled`] if the context has been cancelled or has
    /// timed out.
    pub fn check(&self) -> Result<(), BusError> {
        if self.is_cancelled() {
            return Err(BusError::cancelled());
        }
        Ok(())
    }
}

/// Cancels every [`DispatchContext`] created from it.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Another context listening to this handle.
    pub fn context(&self) -> DispatchContext {
        DispatchContext::with_cancellation(self.tx.subscribe())
    }
}

struct Registration {
    name: &'static str,
    // Always an `Arc<dyn Handler<M>>` for the `M` whose `TypeId` keys the entry.
    handler: Box<dyn Any + Send + Sync>,
}

/// The registry of message handlers.
pub struct Bus {
    handlers: HashMap<TypeId, Registration>,
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("handlers", &self.registered())
            .finish()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    pub fn new() -> Self {
        metrics::describe_counter!(
            "bus_dispatch_total",
            Unit::Count,
            "Total number of dispatched commands and queries, labeled by message type and outcome."
        );
        metrics::describe_histogram!(
            "bus_dispatch_duration_seconds",
            Unit::Seconds,
            "Time spent inside the handler of a dispatched message."
        );
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Binds `handler` to message type `M`.
    ///
    /// Fails with [`ErrorKind::DuplicateHandlerRegistered`] if `M` already has
    /// a handler; the existing binding is left in place.
    pub fn register<M, H>(&mut self, handler: H) -> Result<(), BusError>
    where
        M: Message,
        H: Handler<M> + 'static,
    {
        let name = message_name::<M>();
        if self.handlers.contains_key(&TypeId::of::<M>()) {
            return Err(BusError::new(
                ErrorKind::DuplicateHandlerRegistered,
                format!("handler for {} is already registered", name),
            ));
        }

        let handler: Arc<dyn Handler<M>> = Arc::new(handler);
        self.handlers.insert(
            TypeId::of::<M>(),
            Registration {
                name,
                handler: Box::new(handler),
            },
        );
        debug!(message = name, "Registered handler");
        Ok(())
    }

    /// Binds a closure to message type `M`. See [`Bus::register`].
    pub fn register_fn<M, F>(&mut self, handler: F) -> Result<(), BusError>
    where
        M: Message,
        F: Fn(&DispatchContext, &M) -> Result<M::Output, BusError> + Send + Sync + 'static,
    {
        self.register::<M, F>(handler)
    }

    pub fn has_handler<M: Message>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<M>())
    }

    /// Names of all message types with a bound handler, sorted.
    pub fn registered(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.values().map(|r| r.name).collect();
        names.sort_unstable();
        names
    }

    /// Dispatches `msg` with a context that is never cancelled.
    pub fn dispatch<M: Message>(&self, msg: &M) -> Result<M::Output, BusError> {
        self.dispatch_with_context(&DispatchContext::background(), msg)
    }

    /// Dispatches `msg` to its handler, passing `ctx` through.
    pub fn dispatch_with_context<M: Message>(
        &self,
        ctx: &DispatchContext,
        msg: &M,
    ) -> Result<M::Output, BusError> {
        let name = message_name::<M>();
        let handler = match self.handler::<M>() {
            Some(handler) => handler,
            None => {
                metrics::counter!(
                    "bus_dispatch_total",
                    "message" => name,
                    "outcome" => ErrorKind::NoHandlerRegistered.as_str()
                )
                .increment(1);
                return Err(BusError::new(
                    ErrorKind::NoHandlerRegistered,
                    format!("no handler registered for {}", name),
                ));
            }
        };

        trace!(message = name, "Dispatching");
        let start = Instant::now();
        let result = handler.handle(ctx, msg);
        metrics::histogram!("bus_dispatch_duration_seconds", "message" => name)
            .record(start.elapsed().as_secs_f64());

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => {
                debug!(message = name, kind = %e.kind(), error = %e, "Handler returned an error");
                e.kind().as_str()
            }
        };
        metrics::counter!("bus_dispatch_total", "message" => name, "outcome" => outcome)
            .increment(1);

        result
    }

    fn handler<M: Message>(&self) -> Option<&Arc<dyn Handler<M>>> {
        self.handlers
            .get(&TypeId::of::<M>())
            .and_then(|r| r.handler.downcast_ref::<Arc<dyn Handler<M>>>())
    }
}

/// The unqualified type name of `M`, used for logs and metric labels.
fn message_name<M>() -> &'static str {
    let full = type_name::<M>();
    full.rsplit("::").next().unwrap_or(full)
}
