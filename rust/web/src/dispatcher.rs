//! Event-name routing for inbound envelopes.

use crate::connection::Envelope;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Reserved envelope field naming the handler.
pub const EVENT_FIELD: &str = "event";

pub type Handler<C> =
    Arc<dyn Fn(Arc<C>, Envelope) -> BoxFuture<'static, Result<(), DispatchError>> + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("message has no string 'event' field")]
    MissingEvent,
    #[error("no handler registered for '{0}'")]
    UnknownEvent(String),
    #[error("payload for '{event}' does not fit: {message}")]
    InvalidPayload { event: String, message: String },
}

/// Maps event names to handlers that run against a shared context `C`.
pub struct Dispatcher<C> {
    handlers: HashMap<String, Handler<C>>,
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<C> std::fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut events: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        events.sort_unstable();
        f.debug_struct("Dispatcher").field("events", &events).finish()
    }
}

impl<C: Send + Sync + 'static> Dispatcher<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handler` for `event`, returning the handler it replaced.
    pub fn register(&mut self, event: impl Into<String>, handler: Handler<C>) -> Option<Handler<C>> {
        self.handlers.insert(event.into(), handler)
    }

    /// Registers a handler that takes the raw envelope (minus `event`).
    pub fn on<F, Fut>(&mut self, event: impl Into<String>, handler: F)
    where
        F: Fn(Arc<C>, Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register(
            event,
            Arc::new(move |ctx: Arc<C>, payload: Envelope| {
                handler(ctx, payload).map(Ok::<(), DispatchError>).boxed()
            }),
        );
    }

    /// Registers a handler that receives the payload decoded into `P`.
    ///
    /// A payload that does not decode never reaches `handler`; dispatch
    /// reports it as [`DispatchError::InvalidPayload`].
    pub fn on_typed<P, F, Fut>(&mut self, event: &str, handler: F)
    where
        P: DeserializeOwned + Send + 'static,
        F: Fn(Arc<C>, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = event.to_string();
        self.register(
            event,
            Arc::new(move |ctx: Arc<C>, payload: Envelope| {
                match serde_json::from_value::<P>(Value::Object(payload)) {
                    Ok(decoded) => handler(ctx, decoded).map(Ok::<(), DispatchError>).boxed(),
                    Err(err) => {
                        let error = DispatchError::InvalidPayload {
                            event: name.clone(),
                            message: err.to_string(),
                        };
                        futures::future::ready(Err(error)).boxed()
                    }
                }
            }),
        );
    }

    pub fn handles(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Routes one envelope. Returns the event name that was handled.
    pub async fn dispatch(&self, ctx: Arc<C>, mut envelope: Envelope) -> Result<String, DispatchError> {
        let event = match envelope.remove(EVENT_FIELD) {
            Some(Value::String(event)) => event,
            _ => return Err(DispatchError::MissingEvent),
        };
        let handler = self
            .handlers
            .get(&event)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownEvent(event.clone()))?;

        handler(ctx, envelope).await?;
        Ok(event)
    }
}
