//! Handler registry: maps request names to handlers and dispatches
//! incoming requests to them (spec §4.6).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dgipc_core::{ResponseError, TaxonomyError};
use serde_json::Value;

/// Default ceiling on the number of distinct handler names a registry will
/// accept, guarding against unbounded registration from misbehaving
/// callers (spec §4.6).
pub const DEFAULT_MAX_HANDLERS: usize = 10_000;

/// A handler that answers one request name.
///
/// Implemented directly for genuinely async handlers; synchronous
/// handlers are unified onto the same trait via [`HandlerRegistry::register_fn`],
/// which boxes a plain closure into an async one rather than asking every
/// caller to write `#[async_trait]` boilerplate for trivial logic.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Executes the handler against `args`, returning the JSON result that
    /// becomes `Response.result`, or an error message that becomes
    /// `Response.error.data.details` under an `InternalError` code.
    async fn call(&self, args: HashMap<String, Value>) -> Result<Value, String>;
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

struct FnHandler<F>(F);

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(HashMap<String, Value>) -> BoxFuture<'static, Result<Value, String>> + Send + Sync,
{
    async fn call(&self, args: HashMap<String, Value>) -> Result<Value, String> {
        (self.0)(args).await
    }
}

/// Name → handler map, with dispatch-time error taxonomy mapping
/// (spec §4.6): a dispatch against an unregistered name raises
/// `MethodNotFound`; a handler that returns `Err` is mapped to
/// `InternalError` carrying the original message in `data.details`.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: Arc<DashMap<String, Arc<dyn Handler>>>,
    max_handlers: usize,
}

impl HandlerRegistry {
    /// Creates an empty registry with [`DEFAULT_MAX_HANDLERS`] as its ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_handlers(DEFAULT_MAX_HANDLERS)
    }

    /// Creates an empty registry with a custom ceiling on distinct names.
    #[must_use]
    pub fn with_max_handlers(max_handlers: usize) -> Self {
        Self {
            handlers: Arc::new(DashMap::new()),
            max_handlers,
        }
    }

    /// Registers a handler under `name`.
    ///
    /// # Errors
    ///
    /// Returns `TaxonomyError::InvalidParams` if `name` is empty, or if the
    /// registry is already at its handler-count ceiling and `name` is new.
    pub fn register(&self, name: impl Into<String>, handler: impl Handler + 'static) -> Result<(), TaxonomyError> {
        self.register_arc(name.into(), Arc::new(handler))
    }

    /// Registers a boxed async closure as a handler under `name`, for
    /// callers that would rather not implement [`Handler`] directly.
    ///
    /// # Errors
    ///
    /// See [`HandlerRegistry::register`].
    pub fn register_fn<F>(&self, name: impl Into<String>, f: F) -> Result<(), TaxonomyError>
    where
        F: Fn(HashMap<String, Value>) -> BoxFuture<'static, Result<Value, String>> + Send + Sync + 'static,
    {
        self.register_arc(name.into(), Arc::new(FnHandler(f)))
    }

    fn register_arc(&self, name: String, handler: Arc<dyn Handler>) -> Result<(), TaxonomyError> {
        if name.is_empty() {
            return Err(TaxonomyError::InvalidParams(
                "handler name must not be empty".to_string(),
            ));
        }
        if !self.handlers.contains_key(&name) && self.handlers.len() >= self.max_handlers {
            return Err(TaxonomyError::InvalidParams(format!(
                "handler registry is at its limit of {} names",
                self.max_handlers
            )));
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    /// Whether a handler is registered under `name`.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Removes the handler registered under `name`. Returns `true` if one
    /// was present.
    pub fn unregister(&self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    /// Number of distinct registered names.
    #[must_use]
    pub fn count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatches `args` to the handler registered under `name`.
    ///
    /// # Errors
    ///
    /// `TaxonomyError::MethodNotFound` if no handler is registered.
    /// `TaxonomyError::InternalError` if the handler itself returns `Err`.
    pub async fn dispatch(
        &self,
        name: &str,
        args: HashMap<String, Value>,
    ) -> Result<Value, TaxonomyError> {
        let handler = self
            .handlers
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| TaxonomyError::MethodNotFound(name.to_string()))?;

        handler
            .call(args)
            .await
            .map_err(TaxonomyError::InternalError)
    }

    /// Dispatches and converts the result directly into a wire
    /// [`ResponseError`] on failure, for callers assembling a
    /// [`dgipc_core::Response`] without needing the intermediate
    /// [`TaxonomyError`].
    pub async fn dispatch_to_response_error(
        &self,
        name: &str,
        args: HashMap<String, Value>,
    ) -> Result<Value, ResponseError> {
        self.dispatch(name, args)
            .await
            .map_err(|e| e.to_response_error())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
