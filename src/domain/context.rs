//! Task-local trace context.
//!
//! Every request handled by the logging middleware runs inside a scope that
//! carries its [`TraceId`]. Code anywhere below the handler can read the id with
//! [`current`] without it being passed through function arguments.
//!
//! The slot lives in Tokio task-local storage, so two requests served
//! concurrently never observe each other's id and no locking is involved.
//! Work moved to another task with `tokio::spawn` does not inherit the scope;
//! use [`spawn`] for that.

use std::cell::{Cell, RefCell};
use std::future::Future;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::task_local;

use super::trace_id::TraceId;

struct TraceScope {
    trace_id: RefCell<Option<TraceId>>,
    middleware_active: Cell<bool>,
}

impl TraceScope {
    fn new(trace_id: TraceId, middleware_active: bool) -> Self {
        Self {
            trace_id: RefCell::new(Some(trace_id)),
            middleware_active: Cell::new(middleware_active),
        }
    }
}

task_local! {
    static SCOPE: TraceScope;
}

/// Errors returned when the context is used outside of a trace scope.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("no trace scope is active for the current task")]
    NoScope,
}

/// Returns the trace id of the current scope, if any.
pub fn current() -> Option<TraceId> {
    SCOPE
        .try_with(|scope| scope.trace_id.borrow().clone())
        .ok()
        .flatten()
}

/// Replaces the trace id for the remainder of the current scope.
///
/// The previous value comes back once the enclosing [`scope`] ends.
///
/// # Errors
///
/// Returns [`ContextError::NoScope`] when called outside of any scope.
pub fn set(trace_id: TraceId) -> Result<(), ContextError> {
    SCOPE
        .try_with(|scope| {
            scope.trace_id.replace(Some(trace_id));
        })
        .map_err(|_| ContextError::NoScope)
}

/// Runs `future` with `trace_id` as the current id.
///
/// Whatever was current before is restored when the future completes, panics
/// or is dropped.
///
/// # Examples
///
/// ```
/// use trace_logger::domain::{context, trace_id::TraceId};
///
/// # tokio_test_block_on(async {
/// let id = TraceId::parse("job-7").unwrap();
/// let seen = context::scope(id.clone(), async { context::current() }).await;
/// assert_eq!(seen, Some(id));
/// assert_eq!(context::current(), None);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub async fn scope<F>(trace_id: TraceId, future: F) -> F::Output
where
    F: Future,
{
    SCOPE.scope(TraceScope::new(trace_id, false), future).await
}

/// Synchronous counterpart of [`scope`].
pub fn sync_scope<F, R>(trace_id: TraceId, f: F) -> R
where
    F: FnOnce() -> R,
{
    SCOPE.sync_scope(TraceScope::new(trace_id, false), f)
}

/// Scope opened by the request logging middleware; marks itself active.
pub(crate) async fn middleware_scope<F>(trace_id: TraceId, future: F) -> F::Output
where
    F: Future,
{
    SCOPE.scope(TraceScope::new(trace_id, true), future).await
}

/// Whether the current code runs inside a request handled by the logging
/// middleware.
pub fn middleware_active() -> bool {
    SCOPE
        .try_with(|scope| scope.middleware_active.get())
        .unwrap_or(false)
}

pub(crate) fn clear_middleware_active() {
    let _ = SCOPE.try_with(|scope| scope.middleware_active.set(false));
}

/// Spawns a task that inherits the current trace id.
///
/// Outside of a scope this is a plain `tokio::spawn`.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match current() {
        Some(trace_id) => tokio::spawn(scope(trace_id, future)),
        None => tokio::spawn(future),
    }
}
