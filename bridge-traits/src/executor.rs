//! Serial execution context.
//!
//! Hosts typically own one thread on which UI and media state is mutated (an
//! event loop, a main thread, a dedicated media thread). The core marshals all
//! of its own state changes onto that context through [`SerialExecutor`]
//! instead of guarding them with locks.

use crate::error::Result;

/// Unit of work run on the serial context.
pub type SerialTask = Box<dyn FnOnce() + Send + 'static>;

/// Single logical thread of execution.
///
/// # Ordering
///
/// Tasks passed to [`schedule_later`](SerialExecutor::schedule_later) from the
/// same caller must run in the order they were scheduled, and never
/// concurrently with each other.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::executor::SerialExecutor;
///
/// fn touch_state(executor: &dyn SerialExecutor) -> bridge_traits::error::Result<()> {
///     if executor.is_current_context() {
///         mutate();
///         Ok(())
///     } else {
///         executor.schedule_later(Box::new(mutate))
///     }
/// }
/// ```
pub trait SerialExecutor: Send + Sync {
    /// Returns `true` when called from the serial context itself.
    fn is_current_context(&self) -> bool;

    /// Queue `task` to run later on the serial context.
    ///
    /// Fails with [`BridgeError::ExecutorClosed`](crate::error::BridgeError::ExecutorClosed)
    /// once the executor has shut down.
    fn schedule_later(&self, task: SerialTask) -> Result<()>;
}
