// ============================================================================
// spark-observables - Emitter Context
// Thread-local dispatch state: transaction depth, silent depth, pending queue
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::error::CallbackFailure;
use crate::events::event::Event;

// =============================================================================
// ERROR LOGGER
// =============================================================================

/// Sink for failures caught inside listeners, `transact` and `silently`.
pub type ErrorLogger = Rc<dyn Fn(&CallbackFailure)>;

fn default_error_logger() -> ErrorLogger {
    Rc::new(|failure: &CallbackFailure| {
        tracing::error!(error = %failure, "observer callback failed");
    })
}

// =============================================================================
// EMITTER CONTEXT
// =============================================================================

/// Thread-local context holding all process-wide dispatch state.
///
/// Each thread gets its own instance, so tests running in parallel never
/// see each other's transactions.
pub struct EmitterContext {
    // =========================================================================
    // DISPATCH MODES
    // =========================================================================
    /// Nesting depth of `transact` scopes
    pub transaction_level: Cell<u32>,

    /// Nesting depth of `silently` scopes
    pub silent_level: Cell<u32>,

    // =========================================================================
    // TRANSACTION QUEUE
    // =========================================================================
    /// Events deferred until the outermost transaction closes.
    /// Holds at most one event per (target, type).
    pub pending_events: RefCell<Vec<Rc<Event>>>,

    // =========================================================================
    // LOGGING
    // =========================================================================
    pub error_logger: RefCell<ErrorLogger>,
}

impl EmitterContext {
    pub fn new() -> Self {
        Self {
            transaction_level: Cell::new(0),
            silent_level: Cell::new(0),
            pending_events: RefCell::new(Vec::new()),
            error_logger: RefCell::new(default_error_logger()),
        }
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    /// Increment transaction depth, returns new depth
    pub fn enter_transaction(&self) -> u32 {
        let level = self.transaction_level.get() + 1;
        self.transaction_level.set(level);
        level
    }

    /// Decrement transaction depth, returns new depth
    pub fn exit_transaction(&self) -> u32 {
        let level = self.transaction_level.get().saturating_sub(1);
        self.transaction_level.set(level);
        level
    }

    pub fn get_transaction_level(&self) -> u32 {
        self.transaction_level.get()
    }

    pub fn is_transacting(&self) -> bool {
        self.transaction_level.get() > 0
    }

    /// Queue an event, coalescing with a pending event for the same
    /// (target, type).
    ///
    /// The replaced event becomes the new event's `prev_event` and the new
    /// event takes over its queue position.
    pub fn queue_event(&self, event: Rc<Event>) {
        let mut pending = self.pending_events.borrow_mut();
        let position = pending.iter().rposition(|queued| queued.same_slot(&event));

        match position {
            Some(index) if Rc::ptr_eq(&pending[index], &event) => {}
            Some(index) => {
                let replaced = std::mem::replace(&mut pending[index], event.clone());
                tracing::trace!(event_type = event.event_type(), "coalesced pending event");
                event.set_prev_event(replaced);
            }
            None => pending.push(event),
        }
    }

    /// Take all pending events in FIFO order
    pub fn take_pending_events(&self) -> Vec<Rc<Event>> {
        self.pending_events.replace(Vec::new())
    }

    pub fn pending_event_count(&self) -> usize {
        self.pending_events.borrow().len()
    }

    // =========================================================================
    // SILENT MODE
    // =========================================================================

    /// Increment silent depth, returns new depth
    pub fn enter_silent(&self) -> u32 {
        let level = self.silent_level.get() + 1;
        self.silent_level.set(level);
        level
    }

    /// Decrement silent depth, returns new depth
    pub fn exit_silent(&self) -> u32 {
        let level = self.silent_level.get().saturating_sub(1);
        self.silent_level.set(level);
        level
    }

    pub fn is_silent(&self) -> bool {
        self.silent_level.get() > 0
    }

    // =========================================================================
    // LOGGING
    // =========================================================================

    /// Install a logger, returning the previous one
    pub fn set_error_logger(&self, logger: ErrorLogger) -> ErrorLogger {
        self.error_logger.replace(logger)
    }

    /// Restore the default `tracing` logger
    pub fn reset_error_logger(&self) {
        self.error_logger.replace(default_error_logger());
    }

    /// Current logger. Callers invoke it after the context borrow ends so the
    /// logger itself may touch the context.
    pub fn error_logger(&self) -> ErrorLogger {
        self.error_logger.borrow().clone()
    }

    // =========================================================================
    // RESET
    // =========================================================================

    /// Drop pending events, zero both counters and restore the default logger.
    pub fn reset(&self) {
        self.transaction_level.set(0);
        self.silent_level.set(0);
        self.pending_events.borrow_mut().clear();
        self.reset_error_logger();
    }
}

impl Default for EmitterContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    static CONTEXT: EmitterContext = EmitterContext::new();
}

/// Access the thread-local emitter context.
///
/// # Example
///
/// ```
/// use spark_observables::with_context;
///
/// let depth = with_context(|ctx| ctx.get_transaction_level());
/// assert_eq!(depth, 0);
/// ```
pub fn with_context<R>(f: impl FnOnce(&EmitterContext) -> R) -> R {
    CONTEXT.with(f)
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Check if currently inside `transact`
pub fn is_transacting() -> bool {
    with_context(|ctx| ctx.is_transacting())
}

/// Check if currently inside `silently`
pub fn is_silent() -> bool {
    with_context(|ctx| ctx.is_silent())
}

/// Install the sink that receives failures caught at dispatch boundaries.
///
/// Returns the previously installed logger.
pub fn set_error_logger(logger: impl Fn(&CallbackFailure) + 'static) -> ErrorLogger {
    with_context(|ctx| ctx.set_error_logger(Rc::new(logger)))
}

/// Restore the default logger (forwards to `tracing::error!`).
pub fn reset_error_logger() {
    with_context(|ctx| ctx.reset_error_logger());
}

/// Send a failure to the installed logger.
pub fn log_error(failure: &CallbackFailure) {
    let logger = with_context(|ctx| ctx.error_logger());
    logger(failure);
}

// =============================================================================
// TESTS
// =============================================================================
