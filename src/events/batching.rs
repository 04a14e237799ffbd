// ============================================================================
// spark-observables - Transactions and Silent Mode
// Defer-and-coalesce or drop events for the duration of a callback
// ============================================================================

use std::panic::{self, AssertUnwindSafe};

use crate::core::context::{log_error, with_context};
use crate::core::error::{BoxError, CallbackFailure};

// =============================================================================
// TRANSACT
// =============================================================================

/// Run `f` inside a transaction.
///
/// Events emitted while any transaction is open are queued, at most one per
/// (target, type). When the outermost transaction closes the queue is
/// delivered in order of first appearance.
///
/// Errors and panics raised by `f` go to the error logger; the transaction
/// still closes and drains. Returns `None` in that case.
///
/// # Example
///
/// ```
/// use spark_observables::{transact, Listener, ObservableList};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let list = ObservableList::from_vec(vec![1, 2, 3]);
/// let changes = Rc::new(Cell::new(0));
///
/// let changes_clone = changes.clone();
/// list.on_change(Listener::from_fn(move |_| changes_clone.set(changes_clone.get() + 1)), None);
///
/// transact(|| {
///     list.add(4);
///     list.remove_at(0)?;
///     // Still deferred
///     assert_eq!(changes.get(), 0);
///     Ok(())
/// });
///
/// assert_eq!(changes.get(), 1);
/// assert_eq!(list.to_vec(), vec![2, 3, 4]);
/// ```
pub fn transact<T>(f: impl FnOnce() -> Result<T, BoxError>) -> Option<T> {
    with_context(|ctx| ctx.enter_transaction());

    // Guard closes the transaction even if `f` unwinds past catch_unwind
    struct TransactionGuard;

    impl Drop for TransactionGuard {
        fn drop(&mut self) {
            let level = with_context(|ctx| ctx.exit_transaction());

            // When outermost transaction completes, deliver the queue
            if level == 0 {
                flush_pending_events();
            }
        }
    }

    let _guard = TransactionGuard;
    run_guarded("transaction", f, CallbackFailure::Transaction)
}

/// Deliver every queued event to its target, in queue order.
fn flush_pending_events() {
    let events = with_context(|ctx| ctx.take_pending_events());
    if events.is_empty() {
        return;
    }

    tracing::debug!(events = events.len(), "draining transaction queue");
    for event in events {
        if let Some(target) = event.target() {
            target.handle_event(&event);
        }
    }
}

// =============================================================================
// SILENTLY
// =============================================================================

/// Run `f` with event delivery switched off.
///
/// Events emitted inside are dropped: never delivered, never queued.
///
/// # Example
///
/// ```
/// use spark_observables::{silently, Listener, ObservableMap};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let map: ObservableMap<&str, i32> = ObservableMap::new();
/// let changes = Rc::new(Cell::new(0));
///
/// let changes_clone = changes.clone();
/// map.on_change(Listener::from_fn(move |_| changes_clone.set(changes_clone.get() + 1)), None);
///
/// silently(|| {
///     map.set("a", 1);
///     Ok(())
/// });
///
/// assert_eq!(map.get(&"a"), Some(1));
/// assert_eq!(changes.get(), 0);
/// ```
pub fn silently<T>(f: impl FnOnce() -> Result<T, BoxError>) -> Option<T> {
    let _scope = SilentScope::enter();
    run_guarded("silently", f, CallbackFailure::Silent)
}

/// RAII silent scope used by bulk container algorithms.
pub(crate) struct SilentScope;

impl SilentScope {
    pub(crate) fn enter() -> Self {
        with_context(|ctx| ctx.enter_silent());
        SilentScope
    }
}

impl Drop for SilentScope {
    fn drop(&mut self) {
        with_context(|ctx| ctx.exit_silent());
    }
}

// =============================================================================
// GUARDED CALL
// =============================================================================

fn run_guarded<T>(
    scope: &'static str,
    f: impl FnOnce() -> Result<T, BoxError>,
    wrap: fn(BoxError) -> CallbackFailure,
) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(error)) => {
            log_error(&wrap(error));
            None
        }
        Err(payload) => {
            log_error(&CallbackFailure::from_panic(scope, payload));
            None
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::{is_silent, is_transacting, reset_error_logger, set_error_logger};
    use crate::events::{EventEmitter, Listener};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn record(emitter: &EventEmitter, log: &Rc<RefCell<Vec<String>>>, name: &'static str) {
        let log = log.clone();
        emitter
            .on(
                "change",
                Listener::from_fn(move |_| log.borrow_mut().push(name.to_string())),
                None,
            )
            .unwrap();
    }

    #[test]
    fn transact_returns_value() {
        assert_eq!(transact(|| Ok(42)), Some(42));
        assert_eq!(silently(|| Ok("quiet")), Some("quiet"));
    }

    #[test]
    fn transaction_defers_and_coalesces() {
        let emitter = EventEmitter::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        emitter
            .on(
                "change",
                Listener::from_fn(move |_| count_clone.set(count_clone.get() + 1)),
                None,
            )
            .unwrap();

        transact(|| {
            emitter.emit_with("change", 1u8);
            emitter.emit_with("change", 2u8);
            assert_eq!(count.get(), 0);
            Ok(())
        });

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn coalesced_event_links_previous_payload() {
        let emitter = EventEmitter::new();
        let (first, second) = transact(|| {
            let first = emitter.emit_with("change", "first");
            let second = emitter.emit_with("change", "second");
            Ok((first, second))
        })
        .unwrap();

        let prev = second.prev_event().expect("previous event");
        assert!(Rc::ptr_eq(&prev, &first));
        assert_eq!(prev.payload::<&str>().as_deref(), Some(&"first"));
    }

    #[test]
    fn nested_transactions_flush_once_at_outermost_exit() {
        let emitter = EventEmitter::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        emitter
            .on(
                "change",
                Listener::from_fn(move |_| count_clone.set(count_clone.get() + 1)),
                None,
            )
            .unwrap();

        transact(|| {
            transact(|| {
                emitter.emit("change");
                Ok(())
            });
            assert_eq!(count.get(), 0);
            assert!(is_transacting());
            Ok(())
        });

        assert_eq!(count.get(), 1);
        assert!(!is_transacting());
    }

    #[test]
    fn queue_position_survives_coalescing() {
        let a = EventEmitter::new();
        let b = EventEmitter::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        record(&a, &log, "a");
        record(&b, &log, "b");

        transact(|| {
            a.emit("change");
            b.emit("change");
            a.emit("change");
            Ok(())
        });

        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn failed_transaction_still_drains() {
        let failures = Rc::new(Cell::new(0));
        let failures_clone = failures.clone();
        set_error_logger(move |failure| {
            assert!(matches!(failure, CallbackFailure::Transaction(_)));
            failures_clone.set(failures_clone.get() + 1);
        });

        let emitter = EventEmitter::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        record(&emitter, &log, "delivered");

        let result: Option<()> = transact(|| {
            emitter.emit("change");
            Err("callback failed".into())
        });

        assert!(result.is_none());
        assert_eq!(failures.get(), 1);
        assert_eq!(log.borrow().len(), 1);
        assert!(!is_transacting());
        reset_error_logger();
    }

    #[test]
    fn panicking_callbacks_restore_counters() {
        let failures = Rc::new(Cell::new(0));
        let failures_clone = failures.clone();
        set_error_logger(move |_| failures_clone.set(failures_clone.get() + 1));

        let result: Option<()> = silently(|| panic!("silent bug"));
        assert!(result.is_none());
        assert!(!is_silent());

        let result: Option<()> = transact(|| panic!("transaction bug"));
        assert!(result.is_none());
        assert!(!is_transacting());

        assert_eq!(failures.get(), 2);
        reset_error_logger();
    }

    #[test]
    fn events_raised_while_draining_dispatch_immediately() {
        let a = EventEmitter::new();
        let b = EventEmitter::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let b_clone = b.clone();
        let log_clone = log.clone();
        a.on(
            "change",
            Listener::from_fn(move |_| {
                log_clone.borrow_mut().push("a".to_string());
                b_clone.emit("change");
            }),
            None,
        )
        .unwrap();
        record(&b, &log, "b");

        transact(|| {
            a.emit("change");
            Ok(())
        });

        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }
}
