// ============================================================================
// spark-observables - Event Emitter
// Listener registry plus the drop / queue / dispatch decision per emit
// ============================================================================

use std::any::Any;
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use super::event::Event;
use super::listener::{Listener, ListenerContext, Propagation};
use super::value_cell::{ValueCell, ValueCells};
use crate::core::constants::PROPERTY_SEPARATOR;
use crate::core::context::{log_error, with_context};
use crate::core::error::{CallbackFailure, CollectionError, Result};

// =============================================================================
// REGISTRATION
// =============================================================================

#[derive(Clone)]
struct Registration {
    listener: Listener,
    context: Option<ListenerContext>,
    /// Set for `once` registrations; flips to true on first delivery
    fired: Option<Rc<Cell<bool>>>,
}

impl Registration {
    fn matches(&self, listener: &Listener, context: Option<&ListenerContext>) -> bool {
        self.listener.ptr_eq(listener) && self.context.as_ref() == context
    }
}

enum DispatchMode {
    Drop,
    Queue,
    Dispatch,
}

// =============================================================================
// EVENT EMITTER
// =============================================================================

struct EmitterInner {
    listeners: RefCell<HashMap<String, Vec<Registration>>>,
    value_cells: RefCell<Option<ValueCells>>,
}

/// Publish/subscribe endpoint. Every list and map owns one.
///
/// `EventEmitter` is a shared handle: clones refer to the same registry and
/// count as the same event target.
///
/// # Example
///
/// ```
/// use spark_observables::{transact, EventEmitter, Listener};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let emitter = EventEmitter::new();
/// let calls = Rc::new(Cell::new(0));
///
/// let calls_clone = calls.clone();
/// emitter
///     .on("change", Listener::from_fn(move |_| calls_clone.set(calls_clone.get() + 1)), None)
///     .unwrap();
///
/// transact(|| {
///     emitter.emit("change");
///     emitter.emit("change");
///     Ok(())
/// });
///
/// // Coalesced into a single delivery
/// assert_eq!(calls.get(), 1);
/// ```
#[derive(Clone)]
pub struct EventEmitter {
    inner: Rc<EmitterInner>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(EmitterInner {
                listeners: RefCell::new(HashMap::new()),
                value_cells: RefCell::new(None),
            }),
        }
    }

    /// Whether both handles are the same event target.
    pub fn ptr_eq(&self, other: &EventEmitter) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // SUBSCRIPTION
    // =========================================================================

    /// Register `listener` for `event_type`.
    ///
    /// A `type:property` event type is routed to the value cell registered
    /// for that property.
    pub fn on(
        &self,
        event_type: &str,
        listener: Listener,
        context: Option<ListenerContext>,
    ) -> Result<()> {
        if let Some((base_type, property)) = event_type.split_once(PROPERTY_SEPARATOR) {
            self.value_cell(property)?.on(base_type, listener, context);
            return Ok(());
        }
        self.on_plain(event_type, listener, context);
        Ok(())
    }

    /// Register `listener` to run on the next `event_type` only.
    pub fn once(
        &self,
        event_type: &str,
        listener: Listener,
        context: Option<ListenerContext>,
    ) -> Result<()> {
        if let Some((base_type, property)) = event_type.split_once(PROPERTY_SEPARATOR) {
            self.value_cell(property)?.once(base_type, listener, context);
            return Ok(());
        }
        let fired = Rc::new(Cell::new(false));
        self.add_registration(event_type, listener, context, Some(fired));
        Ok(())
    }

    /// Remove the registration of `listener` under `context`.
    pub fn off(
        &self,
        event_type: &str,
        listener: &Listener,
        context: Option<&ListenerContext>,
    ) -> Result<()> {
        if let Some((base_type, property)) = event_type.split_once(PROPERTY_SEPARATOR) {
            self.value_cell(property)?.off(base_type, listener, context);
            return Ok(());
        }
        self.off_plain(event_type, listener, context);
        Ok(())
    }

    /// `on` for an event type known to carry no property, so it cannot fail.
    pub(crate) fn on_plain(
        &self,
        event_type: &str,
        listener: Listener,
        context: Option<ListenerContext>,
    ) {
        debug_assert!(!event_type.contains(PROPERTY_SEPARATOR));
        self.add_registration(event_type, listener, context, None);
    }

    pub(crate) fn off_plain(
        &self,
        event_type: &str,
        listener: &Listener,
        context: Option<&ListenerContext>,
    ) {
        debug_assert!(!event_type.contains(PROPERTY_SEPARATOR));
        self.remove_where(event_type, |registration| registration.matches(listener, context));
    }

    /// Remove every registration for `event_type`.
    pub fn off_type(&self, event_type: &str) {
        self.inner.listeners.borrow_mut().remove(event_type);
    }

    /// Remove every registration on this emitter.
    pub fn off_all(&self) {
        self.inner.listeners.borrow_mut().clear();
    }

    pub fn has_listeners(&self, event_type: &str) -> bool {
        self.listener_count(event_type) > 0
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.inner
            .listeners
            .borrow()
            .get(event_type)
            .map_or(0, Vec::len)
    }

    /// Attach a value cell for `type:property` subscriptions.
    pub fn register_value_cell(&self, property: impl Into<String>, cell: Rc<dyn ValueCell>) {
        let property = property.into();
        let mut cells = self.inner.value_cells.borrow_mut();
        let cells = cells.get_or_insert_with(ValueCells::default);
        if cells.insert(property, cell).is_some() {
            tracing::debug!(cells = cells.len(), "replaced value cell");
        }
    }

    fn value_cell(&self, property: &str) -> Result<Rc<dyn ValueCell>> {
        self.inner
            .value_cells
            .borrow()
            .as_ref()
            .and_then(|cells| cells.get(property))
            .ok_or_else(|| CollectionError::UnknownProperty {
                property: property.to_string(),
            })
    }

    fn add_registration(
        &self,
        event_type: &str,
        listener: Listener,
        context: Option<ListenerContext>,
        fired: Option<Rc<Cell<bool>>>,
    ) {
        self.inner
            .listeners
            .borrow_mut()
            .entry(event_type.to_string())
            .or_default()
            .push(Registration {
                listener,
                context,
                fired,
            });
    }

    fn remove_where(&self, event_type: &str, predicate: impl Fn(&Registration) -> bool) {
        let mut listeners = self.inner.listeners.borrow_mut();
        if let Some(registrations) = listeners.get_mut(event_type) {
            registrations.retain(|registration| !predicate(registration));
            if registrations.is_empty() {
                listeners.remove(event_type);
            }
        }
    }

    // =========================================================================
    // EMIT
    // =========================================================================

    /// Emit a payload-less event of `event_type` on this target.
    pub fn emit(&self, event_type: impl Into<Cow<'static, str>>) -> Rc<Event> {
        let event = Event::stamped(event_type, self);
        self.dispatch(event.clone());
        event
    }

    /// Emit an event of `event_type` carrying `payload`.
    pub fn emit_with<P: Any>(&self, event_type: impl Into<Cow<'static, str>>, payload: P) -> Rc<Event> {
        let event = Event::stamped(event_type, self);
        event.set_payload(Rc::new(payload));
        self.dispatch(event.clone());
        event
    }

    /// Emit an existing event record.
    ///
    /// Fails if the record was already emitted by another target.
    pub fn emit_event(&self, event: Rc<Event>) -> Result<Rc<Event>> {
        event.stamp_target(self)?;
        self.dispatch(event.clone());
        Ok(event)
    }

    /// Emit an existing event record, replacing its payload.
    pub fn emit_event_with<P: Any>(&self, event: Rc<Event>, payload: P) -> Result<Rc<Event>> {
        event.stamp_target(self)?;
        event.set_payload(Rc::new(payload));
        self.dispatch(event.clone());
        Ok(event)
    }

    fn dispatch(&self, event: Rc<Event>) {
        let mode = with_context(|ctx| {
            if ctx.is_silent() {
                DispatchMode::Drop
            } else if ctx.is_transacting() {
                DispatchMode::Queue
            } else {
                DispatchMode::Dispatch
            }
        });

        match mode {
            DispatchMode::Drop => {
                tracing::trace!(event_type = event.event_type(), "dropped silent event");
            }
            DispatchMode::Queue => with_context(|ctx| ctx.queue_event(event)),
            DispatchMode::Dispatch => self.handle_event(&event),
        }
    }

    /// Deliver `event` to the listeners registered right now.
    pub(crate) fn handle_event(&self, event: &Event) {
        // Snapshot so registrations made during delivery wait for the next event
        let registrations = match self.inner.listeners.borrow().get(event.event_type()) {
            Some(registrations) => registrations.clone(),
            None => return,
        };

        for registration in &registrations {
            self.try_listener(registration, event);
        }
    }

    fn try_listener(&self, registration: &Registration, event: &Event) {
        if let Some(fired) = &registration.fired {
            if fired.replace(true) {
                return;
            }
            self.remove_where(event.event_type(), |candidate| {
                candidate
                    .fired
                    .as_ref()
                    .is_some_and(|flag| Rc::ptr_eq(flag, fired))
            });
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| registration.listener.call(event)));

        match outcome {
            Ok(Ok(Propagation::Continue)) => {}
            Ok(Ok(Propagation::Stop)) => event.stop_propagation(),
            Ok(Err(source)) => log_error(&CallbackFailure::Listener {
                event_type: event.event_type().to_string(),
                source,
            }),
            Err(payload) => log_error(&CallbackFailure::from_panic("listener", payload)),
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.inner.listeners.borrow();
        f.debug_struct("EventEmitter")
            .field("event_types", &listeners.keys().collect::<Vec<_>>())
            .field(
                "listeners",
                &listeners.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
