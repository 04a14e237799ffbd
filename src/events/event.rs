// ============================================================================
// spark-observables - Event Record
// ============================================================================

use std::any::Any;
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::emitter::EventEmitter;
use crate::core::error::{CollectionError, Result};

/// A single notification: type tag, target, optional payload.
///
/// The target is stamped when the event is first emitted. While a
/// transaction coalesces events, the event that was replaced is kept as
/// `prev_event`, so a listener can walk back through everything that
/// happened to the same (target, type) inside the transaction.
pub struct Event {
    event_type: Cow<'static, str>,
    target: RefCell<Option<EventEmitter>>,
    payload: RefCell<Option<Rc<dyn Any>>>,
    prev_event: RefCell<Option<Rc<Event>>>,
    propagation_stopped: Cell<bool>,
}

impl Event {
    pub fn new(event_type: impl Into<Cow<'static, str>>) -> Self {
        Self {
            event_type: event_type.into(),
            target: RefCell::new(None),
            payload: RefCell::new(None),
            prev_event: RefCell::new(None),
            propagation_stopped: Cell::new(false),
        }
    }

    /// Attach a payload, replacing any previous one.
    pub fn with_payload<P: Any>(self, payload: P) -> Self {
        self.payload.replace(Some(Rc::new(payload)));
        self
    }

    pub(crate) fn stamped(event_type: impl Into<Cow<'static, str>>, target: &EventEmitter) -> Rc<Self> {
        let event = Self::new(event_type);
        event.target.replace(Some(target.clone()));
        Rc::new(event)
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The emitter that raised this event, once emitted.
    pub fn target(&self) -> Option<EventEmitter> {
        self.target.borrow().clone()
    }

    /// Typed access to the payload. `None` if absent or of another type.
    pub fn payload<P: Any>(&self) -> Option<Rc<P>> {
        let payload = self.payload.borrow().clone()?;
        payload.downcast::<P>().ok()
    }

    pub fn has_payload(&self) -> bool {
        self.payload.borrow().is_some()
    }

    /// The event this one replaced while coalescing, if any.
    pub fn prev_event(&self) -> Option<Rc<Event>> {
        self.prev_event.borrow().clone()
    }

    /// Set once any listener returned `Propagation::Stop`.
    ///
    /// Advisory only: remaining listeners still run.
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    pub(crate) fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub(crate) fn set_prev_event(&self, prev: Rc<Event>) {
        self.prev_event.replace(Some(prev));
    }

    pub(crate) fn set_payload(&self, payload: Rc<dyn Any>) {
        self.payload.replace(Some(payload));
    }

    /// Stamp the target, failing if the event already belongs elsewhere.
    pub(crate) fn stamp_target(&self, emitter: &EventEmitter) -> Result<()> {
        let mut target = self.target.borrow_mut();
        match target.as_ref() {
            Some(current) if !current.ptr_eq(emitter) => Err(CollectionError::TargetMismatch {
                event_type: self.event_type.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                *target = Some(emitter.clone());
                Ok(())
            }
        }
    }

    /// Coalescing identity: same target and same type.
    pub(crate) fn same_slot(&self, other: &Event) -> bool {
        if self.event_type != other.event_type {
            return false;
        }
        match (self.target.borrow().as_ref(), other.target.borrow().as_ref()) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("has_target", &self.target.borrow().is_some())
            .field("has_payload", &self.has_payload())
            .field("has_prev_event", &self.prev_event.borrow().is_some())
            .field("propagation_stopped", &self.propagation_stopped.get())
            .finish()
    }
}
