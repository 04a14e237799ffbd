// ============================================================================
// spark-observables - Listeners
// Callback handles compared by identity, plus optional registration context
// ============================================================================

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use super::event::Event;
use crate::core::error::BoxError;

/// What a listener asks of the emitter after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    #[default]
    Continue,
    /// Recorded on the event; does not skip the remaining listeners.
    Stop,
}

pub type ListenerResult = std::result::Result<Propagation, BoxError>;

type ListenerFn = dyn Fn(&Event) -> ListenerResult;

// =============================================================================
// LISTENER
// =============================================================================

/// A shareable event callback.
///
/// Cloning a `Listener` yields the same listener: `off` removes a
/// registration when it was registered with a clone of the given handle.
///
/// # Example
///
/// ```
/// use spark_observables::{EventEmitter, Listener, Propagation};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let emitter = EventEmitter::new();
/// let hits = Rc::new(Cell::new(0));
///
/// let hits_clone = hits.clone();
/// let listener = Listener::new(move |_event| {
///     hits_clone.set(hits_clone.get() + 1);
///     Ok(Propagation::Continue)
/// });
///
/// emitter.on("ping", listener.clone(), None).unwrap();
/// emitter.emit("ping");
/// emitter.off("ping", &listener, None).unwrap();
/// emitter.emit("ping");
///
/// assert_eq!(hits.get(), 1);
/// ```
#[derive(Clone)]
pub struct Listener(Rc<ListenerFn>);

impl Listener {
    /// Wrap a fallible callback.
    pub fn new(f: impl Fn(&Event) -> ListenerResult + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Wrap a callback that never fails and never stops propagation.
    pub fn from_fn(f: impl Fn(&Event) + 'static) -> Self {
        Self::new(move |event| {
            f(event);
            Ok(Propagation::Continue)
        })
    }

    pub(crate) fn call(&self, event: &Event) -> ListenerResult {
        (self.0)(event)
    }

    pub fn ptr_eq(&self, other: &Listener) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener").field(&Rc::as_ptr(&self.0).cast::<()>()).finish()
    }
}

// =============================================================================
// LISTENER CONTEXT
// =============================================================================

/// Opaque owner tag for a registration.
///
/// The same listener registered under two contexts is two registrations;
/// `off` only removes the one whose context matches.
#[derive(Clone)]
pub struct ListenerContext(Rc<dyn Any>);

impl ListenerContext {
    pub fn new(owner: impl Any) -> Self {
        Self(Rc::new(owner))
    }

    pub fn from_rc(owner: Rc<dyn Any>) -> Self {
        Self(owner)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl PartialEq for ListenerContext {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl Eq for ListenerContext {}

impl fmt::Debug for ListenerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ListenerContext").field(&Rc::as_ptr(&self.0).cast::<()>()).finish()
    }
}
