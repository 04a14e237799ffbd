// ============================================================================
// spark-observables - Value Cells
// Boundary for `type:property` subscriptions on a host object
// ============================================================================

use std::collections::HashMap;
use std::rc::Rc;

use super::listener::{Listener, ListenerContext};

/// A subscribable cell backing one property of a host object.
///
/// Containers never create cells. Hosts that expose observable properties
/// register them on their emitter; `on("change:title", ..)` is then routed to
/// the cell registered under `title`.
pub trait ValueCell {
    fn on(&self, event_type: &str, listener: Listener, context: Option<ListenerContext>);
    fn once(&self, event_type: &str, listener: Listener, context: Option<ListenerContext>);
    fn off(&self, event_type: &str, listener: &Listener, context: Option<&ListenerContext>);
}

/// Per-emitter registry, created on first registration.
#[derive(Default)]
pub(crate) struct ValueCells {
    cells: HashMap<String, Rc<dyn ValueCell>>,
}

impl ValueCells {
    pub(crate) fn insert(&mut self, property: String, cell: Rc<dyn ValueCell>) -> Option<Rc<dyn ValueCell>> {
        self.cells.insert(property, cell)
    }

    pub(crate) fn get(&self, property: &str) -> Option<Rc<dyn ValueCell>> {
        self.cells.get(property).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }
}
