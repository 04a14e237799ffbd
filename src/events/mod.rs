// ============================================================================
// spark-observables - Events Module
// Event records, listeners, the emitter, transactions and silent mode
// ============================================================================

pub mod batching;
pub mod emitter;
pub mod event;
pub mod listener;
pub mod value_cell;

pub use batching::{silently, transact};
pub use emitter::EventEmitter;
pub use event::Event;
pub use listener::{Listener, ListenerContext, ListenerResult, Propagation};
pub use value_cell::ValueCell;
