// ============================================================================
// spark-observables - Observable Collections for Rust
// ============================================================================
//
// Change-observable list and map containers built on a single-threaded
// event emitter with transactional batching, coalescing and silent mode.
// ============================================================================

pub mod collections;
pub mod core;
pub mod events;

mod macros;

// Re-export core items at crate root for ergonomic access
pub use crate::core::constants;
pub use crate::core::context::{
    is_silent, is_transacting, reset_error_logger, set_error_logger, with_context, EmitterContext,
    ErrorLogger,
};
pub use crate::core::error::{BoxError, CallbackFailure, CollectionError, Result};
pub use crate::core::item::Item;
pub use crate::core::types::{CompareFn, EqualsFn, MergeKind, ToData};

// Re-export the event layer
pub use events::{
    silently, transact, Event, EventEmitter, Listener, ListenerContext, ListenerResult,
    Propagation, ValueCell,
};

// Re-export collections
pub use collections::{
    ListOptions, MapChange, MapChangeKind, MapKey, MapOptions, ObservableList, ObservableMap,
};

// =============================================================================
// TESTS
// =============================================================================
