// ============================================================================
// spark-observables - Core Module
// Errors, capabilities, equality rules and the thread-local emitter context
// ============================================================================

pub mod constants;
pub mod context;
pub mod equality;
pub mod error;
pub mod item;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use context::{
    is_silent, is_transacting, log_error, reset_error_logger, set_error_logger, with_context,
    EmitterContext, ErrorLogger,
};
pub use error::{BoxError, CallbackFailure, CollectionError, Result};
pub use item::Item;
pub use types::{CompareFn, EqualsFn, MergeKind, ToData};
