// ============================================================================
// spark-observables - Errors
// Caller-misuse errors and isolated callback failures
// ============================================================================

use std::error::Error as StdError;

/// Boxed error returned by listeners and guarded callbacks.
pub type BoxError = Box<dyn StdError + 'static>;

/// Result alias for container and emitter operations.
pub type Result<T> = std::result::Result<T, CollectionError>;

// =============================================================================
// COLLECTION ERROR
// =============================================================================

/// Errors signaled synchronously to the caller of a mutating method.
///
/// Every variant means the container was left unmodified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    /// Index outside `0..len` (or `0..=len` where the end index is allowed)
    #[error("index {index} out of valid range for length {len}")]
    IndexOutOfRange { index: isize, len: usize },

    /// `index + count` runs past the end of the list
    #[error("sum of index {index} and count {count} out of valid range for length {len}")]
    RangeOutOfBounds { index: usize, count: usize, len: usize },

    /// Attempt to grow a list through `set_length`
    #[error("length {requested} out of valid range (current length {len})")]
    LengthIncrease { requested: usize, len: usize },

    /// Unordered mutation attempted on a sorted list
    #[error("cannot {operation} on sorted list")]
    SortedList { operation: &'static str },

    /// Merge attempted between values of different kinds
    #[error("cannot absorb {found} into {expected}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// An already-targeted event was emitted on a different emitter
    #[error("event `{event_type}` already belongs to another target")]
    TargetMismatch { event_type: String },

    /// `type:prop` subscription for a property without a registered value cell
    #[error("no value cell registered for property `{property}`")]
    UnknownProperty { property: String },
}

// =============================================================================
// CALLBACK FAILURE
// =============================================================================

/// A failure caught at a dispatch boundary and sent to the error logger.
///
/// These never reach the caller of `emit`, `transact` or `silently`.
#[derive(Debug, thiserror::Error)]
pub enum CallbackFailure {
    #[error("listener for `{event_type}` failed: {source}")]
    Listener {
        event_type: String,
        #[source]
        source: BoxError,
    },

    #[error("transaction callback failed: {0}")]
    Transaction(#[source] BoxError),

    #[error("silent callback failed: {0}")]
    Silent(#[source] BoxError),

    #[error("{scope} panicked: {message}")]
    Panicked {
        scope: &'static str,
        message: String,
    },
}

impl CallbackFailure {
    /// Build a `Panicked` failure from a `catch_unwind` payload.
    pub(crate) fn from_panic(scope: &'static str, payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        CallbackFailure::Panicked { scope, message }
    }
}
