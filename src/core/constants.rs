// ============================================================================
// spark-observables - Constants
// Event tags and merge kinds shared by the emitter and the containers
// ============================================================================

use super::types::MergeKind;

// =============================================================================
// EVENT TYPES
// =============================================================================

/// Event type raised by lists and maps on every content change
pub const EVENT_CHANGE: &str = "change";

/// Separator between event type and property name in `type:prop` subscriptions
pub const PROPERTY_SEPARATOR: char = ':';

// =============================================================================
// MERGE KINDS
// =============================================================================

/// Merge tag carried by every `ObservableList`
pub const LIST_MERGE_KIND: MergeKind = MergeKind::new("ObservableList");

/// Merge tag carried by every `ObservableMap`
pub const MAP_MERGE_KIND: MergeKind = MergeKind::new("ObservableMap");
