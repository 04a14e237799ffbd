// ============================================================================
// spark-observables - Observable Collections
// A list and a map that announce every effective mutation
// ============================================================================
//
// Both containers are shared handles over interior-mutable storage. Storage
// borrows are always released before an event is emitted, so listeners may
// read or mutate the container that notified them.
// ============================================================================

mod list;
mod map;

pub use list::{ListEntries, ListKeys, ListOptions, ListValues, ObservableList};
pub use map::{
    MapChange, MapChangeKind, MapEntries, MapKey, MapKeys, MapOptions, MapValues, ObservableMap,
};
