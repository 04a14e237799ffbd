// ============================================================================
// spark-observables - ObservableMap
// An insertion-ordered key/value table with typed change payloads
// ============================================================================

use std::borrow::Borrow;
use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::iter::FusedIterator;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::core::constants::{EVENT_CHANGE, MAP_MERGE_KIND};
use crate::core::equality::{can_merge, clone_item, items_equal};
use crate::core::error::Result;
use crate::core::item::Item;
use crate::core::types::{EqualsFn, MergeKind, ToData};
use crate::events::{EventEmitter, Listener, ListenerContext};

// =============================================================================
// KEYS AND PAYLOADS
// =============================================================================

/// Anything usable as an `ObservableMap` key.
pub trait MapKey: Eq + Hash + Clone + 'static {}

impl<K: Eq + Hash + Clone + 'static> MapKey for K {}

/// What a map change event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapChangeKind {
    Add,
    Update,
    Delete,
    Clear,
    AbsorbFrom,
}

/// Payload attached to every map `"change"` event.
///
/// | kind         | key  | prev_value | value |
/// |--------------|------|------------|-------|
/// | `Add`        | yes  | no         | yes   |
/// | `Update`     | yes  | yes        | yes   |
/// | `Delete`     | yes  | no         | yes   |
/// | `Clear`      | no   | no         | no    |
/// | `AbsorbFrom` | no   | no         | no    |
#[derive(Debug, Clone)]
pub struct MapChange<K, V> {
    pub kind: MapChangeKind,
    pub key: Option<K>,
    pub prev_value: Option<V>,
    pub value: Option<V>,
}

impl<K, V> MapChange<K, V> {
    fn bare(kind: MapChangeKind) -> Self {
        Self {
            kind,
            key: None,
            prev_value: None,
            value: None,
        }
    }
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Construction options for [`ObservableMap`].
pub struct MapOptions<V> {
    value_equals: Option<EqualsFn<V>>,
}

impl<V> MapOptions<V> {
    pub fn new() -> Self {
        Self { value_equals: None }
    }

    /// Equality predicate for `equals` and `absorb_from`.
    pub fn value_equals(mut self, f: impl Fn(&V, &V) -> bool + 'static) -> Self {
        self.value_equals = Some(Rc::new(f));
        self
    }
}

impl<V> Default for MapOptions<V> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// OBSERVABLE MAP
// =============================================================================

struct MapInner<K, V> {
    emitter: EventEmitter,
    entries: RefCell<IndexMap<K, V>>,
    value_equals: Option<EqualsFn<V>>,
}

/// A key-unique table that remembers insertion order and emits `"change"`
/// with a [`MapChange`] payload.
///
/// Like [`ObservableList`](crate::ObservableList), this is a shared handle.
///
/// # Example
///
/// ```
/// use spark_observables::{Listener, MapChange, MapChangeKind, ObservableMap};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let prices: ObservableMap<String, u32> = ObservableMap::new();
/// let kinds = Rc::new(RefCell::new(Vec::new()));
///
/// let kinds_clone = kinds.clone();
/// prices.on_change(Listener::from_fn(move |event| {
///     if let Some(change) = event.payload::<MapChange<String, u32>>() {
///         kinds_clone.borrow_mut().push(change.kind);
///     }
/// }), None);
///
/// prices.set("apple".to_string(), 3);
/// prices.set("apple".to_string(), 3); // same value, no event
/// prices.set("apple".to_string(), 4);
/// prices.delete("apple");
///
/// assert_eq!(
///     *kinds.borrow(),
///     vec![MapChangeKind::Add, MapChangeKind::Update, MapChangeKind::Delete]
/// );
/// ```
pub struct ObservableMap<K: MapKey, V: Item> {
    inner: Rc<MapInner<K, V>>,
}

impl<K: MapKey, V: Item> ObservableMap<K, V> {
    pub fn new() -> Self {
        Self::with_options(Vec::new(), MapOptions::new())
    }

    /// Seed from `(key, value)` pairs; later duplicates overwrite earlier ones
    /// in the earlier position.
    pub fn with_options(entries: impl IntoIterator<Item = (K, V)>, options: MapOptions<V>) -> Self {
        Self::from_index_map(entries.into_iter().collect(), options.value_equals)
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Self::with_options(entries, MapOptions::new())
    }

    /// Copy the entries of `other` into a new map with `options`.
    pub fn from_map(other: &ObservableMap<K, V>, options: MapOptions<V>) -> Self {
        Self::from_index_map(other.inner.entries.borrow().clone(), options.value_equals)
    }

    fn from_index_map(entries: IndexMap<K, V>, value_equals: Option<EqualsFn<V>>) -> Self {
        Self {
            inner: Rc::new(MapInner {
                emitter: EventEmitter::new(),
                entries: RefCell::new(entries),
                value_equals,
            }),
        }
    }

    pub fn value_equals(&self) -> Option<EqualsFn<V>> {
        self.inner.value_equals.clone()
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    pub fn emitter(&self) -> &EventEmitter {
        &self.inner.emitter
    }

    /// Listen for `"change"`, optionally bound to `context`.
    pub fn on_change(&self, listener: Listener, context: Option<ListenerContext>) {
        self.inner.emitter.on_plain(EVENT_CHANGE, listener, context);
    }

    /// Drop the `"change"` registration made with the same listener and context.
    pub fn off_change(&self, listener: &Listener, context: Option<&ListenerContext>) {
        self.inner.emitter.off_plain(EVENT_CHANGE, listener, context);
    }

    fn emit_change(&self, change: MapChange<K, V>) {
        self.inner.emitter.emit_with(EVENT_CHANGE, change);
    }

    pub fn ptr_eq(&self, other: &ObservableMap<K, V>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.entries.borrow().contains_key(key)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.entries.borrow().get(key).cloned()
    }

    /// Borrow the table for the duration of `f`.
    ///
    /// Mutating this map from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&IndexMap<K, V>) -> R) -> R {
        f(&self.inner.entries.borrow())
    }

    fn entry_at(&self, index: usize) -> Option<(K, V)> {
        self.inner
            .entries
            .borrow()
            .get_index(index)
            .map(|(key, value)| (key.clone(), value.clone()))
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Insert or overwrite. Overwriting keeps the key's position.
    pub fn set(&self, key: K, value: V) {
        let prev_value = {
            let mut entries = self.inner.entries.borrow_mut();
            match entries.get_mut(&key) {
                Some(current) if current.same_value(&value) => return,
                Some(current) => Some(std::mem::replace(current, value.clone())),
                None => {
                    entries.insert(key.clone(), value.clone());
                    None
                }
            }
        };

        let kind = if prev_value.is_some() {
            MapChangeKind::Update
        } else {
            MapChangeKind::Add
        };
        self.emit_change(MapChange {
            kind,
            key: Some(key),
            prev_value,
            value: Some(value),
        });
    }

    /// Remove `key`, returning whether it was present.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.inner.entries.borrow_mut().shift_remove_entry(key);
        match removed {
            Some((key, value)) => {
                self.emit_change(MapChange {
                    kind: MapChangeKind::Delete,
                    key: Some(key),
                    prev_value: None,
                    value: Some(value),
                });
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        let changed = {
            let mut entries = self.inner.entries.borrow_mut();
            let changed = !entries.is_empty();
            entries.clear();
            changed
        };
        if changed {
            self.emit_change(MapChange::bare(MapChangeKind::Clear));
        }
    }

    // =========================================================================
    // ITERATION
    // =========================================================================

    /// Calls `f(value, key)` for each entry in insertion order.
    pub fn for_each(&self, mut f: impl FnMut(&V, &K)) {
        for (key, value) in self.entries() {
            f(&value, &key);
        }
    }

    pub fn keys(&self) -> MapKeys<K, V> {
        MapKeys {
            cursor: Cursor::new(self),
        }
    }

    pub fn values(&self) -> MapValues<K, V> {
        MapValues {
            cursor: Cursor::new(self),
        }
    }

    pub fn entries(&self) -> MapEntries<K, V> {
        MapEntries {
            cursor: Cursor::new(self),
        }
    }

    // =========================================================================
    // STRUCTURAL OPERATIONS
    // =========================================================================

    /// Same size, and every key here maps to an equal value in `other`.
    pub fn equals(&self, other: &ObservableMap<K, V>) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let predicate = self.pick_equals(other);
        let entries = self.inner.entries.borrow();
        let other_entries = other.inner.entries.borrow();

        entries.len() == other_entries.len()
            && entries.iter().all(|(key, value)| {
                other_entries
                    .get(key)
                    .is_some_and(|other_value| items_equal(value, other_value, predicate.as_ref()))
            })
    }

    /// Independent copy keeping the value-equality configuration.
    pub fn duplicate(&self, deep: bool) -> ObservableMap<K, V> {
        let entries: IndexMap<K, V> = self
            .inner
            .entries
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), clone_item(value, deep)))
            .collect();
        Self::from_index_map(entries, self.inner.value_equals.clone())
    }

    /// Reconcile keys and values with `other`, emitting one `AbsorbFrom`
    /// change if anything differed.
    ///
    /// Keys missing from `other` are removed; unequal values sharing a merge
    /// kind absorb in place, other unequal values are overwritten; keys only
    /// in `other` are appended in `other`'s order.
    ///
    /// Nested merges are checked before any key is touched. A nested merge
    /// that fails anyway stops the pass; the steps already applied are
    /// reported before the error is returned.
    pub fn absorb_from(&self, other: &ObservableMap<K, V>) -> Result<bool> {
        if self.ptr_eq(other) {
            return Ok(false);
        }

        let predicate = self.pick_equals(other);
        let incoming = other.inner.entries.borrow().clone();
        let current = self.entry_pairs();
        check_merges(&current, &incoming, predicate.as_ref())?;

        let mut changed = false;
        let mut failure = None;

        for (key, value) in current {
            let Some(other_value) = incoming.get(&key) else {
                self.inner.entries.borrow_mut().shift_remove(&key);
                changed = true;
                continue;
            };
            if items_equal(&value, other_value, predicate.as_ref()) {
                continue;
            }

            if can_merge(&value, other_value) {
                match value.absorb_from(other_value) {
                    Ok(merged) => changed |= merged,
                    Err(error) => {
                        failure = Some(error);
                        break;
                    }
                }
            } else {
                self.inner
                    .entries
                    .borrow_mut()
                    .insert(key, other_value.clone());
                changed = true;
            }
        }

        if failure.is_none() {
            let mut entries = self.inner.entries.borrow_mut();
            for (key, value) in incoming {
                if !entries.contains_key(&key) {
                    entries.insert(key, value);
                    changed = true;
                }
            }
        }

        if changed {
            tracing::trace!(len = self.len(), "map absorbed");
            self.emit_change(MapChange::bare(MapChangeKind::AbsorbFrom));
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(changed),
        }
    }

    /// Check that [`absorb_from`](Self::absorb_from) with `other` would not
    /// fail on a nested merge. Nothing is mutated.
    pub fn check_absorb_from(&self, other: &ObservableMap<K, V>) -> Result<()> {
        if self.ptr_eq(other) {
            return Ok(());
        }
        let incoming = other.inner.entries.borrow().clone();
        check_merges(&self.entry_pairs(), &incoming, self.pick_equals(other).as_ref())
    }

    fn entry_pairs(&self) -> Vec<(K, V)> {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn pick_equals(&self, other: &ObservableMap<K, V>) -> Option<EqualsFn<V>> {
        self.inner
            .value_equals
            .clone()
            .or_else(|| other.inner.value_equals.clone())
    }
}

fn check_merges<K: MapKey, V: Item>(
    current: &[(K, V)],
    incoming: &IndexMap<K, V>,
    predicate: Option<&EqualsFn<V>>,
) -> Result<()> {
    for (key, value) in current {
        let Some(other_value) = incoming.get(key) else {
            continue;
        };
        if !items_equal(value, other_value, predicate) && can_merge(value, other_value) {
            value.check_absorb_from(other_value)?;
        }
    }
    Ok(())
}

// =============================================================================
// ITERATORS
// =============================================================================

struct Cursor<K: MapKey, V: Item> {
    map: ObservableMap<K, V>,
    index: usize,
    done: bool,
}

impl<K: MapKey, V: Item> Cursor<K, V> {
    fn new(map: &ObservableMap<K, V>) -> Self {
        Self {
            map: map.clone(),
            index: 0,
            done: false,
        }
    }

    // Stays exhausted once it has returned `None`
    fn advance(&mut self) -> Option<(K, V)> {
        if self.done {
            return None;
        }
        match self.map.entry_at(self.index) {
            Some(entry) => {
                self.index += 1;
                Some(entry)
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

/// Iterator returned by [`ObservableMap::keys`].
pub struct MapKeys<K: MapKey, V: Item> {
    cursor: Cursor<K, V>,
}

impl<K: MapKey, V: Item> Iterator for MapKeys<K, V> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        self.cursor.advance().map(|(key, _)| key)
    }
}

impl<K: MapKey, V: Item> FusedIterator for MapKeys<K, V> {}

/// Iterator returned by [`ObservableMap::values`].
pub struct MapValues<K: MapKey, V: Item> {
    cursor: Cursor<K, V>,
}

impl<K: MapKey, V: Item> Iterator for MapValues<K, V> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        self.cursor.advance().map(|(_, value)| value)
    }
}

impl<K: MapKey, V: Item> FusedIterator for MapValues<K, V> {}

/// Iterator returned by [`ObservableMap::entries`].
pub struct MapEntries<K: MapKey, V: Item> {
    cursor: Cursor<K, V>,
}

impl<K: MapKey, V: Item> Iterator for MapEntries<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.cursor.advance()
    }
}

impl<K: MapKey, V: Item> FusedIterator for MapEntries<K, V> {}

impl<K: MapKey, V: Item> IntoIterator for &ObservableMap<K, V> {
    type Item = (K, V);
    type IntoIter = MapEntries<K, V>;

    fn into_iter(self) -> MapEntries<K, V> {
        self.entries()
    }
}

// =============================================================================
// TRAIT IMPLS
// =============================================================================

impl<K: MapKey, V: Item> Clone for ObservableMap<K, V> {
    /// Another handle to the same map.
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: MapKey, V: Item> Default for ObservableMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: MapKey, V: Item> FromIterator<(K, V)> for ObservableMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

impl<K: MapKey, V: Item> From<IndexMap<K, V>> for ObservableMap<K, V> {
    fn from(entries: IndexMap<K, V>) -> Self {
        Self::from_index_map(entries, None)
    }
}

impl<K: MapKey, V: Item> Item for ObservableMap<K, V> {
    fn same_value(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }

    fn is_primitive(&self) -> bool {
        false
    }

    fn equals(&self, other: &Self) -> Option<bool> {
        Some(ObservableMap::equals(self, other))
    }

    fn clone_deep(&self) -> Option<Self> {
        Some(self.duplicate(true))
    }

    fn merge_kind(&self) -> Option<MergeKind> {
        Some(MAP_MERGE_KIND)
    }

    fn absorb_from(&self, other: &Self) -> Result<bool> {
        ObservableMap::absorb_from(self, other)
    }

    fn check_absorb_from(&self, other: &Self) -> Result<()> {
        ObservableMap::check_absorb_from(self, other)
    }
}

impl<K: MapKey + fmt::Display, V: Item + ToData> ToData for ObservableMap<K, V> {
    fn to_data(&self) -> Value {
        let object: Map<String, Value> = self
            .inner
            .entries
            .borrow()
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_data()))
            .collect();
        Value::Object(object)
    }
}

impl<K: MapKey + fmt::Debug, V: Item + fmt::Debug> fmt::Debug for ObservableMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.entries.borrow().iter()).finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::CollectionError;
    use crate::ObservableList;
    use serde_json::json;

    type Log = Rc<RefCell<Vec<MapChange<&'static str, i32>>>>;

    fn recorded(map: &ObservableMap<&'static str, i32>) -> Log {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = log.clone();
        map.on_change(Listener::from_fn(move |event| {
            if let Some(change) = event.payload::<MapChange<&'static str, i32>>() {
                log_clone.borrow_mut().push((*change).clone());
            }
        }), None);
        log
    }

    fn changes(log: &Log) -> Vec<MapChange<&'static str, i32>> {
        RefCell::borrow(log).clone()
    }

    fn kinds(log: &Log) -> Vec<MapChangeKind> {
        changes(log).iter().map(|change| change.kind).collect()
    }

    #[test]
    fn set_reports_add_then_update() {
        let map = ObservableMap::new();
        let log = recorded(&map);

        map.set("a", 1);
        map.set("a", 1);
        map.set("a", 2);

        assert_eq!(kinds(&log), vec![MapChangeKind::Add, MapChangeKind::Update]);
        let update = changes(&log)[1].clone();
        assert_eq!(update.key, Some("a"));
        assert_eq!(update.prev_value, Some(1));
        assert_eq!(update.value, Some(2));
        assert_eq!(changes(&log)[0].prev_value, None);
    }

    #[test]
    fn overwrite_keeps_position() {
        let map = ObservableMap::from_entries([("a", 1), ("b", 2), ("c", 3)]);
        map.set("a", 10);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(map.get(&"a"), Some(10));
    }

    #[test]
    fn delete_and_clear() {
        let map = ObservableMap::from_entries([("a", 1), ("b", 2)]);
        let log = recorded(&map);

        assert!(map.delete(&"a"));
        assert!(!map.delete(&"a"));
        assert!(!map.has(&"a"));
        map.clear();
        map.clear();

        assert_eq!(kinds(&log), vec![MapChangeKind::Delete, MapChangeKind::Clear]);
        assert_eq!(changes(&log)[0].value, Some(1));
        assert!(map.is_empty());
    }

    #[test]
    fn string_keys_accept_str_lookups() {
        let map: ObservableMap<String, i32> = ObservableMap::new();
        map.set("x".to_string(), 1);
        assert!(map.has("x"));
        assert_eq!(map.get("x"), Some(1));
        assert!(map.delete("x"));
    }

    #[test]
    fn for_each_visits_value_then_key() {
        let map = ObservableMap::from_entries([("a", 1), ("b", 2)]);
        let mut seen = Vec::new();
        map.for_each(|value, key| seen.push(format!("{key}={value}")));
        assert_eq!(seen, vec!["a=1", "b=2"]);
        assert_eq!(map.values().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!((&map).into_iter().count(), 2);
    }

    #[test]
    fn iterators_see_appended_keys() {
        let map = ObservableMap::from_entries([("a", 1)]);
        let mut keys = map.keys();
        assert_eq!(keys.next(), Some("a"));
        map.set("b", 2);
        assert_eq!(keys.next(), Some("b"));
        assert_eq!(keys.next(), None);
    }

    #[test]
    fn exhausted_iterators_stay_exhausted() {
        let map = ObservableMap::from_entries([("a", 1)]);
        let mut entries = map.entries();
        assert_eq!(entries.next(), Some(("a", 1)));
        assert_eq!(entries.next(), None);

        map.set("b", 2);
        assert_eq!(entries.next(), None);
        assert_eq!(map.entries().count(), 2);
    }

    #[test]
    fn equals_is_order_independent() {
        let a = ObservableMap::from_entries([("a", 1), ("b", 2)]);
        let b = ObservableMap::from_entries([("b", 2), ("a", 1)]);
        let c = ObservableMap::from_entries([("a", 1), ("c", 2)]);
        assert!(a.equals(&b));
        assert!(!a.equals(&c));
        assert!(!a.equals(&ObservableMap::new()));
    }

    #[test]
    fn equals_uses_value_predicate() {
        let a = ObservableMap::with_options(
            [("a", 1)],
            MapOptions::new().value_equals(|x: &i32, y: &i32| x.abs() == y.abs()),
        );
        let b = ObservableMap::from_entries([("a", -1)]);
        assert!(a.equals(&b));
        assert!(b.equals(&a));
    }

    #[test]
    fn duplicate_is_independent() {
        let map = ObservableMap::from_entries([("a", 1)]);
        let copy = map.duplicate(false);
        assert!(copy.equals(&map));
        copy.set("b", 2);
        assert_eq!(map.len(), 1);
        assert_eq!(copy.len(), 2);
    }

    #[test]
    fn absorb_reconciles_with_one_event() {
        let map = ObservableMap::from_entries([("a", 1), ("b", 2)]);
        let log = recorded(&map);

        let changed = map
            .absorb_from(&ObservableMap::from_entries([("b", 3), ("c", 4)]))
            .unwrap();

        assert!(changed);
        assert!(map.equals(&ObservableMap::from_entries([("b", 3), ("c", 4)])));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(kinds(&log), vec![MapChangeKind::AbsorbFrom]);

        assert_eq!(
            map.absorb_from(&ObservableMap::from_entries([("b", 3), ("c", 4)])),
            Ok(false)
        );
        assert_eq!(changes(&log).len(), 1);
    }

    #[test]
    fn absorb_merges_nested_containers() {
        let inner = ObservableList::from_vec(vec![1]);
        let map = ObservableMap::from_entries([("list", inner.clone())]);

        let incoming = ObservableMap::from_entries([("list", ObservableList::from_vec(vec![1, 2]))]);
        assert_eq!(map.absorb_from(&incoming), Ok(true));

        assert!(map.get(&"list").unwrap().ptr_eq(&inner));
        assert_eq!(inner.to_vec(), vec![1, 2]);
    }

    #[test]
    fn nested_absorb_errors_propagate() {
        #[derive(Clone)]
        struct Strict(Rc<u8>);

        impl Item for Strict {
            fn same_value(&self, other: &Self) -> bool {
                Rc::ptr_eq(&self.0, &other.0)
            }
            fn is_primitive(&self) -> bool {
                false
            }
            fn merge_kind(&self) -> Option<MergeKind> {
                Some(MergeKind::new("Strict"))
            }
        }

        let map = ObservableMap::from_entries([
            ("gone", Strict(Rc::new(0))),
            ("k", Strict(Rc::new(1))),
        ]);
        let events = Rc::new(std::cell::Cell::new(0));
        let events_clone = events.clone();
        map.on_change(Listener::from_fn(move |_| events_clone.set(events_clone.get() + 1)), None);

        let incoming = ObservableMap::from_entries([
            ("k", Strict(Rc::new(2))),
            ("new", Strict(Rc::new(3))),
        ]);
        assert!(matches!(
            map.check_absorb_from(&incoming),
            Err(CollectionError::KindMismatch { .. })
        ));
        assert!(matches!(
            map.absorb_from(&incoming),
            Err(CollectionError::KindMismatch { .. })
        ));

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["gone", "k"]);
        assert_eq!(*map.get(&"k").unwrap().0, 1);
        assert_eq!(events.get(), 0);
    }

    #[test]
    fn to_data_builds_object() {
        let map = ObservableMap::from_entries([
            ("xs", ObservableList::from_vec(vec![1, 2])),
            ("ys", ObservableList::new()),
        ]);
        assert_eq!(map.to_data(), json!({ "xs": [1, 2], "ys": [] }));
    }
}
