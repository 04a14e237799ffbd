// ============================================================================
// spark-observables - ObservableList
// An ordered sequence emitting one change event per mutating call
// ============================================================================

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;
use std::rc::Rc;

use serde_json::Value;

use crate::core::constants::{EVENT_CHANGE, LIST_MERGE_KIND};
use crate::core::equality::{can_merge, clone_item, default_comparator, items_equal};
use crate::core::error::{CollectionError, Result};
use crate::core::item::Item;
use crate::core::types::{CompareFn, EqualsFn, MergeKind, ToData};
use crate::events::{EventEmitter, Listener, ListenerContext};

// =============================================================================
// OPTIONS
// =============================================================================

/// Construction options for [`ObservableList`].
///
/// A comparator puts the list into sorted mode unless `unsorted()` is set.
pub struct ListOptions<T> {
    item_equals: Option<EqualsFn<T>>,
    item_comparator: Option<CompareFn<T>>,
    sorted: Option<bool>,
}

impl<T> ListOptions<T> {
    pub fn new() -> Self {
        Self {
            item_equals: None,
            item_comparator: None,
            sorted: None,
        }
    }

    /// Equality predicate for `equals` and `absorb_from`.
    pub fn item_equals(mut self, f: impl Fn(&T, &T) -> bool + 'static) -> Self {
        self.item_equals = Some(Rc::new(f));
        self
    }

    /// Comparator for sorted mode.
    pub fn item_comparator(mut self, f: impl Fn(&T, &T) -> Ordering + 'static) -> Self {
        self.item_comparator = Some(Rc::new(f));
        self
    }

    /// Keep the comparator but do not enter sorted mode.
    pub fn unsorted(mut self) -> Self {
        self.sorted = Some(false);
        self
    }

    fn into_config(self) -> ListConfig<T> {
        let sorted = self.item_comparator.is_some() && self.sorted != Some(false);
        ListConfig {
            item_equals: self.item_equals,
            item_comparator: if sorted { self.item_comparator } else { None },
        }
    }
}

impl<T: PartialOrd + 'static> ListOptions<T> {
    /// Enter sorted mode, with the natural order unless a comparator was given.
    pub fn sorted(mut self) -> Self {
        if self.item_comparator.is_none() {
            self.item_comparator = Some(Rc::new(default_comparator::<T>));
        }
        self.sorted = Some(true);
        self
    }
}

impl<T> Default for ListOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct ListConfig<T> {
    item_equals: Option<EqualsFn<T>>,
    /// Present if and only if the list is in sorted mode
    item_comparator: Option<CompareFn<T>>,
}

impl<T> Clone for ListConfig<T> {
    fn clone(&self) -> Self {
        Self {
            item_equals: self.item_equals.clone(),
            item_comparator: self.item_comparator.clone(),
        }
    }
}

// =============================================================================
// OBSERVABLE LIST
// =============================================================================

struct ListInner<T> {
    emitter: EventEmitter,
    items: RefCell<Vec<T>>,
    config: ListConfig<T>,
}

/// An index-addressed sequence that emits `"change"` whenever a call
/// actually alters its content.
///
/// `ObservableList` is a shared handle: `Clone` yields another handle to the
/// same list. Use [`duplicate`](Self::duplicate) for an independent copy.
///
/// Indices are `isize`; negative values count from the end.
///
/// # Example
///
/// ```
/// use spark_observables::{ListOptions, ObservableList};
///
/// let scores = ObservableList::with_options(vec![30, 10], ListOptions::new().sorted());
/// scores.add(20);
/// assert_eq!(scores.to_vec(), vec![10, 20, 30]);
///
/// // Direct index writes would break the order
/// assert!(scores.set(0, 99).is_err());
/// ```
pub struct ObservableList<T: Item> {
    inner: Rc<ListInner<T>>,
}

impl<T: Item> ObservableList<T> {
    /// Create an empty, unsorted list.
    pub fn new() -> Self {
        Self::with_config(Vec::new(), ListOptions::new().into_config())
    }

    /// Create a list from `items` with the given options.
    ///
    /// In sorted mode every seed item goes through ordered placement.
    pub fn with_options(items: impl IntoIterator<Item = T>, options: ListOptions<T>) -> Self {
        Self::with_config(items.into_iter().collect(), options.into_config())
    }

    /// Create an unsorted list owning `items`.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self::with_config(items, ListOptions::new().into_config())
    }

    /// Copy the elements of `other` into a new list with `options`.
    pub fn from_list(other: &ObservableList<T>, options: ListOptions<T>) -> Self {
        Self::with_options(other.to_vec(), options)
    }

    fn with_config(seed: Vec<T>, config: ListConfig<T>) -> Self {
        let items = match &config.item_comparator {
            Some(comparator) => {
                let mut ordered = Vec::with_capacity(seed.len());
                for item in seed {
                    insert_sorted(&mut ordered, item, comparator);
                }
                ordered
            }
            None => seed,
        };

        Self {
            inner: Rc::new(ListInner {
                emitter: EventEmitter::new(),
                items: RefCell::new(items),
                config,
            }),
        }
    }

    // =========================================================================
    // CONFIGURATION
    // =========================================================================

    pub fn item_equals(&self) -> Option<EqualsFn<T>> {
        self.inner.config.item_equals.clone()
    }

    pub fn item_comparator(&self) -> Option<CompareFn<T>> {
        self.inner.config.item_comparator.clone()
    }

    pub fn is_sorted(&self) -> bool {
        self.inner.config.item_comparator.is_some()
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// The emitter this list raises its events on.
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

    fn emit_change(&self) {
        self.inner.emitter.emit(EVENT_CHANGE);
    }

    /// Whether both handles refer to the same list.
    pub fn ptr_eq(&self, other: &ObservableList<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // LENGTH
    // =========================================================================

    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Truncate to `len` elements. Growing is a range error.
    pub fn set_length(&self, len: usize) -> Result<()> {
        {
            let mut items = self.inner.items.borrow_mut();
            let current = items.len();
            if len == current {
                return Ok(());
            }
            if len > current {
                return Err(CollectionError::LengthIncrease {
                    requested: len,
                    len: current,
                });
            }
            items.truncate(len);
        }
        self.emit_change();
        Ok(())
    }

    // =========================================================================
    // INDEX VALIDATION
    // =========================================================================

    fn validate_index(&self, index: isize, allow_end: bool) -> Result<usize> {
        resolve_index(index, self.len(), allow_end)
    }

    /// Resolve an optional start index; `None` means 0.
    fn validate_from(&self, from: Option<isize>) -> Result<usize> {
        from.map_or(Ok(0), |index| self.validate_index(index, true))
    }

    fn ensure_unsorted(&self, operation: &'static str) -> Result<()> {
        if self.is_sorted() {
            return Err(CollectionError::SortedList { operation });
        }
        Ok(())
    }

    fn item_at(&self, index: usize) -> Option<T> {
        self.inner.items.borrow().get(index).cloned()
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn contains(&self, item: &T) -> bool {
        self.inner.items.borrow().iter().any(|x| x.same_value(item))
    }

    /// Position of the first element identical to `item`, searching from `from`.
    pub fn index_of(&self, item: &T, from: Option<isize>) -> Result<Option<usize>> {
        let from = self.validate_from(from)?;
        let items = self.inner.items.borrow();
        Ok(items[from..]
            .iter()
            .position(|x| x.same_value(item))
            .map(|offset| from + offset))
    }

    /// Position of the last element identical to `item`, searching backwards
    /// from `from` (default: the last element).
    pub fn last_index_of(&self, item: &T, from: Option<isize>) -> Result<Option<usize>> {
        let end = match from {
            Some(index) => self.validate_index(index, true)? + 1,
            None => self.len(),
        };
        let items = self.inner.items.borrow();
        let end = end.min(items.len());
        Ok(items[..end].iter().rposition(|x| x.same_value(item)))
    }

    pub fn get(&self, index: isize) -> Result<T> {
        let index = self.validate_index(index, false)?;
        Ok(self.inner.items.borrow()[index].clone())
    }

    /// `count` elements starting at `index`, or the whole tail when `None`.
    pub fn get_range(&self, index: isize, count: Option<usize>) -> Result<Vec<T>> {
        let index = self.validate_index(index, true)?;
        let items = self.inner.items.borrow();
        let end = match count {
            Some(count) => checked_range_end(index, count, items.len())?,
            None => items.len(),
        };
        Ok(items[index..end].to_vec())
    }

    /// Borrow the elements for the duration of `f`.
    ///
    /// Mutating this list from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.items.borrow())
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.inner.items.borrow().clone()
    }

    // =========================================================================
    // UNORDERED WRITES (rejected in sorted mode)
    // =========================================================================

    /// Replace the element at `index`. The one-past-end index appends.
    pub fn set(&self, index: isize, item: T) -> Result<()> {
        self.ensure_unsorted("set")?;
        let index = self.validate_index(index, true)?;

        let changed = {
            let mut items = self.inner.items.borrow_mut();
            if index == items.len() {
                items.push(item);
                true
            } else if items[index].same_value(&item) {
                false
            } else {
                items[index] = item;
                true
            }
        };

        if changed {
            self.emit_change();
        }
        Ok(())
    }

    /// Overwrite `items.len()` elements starting at `index`.
    pub fn set_range(&self, index: isize, items: impl IntoIterator<Item = T>) -> Result<()> {
        self.ensure_unsorted("set")?;
        let index = self.validate_index(index, true)?;
        let replacement: Vec<T> = items.into_iter().collect();
        if replacement.is_empty() {
            return Ok(());
        }

        let changed = {
            let mut list_items = self.inner.items.borrow_mut();
            let end = checked_range_end(index, replacement.len(), list_items.len())?;
            let mut changed = false;
            for (slot, item) in list_items[index..end].iter_mut().zip(replacement).rev() {
                if !slot.same_value(&item) {
                    *slot = item;
                    changed = true;
                }
            }
            changed
        };

        if changed {
            self.emit_change();
        }
        Ok(())
    }

    pub fn insert(&self, index: isize, item: T) -> Result<()> {
        self.ensure_unsorted("insert")?;
        let index = self.validate_index(index, true)?;
        self.inner.items.borrow_mut().insert(index, item);
        self.emit_change();
        Ok(())
    }

    pub fn insert_range(&self, index: isize, items: impl IntoIterator<Item = T>) -> Result<()> {
        self.ensure_unsorted("insert")?;
        let index = self.validate_index(index, true)?;
        let inserted: Vec<T> = items.into_iter().collect();
        if inserted.is_empty() {
            return Ok(());
        }
        {
            let mut items = self.inner.items.borrow_mut();
            let tail = items.split_off(index);
            items.extend(inserted);
            items.extend(tail);
        }
        self.emit_change();
        Ok(())
    }

    /// Replace the first `old_item` at or after `from` with `new_item`.
    pub fn replace(&self, old_item: &T, new_item: T, from: Option<isize>) -> Result<bool> {
        self.ensure_unsorted("replace")?;
        let Some(index) = self.index_of(old_item, from)? else {
            return Ok(false);
        };

        let changed = {
            let mut items = self.inner.items.borrow_mut();
            let changed = !items[index].same_value(&new_item);
            items[index] = new_item;
            changed
        };

        if changed {
            self.emit_change();
        }
        Ok(true)
    }

    /// Replace every `old_item` at or after `from` with `new_item`.
    pub fn replace_all(&self, old_item: &T, new_item: T, from: Option<isize>) -> Result<bool> {
        self.ensure_unsorted("replace")?;
        let from = self.validate_from(from)?;

        let (found, changed) = {
            let mut items = self.inner.items.borrow_mut();
            let mut found = false;
            let mut changed = false;
            for slot in items[from..].iter_mut().filter(|x| x.same_value(old_item)) {
                found = true;
                if !slot.same_value(&new_item) {
                    *slot = new_item.clone();
                    changed = true;
                }
            }
            (found, changed)
        };

        if changed {
            self.emit_change();
        }
        Ok(found)
    }

    // =========================================================================
    // ADD (ordered placement in sorted mode)
    // =========================================================================

    /// Append `item`, or place it in order when the list is sorted.
    pub fn add(&self, item: T) {
        self.place(item);
        self.emit_change();
    }

    /// Like [`add`](Self::add), but skips an item already present.
    pub fn add_unique(&self, item: T) -> bool {
        if self.contains(&item) {
            return false;
        }
        self.add(item);
        true
    }

    pub fn add_range(&self, items: impl IntoIterator<Item = T>) {
        let added: Vec<T> = items.into_iter().collect();
        if added.is_empty() {
            return;
        }
        for item in added {
            self.place(item);
        }
        self.emit_change();
    }

    /// Add each item not already present (including ones added by this call).
    pub fn add_range_unique(&self, items: impl IntoIterator<Item = T>) -> bool {
        let candidates: Vec<T> = items.into_iter().collect();
        let mut changed = false;
        for item in candidates {
            if !self.contains(&item) {
                self.place(item);
                changed = true;
            }
        }
        if changed {
            self.emit_change();
        }
        changed
    }

    fn place(&self, item: T) {
        let mut items = self.inner.items.borrow_mut();
        match &self.inner.config.item_comparator {
            Some(comparator) => insert_sorted(&mut items, item, comparator),
            None => items.push(item),
        }
    }

    // =========================================================================
    // REMOVE
    // =========================================================================

    /// Remove the first `item` at or after `from`.
    pub fn remove(&self, item: &T, from: Option<isize>) -> Result<bool> {
        let Some(index) = self.index_of(item, from)? else {
            return Ok(false);
        };
        self.inner.items.borrow_mut().remove(index);
        self.emit_change();
        Ok(true)
    }

    /// Remove every `item` at or after `from`.
    pub fn remove_all(&self, item: &T, from: Option<isize>) -> Result<bool> {
        let from = self.validate_from(from)?;
        let changed = {
            let mut items = self.inner.items.borrow_mut();
            let before = items.len();
            let mut position = 0;
            items.retain(|x| {
                let keep = position < from || !x.same_value(item);
                position += 1;
                keep
            });
            items.len() != before
        };

        if changed {
            self.emit_change();
        }
        Ok(changed)
    }

    pub fn remove_at(&self, index: isize) -> Result<T> {
        let index = self.validate_index(index, false)?;
        let item = self.inner.items.borrow_mut().remove(index);
        self.emit_change();
        Ok(item)
    }

    /// Remove `count` elements from `index`, or the whole tail when `None`.
    pub fn remove_range(&self, index: isize, count: Option<usize>) -> Result<Vec<T>> {
        let index = self.validate_index(index, true)?;
        let removed: Vec<T> = {
            let mut items = self.inner.items.borrow_mut();
            let end = match count {
                Some(count) => checked_range_end(index, count, items.len())?,
                None => items.len(),
            };
            items.drain(index..end).collect()
        };

        if !removed.is_empty() {
            self.emit_change();
        }
        Ok(removed)
    }

    pub fn clear(&self) {
        let changed = {
            let mut items = self.inner.items.borrow_mut();
            let changed = !items.is_empty();
            items.clear();
            changed
        };
        if changed {
            self.emit_change();
        }
    }

    // =========================================================================
    // SEARCH AND ITERATION HELPERS
    // =========================================================================
    //
    // Callbacks run without any borrow held, so they may read or mutate the
    // list. Each step re-reads the current length.
    // =========================================================================

    pub fn find_index(
        &self,
        mut predicate: impl FnMut(&T, usize) -> bool,
        from: Option<isize>,
    ) -> Result<Option<usize>> {
        let mut index = self.validate_from(from)?;
        while let Some(item) = self.item_at(index) {
            if predicate(&item, index) {
                return Ok(Some(index));
            }
            index += 1;
        }
        Ok(None)
    }

    pub fn find_last_index(
        &self,
        mut predicate: impl FnMut(&T, usize) -> bool,
        from: Option<isize>,
    ) -> Result<Option<usize>> {
        let start = match from {
            Some(index) => self.validate_index(index, true)? + 1,
            None => self.len(),
        };
        for index in (0..start).rev() {
            if let Some(item) = self.item_at(index) {
                if predicate(&item, index) {
                    return Ok(Some(index));
                }
            }
        }
        Ok(None)
    }

    pub fn find(
        &self,
        predicate: impl FnMut(&T, usize) -> bool,
        from: Option<isize>,
    ) -> Result<Option<T>> {
        Ok(self
            .find_index(predicate, from)?
            .and_then(|index| self.item_at(index)))
    }

    pub fn find_last(
        &self,
        predicate: impl FnMut(&T, usize) -> bool,
        from: Option<isize>,
    ) -> Result<Option<T>> {
        Ok(self
            .find_last_index(predicate, from)?
            .and_then(|index| self.item_at(index)))
    }

    pub fn for_each(&self, mut f: impl FnMut(&T, usize)) {
        for (index, item) in self.entries() {
            f(&item, index);
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T, usize) -> U) -> Vec<U> {
        self.entries().map(|(index, item)| f(&item, index)).collect()
    }

    pub fn filter(&self, mut f: impl FnMut(&T, usize) -> bool) -> Vec<T> {
        self.entries()
            .filter(|(index, item)| f(item, *index))
            .map(|(_, item)| item)
            .collect()
    }

    pub fn every(&self, mut f: impl FnMut(&T, usize) -> bool) -> bool {
        self.entries().all(|(index, item)| f(&item, index))
    }

    pub fn some(&self, mut f: impl FnMut(&T, usize) -> bool) -> bool {
        self.entries().any(|(index, item)| f(&item, index))
    }

    pub fn reduce<A>(&self, init: A, mut f: impl FnMut(A, &T, usize) -> A) -> A {
        self.entries()
            .fold(init, |acc, (index, item)| f(acc, &item, index))
    }

    pub fn reduce_right<A>(&self, init: A, mut f: impl FnMut(A, &T, usize) -> A) -> A {
        let mut acc = init;
        for index in (0..self.len()).rev() {
            if let Some(item) = self.item_at(index) {
                acc = f(acc, &item, index);
            }
        }
        acc
    }

    // =========================================================================
    // ITERATORS
    // =========================================================================

    /// Live iterator over indices.
    pub fn keys(&self) -> ListKeys<T> {
        ListKeys {
            cursor: Cursor::new(self),
        }
    }

    /// Live iterator over elements.
    pub fn values(&self) -> ListValues<T> {
        ListValues {
            cursor: Cursor::new(self),
        }
    }

    /// Live iterator over `(index, element)` pairs.
    pub fn entries(&self) -> ListEntries<T> {
        ListEntries {
            cursor: Cursor::new(self),
        }
    }

    // =========================================================================
    // STRUCTURAL OPERATIONS
    // =========================================================================

    /// Same length and pairwise-equal elements under the equality rule.
    pub fn equals(&self, other: &ObservableList<T>) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let predicate = self.pick_equals(other);
        let items = self.inner.items.borrow();
        let other_items = other.inner.items.borrow();
        items.len() == other_items.len()
            && items
                .iter()
                .zip(other_items.iter())
                .rev()
                .all(|(a, b)| items_equal(a, b, predicate.as_ref()))
    }

    /// Independent copy with the same configuration.
    ///
    /// A deep copy clones every element exposing `clone_deep`; the rest are
    /// copied by reference.
    pub fn duplicate(&self, deep: bool) -> ObservableList<T> {
        let items: Vec<T> = self
            .inner
            .items
            .borrow()
            .iter()
            .map(|item| clone_item(item, deep))
            .collect();

        Self {
            inner: Rc::new(ListInner {
                emitter: EventEmitter::new(),
                items: RefCell::new(items),
                config: self.inner.config.clone(),
            }),
        }
    }

    /// Reconcile this list with `other`, emitting at most one change event.
    ///
    /// Slots are compared from the end. Unequal elements that share a merge
    /// kind absorb each other in place; any other mismatch is overwritten.
    /// A sorted list converges to `other`'s elements in its own order.
    ///
    /// Every nested merge is checked with
    /// [`check_absorb_from`](Self::check_absorb_from) first, so a merge that
    /// is known to fail leaves this list untouched. If a nested merge still
    /// fails midway, the steps already applied are reported with one change
    /// event before the error is returned.
    pub fn absorb_from(&self, other: &ObservableList<T>) -> Result<bool> {
        if self.ptr_eq(other) {
            return Ok(false);
        }

        let target = self.absorb_target(other);
        let predicate = self.pick_equals(other);
        self.check_merges(&target, predicate.as_ref())?;

        let (shared_len, mut changed) = {
            let mut items = self.inner.items.borrow_mut();
            let len = items.len();
            if len > target.len() {
                items.truncate(target.len());
            } else if len < target.len() {
                items.extend(target[len..].iter().cloned());
            }
            (len.min(target.len()), len != target.len())
        };

        let mut failure = None;
        for index in (0..shared_len).rev() {
            let Some(item) = self.item_at(index) else {
                continue;
            };
            let incoming = &target[index];
            if items_equal(&item, incoming, predicate.as_ref()) {
                continue;
            }

            if can_merge(&item, incoming) {
                match item.absorb_from(incoming) {
                    Ok(merged) => changed |= merged,
                    Err(error) => {
                        failure = Some(error);
                        break;
                    }
                }
            } else {
                if let Some(slot) = self.inner.items.borrow_mut().get_mut(index) {
                    *slot = incoming.clone();
                }
                changed = true;
            }
        }

        if changed {
            tracing::trace!(len = self.len(), "list absorbed");
            self.emit_change();
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(changed),
        }
    }

    /// Check that [`absorb_from`](Self::absorb_from) with `other` would not
    /// fail on a nested merge. Nothing is mutated.
    pub fn check_absorb_from(&self, other: &ObservableList<T>) -> Result<()> {
        if self.ptr_eq(other) {
            return Ok(());
        }
        let target = self.absorb_target(other);
        self.check_merges(&target, self.pick_equals(other).as_ref())
    }

    fn absorb_target(&self, other: &ObservableList<T>) -> Vec<T> {
        match &self.inner.config.item_comparator {
            Some(comparator) => {
                let mut ordered = Vec::with_capacity(other.len());
                for item in other.to_vec() {
                    insert_sorted(&mut ordered, item, comparator);
                }
                ordered
            }
            None => other.to_vec(),
        }
    }

    fn check_merges(&self, target: &[T], predicate: Option<&EqualsFn<T>>) -> Result<()> {
        for (item, incoming) in self.to_vec().iter().zip(target) {
            if !items_equal(item, incoming, predicate) && can_merge(item, incoming) {
                item.check_absorb_from(incoming)?;
            }
        }
        Ok(())
    }

    fn pick_equals(&self, other: &ObservableList<T>) -> Option<EqualsFn<T>> {
        self.inner
            .config
            .item_equals
            .clone()
            .or_else(|| other.inner.config.item_equals.clone())
    }
}

impl<T: Item + fmt::Display> ObservableList<T> {
    pub fn join(&self, separator: &str) -> String {
        self.inner
            .items
            .borrow()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(separator)
    }
}

// =============================================================================
// SORTED INSERTION
// =============================================================================

/// Binary-search placement after every element that compares equal.
fn insert_sorted<T>(items: &mut Vec<T>, item: T, comparator: &CompareFn<T>) {
    let mut low = 0;
    let mut high = items.len();

    while low != high {
        let mid = (low + high) / 2;
        if comparator(&item, &items[mid]) == Ordering::Less {
            high = mid;
        } else {
            low = mid + 1;
        }
    }

    items.insert(low, item);
}

// =============================================================================
// INDEX ARITHMETIC
// =============================================================================

fn resolve_index(index: isize, len: usize, allow_end: bool) -> Result<usize> {
    let out_of_range = || CollectionError::IndexOutOfRange { index, len };

    if index < 0 {
        let back = index.unsigned_abs();
        return len.checked_sub(back).ok_or_else(out_of_range);
    }

    let index = index.unsigned_abs();
    if index < len || (allow_end && index == len) {
        Ok(index)
    } else {
        Err(out_of_range())
    }
}

fn checked_range_end(index: usize, count: usize, len: usize) -> Result<usize> {
    match index.checked_add(count) {
        Some(end) if end <= len => Ok(end),
        _ => Err(CollectionError::RangeOutOfBounds { index, count, len }),
    }
}

// =============================================================================
// ITERATORS
// =============================================================================

struct Cursor<T: Item> {
    list: ObservableList<T>,
    index: usize,
    done: bool,
}

impl<T: Item> Cursor<T> {
    fn new(list: &ObservableList<T>) -> Self {
        Self {
            list: list.clone(),
            index: 0,
            done: false,
        }
    }

    fn advance(&mut self) -> Option<(usize, T)> {
        if self.done {
            return None;
        }
        match self.list.item_at(self.index) {
            Some(item) => {
                self.index += 1;
                Some((self.index - 1, item))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

/// Iterator returned by [`ObservableList::keys`].
pub struct ListKeys<T: Item> {
    cursor: Cursor<T>,
}

impl<T: Item> Iterator for ListKeys<T> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        self.cursor.advance().map(|(index, _)| index)
    }
}

impl<T: Item> FusedIterator for ListKeys<T> {}

/// Iterator returned by [`ObservableList::values`].
pub struct ListValues<T: Item> {
    cursor: Cursor<T>,
}

impl<T: Item> Iterator for ListValues<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.cursor.advance().map(|(_, item)| item)
    }
}

impl<T: Item> FusedIterator for ListValues<T> {}

/// Iterator returned by [`ObservableList::entries`].
pub struct ListEntries<T: Item> {
    cursor: Cursor<T>,
}

impl<T: Item> Iterator for ListEntries<T> {
    type Item = (usize, T);

    fn next(&mut self) -> Option<(usize, T)> {
        self.cursor.advance()
    }
}

impl<T: Item> FusedIterator for ListEntries<T> {}

impl<T: Item> IntoIterator for &ObservableList<T> {
    type Item = T;
    type IntoIter = ListValues<T>;

    fn into_iter(self) -> ListValues<T> {
        self.values()
    }
}

// =============================================================================
// TRAIT IMPLS
// =============================================================================

impl<T: Item> Clone for ObservableList<T> {
    /// Another handle to the same list.
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Item> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Item> FromIterator<T> for ObservableList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: Item> From<Vec<T>> for ObservableList<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T: Item> Item for ObservableList<T> {
    fn same_value(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }

    fn is_primitive(&self) -> bool {
        false
    }

    fn equals(&self, other: &Self) -> Option<bool> {
        Some(ObservableList::equals(self, other))
    }

    fn clone_deep(&self) -> Option<Self> {
        Some(self.duplicate(true))
    }

    fn merge_kind(&self) -> Option<MergeKind> {
        Some(LIST_MERGE_KIND)
    }

    fn absorb_from(&self, other: &Self) -> Result<bool> {
        ObservableList::absorb_from(self, other)
    }

    fn check_absorb_from(&self, other: &Self) -> Result<()> {
        ObservableList::check_absorb_from(self, other)
    }
}

impl<T: Item + ToData> ToData for ObservableList<T> {
    fn to_data(&self) -> Value {
        Value::Array(self.inner.items.borrow().iter().map(ToData::to_data).collect())
    }
}

impl<T: Item + fmt::Display> fmt::Display for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join(","))
    }
}

impl<T: Item + fmt::Debug> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList")
            .field("items", &self.inner.items.borrow())
            .field("sorted", &self.is_sorted())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
