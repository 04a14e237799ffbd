// ============================================================================
// spark-observables - Equality Rules
// Same-value checks and the element equality/merge rule shared by containers
// ============================================================================

use std::cmp::Ordering;

use super::item::Item;
use super::types::EqualsFn;

// =============================================================================
// SAME VALUE
// =============================================================================

/// Same-value check for f64: NaN matches NaN, +0 and -0 are distinct.
///
/// # Example
/// ```
/// use spark_observables::core::equality::same_value_f64;
///
/// assert!(same_value_f64(f64::NAN, f64::NAN));
/// assert!(!same_value_f64(0.0, -0.0));
/// assert!(same_value_f64(1.5, 1.5));
/// ```
pub fn same_value_f64(a: f64, b: f64) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a.to_bits() == b.to_bits()
}

/// Same-value check for f32.
pub fn same_value_f32(a: f32, b: f32) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a.to_bits() == b.to_bits()
}

// =============================================================================
// ELEMENT RULES
// =============================================================================

/// Element equality as used by `equals` and `absorb_from`.
///
/// A configured predicate wins. Otherwise identity, then the element's own
/// structural `equals` capability when it is not a primitive.
pub fn items_equal<T: Item>(a: &T, b: &T, predicate: Option<&EqualsFn<T>>) -> bool {
    match predicate {
        Some(eq) => eq(a, b),
        None => a.same_value(b) || (!a.is_primitive() && a.equals(b).unwrap_or(false)),
    }
}

/// Whether `a` can absorb `b` in place instead of being replaced.
pub fn can_merge<T: Item>(a: &T, b: &T) -> bool {
    if a.is_primitive() || b.is_primitive() {
        return false;
    }
    matches!((a.merge_kind(), b.merge_kind()), (Some(x), Some(y)) if x == y)
}

/// Copy an element for a container clone.
pub fn clone_item<T: Item>(item: &T, deep: bool) -> T {
    if deep {
        if let Some(copy) = item.clone_deep() {
            return copy;
        }
    }
    item.clone()
}

/// Comparator used when a list is sorted without an explicit comparator.
pub fn default_comparator<T: PartialOrd>(a: &T, b: &T) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}
