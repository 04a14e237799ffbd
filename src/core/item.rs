// ============================================================================
// spark-observables - Item Capabilities
// The optional behaviours a container element may expose
// ============================================================================
//
// Containers never inspect element types directly. They ask an element
// through this trait whether it supports structural equality, deep cloning
// or in-place merging, and fall back to identity / shallow copy / overwrite
// when the answer is "no".
// ============================================================================

use std::rc::Rc;

use super::equality::{same_value_f32, same_value_f64};
use super::error::{CollectionError, Result};
use super::types::MergeKind;

// =============================================================================
// ITEM TRAIT
// =============================================================================

/// An element storable in an `ObservableList` or as an `ObservableMap` value.
///
/// `Clone` must be a cheap reference copy: it is what a shallow container
/// copy does with each element.
///
/// # Example
///
/// ```
/// use spark_observables::{Item, ObservableList};
///
/// #[derive(Clone, Debug)]
/// struct Tag(&'static str);
///
/// impl Item for Tag {
///     fn same_value(&self, other: &Self) -> bool {
///         std::ptr::eq(self.0, other.0)
///     }
///
///     fn is_primitive(&self) -> bool {
///         false
///     }
///
///     fn equals(&self, other: &Self) -> Option<bool> {
///         Some(self.0 == other.0)
///     }
/// }
///
/// let a = ObservableList::from_vec(vec![Tag("x")]);
/// let b = ObservableList::from_vec(vec![Tag("x")]);
/// assert!(a.equals(&b));
/// ```
pub trait Item: Clone + 'static {
    /// Identity check used for no-op detection and searching.
    fn same_value(&self, other: &Self) -> bool;

    /// Primitive values never take part in structural equality or merging.
    fn is_primitive(&self) -> bool {
        true
    }

    /// Structural equality capability. `None` means the capability is absent.
    fn equals(&self, _other: &Self) -> Option<bool> {
        None
    }

    /// Deep-clone capability. `None` means "copy the reference".
    fn clone_deep(&self) -> Option<Self> {
        None
    }

    /// Merge capability tag. `None` means the value is replaced wholesale.
    fn merge_kind(&self) -> Option<MergeKind> {
        None
    }

    /// Merge `other` into `self` in place, returning whether anything changed.
    fn absorb_from(&self, _other: &Self) -> Result<bool> {
        Err(CollectionError::KindMismatch {
            expected: "mergeable value",
            found: std::any::type_name::<Self>(),
        })
    }

    /// Report whether [`absorb_from`](Item::absorb_from) would fail, without
    /// mutating anything.
    ///
    /// Containers run this over every pending merge before touching their
    /// own storage. Override it together with `absorb_from`.
    fn check_absorb_from(&self, _other: &Self) -> Result<()> {
        Err(CollectionError::KindMismatch {
            expected: "mergeable value",
            found: std::any::type_name::<Self>(),
        })
    }
}

// =============================================================================
// PRIMITIVE IMPLS
// =============================================================================

macro_rules! impl_primitive_item {
    ($($t:ty),* $(,)?) => {
        $(
            impl Item for $t {
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_primitive_item!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char, (),
    String, &'static str,
);

impl Item for f64 {
    fn same_value(&self, other: &Self) -> bool {
        same_value_f64(*self, *other)
    }
}

impl Item for f32 {
    fn same_value(&self, other: &Self) -> bool {
        same_value_f32(*self, *other)
    }
}

// =============================================================================
// SHARED REFERENCES
// =============================================================================

/// `Rc<T>` is an object reference: identity is the pointer, structural
/// equality is `T: PartialEq`.
impl<T: PartialEq + 'static> Item for Rc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }

    fn is_primitive(&self) -> bool {
        false
    }

    fn equals(&self, other: &Self) -> Option<bool> {
        Some(**self == **other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_have_no_capabilities() {
        assert!(5i32.same_value(&5));
        assert!(5i32.is_primitive());
        assert_eq!(5i32.equals(&5), None);
        assert_eq!(5i32.clone_deep(), None);
        assert_eq!(5i32.merge_kind(), None);
        assert!(matches!(
            5i32.absorb_from(&6),
            Err(CollectionError::KindMismatch { .. })
        ));
    }

    #[test]
    fn floats_use_same_value_semantics() {
        assert!(f64::NAN.same_value(&f64::NAN));
        assert!(!0.0f64.same_value(&-0.0));
        assert!(f32::NAN.same_value(&f32::NAN));
    }

    #[test]
    fn rc_identity_differs_from_structure() {
        let a = Rc::new(vec![1, 2]);
        let b = Rc::new(vec![1, 2]);
        assert!(!a.same_value(&b));
        assert!(a.same_value(&a.clone()));
        assert_eq!(a.equals(&b), Some(true));
        assert!(!a.is_primitive());
    }
}
