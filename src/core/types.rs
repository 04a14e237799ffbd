// ============================================================================
// spark-observables - Type Definitions
// Predicates, comparators, merge tags and the plain-data conversion trait
// ============================================================================

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

// =============================================================================
// PREDICATES
// =============================================================================

/// Pluggable equality predicate used by `equals` and `absorb_from`.
pub type EqualsFn<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// Comparator that puts a list into sorted mode.
pub type CompareFn<T> = Rc<dyn Fn(&T, &T) -> Ordering>;

// =============================================================================
// MERGE KIND
// =============================================================================

/// Stable tag identifying a merge capability.
///
/// Two values are only merged in place when both report the same kind, so
/// unrelated types that both know how to absorb are never mixed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergeKind(&'static str);

impl MergeKind {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for MergeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MergeKind({})", self.0)
    }
}

// =============================================================================
// TO DATA
// =============================================================================

/// Conversion to a plain JSON-like structure.
///
/// Containers call this on each element; elements that are already plain
/// values pass through as the matching `Value`.
pub trait ToData {
    fn to_data(&self) -> Value;
}

macro_rules! impl_to_data_from {
    ($($t:ty),* $(,)?) => {
        $(
            impl ToData for $t {
                fn to_data(&self) -> Value {
                    Value::from(*self)
                }
            }
        )*
    };
}

impl_to_data_from!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, bool);

impl ToData for f32 {
    fn to_data(&self) -> Value {
        f64::from(*self).to_data()
    }
}

impl ToData for f64 {
    fn to_data(&self) -> Value {
        // JSON has no NaN or infinities
        serde_json::Number::from_f64(*self).map_or(Value::Null, Value::Number)
    }
}

impl ToData for char {
    fn to_data(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl ToData for String {
    fn to_data(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToData for &'static str {
    fn to_data(&self) -> Value {
        Value::String((*self).to_string())
    }
}

impl ToData for () {
    fn to_data(&self) -> Value {
        Value::Null
    }
}

impl<T: ToData> ToData for Option<T> {
    fn to_data(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToData::to_data)
    }
}

impl<T: ToData + ?Sized> ToData for Rc<T> {
    fn to_data(&self) -> Value {
        (**self).to_data()
    }
}

impl<T: ToData> ToData for Vec<T> {
    fn to_data(&self) -> Value {
        Value::Array(self.iter().map(ToData::to_data).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitives_pass_through() {
        assert_eq!(42i32.to_data(), json!(42));
        assert_eq!(true.to_data(), json!(true));
        assert_eq!("hi".to_data(), json!("hi"));
        assert_eq!(String::from("x").to_data(), json!("x"));
        assert_eq!(1.5f64.to_data(), json!(1.5));
        assert_eq!(().to_data(), Value::Null);
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(f64::NAN.to_data(), Value::Null);
        assert_eq!(f32::INFINITY.to_data(), Value::Null);
    }

    #[test]
    fn wrappers_recurse() {
        assert_eq!(Some(3u8).to_data(), json!(3));
        assert_eq!(None::<u8>.to_data(), Value::Null);
        assert_eq!(Rc::new(7i64).to_data(), json!(7));
        assert_eq!(vec![1, 2].to_data(), json!([1, 2]));
    }

    #[test]
    fn merge_kind_debug_shows_name() {
        assert_eq!(format!("{:?}", MergeKind::new("Tree")), "MergeKind(Tree)");
    }
}
