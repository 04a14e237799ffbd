// ============================================================================
// spark-observables - Ergonomic Macros
// ============================================================================

/// Helper macro to clone variables into a move closure.
///
/// This reduces the boilerplate of manually cloning `Rc` handles or
/// containers before moving them into a listener.
///
/// # Usage
///
/// ```rust
/// use spark_observables::{cloned, Listener, ObservableList};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let list = ObservableList::from_vec(vec![1]);
/// let seen = Rc::new(Cell::new(0));
///
/// list.on_change(Listener::from_fn(cloned!(list, seen => move |_| seen.set(list.len()))), None);
/// list.add(2);
/// assert_eq!(seen.get(), 2);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Build a [`Listener`](crate::Listener) with automatic variable capturing.
///
/// Wraps `Listener::from_fn(cloned!(... => move |event| ...))`.
///
/// # Usage
///
/// ```rust
/// use spark_observables::{listener, ObservableMap};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let map: ObservableMap<&str, i32> = ObservableMap::new();
/// let types = Rc::new(RefCell::new(Vec::new()));
///
/// map.on_change(listener!(types => |event| {
///     types.borrow_mut().push(event.event_type().to_string());
/// }), None);
///
/// map.set("a", 1);
/// assert_eq!(*types.borrow(), vec!["change"]);
/// ```
#[macro_export]
macro_rules! listener {
    // Case 1: With dependencies
    ($($deps:ident),+ => |$event:pat_param| $body:expr) => {
        $crate::Listener::from_fn($crate::cloned!($($deps),+ => move |$event: &$crate::Event| $body))
    };
    // Case 2: No dependencies
    (|$event:pat_param| $body:expr) => {
        $crate::Listener::from_fn(move |$event: &$crate::Event| $body)
    };
}

#[cfg(test)]
mod tests {
    use crate::ObservableList;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn listener_macro_captures_clones() {
        let list = ObservableList::from_vec(vec![1, 2]);
        let total = Rc::new(Cell::new(0));

        list.on_change(
            listener!(list, total => |_| total.set(list.reduce(0, |acc, x, _| acc + x))),
            None,
        );
        list.add(3);

        assert_eq!(total.get(), 6);
        // `list` and `total` are still usable here
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn listener_macro_without_dependencies() {
        let list = ObservableList::from_vec(vec!['a']);
        let listener = listener!(|event| assert_eq!(event.event_type(), "change"));
        list.on_change(listener.clone(), None);
        list.add('b');

        assert_eq!(list.emitter().listener_count("change"), 1);
        list.off_change(&listener, None);
        assert!(!list.emitter().has_listeners("change"));
    }
}
