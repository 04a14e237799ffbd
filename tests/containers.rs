use serde_json::json;
use spark_observables::{
    listener, CollectionError, Listener, ListOptions, ListenerContext, MapChange, MapChangeKind,
    MapOptions, ObservableList, ObservableMap, ToData,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn list_changes<T: spark_observables::Item>(list: &ObservableList<T>) -> Rc<Cell<u32>> {
    let count = Rc::new(Cell::new(0));
    list.on_change(listener!(count => |_| count.set(count.get() + 1)), None);
    count
}

// =============================================================================
// LIST
// =============================================================================

#[test]
fn every_effective_list_call_emits_once() {
    let list = ObservableList::from_vec(vec![1, 2, 3]);
    let changes = list_changes(&list);

    list.set(0, 1).unwrap(); // no-op
    list.set(0, 10).unwrap();
    list.add_range([4, 5, 6]);
    list.remove_all(&7, None).unwrap(); // no-op
    list.remove_range(0, Some(2)).unwrap();
    list.clear();
    list.clear(); // no-op

    assert_eq!(changes.get(), 4);
}

#[test]
fn sorted_list_places_equal_items_last() {
    #[derive(Debug, PartialEq)]
    struct Task {
        priority: u8,
        name: &'static str,
    }

    let queue = ObservableList::with_options(
        Vec::new(),
        ListOptions::new()
            .item_comparator(|a: &Rc<Task>, b: &Rc<Task>| a.priority.cmp(&b.priority)),
    );

    for (priority, name) in [(2, "write"), (1, "plan"), (2, "review"), (3, "ship")] {
        queue.add(Rc::new(Task { priority, name }));
    }

    let names: Vec<_> = queue.values().map(|task| task.name).collect();
    assert_eq!(names, vec!["plan", "write", "review", "ship"]);
}

#[test]
fn sorted_list_guards_order_and_stays_unchanged() {
    let list = ObservableList::with_options(vec![3, 1, 2], ListOptions::new().sorted());
    let changes = list_changes(&list);

    let attempts = [
        list.set(0, 9),
        list.insert(0, 9),
        list.insert_range(0, [9]),
        list.replace(&1, 9, None).map(|_| ()),
        list.replace_all(&1, 9, None).map(|_| ()),
    ];

    for attempt in attempts {
        assert!(matches!(attempt, Err(CollectionError::SortedList { .. })));
    }
    assert_eq!(list.to_vec(), vec![1, 2, 3]);
    assert_eq!(changes.get(), 0);

    // Removal is order-preserving and stays allowed
    list.remove(&2, None).unwrap();
    assert_eq!(list.to_vec(), vec![1, 3]);
}

#[test]
fn range_errors_leave_list_untouched() {
    let list = ObservableList::from_vec(vec!['a', 'b']);
    let changes = list_changes(&list);

    assert!(matches!(
        list.insert(5, 'z'),
        Err(CollectionError::IndexOutOfRange { index: 5, len: 2 })
    ));
    assert!(matches!(
        list.remove_range(1, Some(2)),
        Err(CollectionError::RangeOutOfBounds { .. })
    ));
    assert!(matches!(
        list.set_length(3),
        Err(CollectionError::LengthIncrease { .. })
    ));

    assert_eq!(list.to_vec(), vec!['a', 'b']);
    assert_eq!(changes.get(), 0);
}

#[test]
fn list_from_list_copies_elements() {
    let original = ObservableList::from_vec(vec![3, 1, 2]);
    let sorted = ObservableList::from_list(&original, ListOptions::new().sorted());

    assert_eq!(sorted.to_vec(), vec![1, 2, 3]);
    sorted.add(0);
    assert_eq!(original.to_vec(), vec![3, 1, 2]);
}

#[test]
fn list_clone_round_trip() {
    let original: ObservableList<Rc<String>> =
        ["x", "y"].into_iter().map(|s| Rc::new(s.to_string())).collect();
    let copy = original.duplicate(false);

    assert!(copy.equals(&original));
    // Shallow copies share element references
    assert!(Rc::ptr_eq(&copy.get(0).unwrap(), &original.get(0).unwrap()));

    copy.remove_at(0).unwrap();
    assert_eq!(original.len(), 2);
    assert!(!copy.equals(&original));
}

#[test]
fn list_to_data_is_positional() {
    let list = ObservableList::from_vec(vec![1.5, f64::NAN]);
    assert_eq!(list.to_data(), json!([1.5, null]));
    assert_eq!(ObservableList::<i32>::new().to_data(), json!([]));
}

// =============================================================================
// MAP
// =============================================================================

#[test]
fn map_payloads_describe_each_mutation() {
    let map: ObservableMap<u32, String> = ObservableMap::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    map.on_change(listener!(log => |event| {
        let change = event.payload::<MapChange<u32, String>>().unwrap();
        log.borrow_mut().push((
            change.kind,
            change.key,
            change.prev_value.clone(),
            change.value.clone(),
        ));
    }), None);

    map.set(1, "one".to_string());
    map.set(1, "uno".to_string());
    map.delete(&1);
    map.set(2, "two".to_string());
    map.clear();

    assert_eq!(
        *log.borrow(),
        vec![
            (MapChangeKind::Add, Some(1), None, Some("one".to_string())),
            (
                MapChangeKind::Update,
                Some(1),
                Some("one".to_string()),
                Some("uno".to_string())
            ),
            (MapChangeKind::Delete, Some(1), None, Some("uno".to_string())),
            (MapChangeKind::Add, Some(2), None, Some("two".to_string())),
            (MapChangeKind::Clear, None, None, None),
        ]
    );
}

#[test]
fn map_set_with_identical_value_is_silent() {
    let shared = Rc::new(vec![1, 2]);
    let map = ObservableMap::from_entries([("k", shared.clone())]);
    let changes = Rc::new(Cell::new(0));
    map.on_change(listener!(changes => |_| changes.set(changes.get() + 1)), None);

    map.set("k", shared);
    assert_eq!(changes.get(), 0);

    // Structurally equal but a different reference
    map.set("k", Rc::new(vec![1, 2]));
    assert_eq!(changes.get(), 1);
}

#[test]
fn map_from_map_keeps_order_and_is_independent() {
    let original = ObservableMap::from_entries([("b", 2), ("a", 1)]);
    let copy = ObservableMap::from_map(
        &original,
        MapOptions::new().value_equals(|x: &i32, y: &i32| x == y),
    );

    assert_eq!(copy.keys().collect::<Vec<_>>(), vec!["b", "a"]);
    assert!(copy.value_equals().is_some());

    copy.delete(&"b");
    assert!(original.has(&"b"));
}

#[test]
fn map_to_data_is_keyed() {
    let map: ObservableMap<String, bool> = [("on".to_string(), true), ("off".to_string(), false)]
        .into_iter()
        .collect();
    assert_eq!(map.to_data(), json!({ "on": true, "off": false }));
}

#[test]
fn listeners_observe_state_after_the_mutation() {
    let list = ObservableList::from_vec(vec![1]);
    let observed = Rc::new(RefCell::new(Vec::new()));
    list.on_change(
        listener!(list, observed => |_| observed.borrow_mut().push(list.to_vec())),
        None,
    );

    list.add(2);
    list.remove_at(0).unwrap();

    assert_eq!(*observed.borrow(), vec![vec![1, 2], vec![2]]);

    // Listeners can be removed by handle
    let quiet = Listener::from_fn(|_| {});
    list.on_change(quiet.clone(), None);
    assert_eq!(list.emitter().listener_count("change"), 2);
    list.off_change(&quiet, None);
    assert_eq!(list.emitter().listener_count("change"), 1);
}

#[test]
fn change_listeners_are_keyed_by_context() {
    let list = ObservableList::from_vec(vec![1]);
    let calls = Rc::new(Cell::new(0));
    let counter = listener!(calls => |_| calls.set(calls.get() + 1));
    let panel = ListenerContext::new("panel");
    let sidebar = ListenerContext::new("sidebar");

    list.on_change(counter.clone(), Some(panel.clone()));
    list.on_change(counter.clone(), Some(sidebar.clone()));
    list.add(2);
    assert_eq!(calls.get(), 2);

    // Wrong context or no context leaves both registrations alone
    list.off_change(&counter, None);
    list.off_change(&counter, Some(&ListenerContext::new("panel")));
    assert_eq!(list.emitter().listener_count("change"), 2);

    list.off_change(&counter, Some(&panel));
    list.add(3);
    assert_eq!(calls.get(), 3);

    let map: ObservableMap<&str, i32> = ObservableMap::new();
    map.on_change(counter.clone(), Some(sidebar.clone()));
    map.off_change(&counter, Some(&panel));
    map.set("a", 1);
    assert_eq!(calls.get(), 4);
    map.off_change(&counter, Some(&sidebar));
    map.set("a", 2);
    assert_eq!(calls.get(), 4);
}
