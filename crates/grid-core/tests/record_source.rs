//! Record sources kept in step with their backing lists.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{Quote, QuoteFactory, quotes, record_events};
use grid_core::{
    BadnessList, CoreError, ListChange, ListLocker, ObservableList, RecordKey, RecordSource,
    RecordSourceDefinition, RecordSourceEvent, Signal, SubscriptionId,
};
use grid_model::{
    Badness, FieldSourceDefinitionCache, FieldSourceTypeId, SecurityField, SymbolField,
    ValueContent,
};

const QUOTE_SOURCES: [FieldSourceTypeId; 2] =
    [FieldSourceTypeId::Symbol, FieldSourceTypeId::Security];

struct Harness {
    factory: Rc<QuoteFactory>,
    source: RecordSource<Quote>,
}

fn harness(name: &str) -> Harness {
    let factory = Rc::new(QuoteFactory::default());
    let source = RecordSource::new(
        name,
        Rc::new(FieldSourceDefinitionCache::new()),
        Rc::clone(&factory) as Rc<dyn grid_core::ValueSourceFactory<Quote>>,
    );
    Harness { factory, source }
}

fn definition_for(list: &Rc<ObservableList<Quote>>) -> RecordSourceDefinition<Quote> {
    RecordSourceDefinition::new(QUOTE_SOURCES.to_vec())
        .with_list(Rc::clone(list) as Rc<dyn BadnessList<Quote>>)
}

fn keys(source: &RecordSource<Quote>) -> Vec<String> {
    (0..source.count())
        .map(|index| source.record_key(index).to_string())
        .collect()
}

#[test]
fn open_builds_one_record_per_element() {
    let Harness { factory, source } = harness("grid");
    let items = quotes(&["BHP", "CBA", "WES"]);
    let list = Rc::new(ObservableList::with_items(items.clone()));
    let events = record_events(&source);

    source.open(definition_for(&list)).unwrap();

    assert!(source.is_open());
    assert_eq!(keys(&source), vec!["BHP", "CBA", "WES"]);
    assert_eq!(source.fields().len(), 6 + 15);
    assert_eq!(source.values(0).len(), 21);
    assert_eq!(source.values(1)[0].display(), "CBA");
    assert_eq!(source.values(1)[6].display(), "11");
    assert_eq!(factory.created.get(), 6);
    assert!(items.iter().all(|quote| quote.subscribers() == (1, 1)));
    assert_eq!(list.lockers(), vec![ListLocker::new("grid")]);
    assert_eq!(
        *events.borrow(),
        vec![
            RecordSourceEvent::FieldsChanged,
            RecordSourceEvent::AllRecordsChanged,
            RecordSourceEvent::BadnessChanged(Badness::Good),
        ]
    );
}

#[test]
fn insert_builds_only_the_new_records() {
    let Harness { factory, source } = harness("grid");
    let originals = quotes(&["BHP", "CBA", "WES"]);
    let list = Rc::new(ObservableList::with_items(originals.clone()));
    source.open(definition_for(&list)).unwrap();
    let events = record_events(&source);
    let created_before = factory.created.get();

    let inserted = quotes(&["NAB", "ANZ"]);
    list.insert(1, inserted.clone());

    assert_eq!(source.count(), 5);
    assert_eq!(keys(&source), vec!["BHP", "NAB", "ANZ", "CBA", "WES"]);
    for (index, quote) in [(0, &originals[0]), (3, &originals[1]), (4, &originals[2])] {
        assert!(Rc::ptr_eq(&source.item(index), quote));
        assert_eq!(quote.subscribers(), (1, 1), "original re-subscribed");
    }
    assert!(Rc::ptr_eq(&source.item(1), &inserted[0]));
    assert!(Rc::ptr_eq(&source.item(2), &inserted[1]));
    assert_eq!(factory.created.get() - created_before, 4);
    assert_eq!(
        *events.borrow(),
        vec![RecordSourceEvent::RecordsInserted { index: 1, count: 2 }]
    );
}

#[test]
fn value_changes_follow_rows_across_structural_changes() {
    let Harness { source, .. } = harness("grid");
    let items = quotes(&["BHP", "CBA", "WES"]);
    let list = Rc::new(ObservableList::with_items(items.clone()));
    source.open(definition_for(&list)).unwrap();
    let events = record_events(&source);
    let tick = |price: f64| {
        items[1]
            .security
            .set(SecurityField::Last, ValueContent::Number(Some(price)));
    };

    tick(1.0);
    list.insert(0, quotes(&["ANZ", "NAB"]));
    tick(2.0);
    list.remove(0, 1);
    tick(3.0);
    list.move_range(0, 2, 2);
    tick(4.0);

    let indices: Vec<usize> = events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            RecordSourceEvent::RecordValuesChanged { index, key, .. } => {
                assert_eq!(key, &RecordKey::new("CBA"));
                Some(*index)
            }
            _ => None,
        })
        .collect();
    assert_eq!(indices, vec![1, 3, 2, 0]);
    assert_eq!(source.index_of(&RecordKey::new("CBA")), Some(0));
    assert_eq!(source.index_of(&RecordKey::new("ANZ")), None);
}

#[test]
fn remove_releases_the_removed_records() {
    let Harness { source, .. } = harness("grid");
    let items = quotes(&["BHP", "CBA", "WES", "NAB"]);
    let list = Rc::new(ObservableList::with_items(items.clone()));
    source.open(definition_for(&list)).unwrap();
    let events = record_events(&source);

    list.remove(1, 2);

    assert_eq!(keys(&source), vec!["BHP", "NAB"]);
    assert_eq!(items[1].subscribers(), (0, 0));
    assert_eq!(items[2].subscribers(), (0, 0));
    assert_eq!(items[3].subscribers(), (1, 1));
    assert_eq!(
        *events.borrow(),
        vec![RecordSourceEvent::RecordsRemoved { index: 1, count: 2 }]
    );
}

#[test]
fn move_keeps_records_and_subscriptions() {
    let Harness { factory, source } = harness("grid");
    let items = quotes(&["BHP", "CBA", "WES", "NAB"]);
    let list = Rc::new(ObservableList::with_items(items.clone()));
    source.open(definition_for(&list)).unwrap();
    let created_before = factory.created.get();
    let events = record_events(&source);

    list.move_range(0, 2, 2);

    assert_eq!(keys(&source), vec!["WES", "NAB", "BHP", "CBA"]);
    assert_eq!(factory.created.get(), created_before);
    assert!(items.iter().all(|quote| quote.subscribers() == (1, 1)));

    // Changes are reported at the record's new position.
    items[0]
        .security
        .set(SecurityField::Bid, ValueContent::Number(Some(44.0)));
    let events = events.borrow();
    assert_eq!(
        events[0],
        RecordSourceEvent::RecordsMoved {
            from: 0,
            to: 2,
            count: 2
        }
    );
    match &events[1] {
        RecordSourceEvent::RecordValuesChanged {
            index,
            key,
            changes,
        } => {
            assert_eq!(*index, 2);
            assert_eq!(key, &RecordKey::new("BHP"));
            assert_eq!(changes.len(), 1);
            // Bid is field 5 of the security source, after 6 symbol fields.
            assert_eq!(changes[0].field_index, 6 + 5);
        }
        other => panic!("expected value change, got {other:?}"),
    }
}

#[test]
fn replace_rebuilds_only_changed_items() {
    let Harness { factory, source } = harness("grid");
    let items = quotes(&["BHP", "CBA"]);
    let list = Rc::new(ObservableList::with_items(items.clone()));
    source.open(definition_for(&list)).unwrap();
    let created_before = factory.created.get();

    let replacement = Quote::new("WES", 50.0);
    list.replace(0, vec![Rc::clone(&replacement), Rc::clone(&items[1])]);

    assert_eq!(keys(&source), vec!["WES", "CBA"]);
    assert_eq!(factory.created.get() - created_before, 2);
    assert_eq!(items[0].subscribers(), (0, 0));
    assert_eq!(items[1].subscribers(), (1, 1));
    assert_eq!(replacement.subscribers(), (1, 1));
}

#[test]
fn clear_releases_every_record() {
    let Harness { source, .. } = harness("grid");
    let items = quotes(&["BHP", "CBA"]);
    let list = Rc::new(ObservableList::with_items(items.clone()));
    source.open(definition_for(&list)).unwrap();
    let events = record_events(&source);

    list.clear();

    assert_eq!(source.count(), 0);
    assert!(items.iter().all(|quote| quote.subscribers() == (0, 0)));
    assert_eq!(*events.borrow(), vec![RecordSourceEvent::AllRecordsChanged]);
}

#[test]
fn badness_is_mirrored_in_order() {
    let Harness { source, .. } = harness("grid");
    let list = Rc::new(ObservableList::<Quote>::new());
    list.set_badness(Badness::loading("waiting for scan"));
    source.open(definition_for(&list)).unwrap();
    assert!(!source.badness().is_usable());
    let events = record_events(&source);

    list.set_badness(Badness::suspect("feed delayed"));
    list.set_badness(Badness::Good);

    assert!(source.badness().is_good());
    assert_eq!(
        *events.borrow(),
        vec![
            RecordSourceEvent::BadnessChanged(Badness::suspect("feed delayed")),
            RecordSourceEvent::BadnessChanged(Badness::Good),
        ]
    );
}

#[test]
fn close_releases_lock_and_subscriptions() {
    let Harness { source, .. } = harness("grid");
    let items = quotes(&["BHP", "CBA"]);
    let list = Rc::new(ObservableList::with_items(items.clone()));
    source.open(definition_for(&list)).unwrap();
    let events = record_events(&source);

    source.close();
    source.close();

    assert!(!source.is_open());
    assert_eq!(source.count(), 0);
    assert!(list.lockers().is_empty());
    assert_eq!(list.list_subscriber_count(), 0);
    assert_eq!(list.badness_subscriber_count(), 0);
    assert!(items.iter().all(|quote| quote.subscribers() == (0, 0)));
    assert!(events.borrow().is_empty());
    assert!(matches!(source.badness(), Badness::Loading { .. }));
}

#[test]
fn reopen_on_another_list_leaves_no_stale_callbacks() {
    let Harness { source, .. } = harness("grid");
    let first = quotes(&["BHP", "CBA"]);
    let first_list = Rc::new(ObservableList::with_items(first.clone()));
    source.open(definition_for(&first_list)).unwrap();

    let second = quotes(&["WES", "NAB", "ANZ"]);
    let second_list = Rc::new(ObservableList::with_items(second.clone()));
    source.reopen(definition_for(&second_list)).unwrap();
    let events = record_events(&source);

    first[0]
        .security
        .set(SecurityField::Last, ValueContent::Number(Some(1.0)));
    first_list.push(Quote::new("XRO", 1.0));
    first_list.set_badness(Badness::error("gone"));

    assert!(events.borrow().is_empty());
    assert!(first_list.lockers().is_empty());
    assert_eq!(keys(&source), vec!["WES", "NAB", "ANZ"]);
    assert!(second.iter().all(|quote| quote.subscribers() == (1, 1)));
}

#[test]
fn default_list_lives_and_dies_with_the_source() {
    let Harness { source, .. } = harness("grid");
    source
        .open(RecordSourceDefinition::new(QUOTE_SOURCES.to_vec()))
        .unwrap();
    assert!(source.owns_list());
    assert_eq!(source.count(), 0);

    let list = Rc::downgrade(&source.list().unwrap());
    assert!(list.upgrade().is_some());
    source.close();
    assert!(list.upgrade().is_none());
}

#[test]
fn open_twice_is_refused() {
    let Harness { source, .. } = harness("grid");
    source
        .open(RecordSourceDefinition::new(QUOTE_SOURCES.to_vec()))
        .unwrap();
    let again = source.open(RecordSourceDefinition::new(QUOTE_SOURCES.to_vec()));
    assert!(matches!(again, Err(CoreError::AlreadyOpen(name)) if name == "grid"));
}

#[test]
fn exclusive_list_held_elsewhere_is_refused() {
    let list = Rc::new(ObservableList::<Quote>::exclusive());
    let Harness { source: first, .. } = harness("grid-a");
    let Harness { source: second, .. } = harness("grid-b");
    first.open(definition_for(&list)).unwrap();

    let refused = second.open(definition_for(&list));
    assert!(matches!(refused, Err(CoreError::ListLocked { .. })));
    assert!(!second.is_open());
    assert_eq!(list.list_subscriber_count(), 1);

    first.close();
    second.open(definition_for(&list)).unwrap();
    assert_eq!(list.lockers(), vec![ListLocker::new("grid-b")]);
}

#[test]
fn active_field_sources_rebuild_only_affected_sources() {
    let Harness { factory, source } = harness("grid");
    let items = quotes(&["BHP", "CBA"]);
    let list = Rc::new(ObservableList::with_items(items.clone()));
    source
        .open(definition_for(&list).with_active(vec![FieldSourceTypeId::Symbol]))
        .unwrap();
    assert_eq!(source.fields().len(), 6);
    assert!(items.iter().all(|quote| quote.subscribers() == (1, 0)));
    let events = record_events(&source);
    let created_before = factory.created.get();

    source.set_active_field_sources(&QUOTE_SOURCES).unwrap();

    assert_eq!(factory.created.get() - created_before, 2);
    assert!(items.iter().all(|quote| quote.subscribers() == (1, 1)));
    assert_eq!(source.fields().len(), 21);
    assert_eq!(source.values(0).len(), 21);
    assert_eq!(
        *events.borrow(),
        vec![
            RecordSourceEvent::FieldsChanged,
            RecordSourceEvent::AllRecordsChanged
        ]
    );

    source
        .set_active_field_sources(&[FieldSourceTypeId::Security])
        .unwrap();
    assert!(items.iter().all(|quote| quote.subscribers() == (0, 1)));
    assert_eq!(source.values(1)[0].display(), "11");

    // Same set again: nothing to do.
    events.borrow_mut().clear();
    source
        .set_active_field_sources(&[FieldSourceTypeId::Security])
        .unwrap();
    assert!(events.borrow().is_empty());
}

#[test]
fn rebuild_is_discarded_when_closed_while_staging() {
    let factory = Rc::new(QuoteFactory::default());
    let source = Rc::new(RecordSource::new(
        "grid",
        Rc::new(FieldSourceDefinitionCache::new()),
        Rc::clone(&factory) as Rc<dyn grid_core::ValueSourceFactory<Quote>>,
    ));
    let items = quotes(&["BHP", "CBA"]);
    let list = Rc::new(ObservableList::with_items(items.clone()));
    source
        .open(definition_for(&list).with_active(vec![FieldSourceTypeId::Symbol]))
        .unwrap();
    let events = record_events(&source);

    let weak = Rc::downgrade(&source);
    *factory.on_create.borrow_mut() = Some(Box::new(move || {
        if let Some(source) = weak.upgrade() {
            source.close();
        }
    }));

    source.set_active_field_sources(&QUOTE_SOURCES).unwrap();

    assert!(!source.is_open());
    assert!(events.borrow().is_empty());
    assert!(items.iter().all(|quote| quote.subscribers() == (0, 0)));
    assert!(list.lockers().is_empty());
}

#[test]
#[should_panic(expected = "is not allowed")]
fn activating_a_disallowed_source_fails_loudly() {
    let Harness { source, .. } = harness("grid");
    source
        .open(RecordSourceDefinition::new(vec![FieldSourceTypeId::Symbol]))
        .unwrap();
    source
        .set_active_field_sources(&[FieldSourceTypeId::ScanMatch])
        .unwrap();
}

#[test]
#[should_panic(expected = "field source Symbol is active twice")]
fn opening_with_a_repeated_source_fails_loudly() {
    let Harness { source, .. } = harness("grid");
    let list = Rc::new(ObservableList::with_items(quotes(&["BHP"])));
    let _ = source.open(
        RecordSourceDefinition::new(QUOTE_SOURCES.to_vec())
            .with_active(vec![FieldSourceTypeId::Symbol, FieldSourceTypeId::Symbol])
            .with_list(Rc::clone(&list) as Rc<dyn BadnessList<Quote>>),
    );
}

#[test]
#[should_panic(expected = "field source Security is active twice")]
fn activating_a_repeated_source_fails_loudly() {
    let Harness { source, .. } = harness("grid");
    source
        .open(RecordSourceDefinition::new(QUOTE_SOURCES.to_vec()))
        .unwrap();
    source
        .set_active_field_sources(&[
            FieldSourceTypeId::Security,
            FieldSourceTypeId::Symbol,
            FieldSourceTypeId::Security,
        ])
        .unwrap();
}

#[test]
fn set_active_on_closed_source_is_an_error() {
    let Harness { source, .. } = harness("grid");
    assert!(matches!(
        source.set_active_field_sources(&QUOTE_SOURCES),
        Err(CoreError::NotOpen(_))
    ));
}

#[test]
#[should_panic(expected = "duplicate record key BHP")]
fn duplicate_keys_fail_loudly() {
    let Harness { source, .. } = harness("grid");
    let list = Rc::new(ObservableList::with_items(quotes(&["BHP", "BHP"])));
    let _ = source.open(definition_for(&list));
}

/// A list that reports whatever change it is told to, for drift checks.
struct LyingList {
    items: RefCell<Vec<Rc<Quote>>>,
    changed: Signal<ListChange>,
}

impl BadnessList<Quote> for LyingList {
    fn count(&self) -> usize {
        self.items.borrow().len()
    }

    fn get(&self, index: usize) -> Rc<Quote> {
        Rc::clone(&self.items.borrow()[index])
    }

    fn badness(&self) -> Badness {
        Badness::Good
    }

    fn subscribe_list_changed(&self, handler: Box<dyn Fn(&ListChange)>) -> SubscriptionId {
        self.changed.subscribe(handler)
    }

    fn unsubscribe_list_changed(&self, id: SubscriptionId) {
        self.changed.unsubscribe(id);
    }

    fn subscribe_badness_changed(&self, _handler: Box<dyn Fn(&Badness)>) -> SubscriptionId {
        Signal::<Badness>::new().subscribe(|_: &Badness| {})
    }

    fn unsubscribe_badness_changed(&self, _id: SubscriptionId) {}

    fn lock(&self, _locker: &ListLocker) -> grid_core::Result<()> {
        Ok(())
    }

    fn unlock(&self, _locker: &ListLocker) {}

    fn lockers(&self) -> Vec<ListLocker> {
        Vec::new()
    }
}

#[test]
#[should_panic(expected = "out of step with its list")]
fn index_drift_fails_loudly() {
    let Harness { source, .. } = harness("grid");
    let list = Rc::new(LyingList {
        items: RefCell::new(quotes(&["BHP", "CBA"])),
        changed: Signal::new(),
    });
    source
        .open(
            RecordSourceDefinition::new(QUOTE_SOURCES.to_vec())
                .with_list(Rc::clone(&list) as Rc<dyn BadnessList<Quote>>),
        )
        .unwrap();

    // Claims an insert without growing.
    list.changed.notify(&ListChange::Insert { index: 2, count: 1 });
}

#[test]
fn symbol_changes_reach_the_grid_at_logical_indices() {
    let Harness { source, .. } = harness("grid");
    let items = quotes(&["BHP"]);
    let list = Rc::new(ObservableList::with_items(items.clone()));
    source.open(definition_for(&list)).unwrap();
    let events = record_events(&source);

    items[0]
        .symbol
        .set(SymbolField::Name, ValueContent::text("BHP Group"));

    let events = events.borrow();
    let RecordSourceEvent::RecordValuesChanged { index, changes, .. } = &events[0] else {
        panic!("expected value change, got {:?}", events[0]);
    };
    assert_eq!(*index, 0);
    assert_eq!(changes[0].field_index, 2);
    assert_eq!(source.value(0, 2).display(), "BHP Group");
}
