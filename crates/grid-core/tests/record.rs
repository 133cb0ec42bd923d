//! Logical field addressing across the value sources of a record.

use std::cell::RefCell;
use std::rc::Rc;

use grid_core::{
    EntityValueSource, FieldRanges, InMemoryEntity, Record, RecordDefinition, ValueChange,
    ValueSource,
};
use grid_model::{
    Correctness, DomainFieldId, FieldDataType, FieldSourceDefinition, FieldSourceDefinitionCache,
    FieldSourceTypeId, ScanMatchField, ValueContent,
};
use proptest::prelude::*;

/// Three-field catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Left {
    A,
    B,
    C,
}

impl DomainFieldId for Left {
    const ALL: &'static [Self] = &[Left::A, Left::B, Left::C];

    fn ordinal(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            Left::A => "A",
            Left::B => "B",
            Left::C => "C",
        }
    }

    fn heading(self) -> &'static str {
        self.name()
    }

    fn data_type(self) -> FieldDataType {
        FieldDataType::Integer
    }
}

/// Two-field catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Right {
    X,
    Y,
}

impl DomainFieldId for Right {
    const ALL: &'static [Self] = &[Right::X, Right::Y];

    fn ordinal(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            Right::X => "X",
            Right::Y => "Y",
        }
    }

    fn heading(self) -> &'static str {
        self.name()
    }

    fn data_type(self) -> FieldDataType {
        FieldDataType::Text
    }
}

struct Fixture {
    left_definition: Rc<FieldSourceDefinition>,
    right_definition: Rc<FieldSourceDefinition>,
    left: Rc<InMemoryEntity<Left>>,
    right: Rc<InMemoryEntity<Right>>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            left_definition: Rc::new(FieldSourceDefinition::build(
                FieldSourceTypeId::Symbol,
                &[],
                &[Left::A],
            )),
            right_definition: Rc::new(FieldSourceDefinition::build(
                FieldSourceTypeId::Security,
                &[],
                &[Right::X],
            )),
            left: Rc::new(InMemoryEntity::new("row-1")),
            right: Rc::new(InMemoryEntity::new("row-1")),
        }
    }

    fn left_source(&self) -> Box<dyn ValueSource> {
        Box::new(EntityValueSource::new(
            Rc::clone(&self.left_definition),
            Rc::clone(&self.left),
        ))
    }

    fn right_source(&self) -> Box<dyn ValueSource> {
        Box::new(EntityValueSource::new(
            Rc::clone(&self.right_definition),
            Rc::clone(&self.right),
        ))
    }

    fn record(&self, sources: Vec<Box<dyn ValueSource>>) -> Record<InMemoryEntity<Left>> {
        Record::new(RecordDefinition::new(Rc::clone(&self.left)), sources)
    }
}

fn collect(record: &Record<InMemoryEntity<Left>>) -> Rc<RefCell<Vec<Vec<ValueChange>>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    record.subscribe_values_changed(move |changes: &[ValueChange]| {
        sink.borrow_mut().push(changes.to_vec());
    });
    seen
}

#[test]
fn second_source_is_offset_past_the_first() {
    let fixture = Fixture::new();
    let mut record = fixture.record(vec![fixture.left_source(), fixture.right_source()]);
    assert_eq!(record.field_count(), 5);

    let snapshot = record.activate();
    assert_eq!(snapshot.len(), 5);
    assert_eq!(record.field(4).name(), "Security_Y");

    let seen = collect(&record);
    fixture.right.set(Right::Y, ValueContent::text("hello"));

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].len(), 1);
    assert_eq!(seen[0][0].field_index, 4);
    assert_eq!(record.value(4).display(), "hello");
}

#[test]
fn scan_match_correctness_restamps_every_cell() {
    let cache = FieldSourceDefinitionCache::new();
    let entity = Rc::new(InMemoryEntity::<ScanMatchField>::new("scan-1/BHP"));
    let source: Box<dyn ValueSource> = Box::new(EntityValueSource::new(
        cache.get(FieldSourceTypeId::ScanMatch),
        Rc::clone(&entity),
    ));
    let mut record = Record::new(RecordDefinition::new(Rc::clone(&entity)), vec![source]);
    record.activate();
    assert!(
        record
            .values()
            .iter()
            .all(|value| value.correctness() == Correctness::Good)
    );

    entity.set_correctness(Correctness::Error);

    let values = record.values();
    assert_eq!(values.len(), record.field_count());
    assert!(
        values
            .iter()
            .all(|value| value.correctness() == Correctness::Error)
    );
}

#[test]
fn each_record_offsets_independently() {
    let fixture = Fixture::new();
    let mut wide = fixture.record(vec![fixture.left_source(), fixture.right_source()]);
    let mut narrow = fixture.record(vec![fixture.right_source()]);
    wide.activate();
    narrow.activate();
    let wide_seen = collect(&wide);
    let narrow_seen = collect(&narrow);

    fixture.right.set(Right::Y, ValueContent::text("both"));

    assert_eq!(wide_seen.borrow()[0][0].field_index, 4);
    assert_eq!(narrow_seen.borrow()[0][0].field_index, 1);
}

#[test]
fn replace_sources_keeps_unchanged_sources() {
    let fixture = Fixture::new();
    fixture.left.set(Left::B, ValueContent::Integer(Some(7)));
    let mut record = fixture.record(vec![fixture.left_source()]);
    record.activate();
    assert_eq!(fixture.left.subscriber_count(), 1);

    record.replace_sources(
        &[FieldSourceTypeId::Symbol, FieldSourceTypeId::Security],
        vec![fixture.right_source()],
    );
    assert_eq!(record.field_count(), 5);
    assert_eq!(fixture.left.subscriber_count(), 1);
    assert_eq!(fixture.right.subscriber_count(), 1);
    assert_eq!(record.value(1).display(), "7");

    let seen = collect(&record);
    fixture.right.set(Right::X, ValueContent::text("x"));
    assert_eq!(seen.borrow()[0][0].field_index, 3);

    record.replace_sources(&[FieldSourceTypeId::Security], Vec::new());
    assert_eq!(record.field_count(), 2);
    assert_eq!(fixture.left.subscriber_count(), 0);
    assert_eq!(fixture.right.subscriber_count(), 1);
    assert_eq!(record.value(0).display(), "x");
}

#[test]
fn dropping_a_record_releases_its_sources() {
    let fixture = Fixture::new();
    let mut record = fixture.record(vec![fixture.left_source(), fixture.right_source()]);
    record.activate();
    drop(record);
    assert_eq!(fixture.left.subscriber_count(), 0);
    assert_eq!(fixture.right.subscriber_count(), 0);
}

proptest! {
    #[test]
    fn ranges_tile_the_logical_space(lens in proptest::collection::vec(0usize..6, 1..8)) {
        let ranges = FieldRanges::from_lens(lens.iter().copied());
        prop_assert_eq!(ranges.total(), lens.iter().sum::<usize>());

        let mut next = 0;
        for (source, &len) in lens.iter().enumerate() {
            let range = ranges.range(source);
            prop_assert_eq!(range.start, next);
            prop_assert_eq!(range.len, len);
            next = range.end();
            for local in 0..len {
                let logical = ranges.offset(source, local);
                prop_assert_eq!(ranges.locate(logical), (source, local));
            }
        }
    }
}
