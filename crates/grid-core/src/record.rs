//! Records: one grid row spanning the value sources of several field sources.
//!
//! Each value source owns a fixed [`FieldRange`] of the record's logical
//! field array. [`FieldRanges`] is the only place that does range
//! arithmetic; ranges are laid out back to back in registration order, so
//! the logical index space has no gaps or overlaps by construction.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use grid_model::{DomainFieldId, Field, FieldSourceTypeId, Value};

use crate::entity::InMemoryEntity;
use crate::signal::{Signal, SubscriptionId};
use crate::value_source::{ValueChange, ValueChangeSink, ValueSource};

/// Stable identity of a row, independent of its current index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Item of a backing list that can be shown as a row.
pub trait RecordItem {
    fn map_key(&self) -> RecordKey;
}

impl<F: DomainFieldId> RecordItem for InMemoryEntity<F> {
    fn map_key(&self) -> RecordKey {
        RecordKey::new(self.key())
    }
}

/// Identity of a row: its key plus the list item behind it.
pub struct RecordDefinition<T> {
    key: RecordKey,
    item: Rc<T>,
}

impl<T: RecordItem> RecordDefinition<T> {
    pub fn new(item: Rc<T>) -> Self {
        Self {
            key: item.map_key(),
            item,
        }
    }
}

impl<T> RecordDefinition<T> {
    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn item(&self) -> &Rc<T> {
        &self.item
    }
}

impl<T> Clone for RecordDefinition<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            item: Rc::clone(&self.item),
        }
    }
}

impl<T> fmt::Debug for RecordDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordDefinition")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Half-open range `[start, start + len)` of logical field indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRange {
    pub start: usize,
    pub len: usize,
}

impl FieldRange {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn contains(&self, logical: usize) -> bool {
        (self.start..self.end()).contains(&logical)
    }
}

/// Contiguous ranges, one per value source, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRanges {
    ranges: Vec<FieldRange>,
}

impl FieldRanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lens<I: IntoIterator<Item = usize>>(lens: I) -> Self {
        let mut ranges = Self::new();
        for len in lens {
            ranges.push(len);
        }
        ranges
    }

    /// Append a range starting where the previous one ends.
    pub fn push(&mut self, len: usize) -> FieldRange {
        let range = FieldRange {
            start: self.total(),
            len,
        };
        self.ranges.push(range);
        range
    }

    /// Total number of logical fields.
    pub fn total(&self) -> usize {
        self.ranges.last().map_or(0, FieldRange::end)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn range(&self, source: usize) -> FieldRange {
        self.ranges[source]
    }

    pub fn ranges(&self) -> &[FieldRange] {
        &self.ranges
    }

    /// Source position and local index of a logical index.
    ///
    /// # Panics
    ///
    /// Panics if `logical` is not below `total()`.
    pub fn locate(&self, logical: usize) -> (usize, usize) {
        assert!(
            logical < self.total(),
            "logical field {logical} out of range ({} fields)",
            self.total()
        );
        // Empty ranges share their start with the next one; the first range
        // whose end passes `logical` is the owner.
        let source = self.ranges.partition_point(|range| range.end() <= logical);
        (source, logical - self.ranges[source].start)
    }

    /// Logical index of `local` within the range of `source`.
    ///
    /// # Panics
    ///
    /// Panics if `local` is outside that range.
    pub fn offset(&self, source: usize, local: usize) -> usize {
        let range = self.ranges[source];
        assert!(
            local < range.len,
            "local field {local} out of range for source {source} ({} fields)",
            range.len
        );
        range.start + local
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotId(u64);

struct Slot {
    id: SlotId,
    source: Box<dyn ValueSource>,
}

/// State shared with the sinks handed to value sources.
struct RecordCells {
    slots: Vec<SlotId>,
    ranges: FieldRanges,
    values: Vec<Value>,
}

struct RecordShared {
    cells: RefCell<RecordCells>,
    changed: Signal<[ValueChange]>,
}

impl RecordShared {
    /// Store a batch from `slot` and re-emit it with logical indices.
    fn forward(&self, slot: SlotId, changes: &[ValueChange]) {
        let logical: Vec<ValueChange> = {
            let mut cells = self.cells.borrow_mut();
            let Some(position) = cells.slots.iter().position(|id| *id == slot) else {
                return;
            };
            changes
                .iter()
                .map(|change| {
                    let index = cells.ranges.offset(position, change.field_index);
                    cells.values[index] = change.value.clone();
                    ValueChange {
                        field_index: index,
                        ..change.clone()
                    }
                })
                .collect()
        };
        self.changed.notify(&logical);
    }
}

/// One grid row.
pub struct Record<T> {
    definition: RecordDefinition<T>,
    slots: Vec<Slot>,
    shared: Rc<RecordShared>,
    next_slot: Cell<u64>,
    active: bool,
}

impl<T> Record<T> {
    pub fn new(definition: RecordDefinition<T>, sources: Vec<Box<dyn ValueSource>>) -> Self {
        let mut record = Self {
            definition,
            slots: Vec::with_capacity(sources.len()),
            shared: Rc::new(RecordShared {
                cells: RefCell::new(RecordCells {
                    slots: Vec::new(),
                    ranges: FieldRanges::new(),
                    values: Vec::new(),
                }),
                changed: Signal::new(),
            }),
            next_slot: Cell::new(0),
            active: false,
        };
        let slots = sources
            .into_iter()
            .map(|source| record.new_slot(source))
            .collect();
        record.slots = slots;
        record.relayout(Vec::new());
        record
    }

    pub fn key(&self) -> &RecordKey {
        self.definition.key()
    }

    pub fn item(&self) -> &Rc<T> {
        self.definition.item()
    }

    pub fn definition(&self) -> &RecordDefinition<T> {
        &self.definition
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn source_count(&self) -> usize {
        self.slots.len()
    }

    pub fn source_types(&self) -> Vec<FieldSourceTypeId> {
        self.slots
            .iter()
            .map(|slot| slot.source.source_type())
            .collect()
    }

    pub fn field_count(&self) -> usize {
        self.shared.cells.borrow().ranges.total()
    }

    pub fn ranges(&self) -> FieldRanges {
        self.shared.cells.borrow().ranges.clone()
    }

    /// Field behind a logical index.
    pub fn field(&self, index: usize) -> &Field {
        let (position, local) = self.shared.cells.borrow().ranges.locate(index);
        self.slots[position].source.definition().field(local)
    }

    pub fn fields(&self) -> Vec<Field> {
        self.slots
            .iter()
            .flat_map(|slot| slot.source.definition().fields().iter().cloned())
            .collect()
    }

    /// Activate every value source in order and return the full snapshot.
    ///
    /// # Panics
    ///
    /// Panics if the record is already active.
    pub fn activate(&mut self) -> Vec<Value> {
        assert!(!self.active, "record {} activated twice", self.key());
        let snapshots: Vec<(usize, Vec<Value>)> = self
            .slots
            .iter_mut()
            .enumerate()
            .map(|(position, slot)| {
                let sink = sink_for(Rc::downgrade(&self.shared), slot.id);
                (position, slot.source.activate(sink))
            })
            .collect();
        {
            let mut cells = self.shared.cells.borrow_mut();
            for (position, snapshot) in snapshots {
                store_snapshot(&mut cells, position, snapshot);
            }
        }
        self.active = true;
        self.values()
    }

    pub fn deactivate(&mut self) {
        for slot in &mut self.slots {
            slot.source.deactivate();
        }
        self.active = false;
    }

    pub fn value(&self, index: usize) -> Value {
        self.shared.cells.borrow().values[index].clone()
    }

    pub fn values(&self) -> Vec<Value> {
        self.shared.cells.borrow().values.clone()
    }

    pub fn subscribe_values_changed<L>(&self, listener: L) -> SubscriptionId
    where
        L: Fn(&[ValueChange]) + 'static,
    {
        self.shared.changed.subscribe(listener)
    }

    pub fn unsubscribe_values_changed(&self, id: SubscriptionId) -> bool {
        self.shared.changed.unsubscribe(id)
    }

    /// Field source types in `types` this record has no value source for.
    pub fn missing_types(&self, types: &[FieldSourceTypeId]) -> Vec<FieldSourceTypeId> {
        let present = self.source_types();
        types
            .iter()
            .copied()
            .filter(|type_id| !present.contains(type_id))
            .collect()
    }

    /// Switch to value sources for `types`, in that order.
    ///
    /// Existing sources whose type is still wanted are kept as they are;
    /// `added` supplies sources for the missing types, in `types` order.
    /// Sources of dropped types are deactivated. New sources are activated
    /// when the record is active.
    ///
    /// # Panics
    ///
    /// Panics if `added` does not match the missing types.
    pub fn replace_sources(
        &mut self,
        types: &[FieldSourceTypeId],
        added: Vec<Box<dyn ValueSource>>,
    ) {
        let mut added = added.into_iter();
        let mut old: Vec<Option<Slot>> = std::mem::take(&mut self.slots)
            .into_iter()
            .map(Some)
            .collect();
        let (old_ranges, old_values) = {
            let cells = self.shared.cells.borrow();
            (cells.ranges.clone(), cells.values.clone())
        };

        let mut slots = Vec::with_capacity(types.len());
        let mut carried: Vec<Option<Vec<Value>>> = Vec::with_capacity(types.len());
        for &type_id in types {
            let kept = old.iter_mut().enumerate().find_map(|(position, slot)| {
                if slot
                    .as_ref()
                    .is_some_and(|slot| slot.source.source_type() == type_id)
                {
                    slot.take().map(|slot| (position, slot))
                } else {
                    None
                }
            });
            match kept {
                Some((position, slot)) => {
                    let range = old_ranges.range(position);
                    carried.push(Some(old_values[range.start..range.end()].to_vec()));
                    slots.push(slot);
                }
                None => {
                    let source = added.next().unwrap_or_else(|| {
                        panic!("no value source supplied for {type_id} on {}", self.key())
                    });
                    assert_eq!(
                        source.source_type(),
                        type_id,
                        "value source supplied out of order on {}",
                        self.key()
                    );
                    carried.push(None);
                    slots.push(self.new_slot(source));
                }
            }
        }
        assert!(
            added.next().is_none(),
            "more value sources supplied than missing on {}",
            self.key()
        );

        for mut slot in old.into_iter().flatten() {
            slot.source.deactivate();
        }

        let mut snapshots = Vec::with_capacity(slots.len());
        for (slot, carried) in slots.iter_mut().zip(carried) {
            let snapshot = match carried {
                Some(values) => values,
                None if self.active => slot
                    .source
                    .activate(sink_for(Rc::downgrade(&self.shared), slot.id)),
                None => slot.source.get_all_values(),
            };
            snapshots.push(snapshot);
        }
        self.slots = slots;
        self.relayout(snapshots);
    }

    fn new_slot(&self, source: Box<dyn ValueSource>) -> Slot {
        let id = SlotId(self.next_slot.get());
        self.next_slot.set(id.0 + 1);
        Slot { id, source }
    }

    /// Rebuild ranges from the current slots. Missing snapshots are filled
    /// with empty values.
    fn relayout(&mut self, snapshots: Vec<Vec<Value>>) {
        let mut cells = self.shared.cells.borrow_mut();
        cells.slots = self.slots.iter().map(|slot| slot.id).collect();
        cells.ranges =
            FieldRanges::from_lens(self.slots.iter().map(|slot| slot.source.field_count()));
        cells.values = self
            .slots
            .iter()
            .flat_map(|slot| {
                slot.source
                    .definition()
                    .fields()
                    .iter()
                    .map(Field::empty_value)
            })
            .collect();
        for (position, snapshot) in snapshots.into_iter().enumerate() {
            store_snapshot(&mut cells, position, snapshot);
        }
    }
}

fn sink_for(shared: Weak<RecordShared>, slot: SlotId) -> ValueChangeSink {
    Rc::new(move |changes: &[ValueChange]| {
        if let Some(shared) = shared.upgrade() {
            shared.forward(slot, changes);
        }
    })
}

fn store_snapshot(cells: &mut RecordCells, position: usize, snapshot: Vec<Value>) {
    let range = cells.ranges.range(position);
    assert_eq!(
        snapshot.len(),
        range.len,
        "snapshot of {} values for a source of {} fields",
        snapshot.len(),
        range.len
    );
    cells.values.splice(range.start..range.end(), snapshot);
}

impl<T> Drop for Record<T> {
    fn drop(&mut self) {
        self.deactivate();
    }
}

impl<T> fmt::Debug for Record<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("key", self.key())
            .field("sources", &self.source_types())
            .field("active", &self.active)
            .finish()
    }
}
