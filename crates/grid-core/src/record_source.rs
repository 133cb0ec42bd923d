//! Record sources: keep a set of records in step with a live backing list.
//!
//! # Lifecycle
//!
//! A record source is created once per grid surface and opened against a
//! [`RecordSourceDefinition`]. While open it holds the list through a
//! [`ListLock`], listens to list and badness changes, and owns one
//! [`Record`] per list element. `close` tears all of that down without
//! raising events; a closed source may be opened again, against the same
//! list or another one.
//!
//! # Consistency
//!
//! Every list change is applied as one operation over its whole range. The
//! record array must always mirror the list; a change that does not fit the
//! current record count means the bookkeeping has drifted, which panics.
//!
//! Changing the active field sources is staged: value sources for the new
//! types are created first, and the commit is skipped if the source was
//! closed, reopened or restructured while they were being created.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use grid_model::{
    Badness, Field, FieldSourceDefinition, FieldSourceDefinitionCache, FieldSourceTypeId, Value,
};
use tracing::{debug, debug_span, trace};

use crate::error::{CoreError, Result};
use crate::list::{BadnessList, ListChange, ListLock, ListLocker, ObservableList};
use crate::record::{Record, RecordDefinition, RecordItem, RecordKey};
use crate::signal::{Signal, SubscriptionId};
use crate::value_source::{ValueChange, ValueSource};

/// Binds an application's item type to field sources.
pub trait ValueSourceFactory<T> {
    /// Value source reading `item` through `definition`.
    fn create_value_source(
        &self,
        definition: Rc<FieldSourceDefinition>,
        item: &Rc<T>,
    ) -> Box<dyn ValueSource>;
}

/// What a record source is opened against.
pub struct RecordSourceDefinition<T> {
    /// Field source types the grid may show.
    pub allowed: Vec<FieldSourceTypeId>,
    /// Field source types selected into the rows, in row order.
    pub active: Vec<FieldSourceTypeId>,
    /// Backing list; `None` opens a private, initially empty list.
    pub list: Option<Rc<dyn BadnessList<T>>>,
}

impl<T> RecordSourceDefinition<T> {
    /// All `allowed` types active, private list.
    pub fn new(allowed: Vec<FieldSourceTypeId>) -> Self {
        Self {
            active: allowed.clone(),
            allowed,
            list: None,
        }
    }

    #[must_use]
    pub fn with_active(mut self, active: Vec<FieldSourceTypeId>) -> Self {
        self.active = active;
        self
    }

    #[must_use]
    pub fn with_list(mut self, list: Rc<dyn BadnessList<T>>) -> Self {
        self.list = Some(list);
        self
    }
}

impl<T> Clone for RecordSourceDefinition<T> {
    fn clone(&self) -> Self {
        Self {
            allowed: self.allowed.clone(),
            active: self.active.clone(),
            list: self.list.clone(),
        }
    }
}

impl<T> fmt::Debug for RecordSourceDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSourceDefinition")
            .field("allowed", &self.allowed)
            .field("active", &self.active)
            .field("list", &self.list.is_some())
            .finish()
    }
}

/// Notification raised to the grid.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordSourceEvent {
    RecordsInserted {
        index: usize,
        count: usize,
    },
    RecordsRemoved {
        index: usize,
        count: usize,
    },
    RecordsMoved {
        from: usize,
        to: usize,
        count: usize,
    },
    RecordsReplaced {
        index: usize,
        count: usize,
    },
    /// Every record may have changed; re-read everything.
    AllRecordsChanged,
    RecordValuesChanged {
        index: usize,
        key: RecordKey,
        changes: Vec<ValueChange>,
    },
    /// The field array changed.
    FieldsChanged,
    BadnessChanged(Badness),
}

struct OpenState<T: 'static> {
    lock: ListLock<T>,
    owns_list: bool,
    list_subscription: SubscriptionId,
    badness_subscription: SubscriptionId,
    allowed: Vec<FieldSourceTypeId>,
    active: Vec<FieldSourceTypeId>,
}

impl<T: 'static> OpenState<T> {
    fn list(&self) -> Rc<dyn BadnessList<T>> {
        Rc::clone(self.lock.list())
    }
}

struct Inner<T: 'static> {
    name: String,
    cache: Rc<FieldSourceDefinitionCache>,
    factory: Rc<dyn ValueSourceFactory<T>>,
    /// Bumped on every open and close.
    generation: Cell<u64>,
    /// Bumped on every structural change to the record array.
    revision: Cell<u64>,
    open: RefCell<Option<OpenState<T>>>,
    records: RefCell<Vec<Record<T>>>,
    /// Key lookup for `records`, valid while its revision matches.
    key_index: RefCell<(u64, HashMap<RecordKey, usize>)>,
    badness: RefCell<Badness>,
    events: Signal<RecordSourceEvent>,
}

pub struct RecordSource<T: RecordItem + 'static> {
    inner: Rc<Inner<T>>,
}

impl<T: RecordItem + 'static> RecordSource<T> {
    pub fn new(
        name: impl Into<String>,
        cache: Rc<FieldSourceDefinitionCache>,
        factory: Rc<dyn ValueSourceFactory<T>>,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                name: name.into(),
                cache,
                factory,
                generation: Cell::new(0),
                revision: Cell::new(0),
                open: RefCell::new(None),
                records: RefCell::new(Vec::new()),
                key_index: RefCell::new((0, HashMap::new())),
                badness: RefCell::new(closed_badness()),
                events: Signal::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Lock the list, build one record per element and start listening.
    ///
    /// Raises `FieldsChanged`, `AllRecordsChanged` and `BadnessChanged`.
    ///
    /// # Panics
    ///
    /// Panics if an active type is not allowed or repeated, or if two list
    /// elements map to the same key.
    pub fn open(&self, definition: RecordSourceDefinition<T>) -> Result<()> {
        self.inner.open(definition)
    }

    /// Release everything. Idempotent; raises no events.
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn reopen(&self, definition: RecordSourceDefinition<T>) -> Result<()> {
        self.inner.close();
        self.inner.open(definition)
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.borrow().is_some()
    }

    /// Number of records.
    pub fn count(&self) -> usize {
        self.inner.records.borrow().len()
    }

    pub fn record_key(&self, index: usize) -> RecordKey {
        self.inner.records.borrow()[index].key().clone()
    }

    pub fn index_of(&self, key: &RecordKey) -> Option<usize> {
        self.inner.index_of(key)
    }

    /// Run `f` against the record at `index`.
    ///
    /// `f` must not mutate the list or this record source.
    pub fn with_record<R>(&self, index: usize, f: impl FnOnce(&Record<T>) -> R) -> R {
        f(&self.inner.records.borrow()[index])
    }

    pub fn item(&self, index: usize) -> Rc<T> {
        Rc::clone(self.inner.records.borrow()[index].item())
    }

    pub fn values(&self, index: usize) -> Vec<Value> {
        self.inner.records.borrow()[index].values()
    }

    pub fn value(&self, index: usize, field: usize) -> Value {
        self.inner.records.borrow()[index].value(field)
    }

    /// Field array shared by every record, empty while closed.
    pub fn fields(&self) -> Vec<Field> {
        self.active_field_sources()
            .into_iter()
            .flat_map(|type_id| self.inner.cache.get(type_id).fields().to_vec())
            .collect()
    }

    pub fn badness(&self) -> Badness {
        self.inner.badness.borrow().clone()
    }

    pub fn allowed_field_sources(&self) -> Vec<FieldSourceTypeId> {
        self.inner
            .open
            .borrow()
            .as_ref()
            .map(|open| open.allowed.clone())
            .unwrap_or_default()
    }

    pub fn active_field_sources(&self) -> Vec<FieldSourceTypeId> {
        self.inner
            .open
            .borrow()
            .as_ref()
            .map(|open| open.active.clone())
            .unwrap_or_default()
    }

    /// Returns true while the source runs on a list it created itself.
    pub fn owns_list(&self) -> bool {
        self.inner
            .open
            .borrow()
            .as_ref()
            .is_some_and(|open| open.owns_list)
    }

    /// The list the source is open on.
    pub fn list(&self) -> Option<Rc<dyn BadnessList<T>>> {
        self.inner.open.borrow().as_ref().map(OpenState::list)
    }

    /// Select which field sources make up each row.
    ///
    /// Only value sources of removed types are torn down and only added
    /// types get new ones; records keep their identity. Raises
    /// `FieldsChanged` and `AllRecordsChanged` unless nothing changed.
    ///
    /// # Panics
    ///
    /// Panics if a type is not allowed or appears twice.
    pub fn set_active_field_sources(&self, types: &[FieldSourceTypeId]) -> Result<()> {
        self.inner.set_active_field_sources(types)
    }

    pub fn subscribe<L>(&self, listener: L) -> SubscriptionId
    where
        L: Fn(&RecordSourceEvent) + 'static,
    {
        self.inner.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(id)
    }
}

impl<T: RecordItem + 'static> Drop for RecordSource<T> {
    fn drop(&mut self) {
        self.inner.close();
    }
}

impl<T: RecordItem + 'static> fmt::Debug for RecordSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSource")
            .field("name", &self.inner.name)
            .field("open", &self.is_open())
            .field("records", &self.count())
            .field("badness", &self.badness())
            .finish()
    }
}

fn closed_badness() -> Badness {
    Badness::loading("record source closed")
}

impl<T: RecordItem + 'static> Inner<T> {
    fn open(self: &Rc<Self>, definition: RecordSourceDefinition<T>) -> Result<()> {
        if self.open.borrow().is_some() {
            return Err(CoreError::AlreadyOpen(self.name.clone()));
        }
        let _span = debug_span!("open", source = %self.name).entered();
        self.assert_active(&definition.allowed, &definition.active);

        let (list, owns_list) = match definition.list {
            Some(list) => (list, false),
            None => (
                Rc::new(ObservableList::<T>::new()) as Rc<dyn BadnessList<T>>,
                true,
            ),
        };
        let lock = ListLock::acquire(Rc::clone(&list), ListLocker::new(self.name.clone()))?;

        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let list_subscription = {
            let inner = Rc::downgrade(self);
            list.subscribe_list_changed(Box::new(move |change: &ListChange| {
                if let Some(inner) = inner.upgrade() {
                    inner.handle_list_change(generation, *change);
                }
            }))
        };
        let badness_subscription = {
            let inner = Rc::downgrade(self);
            list.subscribe_badness_changed(Box::new(move |badness: &Badness| {
                if let Some(inner) = inner.upgrade() {
                    inner.handle_badness_change(generation, badness);
                }
            }))
        };

        let records: Vec<Record<T>> = (0..list.count())
            .map(|index| self.build_record(generation, list.get(index), &definition.active))
            .collect();
        assert_unique_keys(&self.name, &records);
        let badness = list.badness();
        debug!(
            records = records.len(),
            active = ?definition.active,
            owns_list,
            badness = %badness,
            "record source opened"
        );

        *self.records.borrow_mut() = records;
        *self.badness.borrow_mut() = badness.clone();
        self.bump_revision();
        *self.open.borrow_mut() = Some(OpenState {
            lock,
            owns_list,
            list_subscription,
            badness_subscription,
            allowed: definition.allowed,
            active: definition.active,
        });

        self.events.notify(&RecordSourceEvent::FieldsChanged);
        self.events.notify(&RecordSourceEvent::AllRecordsChanged);
        self.events.notify(&RecordSourceEvent::BadnessChanged(badness));
        Ok(())
    }

    fn close(&self) {
        let Some(open) = self.open.borrow_mut().take() else {
            return;
        };
        self.generation.set(self.generation.get() + 1);
        self.bump_revision();

        let list = open.list();
        list.unsubscribe_list_changed(open.list_subscription);
        list.unsubscribe_badness_changed(open.badness_subscription);

        let records = std::mem::take(&mut *self.records.borrow_mut());
        let released = records.len();
        drop(records);
        *self.badness.borrow_mut() = closed_badness();
        debug!(
            source = %self.name,
            records = released,
            owned_list = open.owns_list,
            "record source closed"
        );
        // Dropping the state releases the lock and the list reference.
        drop(open);
    }

    fn set_active_field_sources(self: &Rc<Self>, types: &[FieldSourceTypeId]) -> Result<()> {
        let (allowed, current) = match self.open.borrow().as_ref() {
            Some(open) => (open.allowed.clone(), open.active.clone()),
            None => return Err(CoreError::NotOpen(self.name.clone())),
        };
        self.assert_active(&allowed, types);
        if current == types {
            return Ok(());
        }
        let _span = debug_span!("rebuild", source = %self.name).entered();

        let generation = self.generation.get();
        let revision = self.revision.get();
        let pending: Vec<(Rc<T>, Vec<FieldSourceTypeId>)> = self
            .records
            .borrow()
            .iter()
            .map(|record| (Rc::clone(record.item()), record.missing_types(types)))
            .collect();

        // The factory is application code and may call back into us.
        let staged: Vec<Vec<Box<dyn ValueSource>>> = pending
            .iter()
            .map(|(item, missing)| {
                missing
                    .iter()
                    .map(|&type_id| {
                        self.factory
                            .create_value_source(self.cache.get(type_id), item)
                    })
                    .collect()
            })
            .collect();

        if self.generation.get() != generation || self.revision.get() != revision {
            debug!("record source changed while staging, rebuild discarded");
            return Ok(());
        }

        {
            let mut records = self.records.borrow_mut();
            for (record, added) in records.iter_mut().zip(staged) {
                record.replace_sources(types, added);
            }
        }
        if let Some(open) = self.open.borrow_mut().as_mut() {
            open.active = types.to_vec();
        }
        debug!(
            from = ?current,
            to = ?types,
            records = pending.len(),
            "active field sources changed"
        );

        self.events.notify(&RecordSourceEvent::FieldsChanged);
        self.events.notify(&RecordSourceEvent::AllRecordsChanged);
        Ok(())
    }

    fn handle_list_change(self: &Rc<Self>, generation: u64, change: ListChange) {
        if self.generation.get() != generation {
            return;
        }
        let Some((list, active)) = self
            .open
            .borrow()
            .as_ref()
            .map(|open| (open.list(), open.active.clone()))
        else {
            return;
        };
        debug!(source = %self.name, ?change, "list changed");
        let record_count = self.records.borrow().len();

        let event = match change {
            ListChange::Insert { index, count } => {
                self.assert_in_step(
                    record_count + count == list.count() && index <= record_count,
                    change,
                    list.count(),
                );
                let built: Vec<Record<T>> = (index..index + count)
                    .map(|position| self.build_record(generation, list.get(position), &active))
                    .collect();
                let mut records = self.records.borrow_mut();
                records.splice(index..index, built);
                assert_unique_keys(&self.name, &records);
                RecordSourceEvent::RecordsInserted { index, count }
            }
            ListChange::Remove { index, count } => {
                self.assert_in_step(
                    record_count == list.count() && index + count <= record_count,
                    change,
                    list.count(),
                );
                let removed: Vec<Record<T>> =
                    self.records.borrow_mut().drain(index..index + count).collect();
                drop(removed);
                RecordSourceEvent::RecordsRemoved { index, count }
            }
            ListChange::Replace { index, count } => {
                self.assert_in_step(
                    record_count == list.count() && index + count <= record_count,
                    change,
                    list.count(),
                );
                let mut replaced = Vec::new();
                for position in index..index + count {
                    let item = list.get(position);
                    let same = Rc::ptr_eq(self.records.borrow()[position].item(), &item);
                    if !same {
                        let record = self.build_record(generation, item, &active);
                        replaced.push(std::mem::replace(
                            &mut self.records.borrow_mut()[position],
                            record,
                        ));
                    }
                }
                assert_unique_keys(&self.name, &self.records.borrow());
                drop(replaced);
                RecordSourceEvent::RecordsReplaced { index, count }
            }
            ListChange::Move { from, to, count } => {
                self.assert_in_step(
                    record_count == list.count()
                        && from + count <= record_count
                        && to + count <= record_count,
                    change,
                    list.count(),
                );
                let mut records = self.records.borrow_mut();
                let moved: Vec<Record<T>> = records.drain(from..from + count).collect();
                records.splice(to..to, moved);
                RecordSourceEvent::RecordsMoved { from, to, count }
            }
            ListChange::Clear => {
                self.assert_in_step(list.count() == 0, change, list.count());
                let cleared = std::mem::take(&mut *self.records.borrow_mut());
                drop(cleared);
                RecordSourceEvent::AllRecordsChanged
            }
        };
        self.bump_revision();
        self.events.notify(&event);
    }

    fn handle_badness_change(&self, generation: u64, badness: &Badness) {
        if self.generation.get() != generation {
            return;
        }
        debug!(source = %self.name, badness = %badness, "list badness changed");
        *self.badness.borrow_mut() = badness.clone();
        self.events
            .notify(&RecordSourceEvent::BadnessChanged(badness.clone()));
    }

    /// Build and activate the record for `item`, forwarding its changes.
    fn build_record(
        self: &Rc<Self>,
        generation: u64,
        item: Rc<T>,
        types: &[FieldSourceTypeId],
    ) -> Record<T> {
        let definition = RecordDefinition::new(item);
        let sources = types
            .iter()
            .map(|&type_id| {
                self.factory
                    .create_value_source(self.cache.get(type_id), definition.item())
            })
            .collect();
        let mut record = Record::new(definition, sources);
        record.activate();

        let inner = Rc::downgrade(self);
        let key = record.key().clone();
        record.subscribe_values_changed(move |changes: &[ValueChange]| {
            if let Some(inner) = inner.upgrade() {
                inner.forward_values(generation, &key, changes);
            }
        });
        record
    }

    fn forward_values(&self, generation: u64, key: &RecordKey, changes: &[ValueChange]) {
        if self.generation.get() != generation {
            return;
        }
        let Some(index) = self.index_of(key) else {
            return;
        };
        trace!(source = %self.name, %key, index, changes = changes.len(), "record values changed");
        self.events.notify(&RecordSourceEvent::RecordValuesChanged {
            index,
            key: key.clone(),
            changes: changes.to_vec(),
        });
    }

    fn index_of(&self, key: &RecordKey) -> Option<usize> {
        let records = self.records.borrow();
        let revision = self.revision.get();
        let mut key_index = self.key_index.borrow_mut();
        if key_index.0 == revision
            && let Some(&index) = key_index.1.get(key)
            && records.get(index).is_some_and(|record| record.key() == key)
        {
            return Some(index);
        }
        // Stale, or the records moved under a lookup made mid-change.
        key_index.0 = revision;
        key_index.1.clear();
        key_index.1.extend(
            records
                .iter()
                .enumerate()
                .map(|(index, record)| (record.key().clone(), index)),
        );
        key_index.1.get(key).copied()
    }

    fn bump_revision(&self) {
        self.revision.set(self.revision.get() + 1);
    }

    /// Every active type must be allowed and appear once.
    fn assert_active(&self, allowed: &[FieldSourceTypeId], active: &[FieldSourceTypeId]) {
        let mut seen = HashSet::with_capacity(active.len());
        for &type_id in active {
            assert!(
                allowed.contains(&type_id),
                "field source {type_id} is not allowed in record source {}",
                self.name
            );
            assert!(
                seen.insert(type_id),
                "field source {type_id} is active twice in record source {}",
                self.name
            );
        }
    }

    fn assert_in_step(&self, in_step: bool, change: ListChange, list_count: usize) {
        assert!(
            in_step,
            "record source {} out of step with its list: {change:?} with {} records, list has {list_count}",
            self.name,
            self.records.borrow().len()
        );
    }
}

fn assert_unique_keys<T>(name: &str, records: &[Record<T>]) {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        assert!(
            seen.insert(record.key()),
            "duplicate record key {} in record source {name}",
            record.key()
        );
    }
}
