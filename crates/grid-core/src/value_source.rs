//! Value sources: adapt one domain entity to one field source definition.
//!
//! A value source serves a snapshot of every field on activation and then
//! turns the entity's "fields changed" notifications into value change
//! batches addressed by dense field index.
//!
//! # Lifecycle
//!
//! `Inactive` -> `Active` -> `Deactivated`. Activation subscribes to the
//! entity; deactivation unsubscribes and is terminal. Activating twice, or
//! after deactivation, is a logic error and panics.

use std::rc::{Rc, Weak};

use grid_model::{DomainFieldId, FieldSourceDefinition, FieldSourceTypeId, Value};
use tracing::trace;

use crate::entity::DomainEntity;
use crate::signal::SubscriptionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueChangeKind {
    /// The field itself changed.
    Update,
    /// Only the render attributes changed, after a correctness change.
    Attributes,
}

/// A fresh value for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChange {
    pub field_index: usize,
    pub kind: ValueChangeKind,
    pub value: Value,
}

impl ValueChange {
    pub fn new(field_index: usize, kind: ValueChangeKind, value: Value) -> Self {
        Self {
            field_index,
            kind,
            value,
        }
    }
}

/// Receiver of change batches from an active value source.
pub type ValueChangeSink = Rc<dyn Fn(&[ValueChange])>;

pub trait ValueSource {
    fn source_type(&self) -> FieldSourceTypeId;

    fn definition(&self) -> &Rc<FieldSourceDefinition>;

    fn field_count(&self) -> usize {
        self.definition().field_count()
    }

    fn is_active(&self) -> bool;

    /// Subscribe to the entity and return a snapshot of every field.
    ///
    /// # Panics
    ///
    /// Panics if the source is already active or was deactivated.
    fn activate(&mut self, sink: ValueChangeSink) -> Vec<Value>;

    /// Unsubscribe. Safe to call repeatedly.
    fn deactivate(&mut self);

    fn get_value(&self, index: usize) -> Value;

    fn get_all_values(&self) -> Vec<Value> {
        (0..self.field_count())
            .map(|index| self.get_value(index))
            .collect()
    }
}

/// Turn one entity change notification into a value change batch.
///
/// `changed_ordinals` are the domain ordinals the entity listed; `load`
/// builds the current value for a dense field index. Every supported listed
/// field is emitted once as an `Update`. When the listed ordinals include the
/// source's validity field, every remaining field follows as an `Attributes`
/// entry. Unsupported
/// ordinals are dropped. The batch may be empty.
pub fn build_value_changes<L>(
    definition: &FieldSourceDefinition,
    changed_ordinals: &[usize],
    mut load: L,
) -> Vec<ValueChange>
where
    L: FnMut(usize) -> Value,
{
    let field_count = definition.field_count();
    let mut listed = vec![false; field_count];
    let mut changes = Vec::with_capacity(changed_ordinals.len());
    let mut validity_changed = false;

    for &ordinal in changed_ordinals {
        if definition.is_validity_ordinal(ordinal) {
            validity_changed = true;
        }
        if let Some(index) = definition.index_of_ordinal(ordinal)
            && !listed[index]
        {
            listed[index] = true;
            changes.push(ValueChange::new(index, ValueChangeKind::Update, load(index)));
        }
    }

    if validity_changed {
        for (index, _) in listed.iter().enumerate().filter(|(_, listed)| !**listed) {
            changes.push(ValueChange::new(
                index,
                ValueChangeKind::Attributes,
                load(index),
            ));
        }
    }

    changes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activation {
    Inactive,
    Active(SubscriptionId),
    Deactivated,
}

/// Value source reading fields straight from a [`DomainEntity`].
pub struct EntityValueSource<E: DomainEntity + 'static> {
    definition: Rc<FieldSourceDefinition>,
    entity: Rc<E>,
    activation: Activation,
}

impl<E: DomainEntity + 'static> EntityValueSource<E> {
    /// # Panics
    ///
    /// Panics if `definition` is not built from `E`'s field catalog.
    pub fn new(definition: Rc<FieldSourceDefinition>, entity: Rc<E>) -> Self {
        assert!(
            definition.is_for::<E::FieldId>(),
            "{} cannot read {} fields",
            definition.type_id(),
            std::any::type_name::<E::FieldId>()
        );
        Self {
            definition,
            entity,
            activation: Activation::Inactive,
        }
    }

    pub fn entity(&self) -> &Rc<E> {
        &self.entity
    }
}

fn load_value<E: DomainEntity>(
    definition: &FieldSourceDefinition,
    entity: &E,
    index: usize,
) -> Value {
    let id: E::FieldId = definition.field_id(index);
    definition
        .field(index)
        .new_value(entity.load(id))
        .with_correctness(entity.correctness())
}

impl<E: DomainEntity + 'static> ValueSource for EntityValueSource<E> {
    fn source_type(&self) -> FieldSourceTypeId {
        self.definition.type_id()
    }

    fn definition(&self) -> &Rc<FieldSourceDefinition> {
        &self.definition
    }

    fn is_active(&self) -> bool {
        matches!(self.activation, Activation::Active(_))
    }

    fn activate(&mut self, sink: ValueChangeSink) -> Vec<Value> {
        match self.activation {
            Activation::Inactive => {}
            Activation::Active(_) => {
                panic!("{} value source activated twice", self.definition.type_id())
            }
            Activation::Deactivated => panic!(
                "{} value source activated after deactivation",
                self.definition.type_id()
            ),
        }

        let definition = Rc::clone(&self.definition);
        let entity: Weak<E> = Rc::downgrade(&self.entity);
        let subscription = self
            .entity
            .subscribe_fields_changed(Box::new(move |ids: &[E::FieldId]| {
                let Some(entity) = entity.upgrade() else {
                    return;
                };
                let ordinals: Vec<usize> = ids.iter().map(|id| id.ordinal()).collect();
                let changes = build_value_changes(&definition, &ordinals, |index| {
                    load_value(&definition, entity.as_ref(), index)
                });
                trace!(
                    source = definition.name(),
                    listed = ids.len(),
                    changes = changes.len(),
                    "value changes"
                );
                sink(&changes);
            }));
        self.activation = Activation::Active(subscription);
        self.get_all_values()
    }

    fn deactivate(&mut self) {
        if let Activation::Active(subscription) = self.activation {
            self.entity.unsubscribe_fields_changed(subscription);
        }
        self.activation = Activation::Deactivated;
    }

    fn get_value(&self, index: usize) -> Value {
        load_value(&self.definition, self.entity.as_ref(), index)
    }
}

impl<E: DomainEntity + 'static> Drop for EntityValueSource<E> {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_model::{Correctness, FieldSourceDefinitionCache, SecurityField, ValueContent};
    use std::cell::RefCell;

    use crate::entity::InMemoryEntity;

    fn collecting_sink() -> (ValueChangeSink, Rc<RefCell<Vec<Vec<ValueChange>>>>) {
        let batches = Rc::new(RefCell::new(Vec::new()));
        let sink_batches = Rc::clone(&batches);
        let sink: ValueChangeSink = Rc::new(move |changes: &[ValueChange]| {
            sink_batches.borrow_mut().push(changes.to_vec());
        });
        (sink, batches)
    }

    #[test]
    fn snapshot_matches_definition() {
        let cache = FieldSourceDefinitionCache::new();
        let definition = cache.get(FieldSourceTypeId::Security);
        let entity = Rc::new(InMemoryEntity::<SecurityField>::new("BHP.AX"));
        entity.set(SecurityField::Last, ValueContent::Number(Some(44.5)));

        let mut source = EntityValueSource::new(Rc::clone(&definition), Rc::clone(&entity));
        let (sink, _) = collecting_sink();
        let snapshot = source.activate(sink);

        assert_eq!(snapshot.len(), definition.field_count());
        for (value, field) in snapshot.iter().zip(definition.fields()) {
            assert_eq!(value.data_type(), field.data_type());
        }
        assert_eq!(snapshot[0].display(), "44.5");
        assert!(source.is_active());
        assert_eq!(entity.subscriber_count(), 1);
    }

    #[test]
    fn stale_entity_stamps_every_loaded_value() {
        let cache = FieldSourceDefinitionCache::new();
        let entity = Rc::new(InMemoryEntity::<SecurityField>::new("BHP.AX"));
        entity.set_correctness(Correctness::Suspect);
        let source = EntityValueSource::new(cache.get(FieldSourceTypeId::Security), entity);
        assert!(
            source
                .get_all_values()
                .iter()
                .all(|value| value.correctness() == Correctness::Suspect)
        );
    }

    #[test]
    fn deactivate_is_idempotent_and_unsubscribes() {
        let cache = FieldSourceDefinitionCache::new();
        let entity = Rc::new(InMemoryEntity::<SecurityField>::new("BHP.AX"));
        let mut source =
            EntityValueSource::new(cache.get(FieldSourceTypeId::Security), Rc::clone(&entity));
        let (sink, batches) = collecting_sink();
        source.activate(sink);
        source.deactivate();
        source.deactivate();
        assert!(!source.is_active());
        assert_eq!(entity.subscriber_count(), 0);

        entity.set(SecurityField::Bid, ValueContent::Number(Some(1.0)));
        assert!(batches.borrow().is_empty());
    }

    #[test]
    #[should_panic(expected = "activated twice")]
    fn double_activation_fails_loudly() {
        let cache = FieldSourceDefinitionCache::new();
        let entity = Rc::new(InMemoryEntity::<SecurityField>::new("BHP.AX"));
        let mut source = EntityValueSource::new(cache.get(FieldSourceTypeId::Security), entity);
        let (sink, _) = collecting_sink();
        source.activate(Rc::clone(&sink));
        source.activate(sink);
    }

    #[test]
    #[should_panic(expected = "activated after deactivation")]
    fn reactivation_fails_loudly() {
        let cache = FieldSourceDefinitionCache::new();
        let entity = Rc::new(InMemoryEntity::<SecurityField>::new("BHP.AX"));
        let mut source = EntityValueSource::new(cache.get(FieldSourceTypeId::Security), entity);
        let (sink, _) = collecting_sink();
        source.activate(Rc::clone(&sink));
        source.deactivate();
        source.activate(sink);
    }

    #[test]
    fn dropping_an_active_source_unsubscribes() {
        let cache = FieldSourceDefinitionCache::new();
        let entity = Rc::new(InMemoryEntity::<SecurityField>::new("BHP.AX"));
        {
            let mut source = EntityValueSource::new(
                cache.get(FieldSourceTypeId::Security),
                Rc::clone(&entity),
            );
            let (sink, _) = collecting_sink();
            source.activate(sink);
            assert_eq!(entity.subscriber_count(), 1);
        }
        assert_eq!(entity.subscriber_count(), 0);
    }
}
