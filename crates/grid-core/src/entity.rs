//! Domain entities: the live objects a value source reads from.

use std::cell::{Cell, RefCell};
use std::fmt;

use grid_model::{Correctness, DomainFieldId, EnumValue, FieldDataType, ValueContent};

use crate::signal::{Signal, SubscriptionId};

/// One live domain object (a security, a notification channel, ...).
///
/// Implementations raise a batched "these fields changed" notification after
/// every mutation. The batch may list identifiers no field source exposes and
/// may be empty; subscribers must cope with both.
pub trait DomainEntity {
    type FieldId: DomainFieldId;

    fn correctness(&self) -> Correctness;

    /// Current content of `field`.
    fn load(&self, field: Self::FieldId) -> ValueContent;

    fn subscribe_fields_changed(
        &self,
        handler: Box<dyn Fn(&[Self::FieldId])>,
    ) -> SubscriptionId;

    fn unsubscribe_fields_changed(&self, id: SubscriptionId);
}

/// Entity holding one content slot per domain field, mutated in place.
///
/// Mutations inside `begin_change`/`end_change` are collected and raised as
/// one notification when the outermost batch ends.
pub struct InMemoryEntity<F: DomainFieldId> {
    key: String,
    values: RefCell<Vec<ValueContent>>,
    correctness: Cell<Correctness>,
    batch_depth: Cell<usize>,
    pending: RefCell<Vec<F>>,
    /// A batch raised a change with no field to list.
    pending_empty: Cell<bool>,
    changed: Signal<[F]>,
}

impl<F: DomainFieldId> InMemoryEntity<F> {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: RefCell::new(
                F::ALL
                    .iter()
                    .map(|id| ValueContent::empty(id.data_type()))
                    .collect(),
            ),
            correctness: Cell::new(Correctness::Good),
            batch_depth: Cell::new(0),
            pending: RefCell::new(Vec::new()),
            pending_empty: Cell::new(false),
            changed: Signal::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Store `content` for `field`. Setting an equal value raises nothing.
    ///
    /// # Panics
    ///
    /// Panics if the content type does not match the field's data type.
    pub fn set(&self, field: F, content: ValueContent) {
        assert_eq!(
            content.data_type(),
            field.data_type(),
            "{field:?} holds {} values",
            field.data_type()
        );
        {
            let mut values = self.values.borrow_mut();
            let slot = &mut values[field.ordinal()];
            if *slot == content {
                return;
            }
            *slot = content;
        }
        self.raise(field);
    }

    /// Change the entity's correctness.
    ///
    /// The change is raised against the catalog's validity field, whose
    /// content mirrors the new state. Catalogs without one raise an empty
    /// change so subscribers still hear about it.
    pub fn set_correctness(&self, correctness: Correctness) {
        if self.correctness.get() == correctness {
            return;
        }
        self.correctness.set(correctness);
        match F::ALL.iter().copied().find(|id| id.is_validity()) {
            Some(validity) => {
                self.values.borrow_mut()[validity.ordinal()] =
                    validity_content(validity.data_type(), correctness);
                self.raise(validity);
            }
            None if self.batch_depth.get() > 0 => self.pending_empty.set(true),
            None => self.changed.notify(&[]),
        }
    }

    pub fn begin_change(&self) {
        self.batch_depth.set(self.batch_depth.get() + 1);
    }

    /// # Panics
    ///
    /// Panics without a matching `begin_change`.
    pub fn end_change(&self) {
        let depth = self.batch_depth.get();
        assert!(depth > 0, "end_change without begin_change on {}", self.key);
        self.batch_depth.set(depth - 1);
        if depth == 1 {
            let pending = self.pending.take();
            if !pending.is_empty() || self.pending_empty.replace(false) {
                self.changed.notify(&pending);
            }
        }
    }

    /// Raise a change for `fields` as-is, bypassing the stored values.
    pub fn notify_changed(&self, fields: &[F]) {
        self.changed.notify(fields);
    }

    pub fn subscriber_count(&self) -> usize {
        self.changed.listener_count()
    }

    fn raise(&self, field: F) {
        if self.batch_depth.get() > 0 {
            let mut pending = self.pending.borrow_mut();
            if !pending.contains(&field) {
                pending.push(field);
            }
        } else {
            self.changed.notify(&[field]);
        }
    }
}

fn validity_content(data_type: FieldDataType, correctness: Correctness) -> ValueContent {
    match data_type {
        FieldDataType::Boolean => ValueContent::Boolean(Some(correctness.is_good())),
        FieldDataType::Enumeration => ValueContent::Enumeration(Some(EnumValue::new(
            correctness as u32,
            correctness.as_str(),
        ))),
        FieldDataType::Integer => ValueContent::Integer(Some(i64::from(correctness as u32))),
        _ => ValueContent::text(correctness.as_str()),
    }
}

impl<F: DomainFieldId> DomainEntity for InMemoryEntity<F> {
    type FieldId = F;

    fn correctness(&self) -> Correctness {
        self.correctness.get()
    }

    fn load(&self, field: F) -> ValueContent {
        self.values.borrow()[field.ordinal()].clone()
    }

    fn subscribe_fields_changed(&self, handler: Box<dyn Fn(&[F])>) -> SubscriptionId {
        self.changed.subscribe(handler)
    }

    fn unsubscribe_fields_changed(&self, id: SubscriptionId) {
        self.changed.unsubscribe(id);
    }
}

impl<F: DomainFieldId> fmt::Debug for InMemoryEntity<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryEntity")
            .field("key", &self.key)
            .field("correctness", &self.correctness.get())
            .field("subscribers", &self.changed.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_model::{ChannelField, SecurityField, SymbolField};
    use std::rc::Rc;

    fn recorder<F: DomainFieldId>(entity: &InMemoryEntity<F>) -> Rc<RefCell<Vec<Vec<F>>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        entity.subscribe_fields_changed(Box::new(move |ids: &[F]| {
            sink.borrow_mut().push(ids.to_vec());
        }));
        seen
    }

    #[test]
    fn batch_raises_one_notification() {
        let entity = InMemoryEntity::<SecurityField>::new("BHP.AX");
        let seen = recorder(&entity);

        entity.begin_change();
        entity.set(SecurityField::Bid, ValueContent::Number(Some(44.1)));
        entity.set(SecurityField::Ask, ValueContent::Number(Some(44.2)));
        entity.set(SecurityField::Bid, ValueContent::Number(Some(44.0)));
        entity.end_change();

        assert_eq!(
            *seen.borrow(),
            vec![vec![SecurityField::Bid, SecurityField::Ask]]
        );
    }

    #[test]
    fn equal_value_is_not_raised() {
        let entity = InMemoryEntity::<SymbolField>::new("CBA");
        let seen = recorder(&entity);
        entity.set(SymbolField::Code, ValueContent::text("CBA"));
        entity.set(SymbolField::Code, ValueContent::text("CBA"));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn correctness_raises_validity_field() {
        let entity = InMemoryEntity::<ChannelField>::new("email");
        let seen = recorder(&entity);
        entity.set_correctness(Correctness::Error);
        assert_eq!(*seen.borrow(), vec![vec![ChannelField::Valid]]);
        assert_eq!(
            entity.load(ChannelField::Valid),
            ValueContent::Boolean(Some(false))
        );
        assert_eq!(entity.correctness(), Correctness::Error);
    }

    #[test]
    fn correctness_without_validity_field_raises_empty_change() {
        let entity = InMemoryEntity::<SymbolField>::new("CBA");
        let seen = recorder(&entity);
        entity.set_correctness(Correctness::Suspect);
        assert_eq!(*seen.borrow(), vec![Vec::<SymbolField>::new()]);
    }

    #[test]
    #[should_panic(expected = "holds Number values")]
    fn mistyped_content_fails_loudly() {
        let entity = InMemoryEntity::<SecurityField>::new("BHP.AX");
        entity.set(SecurityField::Last, ValueContent::text("44"));
    }
}
