//! Definition cache: at most one live [`FieldSourceDefinition`] per type.
//!
//! The cache is constructed explicitly and passed to whatever needs it.
//! `get` is idempotent and reference stable, so callers may compare
//! definitions with [`Rc::ptr_eq`].

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::definition::FieldSourceDefinition;
use crate::error::Result;
use crate::field::Field;
use crate::layout::{GridLayoutDefinition, LayoutColumn};
use crate::sources::FieldSourceTypeId;

#[derive(Debug, Default)]
pub struct FieldSourceDefinitionCache {
    definitions: RefCell<BTreeMap<FieldSourceTypeId, Rc<FieldSourceDefinition>>>,
}

impl FieldSourceDefinitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The definition for `type_id`, built on first request.
    pub fn get(&self, type_id: FieldSourceTypeId) -> Rc<FieldSourceDefinition> {
        if let Some(definition) = self.definitions.borrow().get(&type_id) {
            return Rc::clone(definition);
        }
        let definition = Rc::new(type_id.build_definition());
        debug!(
            source = type_id.name(),
            fields = definition.field_count(),
            unsupported = definition.unsupported_field_count(),
            "built field source definition"
        );
        self.definitions
            .borrow_mut()
            .insert(type_id, Rc::clone(&definition));
        definition
    }

    pub fn get_by_name(&self, name: &str) -> Result<Rc<FieldSourceDefinition>> {
        let type_id: FieldSourceTypeId = name.parse()?;
        Ok(self.get(type_id))
    }

    /// Number of definitions built so far.
    pub fn len(&self) -> usize {
        self.definitions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.borrow().is_empty()
    }

    /// Resolve a qualified field name against the allowed sources.
    pub fn find_field(&self, allowed: &[FieldSourceTypeId], name: &str) -> Option<Field> {
        allowed
            .iter()
            .find_map(|&type_id| self.get(type_id).find_field(name).cloned())
    }

    /// Layout listing `names` in order. Names no allowed source declares are
    /// dropped with a warning.
    pub fn create_from_field_names<S: AsRef<str>>(
        &self,
        allowed: &[FieldSourceTypeId],
        names: &[S],
    ) -> GridLayoutDefinition {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if self.find_field(allowed, name).is_some() {
                columns.push(LayoutColumn::new(name));
            } else {
                warn!(field = name, "dropping unknown layout field");
            }
        }
        GridLayoutDefinition::from_columns(columns)
    }

    /// Concatenated default layouts of the given sources.
    pub fn create_default_layout_definition(
        &self,
        sources: &[FieldSourceTypeId],
    ) -> GridLayoutDefinition {
        let columns = sources
            .iter()
            .flat_map(|&type_id| {
                self.get(type_id)
                    .create_default_layout_definition()
                    .columns()
                    .to_vec()
            })
            .collect();
        GridLayoutDefinition::from_columns(columns)
    }
}
