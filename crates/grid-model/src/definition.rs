//! Field source definitions: the ordered field list one domain entity type
//! contributes to a row.
//!
//! A definition is built once per [`FieldSourceTypeId`] by walking the
//! entity's domain field catalog, skipping identifiers the source does not
//! expose and assigning dense zero-based indices to the rest. The reverse
//! lookup (domain ordinal -> field index) is built at the same time so value
//! sources can map change notifications in constant time.
//!
//! Definitions are schema: they are never mutated after construction and may
//! be shared by any number of record sources.

use std::any::TypeId;

use crate::field::Field;
use crate::layout::{GridLayoutDefinition, LayoutColumn};
use crate::sources::{DomainFieldId, FieldSourceTypeId};

#[derive(Debug)]
pub struct FieldSourceDefinition {
    type_id: FieldSourceTypeId,
    field_id_type: TypeId,
    fields: Vec<Field>,
    /// Indexed by domain ordinal; `None` marks an unsupported identifier.
    index_by_ordinal: Vec<Option<usize>>,
    ordinal_by_index: Vec<usize>,
    validity_ordinal: Option<usize>,
    default_layout: Vec<usize>,
}

impl FieldSourceDefinition {
    /// Build a definition from the domain catalog of `F`.
    ///
    /// # Panics
    ///
    /// Panics if the catalog is out of ordinal order, if two fields end up
    /// with the same name, or if a default layout field is unsupported.
    pub fn build<F: DomainFieldId>(
        type_id: FieldSourceTypeId,
        unsupported: &[F],
        default_layout: &[F],
    ) -> Self {
        let mut fields: Vec<Field> = Vec::with_capacity(F::ALL.len());
        let mut index_by_ordinal = vec![None; F::ALL.len()];
        let mut ordinal_by_index = Vec::with_capacity(F::ALL.len());
        let mut validity_ordinal = None;

        for (ordinal, &id) in F::ALL.iter().enumerate() {
            assert_eq!(
                id.ordinal(),
                ordinal,
                "{type_id} catalog out of order at {id:?}"
            );
            if id.is_validity() {
                validity_ordinal = Some(ordinal);
            }
            if unsupported.contains(&id) {
                continue;
            }
            let name = format!("{}_{}", type_id.name(), id.name());
            assert!(
                !fields.iter().any(|field| field.name() == name),
                "duplicate field {name} in {type_id}"
            );
            let index = fields.len();
            fields.push(Field::new(
                name,
                id.heading(),
                id.data_type(),
                id.align(),
                type_id,
                index,
            ));
            index_by_ordinal[ordinal] = Some(index);
            ordinal_by_index.push(ordinal);
        }

        let default_layout = default_layout
            .iter()
            .map(|id| {
                index_by_ordinal[id.ordinal()]
                    .unwrap_or_else(|| panic!("default layout field {id:?} is unsupported"))
            })
            .collect();

        Self {
            type_id,
            field_id_type: TypeId::of::<F>(),
            fields,
            index_by_ordinal,
            ordinal_by_index,
            validity_ordinal,
            default_layout,
        }
    }

    pub fn type_id(&self) -> FieldSourceTypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.type_id.name()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Number of identifiers in the domain catalog, exposed or not.
    pub fn domain_field_count(&self) -> usize {
        self.index_by_ordinal.len()
    }

    pub fn unsupported_field_count(&self) -> usize {
        self.domain_field_count() - self.field_count()
    }

    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn field(&self, index: usize) -> &Field {
        self.fields.get(index).unwrap_or_else(|| {
            panic!(
                "field index {index} out of range for {} ({} fields)",
                self.type_id,
                self.fields.len()
            )
        })
    }

    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Dense field index for a domain ordinal, `None` when not exposed.
    pub fn index_of_ordinal(&self, ordinal: usize) -> Option<usize> {
        self.index_by_ordinal.get(ordinal).copied().flatten()
    }

    /// Domain ordinal behind a dense field index.
    pub fn ordinal_of(&self, index: usize) -> usize {
        self.ordinal_by_index[index]
    }

    /// Returns true when the source is built from `F`'s catalog.
    pub fn is_for<F: DomainFieldId>(&self) -> bool {
        self.field_id_type == TypeId::of::<F>()
    }

    pub fn index_of<F: DomainFieldId>(&self, id: F) -> Option<usize> {
        self.assert_field_id_type::<F>();
        self.index_of_ordinal(id.ordinal())
    }

    /// Domain identifier behind a dense field index.
    pub fn field_id<F: DomainFieldId>(&self, index: usize) -> F {
        self.assert_field_id_type::<F>();
        F::ALL[self.ordinal_of(index)]
    }

    /// Name of the field exposing `id`.
    ///
    /// # Panics
    ///
    /// Panics if the source deliberately excludes `id`.
    pub fn field_name_of<F: DomainFieldId>(&self, id: F) -> &str {
        self.exposed_field(id).name()
    }

    /// Heading of the field exposing `id`.
    ///
    /// # Panics
    ///
    /// Panics if the source deliberately excludes `id`.
    pub fn heading_of<F: DomainFieldId>(&self, id: F) -> &str {
        self.exposed_field(id).heading()
    }

    pub fn validity_ordinal(&self) -> Option<usize> {
        self.validity_ordinal
    }

    pub fn is_validity_ordinal(&self, ordinal: usize) -> bool {
        self.validity_ordinal == Some(ordinal)
    }

    /// Layout listing the fields for `ids`, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if any identifier is excluded from this source.
    pub fn create_layout_definition<F: DomainFieldId>(&self, ids: &[F]) -> GridLayoutDefinition {
        GridLayoutDefinition::from_columns(
            ids.iter()
                .map(|&id| LayoutColumn::new(self.field_name_of(id)))
                .collect(),
        )
    }

    /// Minimal layout so a new grid shows something without configuration.
    pub fn create_default_layout_definition(&self) -> GridLayoutDefinition {
        GridLayoutDefinition::from_columns(
            self.default_layout
                .iter()
                .map(|&index| LayoutColumn::new(self.fields[index].name()))
                .collect(),
        )
    }

    fn exposed_field<F: DomainFieldId>(&self, id: F) -> &Field {
        let index = self
            .index_of(id)
            .unwrap_or_else(|| panic!("{id:?} is not exposed by {}", self.type_id));
        &self.fields[index]
    }

    fn assert_field_id_type<F: DomainFieldId>(&self) {
        assert!(
            self.is_for::<F>(),
            "{} does not use {} identifiers",
            self.type_id,
            std::any::type_name::<F>()
        );
    }
}
