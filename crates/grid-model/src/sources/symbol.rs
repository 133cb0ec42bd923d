use crate::definition::FieldSourceDefinition;
use crate::field::FieldDataType;
use crate::sources::{DomainFieldId, FieldSourceTypeId};

/// Identity fields of a listed instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolField {
    Code,
    Market,
    Name,
    Isin,
    Class,
    ListingDate,
}

impl DomainFieldId for SymbolField {
    const ALL: &'static [Self] = &[
        SymbolField::Code,
        SymbolField::Market,
        SymbolField::Name,
        SymbolField::Isin,
        SymbolField::Class,
        SymbolField::ListingDate,
    ];

    fn ordinal(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            SymbolField::Code => "Code",
            SymbolField::Market => "Market",
            SymbolField::Name => "Name",
            SymbolField::Isin => "Isin",
            SymbolField::Class => "Class",
            SymbolField::ListingDate => "ListingDate",
        }
    }

    fn heading(self) -> &'static str {
        match self {
            SymbolField::Code => "Code",
            SymbolField::Market => "Market",
            SymbolField::Name => "Name",
            SymbolField::Isin => "ISIN",
            SymbolField::Class => "Class",
            SymbolField::ListingDate => "Listed",
        }
    }

    fn data_type(self) -> FieldDataType {
        match self {
            SymbolField::Code | SymbolField::Name | SymbolField::Isin => FieldDataType::Text,
            SymbolField::Market | SymbolField::Class => FieldDataType::Enumeration,
            SymbolField::ListingDate => FieldDataType::Date,
        }
    }
}

pub(crate) fn definition() -> FieldSourceDefinition {
    FieldSourceDefinition::build(
        FieldSourceTypeId::Symbol,
        &[],
        &[SymbolField::Code],
    )
}
