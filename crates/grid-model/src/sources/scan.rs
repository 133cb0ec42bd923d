use crate::definition::FieldSourceDefinition;
use crate::field::FieldDataType;
use crate::sources::{DomainFieldId, FieldSourceTypeId};

/// Fields of one scan match (a symbol that currently satisfies a scan).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanMatchField {
    Rank,
    Symbol,
    Name,
    ScanId,
    ScanName,
    MatchedAt,
    Score,
    Valid,
    Revision,
}

impl DomainFieldId for ScanMatchField {
    const ALL: &'static [Self] = &[
        ScanMatchField::Rank,
        ScanMatchField::Symbol,
        ScanMatchField::Name,
        ScanMatchField::ScanId,
        ScanMatchField::ScanName,
        ScanMatchField::MatchedAt,
        ScanMatchField::Score,
        ScanMatchField::Valid,
        ScanMatchField::Revision,
    ];

    fn ordinal(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            ScanMatchField::Rank => "Rank",
            ScanMatchField::Symbol => "Symbol",
            ScanMatchField::Name => "Name",
            ScanMatchField::ScanId => "ScanId",
            ScanMatchField::ScanName => "ScanName",
            ScanMatchField::MatchedAt => "MatchedAt",
            ScanMatchField::Score => "Score",
            ScanMatchField::Valid => "Valid",
            ScanMatchField::Revision => "Revision",
        }
    }

    fn heading(self) -> &'static str {
        match self {
            ScanMatchField::Rank => "Rank",
            ScanMatchField::Symbol => "Symbol",
            ScanMatchField::Name => "Name",
            ScanMatchField::ScanId => "Scan Id",
            ScanMatchField::ScanName => "Scan",
            ScanMatchField::MatchedAt => "Matched",
            ScanMatchField::Score => "Score",
            ScanMatchField::Valid => "Valid",
            ScanMatchField::Revision => "Revision",
        }
    }

    fn data_type(self) -> FieldDataType {
        match self {
            ScanMatchField::Rank | ScanMatchField::Revision => FieldDataType::Integer,
            ScanMatchField::Symbol
            | ScanMatchField::Name
            | ScanMatchField::ScanId
            | ScanMatchField::ScanName => FieldDataType::Text,
            ScanMatchField::MatchedAt => FieldDataType::Date,
            ScanMatchField::Score => FieldDataType::Number,
            ScanMatchField::Valid => FieldDataType::Boolean,
        }
    }

    fn is_validity(self) -> bool {
        matches!(self, ScanMatchField::Valid)
    }
}

pub(crate) fn definition() -> FieldSourceDefinition {
    FieldSourceDefinition::build(
        FieldSourceTypeId::ScanMatch,
        &[ScanMatchField::Revision],
        &[ScanMatchField::Symbol],
    )
}
