//! Field source types and the domain field catalogs behind them.
//!
//! Each field source type is backed by one domain entity type whose field
//! identifiers implement [`DomainFieldId`]. Metadata for every identifier is
//! resolved through an exhaustive `match`, so adding an identifier without
//! naming it fails to compile.
//!
//! # Field source types
//!
//! | Type | Entity | Notes |
//! |------|--------|-------|
//! | `Symbol` | listed instrument identity | static, no validity flag |
//! | `Security` | live price/depth summary | validity via `Correctness` |
//! | `NotificationChannel` | alert delivery channel | validity via `Valid` |
//! | `ScanMatch` | one scan result row | validity via `Valid` |

pub mod channel;
pub mod scan;
pub mod security;
pub mod symbol;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::definition::FieldSourceDefinition;
use crate::error::ModelError;
use crate::field::{FieldDataType, TextAlign};

pub use channel::ChannelField;
pub use scan::ScanMatchField;
pub use security::SecurityField;
pub use symbol::SymbolField;

/// Identifier of one field of a domain entity.
///
/// `ALL` lists every identifier in ordinal order; a field source definition
/// is built by walking it.
pub trait DomainFieldId: Copy + Eq + fmt::Debug + 'static {
    const ALL: &'static [Self];

    /// Position of the identifier in `ALL`.
    fn ordinal(self) -> usize;
    fn name(self) -> &'static str;
    fn heading(self) -> &'static str;
    fn data_type(self) -> FieldDataType;

    fn align(self) -> TextAlign {
        self.data_type().default_align()
    }

    /// Returns true for the entity's own validity/correctness flag.
    fn is_validity(self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldSourceTypeId {
    Symbol,
    Security,
    NotificationChannel,
    ScanMatch,
}

impl FieldSourceTypeId {
    pub const ALL: &'static [FieldSourceTypeId] = &[
        FieldSourceTypeId::Symbol,
        FieldSourceTypeId::Security,
        FieldSourceTypeId::NotificationChannel,
        FieldSourceTypeId::ScanMatch,
    ];

    /// Persisted name, also the prefix of every field name in the source.
    pub fn name(&self) -> &'static str {
        match self {
            FieldSourceTypeId::Symbol => "Symbol",
            FieldSourceTypeId::Security => "Security",
            FieldSourceTypeId::NotificationChannel => "NotificationChannel",
            FieldSourceTypeId::ScanMatch => "ScanMatch",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            FieldSourceTypeId::Symbol => "Symbol",
            FieldSourceTypeId::Security => "Security data",
            FieldSourceTypeId::NotificationChannel => "Notification channel",
            FieldSourceTypeId::ScanMatch => "Scan match",
        }
    }

    /// Build the definition for this type. Called once per type by the cache.
    pub(crate) fn build_definition(&self) -> FieldSourceDefinition {
        match self {
            FieldSourceTypeId::Symbol => symbol::definition(),
            FieldSourceTypeId::Security => security::definition(),
            FieldSourceTypeId::NotificationChannel => channel::definition(),
            FieldSourceTypeId::ScanMatch => scan::definition(),
        }
    }
}

impl fmt::Display for FieldSourceTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldSourceTypeId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        FieldSourceTypeId::ALL
            .iter()
            .copied()
            .find(|type_id| type_id.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ModelError::UnknownFieldSource(s.to_string()))
    }
}
