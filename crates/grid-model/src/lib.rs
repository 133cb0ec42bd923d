//! Schema and value types for the grid binding engine.
//!
//! Everything here is plain data: field source definitions and their cache,
//! typed values, data-quality states and grid layout definitions. The live
//! parts (subscriptions, records, record sources) live in `grid-core`.

pub mod cache;
pub mod correctness;
pub mod definition;
pub mod error;
pub mod field;
pub mod layout;
pub mod sources;
pub mod value;

pub use cache::FieldSourceDefinitionCache;
pub use correctness::{Badness, Correctness};
pub use definition::FieldSourceDefinition;
pub use error::{ModelError, Result};
pub use field::{Field, FieldDataType, TextAlign};
pub use layout::{GridLayoutDefinition, LayoutColumn, ResolvedColumn};
pub use sources::{
    ChannelField, DomainFieldId, FieldSourceTypeId, ScanMatchField, SecurityField, SymbolField,
};
pub use value::{EnumValue, RenderAttribute, Value, ValueContent};
