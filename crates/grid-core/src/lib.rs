//! Live binding layer of the grid engine.
//!
//! Data flows along one path: a [`DomainEntity`] raises field changes, its
//! [`ValueSource`] turns them into value changes, the owning [`Record`]
//! re-addresses them into the row's logical field space, and the
//! [`RecordSource`] forwards them to the grid with the row index. List
//! structure and data quality come from a [`BadnessList`].
//!
//! Everything here is single-threaded: shared state is `Rc`/`RefCell` and
//! every notification runs synchronously to completion.

pub mod entity;
pub mod error;
pub mod list;
pub mod record;
pub mod record_source;
pub mod signal;
pub mod value_source;

pub use entity::{DomainEntity, InMemoryEntity};
pub use error::{CoreError, Result};
pub use list::{BadnessList, ListChange, ListLock, ListLocker, ObservableList};
pub use record::{FieldRange, FieldRanges, Record, RecordDefinition, RecordItem, RecordKey};
pub use record_source::{
    RecordSource, RecordSourceDefinition, RecordSourceEvent, ValueSourceFactory,
};
pub use signal::{Signal, SubscriptionId};
pub use value_source::{
    EntityValueSource, ValueChange, ValueChangeKind, ValueChangeSink, ValueSource,
    build_value_changes,
};
