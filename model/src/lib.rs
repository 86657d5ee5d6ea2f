//! Data model shared by every layer of the engine: [EventType]s describe how to
//! recognize an event, [Event]s are what gets extracted, [LogSourceFile] addresses
//! where it came from. No scanning, matching, or export logic lives here -- see
//! the `dal`/`bll`/`presentation` crates for that.

pub mod event;
pub mod event_type;
pub mod log_source;

pub use event::{Event, SystemFields, RESERVED_FIELD_NAMES};
pub use event_type::{EventType, EventTypeRegistry, EventTypeSpec, TimestampDescriptor};
pub use log_source::{LogSource, LogSourceFile};
