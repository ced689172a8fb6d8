//! Event log and the snapshot model.
//!
//! Every mutation of a season is recorded as an [`Event`] holding value
//! copies of each touched track before and after the change. Readers such
//! as statistics can recompute aggregates by walking the log forward without
//! consulting the registry.

mod event;
mod log;
mod verify;

pub use event::{Event, EventDetail, EventKind, SideEffect};
pub use log::{EventFilter, EventLog, Order};
pub use verify::{verify_log, IntegrityError};
