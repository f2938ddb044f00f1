//! Record store: typed collections, settings and session data on top of
//! the cache layer.

mod session;
mod store;
mod validate;

pub use store::{RecordStore, Records};
pub use validate::{validate_appointment, validate_user};
