//! Database models: relay outbox rows and the event cursor.

mod models;
mod table;

pub use models::*;

pub use table::Table;
