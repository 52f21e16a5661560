pub use self::{
    path::get_path,
    types::{PoolOption, PoolType},
};

mod path;
mod relay_cursor;
mod reputation_outbox;
mod types;
