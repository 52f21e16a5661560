mod memory;
mod postgre;
mod store;

pub use memory::MemoryOutbox;
pub use postgre::{get_path, PoolOption, PoolType};
pub use store::{OutboxStore, LEDGER_CURSOR};
