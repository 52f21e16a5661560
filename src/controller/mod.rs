pub mod check_reputation;
pub mod outbox;
pub mod status;
pub mod version;
