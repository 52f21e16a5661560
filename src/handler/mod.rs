pub mod check_reputation;
pub mod outbox_forward;
pub mod outbox_recovery;
pub mod reputation_received;
