use actix_web::{get, web, Responder};

use crate::{
    configuration::{AppState, State},
    dao::OutboxStore,
    error::Error,
    model::OutboxStatus,
    types::{RelayStatus, StatusCount},
};

#[get("/status")]
async fn index(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    let (cursor, counts) = tokio::try_join!(
        state.database.get_cursor(),
        state.database.count_by_status()
    )?;

    Ok(web::Json(relay_status(cursor, counts)))
}

/// Every status is listed, absent ones with a zero count.
pub fn relay_status(cursor: u64, counts: Vec<(String, i64)>) -> RelayStatus {
    let outbox = OutboxStatus::ALL
        .iter()
        .map(|status| {
            let status = status.to_string();
            let count = counts
                .iter()
                .find(|(name, _)| *name == status)
                .map(|(_, count)| *count)
                .unwrap_or(0);
            StatusCount { status, count }
        })
        .collect();

    RelayStatus { cursor, outbox }
}
