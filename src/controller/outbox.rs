use actix_web::{get, web, Responder};

use crate::{
    configuration::{AppState, State},
    dao::OutboxStore,
    error::Error,
};

#[get("/outbox/{id}")]
async fn index(
    state: web::Data<AppState<State>>,
    path: web::Path<i64>,
) -> Result<impl Responder, Error> {
    let id = path.into_inner();
    let row = state
        .database
        .get(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("outbox row {}", id)))?;

    Ok(web::Json(row))
}
