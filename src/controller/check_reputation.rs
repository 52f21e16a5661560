use actix_web::{post, web, Responder};
use tracing::info;

use crate::{
    configuration::{AppState, State},
    error::Error,
    provider::LedgerClient,
    types::{CheckReputationRequest, CheckReputationResponse},
};

#[post("/check-reputation")]
async fn index(
    state: web::Data<AppState<State>>,
    data: web::Json<CheckReputationRequest>,
) -> Result<impl Responder, Error> {
    let address = data.address.trim();

    if address.is_empty() {
        return Err(Error::FieldNotExist(String::from("address")));
    }

    let id = state
        .chain
        .check_reputation(&state.config.relay_account, address)
        .await?;

    info!("Reputation check {} requested for {}", id, address);

    Ok(web::Json(CheckReputationResponse { id }))
}
