use actix_web::{get, web, Responder};
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[get("/version")]
async fn index() -> Result<impl Responder, Error> {
    Ok(web::Json(Response {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response<'a> {
    pub name: &'a str,
    pub version: &'a str,
}
