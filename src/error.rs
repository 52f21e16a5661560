use actix_web::{http::StatusCode, ResponseError};
use anyhow::Error as ANYHOW_ERROR;
use reqwest::Error as REQWEST_ERROR;
use serde_json::Error as JSON_ERROR;
use sqlx::error::Error as SQL_ERROR;
use std::num::TryFromIntError as TRY_FROM_INT_ERROR;
use std::{env::VarError, io::Error as IO_ERROR, num::ParseIntError};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::subscriber::SetGlobalDefaultError as TRACING_GLOBAL_DEFAULT_ERROR;
use url::ParseError as URL_ERROR;

use crate::protocol::ProtocolError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IO_ERROR),

    #[error("{0}")]
    URL(#[from] URL_ERROR),

    #[error("{0}")]
    INT(#[from] ParseIntError),

    #[error("{0}")]
    SQL(#[from] SQL_ERROR),

    #[error("{0}")]
    VAR(#[from] VarError),

    #[error("{0}")]
    TokioJoinError(#[from] JoinError),

    #[error("{0}")]
    JsonError(#[from] JSON_ERROR),

    #[error("{0}")]
    Reqwest(#[from] REQWEST_ERROR),

    #[error("{0}")]
    TryFromIntError(#[from] TRY_FROM_INT_ERROR),

    #[error("Tracing error: {0}")]
    SetGlobalDefaultError(#[from] TRACING_GLOBAL_DEFAULT_ERROR),

    #[error("{0}")]
    AnyHowError(#[from] ANYHOW_ERROR),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Field not exists: {0}")]
    FieldNotExist(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Parse message error: {0}")]
    ParseMessage(String),

    #[error("Rpc error: code: {code}, message: {message}")]
    Rpc { code: i64, message: String },

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Failures worth retrying later. Protocol rejections and malformed data
    /// will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Io(_)
            | Error::SQL(_)
            | Error::Reqwest(_)
            | Error::Rpc { .. }
            | Error::Oracle(_)
            | Error::Queue(_) => true,
            Error::Protocol(_)
            | Error::URL(_)
            | Error::INT(_)
            | Error::VAR(_)
            | Error::TokioJoinError(_)
            | Error::JsonError(_)
            | Error::TryFromIntError(_)
            | Error::SetGlobalDefaultError(_)
            | Error::AnyHowError(_)
            | Error::FieldNotExist(_)
            | Error::ConfigurationError(_)
            | Error::ParseMessage(_)
            | Error::NotFound(_) => false,
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Protocol(e) if e.is_authorization() => StatusCode::FORBIDDEN,
            Error::Protocol(_)
            | Error::FieldNotExist(_)
            | Error::ParseMessage(_)
            | Error::JsonError(_)
            | Error::INT(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Rpc { .. }
            | Error::Oracle(_)
            | Error::Queue(_)
            | Error::Reqwest(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_rejections_are_not_retried() {
        assert!(!Error::Protocol(ProtocolError::Not_Authorized).is_transient());
        assert!(!Error::FieldNotExist(String::from("id")).is_transient());
        assert!(Error::Queue(String::from("503")).is_transient());
        assert!(Error::Rpc {
            code: -32000,
            message: String::from("busy")
        }
        .is_transient());
    }

    #[test]
    fn response_status_follows_variant() {
        assert_eq!(
            Error::Protocol(ProtocolError::Not_Authorized).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Error::Protocol(ProtocolError::Empty_Amount).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::NotFound(String::from("7")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::Oracle(String::from("timeout")).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
