use actix_web::{body, http::StatusCode, HttpResponse};
use sea_orm::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed input, amount out of bounds, duplicate unique value
    #[error("{0}")]
    Validation(String),

    /// Referenced row does not exist, or is inactive where activity is required
    #[error("{0}")]
    NotFound(String),

    /// The request clashes with current state (double clock-in, leadership already held, ...)
    #[error("{0}")]
    Conflict(String),

    #[error("invalid admin PIN")]
    Unauthorized,

    #[error("database failure: {0}")]
    Database(#[source] DbErr),
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                Error::Conflict("conflicts with an existing record".to_owned())
            }
            _ => Error::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl actix_web::error::ResponseError for Error {
    fn error_response(&self) -> HttpResponse<body::BoxBody> {
        let error = match self {
            Error::Database(err) => {
                tracing::error!(error = %err, "request failed on the database");

                "internal server error".to_owned()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code())
            .json(ErrorBody { error })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
