use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derive_more::Display;
use sea_orm::DbErr;

/// Failure of a ticket, group, comment or lookup operation.
#[derive(Debug, Display)]
pub enum ServiceError {
    /// Input rejected; the message is shown to the user.
    #[display(fmt = "{}", _0)]
    Invalid(String),
    #[display(fmt = "Record not found")]
    NotFound,
    #[display(fmt = "Record is locked")]
    Locked,
    #[display(fmt = "Insufficient permissions")]
    Forbidden,
    #[display(fmt = "Database error: {}", _0)]
    Db(DbErr),
}

impl std::error::Error for ServiceError {}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        ServiceError::Db(err)
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Invalid(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Locked => StatusCode::LOCKED,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ServiceError::Db(err) => {
                log::error!("database error: {}", err);
                "Internal server error".to_owned()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(message)
    }
}
