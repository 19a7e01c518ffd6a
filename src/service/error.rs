use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::{error::HttpError, models::caremodel::{JobStatus, TimesheetStatus}};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Care request {0} not found")]
    RequestNotFound(Uuid),

    #[error("Bid {0} not found")]
    BidNotFound(Uuid),

    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Contract {0} not found")]
    ContractNotFound(Uuid),

    #[error("Timesheet {0} not found")]
    TimesheetNotFound(Uuid),

    #[error("Agency profile not found for user {0}")]
    AgencyProfileNotFound(Uuid),

    #[error("Care request {0} is not open for bids")]
    RequestNotOpen(Uuid),

    #[error("User {0} does not own care request {1}")]
    NotRequestOwner(Uuid, Uuid),

    #[error("User {0} is not a party to contract {1}")]
    NotAParty(Uuid, Uuid),

    #[error("User {0} has already signed contract {1}")]
    AlreadySigned(Uuid, Uuid),

    #[error("User {0} is not authorized to perform this action on job {1}")]
    NotAuthorized(Uuid, Uuid),

    #[error("Job {0} is in status {1:?}, which does not allow this action")]
    WrongJobStatus(Uuid, JobStatus),

    #[error("Timesheet {0} is in status {1:?}, which does not allow this action")]
    WrongTimesheetStatus(Uuid, TimesheetStatus),

    #[error("Invalid rate: {0}")]
    InvalidRate(String),

    #[error("Invalid hours: {0}")]
    InvalidHours(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::RequestNotFound(_)
            | ServiceError::BidNotFound(_)
            | ServiceError::JobNotFound(_)
            | ServiceError::ContractNotFound(_)
            | ServiceError::TimesheetNotFound(_)
            | ServiceError::AgencyProfileNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::RequestNotOpen(_)
            | ServiceError::AlreadySigned(_, _)
            | ServiceError::WrongJobStatus(_, _)
            | ServiceError::WrongTimesheetStatus(_, _) => StatusCode::CONFLICT,

            ServiceError::InvalidRate(_)
            | ServiceError::InvalidHours(_)
            | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::NotRequestOwner(_, _)
            | ServiceError::NotAParty(_, _)
            | ServiceError::NotAuthorized(_, _) => StatusCode::FORBIDDEN,

            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        HttpError::new(error.to_string(), error.status_code())
    }
}
