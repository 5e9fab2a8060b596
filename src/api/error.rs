// src/api/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};

use super::types::ErrorResponse;
use crate::utils::error::AttendanceError;

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::InvalidMode(_)
            | AttendanceError::InvalidSession(_)
            | AttendanceError::InvalidDescriptor(_)
            | AttendanceError::InvalidLocation(_)
            | AttendanceError::NoFaceDetected => StatusCode::BAD_REQUEST,
            AttendanceError::LocationOutOfRange { .. } => StatusCode::FORBIDDEN,
            AttendanceError::NoEnrollmentFound(_) | AttendanceError::SessionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AttendanceError::NotEligible { .. } => StatusCode::CONFLICT,
            AttendanceError::CapabilityUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}
