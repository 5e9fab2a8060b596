// src/utils/error.rs
use thiserror::Error;
use uuid::Uuid;

use crate::core::attendance::types::ClassMode;
use crate::storage::StorageError;

/// Failures of the capabilities the core calls into. These are surfaced
/// unchanged; the core has no recovery strategy for them.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Camera unavailable: {0}")]
    Camera(String),

    #[error("Store unavailable: {0}")]
    Store(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("Invalid class mode: {0}")]
    InvalidMode(String),

    #[error("Invalid class session: {0}")]
    InvalidSession(String),

    #[error("Class session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Cannot check in to {mode} class: {reason}")]
    NotEligible { mode: ClassMode, reason: String },

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("No enrolled face found for user {0}")]
    NoEnrollmentFound(Uuid),

    #[error("No face detected")]
    NoFaceDetected,

    #[error("Invalid reported location: {0}")]
    InvalidLocation(String),

    #[error("Location is {distance_m:.0} m from the classroom, limit is {radius_m:.0} m")]
    LocationOutOfRange { distance_m: f64, radius_m: f64 },

    #[error(transparent)]
    CapabilityUnavailable(#[from] CapabilityError),
}

impl From<StorageError> for AttendanceError {
    fn from(error: StorageError) -> Self {
        AttendanceError::CapabilityUnavailable(CapabilityError::Store(error))
    }
}

pub type Result<T> = std::result::Result<T, AttendanceError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization error: {0}")]
    Init(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Attendance(#[from] AttendanceError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
