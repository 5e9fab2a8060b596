// src/api/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{
    attendance::{ClassMode, GeoPoint, VerificationEvidence},
    identity::{Descriptor, EnrolledBiometric},
    services::CheckInContext,
};

#[derive(Debug, Deserialize, Serialize)]
pub struct EnrollRequest {
    /// `None` when the client-side detector found no face.
    pub descriptor: Option<Descriptor>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EnrollmentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub is_current: bool,
    pub enrolled_at: DateTime<Utc>,
}

impl From<&EnrolledBiometric> for EnrollmentResponse {
    fn from(enrollment: &EnrolledBiometric) -> Self {
        Self {
            id: enrollment.id,
            user_id: enrollment.user_id,
            is_current: enrollment.is_current,
            enrolled_at: enrollment.enrolled_at,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ScheduleSessionRequest {
    pub name: String,
    pub mode: ClassMode,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ScanRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EvidenceResponse {
    pub user_id: Uuid,
    pub class_id: Uuid,
    pub evidence: VerificationEvidence,
    pub can_check_in: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct FaceVerificationRequest {
    pub user_id: Uuid,
    pub descriptor: Option<Descriptor>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ToggleRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub context: CheckInContext,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RosterRequest {
    pub students: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
