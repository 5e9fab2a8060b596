// src/core/attendance/types.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::location::GeoPoint;
use crate::utils::error::{AttendanceError, Result};

pub type RecordId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ClassMode {
    Online,
    Offline,
}

impl ClassMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassMode::Online => "online",
            ClassMode::Offline => "offline",
        }
    }
}

impl fmt::Display for ClassMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassMode {
    type Err = AttendanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "online" => Ok(ClassMode::Online),
            "offline" => Ok(ClassMode::Offline),
            other => Err(AttendanceError::InvalidMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for ClassMode {
    type Error = AttendanceError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSession {
    pub id: Uuid,
    pub name: String,
    pub mode: ClassMode,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
}

impl ClassSession {
    pub fn new(
        name: impl Into<String>,
        mode: ClassMode,
        scheduled_at: DateTime<Utc>,
        room: Option<String>,
    ) -> Result<Self> {
        let session = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            mode,
            scheduled_at,
            room,
            coordinates: None,
        };
        session.validate()?;
        Ok(session)
    }

    pub fn with_coordinates(mut self, coordinates: GeoPoint) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    /// Offline classes happen in a room; online classes need none.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AttendanceError::InvalidSession("class name is empty".into()));
        }

        let has_room = self.room.as_deref().map_or(false, |room| !room.trim().is_empty());
        if self.mode == ClassMode::Offline && !has_room {
            return Err(AttendanceError::InvalidSession(
                "offline classes require a room".into(),
            ));
        }

        if let Some(coordinates) = &self.coordinates {
            if !coordinates.is_valid() {
                return Err(AttendanceError::InvalidSession(format!(
                    "classroom coordinates out of range: ({}, {})",
                    coordinates.latitude, coordinates.longitude
                )));
            }
        }

        Ok(())
    }
}

/// Signals gathered during one check-in attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationEvidence {
    pub qr_scans_completed: u32,
    pub face_verified: bool,
}

impl VerificationEvidence {
    pub fn new(qr_scans_completed: u32, face_verified: bool) -> Self {
        Self {
            qr_scans_completed,
            face_verified,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInState {
    #[default]
    CheckedOut,
    CheckedIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    QrCode,
    FaceRecognition,
}

impl VerificationMethod {
    pub fn for_mode(mode: ClassMode) -> Self {
        match mode {
            ClassMode::Online => VerificationMethod::QrCode,
            ClassMode::Offline => VerificationMethod::FaceRecognition,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub user_id: Uuid,
    pub class_id: Uuid,
    pub verified_at: DateTime<Utc>,
    pub confidence: f32,
    pub method: VerificationMethod,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub device_info: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub user_id: Uuid,
    pub status: AttendanceStatus,
    pub checked_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    pub present: usize,
    pub total: usize,
    pub rate: f64,
}

impl AttendanceSummary {
    pub fn new(present: usize, total: usize) -> Self {
        let rate = if total == 0 {
            0.0
        } else {
            present as f64 / total as f64 * 100.0
        };
        Self { present, total, rate }
    }
}
