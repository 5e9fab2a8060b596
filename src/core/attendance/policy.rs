// src/core/attendance/policy.rs
use std::fmt;

use serde::Serialize;

use super::types::{CheckInState, ClassMode, VerificationEvidence, VerificationMethod};
use crate::utils::config::PolicyConfig;
use crate::utils::error::{AttendanceError, Result};

/// Request for the caller to append an attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordRequest {
    pub method: VerificationMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: CheckInState,
    pub record: Option<RecordRequest>,
    /// Evidence the attempt carries forward. Reset after a check-out.
    pub evidence: VerificationEvidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingEvidence {
    QrScans { completed: u32, required: u32 },
    FaceVerification,
}

impl fmt::Display for MissingEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingEvidence::QrScans { completed, required } => {
                write!(f, "{} of {} QR codes scanned", completed, required)
            }
            MissingEvidence::FaceVerification => f.write_str("face not verified"),
        }
    }
}

/// Decides which evidence permits check-in for each class mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceDecisionPolicy {
    required_online_scans: u32,
    required_offline_scans: u32,
}

impl Default for AttendanceDecisionPolicy {
    fn default() -> Self {
        Self {
            required_online_scans: 3,
            required_offline_scans: 1,
        }
    }
}

impl AttendanceDecisionPolicy {
    pub fn new(config: &PolicyConfig) -> Self {
        Self {
            required_online_scans: config.required_online_scans,
            required_offline_scans: config.required_offline_scans,
        }
    }

    pub fn required_scans(&self, mode: ClassMode) -> u32 {
        match mode {
            ClassMode::Online => self.required_online_scans,
            ClassMode::Offline => self.required_offline_scans,
        }
    }

    pub fn missing_evidence(&self, mode: ClassMode, evidence: &VerificationEvidence) -> Vec<MissingEvidence> {
        let mut missing = Vec::new();

        let required = self.required_scans(mode);
        if evidence.qr_scans_completed < required {
            missing.push(MissingEvidence::QrScans {
                completed: evidence.qr_scans_completed,
                required,
            });
        }

        if mode == ClassMode::Offline && !evidence.face_verified {
            missing.push(MissingEvidence::FaceVerification);
        }

        missing
    }

    pub fn can_check_in(&self, mode: ClassMode, evidence: &VerificationEvidence) -> bool {
        match mode {
            ClassMode::Online => evidence.qr_scans_completed >= self.required_online_scans,
            ClassMode::Offline => {
                evidence.qr_scans_completed >= self.required_offline_scans && evidence.face_verified
            }
        }
    }

    /// Entry point for callers holding the mode as an unparsed string.
    pub fn can_check_in_str(&self, mode: &str, evidence: &VerificationEvidence) -> Result<bool> {
        let mode: ClassMode = mode.parse()?;
        Ok(self.can_check_in(mode, evidence))
    }

    pub fn toggle_check_in(
        &self,
        state: CheckInState,
        mode: ClassMode,
        evidence: &VerificationEvidence,
    ) -> Result<Transition> {
        match state {
            CheckInState::CheckedOut => {
                if !self.can_check_in(mode, evidence) {
                    let reason = self
                        .missing_evidence(mode, evidence)
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    return Err(AttendanceError::NotEligible { mode, reason });
                }

                Ok(Transition {
                    state: CheckInState::CheckedIn,
                    record: Some(RecordRequest {
                        method: VerificationMethod::for_mode(mode),
                    }),
                    evidence: *evidence,
                })
            }
            CheckInState::CheckedIn => Ok(Transition {
                state: CheckInState::CheckedOut,
                record: None,
                evidence: VerificationEvidence::default(),
            }),
        }
    }

    /// Counts one QR scan. Scans past the online requirement are no-ops.
    pub fn record_scan(&self, evidence: &VerificationEvidence) -> VerificationEvidence {
        if evidence.qr_scans_completed >= self.required_online_scans {
            return *evidence;
        }

        VerificationEvidence {
            qr_scans_completed: evidence.qr_scans_completed + 1,
            face_verified: evidence.face_verified,
        }
    }
}
