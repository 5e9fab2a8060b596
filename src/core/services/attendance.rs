// src/core/services/attendance.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    core::{
        attendance::{
            location::ensure_within_radius,
            AttendanceDecisionPolicy, AttendanceRecord, AttendanceStatus, AttendanceSummary,
            CheckInState, ClassMode, ClassSession, GeoPoint, RosterEntry, VerificationEvidence,
            VerificationMethod,
        },
        capability::{Clock, DescriptorCapture},
        identity::{BiometricVerifier, EnrolledBiometric, MatchOutcome},
    },
    storage::AttendanceStore,
    utils::{
        config::PolicyConfig,
        error::{AttendanceError, Result},
        metrics::Metrics,
    },
};

/// What the device reports alongside a check-in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckInContext {
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub device_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckInOutcome {
    pub state: CheckInState,
    pub evidence: VerificationEvidence,
    pub record: Option<AttendanceRecord>,
}

/// Evidence after a QR scan, with whether it now permits check-in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanOutcome {
    pub evidence: VerificationEvidence,
    pub can_check_in: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct CheckInAttempt {
    state: CheckInState,
    evidence: VerificationEvidence,
    face_confidence: Option<f32>,
}

/// Drives check-in attempts per (student, class). Operations on the same
/// pair run one at a time; different pairs proceed independently.
pub struct AttendanceService {
    store: Arc<dyn AttendanceStore>,
    clock: Arc<dyn Clock>,
    policy: AttendanceDecisionPolicy,
    verifier: BiometricVerifier,
    location_radius_m: f64,
    late_after: Duration,
    attempts: Mutex<HashMap<(Uuid, Uuid), Arc<AsyncMutex<CheckInAttempt>>>>,
    metrics: Arc<Metrics>,
}

impl AttendanceService {
    pub fn new(config: &PolicyConfig, store: Arc<dyn AttendanceStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy: AttendanceDecisionPolicy::new(config),
            verifier: BiometricVerifier::new(store.clone(), clock.clone(), config),
            location_radius_m: config.location_radius_m,
            late_after: Duration::minutes(i64::from(config.late_after_minutes)),
            store,
            clock,
            attempts: Mutex::new(HashMap::new()),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn policy(&self) -> &AttendanceDecisionPolicy {
        &self.policy
    }

    pub fn verifier(&self) -> &BiometricVerifier {
        &self.verifier
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    fn attempt(&self, user_id: Uuid, class_id: Uuid) -> Arc<AsyncMutex<CheckInAttempt>> {
        self.attempts
            .lock()
            .entry((user_id, class_id))
            .or_default()
            .clone()
    }

    /// Drops the entry for a pair whose attempt is back at its initial state
    /// and that no other operation is waiting on.
    fn release_if_idle(
        &self,
        key: (Uuid, Uuid),
        slot: &Arc<AsyncMutex<CheckInAttempt>>,
        attempt: &CheckInAttempt,
    ) {
        if *attempt != CheckInAttempt::default() {
            return;
        }

        let mut attempts = self.attempts.lock();
        // One reference in the map, one held by the caller.
        if Arc::strong_count(slot) == 2 {
            attempts.remove(&key);
        }
    }

    fn snapshot(&self, user_id: Uuid, class_id: Uuid) -> Option<Arc<AsyncMutex<CheckInAttempt>>> {
        self.attempts.lock().get(&(user_id, class_id)).cloned()
    }

    pub async fn schedule_session(&self, session: ClassSession) -> Result<ClassSession> {
        session.validate()?;
        self.store.put_session(session.clone()).await?;

        info!(class_id = %session.id, mode = %session.mode, "Scheduled class session");
        Ok(session)
    }

    pub async fn session(&self, class_id: Uuid) -> Result<ClassSession> {
        self.store
            .get_session(class_id)
            .await?
            .ok_or(AttendanceError::SessionNotFound(class_id))
    }

    pub async fn enroll(&self, user_id: Uuid, capture: &dyn DescriptorCapture) -> Result<EnrolledBiometric> {
        self.verifier.enroll_from_capture(user_id, capture).await
    }

    pub async fn record_scan(&self, user_id: Uuid, class_id: Uuid) -> Result<ScanOutcome> {
        let session = self.session(class_id).await?;

        let slot = self.attempt(user_id, class_id);
        let mut attempt = slot.lock().await;
        attempt.evidence = self.policy.record_scan(&attempt.evidence);
        self.metrics.record_scan();

        info!(
            %user_id,
            %class_id,
            scans = attempt.evidence.qr_scans_completed,
            "Recorded QR scan"
        );
        Ok(ScanOutcome {
            evidence: attempt.evidence,
            can_check_in: self.policy.can_check_in(session.mode, &attempt.evidence),
        })
    }

    pub async fn verify_face(
        &self,
        user_id: Uuid,
        class_id: Uuid,
        capture: &dyn DescriptorCapture,
    ) -> Result<MatchOutcome> {
        self.session(class_id).await?;

        let slot = self.attempt(user_id, class_id);
        let mut attempt = slot.lock().await;
        let result = self.verify_face_locked(user_id, class_id, capture, &mut attempt).await;
        self.release_if_idle((user_id, class_id), &slot, &attempt);
        result
    }

    async fn verify_face_locked(
        &self,
        user_id: Uuid,
        class_id: Uuid,
        capture: &dyn DescriptorCapture,
        attempt: &mut CheckInAttempt,
    ) -> Result<MatchOutcome> {
        let outcome = self.verifier.verify_enrolled(user_id, capture).await?;
        attempt.evidence.face_verified = outcome.is_match;
        attempt.face_confidence = outcome.is_match.then_some(outcome.confidence);
        self.metrics.record_face_verification(outcome.is_match);

        if outcome.is_match {
            info!(%user_id, %class_id, confidence = outcome.confidence, "Face verified");
        } else {
            warn!(%user_id, %class_id, distance = outcome.distance, "Face did not match enrollment");
        }
        Ok(outcome)
    }

    pub async fn toggle_check_in(
        &self,
        user_id: Uuid,
        class_id: Uuid,
        context: CheckInContext,
    ) -> Result<CheckInOutcome> {
        let session = self.session(class_id).await?;

        let slot = self.attempt(user_id, class_id);
        let mut attempt = slot.lock().await;
        let result = self.toggle_locked(user_id, &session, context, &mut attempt).await;
        self.release_if_idle((user_id, class_id), &slot, &attempt);
        result
    }

    async fn toggle_locked(
        &self,
        user_id: Uuid,
        session: &ClassSession,
        context: CheckInContext,
        attempt: &mut CheckInAttempt,
    ) -> Result<CheckInOutcome> {
        let class_id = session.id;
        let transition = match self
            .policy
            .toggle_check_in(attempt.state, session.mode, &attempt.evidence)
        {
            Ok(transition) => transition,
            Err(e) => {
                self.metrics.record_refused_check_in();
                warn!(%user_id, %class_id, "Check-in refused: {}", e);
                return Err(e);
            }
        };

        let record = match transition.record {
            Some(request) => {
                self.ensure_location(session, &context)?;

                let confidence = match request.method {
                    VerificationMethod::QrCode => 1.0,
                    VerificationMethod::FaceRecognition => attempt.face_confidence.unwrap_or(0.0),
                };
                let record = AttendanceRecord {
                    id: Uuid::new_v4(),
                    user_id,
                    class_id,
                    verified_at: self.clock.now(),
                    confidence,
                    method: request.method,
                    location: context.location,
                    device_info: context.device_info,
                };
                self.store.insert_attendance_record(record.clone()).await?;
                Some(record)
            }
            None => None,
        };

        attempt.state = transition.state;
        attempt.evidence = transition.evidence;
        match transition.state {
            CheckInState::CheckedIn => {
                self.metrics.record_check_in();
                info!(%user_id, %class_id, mode = %session.mode, "Checked in");
            }
            CheckInState::CheckedOut => {
                attempt.face_confidence = None;
                self.metrics.record_check_out();
                info!(%user_id, %class_id, "Checked out");
                self.metrics.log();
            }
        }

        Ok(CheckInOutcome {
            state: attempt.state,
            evidence: attempt.evidence,
            record,
        })
    }

    fn ensure_location(&self, session: &ClassSession, context: &CheckInContext) -> Result<()> {
        if session.mode != ClassMode::Offline {
            return Ok(());
        }

        match (&session.coordinates, &context.location) {
            (Some(classroom), Some(reported)) => {
                if !reported.is_valid() {
                    return Err(AttendanceError::InvalidLocation(format!(
                        "({}, {})",
                        reported.latitude, reported.longitude
                    )));
                }
                ensure_within_radius(classroom, reported, self.location_radius_m).map_err(|e| {
                    warn!(class_id = %session.id, "Check-in location rejected: {}", e);
                    e
                })
            }
            _ => Ok(()),
        }
    }

    pub async fn evidence(&self, user_id: Uuid, class_id: Uuid) -> VerificationEvidence {
        match self.snapshot(user_id, class_id) {
            Some(slot) => slot.lock().await.evidence,
            None => VerificationEvidence::default(),
        }
    }

    pub async fn state(&self, user_id: Uuid, class_id: Uuid) -> CheckInState {
        match self.snapshot(user_id, class_id) {
            Some(slot) => slot.lock().await.state,
            None => CheckInState::default(),
        }
    }

    /// Records of the user, most recent first.
    pub async fn attendance_history(&self, user_id: Uuid) -> Result<Vec<AttendanceRecord>> {
        let mut records = self.store.records_for_user(user_id).await?;
        records.sort_by(|a, b| b.verified_at.cmp(&a.verified_at));
        Ok(records)
    }

    /// Share of scheduled classes the user has checked in to at least once.
    pub async fn attendance_summary(&self, user_id: Uuid) -> Result<AttendanceSummary> {
        let sessions = self.store.list_sessions().await?;
        let records = self.store.records_for_user(user_id).await?;

        let present = sessions
            .iter()
            .filter(|session| records.iter().any(|record| record.class_id == session.id))
            .count();

        Ok(AttendanceSummary::new(present, sessions.len()))
    }

    /// Present, late or absent for each student. A first check-in more than
    /// the configured grace period after the scheduled start is late.
    pub async fn class_roster(&self, class_id: Uuid, students: &[Uuid]) -> Result<Vec<RosterEntry>> {
        let session = self.session(class_id).await?;
        let records = self.store.records_for_class(class_id).await?;
        let late_from = session.scheduled_at + self.late_after;

        Ok(students
            .iter()
            .map(|&user_id| {
                let checked_in_at = records
                    .iter()
                    .filter(|record| record.user_id == user_id)
                    .map(|record| record.verified_at)
                    .min();
                let status = match checked_in_at {
                    Some(at) if at > late_from => AttendanceStatus::Late,
                    Some(_) => AttendanceStatus::Present,
                    None => AttendanceStatus::Absent,
                };
                RosterEntry {
                    user_id,
                    status,
                    checked_in_at,
                }
            })
            .collect())
    }

    /// Attendance rate of one class over the given roster. Late students
    /// count as attended.
    pub async fn class_summary(&self, class_id: Uuid, students: &[Uuid]) -> Result<AttendanceSummary> {
        let roster = self.class_roster(class_id, students).await?;
        let attended = roster
            .iter()
            .filter(|entry| entry.status != AttendanceStatus::Absent)
            .count();

        Ok(AttendanceSummary::new(attended, roster.len()))
    }
}
