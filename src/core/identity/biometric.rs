// src/core/identity/biometric.rs
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::types::{Descriptor, EnrolledBiometric, MatchOutcome};
use crate::core::capability::{Clock, DescriptorCapture};
use crate::storage::AttendanceStore;
use crate::utils::config::PolicyConfig;
use crate::utils::error::{AttendanceError, Result};

/// Euclidean distance between two descriptors of equal length.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Compares live face descriptors against the user's enrolled one.
pub struct BiometricVerifier {
    store: Arc<dyn AttendanceStore>,
    clock: Arc<dyn Clock>,
    dimension: usize,
    match_threshold: f32,
}

impl BiometricVerifier {
    pub fn new(store: Arc<dyn AttendanceStore>, clock: Arc<dyn Clock>, config: &PolicyConfig) -> Self {
        Self {
            store,
            clock,
            dimension: config.descriptor_dimension,
            match_threshold: config.match_threshold,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn match_threshold(&self) -> f32 {
        self.match_threshold
    }

    pub fn validate(&self, descriptor: &Descriptor) -> Result<()> {
        if descriptor.len() != self.dimension {
            return Err(AttendanceError::InvalidDescriptor(format!(
                "expected {} values, got {}",
                self.dimension,
                descriptor.len()
            )));
        }

        if let Some(index) = descriptor.as_slice().iter().position(|value| !value.is_finite()) {
            return Err(AttendanceError::InvalidDescriptor(format!(
                "value at index {} is not a finite number",
                index
            )));
        }

        Ok(())
    }

    /// Validates and stores `descriptor` as the user's current enrollment,
    /// superseding any earlier one.
    pub async fn enroll(&self, user_id: Uuid, descriptor: Descriptor) -> Result<EnrolledBiometric> {
        self.validate(&descriptor)?;

        let enrollment = self
            .store
            .upsert_biometric(user_id, descriptor, self.clock.now())
            .await?;

        info!(%user_id, enrollment_id = %enrollment.id, "Enrolled face descriptor");
        Ok(enrollment)
    }

    pub async fn enroll_from_capture(
        &self,
        user_id: Uuid,
        capture: &dyn DescriptorCapture,
    ) -> Result<EnrolledBiometric> {
        let descriptor = capture
            .capture_descriptor()
            .await?
            .ok_or(AttendanceError::NoFaceDetected)?;

        self.enroll(user_id, descriptor).await
    }

    /// Match decision for a live descriptor. The threshold is strict: a
    /// distance equal to it does not match.
    pub fn verify(&self, live: &Descriptor, enrolled: &Descriptor) -> Result<MatchOutcome> {
        if live.len() != enrolled.len() {
            return Err(AttendanceError::InvalidDescriptor(format!(
                "live descriptor has {} values, enrolled has {}",
                live.len(),
                enrolled.len()
            )));
        }

        let distance = euclidean_distance(live.as_slice(), enrolled.as_slice());
        let confidence = (1.0 - distance).clamp(0.0, 1.0);

        Ok(MatchOutcome {
            is_match: distance < self.match_threshold,
            confidence,
            distance,
        })
    }

    /// Looks up the current enrollment, captures a live descriptor and
    /// compares them.
    pub async fn verify_enrolled(
        &self,
        user_id: Uuid,
        capture: &dyn DescriptorCapture,
    ) -> Result<MatchOutcome> {
        let enrollment = self
            .store
            .current_biometric(user_id)
            .await?
            .ok_or(AttendanceError::NoEnrollmentFound(user_id))?;

        let live = capture
            .capture_descriptor()
            .await?
            .ok_or(AttendanceError::NoFaceDetected)?;
        self.validate(&live)?;

        let outcome = self.verify(&live, &enrollment.descriptor)?;
        debug!(
            %user_id,
            distance = outcome.distance,
            is_match = outcome.is_match,
            "Compared face descriptors"
        );
        Ok(outcome)
    }
}
