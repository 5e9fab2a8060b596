// src/storage/mod.rs
mod errors;
pub mod encrypted;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::attendance::types::{AttendanceRecord, ClassSession, RecordId};
use crate::core::identity::types::{Descriptor, EnrolledBiometric};

pub use encrypted::EncryptedStore;
pub use errors::{Result, StorageError};
pub use memory::MemoryStore;

/// Persistence for enrollments, attendance records and scheduled classes.
///
/// Attendance records are append-only and sessions are immutable once
/// stored: writing an existing id fails with [`StorageError::Conflict`].
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn current_biometric(&self, user_id: Uuid) -> Result<Option<EnrolledBiometric>>;

    /// Stores `descriptor` as the user's current enrollment and flags the
    /// previous current one as superseded. Both writes land together.
    async fn upsert_biometric(
        &self,
        user_id: Uuid,
        descriptor: Descriptor,
        enrolled_at: DateTime<Utc>,
    ) -> Result<EnrolledBiometric>;

    /// Every enrollment of the user, oldest first.
    async fn biometric_history(&self, user_id: Uuid) -> Result<Vec<EnrolledBiometric>>;

    async fn insert_attendance_record(&self, record: AttendanceRecord) -> Result<RecordId>;

    async fn records_for_user(&self, user_id: Uuid) -> Result<Vec<AttendanceRecord>>;

    async fn records_for_class(&self, class_id: Uuid) -> Result<Vec<AttendanceRecord>>;

    async fn put_session(&self, session: ClassSession) -> Result<()>;

    async fn get_session(&self, class_id: Uuid) -> Result<Option<ClassSession>>;

    async fn list_sessions(&self) -> Result<Vec<ClassSession>>;

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
