// src/storage/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::{AttendanceStore, Result, StorageError};
use crate::core::attendance::types::{AttendanceRecord, ClassSession, RecordId};
use crate::core::identity::types::{Descriptor, EnrolledBiometric};

#[derive(Default)]
struct MemoryState {
    biometrics: HashMap<Uuid, Vec<EnrolledBiometric>>,
    records: Vec<AttendanceRecord>,
    sessions: HashMap<Uuid, ClassSession>,
}

/// Process-local store. Every write takes a single lock, so the biometric
/// supersede-and-insert is atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn current_biometric(&self, user_id: Uuid) -> Result<Option<EnrolledBiometric>> {
        let state = self.state.read();
        Ok(state
            .biometrics
            .get(&user_id)
            .and_then(|rows| rows.iter().find(|row| row.is_current))
            .cloned())
    }

    async fn upsert_biometric(
        &self,
        user_id: Uuid,
        descriptor: Descriptor,
        enrolled_at: DateTime<Utc>,
    ) -> Result<EnrolledBiometric> {
        let enrollment = EnrolledBiometric::new(user_id, descriptor, enrolled_at);

        let mut state = self.state.write();
        let rows = state.biometrics.entry(user_id).or_default();
        for row in rows.iter_mut() {
            row.is_current = false;
        }
        rows.push(enrollment.clone());

        Ok(enrollment)
    }

    async fn biometric_history(&self, user_id: Uuid) -> Result<Vec<EnrolledBiometric>> {
        let state = self.state.read();
        Ok(state.biometrics.get(&user_id).cloned().unwrap_or_default())
    }

    async fn insert_attendance_record(&self, record: AttendanceRecord) -> Result<RecordId> {
        let mut state = self.state.write();
        if state.records.iter().any(|existing| existing.id == record.id) {
            return Err(StorageError::Conflict(format!(
                "attendance record {} already exists",
                record.id
            )));
        }

        let id = record.id;
        state.records.push(record);
        Ok(id)
    }

    async fn records_for_user(&self, user_id: Uuid) -> Result<Vec<AttendanceRecord>> {
        let state = self.state.read();
        Ok(state
            .records
            .iter()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn records_for_class(&self, class_id: Uuid) -> Result<Vec<AttendanceRecord>> {
        let state = self.state.read();
        Ok(state
            .records
            .iter()
            .filter(|record| record.class_id == class_id)
            .cloned()
            .collect())
    }

    async fn put_session(&self, session: ClassSession) -> Result<()> {
        let mut state = self.state.write();
        if state.sessions.contains_key(&session.id) {
            return Err(StorageError::Conflict(format!(
                "class session {} already scheduled",
                session.id
            )));
        }
        state.sessions.insert(session.id, session);
        Ok(())
    }

    async fn get_session(&self, class_id: Uuid) -> Result<Option<ClassSession>> {
        Ok(self.state.read().sessions.get(&class_id).cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<ClassSession>> {
        let mut sessions: Vec<ClassSession> = self.state.read().sessions.values().cloned().collect();
        sessions.sort_by_key(|session| session.scheduled_at);
        Ok(sessions)
    }
}
