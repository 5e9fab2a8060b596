// src/storage/encrypted/store.rs
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rocksdb::{Options, WriteBatch, DB};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use super::cipher::StorageCipher;
use crate::core::attendance::types::{AttendanceRecord, ClassSession, RecordId};
use crate::core::identity::types::{Descriptor, EnrolledBiometric};
use crate::storage::{AttendanceStore, Result, StorageError};

const BIOMETRIC_PREFIX: &str = "biometric/";
const CURRENT_BIOMETRIC_PREFIX: &str = "biometric-current/";
const RECORD_PREFIX: &str = "record/";
const SESSION_PREFIX: &str = "session/";

fn biometric_key(user_id: Uuid, enrollment_id: Uuid) -> String {
    format!("{}{}/{}", BIOMETRIC_PREFIX, user_id, enrollment_id)
}

fn current_biometric_key(user_id: Uuid) -> String {
    format!("{}{}", CURRENT_BIOMETRIC_PREFIX, user_id)
}

fn record_key(record_id: RecordId) -> String {
    format!("{}{}", RECORD_PREFIX, record_id)
}

fn session_key(class_id: Uuid) -> String {
    format!("{}{}", SESSION_PREFIX, class_id)
}

/// RocksDB store with every value encrypted at rest.
pub struct EncryptedStore {
    db: DB,
    cipher: StorageCipher,
    // Serializes read-modify-write sequences.
    write_lock: Mutex<()>,
}

impl EncryptedStore {
    pub fn new<P: AsRef<Path>>(path: P, encryption_key: &[u8]) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(Self {
            db,
            cipher: StorageCipher::new(encryption_key),
            write_lock: Mutex::new(()),
        })
    }

    fn seal<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let serialized = serde_json::to_vec(value)
            .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
        self.cipher.encrypt(&serialized)
    }

    fn open_value<T: DeserializeOwned>(&self, encrypted: &[u8]) -> Result<T> {
        let decrypted = self.cipher.decrypt(encrypted)?;
        serde_json::from_slice(&decrypted)
            .map_err(|e| StorageError::InvalidFormat(e.to_string()))
    }

    fn retrieve<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let encrypted = match self.db.get(key.as_bytes())
            .map_err(|e| StorageError::DatabaseError(e.to_string()))? {
            Some(data) => data,
            None => return Ok(None),
        };

        self.open_value(&encrypted).map(Some)
    }

    fn store<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let sealed = self.seal(value)?;
        self.db
            .put(key.as_bytes(), sealed)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.db
            .get_pinned(key.as_bytes())
            .map(|value| value.is_some())
            .map_err(|e| StorageError::DatabaseError(e.to_string()))
    }

    fn scan_prefix<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>> {
        let mut values = Vec::new();

        for item in self.db.prefix_iterator(prefix.as_bytes()) {
            let (key, encrypted) = item
                .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
            // Without a prefix extractor the iterator runs past the prefix.
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            values.push(self.open_value(&encrypted)?);
        }

        Ok(values)
    }

    fn current_enrollment_id(&self, user_id: Uuid) -> Result<Option<Uuid>> {
        self.retrieve(&current_biometric_key(user_id))
    }

    fn upsert_biometric_sync(&self, enrollment: &EnrolledBiometric) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut batch = WriteBatch::default();

        if let Some(previous_id) = self.current_enrollment_id(enrollment.user_id)? {
            let previous_key = biometric_key(enrollment.user_id, previous_id);
            if let Some(mut previous) = self.retrieve::<EnrolledBiometric>(&previous_key)? {
                previous.is_current = false;
                batch.put(previous_key.as_bytes(), self.seal(&previous)?);
            }
        }

        batch.put(
            biometric_key(enrollment.user_id, enrollment.id).as_bytes(),
            self.seal(enrollment)?,
        );
        batch.put(
            current_biometric_key(enrollment.user_id).as_bytes(),
            self.seal(&enrollment.id)?,
        );

        self.db
            .write(batch)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))
    }

    fn insert_unique<T: Serialize>(&self, key: &str, value: &T, what: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        if self.exists(key)? {
            return Err(StorageError::Conflict(format!("{} already exists", what)));
        }
        self.store(key, value)
    }
}

#[async_trait]
impl AttendanceStore for EncryptedStore {
    async fn current_biometric(&self, user_id: Uuid) -> Result<Option<EnrolledBiometric>> {
        match self.current_enrollment_id(user_id)? {
            Some(enrollment_id) => self.retrieve(&biometric_key(user_id, enrollment_id)),
            None => Ok(None),
        }
    }

    async fn upsert_biometric(
        &self,
        user_id: Uuid,
        descriptor: Descriptor,
        enrolled_at: DateTime<Utc>,
    ) -> Result<EnrolledBiometric> {
        let enrollment = EnrolledBiometric::new(user_id, descriptor, enrolled_at);
        self.upsert_biometric_sync(&enrollment)?;
        Ok(enrollment)
    }

    async fn biometric_history(&self, user_id: Uuid) -> Result<Vec<EnrolledBiometric>> {
        let mut history: Vec<EnrolledBiometric> =
            self.scan_prefix(&format!("{}{}/", BIOMETRIC_PREFIX, user_id))?;
        history.sort_by_key(|row| row.enrolled_at);
        Ok(history)
    }

    async fn insert_attendance_record(&self, record: AttendanceRecord) -> Result<RecordId> {
        let what = format!("attendance record {}", record.id);
        self.insert_unique(&record_key(record.id), &record, &what)?;
        Ok(record.id)
    }

    async fn records_for_user(&self, user_id: Uuid) -> Result<Vec<AttendanceRecord>> {
        let mut records: Vec<AttendanceRecord> = self.scan_prefix(RECORD_PREFIX)?;
        records.retain(|record| record.user_id == user_id);
        records.sort_by_key(|record| record.verified_at);
        Ok(records)
    }

    async fn records_for_class(&self, class_id: Uuid) -> Result<Vec<AttendanceRecord>> {
        let mut records: Vec<AttendanceRecord> = self.scan_prefix(RECORD_PREFIX)?;
        records.retain(|record| record.class_id == class_id);
        records.sort_by_key(|record| record.verified_at);
        Ok(records)
    }

    async fn put_session(&self, session: ClassSession) -> Result<()> {
        let what = format!("class session {}", session.id);
        self.insert_unique(&session_key(session.id), &session, &what)
    }

    async fn get_session(&self, class_id: Uuid) -> Result<Option<ClassSession>> {
        self.retrieve(&session_key(class_id))
    }

    async fn list_sessions(&self) -> Result<Vec<ClassSession>> {
        let mut sessions: Vec<ClassSession> = self.scan_prefix(SESSION_PREFIX)?;
        sessions.sort_by_key(|session| session.scheduled_at);
        Ok(sessions)
    }

    async fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| StorageError::DatabaseError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attendance::types::{ClassMode, VerificationMethod};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_biometric_supersede() {
        let temp_dir = tempdir().unwrap();
        let store = EncryptedStore::new(temp_dir.path(), b"test_key").unwrap();
        let user_id = Uuid::new_v4();

        assert!(store.current_biometric(user_id).await.unwrap().is_none());

        let first = store
            .upsert_biometric(user_id, Descriptor::new(vec![0.1; 8]), Utc::now())
            .await
            .unwrap();
        let second = store
            .upsert_biometric(user_id, Descriptor::new(vec![0.2; 8]), Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();

        let current = store.current_biometric(user_id).await.unwrap().unwrap();
        assert_eq!(current, second);

        let history = store.biometric_history(user_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, first.id);
        assert!(!history[0].is_current);
        assert!(history[1].is_current);
    }

    #[tokio::test]
    async fn test_values_are_encrypted_at_rest() {
        let temp_dir = tempdir().unwrap();
        let store = EncryptedStore::new(temp_dir.path(), b"test_key").unwrap();
        let session = ClassSession::new("Physics Lab", ClassMode::Offline, Utc::now(), Some("Lab 101".into())).unwrap();

        store.put_session(session.clone()).await.unwrap();

        let raw = store.db.get(session_key(session.id).as_bytes()).unwrap().unwrap();
        assert!(!String::from_utf8_lossy(&raw).contains("Physics Lab"));
        assert_eq!(store.get_session(session.id).await.unwrap(), Some(session.clone()));
        assert!(matches!(
            store.put_session(session).await,
            Err(StorageError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_records_round_trip_across_reopen() {
        let temp_dir = tempdir().unwrap();
        let user_id = Uuid::new_v4();
        let class_id = Uuid::new_v4();
        let record = AttendanceRecord {
            id: Uuid::new_v4(),
            user_id,
            class_id,
            verified_at: Utc::now(),
            confidence: 0.82,
            method: VerificationMethod::FaceRecognition,
            location: None,
            device_info: Some("Android 12".into()),
        };

        {
            let store = EncryptedStore::new(temp_dir.path(), b"test_key").unwrap();
            store.insert_attendance_record(record.clone()).await.unwrap();
            assert!(store.insert_attendance_record(record.clone()).await.is_err());
            store.flush().await.unwrap();
        }

        let store = EncryptedStore::new(temp_dir.path(), b"test_key").unwrap();
        assert_eq!(store.records_for_user(user_id).await.unwrap(), vec![record.clone()]);
        assert_eq!(store.records_for_class(class_id).await.unwrap(), vec![record]);
        assert!(store.records_for_user(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
