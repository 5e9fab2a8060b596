// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rollcall::{
    core::{
        attendance::{ClassMode, ClassSession},
        capability::{FixedClock, SubmittedDescriptor},
        identity::Descriptor,
        services::AttendanceService,
    },
    storage::MemoryStore,
    utils::config::PolicyConfig,
};

pub const DIMENSION: usize = 128;

pub struct TestContext {
    pub service: AttendanceService,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_policy(PolicyConfig::default())
    }

    pub fn with_policy(policy: PolicyConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(start_time()));
        let service = AttendanceService::new(&policy, store.clone(), clock.clone());

        Self { service, store, clock }
    }

    pub async fn online_class(&self) -> ClassSession {
        let session = ClassSession::new("Calculus", ClassMode::Online, start_time(), None)
            .expect("valid online session");
        self.service
            .schedule_session(session)
            .await
            .expect("Failed to schedule session")
    }

    pub async fn offline_class(&self) -> ClassSession {
        let session = ClassSession::new("Physics Lab", ClassMode::Offline, start_time(), Some("Lab 101".into()))
            .expect("valid offline session");
        self.service
            .schedule_session(session)
            .await
            .expect("Failed to schedule session")
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 5, 15, 10, 0, 0).unwrap()
}

/// Deterministic descriptor; `shift` moves every component by the same amount.
pub fn descriptor(shift: f32) -> Descriptor {
    Descriptor::new(
        (0..DIMENSION)
            .map(|i| ((i as f32) * 0.37).sin() * 0.1 + shift)
            .collect(),
    )
}

pub fn capture(shift: f32) -> SubmittedDescriptor {
    SubmittedDescriptor::new(Some(descriptor(shift)))
}
