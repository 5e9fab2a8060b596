// src/utils/metrics.rs
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;

pub struct Metrics {
    start_time: Instant,
    scans_recorded: AtomicU64,
    faces_matched: AtomicU64,
    faces_rejected: AtomicU64,
    check_ins: AtomicU64,
    check_outs: AtomicU64,
    check_ins_refused: AtomicU64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub scans_recorded: u64,
    pub faces_matched: u64,
    pub faces_rejected: u64,
    pub check_ins: u64,
    pub check_outs: u64,
    pub check_ins_refused: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            scans_recorded: AtomicU64::new(0),
            faces_matched: AtomicU64::new(0),
            faces_rejected: AtomicU64::new(0),
            check_ins: AtomicU64::new(0),
            check_outs: AtomicU64::new(0),
            check_ins_refused: AtomicU64::new(0),
        }
    }

    pub fn record_scan(&self) {
        self.scans_recorded.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_face_verification(&self, matched: bool) {
        if matched {
            self.faces_matched.fetch_add(1, Ordering::SeqCst);
        } else {
            self.faces_rejected.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn record_check_in(&self) {
        self.check_ins.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_check_out(&self) {
        self.check_outs.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_refused_check_in(&self) {
        self.check_ins_refused.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            scans_recorded: self.scans_recorded.load(Ordering::SeqCst),
            faces_matched: self.faces_matched.load(Ordering::SeqCst),
            faces_rejected: self.faces_rejected.load(Ordering::SeqCst),
            check_ins: self.check_ins.load(Ordering::SeqCst),
            check_outs: self.check_outs.load(Ordering::SeqCst),
            check_ins_refused: self.check_ins_refused.load(Ordering::SeqCst),
        }
    }

    pub fn log(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            scans = snapshot.scans_recorded,
            faces_matched = snapshot.faces_matched,
            faces_rejected = snapshot.faces_rejected,
            check_ins = snapshot.check_ins,
            check_outs = snapshot.check_outs,
            refused = snapshot.check_ins_refused,
            "Attendance metrics"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
