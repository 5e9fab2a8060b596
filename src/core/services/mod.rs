// src/core/services/mod.rs
pub mod attendance;

pub use attendance::{AttendanceService, CheckInContext, CheckInOutcome, ScanOutcome};
