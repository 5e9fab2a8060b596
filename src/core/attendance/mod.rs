// src/core/attendance/mod.rs
pub mod location;
pub mod policy;
pub mod types;

pub use location::GeoPoint;
pub use policy::{AttendanceDecisionPolicy, MissingEvidence, RecordRequest, Transition};
pub use types::*;
