// src/core/identity/mod.rs
pub mod biometric;
pub mod types;

pub use biometric::{euclidean_distance, BiometricVerifier};
pub use types::{Descriptor, EnrolledBiometric, MatchOutcome};
