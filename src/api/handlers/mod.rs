pub mod attendance;
pub mod biometric;
