// src/core/mod.rs
pub mod attendance;
pub mod capability;
pub mod identity;
pub mod services;
