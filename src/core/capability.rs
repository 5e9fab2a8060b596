// src/core/capability.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

#[cfg(test)]
use mockall::automock;

use crate::core::identity::types::Descriptor;
use crate::utils::error::CapabilityError;

/// Camera + detector. `Ok(None)` means the frame contained no face.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DescriptorCapture: Send + Sync {
    async fn capture_descriptor(&self) -> Result<Option<Descriptor>, CapabilityError>;
}

/// Descriptor computed by the client-side detector and submitted with the
/// request. Yields it once.
pub struct SubmittedDescriptor {
    descriptor: Mutex<Option<Descriptor>>,
}

impl SubmittedDescriptor {
    pub fn new(descriptor: Option<Descriptor>) -> Self {
        Self {
            descriptor: Mutex::new(descriptor),
        }
    }
}

#[async_trait]
impl DescriptorCapture for SubmittedDescriptor {
    async fn capture_descriptor(&self) -> Result<Option<Descriptor>, CapabilityError> {
        Ok(self.descriptor.lock().take())
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
