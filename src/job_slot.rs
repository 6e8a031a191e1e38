/*!
 * Single-run job slot.
 *
 * Only one translation may be active at a time. Callers acquire the slot
 * before starting a run; a second acquisition fails with the key of the run
 * holding it instead of silently replacing it. The slot is released when the
 * returned guard is dropped.
 */

use log::debug;
use parking_lot::Mutex;

use crate::errors::JobSlotError;

/// Slot admitting at most one active run
#[derive(Debug, Default)]
pub struct JobSlot {
    holder: Mutex<Option<String>>,
}

/// Proof of holding the slot; releases it on drop
#[derive(Debug)]
#[must_use = "the job slot is released as soon as the guard is dropped"]
pub struct JobGuard<'a> {
    slot: &'a JobSlot,
    key: String,
}

impl JobSlot {
    pub const fn new() -> Self {
        Self {
            holder: Mutex::new(None),
        }
    }

    /// Claim the slot for the run identified by `key`
    pub fn try_acquire(&self, key: impl Into<String>) -> Result<JobGuard<'_>, JobSlotError> {
        let key = key.into();
        let mut holder = self.holder.lock();
        if let Some(current) = holder.as_ref() {
            return Err(JobSlotError::Busy {
                holder: current.clone(),
            });
        }
        *holder = Some(key.clone());
        debug!("Job slot acquired by {}", key);
        Ok(JobGuard { slot: self, key })
    }

    /// Key of the run currently holding the slot
    pub fn holder(&self) -> Option<String> {
        self.holder.lock().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.holder.lock().is_some()
    }
}

impl JobGuard<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        *self.slot.holder.lock() = None;
        debug!("Job slot released by {}", self.key);
    }
}
