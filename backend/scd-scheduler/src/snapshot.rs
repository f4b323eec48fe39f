use crate::scheduler::CycleBudgets;
use crate::signals::BusSignals;
use bincode::{Decode, Encode};
use thiserror::Error;

/// Scheduler state that carries over between frames.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SchedulerSnapshot {
    pub(crate) budgets: CycleBudgets,
    pub(crate) h_interrupt_counter: i32,
    pub(crate) signals: BusSignals,
    pub(crate) frame_count: u64,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Error encoding scheduler snapshot: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("Error decoding scheduler snapshot: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

impl SchedulerSnapshot {
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    #[must_use]
    pub fn signals(&self) -> &BusSignals {
        &self.signals
    }

    /// # Errors
    ///
    /// Propagates any error from bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::encode_to_vec(self, bincode::config::standard())?)
    }

    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid encoded snapshot.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let (snapshot, _) = bincode::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(snapshot)
    }
}
