//! Main CPU bus request over the sub CPU
//!
//! While the main CPU holds a bus request the sub CPU is halted and its cycle budget does not
//! grow. A request can optionally time out after a fixed number of main CPU cycles.

use bincode::{Decode, Encode};

// Initial value for the request marker so that a timeout check at the start of a frame never sees
// a recent request
const REQUEST_MARKER_RESET: i64 = -1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum BusState {
    #[default]
    Running,
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct BusArbiter {
    state: BusState,
    last_request_cycle: i64,
    timeout: Option<u32>,
}

impl BusArbiter {
    #[must_use]
    pub fn new(timeout: Option<u32>) -> Self {
        Self { state: BusState::Running, last_request_cycle: REQUEST_MARKER_RESET, timeout }
    }

    /// Main CPU asserts BUSREQ; `main_cycle` is its frame-relative cycle count at the time.
    pub fn request_bus(&mut self, main_cycle: u64) {
        if self.state == BusState::Running {
            log::trace!("Sub CPU bus requested at main CPU cycle {main_cycle}");
        }

        self.state = BusState::Halted;
        self.last_request_cycle = main_cycle as i64;
    }

    pub fn release_bus(&mut self) {
        if self.state == BusState::Halted {
            log::trace!("Sub CPU bus released");
        }

        self.state = BusState::Running;
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> BusState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn last_request_cycle(&self) -> i64 {
        self.last_request_cycle
    }

    pub(crate) fn set_timeout(&mut self, timeout: Option<u32>) {
        self.timeout = timeout;
    }

    /// Whether the sub CPU may receive cycles this line. If a timeout is configured and has
    /// elapsed, the request is released first.
    pub fn secondary_cpu_is_runnable(&mut self, current_main_cycle: u64) -> bool {
        match (self.state, self.timeout) {
            (BusState::Running, _) => true,
            (BusState::Halted, Some(timeout)) => {
                let elapsed = current_main_cycle as i64 - self.last_request_cycle;
                if elapsed >= i64::from(timeout) {
                    log::debug!("Sub CPU bus request timed out after {elapsed} main CPU cycles");
                    self.state = BusState::Running;
                    true
                } else {
                    false
                }
            }
            (BusState::Halted, None) => false,
        }
    }

    /// Main CPU cycle counts restart at 0 each frame. A request still held across the boundary
    /// is rebased so that its age keeps counting.
    pub(crate) fn start_frame(&mut self, previous_frame_main_cycles: u64) {
        match self.state {
            BusState::Running => self.last_request_cycle = REQUEST_MARKER_RESET,
            BusState::Halted => self.last_request_cycle -= previous_frame_main_cycles as i64,
        }
    }
}

impl Default for BusArbiter {
    fn default() -> Self {
        Self::new(None)
    }
}
