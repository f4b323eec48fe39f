//! State shared between the scheduler and the hardware it drives
//!
//! CPUs receive this while executing so that bus writes can raise bus requests, start DMAs, and
//! acknowledge interrupts. The VDP status bits and current scanline are owned by the scheduler
//! and are read-only to everything else.

use crate::arbiter::BusArbiter;
use crate::dma::DmaTimer;
use crate::interrupts::InterruptController;
use crate::vdp::VdpStatus;
use bincode::{Decode, Encode};
use scd_scheduler_config::TimingMode;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct BusSignals {
    pub main_interrupts: InterruptController,
    pub sub_interrupts: InterruptController,
    pub bus_arbiter: BusArbiter,
    pub dma: DmaTimer,
    vdp_status: VdpStatus,
    scanline: u16,
}

impl BusSignals {
    #[must_use]
    pub fn new(timing_mode: TimingMode, bus_request_timeout: Option<u32>) -> Self {
        Self {
            main_interrupts: InterruptController::new(),
            sub_interrupts: InterruptController::new(),
            bus_arbiter: BusArbiter::new(bus_request_timeout),
            dma: DmaTimer::new(),
            vdp_status: VdpStatus::new(timing_mode),
            scanline: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn vdp_status(&self) -> VdpStatus {
        self.vdp_status
    }

    #[inline]
    #[must_use]
    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    #[inline]
    pub(crate) fn vdp_status_mut(&mut self) -> &mut VdpStatus {
        &mut self.vdp_status
    }

    #[inline]
    pub(crate) fn set_scanline(&mut self, scanline: u16) {
        self.scanline = scanline;
    }

    pub(crate) fn set_timing_mode(&mut self, timing_mode: TimingMode) {
        self.vdp_status.clear(VdpStatus::PAL);
        if timing_mode == TimingMode::Pal {
            self.vdp_status.set(VdpStatus::PAL);
        }
    }
}
