//! VDP-facing timing state: the status register bits the scheduler drives and the registers it
//! reads back each line

use bincode::{Decode, Encode};
use scd_scheduler_config::TimingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct VdpStatus(u16);

impl VdpStatus {
    pub const PAL: u16 = 1 << 0;
    pub const HBLANK: u16 = 1 << 2;
    pub const VBLANK: u16 = 1 << 3;
    pub const ODD_FRAME: u16 = 1 << 4;
    pub const V_INTERRUPT_PENDING: u16 = 1 << 7;

    #[must_use]
    pub fn new(timing_mode: TimingMode) -> Self {
        match timing_mode {
            TimingMode::Ntsc => Self(0),
            TimingMode::Pal => Self(Self::PAL),
        }
    }

    #[inline]
    #[must_use]
    pub fn bits(self) -> u16 {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn hblank(self) -> bool {
        self.0 & Self::HBLANK != 0
    }

    #[inline]
    #[must_use]
    pub fn vblank(self) -> bool {
        self.0 & Self::VBLANK != 0
    }

    #[inline]
    #[must_use]
    pub fn odd_frame(self) -> bool {
        self.0 & Self::ODD_FRAME != 0
    }

    #[inline]
    #[must_use]
    pub fn v_interrupt_pending(self) -> bool {
        self.0 & Self::V_INTERRUPT_PENDING != 0
    }

    #[inline]
    pub(crate) fn set(&mut self, bits: u16) {
        self.0 |= bits;
    }

    #[inline]
    pub(crate) fn clear(&mut self, bits: u16) {
        self.0 &= !bits;
    }

    #[inline]
    pub(crate) fn toggle(&mut self, bits: u16) {
        self.0 ^= bits;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum HorizontalDisplaySize {
    #[default]
    ThirtyTwoCell,
    FortyCell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum VerticalDisplaySize {
    #[default]
    TwentyEightCell,
    ThirtyCell,
}

impl VerticalDisplaySize {
    #[inline]
    #[must_use]
    pub fn active_scanlines(self) -> u16 {
        match self {
            Self::TwentyEightCell => 224,
            Self::ThirtyCell => 240,
        }
    }
}

/// Snapshot of the VDP registers that affect frame timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct VdpTimingRegisters {
    /// H interrupt fires every (interval + 1) active lines
    pub h_interrupt_interval: u8,
    pub h_interrupt_enabled: bool,
    pub v_interrupt_enabled: bool,
    pub external_interrupt_enabled: bool,
    pub display_enabled: bool,
    pub interlaced: bool,
    pub horizontal_display_size: HorizontalDisplaySize,
    pub vertical_display_size: VerticalDisplaySize,
}

impl VdpTimingRegisters {
    /// Number of active lines for the current display mode. V30 only exists in PAL; NTSC V30
    /// falls back to 224 lines.
    #[must_use]
    pub fn visible_scanlines(&self, timing_mode: TimingMode) -> u16 {
        match (timing_mode, self.vertical_display_size) {
            (TimingMode::Pal, VerticalDisplaySize::ThirtyCell) => 240,
            _ => 224,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_ntsc_v30(&self, timing_mode: TimingMode) -> bool {
        timing_mode == TimingMode::Ntsc
            && self.vertical_display_size == VerticalDisplaySize::ThirtyCell
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_bits() {
        let mut status = VdpStatus::new(TimingMode::Pal);
        assert_eq!(status.bits(), VdpStatus::PAL);

        status.set(VdpStatus::HBLANK | VdpStatus::VBLANK);
        assert!(status.hblank() && status.vblank());

        status.clear(VdpStatus::HBLANK);
        assert!(!status.hblank() && status.vblank());

        status.toggle(VdpStatus::ODD_FRAME);
        assert!(status.odd_frame());
        status.toggle(VdpStatus::ODD_FRAME);
        assert!(!status.odd_frame());
    }

    #[test]
    fn visible_lines_by_mode() {
        let v28 = VdpTimingRegisters::default();
        let v30 = VdpTimingRegisters {
            vertical_display_size: VerticalDisplaySize::ThirtyCell,
            ..VdpTimingRegisters::default()
        };

        assert_eq!(v28.visible_scanlines(TimingMode::Ntsc), 224);
        assert_eq!(v28.visible_scanlines(TimingMode::Pal), 224);
        assert_eq!(v30.visible_scanlines(TimingMode::Pal), 240);
        assert_eq!(v30.visible_scanlines(TimingMode::Ntsc), 224);
        assert!(v30.is_ntsc_v30(TimingMode::Ntsc));
        assert!(!v30.is_ntsc_v30(TimingMode::Pal));
    }
}
