//! Level-triggered interrupt lines for the two 68000s
//!
//! Each controller tracks pending and enabled sources by level (1-7) and recomputes the level
//! presented to the CPU immediately whenever anything changes, so a CPU that polls
//! [`InterruptController::interrupt_level`] at its next instruction boundary always sees the
//! current state.

use bincode::{Decode, Encode};

const NMI_LEVEL: u8 = 7;

/// Main CPU interrupt sources, all driven by the VDP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainInterrupt {
    External,
    Horizontal,
    Vertical,
}

impl MainInterrupt {
    #[inline]
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::External => 2,
            Self::Horizontal => 4,
            Self::Vertical => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubInterrupt {
    Graphics,
    Software,
    Timer,
    CddCommand,
    CdcTransfer,
    Subcode,
}

impl SubInterrupt {
    #[inline]
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Graphics => 1,
            Self::Software => 2,
            Self::Timer => 3,
            Self::CddCommand => 4,
            Self::CdcTransfer => 5,
            Self::Subcode => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct InterruptController {
    pending: u8,
    enabled: u8,
    priority_mask: u8,
    level: u8,
}

impl InterruptController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assert(&mut self, level: u8) {
        debug_assert!((1..=NMI_LEVEL).contains(&level), "invalid interrupt level {level}");

        self.pending |= level_bit(level);
        self.update_level();

        log::trace!("Interrupt level {level} asserted; CPU line now {}", self.level);
    }

    pub fn clear(&mut self, level: u8) {
        self.pending &= !level_bit(level);
        self.update_level();
    }

    /// Called by the CPU when it takes an interrupt
    pub fn acknowledge(&mut self, level: u8) {
        log::trace!("Interrupt level {level} acknowledged");

        self.clear(level);
    }

    pub fn set_enabled(&mut self, level: u8, enabled: bool) {
        if enabled {
            self.enabled |= level_bit(level);
        } else {
            self.enabled &= !level_bit(level);
        }
        self.update_level();
    }

    pub fn set_priority_mask(&mut self, mask: u8) {
        self.priority_mask = mask & 7;
        self.update_level();
    }

    #[inline]
    #[must_use]
    pub fn is_pending(&self, level: u8) -> bool {
        self.pending & level_bit(level) != 0
    }

    #[inline]
    #[must_use]
    pub fn priority_mask(&self) -> u8 {
        self.priority_mask
    }

    /// Highest pending, enabled level above the priority mask, or 0 if none. Level 7 ignores
    /// both the enable bits and the mask.
    #[inline]
    #[must_use]
    pub fn interrupt_level(&self) -> u8 {
        self.level
    }

    fn update_level(&mut self) {
        let active = self.pending & (self.enabled | (1 << NMI_LEVEL));
        if active == 0 {
            self.level = 0;
            return;
        }

        let highest = 7 - active.leading_zeros() as u8;
        self.level =
            if highest == NMI_LEVEL || highest > self.priority_mask { highest } else { 0 };
    }
}

// Levels outside 1-7 do not name a source and map to no bit
fn level_bit(level: u8) -> u8 {
    if (1..=NMI_LEVEL).contains(&level) { 1 << level } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn disabled_sources_stay_pending() {
        let mut controller = InterruptController::new();
        controller.assert(MainInterrupt::Horizontal.level());
        assert!(controller.is_pending(4));
        assert_eq!(controller.interrupt_level(), 0);

        controller.set_enabled(4, true);
        assert_eq!(controller.interrupt_level(), 4);
    }

    #[test]
    fn highest_level_wins() {
        let mut controller = InterruptController::new();
        for level in 1..=6 {
            controller.set_enabled(level, true);
        }

        controller.assert(MainInterrupt::Horizontal.level());
        controller.assert(MainInterrupt::Vertical.level());
        assert_eq!(controller.interrupt_level(), 6);

        controller.acknowledge(6);
        assert_eq!(controller.interrupt_level(), 4);

        controller.acknowledge(4);
        assert_eq!(controller.interrupt_level(), 0);
    }

    #[test]
    fn priority_mask_blocks_lower_levels() {
        let mut controller = InterruptController::new();
        controller.set_enabled(SubInterrupt::Timer.level(), true);
        controller.set_priority_mask(3);
        controller.assert(SubInterrupt::Timer.level());
        assert_eq!(controller.interrupt_level(), 0);

        controller.set_priority_mask(2);
        assert_eq!(controller.interrupt_level(), 3);

        controller.assert(NMI_LEVEL);
        controller.set_priority_mask(7);
        assert_eq!(controller.interrupt_level(), 7);
    }

    #[test]
    fn out_of_range_levels_are_ignored() {
        let mut controller = InterruptController::new();
        controller.set_enabled(MainInterrupt::Vertical.level(), true);
        controller.assert(MainInterrupt::Vertical.level());

        controller.acknowledge(0);
        controller.acknowledge(8);
        controller.clear(200);
        controller.set_enabled(9, false);
        assert!(!controller.is_pending(8));
        assert_eq!(controller.interrupt_level(), 6);
    }
}
