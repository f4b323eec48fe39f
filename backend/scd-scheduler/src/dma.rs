//! VDP DMA timing, consumed once per scanline
//!
//! The transfer itself happens inside the VDP; this only tracks how much of it is still in
//! flight and how many main CPU cycles the bus is held for.

use crate::vdp::HorizontalDisplaySize;
use bincode::{Decode, Encode};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum DmaMode {
    #[default]
    MemoryToVram,
    VramFill,
    VramCopy,
}

impl Display for DmaMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemoryToVram => write!(f, "68K to VRAM"),
            Self::VramFill => write!(f, "VRAM fill"),
            Self::VramCopy => write!(f, "VRAM copy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    Active,
    Blanked,
}

/// Everything about the current line that determines DMA throughput and cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaSlot {
    pub h_display_size: HorizontalDisplaySize,
    pub line_type: LineType,
    pub main_cycles_per_line: u64,
}

impl DmaSlot {
    #[must_use]
    pub fn capacity(self, mode: DmaMode) -> u32 {
        match (mode, self.h_display_size, self.line_type) {
            (DmaMode::MemoryToVram, HorizontalDisplaySize::ThirtyTwoCell, LineType::Active) => 16,
            (DmaMode::MemoryToVram, HorizontalDisplaySize::FortyCell, LineType::Active) => 18,
            (DmaMode::MemoryToVram, HorizontalDisplaySize::ThirtyTwoCell, LineType::Blanked) => 167,
            (DmaMode::MemoryToVram, HorizontalDisplaySize::FortyCell, LineType::Blanked) => 205,
            (DmaMode::VramFill, HorizontalDisplaySize::ThirtyTwoCell, LineType::Active) => 15,
            (DmaMode::VramFill, HorizontalDisplaySize::FortyCell, LineType::Active) => 17,
            (DmaMode::VramFill, HorizontalDisplaySize::ThirtyTwoCell, LineType::Blanked) => 166,
            (DmaMode::VramFill, HorizontalDisplaySize::FortyCell, LineType::Blanked) => 204,
            (DmaMode::VramCopy, HorizontalDisplaySize::ThirtyTwoCell, LineType::Active) => 8,
            (DmaMode::VramCopy, HorizontalDisplaySize::FortyCell, LineType::Active) => 9,
            (DmaMode::VramCopy, HorizontalDisplaySize::ThirtyTwoCell, LineType::Blanked) => 83,
            (DmaMode::VramCopy, HorizontalDisplaySize::FortyCell, LineType::Blanked) => 102,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct DmaTimer {
    mode: DmaMode,
    pending_length: u32,
    last_consume_cycle: Option<u64>,
}

impl DmaTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the VDP when a DMA is triggered. A new DMA replaces any unfinished one.
    pub fn start(&mut self, mode: DmaMode, length_words: u32) {
        log::trace!("DMA started: {mode}, {length_words} words");

        self.mode = mode;
        self.pending_length = length_words;
    }

    #[inline]
    #[must_use]
    pub fn pending_length(&self) -> u32 {
        self.pending_length
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> DmaMode {
        self.mode
    }

    /// Advance the DMA by one line's worth of transfer and return the number of main CPU cycles
    /// the main CPU loses to it. Only 68K-to-VRAM transfers hold the main CPU bus, and a line
    /// that finishes a transfer early only costs the proportional share of the line.
    ///
    /// Must be called at most once per line; `current_main_cycles` is the main CPU's budget for
    /// the line.
    pub fn consume(&mut self, current_main_cycles: u64, slot: DmaSlot) -> u64 {
        debug_assert_ne!(
            self.last_consume_cycle,
            Some(current_main_cycles),
            "DMA consumed twice in the same line"
        );
        self.last_consume_cycle = Some(current_main_cycles);

        if self.pending_length == 0 {
            return 0;
        }

        let capacity = slot.capacity(self.mode);
        let transferred = self.pending_length.min(capacity);
        self.pending_length -= transferred;

        if self.pending_length == 0 {
            log::trace!("DMA in mode {} complete", self.mode);
        }

        match self.mode {
            DmaMode::MemoryToVram => {
                u64::from(transferred) * slot.main_cycles_per_line / u64::from(capacity)
            }
            DmaMode::VramFill | DmaMode::VramCopy => 0,
        }
    }

    pub(crate) fn start_frame(&mut self) {
        self.last_consume_cycle = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    const H40_ACTIVE: DmaSlot = DmaSlot {
        h_display_size: HorizontalDisplaySize::FortyCell,
        line_type: LineType::Active,
        main_cycles_per_line: 488,
    };

    const H32_BLANKED: DmaSlot = DmaSlot {
        h_display_size: HorizontalDisplaySize::ThirtyTwoCell,
        line_type: LineType::Blanked,
        main_cycles_per_line: 488,
    };

    #[test]
    fn memory_to_vram_penalty() {
        let mut dma = DmaTimer::new();
        dma.start(DmaMode::MemoryToVram, 40);

        assert_eq!(dma.consume(488, H40_ACTIVE), 488);
        assert_eq!(dma.pending_length(), 22);
        assert_eq!(dma.consume(976, H40_ACTIVE), 488);
        assert_eq!(dma.pending_length(), 4);

        // 4 of 18 slots used
        assert_eq!(dma.consume(1464, H40_ACTIVE), 4 * 488 / 18);
        assert_eq!(dma.pending_length(), 0);

        assert_eq!(dma.consume(1952, H40_ACTIVE), 0);
    }

    #[test]
    fn fill_and_copy_do_not_halt_cpu() {
        let mut dma = DmaTimer::new();
        dma.start(DmaMode::VramFill, 500);
        assert_eq!(dma.consume(488, H32_BLANKED), 0);
        assert_eq!(dma.pending_length(), 500 - 166);

        dma.start(DmaMode::VramCopy, 100);
        assert_eq!(dma.consume(976, H32_BLANKED), 0);
        assert_eq!(dma.pending_length(), 17);
    }

    #[test]
    fn blanked_lines_transfer_faster() {
        let mut dma = DmaTimer::new();
        dma.start(DmaMode::MemoryToVram, 1000);
        let _ = dma.consume(488, H32_BLANKED);
        assert_eq!(dma.pending_length(), 1000 - 167);
    }
}
