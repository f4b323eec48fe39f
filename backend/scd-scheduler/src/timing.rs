//! Per-line cycle budgets and the fixed HBlank offsets used to split each scanline

use bincode::{Decode, Encode};
use scd_scheduler_config::{NATIVE_M68K_DIVIDER, TimingMode, Z80_DIVIDER};

// Cycles from the end of the HBlank sub-window to the end of the line. These values come from
// hardware testing against games and must not be "rounded"
pub const MAIN_CPU_HBLANK_CYCLES: u64 = 404;
pub const SUB_CPU_HBLANK_CYCLES: u64 = 658;

// The line that enters VBlank has a longer HBlank sub-window
pub const MAIN_CPU_VBLANK_ENTRY_CYCLES: u64 = 360;
pub const SUB_CPU_VBLANK_ENTRY_CYCLES: u64 = 586;
pub const Z80_VBLANK_ENTRY_CYCLES: u64 = 168;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct CyclesPerLine {
    pub main: u64,
    pub sub: u64,
    pub z80: u64,
}

impl CyclesPerLine {
    #[must_use]
    pub fn new(timing_mode: TimingMode, sub_cpu_cycles_per_line: u32) -> Self {
        let lines_per_second = u64::from(timing_mode.frames_per_second())
            * u64::from(timing_mode.scanlines_per_frame());
        let mclk_frequency = timing_mode.master_clock_rate();

        Self {
            main: div_round(mclk_frequency, NATIVE_M68K_DIVIDER * lines_per_second),
            sub: sub_cpu_cycles_per_line.into(),
            z80: div_round(mclk_frequency, Z80_DIVIDER * lines_per_second),
        }
    }
}

fn div_round(n: u64, d: u64) -> u64 {
    (n + d / 2) / d
}

/// How far before the end of the line each CPU stops during a sub-window. `None` means the CPU
/// does not run at all during that sub-window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOffsets {
    pub main: u64,
    pub sub: Option<u64>,
    pub z80: Option<u64>,
}

impl WindowOffsets {
    /// HBlank sub-window when each CPU runs in one burst; only the main CPU runs
    pub const COARSE_HBLANK: Self = Self { main: MAIN_CPU_HBLANK_CYCLES, sub: None, z80: None };

    /// HBlank sub-window when the 68000s are interleaved
    pub const INTERLEAVED_HBLANK: Self =
        Self { main: MAIN_CPU_HBLANK_CYCLES, sub: Some(SUB_CPU_HBLANK_CYCLES), z80: None };

    pub const VBLANK_ENTRY: Self = Self {
        main: MAIN_CPU_VBLANK_ENTRY_CYCLES,
        sub: Some(SUB_CPU_VBLANK_ENTRY_CYCLES),
        z80: Some(Z80_VBLANK_ENTRY_CYCLES),
    };

    /// Rest of the line after HBlank; every CPU runs to its full budget
    pub const REMAINDER: Self = Self { main: 0, sub: Some(0), z80: Some(0) };

    #[inline]
    #[must_use]
    pub fn targets(self, main: u64, sub: u64, z80: u64) -> WindowTargets {
        WindowTargets {
            main: main.saturating_sub(self.main),
            sub: self.sub.map(|offset| sub.saturating_sub(offset)),
            z80: self.z80.map(|offset| z80.saturating_sub(offset)),
        }
    }
}

/// Absolute frame-relative cycle counts that each CPU should reach by the end of a sub-window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowTargets {
    pub main: u64,
    pub sub: Option<u64>,
    pub z80: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ntsc_cycles_per_line() {
        let cpl = CyclesPerLine::new(TimingMode::Ntsc, 795);
        assert_eq!(cpl, CyclesPerLine { main: 488, sub: 795, z80: 228 });
    }

    #[test]
    fn pal_cycles_per_line() {
        let cpl = CyclesPerLine::new(TimingMode::Pal, 795);
        assert_eq!(cpl, CyclesPerLine { main: 486, sub: 795, z80: 227 });
    }

    #[test]
    fn window_targets_never_underflow() {
        let targets = WindowOffsets::VBLANK_ENTRY.targets(100, 0, 500);
        assert_eq!(targets, WindowTargets { main: 0, sub: Some(0), z80: Some(332) });

        let targets = WindowOffsets::COARSE_HBLANK.targets(488, 795, 228);
        assert_eq!(targets, WindowTargets { main: 84, sub: None, z80: None });
    }
}
