//! How CPU execution is divided within each sub-window of a scanline

use crate::hardware::{CpuOdometer, Hardware};
use crate::scheduler::{CycleBudgets, LineKind};
use crate::signals::BusSignals;
use crate::timing::{WindowOffsets, WindowTargets};

pub trait FrameStrategy {
    /// Offsets for the sub-window that runs with HBlank set
    fn hblank_offsets(&self, line_kind: LineKind) -> WindowOffsets;

    /// Called after the line's housekeeping with the budgets as they were before this line's
    /// cycles were added.
    fn begin_line(&mut self, budgets_before: CycleBudgets);

    fn run_window<H: Hardware>(
        &mut self,
        hw: &mut H,
        signals: &mut BusSignals,
        targets: WindowTargets,
    );
}

/// Each CPU runs straight to its target, one after the other.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoarseStrategy;

impl FrameStrategy for CoarseStrategy {
    fn hblank_offsets(&self, line_kind: LineKind) -> WindowOffsets {
        match line_kind {
            LineKind::VBlankEntry => WindowOffsets::VBLANK_ENTRY,
            LineKind::Visible | LineKind::Blanking => WindowOffsets::COARSE_HBLANK,
        }
    }

    fn begin_line(&mut self, _budgets_before: CycleBudgets) {}

    fn run_window<H: Hardware>(
        &mut self,
        hw: &mut H,
        signals: &mut BusSignals,
        targets: WindowTargets,
    ) {
        hw.main_cpu().run_until(targets.main, signals);

        if let Some(sub_target) = targets.sub {
            hw.sub_cpu().run_until(sub_target, signals);
        }

        if let Some(z80_target) = targets.z80 {
            hw.sound_cpu().run_until(z80_target, signals);
        }
    }
}

/// Main and sub CPUs alternate in fixed steps so that communication between them through shared
/// registers sees a plausible ordering. The step cursors carry over from one sub-window to the
/// next within a line.
#[derive(Debug, Clone, Copy)]
pub struct CycleAccurateStrategy {
    main_quantum: u64,
    sub_quantum: u64,
    main_cursor: u64,
    sub_cursor: u64,
}

impl CycleAccurateStrategy {
    #[must_use]
    pub fn new(main_quantum: u32, sub_quantum: u32) -> Self {
        Self {
            main_quantum: main_quantum.into(),
            sub_quantum: sub_quantum.into(),
            main_cursor: 0,
            sub_cursor: 0,
        }
    }
}

impl FrameStrategy for CycleAccurateStrategy {
    fn hblank_offsets(&self, line_kind: LineKind) -> WindowOffsets {
        match line_kind {
            LineKind::VBlankEntry => WindowOffsets::VBLANK_ENTRY,
            LineKind::Visible | LineKind::Blanking => WindowOffsets::INTERLEAVED_HBLANK,
        }
    }

    fn begin_line(&mut self, budgets_before: CycleBudgets) {
        self.main_cursor = budgets_before.main + self.main_quantum;
        self.sub_cursor = budgets_before.sub + self.sub_quantum;
    }

    fn run_window<H: Hardware>(
        &mut self,
        hw: &mut H,
        signals: &mut BusSignals,
        targets: WindowTargets,
    ) {
        while self.main_cursor < targets.main {
            hw.main_cpu().run_until(self.main_cursor, signals);
            self.main_cursor += self.main_quantum;

            if targets.sub.is_some_and(|sub_target| self.sub_cursor < sub_target) {
                hw.sub_cpu().run_until(self.sub_cursor, signals);
                self.sub_cursor += self.sub_quantum;
            }
        }

        // Stepping stops short of the window boundary; finish both CPUs exactly on it
        hw.main_cpu().run_until(targets.main, signals);
        if let Some(sub_target) = targets.sub {
            hw.sub_cpu().run_until(sub_target, signals);
        }

        if let Some(z80_target) = targets.z80 {
            hw.sound_cpu().run_until(z80_target, signals);
        }
    }
}
