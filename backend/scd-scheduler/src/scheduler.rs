//! Per-scanline frame scheduler
//!
//! A frame is run one scanline at a time. Each line first does its housekeeping (audio slice,
//! CD transfer and timer, controller latch, cycle budgets, DMA), then runs the CPUs through an
//! HBlank sub-window followed by the rest of the line. Line timing events (H interrupt, render,
//! VBlank entry) happen between the two sub-windows, except on the VBlank entry line, which counts
//! down the H interrupt before its HBlank window.


use crate::audio::{AudioFrameBuffer, ExtrapolationTable};
use crate::dma::{DmaSlot, LineType};
use crate::hardware::{AudioDump, CdUnit, CpuOdometer, Hardware, InputLatch, SoundChips, SoundCpu, Vdp};
use crate::interrupts::MainInterrupt;
use crate::led;
use crate::signals::BusSignals;
use crate::snapshot::SchedulerSnapshot;
use crate::strategy::{CoarseStrategy, CycleAccurateStrategy, FrameStrategy};
use crate::timing::{CyclesPerLine, WindowOffsets, WindowTargets};
use crate::vdp::{VdpStatus, VdpTimingRegisters};
use bincode::{Decode, Encode};
use scd_scheduler_config::{ConfigError, Interleaving, SchedulerConfig, TimingMode};
use std::cmp::Ordering;

const Z80_INTERRUPT_DATA: u8 = 0xFF;

/// Frame-relative cycle counts that each CPU is allowed to reach by the end of the current line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct CycleBudgets {
    pub main: u64,
    pub sub: u64,
    pub z80: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Visible,
    /// First line after the active display
    VBlankEntry,
    Blanking,
}

impl LineKind {
    #[inline]
    #[must_use]
    pub fn classify(scanline: u16, visible_lines: u16) -> Self {
        match scanline.cmp(&visible_lines) {
            Ordering::Less => Self::Visible,
            Ordering::Equal => Self::VBlankEntry,
            Ordering::Greater => Self::Blanking,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameVariant {
    pub render_enabled: bool,
    pub interleaving: Interleaving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub frame_number: u64,
    pub timing_mode: TimingMode,
    pub visible_lines: u16,
    pub total_lines: u16,
    pub h_interrupts: u32,
    pub v_interrupt_line: Option<u16>,
    pub dma_penalty_cycles: u64,
    pub sub_cpu_halted_lines: u32,
    /// Budgets at the end of the frame
    pub budgets: CycleBudgets,
    pub samples: u32,
}

#[derive(Debug, Clone)]
pub struct FrameScheduler {
    timing_mode: TimingMode,
    cycles_per_line: CyclesPerLine,
    main_cpu_quantum: u32,
    sub_cpu_quantum: u32,
    bus_request_timeout: Option<u32>,
    show_cd_led: bool,
    extrapolation: ExtrapolationTable,
    audio: AudioFrameBuffer,
    budgets: CycleBudgets,
    h_interrupt_counter: i32,
    signals: BusSignals,
    frame_count: u64,
    warned_ntsc_v30: bool,
}

impl FrameScheduler {
    /// # Errors
    ///
    /// Returns an error if the config fails validation.
    pub fn new(config: &SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let extrapolation =
            ExtrapolationTable::new(config.audio_sample_rate, config.timing_mode);
        let audio = AudioFrameBuffer::new(extrapolation.samples_per_frame());

        Ok(Self {
            timing_mode: config.timing_mode,
            cycles_per_line: CyclesPerLine::new(config.timing_mode, config.sub_cpu_cycles_per_line),
            main_cpu_quantum: config.main_cpu_quantum,
            sub_cpu_quantum: config.sub_cpu_quantum,
            bus_request_timeout: config.bus_request_timeout,
            show_cd_led: config.show_cd_led,
            extrapolation,
            audio,
            budgets: CycleBudgets::default(),
            h_interrupt_counter: 0,
            signals: BusSignals::new(config.timing_mode, config.bus_request_timeout),
            frame_count: 0,
            warned_ntsc_v30: false,
        })
    }

    /// Apply a new config between frames. The audio table is only rebuilt if the sample rate or
    /// timing mode changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the config fails validation, in which case nothing is changed.
    pub fn reload_config(&mut self, config: &SchedulerConfig) -> Result<(), ConfigError> {
        config.validate()?;

        if !self.extrapolation.matches(config.audio_sample_rate, config.timing_mode) {
            self.extrapolation =
                ExtrapolationTable::new(config.audio_sample_rate, config.timing_mode);
            self.audio.resize(self.extrapolation.samples_per_frame());
        }

        self.timing_mode = config.timing_mode;
        self.cycles_per_line =
            CyclesPerLine::new(config.timing_mode, config.sub_cpu_cycles_per_line);
        self.main_cpu_quantum = config.main_cpu_quantum;
        self.sub_cpu_quantum = config.sub_cpu_quantum;
        self.bus_request_timeout = config.bus_request_timeout;
        self.show_cd_led = config.show_cd_led;
        self.signals.bus_arbiter.set_timeout(config.bus_request_timeout);
        self.signals.set_timing_mode(config.timing_mode);

        log::info!("Reloaded scheduler config: {config:?}");

        Ok(())
    }

    pub fn run_frame<H: Hardware>(&mut self, hw: &mut H, variant: FrameVariant) -> FrameReport {
        match variant.interleaving {
            Interleaving::Coarse => {
                self.run_frame_with(hw, variant.render_enabled, &mut CoarseStrategy)
            }
            Interleaving::CycleAccurate => {
                let mut strategy =
                    CycleAccurateStrategy::new(self.main_cpu_quantum, self.sub_cpu_quantum);
                self.run_frame_with(hw, variant.render_enabled, &mut strategy)
            }
        }
    }

    fn run_frame_with<H: Hardware, S: FrameStrategy>(
        &mut self,
        hw: &mut H,
        render_enabled: bool,
        strategy: &mut S,
    ) -> FrameReport {
        let registers = hw.vdp().timing_registers();
        let visible_lines = self.visible_lines(&registers);
        let total_lines = self.timing_mode.scanlines_per_frame();

        self.start_frame(hw, &registers);

        let mut report = FrameReport {
            frame_number: self.frame_count,
            timing_mode: self.timing_mode,
            visible_lines,
            total_lines,
            h_interrupts: 0,
            v_interrupt_line: None,
            dma_penalty_cycles: 0,
            sub_cpu_halted_lines: 0,
            budgets: CycleBudgets::default(),
            samples: 0,
        };

        for scanline in 0..total_lines {
            self.signals.set_scanline(scanline);

            let line_kind = LineKind::classify(scanline, visible_lines);
            let budgets_before = self.run_line_housekeeping(hw, line_kind, &mut report);
            strategy.begin_line(budgets_before);

            match line_kind {
                LineKind::Visible => {
                    self.run_visible_line(hw, strategy, render_enabled, &mut report);
                }
                LineKind::VBlankEntry => self.run_vblank_entry_line(hw, strategy, &mut report),
                LineKind::Blanking => self.run_blanking_line(hw, strategy),
            }
        }

        self.finish_frame(hw, render_enabled);

        report.budgets = self.budgets;
        report.samples = self.audio.written();
        self.frame_count += 1;

        log::trace!("Frame complete: {report:?}");

        report
    }

    fn visible_lines(&mut self, registers: &VdpTimingRegisters) -> u16 {
        let ntsc_v30 = registers.is_ntsc_v30(self.timing_mode);
        if ntsc_v30 && !self.warned_ntsc_v30 {
            log::warn!("V30 display mode selected in NTSC; using 224 active lines");
        }
        self.warned_ntsc_v30 = ntsc_v30;

        registers.visible_scanlines(self.timing_mode)
    }

    fn start_frame<H: Hardware>(&mut self, hw: &mut H, registers: &VdpTimingRegisters) {
        let previous_frame_main_cycles = self.budgets.main;
        self.budgets = CycleBudgets::default();
        self.signals.bus_arbiter.start_frame(previous_frame_main_cycles);
        self.signals.dma.start_frame();

        hw.main_cpu().reset_odometer();
        hw.sub_cpu().reset_odometer();
        hw.sound_cpu().reset_odometer();
        hw.vdp().begin_frame();

        let status = self.signals.vdp_status_mut();
        status.clear(VdpStatus::VBLANK | VdpStatus::HBLANK);
        if registers.interlaced {
            status.toggle(VdpStatus::ODD_FRAME);
        }

        self.h_interrupt_counter = i32::from(registers.h_interrupt_interval);
        self.audio.start_frame();
    }

    fn run_line_housekeeping<H: Hardware>(
        &mut self,
        hw: &mut H,
        line_kind: LineKind,
        report: &mut FrameReport,
    ) -> CycleBudgets {
        let samples = self.extrapolation.line(self.signals.scanline());
        hw.sound_chips().advance(self.audio.next_window(samples));

        hw.cd_unit().advance_transfer(&mut self.signals);
        hw.cd_unit().advance_timer(&mut self.signals);
        hw.input().latch();

        let registers = hw.vdp().timing_registers();
        self.sync_main_interrupt_enables(&registers);
        if !self.signals.main_interrupts.is_pending(MainInterrupt::Vertical.level()) {
            self.signals.vdp_status_mut().clear(VdpStatus::V_INTERRUPT_PENDING);
        }

        let budgets_before = self.budgets;
        self.budgets.main += self.cycles_per_line.main;
        self.budgets.z80 += self.cycles_per_line.z80;

        let main_cycle = hw.main_cpu().odometer();
        if self.signals.bus_arbiter.secondary_cpu_is_runnable(main_cycle) {
            self.budgets.sub += self.cycles_per_line.sub;
        } else {
            report.sub_cpu_halted_lines += 1;
        }

        if self.signals.dma.pending_length() != 0 {
            let line_type = if line_kind == LineKind::Visible && registers.display_enabled {
                LineType::Active
            } else {
                LineType::Blanked
            };
            let slot = DmaSlot {
                h_display_size: registers.horizontal_display_size,
                line_type,
                main_cycles_per_line: self.cycles_per_line.main,
            };

            // Stall cycles go to the CPU's odometer, not the budget, so the CPU simply gets less
            // done this line
            let penalty = self.signals.dma.consume(self.budgets.main, slot);
            hw.main_cpu().add_cycles(penalty);
            report.dma_penalty_cycles += penalty;
        }

        budgets_before
    }

    fn run_visible_line<H: Hardware, S: FrameStrategy>(
        &mut self,
        hw: &mut H,
        strategy: &mut S,
        render_enabled: bool,
        report: &mut FrameReport,
    ) {
        let scanline = self.signals.scanline();

        self.signals.vdp_status_mut().set(VdpStatus::HBLANK);
        let targets = self.window_targets(strategy.hblank_offsets(LineKind::Visible));
        strategy.run_window(hw, &mut self.signals, targets);
        self.signals.vdp_status_mut().clear(VdpStatus::HBLANK);

        self.h_interrupt_counter -= 1;
        if self.h_interrupt_counter < 0 {
            let registers = hw.vdp().timing_registers();
            self.h_interrupt_counter = i32::from(registers.h_interrupt_interval);
            self.sync_main_interrupt_enables(&registers);
            self.signals.main_interrupts.assert(MainInterrupt::Horizontal.level());
            report.h_interrupts += 1;

            log::trace!("H interrupt on line {scanline}");
        }

        if render_enabled {
            hw.vdp().render_scanline(scanline, self.signals.vdp_status());
        }

        let targets = self.window_targets(WindowOffsets::REMAINDER);
        strategy.run_window(hw, &mut self.signals, targets);
    }

    fn run_vblank_entry_line<H: Hardware, S: FrameStrategy>(
        &mut self,
        hw: &mut H,
        strategy: &mut S,
        report: &mut FrameReport,
    ) {
        let scanline = self.signals.scanline();

        // The counter still runs down on this line but is not reloaded, so no further H
        // interrupts fire until the next frame reseeds it
        self.h_interrupt_counter -= 1;
        if self.h_interrupt_counter < 0 {
            let registers = hw.vdp().timing_registers();
            self.sync_main_interrupt_enables(&registers);
            self.signals.main_interrupts.assert(MainInterrupt::Horizontal.level());
            report.h_interrupts += 1;

            log::trace!("H interrupt on line {scanline}");
        }

        self.signals.vdp_status_mut().set(VdpStatus::HBLANK | VdpStatus::VBLANK);
        let targets = self.window_targets(strategy.hblank_offsets(LineKind::VBlankEntry));
        strategy.run_window(hw, &mut self.signals, targets);

        let status = self.signals.vdp_status_mut();
        status.clear(VdpStatus::HBLANK);
        status.set(VdpStatus::V_INTERRUPT_PENDING);

        let registers = hw.vdp().timing_registers();
        self.sync_main_interrupt_enables(&registers);
        self.signals.main_interrupts.assert(MainInterrupt::Vertical.level());
        report.v_interrupt_line = Some(scanline);
        hw.sound_cpu().interrupt(Z80_INTERRUPT_DATA);

        log::trace!("Entered VBlank on line {scanline}");

        let targets = self.window_targets(WindowOffsets::REMAINDER);
        strategy.run_window(hw, &mut self.signals, targets);
    }

    fn run_blanking_line<H: Hardware, S: FrameStrategy>(&mut self, hw: &mut H, strategy: &mut S) {
        self.signals.vdp_status_mut().set(VdpStatus::HBLANK);
        let targets = self.window_targets(strategy.hblank_offsets(LineKind::Blanking));
        strategy.run_window(hw, &mut self.signals, targets);
        self.signals.vdp_status_mut().clear(VdpStatus::HBLANK);

        let targets = self.window_targets(WindowOffsets::REMAINDER);
        strategy.run_window(hw, &mut self.signals, targets);
    }

    fn finish_frame<H: Hardware>(&mut self, hw: &mut H, render_enabled: bool) {
        hw.sound_chips().special_update(&mut self.audio);
        hw.cd_unit().mix_cd_audio(&mut self.audio);

        if hw.audio_dump().capture_active() {
            hw.audio_dump().dump_audio_frame(&self.audio);
        }

        if render_enabled && self.show_cd_led {
            let led_status = hw.cd_unit().led_status();
            if let Some(frame_buffer) = hw.vdp().frame_buffer_mut() {
                led::draw_cd_leds(frame_buffer, led_status);
            }
        }
    }

    fn sync_main_interrupt_enables(&mut self, registers: &VdpTimingRegisters) {
        let interrupts = &mut self.signals.main_interrupts;
        interrupts
            .set_enabled(MainInterrupt::External.level(), registers.external_interrupt_enabled);
        interrupts.set_enabled(MainInterrupt::Horizontal.level(), registers.h_interrupt_enabled);
        interrupts.set_enabled(MainInterrupt::Vertical.level(), registers.v_interrupt_enabled);
    }

    #[inline]
    fn window_targets(&self, offsets: WindowOffsets) -> WindowTargets {
        offsets.targets(self.budgets.main, self.budgets.sub, self.budgets.z80)
    }

    #[must_use]
    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            budgets: self.budgets,
            h_interrupt_counter: self.h_interrupt_counter,
            signals: self.signals.clone(),
            frame_count: self.frame_count,
        }
    }

    /// Restore scheduler state saved between frames. Settings that come from the config (timing
    /// mode, bus request timeout) keep their current values.
    pub fn restore(&mut self, snapshot: &SchedulerSnapshot) {
        self.budgets = snapshot.budgets;
        self.h_interrupt_counter = snapshot.h_interrupt_counter;
        self.signals = snapshot.signals.clone();
        self.frame_count = snapshot.frame_count;

        self.signals.bus_arbiter.set_timeout(self.bus_request_timeout);
        self.signals.set_timing_mode(self.timing_mode);
    }

    #[inline]
    #[must_use]
    pub fn signals(&self) -> &BusSignals {
        &self.signals
    }

    #[inline]
    pub fn signals_mut(&mut self) -> &mut BusSignals {
        &mut self.signals
    }

    #[inline]
    #[must_use]
    pub fn budgets(&self) -> CycleBudgets {
        self.budgets
    }

    #[inline]
    #[must_use]
    pub fn cycles_per_line(&self) -> CyclesPerLine {
        self.cycles_per_line
    }

    #[inline]
    #[must_use]
    pub fn audio_buffer(&self) -> &AudioFrameBuffer {
        &self.audio
    }

    #[inline]
    #[must_use]
    pub fn extrapolation_table(&self) -> &ExtrapolationTable {
        &self.extrapolation
    }

    #[inline]
    #[must_use]
    pub fn timing_mode(&self) -> TimingMode {
        self.timing_mode
    }

    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
