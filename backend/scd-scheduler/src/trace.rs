//! Scripted stand-in hardware that records everything the scheduler asks of it
//!
//! CPUs execute fixed-length "instructions" and can be scripted to raise bus requests, start
//! DMAs, or assert sub CPU interrupts the first time they run on a given scanline. Scripts re-arm
//! at every frame start.

use crate::audio::{AudioFrameBuffer, AudioWindow};
use crate::dma::DmaMode;
use crate::hardware::{
    AudioDump, CdUnit, CpuOdometer, Hardware, InputLatch, SoundChips, SoundCpu, Vdp,
};
use crate::interrupts::SubInterrupt;
use crate::led::{Color, FRAME_BUFFER_WIDTH, LedStatus};
use crate::signals::BusSignals;
use crate::vdp::{HorizontalDisplaySize, VdpStatus, VdpTimingRegisters};

const FRAME_BUFFER_LINES: usize = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuRole {
    Main,
    Sub,
    Sound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedAction {
    RequestSubBus,
    ReleaseSubBus,
    StartDma { mode: DmaMode, length_words: u32 },
    AssertSubInterrupt(SubInterrupt),
}

#[derive(Debug, Clone, Copy)]
struct ScriptEntry {
    scanline: u16,
    action: ScriptedAction,
    fired: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRecord {
    pub scanline: u16,
    pub target: u64,
    pub odometer: u64,
    pub status: VdpStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptRecord {
    pub scanline: u16,
    pub level: u8,
}

#[derive(Debug, Clone)]
pub struct TraceCpu {
    role: CpuRole,
    instruction_cycles: u64,
    odometer: u64,
    instructions_executed: u64,
    scanline: u16,
    script: Vec<ScriptEntry>,
    record_runs: bool,
    runs: Vec<RunRecord>,
    interrupts_taken: Vec<InterruptRecord>,
    z80_interrupts: Vec<InterruptRecord>,
}

impl TraceCpu {
    /// Zero-length instructions would never reach a target, so they are lengthened to one cycle.
    #[must_use]
    pub fn new(role: CpuRole, instruction_cycles: u64) -> Self {
        if instruction_cycles == 0 {
            log::warn!("{role:?} trace CPU given zero-length instructions; using 1 cycle");
        }

        Self {
            role,
            instruction_cycles: instruction_cycles.max(1),
            odometer: 0,
            instructions_executed: 0,
            scanline: 0,
            script: Vec::new(),
            record_runs: false,
            runs: Vec::new(),
            interrupts_taken: Vec::new(),
            z80_interrupts: Vec::new(),
        }
    }

    /// Perform `action` the first time this CPU runs on `scanline` in each frame.
    pub fn script(&mut self, scanline: u16, action: ScriptedAction) {
        self.script.push(ScriptEntry { scanline, action, fired: false });
    }

    /// Record every `run_until` call. Runs are cleared at the start of each frame.
    pub fn set_record_runs(&mut self, record_runs: bool) {
        self.record_runs = record_runs;
    }

    #[must_use]
    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    pub fn runs_on_line(&self, scanline: u16) -> impl Iterator<Item = &RunRecord> + '_ {
        self.runs.iter().filter(move |run| run.scanline == scanline)
    }

    #[must_use]
    pub fn interrupts_taken(&self) -> &[InterruptRecord] {
        &self.interrupts_taken
    }

    #[must_use]
    pub fn z80_interrupts(&self) -> &[InterruptRecord] {
        &self.z80_interrupts
    }

    #[must_use]
    pub fn instructions_executed(&self) -> u64 {
        self.instructions_executed
    }

    #[must_use]
    pub fn instruction_cycles(&self) -> u64 {
        self.instruction_cycles
    }

    fn run_script(&mut self, signals: &mut BusSignals) {
        let scanline = signals.scanline();
        let odometer = self.odometer;

        for entry in self.script.iter_mut().filter(|entry| !entry.fired && entry.scanline == scanline)
        {
            entry.fired = true;

            log::trace!("{:?} CPU scripted action on line {scanline}: {:?}", self.role, entry.action);

            match entry.action {
                ScriptedAction::RequestSubBus => signals.bus_arbiter.request_bus(odometer),
                ScriptedAction::ReleaseSubBus => signals.bus_arbiter.release_bus(),
                ScriptedAction::StartDma { mode, length_words } => {
                    signals.dma.start(mode, length_words);
                }
                ScriptedAction::AssertSubInterrupt(interrupt) => {
                    signals.sub_interrupts.assert(interrupt.level());
                }
            }
        }
    }

    fn poll_interrupt(&mut self, signals: &mut BusSignals) {
        let controller = match self.role {
            CpuRole::Main => &mut signals.main_interrupts,
            CpuRole::Sub => &mut signals.sub_interrupts,
            CpuRole::Sound => return,
        };

        let level = controller.interrupt_level();
        if level != 0 {
            controller.acknowledge(level);
            self.interrupts_taken.push(InterruptRecord { scanline: self.scanline, level });
        }
    }
}

impl CpuOdometer for TraceCpu {
    fn reset_odometer(&mut self) {
        self.odometer = 0;
        self.runs.clear();
        self.interrupts_taken.clear();
        self.z80_interrupts.clear();
        for entry in &mut self.script {
            entry.fired = false;
        }
    }

    fn run_until(&mut self, target_cycles: u64, signals: &mut BusSignals) {
        self.scanline = signals.scanline();
        self.run_script(signals);

        while self.odometer < target_cycles {
            self.poll_interrupt(signals);
            self.odometer += self.instruction_cycles;
            self.instructions_executed += 1;
        }

        if self.record_runs {
            self.runs.push(RunRecord {
                scanline: self.scanline,
                target: target_cycles,
                odometer: self.odometer,
                status: signals.vdp_status(),
            });
        }
    }

    fn add_cycles(&mut self, cycles: u64) {
        self.odometer += cycles;
    }

    fn odometer(&self) -> u64 {
        self.odometer
    }
}

impl SoundCpu for TraceCpu {
    fn interrupt(&mut self, data_bus: u8) {
        self.z80_interrupts.push(InterruptRecord { scanline: self.scanline, level: data_bus });
    }
}

#[derive(Debug, Clone)]
pub struct TraceVdp {
    pub registers: VdpTimingRegisters,
    frame_buffer: Vec<Color>,
    rendered: Vec<(u16, VdpStatus)>,
    frames_begun: u64,
}

impl TraceVdp {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registers: VdpTimingRegisters {
                h_interrupt_interval: 255,
                v_interrupt_enabled: true,
                display_enabled: true,
                horizontal_display_size: HorizontalDisplaySize::FortyCell,
                ..VdpTimingRegisters::default()
            },
            frame_buffer: vec![Color::default(); FRAME_BUFFER_WIDTH * FRAME_BUFFER_LINES],
            rendered: Vec::new(),
            frames_begun: 0,
        }
    }

    /// Lines rendered in the current frame, with the status register as seen while rendering
    #[must_use]
    pub fn rendered(&self) -> &[(u16, VdpStatus)] {
        &self.rendered
    }

    #[must_use]
    pub fn frames_begun(&self) -> u64 {
        self.frames_begun
    }

    #[must_use]
    pub fn frame_buffer(&self) -> &[Color] {
        &self.frame_buffer
    }
}

impl Default for TraceVdp {
    fn default() -> Self {
        Self::new()
    }
}

impl Vdp for TraceVdp {
    fn timing_registers(&self) -> VdpTimingRegisters {
        self.registers
    }

    fn begin_frame(&mut self) {
        self.rendered.clear();
        self.frame_buffer.fill(Color::default());
        self.frames_begun += 1;
    }

    fn render_scanline(&mut self, scanline: u16, status: VdpStatus) {
        self.rendered.push((scanline, status));
    }

    fn frame_buffer_mut(&mut self) -> Option<&mut [Color]> {
        Some(&mut self.frame_buffer)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TraceSound {
    line_sample_counts: Vec<u32>,
    samples_produced: u64,
    special_updates: u64,
    remaining_at_special_update: u32,
    frame_complete: bool,
}

impl TraceSound {
    /// Sample count requested on each line of the current frame
    #[must_use]
    pub fn line_sample_counts(&self) -> &[u32] {
        &self.line_sample_counts
    }

    #[must_use]
    pub fn samples_produced(&self) -> u64 {
        self.samples_produced
    }

    #[must_use]
    pub fn special_updates(&self) -> u64 {
        self.special_updates
    }

    #[must_use]
    pub fn remaining_at_special_update(&self) -> u32 {
        self.remaining_at_special_update
    }
}

impl SoundChips for TraceSound {
    fn advance(&mut self, window: AudioWindow<'_>) {
        if self.frame_complete {
            self.line_sample_counts.clear();
            self.frame_complete = false;
        }

        self.line_sample_counts.push(window.len() as u32);
        self.samples_produced += window.len() as u64;
        window.left.fill(1);
        window.right.fill(-1);
    }

    fn special_update(&mut self, buffer: &mut AudioFrameBuffer) {
        self.special_updates += 1;
        self.remaining_at_special_update = buffer.remaining();
        self.frame_complete = true;
    }
}

#[derive(Debug, Clone, Default)]
pub struct TraceCd {
    pub led: LedStatus,
    /// Assert the sub CPU timer interrupt every N timer ticks
    pub timer_interval: Option<u32>,
    transfers: u64,
    timer_ticks: u64,
    cd_audio_mixes: u64,
    dma_progress: Vec<u32>,
}

impl TraceCd {
    #[must_use]
    pub fn transfers(&self) -> u64 {
        self.transfers
    }

    #[must_use]
    pub fn timer_ticks(&self) -> u64 {
        self.timer_ticks
    }

    #[must_use]
    pub fn cd_audio_mixes(&self) -> u64 {
        self.cd_audio_mixes
    }

    /// Pending DMA length seen at the start of each line of the current frame
    #[must_use]
    pub fn dma_progress(&self) -> &[u32] {
        &self.dma_progress
    }
}

impl CdUnit for TraceCd {
    fn advance_transfer(&mut self, signals: &mut BusSignals) {
        if signals.scanline() == 0 {
            self.dma_progress.clear();
        }
        self.dma_progress.push(signals.dma.pending_length());
        self.transfers += 1;
    }

    fn advance_timer(&mut self, signals: &mut BusSignals) {
        self.timer_ticks += 1;

        let timer_fired = self
            .timer_interval
            .is_some_and(|interval| self.timer_ticks % u64::from(interval) == 0);
        if timer_fired {
            signals.sub_interrupts.assert(SubInterrupt::Timer.level());
        }
    }

    fn mix_cd_audio(&mut self, _buffer: &mut AudioFrameBuffer) {
        self.cd_audio_mixes += 1;
    }

    fn led_status(&self) -> LedStatus {
        self.led
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TraceInput {
    latches: u64,
}

impl TraceInput {
    #[must_use]
    pub fn latches(&self) -> u64 {
        self.latches
    }
}

impl InputLatch for TraceInput {
    fn latch(&mut self) {
        self.latches += 1;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TraceDump {
    pub active: bool,
    frames_dumped: u64,
    samples_dumped: u64,
}

impl TraceDump {
    #[must_use]
    pub fn frames_dumped(&self) -> u64 {
        self.frames_dumped
    }

    #[must_use]
    pub fn samples_dumped(&self) -> u64 {
        self.samples_dumped
    }
}

impl AudioDump for TraceDump {
    fn capture_active(&self) -> bool {
        self.active
    }

    fn dump_audio_frame(&mut self, buffer: &AudioFrameBuffer) {
        self.frames_dumped += 1;
        self.samples_dumped += u64::from(buffer.len());
    }
}

#[derive(Debug, Clone)]
pub struct TraceHardware {
    pub main_cpu: TraceCpu,
    pub sub_cpu: TraceCpu,
    pub sound_cpu: TraceCpu,
    pub vdp: TraceVdp,
    pub sound: TraceSound,
    pub cd: TraceCd,
    pub input: TraceInput,
    pub dump: TraceDump,
}

impl TraceHardware {
    #[must_use]
    pub fn new(instruction_cycles: u64) -> Self {
        Self {
            main_cpu: TraceCpu::new(CpuRole::Main, instruction_cycles),
            sub_cpu: TraceCpu::new(CpuRole::Sub, instruction_cycles),
            sound_cpu: TraceCpu::new(CpuRole::Sound, instruction_cycles),
            vdp: TraceVdp::new(),
            sound: TraceSound::default(),
            cd: TraceCd::default(),
            input: TraceInput::default(),
            dump: TraceDump::default(),
        }
    }

    pub fn set_record_runs(&mut self, record_runs: bool) {
        self.main_cpu.set_record_runs(record_runs);
        self.sub_cpu.set_record_runs(record_runs);
        self.sound_cpu.set_record_runs(record_runs);
    }
}

impl Hardware for TraceHardware {
    type MainCpu = TraceCpu;
    type SubCpu = TraceCpu;
    type SoundCpu = TraceCpu;
    type Vdp = TraceVdp;
    type SoundChips = TraceSound;
    type CdUnit = TraceCd;
    type Input = TraceInput;
    type AudioDump = TraceDump;

    fn main_cpu(&mut self) -> &mut Self::MainCpu {
        &mut self.main_cpu
    }

    fn sub_cpu(&mut self) -> &mut Self::SubCpu {
        &mut self.sub_cpu
    }

    fn sound_cpu(&mut self) -> &mut Self::SoundCpu {
        &mut self.sound_cpu
    }

    fn vdp(&mut self) -> &mut Self::Vdp {
        &mut self.vdp
    }

    fn sound_chips(&mut self) -> &mut Self::SoundChips {
        &mut self.sound
    }

    fn cd_unit(&mut self) -> &mut Self::CdUnit {
        &mut self.cd
    }

    fn input(&mut self) -> &mut Self::Input {
        &mut self.input
    }

    fn audio_dump(&mut self) -> &mut Self::AudioDump {
        &mut self.dump
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scd_scheduler_config::TimingMode;
    use test_log::test;

    #[test]
    fn zero_length_instructions_still_reach_target() {
        let mut cpu = TraceCpu::new(CpuRole::Main, 0);
        assert_eq!(cpu.instruction_cycles(), 1);

        let mut signals = BusSignals::new(TimingMode::Ntsc, None);
        cpu.run_until(10, &mut signals);
        assert_eq!(cpu.odometer(), 10);
        assert_eq!(cpu.instructions_executed(), 10);
    }
}
