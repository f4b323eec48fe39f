//! Interfaces to the hardware the scheduler drives
//!
//! The scheduler never emulates any component itself. Each frame it tells CPUs how far to run,
//! tells sound chips how many samples to produce, and tells the VDP which line to render.

use crate::audio::{AudioFrameBuffer, AudioWindow};
use crate::led::{Color, LedStatus};
use crate::signals::BusSignals;
use crate::vdp::{VdpStatus, VdpTimingRegisters};

/// A CPU with a frame-relative cycle odometer.
pub trait CpuOdometer {
    /// Zero the elapsed cycle count; called once at the start of every frame.
    fn reset_odometer(&mut self);

    /// Execute instructions until the odometer reaches `target_cycles`. Does nothing if it is
    /// already there. May overshoot by less than one instruction.
    fn run_until(&mut self, target_cycles: u64, signals: &mut BusSignals);

    /// Add stall cycles without executing anything, e.g. while DMA holds the bus.
    fn add_cycles(&mut self, cycles: u64);

    fn odometer(&self) -> u64;
}

pub trait SoundCpu: CpuOdometer {
    /// Raise the Z80's maskable interrupt with the given data bus value.
    fn interrupt(&mut self, data_bus: u8);
}

pub trait Vdp {
    fn timing_registers(&self) -> VdpTimingRegisters;

    fn begin_frame(&mut self) {}

    fn render_scanline(&mut self, scanline: u16, status: VdpStatus);

    /// Frame buffer with rows of [`crate::led::FRAME_BUFFER_WIDTH`] pixels, if this VDP exposes
    /// one for overlays.
    fn frame_buffer_mut(&mut self) -> Option<&mut [Color]> {
        None
    }
}

/// YM2612, PSG, and the CD PCM chip.
pub trait SoundChips {
    /// Produce exactly `window.len()` samples for the current line.
    fn advance(&mut self, window: AudioWindow<'_>);

    /// End-of-frame pass. Covers any samples past [`AudioFrameBuffer::written`] and anything
    /// else that only runs once per frame.
    fn special_update(&mut self, buffer: &mut AudioFrameBuffer);
}

pub trait CdUnit {
    /// Move pending CDC data toward its destination; called once per line.
    fn advance_transfer(&mut self, signals: &mut BusSignals);

    /// Tick the sub CPU timer; called once per line.
    fn advance_timer(&mut self, signals: &mut BusSignals);

    /// Mix one frame of CD-DA audio into the buffer.
    fn mix_cd_audio(&mut self, buffer: &mut AudioFrameBuffer);

    fn led_status(&self) -> LedStatus;
}

pub trait InputLatch {
    /// Latch controller state; called once per line.
    fn latch(&mut self);
}

pub trait AudioDump {
    fn capture_active(&self) -> bool;

    fn dump_audio_frame(&mut self, buffer: &AudioFrameBuffer);
}

impl AudioDump for () {
    fn capture_active(&self) -> bool {
        false
    }

    fn dump_audio_frame(&mut self, _buffer: &AudioFrameBuffer) {}
}

impl<A: AudioDump, B: AudioDump> AudioDump for (A, B) {
    fn capture_active(&self) -> bool {
        self.0.capture_active() || self.1.capture_active()
    }

    fn dump_audio_frame(&mut self, buffer: &AudioFrameBuffer) {
        if self.0.capture_active() {
            self.0.dump_audio_frame(buffer);
        }

        if self.1.capture_active() {
            self.1.dump_audio_frame(buffer);
        }
    }
}

/// Everything the scheduler needs to run one Sega CD frame.
pub trait Hardware {
    type MainCpu: CpuOdometer;
    type SubCpu: CpuOdometer;
    type SoundCpu: SoundCpu;
    type Vdp: Vdp;
    type SoundChips: SoundChips;
    type CdUnit: CdUnit;
    type Input: InputLatch;
    type AudioDump: AudioDump;

    fn main_cpu(&mut self) -> &mut Self::MainCpu;

    fn sub_cpu(&mut self) -> &mut Self::SubCpu;

    fn sound_cpu(&mut self) -> &mut Self::SoundCpu;

    fn vdp(&mut self) -> &mut Self::Vdp;

    fn sound_chips(&mut self) -> &mut Self::SoundChips;

    fn cd_unit(&mut self) -> &mut Self::CdUnit;

    fn input(&mut self) -> &mut Self::Input;

    fn audio_dump(&mut self) -> &mut Self::AudioDump;
}
