use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use scd_scheduler::dma::DmaMode;
use scd_scheduler::led::LedStatus;
use scd_scheduler::trace::{ScriptedAction, TraceHardware};
use scd_scheduler::vdp::{HorizontalDisplaySize, VerticalDisplaySize};
use scd_scheduler::{FrameDriver, FrameReport, Interleaving, SchedulerConfig, TimingMode};
use std::fmt::Display;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

const SCHEDULER_OPTIONS_HEADING: &str = "Scheduler Options";
const HARDWARE_OPTIONS_HEADING: &str = "Trace Hardware Options";

#[derive(Parser)]
struct Args {
    /// TOML file with scheduler settings; command-line options override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of frames to run
    #[arg(long, default_value_t = 60)]
    frames: u64,

    /// Run every frame as fast-forward, which skips rendering
    #[arg(long, default_value_t)]
    fast_forward: bool,

    /// Timing mode (ntsc / pal)
    #[arg(long, help_heading = SCHEDULER_OPTIONS_HEADING)]
    timing_mode: Option<TimingMode>,

    /// Interleaving for normal frames (coarse / cycle-accurate)
    #[arg(long, help_heading = SCHEDULER_OPTIONS_HEADING)]
    interleaving: Option<Interleaving>,

    /// Interleaving for fast-forwarded frames (coarse / cycle-accurate)
    #[arg(long, help_heading = SCHEDULER_OPTIONS_HEADING)]
    fast_forward_interleaving: Option<Interleaving>,

    /// Audio sample rate in Hz
    #[arg(long, help_heading = SCHEDULER_OPTIONS_HEADING)]
    sample_rate: Option<u32>,

    /// Main CPU cycles after which a sub CPU bus request releases on its own
    #[arg(long, help_heading = SCHEDULER_OPTIONS_HEADING)]
    bus_request_timeout: Option<u32>,

    /// Draw the CD drive LEDs over rendered frames
    #[arg(long, default_value_t, help_heading = SCHEDULER_OPTIONS_HEADING)]
    show_cd_led: bool,

    /// Cycles taken by every trace CPU instruction
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u64).range(1..), help_heading = HARDWARE_OPTIONS_HEADING)]
    instruction_cycles: u64,

    /// H interrupt interval register value; H interrupts are disabled if not set
    #[arg(long, help_heading = HARDWARE_OPTIONS_HEADING)]
    h_interrupt_interval: Option<u8>,

    /// Select V30 (240-line) display mode
    #[arg(long, default_value_t, help_heading = HARDWARE_OPTIONS_HEADING)]
    v30: bool,

    /// Select H32 display mode instead of H40
    #[arg(long, default_value_t, help_heading = HARDWARE_OPTIONS_HEADING)]
    h32: bool,

    /// Main CPU requests the sub CPU bus on the first line and releases it on the second (LINE:RELEASE_LINE)
    #[arg(long, value_parser = parse_line_pair::<u16>, help_heading = HARDWARE_OPTIONS_HEADING)]
    sub_bus_request: Option<(u16, u16)>,

    /// Start a 68K-to-VRAM DMA of WORDS words on LINE (LINE:WORDS); may be repeated
    #[arg(long, value_parser = parse_line_pair::<u32>, help_heading = HARDWARE_OPTIONS_HEADING)]
    dma: Vec<(u16, u32)>,
}

impl Args {
    fn scheduler_config(&self) -> anyhow::Result<SchedulerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let contents = fs::read_to_string(path).with_context(|| {
                    format!("Unable to read config file '{}'", path.display())
                })?;
                toml::from_str(&contents).with_context(|| {
                    format!("Unable to parse config file '{}'", path.display())
                })?
            }
            None => SchedulerConfig::default(),
        };

        if let Some(timing_mode) = self.timing_mode {
            config.timing_mode = timing_mode;
        }

        if let Some(interleaving) = self.interleaving {
            config.interleaving = interleaving;
        }

        if let Some(interleaving) = self.fast_forward_interleaving {
            config.fast_forward_interleaving = interleaving;
        }

        if let Some(sample_rate) = self.sample_rate {
            config.audio_sample_rate = sample_rate;
        }

        if self.bus_request_timeout.is_some() {
            config.bus_request_timeout = self.bus_request_timeout;
        }

        config.show_cd_led |= self.show_cd_led;

        Ok(config)
    }

    fn trace_hardware(&self, timing_mode: TimingMode) -> TraceHardware {
        let mut hw = TraceHardware::new(self.instruction_cycles);

        let registers = &mut hw.vdp.registers;
        registers.h_interrupt_enabled = self.h_interrupt_interval.is_some();
        registers.h_interrupt_interval = self.h_interrupt_interval.unwrap_or(255);
        if self.v30 {
            registers.vertical_display_size = VerticalDisplaySize::ThirtyCell;
        }
        if self.h32 {
            registers.horizontal_display_size = HorizontalDisplaySize::ThirtyTwoCell;
        }

        hw.cd.led = LedStatus { ready: true, access: false };

        let total_lines = timing_mode.scanlines_per_frame();
        let check_line = |line: u16| {
            if line >= total_lines {
                log::warn!("Line {line} is past the end of a {total_lines}-line frame; it will never run");
            }
        };

        if let Some((request_line, release_line)) = self.sub_bus_request {
            check_line(request_line);
            check_line(release_line);
            hw.main_cpu.script(request_line, ScriptedAction::RequestSubBus);
            hw.main_cpu.script(release_line, ScriptedAction::ReleaseSubBus);
        }

        for &(line, length_words) in &self.dma {
            check_line(line);
            hw.main_cpu.script(
                line,
                ScriptedAction::StartDma { mode: DmaMode::MemoryToVram, length_words },
            );
        }

        hw
    }
}

fn parse_line_pair<T>(s: &str) -> Result<(u16, T), String>
where
    T: FromStr,
    T::Err: Display,
{
    let (line, value) = s.split_once(':').ok_or_else(|| format!("expected LINE:VALUE, was '{s}'"))?;
    let line = line.parse().map_err(|err| format!("invalid line '{line}': {err}"))?;
    let value = value.parse().map_err(|err| format!("invalid value '{value}': {err}"))?;

    Ok((line, value))
}

#[derive(Debug, Default)]
struct RunTotals {
    frames: u64,
    h_interrupts: u64,
    v_interrupts: u64,
    dma_penalty_cycles: u64,
    sub_cpu_halted_lines: u64,
    samples: u64,
}

impl RunTotals {
    fn add(&mut self, report: &FrameReport) {
        self.frames += 1;
        self.h_interrupts += u64::from(report.h_interrupts);
        self.v_interrupts += u64::from(report.v_interrupt_line.is_some());
        self.dma_penalty_cycles += report.dma_penalty_cycles;
        self.sub_cpu_halted_lines += u64::from(report.sub_cpu_halted_lines);
        self.samples += u64::from(report.samples);
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = args.scheduler_config()?;
    let mut driver = FrameDriver::new(&config)?;
    let mut hw = args.trace_hardware(config.timing_mode);

    let mut totals = RunTotals::default();
    for _ in 0..args.frames {
        let report = driver.run_frame(&mut hw, args.fast_forward);
        log::debug!("{report:?}");
        totals.add(&report);
    }

    log::info!(
        "Ran {} frames: {} H interrupts, {} V interrupts, {} DMA stall cycles, {} sub CPU halted lines, {} audio samples",
        totals.frames,
        totals.h_interrupts,
        totals.v_interrupts,
        totals.dma_penalty_cycles,
        totals.sub_cpu_halted_lines,
        totals.samples
    );
    log::info!(
        "Trace CPUs executed {} main / {} sub / {} Z80 instructions",
        hw.main_cpu.instructions_executed(),
        hw.sub_cpu.instructions_executed(),
        hw.sound_cpu.instructions_executed()
    );

    Ok(())
}
