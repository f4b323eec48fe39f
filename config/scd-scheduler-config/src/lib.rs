//! Configuration for the Sega CD frame scheduler

use bincode::{Decode, Encode};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

pub const NTSC_GENESIS_MASTER_CLOCK_RATE: u64 = 53_693_175;
pub const PAL_GENESIS_MASTER_CLOCK_RATE: u64 = 53_203_424;

pub const NATIVE_M68K_DIVIDER: u64 = 7;
pub const Z80_DIVIDER: u64 = 15;

pub const NTSC_SCANLINES_PER_FRAME: u16 = 262;
pub const PAL_SCANLINES_PER_FRAME: u16 = 313;

pub const DEFAULT_AUDIO_SAMPLE_RATE: u32 = 44_100;
pub const MAX_AUDIO_SAMPLE_RATE: u32 = 192_000;

// Interleaving steps used by cycle-accurate mode. These were tuned against games rather than
// derived from the clock ratio between the two 68000s (Chuck Rock's intro needs the faster
// main CPU step)
pub const DEFAULT_MAIN_CPU_QUANTUM: u32 = 24;
pub const DEFAULT_SUB_CPU_QUANTUM: u32 = 39;

// 12.5 MHz / 60 Hz / 262 lines, used for both NTSC and PAL
pub const DEFAULT_SUB_CPU_CYCLES_PER_LINE: u32 = 795;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum TimingMode {
    #[default]
    Ntsc,
    Pal,
}

impl TimingMode {
    #[inline]
    #[must_use]
    pub const fn scanlines_per_frame(self) -> u16 {
        match self {
            Self::Ntsc => NTSC_SCANLINES_PER_FRAME,
            Self::Pal => PAL_SCANLINES_PER_FRAME,
        }
    }

    #[inline]
    #[must_use]
    pub const fn frames_per_second(self) -> u32 {
        match self {
            Self::Ntsc => 60,
            Self::Pal => 50,
        }
    }

    #[inline]
    #[must_use]
    pub const fn master_clock_rate(self) -> u64 {
        match self {
            Self::Ntsc => NTSC_GENESIS_MASTER_CLOCK_RATE,
            Self::Pal => PAL_GENESIS_MASTER_CLOCK_RATE,
        }
    }
}

impl Display for TimingMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ntsc => write!(f, "NTSC"),
            Self::Pal => write!(f, "PAL"),
        }
    }
}

impl FromStr for TimingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ntsc" => Ok(Self::Ntsc),
            "pal" => Ok(Self::Pal),
            _ => Err(format!("invalid timing mode string: {s}")),
        }
    }
}

/// How CPU execution is split up within a scanline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Interleaving {
    /// Each CPU runs in one burst per sub-window
    #[default]
    Coarse,
    /// Main and sub CPUs alternate in small fixed steps
    CycleAccurate,
}

impl Display for Interleaving {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Coarse => write!(f, "Coarse"),
            Self::CycleAccurate => write!(f, "Cycle-accurate"),
        }
    }
}

impl FromStr for Interleaving {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coarse" => Ok(Self::Coarse),
            "cycleaccurate" | "cycle-accurate" => Ok(Self::CycleAccurate),
            _ => Err(format!("invalid interleaving string: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("audio sample rate must be between 1 and {MAX_AUDIO_SAMPLE_RATE} Hz, was {0} Hz")]
    InvalidSampleRate(u32),
    #[error("{cpu} CPU interleaving quantum must be non-zero")]
    ZeroQuantum { cpu: &'static str },
    #[error("sub CPU cycles per line must be non-zero")]
    ZeroSubCpuCycles,
    #[error("bus request timeout must be non-zero when set")]
    ZeroBusRequestTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerConfig {
    pub timing_mode: TimingMode,
    /// Interleaving used for normal frames
    pub interleaving: Interleaving,
    /// Interleaving used for fast-forwarded frames, which skip rendering
    pub fast_forward_interleaving: Interleaving,
    pub audio_sample_rate: u32,
    pub main_cpu_quantum: u32,
    pub sub_cpu_quantum: u32,
    pub sub_cpu_cycles_per_line: u32,
    /// Main CPU cycles after which a sub CPU bus request releases on its own; None means the
    /// request is held until explicitly released
    pub bus_request_timeout: Option<u32>,
    pub show_cd_led: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timing_mode: TimingMode::default(),
            interleaving: Interleaving::default(),
            fast_forward_interleaving: Interleaving::default(),
            audio_sample_rate: DEFAULT_AUDIO_SAMPLE_RATE,
            main_cpu_quantum: DEFAULT_MAIN_CPU_QUANTUM,
            sub_cpu_quantum: DEFAULT_SUB_CPU_QUANTUM,
            sub_cpu_cycles_per_line: DEFAULT_SUB_CPU_CYCLES_PER_LINE,
            bus_request_timeout: None,
            show_cd_led: false,
        }
    }
}

impl SchedulerConfig {
    /// Check the configuration before it is used to run any frames.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample rate is out of range, if either interleaving quantum is
    /// zero, if the sub CPU would receive no cycles per line, or if the bus request timeout is
    /// set to zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_AUDIO_SAMPLE_RATE).contains(&self.audio_sample_rate) {
            return Err(ConfigError::InvalidSampleRate(self.audio_sample_rate));
        }

        if self.main_cpu_quantum == 0 {
            return Err(ConfigError::ZeroQuantum { cpu: "main" });
        }

        if self.sub_cpu_quantum == 0 {
            return Err(ConfigError::ZeroQuantum { cpu: "sub" });
        }

        if self.sub_cpu_cycles_per_line == 0 {
            return Err(ConfigError::ZeroSubCpuCycles);
        }

        if self.bus_request_timeout == Some(0) {
            return Err(ConfigError::ZeroBusRequestTimeout);
        }

        log::debug!("Validated scheduler config: {self:?}");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SchedulerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_sample_rates() {
        for rate in [0, MAX_AUDIO_SAMPLE_RATE + 1] {
            let config = SchedulerConfig { audio_sample_rate: rate, ..SchedulerConfig::default() };
            assert_eq!(config.validate(), Err(ConfigError::InvalidSampleRate(rate)));
        }
    }

    #[test]
    fn rejects_zero_quanta_and_clocks() {
        let config = SchedulerConfig { main_cpu_quantum: 0, ..SchedulerConfig::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroQuantum { cpu: "main" }));

        let config = SchedulerConfig { sub_cpu_quantum: 0, ..SchedulerConfig::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroQuantum { cpu: "sub" }));

        let config = SchedulerConfig { sub_cpu_cycles_per_line: 0, ..SchedulerConfig::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroSubCpuCycles));

        let config = SchedulerConfig { bus_request_timeout: Some(0), ..SchedulerConfig::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroBusRequestTimeout));
    }

    #[test]
    fn timing_mode_round_trips_through_strings() {
        assert_eq!("ntsc".parse::<TimingMode>(), Ok(TimingMode::Ntsc));
        assert_eq!("PAL".parse::<TimingMode>(), Ok(TimingMode::Pal));
        assert!("secam".parse::<TimingMode>().is_err());
        assert_eq!(TimingMode::Pal.to_string(), "PAL");

        assert_eq!("cycle-accurate".parse::<Interleaving>(), Ok(Interleaving::CycleAccurate));
        assert_eq!("Coarse".parse::<Interleaving>(), Ok(Interleaving::Coarse));
    }

    #[test]
    fn line_counts() {
        assert_eq!(TimingMode::Ntsc.scanlines_per_frame(), 262);
        assert_eq!(TimingMode::Pal.scanlines_per_frame(), 313);
    }
}
