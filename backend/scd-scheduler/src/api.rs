//! Frame driver: the public entry point that runs one frame per call

use crate::hardware::Hardware;
use crate::scheduler::{FrameReport, FrameScheduler, FrameVariant};
use crate::snapshot::SchedulerSnapshot;
use scd_scheduler_config::{ConfigError, SchedulerConfig};

/// Owns the scheduler and the two frame variants chosen from the config: one for normal frames
/// and one for fast-forwarded frames, which are never rendered.
#[derive(Debug, Clone)]
pub struct FrameDriver {
    scheduler: FrameScheduler,
    update_frame: FrameVariant,
    update_frame_fast: FrameVariant,
}

impl FrameDriver {
    /// # Errors
    ///
    /// Returns an error if the config fails validation.
    pub fn new(config: &SchedulerConfig) -> Result<Self, ConfigError> {
        let scheduler = FrameScheduler::new(config)?;
        let (update_frame, update_frame_fast) = frame_variants(config);

        log::info!(
            "Frame driver created: {} timing, {} interleaving ({} when fast-forwarding)",
            config.timing_mode,
            config.interleaving,
            config.fast_forward_interleaving
        );

        Ok(Self { scheduler, update_frame, update_frame_fast })
    }

    pub fn run_frame<H: Hardware>(&mut self, hw: &mut H, fast_forward: bool) -> FrameReport {
        let variant = if fast_forward { self.update_frame_fast } else { self.update_frame };
        self.scheduler.run_frame(hw, variant)
    }

    /// # Errors
    ///
    /// Returns an error if the config fails validation, in which case nothing is changed.
    pub fn reload_config(&mut self, config: &SchedulerConfig) -> Result<(), ConfigError> {
        self.scheduler.reload_config(config)?;
        (self.update_frame, self.update_frame_fast) = frame_variants(config);

        Ok(())
    }

    #[must_use]
    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.scheduler.snapshot()
    }

    pub fn restore(&mut self, snapshot: &SchedulerSnapshot) {
        self.scheduler.restore(snapshot);
    }

    #[inline]
    #[must_use]
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    #[inline]
    pub fn scheduler_mut(&mut self) -> &mut FrameScheduler {
        &mut self.scheduler
    }
}

fn frame_variants(config: &SchedulerConfig) -> (FrameVariant, FrameVariant) {
    (
        FrameVariant { render_enabled: true, interleaving: config.interleaving },
        FrameVariant { render_enabled: false, interleaving: config.fast_forward_interleaving },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceHardware;
    use scd_scheduler_config::Interleaving;
    use test_log::test;

    #[test]
    fn fast_forward_selects_unrendered_variant() {
        let config = SchedulerConfig {
            interleaving: Interleaving::CycleAccurate,
            fast_forward_interleaving: Interleaving::Coarse,
            ..SchedulerConfig::default()
        };
        let mut driver = FrameDriver::new(&config).expect("config should be valid");
        let mut hw = TraceHardware::new(4);

        let report = driver.run_frame(&mut hw, true);
        assert_eq!(report.frame_number, 0);
        assert!(hw.vdp.rendered().is_empty());

        let report = driver.run_frame(&mut hw, false);
        assert_eq!(report.frame_number, 1);
        assert_eq!(hw.vdp.rendered().len(), 224);
        assert_eq!(driver.scheduler().frame_count(), 2);
    }

    #[test]
    fn reload_swaps_variants() {
        let mut driver = FrameDriver::new(&SchedulerConfig::default()).expect("valid config");
        let config = SchedulerConfig {
            fast_forward_interleaving: Interleaving::CycleAccurate,
            ..SchedulerConfig::default()
        };
        driver.reload_config(&config).expect("valid config");
        assert_eq!(driver.update_frame_fast.interleaving, Interleaving::CycleAccurate);
        assert!(!driver.update_frame_fast.render_enabled);
    }

    #[test]
    fn invalid_config_rejected() {
        let config = SchedulerConfig { audio_sample_rate: 0, ..SchedulerConfig::default() };
        assert_eq!(FrameDriver::new(&config).err(), Some(ConfigError::InvalidSampleRate(0)));
    }
}
