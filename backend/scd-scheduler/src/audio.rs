//! Per-line audio sample distribution and the frame-sized sample buffer
//!
//! Audio is synthesized in small slices as the frame progresses so that register writes made
//! mid-frame land at roughly the right point in the output. The extrapolation table decides
//! which slice of the frame's samples belongs to each scanline.

use bincode::{Decode, Encode};
use scd_scheduler_config::TimingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct LineSamples {
    pub offset: u32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtrapolationTable {
    lines: Vec<LineSamples>,
    samples_per_frame: u32,
    sample_rate: u32,
    timing_mode: TimingMode,
}

impl ExtrapolationTable {
    /// Spread one frame's worth of samples across the frame's scanlines. Line `i` covers samples
    /// `spf * i / lines` up to `spf * (i + 1) / lines`, so the counts always sum to exactly one
    /// frame.
    #[must_use]
    pub fn new(sample_rate: u32, timing_mode: TimingMode) -> Self {
        let samples_per_frame = sample_rate.div_ceil(timing_mode.frames_per_second());
        let scanlines = u64::from(timing_mode.scanlines_per_frame());
        let spf = u64::from(samples_per_frame);

        let lines = (0..scanlines)
            .map(|line| {
                let start = spf * line / scanlines;
                let end = spf * (line + 1) / scanlines;
                LineSamples { offset: start as u32, count: (end - start) as u32 }
            })
            .collect();

        log::debug!(
            "Built audio extrapolation table for {sample_rate} Hz {timing_mode}: {samples_per_frame} samples per frame"
        );

        Self { lines, samples_per_frame, sample_rate, timing_mode }
    }

    #[inline]
    #[must_use]
    pub fn line(&self, scanline: u16) -> LineSamples {
        self.lines[usize::from(scanline)]
    }

    #[inline]
    #[must_use]
    pub fn samples_per_frame(&self) -> u32 {
        self.samples_per_frame
    }

    #[must_use]
    pub fn total_samples(&self) -> u32 {
        self.lines.iter().map(|line| line.count).sum()
    }

    #[must_use]
    pub fn matches(&self, sample_rate: u32, timing_mode: TimingMode) -> bool {
        self.sample_rate == sample_rate && self.timing_mode == timing_mode
    }
}

/// Stereo sample buffer covering one frame. Each synthesis call writes to the window right after
/// everything written so far.
#[derive(Debug, Clone)]
pub struct AudioFrameBuffer {
    left: Vec<i32>,
    right: Vec<i32>,
    written: u32,
}

pub struct AudioWindow<'a> {
    pub left: &'a mut [i32],
    pub right: &'a mut [i32],
}

impl AudioWindow<'_> {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

impl AudioFrameBuffer {
    #[must_use]
    pub fn new(samples_per_frame: u32) -> Self {
        let len = samples_per_frame as usize;
        Self { left: vec![0; len], right: vec![0; len], written: 0 }
    }

    pub(crate) fn resize(&mut self, samples_per_frame: u32) {
        let len = samples_per_frame as usize;
        self.left.resize(len, 0);
        self.right.resize(len, 0);
        self.written = self.written.min(samples_per_frame);
    }

    pub(crate) fn start_frame(&mut self) {
        self.left.fill(0);
        self.right.fill(0);
        self.written = 0;
    }

    pub(crate) fn next_window(&mut self, samples: LineSamples) -> AudioWindow<'_> {
        debug_assert_eq!(samples.offset, self.written, "audio window does not follow the last one");

        let start = samples.offset as usize;
        let end = start + samples.count as usize;
        self.written += samples.count;

        AudioWindow { left: &mut self.left[start..end], right: &mut self.right[start..end] }
    }

    /// Samples synthesized so far this frame
    #[inline]
    #[must_use]
    pub fn written(&self) -> u32 {
        self.written
    }

    #[inline]
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.len() - self.written
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> u32 {
        self.left.len() as u32
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn left(&self) -> &[i32] {
        &self.left
    }

    #[inline]
    #[must_use]
    pub fn right(&self) -> &[i32] {
        &self.right
    }

    /// Both channels, for final mixing passes that touch the whole frame
    pub fn channels_mut(&mut self) -> (&mut [i32], &mut [i32]) {
        (&mut self.left, &mut self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn samples_are_conserved() {
        for timing_mode in [TimingMode::Ntsc, TimingMode::Pal] {
            for sample_rate in [11025, 22050, 44100, 48000] {
                let table = ExtrapolationTable::new(sample_rate, timing_mode);
                let expected = sample_rate.div_ceil(timing_mode.frames_per_second());

                assert_eq!(table.samples_per_frame(), expected);
                assert_eq!(
                    table.total_samples(),
                    expected,
                    "{sample_rate} Hz {timing_mode} does not sum to one frame"
                );

                let mut next_offset = 0;
                for line in 0..timing_mode.scanlines_per_frame() {
                    let samples = table.line(line);
                    assert_eq!(samples.offset, next_offset);
                    next_offset += samples.count;
                }
            }
        }
    }

    #[test]
    fn ntsc_44100_has_735_samples() {
        let table = ExtrapolationTable::new(44100, TimingMode::Ntsc);
        assert_eq!(table.samples_per_frame(), 735);

        // 735 / 262 is just over 2.8
        for line in 0..262 {
            assert!((2..=3).contains(&table.line(line).count));
        }
    }

    #[test]
    fn windows_follow_each_other() {
        let table = ExtrapolationTable::new(22050, TimingMode::Pal);
        let mut buffer = AudioFrameBuffer::new(table.samples_per_frame());

        for line in 0..TimingMode::Pal.scanlines_per_frame() {
            let window = buffer.next_window(table.line(line));
            window.left.fill(i32::from(line));
        }

        assert_eq!(buffer.remaining(), 0);
        assert_eq!(buffer.left()[0], 0);
        assert_eq!(buffer.left()[table.line(312).offset as usize], 312);

        buffer.start_frame();
        assert_eq!(buffer.written(), 0);
        assert!(buffer.left().iter().all(|&sample| sample == 0));
    }
}
