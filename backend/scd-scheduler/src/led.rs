//! Sega CD drive LEDs drawn over the bottom of the frame

use bincode::{Decode, Encode};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    #[inline]
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct LedStatus {
    pub ready: bool,
    pub access: bool,
}

pub const FRAME_BUFFER_WIDTH: usize = 336;

const LED_ROWS: [usize; 2] = [220, 222];
const READY_LED_COLUMNS: std::ops::Range<usize> = 12..16;
const ACCESS_LED_COLUMNS: std::ops::Range<usize> = 20..24;

const READY_LED_COLOR: Color = Color::rgb(0, 248, 0);
const ACCESS_LED_COLOR: Color = Color::rgb(248, 0, 0);

/// Draw the ready (green) and access (red) LEDs into a frame buffer with rows of
/// [`FRAME_BUFFER_WIDTH`] pixels. Pixels outside the buffer are skipped.
pub fn draw_cd_leds(frame_buffer: &mut [Color], status: LedStatus) {
    for row in LED_ROWS {
        let row_start = row * FRAME_BUFFER_WIDTH;

        if status.ready {
            fill_pixels(frame_buffer, row_start, READY_LED_COLUMNS, READY_LED_COLOR);
        }

        if status.access {
            fill_pixels(frame_buffer, row_start, ACCESS_LED_COLUMNS, ACCESS_LED_COLOR);
        }
    }
}

fn fill_pixels(
    frame_buffer: &mut [Color],
    row_start: usize,
    columns: std::ops::Range<usize>,
    color: Color,
) {
    for col in columns {
        if let Some(pixel) = frame_buffer.get_mut(row_start + col) {
            *pixel = color;
        }
    }
}
