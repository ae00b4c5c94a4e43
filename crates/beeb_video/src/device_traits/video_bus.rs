/*
    BeebVideo

    Copyright 2025 BeebVideo contributors

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    device_traits::video_bus.rs

    The video subsystem does not own memory, the output surface or the
    interrupt controller. It reaches them through the traits here:

    VideoMemory   - byte reads from the 32K main RAM window (plus any
                    shadow bank offset applied by the driver).
    PixelSink     - the locked output surface. Coordinates are in buffer
                    space; implementations clip anything out of range.
    InterruptSink - the System VIA CA1 line, pulsed once per vsync.

*/

/// Pure black in the ARGB8888 format used throughout.
pub const COLOR_BLACK: u32 = 0xFF00_0000;
/// Pure white in the ARGB8888 format used throughout.
pub const COLOR_WHITE: u32 = 0xFFFF_FFFF;

#[inline]
pub const fn make_color(red: u8, green: u8, blue: u8) -> u32 {
    0xFF00_0000 | (red as u32) << 16 | (green as u32) << 8 | blue as u32
}

#[inline]
pub const fn color_rgb(color: u32) -> (u8, u8, u8) {
    ((color >> 16) as u8, (color >> 8) as u8, color as u8)
}

pub trait VideoMemory {
    fn read_video(&self, addr: usize) -> u8;
}

impl VideoMemory for [u8] {
    #[inline]
    fn read_video(&self, addr: usize) -> u8 {
        self.get(addr).copied().unwrap_or(0xFF)
    }
}

impl VideoMemory for Vec<u8> {
    #[inline]
    fn read_video(&self, addr: usize) -> u8 {
        self.as_slice().read_video(addr)
    }
}

/// Describes the frame handed to [PixelSink::present_frame].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameInfo {
    /// 0 for teletext, 1 for the high frequency clock, 2 for the low frequency clock.
    pub crtc_mode: u8,
    /// CRTC R4 at the time of presentation.
    pub vertical_total: u8,
    /// Bounding box of pixels drawn since the last presentation. Empty when
    /// `first_x >= last_x`.
    pub first_x: i32,
    pub last_x: i32,
    pub first_y: i32,
    pub last_y: i32,
}

pub trait PixelSink {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn put_pixel(&mut self, x: i32, y: i32, color: u32);
    fn put_pixels(&mut self, x: i32, y: i32, count: u32, color: u32);
    fn get_pixel(&self, x: i32, y: i32) -> u32;
    /// Fill the working surface with a single color.
    fn clear(&mut self, color: u32);
    fn present_frame(&mut self, info: &FrameInfo);
}

pub trait InterruptSink {
    fn set_periodic_interrupt(&mut self, active: bool);
}

/// An interrupt sink for callers that have nothing wired to CA1.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullInterruptSink;

impl InterruptSink for NullInterruptSink {
    fn set_periodic_interrupt(&mut self, _active: bool) {}
}
