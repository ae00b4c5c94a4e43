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

    framebuffer.rs

    A double-buffered ARGB8888 surface implementing PixelSink.

    The scanout driver draws into the back buffer. Presenting a frame copies
    the back buffer to the front buffer rather than swapping them, as the
    driver relies on pixels surviving from one frame to the next where a
    frame doesn't redraw them (eg. a shortened CRTC frame).

    Writes outside the buffer are always clipped. With the pixel_bounds_check
    feature (or in test builds) each clipped write is also reported.

*/

use crate::device_traits::video_bus::{FrameInfo, PixelSink, COLOR_BLACK};

/// Width of the working raster in pixels.
pub const FRAME_WIDTH: u32 = 1280;
/// Height of the working raster in rows. Large enough for 384 scanlines doubled.
pub const FRAME_HEIGHT: u32 = 800;

const FRONT: usize = 0;
const BACK: usize = 1;

pub struct FrameBuffer {
    w: u32,
    h: u32,
    stride: usize,
    // [front, back]
    buf: [Box<[u32]>; 2],
    frame_count: u64,
    last_info: Option<FrameInfo>,
    clipped: u64,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(FRAME_WIDTH, FRAME_HEIGHT)
    }
}

impl FrameBuffer {
    pub fn new(w: u32, h: u32) -> Self {
        let stride = w as usize;
        let size = stride * h as usize;
        Self {
            w,
            h,
            stride,
            buf: [
                vec![COLOR_BLACK; size].into_boxed_slice(),
                vec![COLOR_BLACK; size].into_boxed_slice(),
            ],
            frame_count: 0,
            last_info: None,
            clipped: 0,
        }
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.w || y as u32 >= self.h {
            None
        }
        else {
            Some(y as usize * self.stride + x as usize)
        }
    }

    #[inline]
    fn report_clip(&mut self, x: i32, y: i32, count: u32) {
        self.clipped += 1;
        cfg_if::cfg_if! {
            if #[cfg(any(test, feature = "pixel_bounds_check"))] {
                log::debug!("framebuffer: pixel run out of bounds, x={} y={} count={}", x, y, count);
            }
            else {
                let _ = (x, y, count);
            }
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The most recently presented frame.
    pub fn front_buf(&self) -> &[u32] {
        &self.buf[FRONT]
    }

    /// The frame currently being drawn.
    pub fn back_buf(&self) -> &[u32] {
        &self.buf[BACK]
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn last_frame_info(&self) -> Option<&FrameInfo> {
        self.last_info.as_ref()
    }

    /// Number of pixel writes that fell outside the buffer.
    pub fn clipped_writes(&self) -> u64 {
        self.clipped
    }
}

impl PixelSink for FrameBuffer {
    fn width(&self) -> u32 {
        self.w
    }

    fn height(&self) -> u32 {
        self.h
    }

    #[inline]
    fn put_pixel(&mut self, x: i32, y: i32, color: u32) {
        match self.offset(x, y) {
            Some(o) => self.buf[BACK][o] = color,
            None => self.report_clip(x, y, 1),
        }
    }

    fn put_pixels(&mut self, x: i32, y: i32, count: u32, color: u32) {
        if count == 0 {
            return;
        }
        let end_x = x.saturating_add(count as i32 - 1);
        match (self.offset(x, y), self.offset(end_x, y)) {
            (Some(start), Some(end)) => self.buf[BACK][start..=end].fill(color),
            _ => {
                self.report_clip(x, y, count);
                for px in x..=end_x {
                    if let Some(o) = self.offset(px, y) {
                        self.buf[BACK][o] = color;
                    }
                }
            }
        }
    }

    #[inline]
    fn get_pixel(&self, x: i32, y: i32) -> u32 {
        self.offset(x, y).map_or(COLOR_BLACK, |o| self.buf[BACK][o])
    }

    fn clear(&mut self, color: u32) {
        self.buf[BACK].fill(color);
    }

    fn present_frame(&mut self, info: &FrameInfo) {
        let [front, back] = &mut self.buf;
        front.copy_from_slice(back);

        self.frame_count += 1;
        self.last_info = Some(*info);
    }
}
