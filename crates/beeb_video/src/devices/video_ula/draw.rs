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

    devices::video_ula::draw.rs

    Bitmap mode serializer: expands one byte of screen memory into 8 or 16
    output pixels.

*/

use super::*;
use crate::devices::video_ula::tablegen::TABLE_4BPP;

impl VideoUla {
    /// Draw one byte of bitmap data at (x, y). Returns the number of pixels
    /// covered: 8 on the fast clock, 16 on the slow clock.
    pub fn draw_bitmap_byte<S: PixelSink>(&self, sink: &mut S, x: i32, y: i32, dat: u8, h_displayed: u8) -> i32 {
        let span = match self.crtc_mode {
            CrtcMode::HighFrequency => 8,
            _ => 16,
        };

        if self.attribute_mode && self.ula_mode > 1 {
            match self.crtc_mode {
                CrtcMode::HighFrequency => self.draw_attribute_hchar(sink, x, y, dat, h_displayed),
                _ => self.draw_attribute_lchar(sink, x, y, dat, h_displayed),
            }
        }
        else {
            let pixels = &TABLE_4BPP[self.ula_mode][dat as usize];
            let colors = if self.palette_mode { &self.truecolor } else { &self.palette };
            for (c, logical) in pixels.iter().take(span as usize).enumerate() {
                self.put_pixel(sink, x + c as i32, y, colors[*logical as usize], h_displayed);
            }
        }
        span
    }

    /// Attribute modes on the fast clock. Pixels are sampled at 3/4 pixel
    /// steps through the data bits, the remaining bits select the colour.
    fn draw_attribute_hchar<S: PixelSink>(&self, sink: &mut S, x: i32, y: i32, dat: u8, h_displayed: u8) {
        let dat = dat as usize;
        let mut pc = 0.0f32;

        if self.ula_mode == 3 {
            if self.attribute_text {
                let attribute = (dat & 0x07) << 1;
                for c in 0..7 {
                    let bit = (dat >> (7 - pc as usize)) & 1;
                    self.put_pixel(sink, x + c, y, self.palette[attribute | bit], h_displayed);
                    pc += 0.75;
                }
                // Eighth pixel approximates the inter-character gap.
                self.put_pixel(sink, x + 7, y, self.palette[attribute], h_displayed);
            }
            else {
                let attribute = (dat & 0x03) << 2;
                for c in 0..8 {
                    let bit = (dat >> (7 - pc as usize)) & 1;
                    self.put_pixel(sink, x + c, y, self.palette[attribute | bit], h_displayed);
                    pc += 0.75;
                }
            }
        }
        else {
            let attribute = ((dat & 0x10) >> 1) | ((dat & 0x01) << 2);
            for c in 0..8 {
                let a = 3 - (pc as usize) / 2;
                let index = attribute | ((dat >> (a + 3)) & 2) | ((dat >> a) & 1);
                self.put_pixel(sink, x + c, y, self.palette[index], h_displayed);
                pc += 0.75;
            }
        }
    }

    /// Attribute modes on the slow clock, which only has the 1bpp variants.
    fn draw_attribute_lchar<S: PixelSink>(&self, sink: &mut S, x: i32, y: i32, dat: u8, h_displayed: u8) {
        let dat = dat as usize;
        let mut pc = 0.0f32;

        if self.attribute_text {
            let attribute = (dat & 0x07) << 1;
            for c in 0..14 {
                let bit = (dat >> (7 - pc as usize)) & 1;
                self.put_pixel(sink, x + c, y, self.palette[attribute | bit], h_displayed);
                pc += 0.375;
            }
            self.put_pixel(sink, x + 14, y, self.palette[attribute], h_displayed);
            self.put_pixel(sink, x + 15, y, self.palette[attribute], h_displayed);
        }
        else {
            let attribute = (dat & 0x03) << 2;
            for c in 0..16 {
                let bit = (dat >> (7 - pc as usize)) & 1;
                self.put_pixel(sink, x + c, y, self.palette[attribute | bit], h_displayed);
                pc += 0.375;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::FrameBuffer;

    fn distinct_palette(ula: &mut VideoUla) {
        // Logical colour n -> backing n ^ 7 -> physical n, flash off.
        for logical in 0..16u8 {
            ula.write(1, logical << 4 | ((logical & 7) ^ 7) | (logical & 8));
        }
        for index in 0..16u8 {
            ula.write(3, index << 4 | index);
            ula.write(3, index << 4 | index);
        }
    }

    fn row(fb: &FrameBuffer, x: i32, count: i32) -> Vec<u32> {
        (x..x + count).map(|px| fb.get_pixel(px, 0)).collect()
    }

    #[test]
    fn fast_clock_expands_to_eight_pixels() {
        let mut fb = FrameBuffer::new(64, 2);
        let mut ula = VideoUla::new();
        ula.write(0, 0x9C);
        distinct_palette(&mut ula);

        let drawn = ula.draw_bitmap_byte(&mut fb, 0, 0, 0xA5, 80);
        assert_eq!(drawn, 8);
        let expected: Vec<u32> = (0..8).map(|c| ula.palette()[TABLE_4BPP[3][0xA5][c] as usize]).collect();
        assert_eq!(row(&fb, 0, 8), expected);
        assert_eq!(fb.get_pixel(8, 0), COLOR_BLACK);
    }

    #[test]
    fn slow_clock_expands_to_sixteen_pixels() {
        let mut fb = FrameBuffer::new(64, 2);
        let mut ula = VideoUla::new();
        // Serializer mode 1 on the slow clock.
        ula.write(0, 0xE4);
        distinct_palette(&mut ula);

        assert_eq!(ula.draw_bitmap_byte(&mut fb, 4, 0, 0xFF, 80), 16);
        // Every pixel of 0xFF is logical colour 15.
        assert!(row(&fb, 4, 16).iter().all(|&p| p == ula.palette()[15]));
    }

    #[test]
    fn palette_mode_bypasses_logical_mapping() {
        let mut fb = FrameBuffer::new(64, 2);
        let mut ula = VideoUla::new();
        ula.write(0, 0x9C);
        // All logical colours map to black.
        for logical in 0..16u8 {
            ula.write(1, logical << 4 | 0x07);
        }
        ula.write(2, 0x11);
        ula.draw_bitmap_byte(&mut fb, 0, 0, 0x80, 80);
        // Pixel 0 of 0x80 in the 1bpp shifter is logical colour 8: truecolor black.
        assert_eq!(fb.get_pixel(0, 0), ula.truecolor()[8]);
        // Pixel 2 is logical colour 1: truecolor red.
        assert_eq!(fb.get_pixel(2, 0), 0xFFFF0000);
    }

    #[test]
    fn text_attribute_mode_uses_low_bits_as_colour() {
        let mut fb = FrameBuffer::new(64, 2);
        let mut ula = VideoUla::new();
        ula.write(0, 0x9C);
        distinct_palette(&mut ula);
        ula.write(2, 0x61);
        ula.write(2, 0x71);

        // Attribute 5 selects logical colours 10 and 11.
        ula.draw_bitmap_byte(&mut fb, 0, 0, 0x85, 80);
        let pal = *ula.palette();
        assert_eq!(fb.get_pixel(0, 0), pal[11]);
        // Pixel 1 still samples bit 7, pixel 2 samples bit 6.
        assert_eq!(fb.get_pixel(1, 0), pal[11]);
        assert_eq!(fb.get_pixel(2, 0), pal[10]);
        assert_eq!(fb.get_pixel(7, 0), pal[10]);
    }

    #[test]
    fn two_bit_attribute_mode() {
        let mut fb = FrameBuffer::new(64, 2);
        let mut ula = VideoUla::new();
        // Mode 2 serializer on the fast clock.
        ula.write(0, 0x98);
        distinct_palette(&mut ula);
        ula.write(2, 0x61);

        // 0x13: bits 4 and 0 give attribute 8 | 4, bit 1 is the only pixel bit.
        ula.draw_bitmap_byte(&mut fb, 0, 0, 0x13, 80);
        let pal = *ula.palette();
        assert_eq!(fb.get_pixel(0, 0), pal[12]);
        // The last pixel samples bits 5 and 1.
        assert_eq!(fb.get_pixel(7, 0), pal[13]);
    }

    #[test]
    fn slow_clock_attribute_text_pads_two_pixels() {
        let mut fb = FrameBuffer::new(64, 2);
        let mut ula = VideoUla::new();
        ula.write(0, 0x0C);
        distinct_palette(&mut ula);
        ula.write(2, 0x61);
        ula.write(2, 0x71);

        assert_eq!(ula.draw_bitmap_byte(&mut fb, 0, 0, 0xFB, 80), 16);
        let pal = *ula.palette();
        // Attribute 3 -> colours 6 and 7. Bit 7 is set.
        assert_eq!(fb.get_pixel(0, 0), pal[7]);
        assert_eq!(fb.get_pixel(14, 0), pal[6]);
        assert_eq!(fb.get_pixel(15, 0), pal[6]);
    }
}
