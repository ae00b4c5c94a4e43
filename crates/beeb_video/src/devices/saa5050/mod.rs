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

    devices::saa5050::mod.rs

    Implementation of the SAA5050 teletext character generator.

    The renderer is fed one byte per character clock and draws one 16 pixel
    cell per call. Bytes pass through a two stage pipeline before they are
    decoded, so the cell drawn on each call belongs to the byte written two
    calls earlier. The trailing characters the driver feeds after the end of
    the displayed line flush the pipeline.

    Control codes 0-31 update the attribute state and display as a space, or
    as the held graphics character while hold graphics is in effect. Colour
    and graphics changes apply from the next cell; hold graphics on applies
    to its own cell.

    Pixel intensities from the glyph tables index a blend lookup between the
    background and foreground truecolor palette entries, rebuilt whenever the
    palette changes.

*/

pub mod glyphs;

use crate::device_traits::video_bus::{color_rgb, make_color, PixelSink, COLOR_BLACK};
use glyphs::{GlyphSet, GlyphTables, GLYPH_FIRST_CHAR, GLYPH_SIZE, GLYPH_WIDTH};

/// Pipeline marker for cells outside the displayed area.
pub const TELETEXT_BLANK: u8 = 0xFF;

const TELETEXT_SPACE: u8 = 0x20;
const TELETEXT_DEFAULT_FG: u8 = 7;
const TELETEXT_CELL_OFFSET: i32 = 16;
// Cells are only drawn this far from the right edge of the raster.
const TELETEXT_RIGHT_MARGIN: i32 = 32;

const FLASH_ON_FRAMES: u32 = 32;
const FLASH_OFF_FRAMES: u32 = 16;

const LOOKUP_WEIGHTS: usize = 16;

// [foreground][background][intensity]
type BlendLookup = [[[u32; LOOKUP_WEIGHTS]; 8]; 8];

/// How the current scanline maps onto glyph rows.
#[derive(Copy, Clone, Debug, Default)]
pub struct TeletextScan {
    /// CRTC scanline counter.
    pub sc: u8,
    /// Draw from the odd field glyph rows. Only set when the output is
    /// interlaced and the CRTC is scanning the odd field.
    pub odd_field: bool,
}

pub struct Saa5050 {
    glyphs: GlyphTables,
    lookup: Box<BlendLookup>,

    pipeline: [u8; 2],

    fg: u8,
    bg: u8,
    graphics: bool,
    separated: bool,
    set: GlyphSet,

    flash: bool,
    flash_visible: bool,
    flash_frames: u32,

    double_height: bool,
    was_double_height: bool,
    next_double_height: bool,

    hold: bool,
    held_char: u8,
    held_set: GlyphSet,
}

impl Saa5050 {
    pub fn new(glyphs: GlyphTables) -> Self {
        Self {
            glyphs,
            lookup: Box::new([[[COLOR_BLACK; LOOKUP_WEIGHTS]; 8]; 8]),

            pipeline: [0; 2],

            fg: TELETEXT_DEFAULT_FG,
            bg: 0,
            graphics: false,
            separated: false,
            set: GlyphSet::Alpha,

            flash: false,
            flash_visible: false,
            flash_frames: 0,

            double_height: false,
            was_double_height: false,
            next_double_height: false,

            hold: false,
            held_char: TELETEXT_SPACE,
            held_set: GlyphSet::Alpha,
        }
    }

    pub fn reset(&mut self) {
        self.pipeline = [0; 2];
        self.reset_attributes();
        self.flash_visible = false;
        self.flash_frames = 0;
        self.double_height = false;
        self.was_double_height = false;
        self.next_double_height = false;
    }

    fn reset_attributes(&mut self) {
        self.fg = TELETEXT_DEFAULT_FG;
        self.bg = 0;
        self.hold = false;
        self.held_char = TELETEXT_SPACE;
        self.set = GlyphSet::Alpha;
        self.held_set = GlyphSet::Alpha;
        self.flash = false;
        self.separated = false;
        self.graphics = false;
    }

    /// Rebuild the foreground/background blend lookup from the first eight
    /// truecolor palette entries.
    pub fn rebuild_lookup(&mut self, truecolor: &[u32; 16]) {
        for fg in 0..8 {
            let (fr, fg_g, fb) = color_rgb(truecolor[fg]);
            for bg in 0..8 {
                let (br, bg_g, bb) = color_rgb(truecolor[bg]);
                for weight in 0..LOOKUP_WEIGHTS as i32 {
                    let blend = |f: u8, b: u8| (b as i32 + ((f as i32 - b as i32) * weight) / 15) as u8;
                    self.lookup[fg][bg][weight as usize] =
                        make_color(blend(fr, br), blend(fg_g, bg_g), blend(fb, bb));
                }
            }
        }
    }

    /// Advance the flash timer. Called once per vertical sync.
    pub fn vsync_tick(&mut self) {
        self.flash_frames += 1;
        if (self.flash_visible && self.flash_frames == FLASH_ON_FRAMES)
            || (!self.flash_visible && self.flash_frames == FLASH_OFF_FRAMES)
        {
            self.flash_visible = !self.flash_visible;
            self.flash_frames = 0;
        }
    }

    #[inline]
    pub fn flash_visible(&self) -> bool {
        self.flash_visible
    }

    /// Whether the row being displayed is the lower half of a double height row.
    #[inline]
    pub fn next_double_height(&self) -> bool {
        self.next_double_height
    }

    /// End of scanline housekeeping. Attributes return to their defaults at
    /// the start of every scanline; at the end of a character row the lower
    /// half flag is set if the row used double height, and consumed if the
    /// row was itself a lower half.
    pub fn end_scanline(&mut self, row_end: bool) {
        self.reset_attributes();
        if row_end {
            self.next_double_height = if self.next_double_height { false } else { self.was_double_height };
        }
        self.double_height = false;
        self.was_double_height = false;
    }

    /// Feed one byte and draw the cell it leaves the pipeline with at x + 16.
    /// Returns true if a character cell was drawn.
    pub fn render<S: PixelSink>(&mut self, sink: &mut S, x: i32, y: i32, byte: u8, scan: TeletextScan) -> bool {
        if x >= sink.width() as i32 - TELETEXT_RIGHT_MARGIN {
            return false;
        }

        let mut dat = self.pipeline[0];
        self.pipeline[0] = self.pipeline[1];
        self.pipeline[1] = byte;

        let x = x + TELETEXT_CELL_OFFSET;
        if dat == TELETEXT_BLANK {
            sink.put_pixels(x, y, GLYPH_WIDTH as u32, COLOR_BLACK);
            return false;
        }

        // Attributes in effect for this cell.
        let mut cell_fg = self.fg;
        let mut cell_set = self.set;
        let cell_flash = self.flash;
        let cell_double = self.double_height;

        let mut hold_off = false;
        let mut hold_clear = false;

        if dat < TELETEXT_SPACE {
            match dat {
                1..=7 => {
                    self.graphics = false;
                    self.fg = dat;
                    self.set = GlyphSet::Alpha;
                    hold_clear = true;
                }
                8 => self.flash = true,
                9 => self.flash = false,
                12 | 13 => {
                    self.double_height = dat & 1 != 0;
                    if self.double_height {
                        self.was_double_height = true;
                    }
                }
                17..=23 => {
                    self.graphics = true;
                    self.fg = dat & 7;
                    self.set = if self.separated { GlyphSet::Separated } else { GlyphSet::Graphics };
                }
                24 => {
                    self.fg = self.bg;
                    cell_fg = self.bg;
                }
                25 => {
                    if self.graphics {
                        self.set = GlyphSet::Graphics;
                    }
                    self.separated = false;
                }
                26 => {
                    if self.graphics {
                        self.set = GlyphSet::Separated;
                    }
                    self.separated = true;
                }
                28 => self.bg = 0,
                29 => self.bg = self.fg,
                30 => self.hold = true,
                31 => hold_off = true,
                _ => {}
            }

            if self.hold {
                dat = self.held_char;
                if (0x40..0x60).contains(&dat) {
                    dat = TELETEXT_SPACE;
                }
                cell_set = self.held_set;
            }
            else {
                dat = TELETEXT_SPACE;
            }
            if cell_double != self.double_height {
                dat = TELETEXT_SPACE;
            }
        }
        else if self.set != GlyphSet::Alpha {
            self.held_char = dat;
            self.held_set = cell_set;
        }

        let row = if cell_double && !self.next_double_height {
            (scan.sc >> 1) as usize
        }
        else if cell_double {
            (scan.sc >> 1) as usize + 5
        }
        else {
            scan.sc as usize
        };
        let offset = (dat - GLYPH_FIRST_CHAR) as usize * GLYPH_SIZE + row * GLYPH_WIDTH;

        let bg = (self.bg & 7) as usize;
        let off = self.lookup[0][bg][0];
        let on = if !self.double_height && self.next_double_height {
            &self.lookup[bg][bg]
        }
        else {
            &self.lookup[(cell_fg & 7) as usize][bg]
        };

        if cell_flash && !self.flash_visible {
            sink.put_pixels(x, y, GLYPH_WIDTH as u32, off);
        }
        else {
            let field = if cell_double { (scan.sc & 1) as usize } else { scan.odd_field as usize };
            let pixels = self.glyphs.row(cell_set, field, offset);
            for (c, intensity) in pixels.iter().enumerate() {
                sink.put_pixel(x + c as i32, y, on[(*intensity & 0x0F) as usize]);
            }
        }

        if hold_off {
            self.hold = false;
            self.held_char = TELETEXT_SPACE;
        }
        if hold_clear {
            self.held_char = TELETEXT_SPACE;
        }
        true
    }
}
