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

    devices::saa5050::glyphs.rs

    Glyph tables for the SAA5050 character generator.

    The source ROM image holds the 96 displayable characters at 12x18
    resolution, one intensity value per pixel. It is reduced here to
    10 rows per character, once for each interlace field (even and odd
    source rows), and padded to the 16 pixel teletext cell. Graphics
    characters are generated from their sixel bits rather than taken
    from the ROM, except for the upper case block 0x40-0x5F which always
    displays as text.

*/

use crate::error::VideoError;

pub const GLYPH_COUNT: usize = 96;
pub const GLYPH_FIRST_CHAR: u8 = 0x20;

pub const GLYPH_ROM_WIDTH: usize = 12;
pub const GLYPH_ROM_HEIGHT: usize = 18;
pub const GLYPH_ROM_LEN: usize = GLYPH_COUNT * GLYPH_ROM_WIDTH * GLYPH_ROM_HEIGHT;

pub const GLYPH_WIDTH: usize = 16;
pub const GLYPH_HEIGHT: usize = 10;
pub const GLYPH_SIZE: usize = GLYPH_WIDTH * GLYPH_HEIGHT;
pub const GLYPH_TABLE_LEN: usize = GLYPH_COUNT * GLYPH_SIZE;

const SIXEL_LEFT: u16 = 0x0FC0;
const SIXEL_RIGHT: u16 = 0x003F;
const SIXEL_SEPARATED_MASK: u16 = 0x03CF;

/// Which character set a cell is drawn from.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum GlyphSet {
    #[default]
    Alpha,
    Graphics,
    Separated,
}

impl GlyphSet {
    #[inline]
    fn index(&self) -> usize {
        match self {
            GlyphSet::Alpha => 0,
            GlyphSet::Graphics => 1,
            GlyphSet::Separated => 2,
        }
    }
}

pub struct GlyphTables {
    // [set][field]
    tables: [[Box<[u8]>; 2]; 3],
}

impl GlyphTables {
    /// Build the glyph tables from a 12x18 ROM image. Pixel values are
    /// scaled to the 0-15 intensity range used by the blend lookup.
    pub fn from_rom(rom: &[u8]) -> Result<Self, VideoError> {
        if rom.len() != GLYPH_ROM_LEN {
            return Err(VideoError::GlyphRomSize {
                expected: GLYPH_ROM_LEN,
                actual: rom.len(),
            });
        }

        let mut tables: [[Box<[u8]>; 2]; 3] = std::array::from_fn(|_| {
            std::array::from_fn(|_| vec![0u8; GLYPH_TABLE_LEN].into_boxed_slice())
        });

        for c in 0..GLYPH_COUNT {
            // Row 9 of every glyph stays blank.
            for y in 0..GLYPH_HEIGHT - 1 {
                let sixels = sixel_row(c, y);
                let mut mask: u16 = 0x800;

                for d in 0..GLYPH_ROM_WIDTH {
                    let src = (c * GLYPH_ROM_HEIGHT + 2 * y) * GLYPH_ROM_WIDTH + d;
                    let dst = c * GLYPH_SIZE + y * GLYPH_WIDTH + d;

                    for field in 0..2 {
                        let alpha = rom[src + field * GLYPH_ROM_WIDTH].wrapping_mul(15) & 0x0F;
                        tables[0][field][dst] = alpha;

                        if (32..64).contains(&c) {
                            tables[1][field][dst] = alpha;
                            tables[2][field][dst] = alpha;
                        }
                        else {
                            tables[1][field][dst] = if sixels & mask != 0 { 15 } else { 0 };
                            tables[2][field][dst] = if sixels & SIXEL_SEPARATED_MASK & mask != 0 { 15 } else { 0 };
                        }
                    }
                    mask >>= 1;
                }
            }
        }

        log::debug!("Built teletext glyph tables for {} characters", GLYPH_COUNT);
        Ok(Self { tables })
    }

    /// One 16 pixel row starting at `offset` into the flat table for `set`
    /// and `field`. Pixels past the end of the table read as blank.
    #[inline]
    pub fn row(&self, set: GlyphSet, field: usize, offset: usize) -> [u8; GLYPH_WIDTH] {
        let table = &self.tables[set.index()][field & 1];
        let mut row = [0u8; GLYPH_WIDTH];
        if let Some(src) = table.get(offset..) {
            let len = src.len().min(GLYPH_WIDTH);
            row[..len].copy_from_slice(&src[..len]);
        }
        row
    }
}

/// Sixel pattern for glyph index `c` at output row `y`, as a 12 bit row.
fn sixel_row(c: usize, y: usize) -> u16 {
    let (left, right) = match y {
        0..=2 => (0x01, 0x02),
        3..=5 => (0x04, 0x08),
        _ => (0x10, 0x40),
    };
    let mut row = 0;
    if c & left != 0 {
        row |= SIXEL_LEFT;
    }
    if c & right != 0 {
        row |= SIXEL_RIGHT;
    }
    row
}

/// A synthetic ROM: every character except space lights all 12 columns of
/// its top 10 source rows, so glyph rows 0-4 are lit in both fields.
#[cfg(test)]
pub(crate) fn test_rom() -> Vec<u8> {
    let mut rom = vec![0u8; GLYPH_ROM_LEN];
    for c in 1..GLYPH_COUNT {
        for r in 0..10 {
            let start = (c * GLYPH_ROM_HEIGHT + r) * GLYPH_ROM_WIDTH;
            rom[start..start + GLYPH_ROM_WIDTH].fill(1);
        }
    }
    rom
}
