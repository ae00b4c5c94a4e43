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

    devices::video_ula::tablegen.rs

    Const table generation for the ULA's serializer.

*/

/// Number of serializer modes selected by ULA control bits 2-3.
pub const ULA_MODES: usize = 4;

/// Constant initializer mapping each (serializer mode, data byte) to the
/// logical colour of each of up to 16 output pixels.
///
/// The ULA shifts the data byte left once per pixel, filling with ones, and
/// takes the logical colour from bits 7, 5, 3 and 1. Slower modes hold each
/// pixel for 2, 4 or 8 clocks; mode 3 is the 16 pixel per byte shifter.
pub const TABLE_4BPP: [[[u8; 16]; 256]; ULA_MODES] = {
    let mut table = [[[0u8; 16]; 256]; ULA_MODES];

    let mut byte: usize = 0;
    while byte < 256 {
        let mut shifted = byte;
        let mut c = 0;
        while c < 16 {
            let mut left = 0u8;
            if shifted & 0x02 != 0 {
                left |= 1;
            }
            if shifted & 0x08 != 0 {
                left |= 2;
            }
            if shifted & 0x20 != 0 {
                left |= 4;
            }
            if shifted & 0x80 != 0 {
                left |= 8;
            }
            table[3][byte][c] = left;
            shifted = (shifted << 1) | 1;
            c += 1;
        }

        c = 0;
        while c < 16 {
            table[2][byte][c] = table[3][byte][c >> 1];
            table[1][byte][c] = table[3][byte][c >> 2];
            table[0][byte][c] = table[3][byte][c >> 3];
            c += 1;
        }
        byte += 1;
    }

    table
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fastest_mode_pairs_bits() {
        // 0xAA: bits 7, 5, 3, 1 set. After one shift the odd bits hold the
        // clear even bits of the original byte.
        assert_eq!(TABLE_4BPP[3][0xAA][0], 0x0F);
        assert_eq!(TABLE_4BPP[3][0xAA][1], 0x00);
        assert_eq!(TABLE_4BPP[3][0xAA][2], 0x0F);
        assert_eq!(TABLE_4BPP[3][0x00][0], 0);
        // Everything shifted out leaves the fill bits.
        assert_eq!(TABLE_4BPP[3][0x00][15], 0x0F);
    }

    #[test]
    fn slower_modes_repeat_pixels() {
        for byte in 0..256 {
            for c in 0..16 {
                assert_eq!(TABLE_4BPP[0][byte][c], TABLE_4BPP[3][byte][c >> 3]);
                assert_eq!(TABLE_4BPP[1][byte][c], TABLE_4BPP[3][byte][c >> 2]);
                assert_eq!(TABLE_4BPP[2][byte][c], TABLE_4BPP[3][byte][c >> 1]);
            }
        }
        // Mode 0 serializes one bit per pixel pair at 8 pixels per byte.
        assert_eq!(TABLE_4BPP[0][0x80][0], 8);
        assert_eq!(TABLE_4BPP[0][0x80][8], TABLE_4BPP[3][0x80][1]);
    }
}
