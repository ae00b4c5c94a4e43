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

    devices::bbc_video::io.rs

    Host bus ports of the CRTC (SHEILA 0x00-0x07) and Video ULA
    (SHEILA 0x20-0x2F).

*/

use super::*;
use crate::{
    device_traits::io_device::IoDevice,
    devices::{mc6845::CrtcWriteEffect, video_ula::UlaWriteEffect},
};

// The CRTC only decodes A0, so its two registers repeat through 0xFE07.
pub const CRTC_REGISTER_SELECT: u16 = 0xFE00;
pub const CRTC_REGISTER: u16 = 0xFE01;
pub const CRTC_REGISTER_BASE: u16 = 0xFE00;
pub const CRTC_REGISTER_MASK: u16 = 0x0007;

pub const ULA_CONTROL_REGISTER: u16 = 0xFE20;
pub const ULA_PALETTE_REGISTER: u16 = 0xFE21;
pub const NULA_CONTROL_REGISTER: u16 = 0xFE22;
pub const NULA_PALETTE_REGISTER: u16 = 0xFE23;
pub const ULA_REGISTER_BASE: u16 = 0xFE20;
pub const ULA_REGISTER_MASK: u16 = 0x000F;

impl BbcVideo {
    /// Write to the CRTC. `addr` is the offset within the CRTC's port range.
    pub fn crtc_write(&mut self, addr: u16, byte: u8) {
        if self.crtc.write(addr, byte) == CrtcWriteEffect::InterlaceModeChanged {
            self.update_display_treatment();
        }
    }

    pub fn crtc_read(&self, addr: u16) -> u8 {
        self.crtc.read(addr)
    }

    /// Write to the Video ULA. `addr` is the offset within the ULA's port range.
    pub fn ula_write(&mut self, addr: u16, byte: u8) {
        if self.ula.write(addr, byte) == UlaWriteEffect::ControlChanged {
            self.update_display_treatment();
        }
    }
}

impl IoDevice for BbcVideo {
    fn read_u8(&mut self, port: u16) -> u8 {
        if (port & !CRTC_REGISTER_MASK) == CRTC_REGISTER_BASE {
            self.crtc_read(port & CRTC_REGISTER_MASK)
        }
        else {
            // The ULA is write only.
            log::trace!("Video: read from write-only port {:04X}", port);
            0xFF
        }
    }

    fn write_u8(&mut self, port: u16, data: u8) {
        if (port & !CRTC_REGISTER_MASK) == CRTC_REGISTER_BASE {
            self.crtc_write(port & CRTC_REGISTER_MASK, data);
        }
        else if (port & !ULA_REGISTER_MASK) == ULA_REGISTER_BASE {
            self.ula_write(port & ULA_REGISTER_MASK, data);
        }
        else {
            log::warn!("Video: write to unhandled port {:04X}: {:02X}", port, data);
        }
    }

    fn port_list(&self) -> Vec<u16> {
        (CRTC_REGISTER_BASE..=CRTC_REGISTER_BASE | CRTC_REGISTER_MASK)
            .chain(ULA_REGISTER_BASE..=ULA_REGISTER_BASE | ULA_REGISTER_MASK)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::saa5050::glyphs::test_rom;

    fn video() -> BbcVideo {
        BbcVideo::from_glyph_rom(&VideoConfig::default(), &test_rom()).unwrap()
    }

    #[test]
    fn crtc_ports_mirror_through_range() {
        let mut video = video();
        video.write_u8(CRTC_REGISTER_SELECT + 4, 1);
        video.write_u8(CRTC_REGISTER + 6, 40);
        assert_eq!(video.crtc().reg(CrtcRegister::HorizontalDisplayed), 40);

        video.write_u8(CRTC_REGISTER_SELECT, 14);
        video.write_u8(CRTC_REGISTER, 0xFF);
        assert_eq!(video.read_u8(CRTC_REGISTER + 2), 0x3F);
    }

    #[test]
    fn ula_ports_decode_low_bits() {
        let mut video = video();
        video.write_u8(ULA_CONTROL_REGISTER, 0x4B);
        assert!(video.ula().crtc_mode().is_teletext());
        // 0xFE2D mirrors the palette register.
        video.write_u8(ULA_REGISTER_BASE + 0x0D, 0x07);
        assert_eq!(video.ula().palette()[0], COLOR_BLACK);
        video.write_u8(NULA_CONTROL_REGISTER, 0x23);
        assert_eq!(video.ula().horizontal_offset(), 3);
        assert_eq!(video.read_u8(ULA_CONTROL_REGISTER), 0xFF);
    }

    #[test]
    fn port_list_covers_both_devices() {
        let ports = video().port_list();
        assert_eq!(ports.len(), 24);
        assert!(ports.contains(&0xFE07));
        assert!(ports.contains(&NULA_PALETTE_REGISTER));
        assert!(ports.contains(&0xFE2F));
    }
}
