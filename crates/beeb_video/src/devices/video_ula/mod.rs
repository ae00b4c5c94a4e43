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

    devices::video_ula::mod.rs

    Implementation of the BBC Micro Video ULA with the VideoNuLA extensions.

    The ULA resolves the logical colours produced by its serializer to
    output colours. The classic palette maps 16 logical colours to 16
    backing codes; each backing code selects one of 16 physical colours,
    the flashing codes 8-15 alternating between two. With NuLA fitted the
    physical colours come from a 16 entry, 12-bit truecolor palette, and a
    handful of extra controls adjust pixel timing and attribute decoding.

    Ports, relative to &FE20:
        0 - video control register
        1 - palette register
        2 - NuLA control register
        3 - NuLA palette register (two byte writes)

*/

pub mod draw;
pub mod tablegen;

use binrw::binrw;
use modular_bitfield::{bitfield, prelude::*};

use crate::device_traits::video_bus::{make_color, PixelSink, COLOR_BLACK};

pub const ULA_STATE_LEN: usize = 97;

const ULA_PORT_MASK: u16 = 0x03;
const NULA_PORT_BIT: u16 = 0x02;

// Cursor segment enable bits in the control register, by cursor phase.
const CURSOR_SEGMENT_MASK: [u8; 7] = [0, 0, 0, 0x80, 0x40, 0x20, 0x20];

pub const NULA_DEFAULT_PALETTE: [u32; 16] = [
    0xFF000000, // black
    0xFFFF0000, // red
    0xFF00FF00, // green
    0xFFFFFF00, // yellow
    0xFF0000FF, // blue
    0xFFFF00FF, // magenta
    0xFF00FFFF, // cyan
    0xFFFFFFFF, // white
    0xFF000000,
    0xFFFF0000,
    0xFF00FF00,
    0xFFFFFF00,
    0xFF0000FF,
    0xFFFF00FF,
    0xFF00FFFF,
    0xFFFFFFFF,
];

#[bitfield]
#[derive(Copy, Clone, Debug)]
pub struct UlaControl {
    pub flash: bool,
    pub teletext: bool,
    pub mode: B2,
    pub high_frequency: bool,
    pub cursor_segments: B3,
}

/// Which clock and character source drives the display.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CrtcMode {
    Teletext,
    HighFrequency,
    #[default]
    LowFrequency,
}

impl CrtcMode {
    /// Horizontal scale in units of 8 pixels per character; 0 for teletext.
    #[inline]
    pub fn scale(&self) -> i32 {
        match self {
            CrtcMode::Teletext => 0,
            CrtcMode::HighFrequency => 1,
            CrtcMode::LowFrequency => 2,
        }
    }

    pub fn is_teletext(&self) -> bool {
        matches!(self, CrtcMode::Teletext)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UlaWriteEffect {
    None,
    ControlChanged,
}

#[binrw]
#[brw(little)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UlaState {
    pub control: u8,
    pub backing: [u8; 16],
    /// Truecolor palette entries as red, green, blue, alpha.
    pub truecolor: [[u8; 4]; 16],
    pub palette_write_pending: u8,
    pub palette_first_byte: u8,
    pub flash: [u8; 8],
    pub palette_mode: u8,
    pub horizontal_offset: u8,
    pub left_blank: u8,
    pub disable: u8,
    pub attribute_mode: u8,
    pub attribute_text: u8,
}

pub struct VideoUla {
    ctrl: UlaControl,
    crtc_mode: CrtcMode,
    ula_mode: usize,
    backing: [u8; 16],  // Backing code for each logical colour
    palette: [u32; 16], // Resolved output colour for each logical colour
    truecolor: [u32; 16],
    flash: [bool; 8],

    palette_write_pending: bool,
    palette_first_byte: u8,

    palette_mode: bool,
    horizontal_offset: u8,
    left_blank: u8,
    nula_disabled: bool,
    attribute_mode: bool,
    attribute_text: bool,

    left_edge: i32,
    left_cut: i32,
    lookup_stale: bool,
}

impl Default for VideoUla {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoUla {
    pub fn new() -> Self {
        let mut ula = Self {
            ctrl: UlaControl::new(),
            crtc_mode: CrtcMode::LowFrequency,
            ula_mode: 0,
            backing: [0; 16],
            palette: [COLOR_BLACK; 16],
            truecolor: NULA_DEFAULT_PALETTE,
            flash: [true; 8],

            palette_write_pending: false,
            palette_first_byte: 0,

            palette_mode: false,
            horizontal_offset: 0,
            left_blank: 0,
            nula_disabled: false,
            attribute_mode: false,
            attribute_text: false,

            left_edge: 0,
            left_cut: 0,
            lookup_stale: true,
        };
        ula.recompute_palette();
        ula
    }

    /// Subsystem reset. Restores the NuLA to its power-on state, which also
    /// re-enables it if it was disabled.
    pub fn reset(&mut self) {
        self.nula_reset();
        self.nula_disabled = false;
        self.left_edge = 0;
        self.left_cut = 0;
    }

    /// Bus write to one of the four ULA ports.
    pub fn write(&mut self, addr: u16, byte: u8) -> UlaWriteEffect {
        let addr = if self.nula_disabled { addr & !NULA_PORT_BIT } else { addr };

        match addr & ULA_PORT_MASK {
            0 => {
                self.write_control(byte);
                return UlaWriteEffect::ControlChanged;
            }
            1 => self.write_palette(byte),
            2 => self.write_nula_control(byte),
            _ => self.write_nula_palette(byte),
        }
        UlaWriteEffect::None
    }

    pub fn write_control(&mut self, byte: u8) {
        let new_ctrl = UlaControl::from_bytes([byte]);
        let flash_changed = new_ctrl.flash() != self.ctrl.flash();

        self.ctrl = new_ctrl;
        if flash_changed {
            self.recompute_palette();
        }

        self.ula_mode = self.ctrl.mode() as usize;
        self.crtc_mode = if self.ctrl.teletext() {
            CrtcMode::Teletext
        }
        else if self.ctrl.high_frequency() {
            CrtcMode::HighFrequency
        }
        else {
            CrtcMode::LowFrequency
        };
    }

    /// Logical colour in the high nibble, backing code in the low nibble.
    pub fn write_palette(&mut self, byte: u8) {
        let logical = (byte >> 4) as usize;
        self.backing[logical] = byte & 0x0F;
        self.palette[logical] = self.resolve(self.backing[logical]);
    }

    pub fn write_nula_control(&mut self, byte: u8) {
        let param = byte & 0x0F;

        match byte >> 4 {
            1 => self.palette_mode = param & 1 != 0,
            2 => self.horizontal_offset = param & 0x07,
            3 => self.left_blank = param & 0x0F,
            4 => {
                log::debug!("NuLA: reset");
                self.nula_reset();
            }
            5 => {
                log::debug!("NuLA: disabled");
                self.nula_disabled = true;
            }
            6 => self.attribute_mode = param & 1 != 0,
            7 => self.attribute_text = param & 1 != 0,
            8 => self.set_flash_nibble(0, param),
            9 => self.set_flash_nibble(4, param),
            code => log::trace!("NuLA: ignored control code {:X}", code),
        }
    }

    /// First byte: colour index and red. Second byte: green and blue. Only the
    /// second byte changes anything visible.
    pub fn write_nula_palette(&mut self, byte: u8) {
        if self.palette_write_pending {
            let index = (self.palette_first_byte >> 4) as usize;
            let red = self.palette_first_byte & 0x0F;
            let green = byte >> 4;
            let blue = byte & 0x0F;
            self.truecolor[index] = make_color(red * 17, green * 17, blue * 17);
            if index & 8 != 0 {
                self.flash[index - 8] = false;
            }
            self.recompute_palette();
            self.lookup_stale = true;
        }
        else {
            self.palette_first_byte = byte;
        }
        self.palette_write_pending = !self.palette_write_pending;
    }

    fn set_flash_nibble(&mut self, base: usize, param: u8) {
        self.flash[base] = param & 0x08 != 0;
        self.flash[base + 1] = param & 0x04 != 0;
        self.flash[base + 2] = param & 0x02 != 0;
        self.flash[base + 3] = param & 0x01 != 0;
    }

    fn nula_reset(&mut self) {
        self.palette_mode = false;
        self.horizontal_offset = 0;
        self.left_blank = 0;
        self.attribute_mode = false;
        self.attribute_text = false;
        self.truecolor = NULA_DEFAULT_PALETTE;
        self.flash = [true; 8];
        self.recompute_palette();
        self.lookup_stale = true;
    }

    /// Backing codes 8-15 show their own physical colour while flashing is
    /// on and their group's flash flag is set, otherwise the inverse colour.
    #[inline]
    fn resolve(&self, code: u8) -> u32 {
        let code = (code & 0x0F) as usize;
        if code & 8 != 0 && self.ctrl.flash() && self.flash[code & 7] {
            self.truecolor[code]
        }
        else {
            self.truecolor[code ^ 7]
        }
    }

    fn recompute_palette(&mut self) {
        for logical in 0..16 {
            self.palette[logical] = self.resolve(self.backing[logical]);
        }
    }

    /// Returns whether the truecolor palette changed since the last call.
    pub fn take_lookup_stale(&mut self) -> bool {
        std::mem::replace(&mut self.lookup_stale, false)
    }

    #[inline]
    pub fn control(&self) -> UlaControl {
        self.ctrl
    }
    #[inline]
    pub fn control_byte(&self) -> u8 {
        self.ctrl.into_bytes()[0]
    }
    #[inline]
    pub fn crtc_mode(&self) -> CrtcMode {
        self.crtc_mode
    }
    #[inline]
    pub fn palette(&self) -> &[u32; 16] {
        &self.palette
    }
    #[inline]
    pub fn truecolor(&self) -> &[u32; 16] {
        &self.truecolor
    }
    #[inline]
    pub fn nula_disabled(&self) -> bool {
        self.nula_disabled
    }
    #[inline]
    pub fn horizontal_offset(&self) -> u8 {
        self.horizontal_offset
    }
    #[inline]
    pub fn left_blank(&self) -> u8 {
        self.left_blank
    }

    /// Output pixels per character clock: 8 on the fast clock, 16 on the slow.
    #[inline]
    pub fn clock_pixels(&self) -> i32 {
        if self.ctrl.high_frequency() {
            8
        }
        else {
            16
        }
    }

    #[inline]
    pub fn cursor_segment_enabled(&self, phase: u8) -> bool {
        self.control_byte() & CURSOR_SEGMENT_MASK[phase as usize % CURSOR_SEGMENT_MASK.len()] != 0
    }

    /// Record where the next line's display area starts, for left blanking.
    /// Returns the number of pixels the horizontal offset delays the line by.
    pub fn latch_left_edge(&mut self, x: i32) -> i32 {
        let scale = self.crtc_mode.scale();
        self.left_edge = x + scale * 8;
        self.left_cut = self.left_edge + self.left_blank as i32 * scale * 8;
        self.horizontal_offset as i32 * scale
    }

    /// Write a bitmap pixel, applying NuLA left blanking and horizontal
    /// offset cut-off. Pixels past the raster are dropped.
    #[inline]
    pub fn put_pixel<S: PixelSink>(&self, sink: &mut S, x: i32, y: i32, color: u32, h_displayed: u8) {
        let scale = self.crtc_mode.scale();
        if scale != 0
            && (self.horizontal_offset != 0 || self.left_blank != 0)
            && (x < self.left_cut || x >= self.left_edge + h_displayed as i32 * scale * 8)
        {
            sink.put_pixel(x, y, COLOR_BLACK);
        }
        else if x < sink.width() as i32 {
            sink.put_pixel(x, y, color);
        }
    }

    pub fn save_state(&self) -> UlaState {
        let mut truecolor = [[0u8; 4]; 16];
        for (entry, color) in truecolor.iter_mut().zip(self.truecolor.iter()) {
            *entry = [(color >> 16) as u8, (color >> 8) as u8, *color as u8, (color >> 24) as u8];
        }
        UlaState {
            control: self.control_byte(),
            backing: self.backing,
            truecolor,
            palette_write_pending: self.palette_write_pending as u8,
            palette_first_byte: self.palette_first_byte,
            flash: self.flash.map(|f| f as u8),
            palette_mode: self.palette_mode as u8,
            horizontal_offset: self.horizontal_offset,
            left_blank: self.left_blank,
            disable: self.nula_disabled as u8,
            attribute_mode: self.attribute_mode as u8,
            attribute_text: self.attribute_text as u8,
        }
    }

    /// Load the truecolor palette and NuLA settings, then replay the control
    /// and palette writes so every logical colour is resolved against them.
    pub fn load_state(&mut self, state: &UlaState) {
        for (color, [r, g, b, a]) in self.truecolor.iter_mut().zip(state.truecolor.iter()) {
            *color = (*a as u32) << 24 | (*r as u32) << 16 | (*g as u32) << 8 | *b as u32;
        }
        self.palette_write_pending = state.palette_write_pending != 0;
        self.palette_first_byte = state.palette_first_byte;
        self.flash = state.flash.map(|f| f != 0);
        self.palette_mode = state.palette_mode != 0;
        self.horizontal_offset = state.horizontal_offset & 0x07;
        self.left_blank = state.left_blank & 0x0F;
        self.nula_disabled = state.disable != 0;
        self.attribute_mode = state.attribute_mode != 0;
        self.attribute_text = state.attribute_text != 0;

        self.write_control(state.control);
        for (logical, code) in state.backing.iter().enumerate() {
            self.write_palette((logical as u8) << 4 | (code & 0x0F));
        }
        self.lookup_stale = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_traits::video_bus::color_rgb;

    fn ula_with_palette() -> VideoUla {
        let mut ula = VideoUla::new();
        for logical in 0..16u8 {
            ula.write(1, logical << 4 | (15 - logical));
        }
        ula
    }

    #[test]
    fn control_selects_crtc_mode() {
        let mut ula = VideoUla::new();
        ula.write(0, 0x4B);
        assert_eq!(ula.crtc_mode(), CrtcMode::Teletext);
        assert_eq!(ula.clock_pixels(), 16);
        ula.write(0, 0x9C);
        assert_eq!(ula.crtc_mode(), CrtcMode::HighFrequency);
        assert_eq!(ula.control().mode(), 3);
        assert_eq!(ula.clock_pixels(), 8);
        ula.write(0, 0x88);
        assert_eq!(ula.crtc_mode(), CrtcMode::LowFrequency);
        assert_eq!(ula.control().mode(), 2);
    }

    #[test]
    fn palette_write_resolves_inverted_code() {
        let mut ula = VideoUla::new();
        // Backing code 7 is physical colour 0.
        ula.write(1, 0x07);
        assert_eq!(ula.palette()[0], COLOR_BLACK);
        ula.write(1, 0x10);
        assert_eq!(ula.palette()[1], 0xFFFFFFFF);
        ula.write(1, 0x26);
        assert_eq!(ula.palette()[2], 0xFFFF0000);
    }

    #[test]
    fn flashing_codes_follow_flash_bit() {
        let mut ula = VideoUla::new();
        ula.write(1, 0x09);
        // Flash off: code 9 shows colour 9 ^ 7 = 14 (cyan).
        assert_eq!(ula.palette()[0], 0xFF00FFFF);
        ula.write(0, 0x01);
        // Flash on: code 9 shows colour 9 (red).
        assert_eq!(ula.palette()[0], 0xFFFF0000);

        // Clearing the group's flash flag holds the code on its inverse colour.
        ula.write(2, 0x8B);
        ula.write(0, 0x00);
        ula.write(0, 0x01);
        assert_eq!(ula.palette()[0], 0xFF00FFFF);
    }

    #[test]
    fn flash_toggle_round_trip() {
        for initial_ctrl in [0x00u8, 0x01] {
            let mut ula = ula_with_palette();
            ula.write(0, initial_ctrl);
            let before = *ula.palette();
            ula.write(0, initial_ctrl ^ 1);
            assert_ne!(*ula.palette(), before);
            ula.write(0, initial_ctrl);
            assert_eq!(*ula.palette(), before);
        }
    }

    #[test]
    fn control_write_without_flash_change_keeps_map() {
        let mut ula = ula_with_palette();
        let before = *ula.palette();
        ula.write(0, 0x9C);
        assert_eq!(*ula.palette(), before);
    }

    #[test]
    fn nula_palette_commits_on_second_byte() {
        let mut ula = VideoUla::new();
        let _ = ula.take_lookup_stale();

        ula.write(3, 0x10);
        assert_eq!(ula.truecolor()[1], 0xFFFF0000);
        // A control write in between doesn't disturb the latched first byte.
        ula.write(0, 0x02);
        assert_eq!(ula.truecolor()[1], 0xFFFF0000);
        assert!(!ula.take_lookup_stale());

        ula.write(3, 0xFF);
        assert_eq!(color_rgb(ula.truecolor()[1]), (0, 255, 255));
        assert!(ula.take_lookup_stale());

        // The protocol is back at the first byte.
        ula.write(3, 0x2F);
        assert_eq!(ula.truecolor()[2], 0xFF00FF00);
        ula.write(3, 0x00);
        assert_eq!(ula.truecolor()[2], 0xFFFF0000);
    }

    #[test]
    fn nula_commit_updates_resolved_palette() {
        let mut ula = VideoUla::new();
        // Logical 0 -> backing 6 -> physical 1.
        ula.write(1, 0x06);
        ula.write(3, 0x18);
        ula.write(3, 0x42);
        assert_eq!(color_rgb(ula.palette()[0]), (0x88, 0x44, 0x22));
    }

    #[test]
    fn nula_commit_to_flashing_colour_makes_it_solid() {
        let mut ula = VideoUla::new();
        ula.write(0, 0x01);
        ula.write(1, 0x0A);
        assert_eq!(ula.palette()[0], 0xFF00FF00);
        ula.write(3, 0xAF);
        ula.write(3, 0xFF);
        // Flag for colour 10 is now clear, so code 10 shows colour 13.
        assert_eq!(ula.palette()[0], 0xFFFF00FF);
    }

    #[test]
    fn nula_control_registers() {
        let mut ula = VideoUla::new();
        ula.write(2, 0x11);
        ula.write(2, 0x2F);
        ula.write(2, 0x3A);
        ula.write(2, 0x61);
        ula.write(2, 0x71);
        let state = ula.save_state();
        assert_eq!(state.palette_mode, 1);
        assert_eq!(state.horizontal_offset, 7);
        assert_eq!(state.left_blank, 0x0A);
        assert_eq!(state.attribute_mode, 1);
        assert_eq!(state.attribute_text, 1);

        ula.write(2, 0x85);
        ula.write(2, 0x9A);
        assert_eq!(ula.save_state().flash, [0, 1, 0, 1, 1, 0, 1, 0]);

        ula.write(3, 0x3F);
        ula.write(3, 0xFF);
        ula.write(2, 0x40);
        let state = ula.save_state();
        assert_eq!(state.palette_mode, 0);
        assert_eq!(state.horizontal_offset, 0);
        assert_eq!(state.left_blank, 0);
        assert_eq!(state.flash, [1; 8]);
        assert_eq!(ula.truecolor(), &NULA_DEFAULT_PALETTE);
    }

    #[test]
    fn disabled_nula_aliases_classic_ports() {
        let mut ula = VideoUla::new();
        ula.write(2, 0x50);
        assert!(ula.nula_disabled());

        // Port 2 now reaches the control register, port 3 the palette.
        assert_eq!(ula.write(2, 0x9C), UlaWriteEffect::ControlChanged);
        assert_eq!(ula.crtc_mode(), CrtcMode::HighFrequency);
        ula.write(3, 0x07);
        assert_eq!(ula.palette()[0], COLOR_BLACK);
        assert_eq!(ula.truecolor(), &NULA_DEFAULT_PALETTE);

        ula.reset();
        assert!(!ula.nula_disabled());
    }

    #[test]
    fn left_blanking_forces_black() {
        use crate::framebuffer::FrameBuffer;

        let mut fb = FrameBuffer::new(640, 4);
        let mut ula = VideoUla::new();
        ula.write(0, 0x9C);
        ula.write(2, 0x31);
        let offset = ula.latch_left_edge(100);
        assert_eq!(offset, 0);

        // Display starts at 108, the first character is blanked, 4 chars wide.
        for x in 100..160 {
            ula.put_pixel(&mut fb, x, 0, 0xFFFFFFFF, 4);
        }
        assert_eq!(fb.get_pixel(115, 0), COLOR_BLACK);
        assert_eq!(fb.get_pixel(116, 0), 0xFFFFFFFF);
        assert_eq!(fb.get_pixel(139, 0), 0xFFFFFFFF);
        assert_eq!(fb.get_pixel(140, 0), COLOR_BLACK);

        // Without offset or blanking every pixel is written.
        ula.write(2, 0x30);
        ula.put_pixel(&mut fb, 100, 1, 0xFFFFFFFF, 4);
        assert_eq!(fb.get_pixel(100, 1), 0xFFFFFFFF);
    }

    #[test]
    fn horizontal_offset_scales_with_clock() {
        let mut ula = VideoUla::new();
        ula.write(2, 0x23);
        ula.write(0, 0x9C);
        assert_eq!(ula.latch_left_edge(0), 3);
        ula.write(0, 0x88);
        assert_eq!(ula.latch_left_edge(0), 6);
        ula.write(0, 0x4B);
        assert_eq!(ula.latch_left_edge(0), 0);
    }

    #[test]
    fn cursor_segments_follow_control_bits() {
        let mut ula = VideoUla::new();
        ula.write(0, 0x80);
        assert!(!ula.cursor_segment_enabled(0));
        assert!(ula.cursor_segment_enabled(3));
        assert!(!ula.cursor_segment_enabled(4));
        ula.write(0, 0x20);
        assert!(ula.cursor_segment_enabled(5));
        assert!(ula.cursor_segment_enabled(6));
    }

    #[test]
    fn state_round_trip() {
        let mut ula = ula_with_palette();
        ula.write(0, 0x9D);
        ula.write(3, 0xC1);
        ula.write(3, 0x23);
        ula.write(2, 0x62);
        ula.write(3, 0x55);
        let state = ula.save_state();

        let mut restored = VideoUla::new();
        restored.load_state(&state);
        assert_eq!(restored.save_state(), state);
        assert_eq!(restored.palette(), ula.palette());
        assert_eq!(restored.crtc_mode(), CrtcMode::HighFrequency);
        assert!(restored.take_lookup_stale());
    }
}
