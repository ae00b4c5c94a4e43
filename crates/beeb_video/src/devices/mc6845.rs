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

    devices::mc6845.rs

    Implementation of the Motorola MC6845 CRT controller as wired in the
    BBC Micro.

    The CRTC owns its register file, the character/row/scanline counters,
    the memory address generator and cursor state. It doesn't draw anything
    itself; the scanout driver asks it where it is each character clock and
    lets it run the end-of-scanline bookkeeping, receiving a summary of any
    row, frame or vsync boundary that was crossed.

*/

use binrw::binrw;
use modular_bitfield::{bitfield, prelude::*};
use strum_macros::FromRepr;

use crate::{
    config::MachineVariant,
    tracelogger::{trace, TraceLogger},
};

pub const CRTC_REGISTER_COUNT: usize = 18;
pub const CRTC_STATE_LEN: usize = 25;

const CRTC_REGISTER_SELECT_MASK: u8 = 0x1F;
const CRTC_ADDRESS_MASK: u16 = 0x3FFF;

// Registers 18-31 are decoded by the chip but store nothing.
const CRTC_REGISTER_MASKS: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0x7F, 0x1F, 0x7F, 0x7F, 0xF3, 0x1F, 0x7F, 0x1F, 0x3F, 0xFF, 0x3F, 0xFF, 0x3F, 0xFF, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

const CRTC_RESET_VERTICAL_ADJUST: u8 = 10;

// First cursor phase for each R8 cursor skew setting. Phase 0 means no cursor.
const CURSOR_SKEW_PHASE: [u8; 4] = [3, 2, 1, 0];
const CURSOR_PHASE_COUNT: u8 = 7;
// Frame counter bit gating the cursor for each R10 blink setting.
const CURSOR_BLINK_MASK: [u32; 4] = [0, 0, 16, 32];

const TELETEXT_BANK_MODEL_B: u16 = 0x3C00;
const TELETEXT_BANK_HIGH: u16 = 0x7C00;

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub enum CrtcRegister {
    HorizontalTotal,
    HorizontalDisplayed,
    HorizontalSyncPosition,
    SyncWidth,
    VerticalTotal,
    VerticalTotalAdjust,
    VerticalDisplayed,
    VerticalSync,
    InterlaceMode,
    MaximumScanlineAddress,
    CursorStartLine,
    CursorEndLine,
    StartAddressH,
    StartAddressL,
    CursorAddressH,
    CursorAddressL,
    LightPenPositionH,
    LightPenPositionL,
}

use CrtcRegister::*;

/// R8, the interlace and skew register.
#[bitfield]
#[derive(Copy, Clone, Debug)]
pub struct InterlaceModeRegister {
    pub interlace: B2,
    #[skip]
    unused: B2,
    pub display_skew: B2,
    pub cursor_skew: B2,
}

impl InterlaceModeRegister {
    /// Interlace sync and video: rows are scanned in half the lines per field.
    #[inline]
    pub fn sync_and_video(&self) -> bool {
        self.interlace() == 3
    }
    #[inline]
    pub fn interlace_sync(&self) -> bool {
        self.interlace() & 1 != 0
    }
    /// Skew setting 3 turns the display output off.
    #[inline]
    pub fn display_disabled(&self) -> bool {
        self.display_skew() == 3
    }
}

/// Side effect of a register write the owner of the CRTC must act upon.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CrtcWriteEffect {
    None,
    InterlaceModeChanged,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HorizontalStep {
    Advance,
    /// The short line of an interlaced odd field ended at R0/2.
    HalfLine,
    /// The horizontal total was reached; `end_scanline` must be called.
    EndOfScanline,
}

/// Boundaries crossed during one call to [Crtc6845::end_scanline].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanlineEvents {
    pub row_end: bool,
    pub frame_start: bool,
    pub vsync: bool,
    /// Vsync found R8 interlace off after a field with it on.
    pub leaving_interlace: bool,
}

#[binrw]
#[brw(little)]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CrtcState {
    pub registers: [u8; CRTC_REGISTER_COUNT],
    pub vc: u8,
    pub sc: u8,
    pub hc: u8,
    pub ma: u16,
    pub maback: u16,
}

pub struct Crtc6845 {
    reg: [u8; 32],   // Register file. Only 18 registers hold data
    reg_select: u8,  // Index register
    r8: InterlaceModeRegister,
    variant: MachineVariant,
    ttx_bank: u16,

    hc: u8,          // Horizontal character counter
    vc: u8,          // Vertical character row counter
    sc: u8,          // Scanline within character row
    vadj: u8,        // Vertical total adjust countdown
    ma: u16,         // Memory address
    maback: u16,     // Memory address at the start of the current row
    vdispen: bool,
    dispen: bool,

    cursor_armed: bool,
    cursor_done: bool,
    cursor_phase: u8,
    cursor_on: bool,
    frame_count: u32,

    half_line: bool,
    odd_frame: bool,
    odd_field: bool,
    last_int_sync: bool,
    vsync_lines: u8,
    vblank_ticks: u8,

    trace_logger: TraceLogger,
}

impl Default for Crtc6845 {
    fn default() -> Self {
        Self::new(MachineVariant::default(), TraceLogger::None)
    }
}

impl Crtc6845 {
    pub fn new(variant: MachineVariant, trace_logger: TraceLogger) -> Self {
        Self {
            reg: [0; 32],
            reg_select: 0,
            r8: InterlaceModeRegister::new(),
            variant,
            ttx_bank: teletext_bank(variant, 0),

            hc: 0,
            vc: 0,
            sc: 0,
            vadj: 0,
            ma: 0,
            maback: 0,
            vdispen: false,
            dispen: false,

            cursor_armed: false,
            cursor_done: false,
            cursor_phase: 0,
            cursor_on: false,
            frame_count: 0,

            half_line: false,
            odd_frame: false,
            odd_field: false,
            last_int_sync: false,
            vsync_lines: 0,
            vblank_ticks: 0,

            trace_logger,
        }
    }

    /// Power-on reset. Counters and scan state are cleared; registers other
    /// than the vertical total adjust keep their contents.
    pub fn reset(&mut self) {
        self.hc = 0;
        self.vc = 0;
        self.sc = 0;
        self.vadj = 0;
        self.reg[VerticalTotalAdjust as usize] = CRTC_RESET_VERTICAL_ADJUST;

        self.cursor_armed = false;
        self.cursor_phase = 0;
        self.cursor_on = false;
        self.half_line = false;
        self.odd_frame = false;
        self.vsync_lines = 0;
        self.vblank_ticks = 0;
    }

    /// Bus write. Even addresses select a register, odd addresses write it.
    pub fn write(&mut self, addr: u16, byte: u8) -> CrtcWriteEffect {
        if addr & 1 == 0 {
            self.reg_select = byte & CRTC_REGISTER_SELECT_MASK;
            CrtcWriteEffect::None
        }
        else {
            self.write_register(self.reg_select as usize, byte)
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        if addr & 1 == 0 {
            self.reg_select
        }
        else {
            self.reg[self.reg_select as usize]
        }
    }

    pub fn write_register(&mut self, idx: usize, byte: u8) -> CrtcWriteEffect {
        let idx = idx & CRTC_REGISTER_SELECT_MASK as usize;
        let byte = byte & CRTC_REGISTER_MASKS[idx];
        self.reg[idx] = byte;

        let Some(reg) = CrtcRegister::from_repr(idx as u8)
        else {
            log::trace!("CRTC: write to unmodelled register R{}: {:02X}", idx, byte);
            return CrtcWriteEffect::None;
        };

        match reg {
            VerticalTotal => {
                trace!(self.trace_logger, "R4: vertical total: {} [vc: {}]", byte, self.vc);
            }
            VerticalDisplayed => {
                if self.vc == byte {
                    self.vdispen = false;
                }
            }
            VerticalSync => {
                trace!(self.trace_logger, "R7: vertical sync: {} [vc: {}]", byte, self.vc);
            }
            InterlaceMode => {
                self.r8 = InterlaceModeRegister::from_bytes([byte]);
                return CrtcWriteEffect::InterlaceModeChanged;
            }
            StartAddressH => {
                self.ttx_bank = teletext_bank(self.variant, byte);
                trace!(
                    self.trace_logger,
                    "R12: start address: {:04X} teletext bank: {:04X}",
                    self.start_address(),
                    self.ttx_bank
                );
            }
            StartAddressL => {
                trace!(self.trace_logger, "R13: start address: {:04X}", self.start_address());
            }
            _ => {}
        }
        CrtcWriteEffect::None
    }

    #[inline]
    pub fn reg(&self, reg: CrtcRegister) -> u8 {
        self.reg[reg as usize]
    }

    pub fn latch_light_pen(&mut self) {
        self.reg[LightPenPositionH as usize] = ((self.ma >> 8) & 0x3F) as u8;
        self.reg[LightPenPositionL as usize] = (self.ma & 0xFF) as u8;
    }

    #[inline]
    pub fn start_address(&self) -> u16 {
        (self.reg[StartAddressL as usize] as u16 | (self.reg[StartAddressH as usize] as u16) << 8) & CRTC_ADDRESS_MASK
    }

    #[inline]
    pub fn cursor_address(&self) -> u16 {
        self.reg[CursorAddressL as usize] as u16 | (self.reg[CursorAddressH as usize] as u16) << 8
    }

    #[inline]
    pub fn interlace_mode(&self) -> InterlaceModeRegister {
        self.r8
    }

    #[inline]
    pub fn teletext_bank(&self) -> u16 {
        self.ttx_bank
    }

    #[inline]
    pub fn hc(&self) -> u8 {
        self.hc
    }
    #[inline]
    pub fn vc(&self) -> u8 {
        self.vc
    }
    #[inline]
    pub fn sc(&self) -> u8 {
        self.sc
    }
    #[inline]
    pub fn ma(&self) -> u16 {
        self.ma
    }
    #[inline]
    pub fn display_enabled(&self) -> bool {
        self.dispen
    }
    #[inline]
    pub fn in_vertical_adjust(&self) -> bool {
        self.vadj > 0
    }
    /// Current interlace field. Selects the odd scanline addresses in
    /// interlace sync and video mode and the odd output rows when interlacing.
    #[inline]
    pub fn odd_field(&self) -> bool {
        self.odd_field
    }

    /// Called once per character clock before the horizontal counter is
    /// compared against R1. Returns whether display was enabled when the
    /// horizontal displayed count was reached, clearing it.
    pub fn horizontal_displayed_reached(&mut self) -> Option<bool> {
        if self.hc == self.reg[HorizontalDisplayed as usize] {
            let was_enabled = self.dispen;
            self.dispen = false;
            Some(was_enabled)
        }
        else {
            None
        }
    }

    #[inline]
    pub fn horizontal_sync_reached(&self) -> bool {
        self.hc == self.reg[HorizontalSyncPosition as usize]
    }

    /// Advance the memory address past the character just fetched.
    #[inline]
    pub fn advance_address(&mut self) {
        self.ma = self.ma.wrapping_add(1);
    }

    /// Arm the cursor phase sequence if the current address is the cursor
    /// address and the cursor is within its scanline window.
    pub fn check_cursor(&mut self) {
        if (self.ma ^ self.cursor_address()) & CRTC_ADDRESS_MASK == 0 && self.cursor_armed {
            self.cursor_phase = CURSOR_SKEW_PHASE[self.r8.cursor_skew() as usize];
        }
    }

    /// Current cursor phase, 1-6, or 0 if no cursor is being drawn.
    #[inline]
    pub fn cursor_phase(&self) -> u8 {
        self.cursor_phase
    }

    /// Whether the cursor is in the visible part of its blink cycle.
    #[inline]
    pub fn cursor_visible(&self) -> bool {
        self.cursor_on
    }

    pub fn advance_cursor_phase(&mut self) {
        self.cursor_phase += 1;
        if self.cursor_phase == CURSOR_PHASE_COUNT {
            self.cursor_phase = 0;
        }
    }

    /// Counts down the tick following the end of the vsync pulse. Returns
    /// true on the tick the periodic interrupt should be released.
    pub fn tick_vblank(&mut self) -> bool {
        if self.vblank_ticks > 0 {
            self.vblank_ticks -= 1;
            self.vblank_ticks == 0
        }
        else {
            false
        }
    }

    /// Advance the horizontal counter, or report the end of the line.
    pub fn horizontal_step(&mut self) -> HorizontalStep {
        if self.half_line && self.hc == self.reg[HorizontalTotal as usize] >> 1 {
            self.hc = 0;
            self.half_line = false;
            HorizontalStep::HalfLine
        }
        else if self.hc == self.reg[HorizontalTotal as usize] {
            HorizontalStep::EndOfScanline
        }
        else {
            self.hc = self.hc.wrapping_add(1);
            HorizontalStep::Advance
        }
    }

    /// Bookkeeping at the horizontal total: cursor window, vertical adjust,
    /// row and frame boundaries and vertical sync.
    pub fn end_scanline(&mut self) -> ScanlineEvents {
        let mut events = ScanlineEvents::default();
        let iv = self.r8.sync_and_video();
        self.hc = 0;

        let cursor_end = self.reg[CursorEndLine as usize] & 0x1F;
        if self.sc == cursor_end || (iv && self.sc == cursor_end >> 1) {
            self.cursor_armed = false;
            self.cursor_done = true;
        }

        let max_scanline = self.reg[MaximumScanlineAddress as usize];
        if self.vadj > 0 {
            self.sc = (self.sc + 1) & 0x1F;
            self.ma = self.maback;
            self.vadj -= 1;
            if self.vadj == 0 {
                self.vdispen = true;
                self.ma = self.start_address();
                self.maback = self.ma;
                self.sc = 0;
            }
        }
        else if self.sc == max_scanline || (iv && self.sc == max_scanline >> 1) {
            events.row_end = true;
            self.maback = self.ma;
            self.sc = 0;
            self.cursor_armed = false;
            self.cursor_done = false;

            let old_vc = self.vc;
            self.vc = (self.vc + 1) & 0x7F;
            if self.vc == self.reg[VerticalDisplayed as usize] {
                self.vdispen = false;
            }
            if old_vc == self.reg[VerticalTotal as usize] {
                events.frame_start = true;
                self.vc = 0;
                self.vadj = self.reg[VerticalTotalAdjust as usize];
                if self.vadj == 0 {
                    self.vdispen = true;
                    self.ma = self.start_address();
                    self.maback = self.ma;
                }
                self.frame_count = self.frame_count.wrapping_add(1);
                let blink = ((self.reg[CursorStartLine as usize] & 0x60) >> 5) as usize;
                self.cursor_on = blink == 0 || self.frame_count & CURSOR_BLINK_MASK[blink] != 0;
            }
            if self.vc == self.reg[VerticalSync as usize] {
                events.vsync = true;
                let int_sync = self.r8.interlace_sync();
                events.leaving_interlace = !int_sync && self.last_int_sync;
                self.odd_frame = !self.odd_frame;
                if self.odd_frame {
                    self.half_line = int_sync;
                }
                self.odd_field = self.odd_frame && int_sync;
                self.last_int_sync = int_sync;

                let pulse = self.reg[SyncWidth as usize] >> 4;
                self.vsync_lines = if pulse == 0 { 17 } else { pulse + 1 };
                trace!(
                    self.trace_logger,
                    "vsync: frame {} field {} pulse {}",
                    self.frame_count,
                    self.odd_field as u8,
                    self.vsync_lines - 1
                );
            }
        }
        else {
            self.sc = (self.sc + 1) & 0x1F;
            self.ma = self.maback;
        }

        let cursor_start = self.reg[CursorStartLine as usize] & 0x1F;
        if (self.sc == cursor_start || (iv && self.sc == cursor_start >> 1)) && !self.cursor_done {
            self.cursor_armed = true;
        }

        if self.vsync_lines > 0 {
            self.vsync_lines -= 1;
            if self.vsync_lines == 0 {
                self.vblank_ticks = 1;
                if self.odd_frame {
                    self.half_line = self.r8.interlace_sync();
                }
            }
        }

        self.dispen = self.vdispen;
        events
    }

    pub fn save_state(&self) -> CrtcState {
        let mut registers = [0; CRTC_REGISTER_COUNT];
        registers.copy_from_slice(&self.reg[..CRTC_REGISTER_COUNT]);
        CrtcState {
            registers,
            vc: self.vc,
            sc: self.sc,
            hc: self.hc,
            ma: self.ma,
            maback: self.maback,
        }
    }

    /// Restore counters, then replay every register write so that derived
    /// state (R8 decoding, teletext bank) follows the restored registers.
    pub fn load_state(&mut self, state: &CrtcState) {
        self.vc = state.vc;
        self.sc = state.sc;
        self.hc = state.hc;
        self.ma = state.ma;
        self.maback = state.maback;
        for (idx, byte) in state.registers.iter().enumerate() {
            self.write_register(idx, *byte);
        }
        trace!(self.trace_logger, "state restored: vc {} sc {} ma {:04X}", self.vc, self.sc, self.ma);
    }

    pub fn flush_trace(&mut self) {
        self.trace_logger.flush();
    }
}

fn teletext_bank(variant: MachineVariant, r12: u8) -> u16 {
    match variant {
        MachineVariant::ModelB => TELETEXT_BANK_MODEL_B | ((r12 as u16 & 0x08) << 11),
        MachineVariant::MasterOrBPlus => TELETEXT_BANK_HIGH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(crtc: &mut Crtc6845, regs: &[(u8, u8)]) {
        for &(idx, val) in regs {
            crtc.write(0, idx);
            crtc.write(1, val);
        }
    }

    /// Run scanlines until `end_scanline` reports the requested event.
    fn lines_until(crtc: &mut Crtc6845, pred: impl Fn(&ScanlineEvents) -> bool) -> u32 {
        for line in 1..10_000 {
            loop {
                if crtc.horizontal_step() == HorizontalStep::EndOfScanline {
                    break;
                }
            }
            if pred(&crtc.end_scanline()) {
                return line;
            }
        }
        panic!("event never happened");
    }

    #[test]
    fn register_reads_return_masked_writes() {
        let mut crtc = Crtc6845::default();
        for idx in 0..32u8 {
            crtc.write(0, idx);
            assert_eq!(crtc.read(0), idx);
            for val in 0..=255u8 {
                crtc.write(1, val);
                assert_eq!(crtc.read(1), val & CRTC_REGISTER_MASKS[idx as usize], "R{} <- {:02X}", idx, val);
            }
        }
    }

    #[test]
    fn register_select_wraps_to_five_bits() {
        let mut crtc = Crtc6845::default();
        crtc.write(0, 0x21);
        assert_eq!(crtc.read(0), 1);
        crtc.write(1, 40);
        assert_eq!(crtc.reg(HorizontalDisplayed), 40);
    }

    #[test]
    fn reset_forces_vertical_adjust() {
        let mut crtc = Crtc6845::default();
        program(&mut crtc, &[(5, 3)]);
        crtc.reset();
        assert_eq!(crtc.reg(VerticalTotalAdjust), CRTC_RESET_VERTICAL_ADJUST);
        assert_eq!((crtc.hc(), crtc.vc(), crtc.sc()), (0, 0, 0));
    }

    #[test]
    fn light_pen_latches_address() {
        let mut crtc = Crtc6845::default();
        program(&mut crtc, &[(12, 0x3F), (13, 0x12), (4, 0), (9, 0), (5, 0)]);
        // One scanline with R4=0 and R9=0 reaches the frame end and reloads ma.
        lines_until(&mut crtc, |e| e.frame_start);
        crtc.latch_light_pen();
        assert_eq!(crtc.reg(LightPenPositionH), 0x3F);
        assert_eq!(crtc.reg(LightPenPositionL), 0x12);
    }

    #[test]
    fn teletext_bank_follows_variant() {
        let mut crtc = Crtc6845::new(MachineVariant::ModelB, TraceLogger::None);
        assert_eq!(crtc.teletext_bank(), 0x3C00);
        program(&mut crtc, &[(12, 0x28)]);
        assert_eq!(crtc.teletext_bank(), 0x7C00);
        program(&mut crtc, &[(12, 0x20)]);
        assert_eq!(crtc.teletext_bank(), 0x3C00);

        let mut crtc = Crtc6845::new(MachineVariant::MasterOrBPlus, TraceLogger::None);
        program(&mut crtc, &[(12, 0x20)]);
        assert_eq!(crtc.teletext_bank(), 0x7C00);
    }

    #[test]
    fn r8_write_reports_interlace_change() {
        let mut crtc = Crtc6845::default();
        crtc.write(0, 8);
        assert_eq!(crtc.write(1, 0xC3), CrtcWriteEffect::InterlaceModeChanged);
        let r8 = crtc.interlace_mode();
        assert!(r8.sync_and_video());
        assert_eq!(r8.cursor_skew(), 3);
        assert!(!r8.display_disabled());
        crtc.write(0, 9);
        assert_eq!(crtc.write(1, 7), CrtcWriteEffect::None);
    }

    #[test]
    fn vertical_displayed_write_at_current_row_blanks() {
        let mut crtc = Crtc6845::default();
        program(&mut crtc, &[(0, 7), (1, 4), (4, 9), (6, 8), (7, 9), (9, 1)]);
        lines_until(&mut crtc, |e| e.frame_start);
        assert!(crtc.display_enabled());
        lines_until(&mut crtc, |e| e.row_end);
        assert_eq!(crtc.vc(), 1);
        program(&mut crtc, &[(6, 1)]);
        crtc.end_scanline();
        assert!(!crtc.display_enabled());
    }

    #[test]
    fn row_restarts_at_row_address() {
        let mut crtc = Crtc6845::default();
        program(&mut crtc, &[(0, 7), (1, 4), (4, 3), (6, 3), (7, 3), (9, 1), (12, 0), (13, 0x10)]);
        lines_until(&mut crtc, |e| e.frame_start);
        assert_eq!(crtc.ma(), 0x10);

        // First scanline of the row: fetch four characters.
        for _ in 0..4 {
            crtc.advance_address();
        }
        while crtc.horizontal_step() != HorizontalStep::EndOfScanline {}
        let events = crtc.end_scanline();
        assert!(!events.row_end);
        assert_eq!(crtc.sc(), 1);
        assert_eq!(crtc.ma(), 0x10);

        for _ in 0..4 {
            crtc.advance_address();
        }
        while crtc.horizontal_step() != HorizontalStep::EndOfScanline {}
        let events = crtc.end_scanline();
        assert!(events.row_end);
        assert_eq!(crtc.sc(), 0);
        assert_eq!(crtc.ma(), 0x14);
    }

    #[test]
    fn vertical_adjust_appends_scanlines() {
        let mut crtc = Crtc6845::default();
        program(&mut crtc, &[(0, 3), (4, 1), (5, 3), (6, 1), (7, 1), (9, 0)]);
        lines_until(&mut crtc, |e| e.frame_start);
        assert!(crtc.in_vertical_adjust());
        let lines = lines_until(&mut crtc, |e| e.frame_start);
        // Two rows of one scanline plus three adjust lines.
        assert_eq!(lines, 5);
    }

    #[test]
    fn vsync_pulse_releases_after_width() {
        let mut crtc = Crtc6845::default();
        program(&mut crtc, &[(0, 3), (3, 0x24), (4, 9), (5, 0), (7, 2), (9, 0)]);
        lines_until(&mut crtc, |e| e.vsync);
        let mut lines = 0;
        loop {
            lines += 1;
            while crtc.horizontal_step() != HorizontalStep::EndOfScanline {}
            crtc.end_scanline();
            if crtc.tick_vblank() {
                break;
            }
        }
        // Released after R3 high nibble scanlines.
        assert_eq!(lines, 2);
        let mut crtc = Crtc6845::default();
        program(&mut crtc, &[(0, 3), (3, 0x24), (4, 9), (5, 0), (7, 2), (9, 0)]);
        lines_until(&mut crtc, |e| e.vsync);
        assert!(!crtc.tick_vblank());
    }

    #[test]
    fn cursor_blink_modes() {
        for (r10, frames, visible) in [(0x00, 1, true), (0x20, 1, false), (0x40, 16, true), (0x40, 15, false), (0x60, 32, true)] {
            let mut crtc = Crtc6845::default();
            program(&mut crtc, &[(0, 3), (4, 0), (5, 0), (9, 0), (10, r10)]);
            for _ in 0..frames {
                lines_until(&mut crtc, |e| e.frame_start);
            }
            assert_eq!(crtc.cursor_visible(), visible, "R10={:02X} after {} frames", r10, frames);
        }
    }

    #[test]
    fn cursor_phase_sequence() {
        let mut crtc = Crtc6845::default();
        program(&mut crtc, &[(0, 7), (4, 0), (5, 0), (9, 7), (10, 0), (11, 7), (14, 0), (15, 0), (12, 0), (13, 0)]);
        lines_until(&mut crtc, |e| e.frame_start);
        crtc.check_cursor();
        assert_eq!(crtc.cursor_phase(), 3);
        let mut phases = vec![];
        for _ in 0..5 {
            crtc.advance_cursor_phase();
            phases.push(crtc.cursor_phase());
        }
        assert_eq!(phases, vec![4, 5, 6, 0, 1]);

        // Cursor skew 3 disables the cursor.
        program(&mut crtc, &[(8, 0xC0)]);
        crtc.check_cursor();
        assert_eq!(crtc.cursor_phase(), 0);
    }

    #[test]
    fn state_round_trip_replays_registers() {
        let mut crtc = Crtc6845::new(MachineVariant::ModelB, TraceLogger::None);
        program(&mut crtc, &[(0, 63), (1, 40), (4, 38), (8, 0x93), (12, 0x28), (13, 0x00)]);
        lines_until(&mut crtc, |e| e.row_end);
        crtc.advance_address();
        let state = crtc.save_state();

        let mut restored = Crtc6845::new(MachineVariant::ModelB, TraceLogger::None);
        restored.load_state(&state);
        assert_eq!(restored.save_state(), state);
        assert_eq!(restored.teletext_bank(), 0x7C00);
        assert!(restored.interlace_mode().sync_and_video());
        assert_eq!(restored.interlace_mode().display_skew(), 1);
    }
}
