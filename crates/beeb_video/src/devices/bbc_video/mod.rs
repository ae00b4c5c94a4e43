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

    devices::bbc_video::mod.rs

    The BBC Micro video subsystem: the 6845 CRTC, Video ULA and SAA5050
    clocked together, one character clock at a time.

    The driver keeps the raster position in the output buffer. Each
    character clock it fetches the byte the CRTC addresses, hands it to the
    ULA serializer or the teletext renderer, overlays the cursor, and at
    the end of every scanline runs the CRTC's row and frame bookkeeping,
    presenting the output buffer at vertical sync.

    Low frequency modes (teletext and the 40/20 column modes) run the CRTC
    at 1MHz, so only every other 2MHz clock does anything.

*/

pub mod io;
pub mod state;

use crate::{
    config::{DisplayTreatment, VideoConfig},
    device_traits::video_bus::{FrameInfo, InterruptSink, PixelSink, VideoMemory, COLOR_BLACK, COLOR_WHITE},
    devices::{
        mc6845::{Crtc6845, CrtcRegister, HorizontalStep},
        saa5050::{glyphs::GlyphTables, Saa5050, TeletextScan, TELETEXT_BLANK},
        video_ula::VideoUla,
    },
    error::VideoError,
    tracelogger::TraceLogger,
};

/// Scanlines after which the working buffer is presented even without a vsync.
pub const FRAME_LINES: i32 = 384;
/// A vsync arriving sooner than this many clocks after the last one means
/// the CRTC isn't producing a proper frame.
const MIN_FRAME_CLOCKS: u32 = 1024;
const FRAME_SKIP_INTERVAL: u32 = 10;

/// Screen lengths selectable by the addressable latch, used to wrap
/// bitmap addresses that run past the top of RAM.
pub const SCREEN_LENGTHS: [u16; 4] = [0x4000, 0x5000, 0x2000, 0x2800];

const LINE_START_X: i32 = 128;
const TELETEXT_ADDRESS_BIT: u16 = 0x2000;
const TELETEXT_ADDRESS_MASK: u16 = 0x03FF;
const RAM_ADDRESS_MASK: u16 = 0x7FFF;
const CURSOR_XOR_DISPLAY: u32 = 0x00FF_FFFF;

// Trailing teletext cells after the displayed line: one draws nothing,
// the other two drain the pipeline.
const TELETEXT_TRAILING_CELLS: u8 = 3;

pub struct BbcVideo {
    crtc: Crtc6845,
    ula: VideoUla,
    ttx: Saa5050,

    requested_treatment: DisplayTreatment,
    treatment: DisplayTreatment,
    frame_skip: bool,

    screen_size: usize,
    video_bank: usize,

    scrx: i32,
    scry: i32,
    odd_clock: bool,
    vid_clocks: u32,
    chars_left: u8,

    skip_count: u32,
    vid_cleared: bool,

    first_x: i32,
    last_x: i32,
    first_y: i32,
    last_y: i32,
}

impl BbcVideo {
    pub fn new(config: &VideoConfig, glyphs: GlyphTables) -> Self {
        let trace_logger = TraceLogger::from_option(config.trace_file.as_ref());

        let mut video = Self {
            crtc: Crtc6845::new(config.variant, trace_logger),
            ula: VideoUla::new(),
            ttx: Saa5050::new(glyphs),

            requested_treatment: config.display_treatment,
            treatment: config.display_treatment,
            frame_skip: config.frame_skip,

            screen_size: 0,
            video_bank: 0,

            scrx: 0,
            scry: 0,
            odd_clock: false,
            vid_clocks: 0,
            chars_left: 0,

            skip_count: 0,
            vid_cleared: false,

            first_x: i32::MAX,
            last_x: 0,
            first_y: i32::MAX,
            last_y: 0,
        };
        video.update_display_treatment();
        video
    }

    /// Build the subsystem from a raw 12x18 teletext glyph ROM image.
    pub fn from_glyph_rom(config: &VideoConfig, rom: &[u8]) -> Result<Self, VideoError> {
        let glyphs = GlyphTables::from_rom(rom)?;
        Ok(Self::new(config, glyphs))
    }

    pub fn reset(&mut self) {
        log::debug!("Video subsystem reset");
        self.crtc.reset();
        self.ula.reset();
        self.ttx.reset();
        self.chars_left = 0;
        self.video_bank = 0;
        self.update_display_treatment();
    }

    pub fn crtc(&self) -> &Crtc6845 {
        &self.crtc
    }

    pub fn ula(&self) -> &VideoUla {
        &self.ula
    }

    pub fn teletext(&self) -> &Saa5050 {
        &self.ttx
    }

    /// Select the screen length used for address wraparound (0-3).
    pub fn set_screen_size(&mut self, size: u8) {
        self.screen_size = (size & 0x03) as usize;
    }

    /// Offset ORed into every video RAM address, for shadow RAM.
    pub fn set_video_bank(&mut self, bank: usize) {
        self.video_bank = bank;
    }

    pub fn set_display_treatment(&mut self, treatment: DisplayTreatment) {
        self.requested_treatment = treatment;
        self.update_display_treatment();
    }

    /// The treatment in effect, which may differ from the one requested:
    /// teletext with interlace sync always interlaces, and interlacing is
    /// dropped when the CRTC isn't programmed for it.
    pub fn display_treatment(&self) -> DisplayTreatment {
        self.treatment
    }

    pub fn latch_light_pen(&mut self) {
        self.crtc.latch_light_pen();
    }

    pub fn flush_trace(&mut self) {
        self.crtc.flush_trace();
    }

    fn update_display_treatment(&mut self) {
        let interlace_sync = self.crtc.interlace_mode().interlace_sync();
        let treatment = if self.ula.crtc_mode().is_teletext() && interlace_sync {
            DisplayTreatment::Interlaced
        }
        else if self.requested_treatment == DisplayTreatment::Interlaced && !interlace_sync {
            DisplayTreatment::Progressive
        }
        else {
            self.requested_treatment
        };

        if treatment != self.treatment {
            log::debug!("Display treatment changed: {} -> {}", self.treatment, treatment);
        }
        self.treatment = treatment;
    }

    /// Run the video subsystem for `clocks` 2MHz clocks. The periodic
    /// interrupt is only driven when `timer_enable` is set.
    pub fn poll<M, S, I>(&mut self, clocks: u32, timer_enable: bool, mem: &M, sink: &mut S, irq: &mut I)
    where
        M: VideoMemory + ?Sized,
        S: PixelSink,
        I: InterruptSink,
    {
        for _ in 0..clocks {
            self.tick(timer_enable, mem, sink, irq);
        }
    }

    fn tick<M, S, I>(&mut self, timer_enable: bool, mem: &M, sink: &mut S, irq: &mut I)
    where
        M: VideoMemory + ?Sized,
        S: PixelSink,
        I: InterruptSink,
    {
        self.scrx = self.scrx.saturating_add(8);
        self.vid_clocks = self.vid_clocks.wrapping_add(1);
        self.odd_clock = !self.odd_clock;
        if !self.ula.control().high_frequency() && !self.odd_clock {
            return;
        }

        let teletext = self.ula.crtc_mode().is_teletext();

        if let Some(was_enabled) = self.crtc.horizontal_displayed_reached() {
            self.chars_left = if was_enabled && teletext { TELETEXT_TRAILING_CELLS } else { 0 };
        }
        if self.crtc.horizontal_sync_reached() {
            self.scrx = self.line_start_x();
            self.scry += 1;
            if self.scry >= FRAME_LINES {
                self.scry = 0;
                self.present(sink);
            }
        }

        let y = self.buffer_row();
        let width = sink.width() as i32;
        let clock_pixels = self.ula.clock_pixels();

        if self.crtc.display_enabled() {
            self.crtc.check_cursor();
            let dat = mem.read_video(self.fetch_address());

            if self.scrx < width - 16 {
                let sc = self.crtc.sc();
                if self.crtc.interlace_mode().display_disabled() || (sc & 8 != 0 && !teletext) {
                    // Blank lines between character rows in the gapped modes.
                    sink.put_pixels(self.scrx, y, clock_pixels as u32, COLOR_BLACK);
                }
                else if teletext {
                    self.render_teletext(sink, y, dat & 0x7F);
                }
                else {
                    let h_displayed = self.crtc.reg(CrtcRegister::HorizontalDisplayed);
                    let drawn = self.ula.draw_bitmap_byte(sink, self.scrx, y, dat, h_displayed);
                    self.extend_x(self.scrx, self.scrx + drawn);
                }
                self.draw_cursor(sink, y, CURSOR_XOR_DISPLAY);
            }
            self.crtc.advance_address();
        }
        else {
            if self.chars_left > 0 {
                if self.chars_left != 1 {
                    self.render_teletext(sink, y, TELETEXT_BLANK);
                }
                self.chars_left -= 1;
            }
            else if self.scrx < width - 32 {
                sink.put_pixels(self.scrx, y, clock_pixels as u32, COLOR_BLACK);
                if teletext {
                    sink.put_pixels(self.scrx + 16, y, 16, COLOR_BLACK);
                }
            }
            if self.scrx < width - 16 {
                self.draw_cursor(sink, y, COLOR_WHITE);
            }
        }

        if self.crtc.tick_vblank() && timer_enable {
            irq.set_periodic_interrupt(false);
        }

        match self.crtc.horizontal_step() {
            HorizontalStep::Advance => {}
            HorizontalStep::HalfLine => self.scrx = self.line_start_x(),
            HorizontalStep::EndOfScanline => self.end_scanline(timer_enable, sink, irq),
        }
    }

    #[inline]
    fn line_start_x(&self) -> i32 {
        let sync_width = (self.crtc.reg(CrtcRegister::SyncWidth) & 0x0F) as i32;
        let scale = if self.ula.control().high_frequency() { 4 } else { 8 };
        LINE_START_X - sync_width * scale
    }

    /// Output buffer row for the current scanline.
    #[inline]
    fn buffer_row(&self) -> i32 {
        match self.treatment {
            DisplayTreatment::Interlaced => (self.scry << 1) + self.crtc.odd_field() as i32,
            DisplayTreatment::LineDoubled => self.scry << 1,
            DisplayTreatment::Progressive => self.scry,
        }
    }

    /// Physical RAM address of the byte the CRTC is addressing.
    fn fetch_address(&self) -> usize {
        let ma = self.crtc.ma();
        if ma & TELETEXT_ADDRESS_BIT != 0 {
            return (self.crtc.teletext_bank() | (ma & TELETEXT_ADDRESS_MASK)) as usize | self.video_bank;
        }

        let sc = self.crtc.sc() as u16;
        let mut addr = if self.crtc.interlace_mode().sync_and_video() {
            (ma << 3) | ((sc & 3) << 1) | self.crtc.odd_field() as u16
        }
        else {
            (ma << 3) | (sc & 7)
        };
        if addr & 0x8000 != 0 {
            addr = addr.wrapping_sub(SCREEN_LENGTHS[self.screen_size]);
        }
        (addr & RAM_ADDRESS_MASK) as usize | self.video_bank
    }

    fn render_teletext<S: PixelSink>(&mut self, sink: &mut S, y: i32, dat: u8) {
        if self.ula.take_lookup_stale() {
            self.ttx.rebuild_lookup(self.ula.truecolor());
        }
        let scan = TeletextScan {
            sc: self.crtc.sc(),
            odd_field: self.treatment == DisplayTreatment::Interlaced && self.crtc.odd_field(),
        };
        if self.ttx.render(sink, self.scrx, y, dat, scan) {
            self.extend_x(self.scrx + 16, self.scrx + 32);
        }
    }

    /// Invert the pixels under the current cursor phase, if its segment is
    /// enabled, and move to the next phase.
    fn draw_cursor<S: PixelSink>(&mut self, sink: &mut S, y: i32, xor: u32) {
        let phase = self.crtc.cursor_phase();
        if phase == 0 {
            return;
        }
        if self.crtc.cursor_visible() && self.ula.cursor_segment_enabled(phase) {
            let h_displayed = self.crtc.reg(CrtcRegister::HorizontalDisplayed);
            for c in (0..=self.ula.clock_pixels()).rev() {
                let x = self.scrx + c;
                let color = sink.get_pixel(x, y) ^ xor;
                self.ula.put_pixel(sink, x, y, color, h_displayed);
            }
        }
        self.crtc.advance_cursor_phase();
    }

    fn end_scanline<S: PixelSink, I: InterruptSink>(&mut self, timer_enable: bool, sink: &mut S, irq: &mut I) {
        let mode = self.ula.crtc_mode();
        if !mode.is_teletext() {
            // The horizontal offset delays the next line's pixels.
            let delay = self.ula.latch_left_edge(self.scrx);
            for _ in 0..delay {
                sink.put_pixel(self.scrx + mode.scale() * 8, self.scry, COLOR_BLACK);
                self.scrx += 1;
            }
        }

        let events = self.crtc.end_scanline();
        self.ttx.end_scanline(events.row_end);

        if events.vsync {
            if events.leaving_interlace {
                sink.clear(COLOR_BLACK);
            }
            self.vsync(timer_enable, sink, irq);
        }

        if self.crtc.display_enabled() || self.crtc.in_vertical_adjust() {
            self.first_y = self.first_y.min(self.scry);
            self.last_y = self.last_y.max(self.scry + 1);
        }
    }

    fn vsync<S: PixelSink, I: InterruptSink>(&mut self, timer_enable: bool, sink: &mut S, irq: &mut I) {
        if self.vid_clocks > MIN_FRAME_CLOCKS && self.skip_count == 0 {
            self.present(sink);
            self.vid_cleared = false;
        }
        else if self.vid_clocks <= MIN_FRAME_CLOCKS && !self.vid_cleared {
            // No real frame: show a blank screen once. Presenting copies the
            // cleared buffer over the front buffer as well.
            self.vid_cleared = true;
            sink.clear(COLOR_BLACK);
            self.present(sink);
        }

        self.skip_count += 1;
        if self.skip_count == FRAME_SKIP_INTERVAL || !self.frame_skip {
            self.skip_count = 0;
        }

        self.scry = 0;
        if timer_enable {
            irq.set_periodic_interrupt(true);
        }
        self.ttx.vsync_tick();
        self.vid_clocks = 0;
    }

    fn present<S: PixelSink>(&mut self, sink: &mut S) {
        let info = FrameInfo {
            crtc_mode: self.ula.crtc_mode().scale() as u8,
            vertical_total: self.crtc.reg(CrtcRegister::VerticalTotal),
            first_x: self.first_x,
            last_x: self.last_x,
            first_y: self.first_y,
            last_y: self.last_y,
        };
        log::trace!(
            "Presenting frame: mode {} extents ({},{})-({},{})",
            info.crtc_mode,
            info.first_x,
            info.first_y,
            info.last_x,
            info.last_y
        );
        sink.present_frame(&info);

        self.first_x = i32::MAX;
        self.last_x = 0;
        self.first_y = i32::MAX;
        self.last_y = 0;
    }

    #[inline]
    fn extend_x(&mut self, start: i32, end: i32) {
        self.first_x = self.first_x.min(start);
        self.last_x = self.last_x.max(end);
    }
}
