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

    devices::bbc_video::state.rs

    Save state blocks. The CRTC, ULA and scanout blocks are stored back to
    back, little-endian, in that order.

*/

use std::io::Cursor;

use binrw::{binrw, BinRead, BinWrite};

use super::*;
use crate::devices::{
    mc6845::{CrtcState, CRTC_STATE_LEN},
    video_ula::{UlaState, ULA_STATE_LEN},
};

pub const VIDEO_STATE_LEN: usize = 9;
pub const SAVE_STATE_LEN: usize = CRTC_STATE_LEN + ULA_STATE_LEN + VIDEO_STATE_LEN;

/// Raster position of the scanout driver.
#[binrw]
#[brw(little)]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VideoState {
    pub scrx: u16,
    pub scry: u16,
    pub odd_clock: u8,
    pub vid_clocks: u32,
}

impl BbcVideo {
    pub fn save_state(&self) -> Result<Vec<u8>, VideoError> {
        let video = VideoState {
            scrx: self.scrx.clamp(0, u16::MAX as i32) as u16,
            scry: self.scry.clamp(0, u16::MAX as i32) as u16,
            odd_clock: self.odd_clock as u8,
            vid_clocks: self.vid_clocks,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(SAVE_STATE_LEN));
        self.crtc.save_state().write(&mut cursor)?;
        self.ula.save_state().write(&mut cursor)?;
        video.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Restore all three blocks. Nothing is changed if any block is short.
    pub fn load_state(&mut self, data: &[u8]) -> Result<(), VideoError> {
        check_block("crtc", CRTC_STATE_LEN, data.len())?;
        check_block("ula", ULA_STATE_LEN, data.len() - CRTC_STATE_LEN)?;
        check_block("video", VIDEO_STATE_LEN, data.len() - CRTC_STATE_LEN - ULA_STATE_LEN)?;

        let mut cursor = Cursor::new(data);
        let crtc = CrtcState::read(&mut cursor)?;
        let ula = UlaState::read(&mut cursor)?;
        let video = VideoState::read(&mut cursor)?;

        self.crtc.load_state(&crtc);
        self.ula.load_state(&ula);
        self.scrx = video.scrx as i32;
        self.scry = video.scry as i32;
        self.odd_clock = video.odd_clock != 0;
        self.vid_clocks = video.vid_clocks;
        self.update_display_treatment();

        log::debug!(
            "Video state loaded: vc {} sc {} scry {}",
            self.crtc.vc(),
            self.crtc.sc(),
            self.scry
        );
        Ok(())
    }
}

fn check_block(block: &'static str, expected: usize, actual: usize) -> Result<(), VideoError> {
    if actual < expected {
        return Err(VideoError::StateSize {
            block,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        device_traits::video_bus::NullInterruptSink,
        devices::saa5050::glyphs::test_rom,
        framebuffer::FrameBuffer,
    };

    fn video() -> BbcVideo {
        BbcVideo::from_glyph_rom(&VideoConfig::default(), &test_rom()).unwrap()
    }

    fn programmed() -> BbcVideo {
        let mut video = video();
        video.ula_write(0, 0x4B);
        video.ula_write(1, 0x31);
        video.ula_write(2, 0x23);
        for (idx, val) in [63u8, 40, 51, 0x24, 30, 2, 25, 27, 0x93, 18, 0x72, 0x13, 0x28, 0x00]
            .iter()
            .enumerate()
        {
            video.crtc_write(0, idx as u8);
            video.crtc_write(1, *val);
        }
        video
    }

    #[test]
    fn state_has_fixed_layout() {
        let mut video = programmed();
        let ram = vec![0u8; 0x8000];
        let mut fb = FrameBuffer::default();
        video.poll(1001, true, ram.as_slice(), &mut fb, &mut NullInterruptSink);

        let state = video.save_state().unwrap();
        assert_eq!(state.len(), SAVE_STATE_LEN);
        assert_eq!(&state[..4], &[63, 40, 51, 0x24]);
        assert_eq!(state[CRTC_STATE_LEN], 0x4B);
        let clocks = &state[SAVE_STATE_LEN - 4..];
        assert_eq!(u32::from_le_bytes(clocks.try_into().unwrap()), 1001);
    }

    #[test]
    fn round_trip_restores_scan_state() {
        let mut video = programmed();
        let ram = vec![0u8; 0x8000];
        let mut fb = FrameBuffer::default();
        video.poll(12345, true, ram.as_slice(), &mut fb, &mut NullInterruptSink);
        let state = video.save_state().unwrap();

        let mut restored = self::video();
        restored.load_state(&state).unwrap();
        assert_eq!(restored.save_state().unwrap(), state);
        assert_eq!(restored.crtc().vc(), video.crtc().vc());
        assert_eq!(restored.crtc().ma(), video.crtc().ma());
        assert_eq!(restored.ula().palette(), video.ula().palette());
        assert_eq!(restored.display_treatment(), DisplayTreatment::Interlaced);
    }

    #[test]
    fn short_state_is_rejected() {
        let state = programmed().save_state().unwrap();
        let mut video = video();

        match video.load_state(&state[..10]) {
            Err(VideoError::StateSize { block, expected, actual }) => {
                assert_eq!(block, "crtc");
                assert_eq!(expected, CRTC_STATE_LEN);
                assert_eq!(actual, 10);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            video.load_state(&state[..SAVE_STATE_LEN - 1]),
            Err(VideoError::StateSize { block: "video", .. })
        ));
        // Nothing was applied.
        assert_eq!(video.crtc().reg(CrtcRegister::HorizontalTotal), 0);
    }
}
