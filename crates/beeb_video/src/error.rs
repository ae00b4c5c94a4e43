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

    error.rs

    Error type for the edges of the video subsystem: glyph ROM loading,
    configuration parsing and save state handling. Emulation itself never
    fails; every register and counter value is masked into range.

*/

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Glyph ROM has wrong size: expected {expected} bytes, got {actual}")]
    GlyphRomSize { expected: usize, actual: usize },
    #[error("Save state block '{block}' is too short: expected {expected} bytes, got {actual}")]
    StateSize {
        block: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Malformed save state: {0}")]
    StateFormat(#[from] binrw::Error),
    #[error("Error parsing video configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
