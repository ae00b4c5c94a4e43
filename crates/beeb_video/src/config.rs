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

    config.rs

    Video subsystem configuration, read from TOML.

*/

use std::{path::PathBuf, str::FromStr};

use serde_derive::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::error::VideoError;

/// Hardware variant. The variants differ in how the teletext character
/// memory bank is decoded from the CRTC start address.
#[derive(Copy, Clone, Debug, Default, Deserialize, Serialize, Hash, Eq, PartialEq, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum MachineVariant {
    /// Model A/B: teletext bank is 0x3C00, or 0x7C00 when R12 bit 3 is set.
    #[default]
    ModelB,
    /// Master 128 and B+: teletext bank is always 0x7C00.
    MasterOrBPlus,
}

impl FromStr for MachineVariant {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String>
    where
        Self: Sized,
    {
        match s.to_lowercase().as_str() {
            "model_b" | "modelb" | "b" => Ok(MachineVariant::ModelB),
            "master" | "bplus" | "b+" | "masterorbplus" | "master_or_b_plus" => Ok(MachineVariant::MasterOrBPlus),
            _ => Err("Bad value for machine variant".to_string()),
        }
    }
}

/// How logical scanlines map onto rows of the output frame buffer.
#[derive(Copy, Clone, Debug, Default, Deserialize, Serialize, Hash, Eq, PartialEq, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum DisplayTreatment {
    /// One buffer row per scanline; the presenter scales vertically.
    #[default]
    Progressive,
    /// Two buffer rows per scanline, the field selecting the odd or even row.
    Interlaced,
    /// Two buffer rows per scanline, only the even row written.
    LineDoubled,
}

impl FromStr for DisplayTreatment {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String>
    where
        Self: Sized,
    {
        match s.to_lowercase().as_str() {
            "progressive" | "scale" => Ok(DisplayTreatment::Progressive),
            "interlaced" | "interlace" => Ok(DisplayTreatment::Interlaced),
            "line_doubled" | "linedouble" | "linedoubled" => Ok(DisplayTreatment::LineDoubled),
            _ => Err("Bad value for display treatment".to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct VideoConfig {
    pub variant: MachineVariant,
    /// The treatment requested by the user. Interlace is dropped while the
    /// CRTC isn't programmed for interlace sync.
    pub display_treatment: DisplayTreatment,
    /// Present only every tenth frame, for fast-forwarding.
    pub frame_skip: bool,
    pub trace_file: Option<PathBuf>,
}

impl VideoConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, VideoError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, VideoError> {
        let toml_str = std::fs::read_to_string(path)?;
        Self::from_toml_str(&toml_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = VideoConfig::from_toml_str(
            r#"
            variant = "master_or_b_plus"
            display_treatment = "interlaced"
            frame_skip = true
            trace_file = "video_trace.log"
            "#,
        )
        .unwrap();

        assert_eq!(config.variant, MachineVariant::MasterOrBPlus);
        assert_eq!(config.display_treatment, DisplayTreatment::Interlaced);
        assert!(config.frame_skip);
        assert_eq!(config.trace_file, Some(PathBuf::from("video_trace.log")));
    }

    #[test]
    fn missing_keys_use_defaults() {
        let config = VideoConfig::from_toml_str("").unwrap();
        assert_eq!(config, VideoConfig::default());
        assert_eq!(config.variant, MachineVariant::ModelB);
        assert_eq!(config.display_treatment, DisplayTreatment::Progressive);
    }

    #[test]
    fn bad_enum_value_is_an_error() {
        let result = VideoConfig::from_toml_str("display_treatment = \"wobbly\"");
        assert!(matches!(result, Err(VideoError::Config(_))));
    }

    #[test]
    fn enums_parse_from_strings() {
        assert_eq!("Master".parse::<MachineVariant>(), Ok(MachineVariant::MasterOrBPlus));
        assert_eq!("linedouble".parse::<DisplayTreatment>(), Ok(DisplayTreatment::LineDoubled));
        assert!("nope".parse::<DisplayTreatment>().is_err());
    }

    #[test]
    fn display_names_parse_back() {
        use strum::IntoEnumIterator;
        for treatment in DisplayTreatment::iter() {
            assert_eq!(treatment.to_string().parse::<DisplayTreatment>(), Ok(treatment));
        }
        for variant in MachineVariant::iter() {
            assert_eq!(variant.to_string().parse::<MachineVariant>(), Ok(variant));
        }
    }
}
