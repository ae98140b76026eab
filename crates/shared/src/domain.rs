use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ParameterError;

macro_rules! bounded_param {
    ($(#[$meta:meta])* $name:ident, $min:expr, $max:expr, $default:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "u32")]
        pub struct $name(u32);

        impl $name {
            pub const MIN: u32 = $min;
            pub const MAX: u32 = $max;
            pub const DEFAULT: u32 = $default;

            /// Clamps `value` to `MIN..=MAX`; never rejects.
            pub fn clamped(value: i64) -> Self {
                Self(value.clamp(Self::MIN as i64, Self::MAX as i64) as u32)
            }

            pub fn get(self) -> u32 {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self(Self::DEFAULT)
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = ParameterError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
                    Ok(Self(value as u32))
                } else {
                    Err(ParameterError::OutOfRange {
                        field: stringify!($name),
                        value,
                        min: Self::MIN,
                        max: Self::MAX,
                    })
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

bounded_param!(
    /// Number of dominant colors to extract.
    ColorCount,
    3,
    100,
    3
);
bounded_param!(
    /// Worker count for concurrent extraction. Sent even when `concurrent` is off.
    WorkerCount,
    4,
    100,
    4
);
bounded_param!(
    /// Color-distance threshold the service uses to merge similar colors.
    Tolerance,
    15,
    440,
    15
);

/// Clustering strategy variant run by the extraction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ExtractionMode {
    /// Histogram median cut. The service ignores `concurrent` in this mode.
    #[default]
    MedianCut,
    /// Frequency counting with tolerance-based merging, sequential or concurrent.
    ToleranceMerge,
}

impl ExtractionMode {
    pub const OFFERED: [ExtractionMode; 2] =
        [ExtractionMode::MedianCut, ExtractionMode::ToleranceMerge];

    pub fn index(self) -> u8 {
        match self {
            ExtractionMode::MedianCut => 0,
            ExtractionMode::ToleranceMerge => 1,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::OFFERED.into_iter().find(|mode| mode.index() == index)
    }

    pub fn label(self) -> &'static str {
        match self {
            ExtractionMode::MedianCut => "median-cut",
            ExtractionMode::ToleranceMerge => "tolerance-merge",
        }
    }
}

impl From<ExtractionMode> for u8 {
    fn from(value: ExtractionMode) -> Self {
        value.index()
    }
}

impl TryFrom<u8> for ExtractionMode {
    type Error = ParameterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_index(value).ok_or(ParameterError::UnknownMode(value.to_string()))
    }
}

impl FromStr for ExtractionMode {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(index) = s.parse::<u8>() {
            return Self::try_from(index);
        }
        Self::OFFERED
            .into_iter()
            .find(|mode| mode.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParameterError::UnknownMode(s.to_string()))
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Full tunable parameter set sent with every extraction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractionParameters {
    pub color_count: ColorCount,
    pub mode: ExtractionMode,
    pub concurrent: bool,
    pub worker_count: WorkerCount,
    pub tolerance: Tolerance,
}

/// One ranked palette entry as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub color: String,
    pub frequency: u64,
}

impl PaletteEntry {
    pub fn new(color: impl Into<String>, frequency: u64) -> Self {
        Self {
            color: color.into(),
            frequency,
        }
    }

    /// Parses the color as `#rrggbb`/`#rgb` or the service's `r, g, b[, a]` form.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        let color = self.color.trim();
        if let Some(hex) = color.strip_prefix('#') {
            return parse_hex(hex);
        }

        let mut channels = color
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<u8>());
        let r = channels.next()?.ok()?;
        let g = channels.next()?.ok()?;
        let b = channels.next()?.ok()?;
        Some((r, g, b))
    }
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        6 => Some((
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        )),
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
            Some((digit(0)?, digit(1)?, digit(2)?))
        }
        _ => None,
    }
}

/// Ordered palette; rank order is the service's and is never re-sorted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette(Vec<PaletteEntry>);

impl Palette {
    pub fn new(entries: Vec<PaletteEntry>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<PaletteEntry>> for Palette {
    fn from(entries: Vec<PaletteEntry>) -> Self {
        Self(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_color_count_to_domain_edges() {
        assert_eq!(ColorCount::clamped(-5).get(), 3);
        assert_eq!(ColorCount::clamped(2).get(), 3);
        assert_eq!(ColorCount::clamped(101).get(), 100);
        assert_eq!(ColorCount::clamped(i64::MAX).get(), 100);
        assert_eq!(ColorCount::clamped(42).get(), 42);
    }

    #[test]
    fn defaults_match_parameter_domains() {
        let params = ExtractionParameters::default();
        assert_eq!(params.color_count.get(), 3);
        assert_eq!(params.worker_count.get(), 4);
        assert_eq!(params.tolerance.get(), 15);
        assert_eq!(params.mode, ExtractionMode::MedianCut);
        assert!(!params.concurrent);
    }

    #[test]
    fn deserializing_out_of_range_tolerance_is_rejected() {
        let err = serde_json::from_str::<Tolerance>("441").expect_err("must reject");
        assert!(err.to_string().contains("out of range"), "{err}");
        assert_eq!(
            serde_json::from_str::<Tolerance>("440").expect("in range").get(),
            440
        );
    }

    #[test]
    fn parses_mode_from_index_or_label() {
        assert_eq!("0".parse::<ExtractionMode>().unwrap(), ExtractionMode::MedianCut);
        assert_eq!(
            "Tolerance-Merge".parse::<ExtractionMode>().unwrap(),
            ExtractionMode::ToleranceMerge
        );
        assert!("7".parse::<ExtractionMode>().is_err());
    }

    #[test]
    fn palette_keeps_service_order() {
        let palette: Palette = serde_json::from_str(
            r##"[{"color":"#00FF00","frequency":5},{"color":"#FF0000","frequency":12}]"##,
        )
        .expect("palette");
        assert_eq!(
            palette.entries(),
            &[
                PaletteEntry::new("#00FF00", 5),
                PaletteEntry::new("#FF0000", 12)
            ]
        );
    }

    #[test]
    fn negative_frequency_is_not_a_palette() {
        assert!(serde_json::from_str::<Palette>(r##"[{"color":"#000000","frequency":-1}]"##).is_err());
    }

    #[test]
    fn parses_hex_and_channel_list_colors() {
        assert_eq!(PaletteEntry::new("#FF8000", 1).rgb(), Some((255, 128, 0)));
        assert_eq!(PaletteEntry::new("#f80", 1).rgb(), Some((255, 136, 0)));
        assert_eq!(PaletteEntry::new("23, 233, 90, 255", 1).rgb(), Some((23, 233, 90)));
        assert_eq!(PaletteEntry::new("rebeccapurple", 1).rgb(), None);
    }
}
