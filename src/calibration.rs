//! Panel white-point calibration.
//!
//! A panel reports its measured chromaticity coordinate once. Four linear
//! offset functions of that coordinate feed a fixed decision tree that picks
//! one of nine white-point presets.

use crate::ascr::WhitePoint;
use crate::error::ControllerError;

use log::{debug, info};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Where the panel exposes its measured color coordinate by default.
pub const PANEL_COORDINATE_PATH: &str = "/sys/class/lcd/panel/color_coordinate";

/// Number of offset slots; slot 0 is reserved and always zero.
pub const OFFSET_COUNT: usize = 5;

/// Number of calibration presets.
pub const PRESET_COUNT: u8 = 9;

/// One offset function `F(x, y) = y + x * num / den + intercept`, evaluated in
/// 10-bit fixed point the way the panel vendor specifies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetFormula {
    /// Numerator of the `x` slope (signed).
    pub num: i64,
    /// Denominator of the `x` slope.
    pub den: i64,
    /// Constant term.
    pub intercept: i64,
}

impl OffsetFormula {
    /// Create a formula.
    pub const fn new(num: i64, den: i64, intercept: i64) -> Self {
        Self {
            num,
            den,
            intercept,
        }
    }

    /// Evaluate at `(x, y)`.
    ///
    /// Total for any coefficients: the arithmetic is done in `i128`, which
    /// cannot overflow for `u16` inputs and `i64` coefficients, and the result
    /// saturates to the `i32` range. A zero denominator drops the slope.
    pub fn eval(&self, x: u16, y: u16) -> i32 {
        let x = i128::from(x) << 10;
        let y = i128::from(y) << 10;
        let slope = if self.den == 0 {
            0
        } else {
            x * i128::from(self.num) / i128::from(self.den)
        };
        let fixed = (y + slope + (i128::from(self.intercept) << 10)) >> 10;
        fixed.clamp(i128::from(i32::MIN), i128::from(i32::MAX)) as i32
    }
}

/// Panel-specific calibration data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelProfile {
    /// Offset functions F1..F4.
    pub formulas: [OffsetFormula; 4],
    /// White point for each preset; index 0 is a placeholder.
    pub white_points: [WhitePoint; PRESET_COUNT as usize + 1],
}

impl Default for PanelProfile {
    fn default() -> Self {
        Self {
            formulas: [
                OffsetFormula::new(-353, 326, 30),
                OffsetFormula::new(-20, 19, -14),
                OffsetFormula::new(185, 42, -16412),
                OffsetFormula::new(337, 106, -12601),
            ],
            white_points: [
                WhitePoint::new(0xff, 0xff, 0xff),
                WhitePoint::new(0xff, 0xfa, 0xf9),
                WhitePoint::new(0xff, 0xfb, 0xfe),
                WhitePoint::new(0xfb, 0xfa, 0xff),
                WhitePoint::new(0xff, 0xfe, 0xfc),
                WhitePoint::new(0xff, 0xff, 0xff),
                WhitePoint::new(0xfb, 0xfc, 0xff),
                WhitePoint::new(0xfd, 0xff, 0xfa),
                WhitePoint::new(0xfc, 0xff, 0xfc),
                WhitePoint::new(0xfb, 0xff, 0xff),
            ],
        }
    }
}

impl PanelProfile {
    /// Compute offsets F1..F4 for a coordinate; slot 0 stays zero.
    pub fn compute_offsets(&self, x: u16, y: u16) -> [i32; OFFSET_COUNT] {
        let mut offsets = [0; OFFSET_COUNT];
        for (slot, formula) in offsets[1..].iter_mut().zip(&self.formulas) {
            *slot = formula.eval(x, y);
        }
        offsets
    }

    /// White point of a preset; out-of-range indices fall back to preset 1.
    pub fn white_point(&self, index: u8) -> WhitePoint {
        let index = if (1..=PRESET_COUNT).contains(&index) { index } else { 1 };
        self.white_points[usize::from(index)]
    }

    /// Full calibration for a coordinate: offsets and chosen preset.
    pub fn calibrate(&self, x: u16, y: u16) -> CalibrationReport {
        let offsets = self.compute_offsets(x, y);
        let index = derive_calibration_index(&offsets);
        info!(
            "{}, {}, {}, {}, tune{}",
            offsets[1], offsets[2], offsets[3], offsets[4], index
        );
        CalibrationReport { offsets, index }
    }
}

/// Pick a preset in `1..=9` from offsets F1..F4.
///
/// Slot 0 of `offsets` is ignored.
pub fn derive_calibration_index(offsets: &[i32; OFFSET_COUNT]) -> u8 {
    let index = if offsets[1] > 0 {
        if offsets[3] > 0 {
            3
        } else if offsets[4] < 0 {
            1
        } else {
            2
        }
    } else if offsets[2] < 0 {
        if offsets[3] > 0 {
            9
        } else if offsets[4] < 0 {
            7
        } else {
            8
        }
    } else if offsets[3] > 0 {
        6
    } else if offsets[4] < 0 {
        4
    } else {
        5
    };

    if (1..=PRESET_COUNT).contains(&index) {
        index
    } else {
        1
    }
}

/// Offsets and preset chosen for a panel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationReport {
    /// Offsets F1..F4 in slots 1..=4.
    pub offsets: [i32; OFFSET_COUNT],
    /// Chosen preset, `1..=9`.
    pub index: u8,
}

impl fmt::Display for CalibrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, offset) in self.offsets.iter().enumerate().skip(1) {
            write!(f, "f{i}: {offset}, ")?;
        }
        writeln!(f, "tune{}", self.index)
    }
}

// =============================================================================
// Coordinate sources
// =============================================================================

/// Source of the panel's measured chromaticity coordinate.
pub trait CoordinateSource: Send + Sync {
    /// Read the coordinate.
    ///
    /// # Errors
    /// Returns [`ControllerError::NotAvailable`] if the panel cannot report it.
    fn read(&self) -> Result<(u16, u16), ControllerError>;
}

impl<T: CoordinateSource + ?Sized> CoordinateSource for Arc<T> {
    fn read(&self) -> Result<(u16, u16), ControllerError> {
        (**self).read()
    }
}

/// Parse a `"x, y"` coordinate. A `(0, 0)` reading counts as unavailable.
///
/// # Errors
/// Returns [`ControllerError::NotAvailable`] if the text is malformed or zero.
pub fn parse_coordinate(text: &str) -> Result<(u16, u16), ControllerError> {
    let unavailable = || ControllerError::NotAvailable(format!("bad coordinate {:?}", text.trim()));

    let (x, y) = text.trim().split_once(',').ok_or_else(unavailable)?;
    let x: u16 = x.trim().parse().map_err(|_| unavailable())?;
    let y: u16 = y.trim().parse().map_err(|_| unavailable())?;

    if x == 0 && y == 0 {
        return Err(unavailable());
    }
    Ok((x, y))
}

/// Reads the coordinate from a text resource such as a sysfs attribute.
#[derive(Debug, Clone)]
pub struct FileCoordinateSource {
    path: PathBuf,
}

impl FileCoordinateSource {
    /// Read from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for FileCoordinateSource {
    fn default() -> Self {
        Self::new(PANEL_COORDINATE_PATH)
    }
}

impl CoordinateSource for FileCoordinateSource {
    fn read(&self) -> Result<(u16, u16), ControllerError> {
        let text = fs::read_to_string(&self.path).map_err(|e| {
            debug!("open skip: {}, {}", self.path.display(), e);
            ControllerError::NotAvailable(format!("{}: {}", self.path.display(), e))
        })?;
        parse_coordinate(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_tree_covers_every_branch() {
        let cases = [
            ([0, 1, 0, 1, 0], 3),
            ([0, 1, 0, 0, -1], 1),
            ([0, 1, 0, 0, 0], 2),
            ([0, 0, -1, 1, 0], 9),
            ([0, 0, -1, 0, -1], 7),
            ([0, 0, -1, 0, 0], 8),
            ([0, 0, 0, 1, 0], 6),
            ([0, 0, 0, 0, -1], 4),
            ([0, 0, 0, 0, 0], 5),
            ([0, -5, 3, -2, 7], 5),
        ];
        for (offsets, expected) in cases {
            assert_eq!(
                derive_calibration_index(&offsets),
                expected,
                "offsets {offsets:?}"
            );
        }
    }

    #[test]
    fn test_decision_tree_ignores_reserved_slot() {
        assert_eq!(
            derive_calibration_index(&[i32::MIN, 1, 0, 1, 0]),
            derive_calibration_index(&[i32::MAX, 1, 0, 1, 0])
        );
    }

    #[test]
    fn test_index_is_range_bound_over_sign_patterns() {
        let values = [i32::MIN, -1, 0, 1, i32::MAX];
        for a in values {
            for b in values {
                for c in values {
                    for d in values {
                        let index = derive_calibration_index(&[0, a, b, c, d]);
                        assert!((1..=9).contains(&index));
                    }
                }
            }
        }
    }

    #[test]
    fn test_offsets_are_deterministic() {
        let profile = PanelProfile::default();
        let first = profile.calibrate(150, 200);
        let second = profile.calibrate(150, 200);
        assert_eq!(first, second);
        assert!((1..=9).contains(&first.index));
        assert_eq!(first.offsets[0], 0);
    }

    #[test]
    fn test_offset_formula_matches_fixed_point_reference() {
        let f1 = OffsetFormula::new(-353, 326, 30);
        // ((200 << 10) - ((150 << 10) * 353 / 326) + (30 << 10)) >> 10
        let expected = ((200i64 << 10) - ((150i64 << 10) * 353 / 326) + (30i64 << 10)) >> 10;
        assert_eq!(i64::from(f1.eval(150, 200)), expected);
    }

    #[test]
    fn test_offsets_total_over_extremes() {
        let profile = PanelProfile::default();
        for (x, y) in [(0, 0), (u16::MAX, 0), (0, u16::MAX), (u16::MAX, u16::MAX)] {
            let report = profile.calibrate(x, y);
            assert!((1..=9).contains(&report.index));
        }
    }

    #[test]
    fn test_offset_formula_saturates_on_extreme_coefficients() {
        let high = OffsetFormula::new(i64::MAX, 1, i64::MAX);
        assert_eq!(high.eval(u16::MAX, u16::MAX), i32::MAX);

        let low = OffsetFormula::new(i64::MIN, 1, i64::MIN);
        assert_eq!(low.eval(u16::MAX, 0), i32::MIN);

        let flipped = OffsetFormula::new(i64::MIN, -1, 0);
        assert_eq!(flipped.eval(u16::MAX, 0), i32::MAX);

        // zero denominator drops the slope
        assert_eq!(OffsetFormula::new(7, 0, 5).eval(100, 7), 12);

        let profile = PanelProfile {
            formulas: [high, low, flipped, OffsetFormula::new(0, 0, 0)],
            ..PanelProfile::default()
        };
        let report = profile.calibrate(u16::MAX, u16::MAX);
        assert!((1..=9).contains(&report.index));
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("2989, 3109\n").unwrap(), (2989, 3109));
        assert_eq!(parse_coordinate("0, 5").unwrap(), (0, 5));
        assert!(matches!(
            parse_coordinate("0, 0"),
            Err(ControllerError::NotAvailable(_))
        ));
        assert!(parse_coordinate("garbage").is_err());
        assert!(parse_coordinate("70000, 1").is_err());
    }

    #[test]
    fn test_missing_file_is_not_available() {
        let source = FileCoordinateSource::new("/nonexistent/mdnie/color_coordinate");
        assert!(matches!(
            source.read(),
            Err(ControllerError::NotAvailable(_))
        ));
    }

    #[test]
    fn test_report_rendering() {
        let report = CalibrationReport {
            offsets: [0, 12, -3, 0, 7],
            index: 2,
        };
        assert_eq!(report.to_string(), "f1: 12, f2: -3, f3: 0, f4: 7, tune2\n");
    }

    #[test]
    fn test_preset_white_point_falls_back_to_first() {
        let profile = PanelProfile::default();
        assert_eq!(profile.white_point(0), profile.white_points[1]);
        assert_eq!(profile.white_point(10), profile.white_points[1]);
        assert_eq!(profile.white_point(9), profile.white_points[9]);
    }
}
