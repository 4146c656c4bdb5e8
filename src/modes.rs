//! Selector definitions: scenario, mode, accessibility, brightness class and bypass.

use crate::error::ControllerError;
use std::fmt;

// =============================================================================
// Scenario
// =============================================================================

/// Content-type context driving table selection.
///
/// Raw values 2 and 3 form a reserved band and have no variant; together with
/// anything at or above [`Scenario::MAX`] (other than the tuner value) they
/// coerce to [`Scenario::Ui`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Scenario {
    /// Regular user interface.
    #[default]
    Ui,
    /// Video playback.
    VideoNormal,
    /// Camera preview.
    Camera,
    /// Navigation.
    Navi,
    /// Gallery.
    Gallery,
    /// Video telephony.
    Vt,
    /// Web browser.
    Browser,
    /// E-book reader.
    Ebook,
    /// E-mail client.
    Email,
    /// Head-mounted theater, 8-bit.
    Hmt8,
    /// Head-mounted theater, 16-bit.
    Hmt16,
    /// Broadcast (DMB) tuner playback.
    Dmb,
}

impl Scenario {
    /// One past the last normal raw scenario value.
    pub const MAX: u32 = 13;

    /// Raw value reserved for the broadcast tuner scenario.
    pub const DMB_RAW: u32 = 20;

    /// All normal scenarios, in raw order.
    pub const NORMAL: [Scenario; 11] = [
        Scenario::Ui,
        Scenario::VideoNormal,
        Scenario::Camera,
        Scenario::Navi,
        Scenario::Gallery,
        Scenario::Vt,
        Scenario::Browser,
        Scenario::Ebook,
        Scenario::Email,
        Scenario::Hmt8,
        Scenario::Hmt16,
    ];

    /// Decode a raw value, returning `None` for the reserved band and out-of-range values.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Ui),
            1 => Some(Self::VideoNormal),
            4 => Some(Self::Camera),
            5 => Some(Self::Navi),
            6 => Some(Self::Gallery),
            7 => Some(Self::Vt),
            8 => Some(Self::Browser),
            9 => Some(Self::Ebook),
            10 => Some(Self::Email),
            11 => Some(Self::Hmt8),
            12 => Some(Self::Hmt16),
            Self::DMB_RAW => Some(Self::Dmb),
            _ => None,
        }
    }

    /// Decode a raw value, coercing anything invalid to [`Scenario::Ui`].
    pub fn coerce(raw: u32) -> Self {
        Self::from_raw(raw).unwrap_or_default()
    }

    /// The raw value of this scenario.
    pub fn raw(self) -> u32 {
        match self {
            Self::Ui => 0,
            Self::VideoNormal => 1,
            Self::Camera => 4,
            Self::Navi => 5,
            Self::Gallery => 6,
            Self::Vt => 7,
            Self::Browser => 8,
            Self::Ebook => 9,
            Self::Email => 10,
            Self::Hmt8 => 11,
            Self::Hmt16 => 12,
            Self::Dmb => Self::DMB_RAW,
        }
    }

    /// Whether this is the broadcast tuner scenario.
    pub fn is_tuner(self) -> bool {
        self == Self::Dmb
    }

    /// Whether this scenario shows mostly text (browser or e-book).
    pub fn is_text(self) -> bool {
        matches!(self, Self::Browser | Self::Ebook)
    }
}

// =============================================================================
// Mode
// =============================================================================

/// Display-quality preset, orthogonal to the scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Mode {
    /// Standard colors.
    Standard,
    /// Saturated colors.
    Dynamic,
    /// Natural colors.
    Natural,
    /// Movie colors.
    Movie,
    /// Automatic adaptation; the only mode accepting ambient white-point feedback.
    #[default]
    Auto,
}

impl Mode {
    /// One past the last raw mode value.
    pub const MAX: u32 = 5;

    /// All modes, in raw order.
    pub const ALL: [Mode; 5] = [
        Mode::Standard,
        Mode::Dynamic,
        Mode::Natural,
        Mode::Movie,
        Mode::Auto,
    ];

    /// Decode a raw mode value.
    ///
    /// # Errors
    /// Returns [`ControllerError::InvalidArgument`] if `raw >= Mode::MAX`.
    pub fn new(raw: u32) -> Result<Self, ControllerError> {
        Self::ALL
            .get(raw as usize)
            .copied()
            .ok_or(ControllerError::InvalidArgument {
                what: "mode",
                value: i64::from(raw),
                min: 0,
                max: i64::from(Self::MAX) - 1,
            })
    }

    /// The raw value of this mode.
    pub fn raw(self) -> u32 {
        self as u32
    }
}

// =============================================================================
// Accessibility
// =============================================================================

/// Vision-assistance profile overriding normal selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Accessibility {
    /// No accessibility transform.
    #[default]
    Off,
    /// Negative colors.
    Negative,
    /// Color-blind compensation; carries up to nine parameters.
    ColorBlind,
    /// Screen curtain.
    ScreenCurtain,
    /// Grayscale.
    Grayscale,
    /// Negative grayscale.
    GrayscaleNegative,
}

impl Accessibility {
    /// One past the last raw accessibility value.
    pub const MAX: u32 = 6;

    /// Number of 16-bit parameters the color-blind profile carries.
    pub const COLOR_BLIND_PARAMS: usize = 9;

    /// All profiles, in raw order.
    pub const ALL: [Accessibility; 6] = [
        Accessibility::Off,
        Accessibility::Negative,
        Accessibility::ColorBlind,
        Accessibility::ScreenCurtain,
        Accessibility::Grayscale,
        Accessibility::GrayscaleNegative,
    ];

    /// Decode a raw accessibility value.
    ///
    /// # Errors
    /// Returns [`ControllerError::InvalidArgument`] if `raw >= Accessibility::MAX`.
    pub fn new(raw: u32) -> Result<Self, ControllerError> {
        Self::ALL
            .get(raw as usize)
            .copied()
            .ok_or(ControllerError::InvalidArgument {
                what: "accessibility",
                value: i64::from(raw),
                min: 0,
                max: i64::from(Self::MAX) - 1,
            })
    }

    /// The raw value of this profile.
    pub fn raw(self) -> u32 {
        self as u32
    }

    /// Whether any accessibility transform is active.
    pub fn is_on(self) -> bool {
        self != Self::Off
    }
}

// =============================================================================
// Brightness class
// =============================================================================

/// High-brightness-mode class derived from ambient lux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum HbmLevel {
    /// High-brightness mode off.
    #[default]
    Off,
    /// High-brightness mode on.
    On,
    /// High-brightness mode tuned for text content.
    OnText,
}

impl HbmLevel {
    /// Map a lux value through monotonic `steps`: the class is the number of
    /// thresholds the value reaches, saturating at [`HbmLevel::OnText`].
    pub fn from_lux(lux: i32, steps: &[i32]) -> Self {
        let reached = steps.iter().take_while(|&&step| lux >= step).count();
        match reached {
            0 => Self::Off,
            1 => Self::On,
            _ => Self::OnText,
        }
    }

    /// The raw value of this class.
    pub fn raw(self) -> u32 {
        self as u32
    }

    /// Whether high-brightness mode is active.
    pub fn is_on(self) -> bool {
        self != Self::Off
    }
}

// =============================================================================
// Bypass
// =============================================================================

/// External tuner bypass switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Bypass {
    /// Normal processing.
    #[default]
    Off,
    /// Processing bypassed.
    On,
}

impl Bypass {
    /// One past the last raw bypass value.
    pub const MAX: u32 = 2;

    /// Decode a raw bypass value.
    ///
    /// # Errors
    /// Returns [`ControllerError::InvalidArgument`] if `raw >= Bypass::MAX`.
    pub fn new(raw: u32) -> Result<Self, ControllerError> {
        match raw {
            0 => Ok(Self::Off),
            1 => Ok(Self::On),
            _ => Err(ControllerError::InvalidArgument {
                what: "bypass",
                value: i64::from(raw),
                min: 0,
                max: i64::from(Self::MAX) - 1,
            }),
        }
    }

    /// The raw value of this switch.
    pub fn raw(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ui => "ui",
            Self::VideoNormal => "video",
            Self::Camera => "camera",
            Self::Navi => "navi",
            Self::Gallery => "gallery",
            Self::Vt => "vt",
            Self::Browser => "browser",
            Self::Ebook => "ebook",
            Self::Email => "email",
            Self::Hmt8 => "hmt8",
            Self::Hmt16 => "hmt16",
            Self::Dmb => "dmb",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Standard => "standard",
            Self::Dynamic => "dynamic",
            Self::Natural => "natural",
            Self::Movie => "movie",
            Self::Auto => "auto",
        };
        f.write_str(name)
    }
}
