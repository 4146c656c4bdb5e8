//! Textual control surface.
//!
//! Every knob of the controller is reachable as a named attribute that is
//! shown and stored as text, the way a sysfs device directory exposes it.

use crate::ascr::WhitePoint;
use crate::controller::MdnieController;
use crate::error::ControllerError;

use std::fmt;
use std::str::FromStr;

/// A named control attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Display-quality preset, integer.
    Mode,
    /// Content scenario, integer.
    Scenario,
    /// Accessibility profile, decimal, plus up to nine hex parameters on store.
    Accessibility,
    /// Calibration diagnostic; read-only.
    ColorCorrect,
    /// Tuner bypass, integer.
    Bypass,
    /// Ambient lux; write-only.
    Lux,
    /// Register readback of the active table; read-only.
    Mdnie,
    /// Ambient white point, three decimals.
    SensorRgb,
}

impl Attribute {
    /// Every attribute.
    pub const ALL: [Attribute; 8] = [
        Attribute::Mode,
        Attribute::Scenario,
        Attribute::Accessibility,
        Attribute::ColorCorrect,
        Attribute::Bypass,
        Attribute::Lux,
        Attribute::Mdnie,
        Attribute::SensorRgb,
    ];

    /// Attribute name as exposed to users.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Mode => "mode",
            Attribute::Scenario => "scenario",
            Attribute::Accessibility => "accessibility",
            Attribute::ColorCorrect => "color_correct",
            Attribute::Bypass => "bypass",
            Attribute::Lux => "lux",
            Attribute::Mdnie => "mdnie",
            Attribute::SensorRgb => "sensorRGB",
        }
    }

    /// Whether [`MdnieController::show`] supports this attribute.
    pub fn is_readable(self) -> bool {
        !matches!(self, Attribute::Lux)
    }

    /// Whether [`MdnieController::store`] supports this attribute.
    pub fn is_writable(self) -> bool {
        !matches!(self, Attribute::ColorCorrect | Attribute::Mdnie)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::ALL
            .into_iter()
            .find(|attr| attr.name() == s)
            .ok_or_else(|| ControllerError::Parse {
                attr: "attribute",
                input: s.to_string(),
            })
    }
}

fn parse_error(attr: Attribute, input: &str) -> ControllerError {
    ControllerError::Parse {
        attr: attr.name(),
        input: input.to_string(),
    }
}

/// Parse an unsigned integer with base detection: `0x` hex, leading `0`
/// octal, decimal otherwise. One trailing newline is tolerated.
fn parse_uint(attr: Attribute, input: &str) -> Result<u32, ControllerError> {
    let text = input.strip_suffix('\n').unwrap_or(input);
    let digits = text.strip_prefix('+').unwrap_or(text);

    let (radix, number) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };

    if number.is_empty() || !number.chars().all(|c| c.is_digit(radix)) {
        return Err(parse_error(attr, input));
    }
    u32::from_str_radix(number, radix).map_err(|_| parse_error(attr, input))
}

/// Signed counterpart of [`parse_uint`].
fn parse_int(attr: Attribute, input: &str) -> Result<i32, ControllerError> {
    let text = input.strip_suffix('\n').unwrap_or(input);
    let (negative, magnitude) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let magnitude = i64::from(parse_uint(attr, magnitude)?);
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).map_err(|_| parse_error(attr, input))
}

/// `"<profile> [<hex param>...]"`.
fn parse_accessibility(input: &str) -> Result<(u32, Vec<u16>), ControllerError> {
    let attr = Attribute::Accessibility;
    let mut tokens = input.split_whitespace();

    let profile = tokens
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| parse_error(attr, input))?;

    let params = tokens
        .map(|t| {
            let hex = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")).unwrap_or(t);
            u16::from_str_radix(hex, 16).map_err(|_| parse_error(attr, input))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((profile, params))
}

/// `"<r> <g> <b>"`, each `0..=255`.
fn parse_white_point(input: &str) -> Result<WhitePoint, ControllerError> {
    let attr = Attribute::SensorRgb;
    let values = input
        .split_whitespace()
        .map(|t| t.parse::<i64>().map_err(|_| parse_error(attr, input)))
        .collect::<Result<Vec<_>, _>>()?;

    let &[r, g, b] = values.as_slice() else {
        return Err(parse_error(attr, input));
    };
    let channel = |value: i64| {
        u8::try_from(value).map_err(|_| ControllerError::InvalidArgument {
            what: "sensorRGB",
            value,
            min: 0,
            max: 255,
        })
    };
    Ok(WhitePoint::new(channel(r)?, channel(g)?, channel(b)?))
}

impl MdnieController {
    /// Render an attribute as text.
    ///
    /// # Errors
    /// - [`ControllerError::NotReadable`] for write-only attributes
    /// - whatever the underlying getter returns
    pub fn show(&self, attr: Attribute) -> Result<String, ControllerError> {
        let text = match attr {
            Attribute::Mode => format!("{}\n", self.mode().raw()),
            Attribute::Scenario => format!("{}\n", self.scenario().raw()),
            Attribute::Accessibility => format!("{}\n", self.accessibility().raw()),
            Attribute::ColorCorrect => self.calibration_report()?.to_string(),
            Attribute::Bypass => format!("{}\n", self.bypass().raw()),
            Attribute::Lux => return Err(ControllerError::NotReadable(attr.name())),
            Attribute::Mdnie => self.register_dump()?.to_string(),
            Attribute::SensorRgb => format!("{}\n", self.white_point()),
        };
        Ok(text)
    }

    /// Parse `input` and apply it. Returns the number of bytes consumed,
    /// which is always the whole input.
    ///
    /// # Errors
    /// - [`ControllerError::NotWritable`] for read-only attributes
    /// - [`ControllerError::Parse`] for malformed input
    /// - whatever the underlying setter returns
    pub fn store(&self, attr: Attribute, input: &str) -> Result<usize, ControllerError> {
        match attr {
            Attribute::Mode => self.set_mode(parse_uint(attr, input)?)?,
            Attribute::Scenario => self.set_scenario(parse_uint(attr, input)?)?,
            Attribute::Accessibility => {
                let (profile, params) = parse_accessibility(input)?;
                self.set_accessibility(profile, &params)?;
            }
            Attribute::Bypass => self.set_bypass(parse_uint(attr, input)?)?,
            Attribute::Lux => self.set_brightness(parse_int(attr, input)?)?,
            Attribute::SensorRgb => {
                self.apply_ambient_white_point(parse_white_point(input)?)?;
            }
            Attribute::ColorCorrect | Attribute::Mdnie => {
                return Err(ControllerError::NotWritable(attr.name()));
            }
        }
        Ok(input.len())
    }
}
