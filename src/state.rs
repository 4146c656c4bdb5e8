//! Controller state.

use crate::ascr::WhitePoint;
use crate::modes::{Accessibility, Bypass, HbmLevel, Mode, Scenario};
use crate::resolver::Selectors;
use crate::table::TuningTable;

use std::sync::Arc;

/// A snapshot of the controller's current state.
///
/// Use [`MdnieController::state`](crate::MdnieController::state) to obtain one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControllerState {
    /// Content scenario.
    pub scenario: Scenario,
    /// Display-quality preset.
    pub mode: Mode,
    /// Accessibility profile.
    pub accessibility: Accessibility,
    /// High-brightness class.
    pub hbm: HbmLevel,
    /// Tuner bypass switch.
    pub bypass: Bypass,
    /// Whether writes reach the chip.
    pub enabled: bool,
    /// Whether the one-time panel calibration has run.
    pub calibration_applied: bool,
    /// White point of the last table written, or of the last ambient override.
    pub white_point: WhitePoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Lifecycle {
    #[default]
    Registered,
    Unregistered,
}

/// Mutable state owned by the controller; only touched under its lock.
#[derive(Debug, Default)]
pub(crate) struct SelectorState {
    pub(crate) selectors: Selectors,
    pub(crate) bypass: Bypass,
    pub(crate) enabled: bool,
    pub(crate) calibration_applied: bool,
    pub(crate) white_point: WhitePoint,
    /// Private copy of the table last patched with ambient feedback.
    pub(crate) override_table: Option<Arc<TuningTable>>,
    pub(crate) lifecycle: Lifecycle,
}

impl SelectorState {
    pub(crate) fn snapshot(&self) -> ControllerState {
        ControllerState {
            scenario: self.selectors.scenario,
            mode: self.selectors.mode,
            accessibility: self.selectors.accessibility,
            hbm: self.selectors.hbm,
            bypass: self.bypass,
            enabled: self.enabled,
            calibration_applied: self.calibration_applied,
            white_point: self.white_point,
        }
    }

    /// Whether ambient white-point feedback may be applied right now.
    pub(crate) fn accepts_ambient(&self) -> bool {
        self.enabled
            && !self.selectors.accessibility.is_on()
            && self.selectors.mode == Mode::Auto
            && self.selectors.scenario.is_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_registration_state() {
        let state = SelectorState::default().snapshot();
        assert_eq!(state.scenario, Scenario::Ui);
        assert_eq!(state.mode, Mode::Auto);
        assert_eq!(state.accessibility, Accessibility::Off);
        assert_eq!(state.hbm, HbmLevel::Off);
        assert!(!state.enabled);
        assert!(!state.calibration_applied);
    }

    #[test]
    fn test_ambient_gate() {
        let mut state = SelectorState {
            enabled: true,
            ..Default::default()
        };
        state.selectors.scenario = Scenario::Browser;
        assert!(state.accepts_ambient());

        state.selectors.scenario = Scenario::Ebook;
        assert!(state.accepts_ambient());

        state.selectors.scenario = Scenario::Ui;
        assert!(!state.accepts_ambient());

        state.selectors.scenario = Scenario::Ebook;
        state.selectors.mode = Mode::Movie;
        assert!(!state.accepts_ambient());

        state.selectors.mode = Mode::Auto;
        state.selectors.accessibility = Accessibility::Grayscale;
        assert!(!state.accepts_ambient());

        state.selectors.accessibility = Accessibility::Off;
        state.enabled = false;
        assert!(!state.accepts_ambient());
    }
}
