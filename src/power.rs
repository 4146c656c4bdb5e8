//! Display power events.

use crate::controller::MdnieController;
use crate::error::ControllerError;

use log::debug;

/// Framebuffer blank code for a display coming on.
pub const BLANK_UNBLANK: i32 = 0;

/// Framebuffer blank code for a display powering down.
pub const BLANK_POWERDOWN: i32 = 4;

/// Power transition of the display the controller tunes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerEvent {
    /// The display came on.
    Unblank,
    /// The display powered down.
    PowerDown,
}

impl PowerEvent {
    /// Map a framebuffer blank code. Intermediate blanking levels are not
    /// power transitions and map to `None`.
    pub fn from_blank(code: i32) -> Option<Self> {
        match code {
            BLANK_UNBLANK => Some(Self::Unblank),
            BLANK_POWERDOWN => Some(Self::PowerDown),
            _ => None,
        }
    }
}

impl MdnieController {
    /// React to a display power transition.
    ///
    /// Unblank enables writes and restores the active table if the
    /// controller was disabled. Power-down disables writes.
    ///
    /// # Errors
    /// Whatever restoring the active table returns.
    pub fn handle_power_event(&self, event: PowerEvent) -> Result<(), ControllerError> {
        debug!("{}: {:?}", self.name(), event);
        match event {
            PowerEvent::Unblank => self.set_enabled(true),
            PowerEvent::PowerDown => self.set_enabled(false),
        }
    }

    /// Feed a raw framebuffer blank code; unknown codes are ignored.
    ///
    /// # Errors
    /// Whatever restoring the active table returns.
    pub fn handle_blank(&self, code: i32) -> Result<(), ControllerError> {
        match PowerEvent::from_blank(code) {
            Some(event) => self.handle_power_event(event),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TunerConfig;
    use crate::mock::{MockCoordinateSource, MockTransport, sample_store};
    use crate::modes::Scenario;
    use std::sync::Arc;

    fn controller() -> (MdnieController, MockTransport) {
        let config = TunerConfig::default();
        let bus = MockTransport::new();
        let controller = MdnieController::register(
            "mdnie",
            Arc::new(sample_store(&config).unwrap()),
            config,
            Box::new(bus.clone()),
            Box::new(MockCoordinateSource::unavailable()),
        );
        bus.clear();
        (controller, bus)
    }

    #[test]
    fn test_blank_codes() {
        assert_eq!(PowerEvent::from_blank(0), Some(PowerEvent::Unblank));
        assert_eq!(PowerEvent::from_blank(4), Some(PowerEvent::PowerDown));
        for code in [1, 2, 3, 5, -1] {
            assert_eq!(PowerEvent::from_blank(code), None);
        }
    }

    #[test]
    fn test_power_cycle_restores_latest_state() {
        let (controller, bus) = controller();

        controller.handle_power_event(PowerEvent::PowerDown).unwrap();
        assert!(!controller.is_enabled());

        controller.set_scenario(Scenario::Camera.raw()).unwrap();
        assert!(bus.ops().is_empty());

        controller.handle_power_event(PowerEvent::Unblank).unwrap();
        assert!(controller.is_enabled());
        let table = controller.resolve().unwrap().table;
        assert_eq!(table.name(), "camera_auto");
        assert_eq!(bus.writes().len(), table.blocks().len());
    }

    #[test]
    fn test_unblank_while_on_does_not_rewrite() {
        let (controller, bus) = controller();
        controller.handle_blank(BLANK_UNBLANK).unwrap();
        assert!(bus.ops().is_empty());
    }

    #[test]
    fn test_intermediate_blank_is_ignored() {
        let (controller, _bus) = controller();
        controller.handle_blank(1).unwrap();
        assert!(controller.is_enabled());
        controller.handle_blank(BLANK_POWERDOWN).unwrap();
        assert!(!controller.is_enabled());
    }
}
