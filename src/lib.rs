//! Table selection and white-point calibration for mDNIe-lite display tuning chips.
//!
//! An mDNIe-lite chip sits between the display controller and the panel and
//! applies a color-processing configuration written to it as a *tuning
//! table*: a short list of command blocks. This crate picks the right table
//! for the current scenario, mode, accessibility profile and ambient
//! brightness, writes it over a pluggable transport, and embeds a
//! panel-specific white point into the catalog once per panel.
//!
//! # Overview
//!
//! - [`MdnieController`] owns the selector state and serialises writes.
//! - [`SequenceStore`] is the shared table catalog, keyed by [`TableKey`].
//! - [`Transport`] is the bus to the chip; [`TransportMode`] picks the write
//!   discipline.
//! - [`Attribute`] exposes every knob as text for a sysfs-style surface.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mdnie_lite::{
//!     Attribute, FileCoordinateSource, MdnieController, Mode, PowerEvent, Scenario,
//!     SequenceStore, Transport, TunerConfig,
//! };
//!
//! # fn bus() -> Box<dyn Transport> { Box::new(mdnie_lite::MockTransport::new()) }
//! # fn catalog() -> Result<SequenceStore, mdnie_lite::ControllerError> {
//! #     mdnie_lite::sample_store(&TunerConfig::default())
//! # }
//! fn main() -> Result<(), mdnie_lite::ControllerError> {
//!     let controller = MdnieController::register(
//!         "mdnie",
//!         Arc::new(catalog()?),
//!         TunerConfig::default(),
//!         bus(),
//!         Box::new(FileCoordinateSource::default()),
//!     );
//!
//!     // First mode store also calibrates the panel
//!     controller.set_mode(Mode::Standard.raw())?;
//!     controller.set_scenario(Scenario::Browser.raw())?;
//!
//!     // Same knobs through the textual surface
//!     controller.store(Attribute::Lux, "45000\n")?;
//!     print!("{}", controller.show(Attribute::ColorCorrect)?);
//!
//!     controller.handle_power_event(PowerEvent::PowerDown)?;
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! Use [`MockTransport`] and [`sample_store`] to run a controller without
//! hardware:
//!
//! ```
//! use std::sync::Arc;
//! use mdnie_lite::{
//!     MdnieController, MockCoordinateSource, MockTransport, TunerConfig, sample_store,
//! };
//!
//! let config = TunerConfig::default();
//! let bus = MockTransport::new();
//! let controller = MdnieController::register(
//!     "mdnie",
//!     Arc::new(sample_store(&config).unwrap()),
//!     config,
//!     Box::new(bus.clone()),
//!     Box::new(MockCoordinateSource::new(150, 200)),
//! );
//!
//! assert_eq!(bus.writes().len(), 4);
//! assert!(controller.register_dump().unwrap().mismatches().next().is_none());
//! ```

#![warn(missing_docs)]

mod ascr;
mod attrs;
mod calibration;
mod config;
mod controller;
mod error;
mod mock;
mod modes;
mod power;
mod resolver;
mod state;
mod table;
mod transport;
mod writer;

// Re-export public API
pub use ascr::{AscrEncoding, AscrLayout, WhitePoint};
pub use attrs::Attribute;
pub use calibration::{
    CalibrationReport, CoordinateSource, FileCoordinateSource, OFFSET_COUNT, OffsetFormula,
    PANEL_COORDINATE_PATH, PRESET_COUNT, PanelProfile, derive_calibration_index,
    parse_coordinate,
};
pub use config::{PanelFamily, TunerConfig};
pub use controller::{CalibrationOutcome, MdnieController};
pub use error::ControllerError;
pub use mock::{MockCoordinateSource, MockTransport, TransportOp, sample_store, sample_table};
pub use modes::{Accessibility, Bypass, HbmLevel, Mode, Scenario};
pub use power::{BLANK_POWERDOWN, BLANK_UNBLANK, PowerEvent};
pub use resolver::{Resolved, Rule, Selectors, resolve, select};
pub use state::ControllerState;
pub use table::{CommandBlock, CommandSlot, SequenceStore, TableKey, TuningTable};
pub use transport::{ENOTSUPP, Transport, TransportMode};
pub use writer::{RegisterBlock, RegisterDump, RegisterEntry, TableWriter};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn register(config: TunerConfig, coordinates: MockCoordinateSource) -> (MdnieController, MockTransport) {
        let bus = MockTransport::new();
        let controller = MdnieController::register(
            "mdnie",
            Arc::new(sample_store(&config).unwrap()),
            config,
            Box::new(bus.clone()),
            Box::new(coordinates),
        );
        (controller, bus)
    }

    #[test]
    fn test_registration_defaults() {
        let (controller, _bus) = register(TunerConfig::default(), MockCoordinateSource::unavailable());
        let state = controller.state();
        assert_eq!(state.scenario, Scenario::Ui);
        assert_eq!(state.mode, Mode::Auto);
        assert_eq!(state.accessibility, Accessibility::Off);
        assert_eq!(state.bypass, Bypass::Off);
        assert!(state.enabled);
        assert!(!state.calibration_applied);
        assert!(state.white_point.is_uncalibrated());
    }

    #[test]
    fn test_calibrated_white_point_reaches_the_chip() {
        let config = TunerConfig::default();
        let layout = config.ascr.clone();
        let panel = config.panel.clone();
        let (controller, bus) = register(config, MockCoordinateSource::new(150, 200));

        controller.store(Attribute::Mode, "0\n").unwrap();

        let expected = panel.white_point(panel.calibrate(150, 200).index);
        assert_eq!(controller.white_point(), expected);

        let cmd1 = bus.writes()[bus.writes().len() - 3].clone();
        assert_eq!(cmd1[0], 0xEC);
        assert_eq!(
            [cmd1[layout.white[0]], cmd1[layout.white[1]], cmd1[layout.white[2]]],
            [expected.r, expected.g, expected.b]
        );
    }

    #[test]
    fn test_two_phase_transport_end_to_end() {
        let config = TunerConfig {
            transport_mode: TransportMode::TwoPhase {
                cmd1_offset: 0x20,
                cmd2_offset: 0x40,
            },
            ..TunerConfig::default()
        };
        let (controller, bus) = register(config, MockCoordinateSource::unavailable());
        bus.clear();

        controller.set_scenario(Scenario::Gallery.raw()).unwrap();
        let ops = bus.ops();
        assert_eq!(ops.len(), 4);
        assert_eq!(ops[0], TransportOp::SetAddress(0x20));
        assert_eq!(ops[2], TransportOp::SetAddress(0x40));

        bus.clear();
        let dump = controller.register_dump().unwrap();
        assert_eq!(dump.mismatches().count(), 0);
        assert!(bus.ops().contains(&TransportOp::SetAddress(0x40)));
    }

    #[test]
    fn test_bit_shift_encoding_end_to_end() {
        let config = TunerConfig {
            ascr: AscrLayout {
                encoding: AscrEncoding::BitShift(4),
                white: [4, 8, 12],
                ..AscrLayout::default()
            },
            ..TunerConfig::default()
        };
        let (controller, _bus) = register(config, MockCoordinateSource::unavailable());

        controller.set_scenario(Scenario::Ebook.raw()).unwrap();
        assert!(controller
            .apply_ambient_white_point(WhitePoint::new(0x12, 0x34, 0x56))
            .unwrap());
        let copy = controller.override_table().unwrap();
        assert_eq!(
            controller.config().ascr.white_point(&copy).unwrap(),
            WhitePoint::new(0x12, 0x34, 0x56)
        );
    }

    #[test]
    fn test_generic_family_keeps_hbm_table_in_text_scenarios() {
        let config = TunerConfig {
            family: PanelFamily::Generic,
            ..TunerConfig::default()
        };
        let (controller, _bus) = register(config, MockCoordinateSource::unavailable());
        controller.set_scenario(Scenario::Browser.raw()).unwrap();
        controller.set_brightness(40000).unwrap();
        assert_eq!(controller.resolve().unwrap().key, TableKey::Hbm(HbmLevel::On));
    }

    #[test]
    fn test_failing_first_write_is_not_fatal() {
        let config = TunerConfig::default();
        let bus = MockTransport::new();
        bus.fail_write(0, -5);
        let controller = MdnieController::register(
            "mdnie",
            Arc::new(sample_store(&config).unwrap()),
            config,
            Box::new(bus.clone()),
            Box::new(MockCoordinateSource::unavailable()),
        );

        assert!(controller.is_enabled());
        controller.set_scenario(Scenario::VideoNormal.raw()).unwrap();
        assert_eq!(bus.writes().len(), 4);
    }
}
