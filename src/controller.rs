//! mDNIe tuning controller implementation.

use crate::ascr::WhitePoint;
use crate::calibration::{CalibrationReport, CoordinateSource};
use crate::config::TunerConfig;
use crate::error::ControllerError;
use crate::modes::{Accessibility, Bypass, HbmLevel, Mode, Scenario};
use crate::resolver::{self, Resolved, Selectors};
use crate::state::{ControllerState, Lifecycle, SelectorState};
use crate::table::{SequenceStore, TableKey, TuningTable};
use crate::transport::Transport;
use crate::writer::{RegisterDump, TableWriter};

use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Result of [`MdnieController::apply_panel_calibration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationOutcome {
    /// The pass already ran earlier; nothing was done.
    AlreadyApplied,
    /// The panel coordinate could not be read; the pass is over without patching.
    Unavailable,
    /// The pass ran.
    Applied {
        /// Offsets and preset chosen.
        report: CalibrationReport,
        /// Number of uncalibrated tables that received the preset white point.
        patched: usize,
    },
}

/// Selects tuning tables and writes them to a display chip.
///
/// Each setter updates the selector state under the state lock, releases it,
/// then resolves the active table and writes it under the transport lock. Two
/// setters racing each other may both write; whichever write runs last
/// reflects the latest state at the time it resolved. The published white
/// point is recorded before the transport lock is released, so it always
/// belongs to the last table on the chip.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use mdnie_lite::{
///     MdnieController, MockCoordinateSource, MockTransport, Scenario, TunerConfig, sample_store,
/// };
///
/// let config = TunerConfig::default();
/// let store = Arc::new(sample_store(&config)?);
/// let bus = MockTransport::new();
/// let controller = MdnieController::register(
///     "mdnie",
///     store,
///     config,
///     Box::new(bus.clone()),
///     Box::new(MockCoordinateSource::unavailable()),
/// );
///
/// controller.set_scenario(Scenario::Browser.raw())?;
/// assert_eq!(controller.state().scenario, Scenario::Browser);
/// assert!(!bus.writes().is_empty());
/// # Ok::<(), mdnie_lite::ControllerError>(())
/// ```
pub struct MdnieController {
    name: String,
    config: TunerConfig,
    store: Arc<SequenceStore>,
    state: Mutex<SelectorState>,
    writer: TableWriter,
    coordinates: Box<dyn CoordinateSource>,
}

impl MdnieController {
    /// Register a controller and bring the chip to the default configuration.
    ///
    /// The controller starts enabled with scenario UI, mode AUTO and no
    /// accessibility profile, and writes the matching table right away. A
    /// failing first write is logged; the controller is usable regardless.
    pub fn register(
        name: impl Into<String>,
        store: Arc<SequenceStore>,
        config: TunerConfig,
        transport: Box<dyn Transport>,
        coordinates: Box<dyn CoordinateSource>,
    ) -> Self {
        let writer = TableWriter::new(transport, config.transport_mode);
        let controller = Self {
            name: name.into(),
            config,
            store,
            state: Mutex::new(SelectorState::default()),
            writer,
            coordinates,
        };

        controller.lock_state().enabled = true;
        if let Err(e) = controller.update() {
            error!("{}: initial update failed: {}", controller.name, e);
        }
        info!("{}: registered successfully", controller.name);
        controller
    }

    /// Stop accepting operations. Every later call returns
    /// [`ControllerError::Unregistered`]; the chip keeps its last table.
    pub fn unregister(&self) {
        let mut state = self.lock_state();
        state.lifecycle = Lifecycle::Unregistered;
        state.enabled = false;
        state.override_table = None;
        info!("{}: unregistered", self.name);
    }

    fn lock_state(&self) -> MutexGuard<'_, SelectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_registered(&self) -> Result<MutexGuard<'_, SelectorState>, ControllerError> {
        let state = self.lock_state();
        if state.lifecycle == Lifecycle::Unregistered {
            return Err(ControllerError::Unregistered);
        }
        Ok(state)
    }

    /// Name given at registration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration given at registration.
    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    /// The shared table catalog.
    pub fn catalog(&self) -> &Arc<SequenceStore> {
        &self.store
    }

    /// Get a snapshot of the current state.
    pub fn state(&self) -> ControllerState {
        self.lock_state().snapshot()
    }

    /// Current scenario.
    pub fn scenario(&self) -> Scenario {
        self.lock_state().selectors.scenario
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.lock_state().selectors.mode
    }

    /// Current accessibility profile.
    pub fn accessibility(&self) -> Accessibility {
        self.lock_state().selectors.accessibility
    }

    /// Current high-brightness class.
    pub fn hbm(&self) -> HbmLevel {
        self.lock_state().selectors.hbm
    }

    /// Current bypass switch.
    pub fn bypass(&self) -> Bypass {
        self.lock_state().bypass
    }

    /// White point of the last table written, or of the last ambient override.
    pub fn white_point(&self) -> WhitePoint {
        self.lock_state().white_point
    }

    /// Whether writes currently reach the chip.
    pub fn is_enabled(&self) -> bool {
        self.lock_state().enabled
    }

    /// Whether the one-time panel calibration has run.
    pub fn calibration_applied(&self) -> bool {
        self.lock_state().calibration_applied
    }

    /// The private table last written by an ambient white-point override.
    pub fn override_table(&self) -> Option<Arc<TuningTable>> {
        self.lock_state().override_table.clone()
    }

    // =========================================================================
    // Resolution and writing
    // =========================================================================

    fn selectors(&self) -> Selectors {
        self.lock_state().selectors
    }

    /// Resolve the table the current state selects.
    ///
    /// The state lock is released before the catalog is consulted; the
    /// returned handle stays valid on its own.
    pub fn resolve(&self) -> Option<Resolved> {
        let selectors = self.selectors();
        resolver::resolve(&selectors, self.config.family, &self.store)
    }

    /// Write a table if the controller is enabled, then run `publish` on the
    /// state while the transport lock is still held.
    ///
    /// Lock order is transport then state; nothing takes the transport lock
    /// while holding the state lock.
    fn commit(
        &self,
        table: &TuningTable,
        publish: impl FnOnce(&mut SelectorState),
    ) -> Result<(), ControllerError> {
        if !self.lock_registered()?.enabled {
            return Err(ControllerError::Disabled);
        }
        self.writer.write_then(table, || publish(&mut *self.lock_state()))
    }

    /// Resolve and write the active table, then publish its white point.
    ///
    /// Returns the table written, or `None` if the controller is disabled or
    /// nothing resolved.
    fn update(&self) -> Result<Option<Arc<TuningTable>>, ControllerError> {
        if !self.lock_registered()?.enabled {
            error!("{}: mdnie state is off", self.name);
            return Ok(None);
        }

        let Some(resolved) = self.resolve() else {
            warn!("{}: no table for {:?}", self.name, self.selectors());
            return Ok(None);
        };
        debug!(
            "{}: {:?} rule selected {}",
            self.name, resolved.rule, resolved.key
        );

        let white = self.config.ascr.white_point(&resolved.table);
        if let Err(e) = &white {
            warn!("{}: {}", self.name, e);
        }
        self.commit(&resolved.table, |state| {
            if let Ok(white) = white {
                state.white_point = white;
            }
        })?;
        info!("{}: {}", self.name, resolved.table.name());
        Ok(Some(resolved.table))
    }

    // =========================================================================
    // Setters
    // =========================================================================

    /// Set the display-quality preset.
    ///
    /// The first call also runs the one-time panel calibration.
    ///
    /// # Errors
    /// - [`ControllerError::InvalidArgument`] if `raw >= Mode::MAX`
    /// - [`ControllerError::InvalidSequence`] / [`ControllerError::Transport`] from the write
    pub fn set_mode(&self, raw: u32) -> Result<(), ControllerError> {
        let mode = Mode::new(raw)?;
        info!("{}: mode {}", self.name, raw);

        self.lock_registered()?.selectors.mode = mode;
        self.apply_panel_calibration()?;
        self.update()?;
        Ok(())
    }

    /// Set the content scenario. Invalid values select UI instead of failing.
    ///
    /// # Errors
    /// [`ControllerError::InvalidSequence`] / [`ControllerError::Transport`] from the write.
    pub fn set_scenario(&self, raw: u32) -> Result<(), ControllerError> {
        let scenario = Scenario::coerce(raw);
        info!("{}: scenario {} ({})", self.name, raw, scenario);

        self.lock_registered()?.selectors.scenario = scenario;
        self.update()?;
        Ok(())
    }

    /// Set the accessibility profile.
    ///
    /// For the color-blind profile, `params` are stored into the profile's
    /// table, low byte first, before the profile is selected. Other profiles
    /// ignore `params`.
    ///
    /// # Errors
    /// - [`ControllerError::InvalidArgument`] if `raw >= Accessibility::MAX` or
    ///   more than nine parameters are given; nothing changes in that case
    /// - [`ControllerError::TableNotFound`] if the color-blind table is missing
    /// - [`ControllerError::InvalidSequence`] / [`ControllerError::Transport`] from the write
    pub fn set_accessibility(&self, raw: u32, params: &[u16]) -> Result<(), ControllerError> {
        let accessibility = Accessibility::new(raw)?;
        info!("{}: accessibility {}, {} params", self.name, raw, params.len());

        drop(self.lock_registered()?);

        if accessibility == Accessibility::ColorBlind {
            if params.len() > Accessibility::COLOR_BLIND_PARAMS {
                return Err(ControllerError::InvalidArgument {
                    what: "color blind parameter count",
                    value: params.len() as i64,
                    min: 0,
                    max: Accessibility::COLOR_BLIND_PARAMS as i64,
                });
            }
            if !params.is_empty() {
                let layout = &self.config.ascr;
                self.store.update(
                    TableKey::Accessibility(Accessibility::ColorBlind),
                    |table| layout.store_color_blind(table, params),
                )?;
                info!("{}: color blind params {:04x?}", self.name, params);
            }
        }

        self.lock_registered()?.selectors.accessibility = accessibility;
        self.update()?;
        Ok(())
    }

    /// Feed an ambient lux reading.
    ///
    /// Nothing is written unless the derived high-brightness class changes.
    ///
    /// # Errors
    /// [`ControllerError::InvalidSequence`] / [`ControllerError::Transport`] from the write.
    pub fn set_brightness(&self, lux: i32) -> Result<(), ControllerError> {
        let hbm = HbmLevel::from_lux(lux, &self.config.hbm_lux_steps);

        let changed = {
            let mut state = self.lock_registered()?;
            let changed = state.selectors.hbm != hbm;
            state.selectors.hbm = hbm;
            changed
        };

        if changed {
            info!("{}: lux {} -> hbm {}", self.name, lux, hbm.raw());
            self.update()?;
        }
        Ok(())
    }

    /// Switch the tuner bypass. The bypass table is written directly, without
    /// going through table resolution.
    ///
    /// While the display is powered down the switch is recorded and nothing
    /// is written, like every other setter.
    ///
    /// # Errors
    /// - [`ControllerError::InvalidArgument`] if `raw >= Bypass::MAX`
    /// - [`ControllerError::TableNotFound`] if the bypass table is missing
    /// - [`ControllerError::InvalidSequence`] / [`ControllerError::Transport`] from the write
    pub fn set_bypass(&self, raw: u32) -> Result<(), ControllerError> {
        let bypass = Bypass::new(raw)?;
        info!("{}: bypass {}", self.name, raw);

        let enabled = {
            let mut state = self.lock_registered()?;
            state.bypass = bypass;
            state.enabled
        };
        if !enabled {
            error!("{}: mdnie state is off", self.name);
            return Ok(());
        }

        let key = TableKey::Bypass(bypass);
        let table = self.store.get(key).ok_or(ControllerError::TableNotFound(key))?;
        self.commit(&table, |_| ())?;
        info!("{}: {}", self.name, table.name());
        Ok(())
    }

    /// Apply a white point measured from ambient light.
    ///
    /// Only honoured while enabled, with no accessibility profile, in AUTO mode
    /// and a browser or e-book scenario; otherwise this is a no-op returning
    /// `Ok(false)`. The active table is copied, the copy's white point patched
    /// and written; the catalog table is left as it is.
    ///
    /// # Errors
    /// - [`ControllerError::RegisterOutOfBounds`] if the register does not fit the table
    /// - [`ControllerError::InvalidSequence`] / [`ControllerError::Transport`] from the write
    pub fn apply_ambient_white_point(&self, white: WhitePoint) -> Result<bool, ControllerError> {
        let selectors = {
            let state = self.lock_registered()?;
            if !state.accepts_ambient() {
                debug!("{}: ambient white point {} ignored", self.name, white);
                return Ok(false);
            }
            state.selectors
        };
        info!("{}: ambient white point {}", self.name, white);

        let Some(resolved) = resolver::resolve(&selectors, self.config.family, &self.store) else {
            warn!("{}: no table for {:?}", self.name, selectors);
            return Ok(false);
        };

        let mut copy = TuningTable::clone(&resolved.table);
        self.config.ascr.patch_white_point(&mut copy, white)?;
        let copy = Arc::new(copy);

        self.commit(&copy, |state| {
            state.override_table = Some(Arc::clone(&copy));
            state.white_point = white;
        })?;
        Ok(true)
    }

    /// Gate writes on or off. Turning on writes the active table; turning off
    /// leaves the chip in its last state.
    ///
    /// # Errors
    /// [`ControllerError::InvalidSequence`] / [`ControllerError::Transport`] from the write.
    pub fn set_enabled(&self, enabled: bool) -> Result<(), ControllerError> {
        let was = {
            let mut state = self.lock_registered()?;
            let was = state.enabled;
            state.enabled = enabled;
            was
        };

        if enabled && !was {
            debug!("{}: enabled", self.name);
            self.update()?;
        } else if !enabled && was {
            debug!("{}: disabled", self.name);
        }
        Ok(())
    }

    // =========================================================================
    // Calibration
    // =========================================================================

    /// Run the one-time panel calibration.
    ///
    /// At most one call per controller does any work. It reads the panel
    /// coordinate, picks a preset white point and writes it into every regular
    /// table (UI through e-mail scenarios) whose white point is still the
    /// uncalibrated sentinel. An unreadable coordinate ends the pass without
    /// patching; it is not retried.
    ///
    /// # Errors
    /// [`ControllerError::Unregistered`] after [`MdnieController::unregister`].
    pub fn apply_panel_calibration(&self) -> Result<CalibrationOutcome, ControllerError> {
        {
            let mut state = self.lock_registered()?;
            if state.calibration_applied {
                return Ok(CalibrationOutcome::AlreadyApplied);
            }
            state.calibration_applied = true;
        }

        let (x, y) = match self.coordinates.read() {
            Ok(coordinate) => coordinate,
            Err(e) => {
                warn!("{}: skip color correction: {}", self.name, e);
                return Ok(CalibrationOutcome::Unavailable);
            }
        };

        let report = self.config.panel.calibrate(x, y);
        info!("{}: {}, {}, tune{}", self.name, x, y, report.index);

        let patched = self.patch_uncalibrated(self.config.panel.white_point(report.index));
        Ok(CalibrationOutcome::Applied { report, patched })
    }

    fn patch_uncalibrated(&self, white: WhitePoint) -> usize {
        let layout = &self.config.ascr;
        let mut patched = 0;

        let scenarios = Scenario::NORMAL
            .into_iter()
            .filter(|s| s.raw() <= Scenario::Email.raw());
        for scenario in scenarios {
            for mode in Mode::ALL {
                let key = TableKey::Tuning(scenario, mode);
                match self
                    .store
                    .update(key, |table| layout.patch_uncalibrated(table, white))
                {
                    Ok(true) => patched += 1,
                    Ok(false) | Err(ControllerError::TableNotFound(_)) => {}
                    Err(e) => warn!("{}: {}", self.name, e),
                }
            }
        }

        debug!("{}: patched {} tables with {}", self.name, patched, white);
        patched
    }

    /// Re-read the panel coordinate and report the offsets and preset it yields.
    ///
    /// # Errors
    /// - [`ControllerError::CalibrationPending`] before the calibration pass ran
    /// - [`ControllerError::NotAvailable`] if the coordinate cannot be read
    pub fn calibration_report(&self) -> Result<CalibrationReport, ControllerError> {
        if !self.lock_registered()?.calibration_applied {
            return Err(ControllerError::CalibrationPending);
        }
        let (x, y) = self.coordinates.read()?;
        Ok(self.config.panel.calibrate(x, y))
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Read the active table back from the chip and compare it register by
    /// register.
    ///
    /// # Errors
    /// - [`ControllerError::Disabled`] if the display is powered down
    /// - [`ControllerError::TableNotFound`] if the selected table is missing
    /// - [`ControllerError::InvalidSequence`] / [`ControllerError::Transport`] from the readback
    pub fn register_dump(&self) -> Result<RegisterDump, ControllerError> {
        let selectors = {
            let state = self.lock_registered()?;
            if !state.enabled {
                return Err(ControllerError::Disabled);
            }
            state.selectors
        };

        let (_, key) = resolver::select(&selectors, self.config.family)
            .ok_or_else(|| ControllerError::NotAvailable("no table selected".to_string()))?;
        let table = self.store.get(key).ok_or(ControllerError::TableNotFound(key))?;
        self.writer.readback(&table)
    }
}
