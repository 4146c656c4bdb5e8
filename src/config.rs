//! Per-chip configuration, fixed when a controller is registered.

use crate::ascr::AscrLayout;
use crate::calibration::PanelProfile;
use crate::transport::TransportMode;

/// Panel family the chip drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelFamily {
    /// S6E3HA1 AMOLED panel.
    S6e3ha1,
    /// S6TNMR7 TFT panel.
    S6tnmr7,
    /// Any other panel.
    #[default]
    Generic,
}

impl PanelFamily {
    /// Whether text scenarios get a dedicated high-brightness table.
    pub fn has_text_hbm(self) -> bool {
        matches!(self, Self::S6e3ha1 | Self::S6tnmr7)
    }
}

/// Everything that differs between chips and panels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunerConfig {
    /// Panel family.
    pub family: PanelFamily,
    /// Location and encoding of the ambient color register.
    pub ascr: AscrLayout,
    /// How tables are laid onto the transport.
    pub transport_mode: TransportMode,
    /// Lux thresholds of the high-brightness step function, ascending.
    pub hbm_lux_steps: Vec<i32>,
    /// Calibration data of the panel.
    pub panel: PanelProfile,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            family: PanelFamily::S6e3ha1,
            ascr: AscrLayout::default(),
            transport_mode: TransportMode::Sequential,
            hbm_lux_steps: vec![40000],
            panel: PanelProfile::default(),
        }
    }
}
