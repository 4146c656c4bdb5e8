//! Mock collaborators for testing.

use crate::ascr::{AscrLayout, WhitePoint};
use crate::calibration::CoordinateSource;
use crate::config::TunerConfig;
use crate::error::ControllerError;
use crate::modes::{Accessibility, Bypass, HbmLevel, Mode, Scenario};
use crate::table::{CommandBlock, SequenceStore, TableKey, TuningTable};
use crate::transport::Transport;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One call observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOp {
    /// A command block was written.
    Write(Vec<u8>),
    /// A target address was selected.
    SetAddress(u32),
    /// Registers were read back.
    Read {
        /// First register.
        addr: u8,
        /// Number of bytes.
        len: usize,
    },
}

#[derive(Debug, Default)]
struct MockBus {
    ops: Vec<TransportOp>,
    registers: HashMap<u8, Vec<u8>>,
    fail_write: Option<(usize, i32)>,
}

/// A transport that records every call and emulates the chip's register file.
///
/// Clones share the same bus, so a test keeps one handle for inspection and
/// hands another to the controller. A written block `[addr, data..]` lands in
/// the register file at `addr`, which is what [`Transport::read`] returns.
///
/// # Example
///
/// ```
/// use mdnie_lite::{MockTransport, Transport, TransportOp};
///
/// let mock = MockTransport::new();
/// let mut bus = mock.clone();
/// bus.write(&[0xEC, 0x01, 0x02]).unwrap();
/// assert_eq!(bus.read(0xEC, 2).unwrap(), vec![0x01, 0x02]);
/// assert_eq!(mock.ops()[0], TransportOp::Write(vec![0xEC, 0x01, 0x02]));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    bus: Arc<Mutex<MockBus>>,
}

impl MockTransport {
    /// Create a mock with an empty register file.
    pub fn new() -> Self {
        Self::default()
    }

    fn bus(&self) -> MutexGuard<'_, MockBus> {
        self.bus.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every call observed so far.
    pub fn ops(&self) -> Vec<TransportOp> {
        self.bus().ops.clone()
    }

    /// Only the written blocks, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.bus()
            .ops
            .iter()
            .filter_map(|op| match op {
                TransportOp::Write(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forget the recorded calls; the register file is kept.
    pub fn clear(&self) {
        self.bus().ops.clear();
    }

    /// Make the `nth` upcoming write (0-based) fail with `code`.
    pub fn fail_write(&self, nth: usize, code: i32) {
        self.bus().fail_write = Some((nth, code));
    }

    /// Overwrite one register byte behind the controller's back.
    pub fn poke(&self, addr: u8, index: usize, value: u8) {
        let mut bus = self.bus();
        let register = bus.registers.entry(addr).or_default();
        if register.len() <= index {
            register.resize(index + 1, 0);
        }
        register[index] = value;
    }
}

impl Transport for MockTransport {
    fn write(&mut self, sequence: &[u8]) -> Result<(), i32> {
        let mut bus = self.bus();
        if let Some((nth, code)) = bus.fail_write {
            if nth == 0 {
                bus.fail_write = None;
                return Err(code);
            }
            bus.fail_write = Some((nth - 1, code));
        }
        bus.ops.push(TransportOp::Write(sequence.to_vec()));
        if let Some((&addr, data)) = sequence.split_first() {
            bus.registers.insert(addr, data.to_vec());
        }
        Ok(())
    }

    fn read(&mut self, addr: u8, len: usize) -> Result<Vec<u8>, i32> {
        let mut bus = self.bus();
        bus.ops.push(TransportOp::Read { addr, len });
        let mut data = bus.registers.get(&addr).cloned().unwrap_or_default();
        data.resize(len, 0);
        Ok(data)
    }

    fn set_address(&mut self, offset: u32) -> Result<(), i32> {
        self.bus().ops.push(TransportOp::SetAddress(offset));
        Ok(())
    }
}

/// A coordinate source returning a fixed reading.
#[derive(Debug, Default)]
pub struct MockCoordinateSource {
    coordinate: Option<(u16, u16)>,
    reads: AtomicUsize,
}

impl MockCoordinateSource {
    /// A panel reporting `(x, y)`.
    pub fn new(x: u16, y: u16) -> Self {
        Self {
            coordinate: Some((x, y)),
            reads: AtomicUsize::new(0),
        }
    }

    /// A panel that cannot report its coordinate.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// How many times the coordinate was read.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl CoordinateSource for MockCoordinateSource {
    fn read(&self) -> Result<(u16, u16), ControllerError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.coordinate
            .ok_or_else(|| ControllerError::NotAvailable("mock panel".to_string()))
    }
}

// =============================================================================
// Synthetic catalog
// =============================================================================

/// Build one synthetic table whose register block can hold the white point
/// and the color-blind region of `layout`. The white point starts uncalibrated.
///
/// # Errors
/// Returns [`ControllerError::RegisterOutOfBounds`] if the white point of
/// `layout` does not fit the block it names, e.g. a key unlock block.
pub fn sample_table(
    name: &str,
    seed: u8,
    layout: &AscrLayout,
) -> Result<TuningTable, ControllerError> {
    let white_end = layout.white.iter().max().copied().unwrap_or(0) + 2;
    let blind_end = layout.color_blind_offset + Accessibility::COLOR_BLIND_PARAMS * 2 + 2;
    let size = white_end.max(blind_end).max(32);

    let data = |addr: u8| -> Vec<u8> {
        let mut bytes = Vec::with_capacity(size);
        bytes.push(addr);
        bytes.extend((1..size).map(|i| seed.wrapping_mul(31).wrapping_add(i as u8)));
        bytes
    };

    let mut table = TuningTable::new(
        name,
        vec![
            CommandBlock::new(vec![0xF0, 0x5A, 0x5A]),
            CommandBlock::new(data(0xEC)),
            CommandBlock::new(data(0xEB)),
            CommandBlock::new(vec![0xF0, 0xA5, 0xA5]),
        ],
    );
    layout.patch_white_point(&mut table, WhitePoint::UNCALIBRATED)?;
    Ok(table)
}

/// Build a complete catalog: every (scenario, mode) pair, tuner tables per
/// mode, accessibility profiles, both high-brightness tables and both bypass
/// tables.
///
/// # Errors
/// Whatever [`sample_table`] returns for `config.ascr`.
pub fn sample_store(config: &TunerConfig) -> Result<SequenceStore, ControllerError> {
    let layout = &config.ascr;
    let mut tables = Vec::new();
    let mut seed = 0u8;
    let mut push = |key: TableKey, name: String| -> Result<(), ControllerError> {
        seed = seed.wrapping_add(1);
        tables.push((key, sample_table(&name, seed, layout)?));
        Ok(())
    };

    for scenario in Scenario::NORMAL {
        for mode in Mode::ALL {
            push(TableKey::Tuning(scenario, mode), format!("{scenario}_{mode}"))?;
        }
    }
    for mode in Mode::ALL {
        push(TableKey::Tuner(mode), format!("dmb_{mode}"))?;
    }
    for profile in &Accessibility::ALL[1..] {
        push(
            TableKey::Accessibility(*profile),
            format!("accessibility_{}", profile.raw()),
        )?;
    }
    for level in [HbmLevel::On, HbmLevel::OnText] {
        push(TableKey::Hbm(level), format!("hbm_{}", level.raw()))?;
    }
    for bypass in [Bypass::Off, Bypass::On] {
        push(TableKey::Bypass(bypass), format!("bypass_{}", bypass.raw()))?;
    }

    Ok(SequenceStore::from_tables(tables))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CommandSlot;

    #[test]
    fn test_sample_table_starts_uncalibrated() {
        let layout = AscrLayout::default();
        let table = sample_table("ui_auto", 3, &layout).unwrap();
        assert!(table.validate().is_ok());
        assert!(layout.white_point(&table).unwrap().is_uncalibrated());
    }

    #[test]
    fn test_sample_table_reports_register_outside_block() {
        let layout = AscrLayout {
            slot: CommandSlot::Level1KeyUnlock,
            ..AscrLayout::default()
        };
        assert!(matches!(
            sample_table("ui_auto", 3, &layout),
            Err(ControllerError::RegisterOutOfBounds { slot: 0, .. })
        ));

        let config = TunerConfig {
            ascr: layout,
            ..TunerConfig::default()
        };
        assert!(sample_store(&config).is_err());
    }
}
