//! Tuning tables and the shared catalog they live in.

use crate::error::ControllerError;
use crate::modes::{Accessibility, Bypass, HbmLevel, Mode, Scenario};

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Index of a command block inside a tuning table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandSlot {
    /// Unlocks the level-1 register key.
    Level1KeyUnlock = 0,
    /// First tuning data block.
    Cmd1 = 1,
    /// Second tuning data block.
    Cmd2 = 2,
    /// Locks the level-1 register key.
    Level1KeyLock = 3,
}

impl CommandSlot {
    /// Number of command blocks every writable table carries.
    pub const COUNT: usize = 4;

    /// The block index of this slot.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One ordered byte sequence sent to the chip as a unit.
///
/// The bytes sit behind an [`Arc`] so that cloning a table shares every block
/// until one of them is patched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandBlock {
    sequence: Arc<Vec<u8>>,
}

impl CommandBlock {
    /// Create a block from raw bytes.
    pub fn new(sequence: Vec<u8>) -> Self {
        Self {
            sequence: Arc::new(sequence),
        }
    }

    /// The bytes of this block.
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    /// Mutable access to the bytes; copies them first if they are shared.
    pub fn sequence_mut(&mut self) -> &mut Vec<u8> {
        Arc::make_mut(&mut self.sequence)
    }

    /// Length of the sequence in bytes.
    pub fn size(&self) -> usize {
        self.sequence.len()
    }

    /// Whether the block has no bytes and must not be written.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Whether two blocks share the same underlying buffer.
    pub fn shares_buffer(&self, other: &CommandBlock) -> bool {
        Arc::ptr_eq(&self.sequence, &other.sequence)
    }
}

/// A named set of command blocks encoding one full display configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuningTable {
    name: String,
    tune: Vec<CommandBlock>,
}

impl TuningTable {
    /// Create a table from its name and blocks in write order.
    pub fn new(name: impl Into<String>, tune: Vec<CommandBlock>) -> Self {
        Self {
            name: name.into(),
            tune,
        }
    }

    /// Name of the table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All blocks in declared order.
    pub fn blocks(&self) -> &[CommandBlock] {
        &self.tune
    }

    /// Block stored in `slot`, if present.
    pub fn block(&self, slot: usize) -> Option<&CommandBlock> {
        self.tune.get(slot)
    }

    /// Mutable block stored in `slot`, if present.
    pub fn block_mut(&mut self, slot: usize) -> Option<&mut CommandBlock> {
        self.tune.get_mut(slot)
    }

    /// Check that every command slot is present and non-empty.
    ///
    /// # Errors
    /// Returns [`ControllerError::InvalidSequence`] naming the first bad slot.
    pub fn validate(&self) -> Result<(), ControllerError> {
        let slots = self.tune.len().max(CommandSlot::COUNT);
        for slot in 0..slots {
            if self.tune.get(slot).is_none_or(CommandBlock::is_empty) {
                return Err(ControllerError::InvalidSequence {
                    table: self.name.clone(),
                    slot,
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Catalog keys
// =============================================================================

/// Address of a table inside the [`SequenceStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKey {
    /// Regular table indexed by scenario and mode.
    Tuning(Scenario, Mode),
    /// Broadcast tuner table indexed by mode.
    Tuner(Mode),
    /// Accessibility profile table.
    Accessibility(Accessibility),
    /// High-brightness table.
    Hbm(HbmLevel),
    /// Bypass table.
    Bypass(Bypass),
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tuning(scenario, mode) => write!(f, "tuning[{scenario}][{mode}]"),
            Self::Tuner(mode) => write!(f, "dmb[{mode}]"),
            Self::Accessibility(a) => write!(f, "accessibility[{}]", a.raw()),
            Self::Hbm(level) => write!(f, "hbm[{}]", level.raw()),
            Self::Bypass(bypass) => write!(f, "bypass[{}]", bypass.raw()),
        }
    }
}

// =============================================================================
// SequenceStore
// =============================================================================

/// The catalog of tuning tables shared by every controller of a chip.
///
/// Lookups hand out [`Arc`] handles that stay valid after the internal lock is
/// released. Mutation goes through [`SequenceStore::update`], which copies a
/// table that is still referenced by an in-flight write instead of changing it
/// underneath the writer.
#[derive(Debug, Default)]
pub struct SequenceStore {
    tables: RwLock<HashMap<TableKey, Arc<TuningTable>>>,
}

impl SequenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from `(key, table)` pairs.
    pub fn from_tables(tables: impl IntoIterator<Item = (TableKey, TuningTable)>) -> Self {
        let tables = tables
            .into_iter()
            .map(|(key, table)| (key, Arc::new(table)))
            .collect();
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Add or replace a table.
    pub fn insert(&self, key: TableKey, table: TuningTable) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::new(table));
    }

    /// Look up a table.
    pub fn get(&self, key: TableKey) -> Option<Arc<TuningTable>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    /// Number of tables in the catalog.
    pub fn len(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Patch a table in place.
    ///
    /// # Errors
    /// Returns [`ControllerError::TableNotFound`] if the key is absent, or the
    /// error produced by `patch`.
    pub fn update<R>(
        &self,
        key: TableKey,
        patch: impl FnOnce(&mut TuningTable) -> Result<R, ControllerError>,
    ) -> Result<R, ControllerError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let table = tables
            .get_mut(&key)
            .ok_or(ControllerError::TableNotFound(key))?;
        patch(Arc::make_mut(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> TuningTable {
        TuningTable::new(
            name,
            vec![
                CommandBlock::new(vec![0xF0, 0x5A, 0x5A]),
                CommandBlock::new(vec![0xEC, 0x01, 0x02]),
                CommandBlock::new(vec![0xEB, 0x03]),
                CommandBlock::new(vec![0xF0, 0xA5, 0xA5]),
            ],
        )
    }

    #[test]
    fn test_validate_rejects_empty_block() {
        let mut t = table("ui_standard");
        assert!(t.validate().is_ok());

        t.tune[2] = CommandBlock::default();
        assert!(matches!(
            t.validate(),
            Err(ControllerError::InvalidSequence { slot: 2, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_missing_slot() {
        let mut t = table("short");
        t.tune.truncate(3);
        assert!(matches!(
            t.validate(),
            Err(ControllerError::InvalidSequence { slot: 3, .. })
        ));
    }

    #[test]
    fn test_clone_shares_blocks_until_patched() {
        let original = table("browser_auto");
        let mut copy = original.clone();
        assert!(copy.tune[1].shares_buffer(&original.tune[1]));

        copy.block_mut(1).unwrap().sequence_mut()[1] = 0x7F;
        assert!(!copy.tune[1].shares_buffer(&original.tune[1]));
        assert!(copy.tune[2].shares_buffer(&original.tune[2]));
        assert_eq!(original.tune[1].sequence(), &[0xEC, 0x01, 0x02]);
    }

    #[test]
    fn test_store_update_leaves_outstanding_handles_alone() {
        let key = TableKey::Tuning(Scenario::Ui, Mode::Standard);
        let store = SequenceStore::from_tables([(key, table("ui_standard"))]);

        let before = store.get(key).unwrap();
        store
            .update(key, |t| {
                t.block_mut(1).unwrap().sequence_mut()[1] = 0x55;
                Ok(())
            })
            .unwrap();

        assert_eq!(before.blocks()[1].sequence()[1], 0x01);
        assert_eq!(store.get(key).unwrap().blocks()[1].sequence()[1], 0x55);
    }

    #[test]
    fn test_store_update_missing_key() {
        let store = SequenceStore::new();
        let result = store.update(TableKey::Bypass(Bypass::On), |_| Ok(()));
        assert!(matches!(result, Err(ControllerError::TableNotFound(_))));
    }
}
