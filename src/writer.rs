//! Serialises tables onto the transport.

use crate::error::ControllerError;
use crate::table::{CommandSlot, TuningTable};
use crate::transport::{Transport, TransportMode};

use log::{error, trace};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Owns the transport and serialises every access to it.
///
/// The transport lock is held for a whole table, so blocks of two tables are
/// never interleaved on the bus.
pub struct TableWriter {
    transport: Mutex<Box<dyn Transport>>,
    mode: TransportMode,
}

impl TableWriter {
    /// Wrap a transport.
    pub fn new(transport: Box<dyn Transport>, mode: TransportMode) -> Self {
        Self {
            transport: Mutex::new(transport),
            mode,
        }
    }

    /// The write discipline in use.
    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Transport>> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write a table.
    ///
    /// The table is validated before the transport is touched; a table with an
    /// empty block causes no transport call at all. The first transport failure
    /// aborts the write and is returned as is; blocks sent before it stay on
    /// the chip.
    ///
    /// # Errors
    /// - [`ControllerError::InvalidSequence`] if a block is empty or missing
    /// - [`ControllerError::Transport`] if the transport fails
    pub fn write(&self, table: &TuningTable) -> Result<(), ControllerError> {
        self.write_then(table, || ())
    }

    /// Write a table and run `on_written` before the transport lock is
    /// released.
    ///
    /// `on_written` runs only if every block was sent. Anything it records
    /// is ordered exactly like the writes on the bus.
    ///
    /// # Errors
    /// Same as [`TableWriter::write`].
    pub fn write_then<R>(
        &self,
        table: &TuningTable,
        on_written: impl FnOnce() -> R,
    ) -> Result<R, ControllerError> {
        if let Err(e) = table.validate() {
            error!("{}", e);
            return Err(e);
        }

        let mut transport = self.lock();
        let result = match self.mode {
            TransportMode::Sequential => table
                .blocks()
                .iter()
                .try_for_each(|block| send(&mut **transport, block.sequence())),
            TransportMode::TwoPhase {
                cmd1_offset,
                cmd2_offset,
            } => [
                (cmd1_offset, CommandSlot::Cmd1),
                (cmd2_offset, CommandSlot::Cmd2),
            ]
            .into_iter()
            .try_for_each(|(offset, slot)| {
                transport.set_address(offset)?;
                send(&mut **transport, table.blocks()[slot.index()].sequence())
            }),
        };

        match result {
            Ok(()) => Ok(on_written()),
            Err(code) => {
                error!("failed to write {} (error code: {})", table.name(), code);
                Err(ControllerError::Transport(code))
            }
        }
    }

    /// Read the tuning blocks of `table` back from the chip and compare them
    /// with what the table says.
    ///
    /// The register key is unlocked around the reads using the table's own
    /// unlock and lock blocks.
    ///
    /// # Errors
    /// - [`ControllerError::InvalidSequence`] if a block is empty or missing
    /// - [`ControllerError::Transport`] if the transport fails
    pub fn readback(&self, table: &TuningTable) -> Result<RegisterDump, ControllerError> {
        table.validate()?;
        let block = move |slot: CommandSlot| table.blocks()[slot.index()].sequence();

        let mut transport = self.lock();
        let mut blocks = Vec::with_capacity(2);

        send(&mut **transport, block(CommandSlot::Level1KeyUnlock))
            .map_err(ControllerError::Transport)?;

        for slot in [CommandSlot::Cmd1, CommandSlot::Cmd2] {
            if let TransportMode::TwoPhase {
                cmd1_offset,
                cmd2_offset,
            } = self.mode
            {
                let offset = if slot == CommandSlot::Cmd1 {
                    cmd1_offset
                } else {
                    cmd2_offset
                };
                transport
                    .set_address(offset)
                    .map_err(ControllerError::Transport)?;
            }

            let (&addr, expected) = block(slot)
                .split_first()
                .ok_or_else(|| ControllerError::InvalidSequence {
                    table: table.name().to_string(),
                    slot: slot.index(),
                })?;
            let actual = transport
                .read(addr, expected.len())
                .map_err(ControllerError::Transport)?;

            let registers = expected
                .iter()
                .enumerate()
                .map(|(i, &expected)| RegisterEntry {
                    index: i + 1,
                    expected,
                    actual: actual.get(i).copied(),
                })
                .collect();
            blocks.push(RegisterBlock { addr, registers });
        }

        send(&mut **transport, block(CommandSlot::Level1KeyLock))
            .map_err(ControllerError::Transport)?;

        Ok(RegisterDump {
            table: table.name().to_string(),
            blocks,
        })
    }
}

fn send(transport: &mut dyn Transport, sequence: &[u8]) -> Result<(), i32> {
    trace!("write {} bytes: {:02x?}", sequence.len(), sequence);
    transport.write(sequence)
}

// =============================================================================
// Register dump
// =============================================================================

/// One register compared against its table value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterEntry {
    /// 1-based position inside the block.
    pub index: usize,
    /// Byte the table holds.
    pub expected: u8,
    /// Byte read from the chip; `None` if the read came back short.
    pub actual: Option<u8>,
}

impl RegisterEntry {
    /// Whether chip and table agree.
    pub fn matches(&self) -> bool {
        self.actual == Some(self.expected)
    }
}

/// Registers of one tuning block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterBlock {
    /// Register address the block starts at.
    pub addr: u8,
    /// Compared registers.
    pub registers: Vec<RegisterEntry>,
}

/// Readback of the tuning blocks of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterDump {
    /// Name of the table compared against.
    pub table: String,
    /// Compared blocks, first tuning block first.
    pub blocks: Vec<RegisterBlock>,
}

impl RegisterDump {
    /// Entries where chip and table disagree.
    pub fn mismatches(&self) -> impl Iterator<Item = &RegisterEntry> {
        self.blocks
            .iter()
            .flat_map(|block| &block.registers)
            .filter(|entry| !entry.matches())
    }
}

impl fmt::Display for RegisterDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+ {}", self.table)?;
        for entry in self.blocks.iter().flat_map(|block| &block.registers) {
            write!(f, "{:3}:\t0x{:02x}\t", entry.index, entry.expected)?;
            match entry.actual {
                Some(actual) => write!(f, "0x{actual:02x}")?,
                None => write!(f, "----")?,
            }
            if !entry.matches() {
                write!(f, "\t(X)")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "- {}", self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockTransport, TransportOp, sample_table};
    use crate::ascr::AscrLayout;
    use crate::table::CommandBlock;

    fn table() -> TuningTable {
        sample_table("ui_standard", 7, &AscrLayout::default()).unwrap()
    }

    #[test]
    fn test_sequential_writes_every_block_in_order() {
        let mock = MockTransport::new();
        let writer = TableWriter::new(Box::new(mock.clone()), TransportMode::Sequential);
        let table = table();

        writer.write(&table).unwrap();

        let expected: Vec<Vec<u8>> = table
            .blocks()
            .iter()
            .map(|b| b.sequence().to_vec())
            .collect();
        assert_eq!(mock.writes(), expected);
    }

    #[test]
    fn test_two_phase_selects_address_before_each_tuning_block() {
        let mock = MockTransport::new();
        let writer = TableWriter::new(
            Box::new(mock.clone()),
            TransportMode::TwoPhase {
                cmd1_offset: 0x10,
                cmd2_offset: 0x20,
            },
        );
        let table = table();

        writer.write(&table).unwrap();

        assert_eq!(
            mock.ops(),
            vec![
                TransportOp::SetAddress(0x10),
                TransportOp::Write(table.blocks()[1].sequence().to_vec()),
                TransportOp::SetAddress(0x20),
                TransportOp::Write(table.blocks()[2].sequence().to_vec()),
            ]
        );
    }

    #[test]
    fn test_empty_block_means_zero_transport_calls() {
        let mock = MockTransport::new();
        let writer = TableWriter::new(Box::new(mock.clone()), TransportMode::Sequential);
        let mut blocks = table().blocks().to_vec();
        blocks[2] = CommandBlock::default();
        let broken = TuningTable::new("broken", blocks);

        let result = writer.write(&broken);

        assert!(matches!(
            result,
            Err(ControllerError::InvalidSequence { ref table, slot: 2 }) if table == "broken"
        ));
        assert!(mock.ops().is_empty());
    }

    #[test]
    fn test_write_then_runs_only_after_a_complete_write() {
        let mock = MockTransport::new();
        let writer = TableWriter::new(Box::new(mock.clone()), TransportMode::Sequential);
        let table = table();

        let sent = writer.write_then(&table, || mock.writes().len()).unwrap();
        assert_eq!(sent, table.blocks().len());

        mock.fail_write(3, -5);
        let mut ran = false;
        let result = writer.write_then(&table, || ran = true);
        assert!(matches!(result, Err(ControllerError::Transport(-5))));
        assert!(!ran);
    }

    #[test]
    fn test_transport_failure_stops_the_write() {
        let mock = MockTransport::new();
        let writer = TableWriter::new(Box::new(mock.clone()), TransportMode::Sequential);
        mock.fail_write(1, -5);

        let result = writer.write(&table());

        assert!(matches!(result, Err(ControllerError::Transport(-5))));
        assert_eq!(mock.writes().len(), 1);
    }

    #[test]
    fn test_readback_matches_after_write() {
        let mock = MockTransport::new();
        let writer = TableWriter::new(Box::new(mock.clone()), TransportMode::Sequential);
        let table = table();
        writer.write(&table).unwrap();
        mock.clear();

        let dump = writer.readback(&table).unwrap();

        assert_eq!(dump.blocks.len(), 2);
        assert_eq!(dump.blocks[0].addr, 0xEC);
        assert_eq!(dump.blocks[1].addr, 0xEB);
        assert_eq!(dump.mismatches().count(), 0);
        assert_eq!(
            mock.ops().first(),
            Some(&TransportOp::Write(table.blocks()[0].sequence().to_vec()))
        );
        assert_eq!(
            mock.ops().last(),
            Some(&TransportOp::Write(table.blocks()[3].sequence().to_vec()))
        );
    }

    #[test]
    fn test_readback_flags_mismatch() {
        let mock = MockTransport::new();
        let writer = TableWriter::new(Box::new(mock.clone()), TransportMode::Sequential);
        let table = table();
        writer.write(&table).unwrap();
        let original = table.blocks()[1].sequence()[3];
        mock.poke(0xEC, 2, original.wrapping_add(1));

        let dump = writer.readback(&table).unwrap();

        let bad: Vec<_> = dump.mismatches().collect();
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].index, 3);
        let text = dump.to_string();
        assert!(text.starts_with("+ ui_standard\n"));
        assert!(text.ends_with("- ui_standard\n"));
        assert_eq!(text.matches("(X)").count(), 1);
    }
}
