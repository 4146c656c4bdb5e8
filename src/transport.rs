//! Bus transport used to reach the tuning chip.

/// Error code returned by transports that cannot select a target address.
pub const ENOTSUPP: i32 = -524;

/// Byte-level access to the chip.
///
/// Implementations report failures as raw negative error codes; the
/// [`TableWriter`](crate::TableWriter) wraps them into
/// [`ControllerError::Transport`](crate::ControllerError::Transport).
pub trait Transport: Send {
    /// Send one command block.
    fn write(&mut self, sequence: &[u8]) -> Result<(), i32>;

    /// Read `len` bytes starting at register `addr`.
    fn read(&mut self, addr: u8, len: usize) -> Result<Vec<u8>, i32>;

    /// Select the target address of the next write or read.
    ///
    /// Only transports driven in [`TransportMode::TwoPhase`] need this.
    fn set_address(&mut self, offset: u32) -> Result<(), i32> {
        let _ = offset;
        Err(ENOTSUPP)
    }
}

/// How a table is laid onto the transport, fixed per chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// Every command block is written in declared order.
    #[default]
    Sequential,
    /// Only the two tuning data blocks are written, each preceded by an
    /// address select.
    TwoPhase {
        /// Address selected before the first tuning block.
        cmd1_offset: u32,
        /// Address selected before the second tuning block.
        cmd2_offset: u32,
    },
}
