//! Ambient color register (ASCR) access.
//!
//! The white point lives at fixed byte positions inside one command block of
//! every table. Depending on the chip, each channel is either a full byte or an
//! 8-bit field shifted inside a big-endian 16-bit word. All reads and writes of
//! the sub-field go through [`AscrLayout`].

use crate::error::ControllerError;
use crate::table::{CommandSlot, TuningTable};

use std::fmt;

/// A white point as written to the ambient color register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WhitePoint {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl WhitePoint {
    /// Marks a table that was never color corrected.
    pub const UNCALIBRATED: WhitePoint = WhitePoint::new(0xFF, 0xFF, 0xFF);

    /// Create a white point.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Whether this is the uncalibrated sentinel.
    pub fn is_uncalibrated(&self) -> bool {
        *self == Self::UNCALIBRATED
    }
}

impl Default for WhitePoint {
    fn default() -> Self {
        Self::UNCALIBRATED
    }
}

impl fmt::Display for WhitePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.r, self.g, self.b)
    }
}

/// Physical encoding of one register channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AscrEncoding {
    /// Each channel is one independent byte.
    Byte,
    /// Each channel is an 8-bit field shifted left by the given amount (at
    /// most 8) inside the big-endian word starting at its position.
    BitShift(u8),
}

impl AscrEncoding {
    /// Number of bytes a channel at one position touches.
    fn width(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::BitShift(_) => 2,
        }
    }

    fn store(self, sequence: &mut [u8], pos: usize, value: u8) {
        match self {
            Self::Byte => sequence[pos] = value,
            Self::BitShift(shift) => {
                let shift = shift.min(8);
                let word = u32::from(u16::from_be_bytes([sequence[pos], sequence[pos + 1]]));
                let mask = 0xFFu32 << shift;
                let word = ((word & !mask) | (u32::from(value) << shift)) as u16;
                sequence[pos..pos + 2].copy_from_slice(&word.to_be_bytes());
            }
        }
    }

    fn read(self, sequence: &[u8], pos: usize) -> u8 {
        match self {
            Self::Byte => sequence[pos],
            Self::BitShift(shift) => {
                let word = u16::from_be_bytes([sequence[pos], sequence[pos + 1]]);
                (word >> shift.min(8)) as u8
            }
        }
    }
}

/// Where the ambient color register lives inside a table and how it is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AscrLayout {
    /// Command block holding the register.
    pub slot: CommandSlot,
    /// Channel encoding, fixed per chip.
    pub encoding: AscrEncoding,
    /// Positions of the red, green and blue white-point channels.
    pub white: [usize; 3],
    /// Position of the first color-blind compensation byte.
    pub color_blind_offset: usize,
}

impl Default for AscrLayout {
    fn default() -> Self {
        Self {
            slot: CommandSlot::Cmd1,
            encoding: AscrEncoding::Byte,
            white: [19, 21, 23],
            color_blind_offset: 1,
        }
    }
}

impl AscrLayout {
    fn check(&self, table: &TuningTable, pos: usize) -> Result<(), ControllerError> {
        let slot = self.slot.index();
        let size = table.block(slot).map_or(0, |block| block.size());
        if pos + self.encoding.width() > size {
            return Err(ControllerError::RegisterOutOfBounds {
                table: table.name().to_string(),
                slot,
                pos,
            });
        }
        Ok(())
    }

    /// Read one register channel at `pos`.
    ///
    /// # Errors
    /// Returns [`ControllerError::RegisterOutOfBounds`] if `pos` does not fit the block.
    pub fn read(&self, table: &TuningTable, pos: usize) -> Result<u8, ControllerError> {
        self.check(table, pos)?;
        let block = &table.blocks()[self.slot.index()];
        Ok(self.encoding.read(block.sequence(), pos))
    }

    /// Write one register channel at `pos`, leaving every other bit untouched.
    ///
    /// # Errors
    /// Returns [`ControllerError::RegisterOutOfBounds`] if `pos` does not fit the block.
    pub fn store(&self, table: &mut TuningTable, pos: usize, value: u8) -> Result<(), ControllerError> {
        self.check(table, pos)?;
        let encoding = self.encoding;
        if let Some(block) = table.block_mut(self.slot.index()) {
            encoding.store(block.sequence_mut(), pos, value);
        }
        Ok(())
    }

    /// Read the white point of a table.
    ///
    /// # Errors
    /// Returns [`ControllerError::RegisterOutOfBounds`] if the register does not fit.
    pub fn white_point(&self, table: &TuningTable) -> Result<WhitePoint, ControllerError> {
        let [r, g, b] = self.white;
        Ok(WhitePoint::new(
            self.read(table, r)?,
            self.read(table, g)?,
            self.read(table, b)?,
        ))
    }

    /// Overwrite the white point of a table.
    ///
    /// All three positions are checked before any byte changes.
    ///
    /// # Errors
    /// Returns [`ControllerError::RegisterOutOfBounds`] if the register does not fit.
    pub fn patch_white_point(
        &self,
        table: &mut TuningTable,
        white: WhitePoint,
    ) -> Result<(), ControllerError> {
        for pos in self.white {
            self.check(table, pos)?;
        }
        let [r, g, b] = self.white;
        self.store(table, r, white.r)?;
        self.store(table, g, white.g)?;
        self.store(table, b, white.b)
    }

    /// Overwrite the white point only if it is still the uncalibrated
    /// sentinel. Returns whether the table changed.
    ///
    /// # Errors
    /// Returns [`ControllerError::RegisterOutOfBounds`] if the register does not fit.
    pub fn patch_uncalibrated(
        &self,
        table: &mut TuningTable,
        white: WhitePoint,
    ) -> Result<bool, ControllerError> {
        if !self.white_point(table)?.is_uncalibrated() {
            return Ok(false);
        }
        self.patch_white_point(table, white)?;
        Ok(true)
    }

    /// Write color-blind compensation parameters, low byte then high byte,
    /// two positions per parameter.
    ///
    /// # Errors
    /// Returns [`ControllerError::RegisterOutOfBounds`] if the region does not
    /// fit; nothing is written in that case.
    pub fn store_color_blind(
        &self,
        table: &mut TuningTable,
        params: &[u16],
    ) -> Result<(), ControllerError> {
        if let Some(last) = (params.len() * 2).checked_sub(1) {
            self.check(table, self.color_blind_offset + last)?;
        }
        for (i, param) in params.iter().enumerate() {
            let [lsb, msb] = param.to_le_bytes();
            let pos = self.color_blind_offset + i * 2;
            self.store(table, pos, lsb)?;
            self.store(table, pos + 1, msb)?;
        }
        Ok(())
    }
}
