//! Error types for the mDNIe tuning controller.

use crate::table::TableKey;

/// Errors that can occur when selecting or writing tuning tables.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// A setter value was outside the range it accepts.
    #[error("Invalid {what} value {value} (expected {min}-{max})")]
    InvalidArgument {
        /// What was being set.
        what: &'static str,
        /// The rejected value.
        value: i64,
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
    },

    /// A command block of a table is empty and the table cannot be written.
    #[error("mdnie sequence {table} is null (command slot {slot})")]
    InvalidSequence {
        /// Name of the offending table.
        table: String,
        /// Index of the empty command block.
        slot: usize,
    },

    /// The catalog holds no table for the requested key.
    #[error("No tuning table for {0}")]
    TableNotFound(TableKey),

    /// The panel coordinate source could not be read.
    #[error("Panel coordinate not available: {0}")]
    NotAvailable(String),

    /// The transport reported a failure.
    #[error("Transport failure (error code: {0})")]
    Transport(i32),

    /// Writes are gated off because the display is powered down.
    #[error("mdnie state is off")]
    Disabled,

    /// The controller was unregistered and accepts no further operations.
    #[error("Controller is unregistered")]
    Unregistered,

    /// The calibration diagnostic was requested before the calibration pass ran.
    #[error("Panel calibration has not run yet")]
    CalibrationPending,

    /// An ambient color register position lies outside its command block.
    #[error("Register position {pos} outside command slot {slot} of {table}")]
    RegisterOutOfBounds {
        /// Name of the table.
        table: String,
        /// Index of the command block.
        slot: usize,
        /// Byte position that was addressed.
        pos: usize,
    },

    /// Textual attribute input could not be parsed.
    #[error("Failed to parse {attr} input {input:?}")]
    Parse {
        /// The attribute being stored.
        attr: &'static str,
        /// The raw input.
        input: String,
    },

    /// The attribute is write-only.
    #[error("Attribute {0} is not readable")]
    NotReadable(&'static str),

    /// The attribute is read-only.
    #[error("Attribute {0} is not writable")]
    NotWritable(&'static str),
}
