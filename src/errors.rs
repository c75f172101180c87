//! NES errors
//!
//! All errors the emulator core can produce

use thiserror::Error;

/// NES error type
///
/// All NES errors are encapsuled inside this error type
#[derive(Debug, Error)]
pub enum NesError {
    #[error("NES can't run without a cartridge!")]
    NoCartridgeInserted,

    #[error("cartridge error: {0}")]
    Cartridge(#[from] CartridgeError),
}

/// Cartridge loading errors
#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("game file {0:?} not found")]
    FileNotFound(String),

    #[error("invalid iNES header: {details}")]
    InvalidHeader { details: String },

    #[error("mapper {0} is not supported")]
    MapperNotSupported(u8),

    #[error("cartridge has more data than the header declares")]
    TrailingData,

    #[error("failed reading cartridge data")]
    Io(#[from] std::io::Error),
}
