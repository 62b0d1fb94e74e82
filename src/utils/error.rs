// src/utils/error.rs
use thiserror::Error;

// Errors raised while reading a UI snapshot. Always local: callers skip the
// offending node (or the whole snapshot) instead of aborting a collection run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("Malformed bounds encoding: {0:?}")]
    RectParse(String),

    #[error("UI hierarchy XML could not be parsed: {0}")]
    TreeParse(String),

    #[error("UI hierarchy snapshot is empty")]
    EmptyTree,
}

// Errors from the device driver (adb or any other automation backend)
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Device command `{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("I/O error talking to device: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected device output: {0}")]
    UnexpectedOutput(String),

    #[error("Operation not supported by this device: {0}")]
    Unsupported(&'static str),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// Errors that abort a category collection run
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Device interaction failed: {0}")]
    Device(#[from] DeviceError),

    #[error("Could not return to the result list after visiting {merchant:?} (last page state: {last_state})")]
    NavigationFailure { merchant: String, last_state: String },

    #[error("Device reported an unusable screen size {width}x{height}")]
    InvalidScreen { width: i32, height: i32 },

    #[error("Could not store a collected record: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Device interaction failed: {0}")]
    Device(#[from] DeviceError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Collection aborted: {0}")]
    Collection(#[from] CollectError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
