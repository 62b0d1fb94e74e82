// src/device/mod.rs
//! The device the collector drives. Input primitives return no confirmation;
//! callers re-read the UI tree to see whether an action took effect.

pub mod adb;

use crate::tree::{Point, ScreenSize};
use crate::utils::error::DeviceError;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub use adb::AdbDevice;

#[async_trait]
pub trait Device: Send {
    /// Current accessibility hierarchy as XML, or `None` when the device had
    /// nothing to report (e.g. the UI never went idle).
    async fn ui_tree(&mut self) -> Result<Option<String>, DeviceError>;

    async fn tap(&mut self, point: Point) -> Result<(), DeviceError>;

    async fn swipe(&mut self, from: Point, to: Point, duration: Duration) -> Result<(), DeviceError>;

    /// System back navigation.
    async fn back(&mut self) -> Result<(), DeviceError>;

    async fn screen_size(&mut self) -> Result<ScreenSize, DeviceError>;

    /// Writes a PNG of the current screen.
    async fn screenshot(&mut self, _path: &Path) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("screenshot"))
    }
}
