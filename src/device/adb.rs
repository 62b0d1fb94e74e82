// src/device/adb.rs

// --- Imports ---
use crate::device::Device;
use crate::tree::{Point, ScreenSize};
use crate::utils::error::DeviceError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

// --- Constants ---
const DUMP_PATH: &str = "/sdcard/window_dump.xml";
const KEYCODE_BACK: &str = "4";
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

// "Physical size: 1080x2400" / "Override size: 720x1600"
static WM_SIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(Physical|Override) size:\s*(\d+)x(\d+)\s*$").expect("Failed to compile WM_SIZE_RE")
});

/// Talks to one Android device through the `adb` command-line tool.
#[derive(Debug, Clone)]
pub struct AdbDevice {
    serial: Option<String>,
    adb_path: String,
}

impl AdbDevice {
    /// `serial` selects the device when several are connected.
    pub fn new(serial: Option<String>) -> Self {
        Self { serial, adb_path: "adb".to_string() }
    }

    pub fn with_adb_path(mut self, adb_path: impl Into<String>) -> Self {
        self.adb_path = adb_path.into();
        self
    }

    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    /// Serials of devices in the `device` state.
    pub async fn connected_serials(adb_path: &str) -> Result<Vec<String>, DeviceError> {
        let stdout = run(Command::new(adb_path).arg("devices"), "adb devices").await?;
        Ok(parse_device_list(&String::from_utf8_lossy(&stdout)))
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.adb_path);
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.args(args);
        cmd
    }

    async fn adb(&self, args: &[&str]) -> Result<Vec<u8>, DeviceError> {
        let label = format!("adb {}", args.join(" "));
        tracing::trace!("Running `{}`", label);
        run(&mut self.command(args), &label).await
    }
}

async fn run(cmd: &mut Command, label: &str) -> Result<Vec<u8>, DeviceError> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let output = timeout(COMMAND_TIMEOUT, cmd.output())
        .await
        .map_err(|_| DeviceError::CommandFailed {
            command: label.to_string(),
            stderr: format!("timed out after {}s", COMMAND_TIMEOUT.as_secs()),
        })??;

    if !output.status.success() {
        return Err(DeviceError::CommandFailed {
            command: label.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

#[async_trait]
impl Device for AdbDevice {
    async fn ui_tree(&mut self) -> Result<Option<String>, DeviceError> {
        let dump = self.adb(&["shell", "uiautomator", "dump", DUMP_PATH]).await?;
        let dump_msg = String::from_utf8_lossy(&dump);
        if dump_msg.contains("ERROR") {
            tracing::warn!("uiautomator dump failed: {}", dump_msg.trim());
            return Ok(None);
        }

        let xml = self.adb(&["exec-out", "cat", DUMP_PATH]).await?;
        let xml = String::from_utf8_lossy(&xml).trim().to_string();
        if xml.is_empty() {
            return Ok(None);
        }
        Ok(Some(xml))
    }

    async fn tap(&mut self, point: Point) -> Result<(), DeviceError> {
        tracing::debug!("tap {}", point);
        let (x, y) = (point.x.to_string(), point.y.to_string());
        self.adb(&["shell", "input", "tap", &x, &y]).await.map(|_| ())
    }

    async fn swipe(&mut self, from: Point, to: Point, duration: Duration) -> Result<(), DeviceError> {
        tracing::debug!("swipe {} -> {} over {:?}", from, to, duration);
        let args = [
            from.x.to_string(),
            from.y.to_string(),
            to.x.to_string(),
            to.y.to_string(),
            duration.as_millis().to_string(),
        ];
        let mut full: Vec<&str> = vec!["shell", "input", "swipe"];
        full.extend(args.iter().map(String::as_str));
        self.adb(&full).await.map(|_| ())
    }

    async fn back(&mut self) -> Result<(), DeviceError> {
        tracing::debug!("back");
        self.adb(&["shell", "input", "keyevent", KEYCODE_BACK]).await.map(|_| ())
    }

    async fn screen_size(&mut self) -> Result<ScreenSize, DeviceError> {
        let out = self.adb(&["shell", "wm", "size"]).await?;
        let text = String::from_utf8_lossy(&out);
        parse_wm_size(&text).ok_or_else(|| DeviceError::UnexpectedOutput(text.trim().to_string()))
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), DeviceError> {
        let png = self.adb(&["exec-out", "screencap", "-p"]).await?;
        if png.is_empty() {
            return Err(DeviceError::UnexpectedOutput("empty screencap".to_string()));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, png).await?;
        tracing::debug!("Saved screenshot to {}", path.display());
        Ok(())
    }
}

/// Parses `wm size` output; an override size wins over the physical size.
pub fn parse_wm_size(output: &str) -> Option<ScreenSize> {
    let mut physical = None;
    let mut overridden = None;
    for caps in WM_SIZE_RE.captures_iter(output) {
        let size = ScreenSize::new(caps[2].parse().ok()?, caps[3].parse().ok()?);
        match &caps[1] {
            "Override" => overridden = Some(size),
            _ => physical = Some(size),
        }
    }
    overridden.or(physical)
}

/// Serials listed by `adb devices` in the `device` state.
pub fn parse_device_list(output: &str) -> Vec<String> {
    output
        .lines()
        .skip_while(|line| !line.starts_with("List of devices"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(serial), Some("device")) => Some(serial.to_string()),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wm_size() {
        assert_eq!(parse_wm_size("Physical size: 1080x2400\n"), Some(ScreenSize::new(1080, 2400)));
        assert_eq!(
            parse_wm_size("Physical size: 1440x3200\nOverride size: 1080x2400\n"),
            Some(ScreenSize::new(1080, 2400))
        );
        assert_eq!(parse_wm_size("error: no devices/emulators found"), None);
    }

    #[test]
    fn test_parse_device_list() {
        let out = "* daemon started successfully\nList of devices attached\nR58M123ABC\tdevice\nemulator-5554\toffline\n192.168.1.20:5555\tdevice\n\n";
        assert_eq!(
            parse_device_list(out),
            vec!["R58M123ABC".to_string(), "192.168.1.20:5555".to_string()]
        );
        assert!(parse_device_list("List of devices attached\n\n").is_empty());
    }

    #[test]
    fn test_serial_is_passed_first() {
        let device = AdbDevice::new(Some("R58M123ABC".to_string()));
        let cmd = device.command(&["shell", "wm", "size"]);
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["-s", "R58M123ABC", "shell", "wm", "size"]);
        assert_eq!(device.serial(), Some("R58M123ABC"));
    }
}
