// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Linux sysfs GPIO winch controller.
//!
//! Motor relays are driven through two outputs. Sensor inputs are sampled
//! by a polling thread that reports level changes; the rotation input
//! reports debounced falling edges.
//!
//! Pin levels: slack reads high, docked and out-of-line read low.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use winch_core::{Controller, ControllerInfo, DynResult, RotationCallback, SensorCallback};

use crate::GpioPins;

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const ROTATION_DEBOUNCE: Duration = Duration::from_millis(100);

/// Thin wrapper over `/sys/class/gpio`.
#[derive(Debug, Clone)]
struct Sysfs {
    root: PathBuf,
}

impl Sysfs {
    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{}", pin))
    }

    fn export(&self, pin: u32) -> io::Result<()> {
        if self.pin_dir(pin).exists() {
            return Ok(());
        }
        fs::write(self.root.join("export"), pin.to_string())
    }

    fn set_direction(&self, pin: u32, direction: &str) -> io::Result<()> {
        fs::write(self.pin_dir(pin).join("direction"), direction)
    }

    fn write(&self, pin: u32, high: bool) -> io::Result<()> {
        fs::write(self.pin_dir(pin).join("value"), if high { "1" } else { "0" })
    }

    fn read(&self, pin: u32) -> io::Result<bool> {
        let raw = fs::read_to_string(self.pin_dir(pin).join("value"))?;
        Ok(raw.trim() == "1")
    }
}

#[derive(Default)]
struct Callbacks {
    slack: Option<SensorCallback>,
    dock: Option<SensorCallback>,
    line: Option<SensorCallback>,
    rotation: Option<RotationCallback>,
}

fn lock(callbacks: &Mutex<Callbacks>) -> MutexGuard<'_, Callbacks> {
    callbacks.lock().unwrap_or_else(|e| e.into_inner())
}

/// Sensor levels translated to their logical meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Levels {
    slack: bool,
    docked: bool,
    out_of_line: bool,
    rotation_pin: bool,
}

impl Levels {
    fn sample(sysfs: &Sysfs, pins: &GpioPins) -> io::Result<Self> {
        Ok(Self {
            slack: sysfs.read(pins.slack)?,
            docked: !sysfs.read(pins.dock)?,
            out_of_line: !sysfs.read(pins.line)?,
            rotation_pin: sysfs.read(pins.rotation)?,
        })
    }
}

pub struct GpioController {
    info: ControllerInfo,
    sysfs: Sysfs,
    pins: GpioPins,
    callbacks: Arc<Mutex<Callbacks>>,
    running: Arc<AtomicBool>,
    poller: Option<JoinHandle<()>>,
}

impl GpioController {
    pub fn new(sysfs_root: PathBuf, pins: GpioPins) -> DynResult<Self> {
        let sysfs = Sysfs { root: sysfs_root };
        for pin in [pins.up, pins.down] {
            sysfs.export(pin)?;
            sysfs.set_direction(pin, "out")?;
            sysfs.write(pin, false)?;
        }
        for pin in [pins.slack, pins.dock, pins.line, pins.rotation] {
            sysfs.export(pin)?;
            sysfs.set_direction(pin, "in")?;
        }

        let callbacks = Arc::new(Mutex::new(Callbacks::default()));
        let running = Arc::new(AtomicBool::new(true));
        let initial = Levels::sample(&sysfs, &pins)?;
        let poller = {
            let sysfs = sysfs.clone();
            let callbacks = callbacks.clone();
            let running = running.clone();
            thread::Builder::new()
                .name("gpio-poll".to_string())
                .spawn(move || poll_inputs(sysfs, pins, callbacks, running, initial))?
        };

        info!("GPIO controller on {} ({:?})", sysfs.root.display(), pins);
        Ok(Self {
            info: ControllerInfo {
                name: "gpio".to_string(),
                description: format!("sysfs GPIO at {}", sysfs.root.display()),
            },
            sysfs,
            pins,
            callbacks,
            running,
            poller: Some(poller),
        })
    }

    /// Write both relay outputs; failures are logged since actuation has no
    /// error channel.
    fn set_outputs(&self, up_pin: bool, down_pin: bool) {
        for (pin, level) in [(self.pins.up, up_pin), (self.pins.down, down_pin)] {
            if let Err(e) = self.sysfs.write(pin, level) {
                warn!("GPIO write to pin {} failed: {}", pin, e);
            }
        }
    }

    /// Read failures are reported as `None`; callers treat that as the
    /// limit being reached.
    fn read_pin(&self, pin: u32) -> Option<bool> {
        match self.sysfs.read(pin) {
            Ok(level) => Some(level),
            Err(e) => {
                warn!("GPIO read of pin {} failed: {}", pin, e);
                None
            }
        }
    }
}

fn poll_inputs(
    sysfs: Sysfs,
    pins: GpioPins,
    callbacks: Arc<Mutex<Callbacks>>,
    running: Arc<AtomicBool>,
    mut last: Levels,
) {
    let mut last_rotation: Option<Instant> = None;
    while running.load(Ordering::Relaxed) {
        thread::sleep(POLL_INTERVAL);
        let now = match Levels::sample(&sysfs, &pins) {
            Ok(levels) => levels,
            Err(e) => {
                warn!("GPIO poll failed: {}", e);
                continue;
            }
        };

        let (slack_cb, dock_cb, line_cb, rotation_cb) = {
            let cbs = lock(&callbacks);
            (
                cbs.slack.clone(),
                cbs.dock.clone(),
                cbs.line.clone(),
                cbs.rotation.clone(),
            )
        };

        if now.slack != last.slack {
            if let Some(cb) = &slack_cb {
                cb(now.slack);
            }
        }
        if now.docked != last.docked {
            if let Some(cb) = &dock_cb {
                cb(now.docked);
            }
        }
        if now.out_of_line != last.out_of_line {
            if let Some(cb) = &line_cb {
                cb(now.out_of_line);
            }
        }
        if last.rotation_pin && !now.rotation_pin {
            let debounced = last_rotation.map_or(true, |at| at.elapsed() >= ROTATION_DEBOUNCE);
            if debounced {
                last_rotation = Some(Instant::now());
                if let Some(cb) = &rotation_cb {
                    cb();
                }
            }
        }
        last = now;
    }
}

impl Drop for GpioController {
    fn drop(&mut self) {
        self.set_outputs(false, false);
        self.running.store(false, Ordering::Relaxed);
        if let Some(poller) = self.poller.take() {
            let _ = poller.join();
        }
    }
}

impl Controller for GpioController {
    fn info(&self) -> &ControllerInfo {
        &self.info
    }

    // Relay wiring is crossed: reeling in raises the down pin.
    fn up(&mut self) {
        self.set_outputs(false, true);
    }

    fn down(&mut self) {
        self.set_outputs(true, false);
    }

    fn off(&mut self) {
        self.set_outputs(false, false);
    }

    fn has_slack(&self) -> bool {
        self.read_pin(self.pins.slack).unwrap_or(true)
    }

    fn is_docked(&self) -> bool {
        self.read_pin(self.pins.dock).map(|l| !l).unwrap_or(true)
    }

    fn is_out_of_line(&self) -> bool {
        self.read_pin(self.pins.line).map(|l| !l).unwrap_or(true)
    }

    fn set_slack_callback(&mut self, callback: SensorCallback) {
        lock(&self.callbacks).slack = Some(callback);
    }

    fn set_dock_callback(&mut self, callback: SensorCallback) {
        lock(&self.callbacks).dock = Some(callback);
    }

    fn set_line_callback(&mut self, callback: SensorCallback) {
        lock(&self.callbacks).line = Some(callback);
    }

    fn set_rotation_callback(&mut self, callback: RotationCallback) {
        lock(&self.callbacks).rotation = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;

    /// Create the files a kernel would expose for `pins` under `root`.
    fn fake_sysfs(root: &Path, pins: &GpioPins) {
        fs::create_dir_all(root).unwrap();
        fs::write(root.join("export"), "").unwrap();
        for pin in [pins.up, pins.down, pins.slack, pins.dock, pins.line, pins.rotation] {
            let dir = root.join(format!("gpio{}", pin));
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("direction"), "in").unwrap();
            fs::write(dir.join("value"), "1").unwrap();
        }
    }

    fn temp_root(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ctd-winch-gpio-{}-{}", tag, std::process::id()))
    }

    fn value(root: &Path, pin: u32) -> String {
        fs::read_to_string(root.join(format!("gpio{}", pin)).join("value")).unwrap()
    }

    fn set_value(root: &Path, pin: u32, high: bool) {
        let path = root.join(format!("gpio{}", pin)).join("value");
        fs::write(path, if high { "1" } else { "0" }).unwrap();
    }

    #[test]
    fn test_outputs_follow_drive_commands() {
        let root = temp_root("outputs");
        let pins = GpioPins::default();
        fake_sysfs(&root, &pins);

        let mut gpio = GpioController::new(root.clone(), pins).unwrap();
        assert_eq!(value(&root, pins.up), "0");
        assert_eq!(value(&root, pins.down), "0");
        assert_eq!(
            fs::read_to_string(root.join(format!("gpio{}", pins.up)).join("direction")).unwrap(),
            "out"
        );

        gpio.down();
        assert_eq!((value(&root, pins.up), value(&root, pins.down)), ("1".into(), "0".into()));
        gpio.up();
        assert_eq!((value(&root, pins.up), value(&root, pins.down)), ("0".into(), "1".into()));
        gpio.off();
        assert_eq!((value(&root, pins.up), value(&root, pins.down)), ("0".into(), "0".into()));

        drop(gpio);
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_sensor_levels() {
        let root = temp_root("levels");
        let pins = GpioPins::default();
        fake_sysfs(&root, &pins);
        let gpio = GpioController::new(root.clone(), pins).unwrap();

        assert!(gpio.has_slack());
        assert!(!gpio.is_docked());
        assert!(!gpio.is_out_of_line());

        set_value(&root, pins.slack, false);
        set_value(&root, pins.dock, false);
        assert!(!gpio.has_slack());
        assert!(gpio.is_docked());

        drop(gpio);
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_poller_reports_edges() {
        let root = temp_root("edges");
        let pins = GpioPins::default();
        fake_sysfs(&root, &pins);
        let mut gpio = GpioController::new(root.clone(), pins).unwrap();

        let docks = Arc::new(Mutex::new(Vec::new()));
        let sink = docks.clone();
        gpio.set_dock_callback(Arc::new(move |v: bool| sink.lock().unwrap().push(v)));
        let rotations = Arc::new(AtomicUsize::new(0));
        let counter = rotations.clone();
        gpio.set_rotation_callback(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        set_value(&root, pins.dock, false);
        set_value(&root, pins.rotation, false);
        thread::sleep(Duration::from_millis(50));
        set_value(&root, pins.rotation, true);
        thread::sleep(Duration::from_millis(50));

        assert_eq!(*docks.lock().unwrap(), vec![true]);
        assert_eq!(rotations.load(Ordering::SeqCst), 1);

        drop(gpio);
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_sysfs_is_error() {
        let err = GpioController::new(PathBuf::from("/nonexistent/gpio"), GpioPins::default());
        assert!(err.is_err());
    }
}
