// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Simulated winch drum for development and testing.
//!
//! Holds the line position in memory. The dock sensor trips at zero line
//! out and the out-of-line sensor at `line_length`. An optional drum thread
//! turns the drum once per `rotation_period` while it is driven; slack is
//! injected through a [`SimulatedHandle`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info};

use winch_core::{
    Controller, ControllerInfo, Direction, DynResult, RotationCallback, SensorCallback,
};

#[derive(Default)]
struct SimDrum {
    direction: Direction,
    line_out: i64,
    line_length: i64,
    slack: bool,
    slack_cb: Option<SensorCallback>,
    dock_cb: Option<SensorCallback>,
    line_cb: Option<SensorCallback>,
    rotation_cb: Option<RotationCallback>,
}

impl SimDrum {
    fn docked(&self) -> bool {
        self.line_out <= 0
    }

    fn out_of_line(&self) -> bool {
        self.line_out >= self.line_length
    }
}

fn lock(drum: &Mutex<SimDrum>) -> MutexGuard<'_, SimDrum> {
    drum.lock().unwrap_or_else(|e| e.into_inner())
}

/// Cloneable access to a simulated drum from outside the control loop.
#[derive(Clone)]
pub struct SimulatedHandle {
    drum: Arc<Mutex<SimDrum>>,
}

impl SimulatedHandle {
    /// Turn the drum one rotation in the driven direction.
    /// Returns false when the drum is idle or held by a limit.
    pub fn rotate(&self) -> bool {
        let mut fired: Vec<(SensorCallback, bool)> = Vec::new();
        let rotation_cb = {
            let mut drum = lock(&self.drum);
            let was_docked = drum.docked();
            let was_out = drum.out_of_line();
            let direction = drum.direction;
            match direction {
                Direction::Down if !was_out => drum.line_out += 1,
                Direction::Up if !was_docked => drum.line_out -= 1,
                _ => return false,
            }
            if drum.docked() != was_docked {
                if let Some(cb) = drum.dock_cb.clone() {
                    fired.push((cb, drum.docked()));
                }
            }
            if drum.out_of_line() != was_out {
                if let Some(cb) = drum.line_cb.clone() {
                    fired.push((cb, drum.out_of_line()));
                }
            }
            drum.rotation_cb.clone()
        };

        if let Some(cb) = rotation_cb {
            cb();
        }
        for (cb, level) in fired {
            cb(level);
        }
        true
    }

    pub fn set_slack(&self, slack: bool) {
        let cb = {
            let mut drum = lock(&self.drum);
            if drum.slack == slack {
                return;
            }
            drum.slack = slack;
            drum.slack_cb.clone()
        };
        debug!("Simulated slack -> {}", slack);
        if let Some(cb) = cb {
            cb(slack);
        }
    }

    pub fn line_out(&self) -> i64 {
        lock(&self.drum).line_out
    }

    pub fn direction(&self) -> Direction {
        lock(&self.drum).direction
    }
}

pub struct SimulatedController {
    info: ControllerInfo,
    handle: SimulatedHandle,
    running: Arc<AtomicBool>,
    drum_thread: Option<JoinHandle<()>>,
}

impl SimulatedController {
    pub fn new(rotation_period: Duration, line_length: i64) -> DynResult<Self> {
        if line_length <= 0 {
            return Err(format!("line length must be positive, got {}", line_length).into());
        }
        let handle = SimulatedHandle {
            drum: Arc::new(Mutex::new(SimDrum {
                line_length,
                ..SimDrum::default()
            })),
        };
        let running = Arc::new(AtomicBool::new(true));

        let drum_thread = if rotation_period.is_zero() {
            None
        } else {
            let handle = handle.clone();
            let running = running.clone();
            let spawned = thread::Builder::new()
                .name("sim-drum".to_string())
                .spawn(move || {
                    while running.load(Ordering::Relaxed) {
                        thread::sleep(rotation_period);
                        handle.rotate();
                    }
                })?;
            Some(spawned)
        };

        info!(
            "Simulated drum: {} rotations of line, {:?} per rotation",
            line_length, rotation_period
        );
        Ok(Self {
            info: ControllerInfo {
                name: "simulated".to_string(),
                description: "In-memory drum".to_string(),
            },
            handle,
            running,
            drum_thread,
        })
    }

    pub fn handle(&self) -> SimulatedHandle {
        self.handle.clone()
    }

    fn drive(&mut self, direction: Direction) {
        lock(&self.handle.drum).direction = direction;
    }
}

impl Drop for SimulatedController {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.drum_thread.take() {
            let _ = thread.join();
        }
    }
}

impl Controller for SimulatedController {
    fn info(&self) -> &ControllerInfo {
        &self.info
    }

    fn up(&mut self) {
        self.drive(Direction::Up);
    }

    fn down(&mut self) {
        self.drive(Direction::Down);
    }

    fn off(&mut self) {
        self.drive(Direction::None);
    }

    fn has_slack(&self) -> bool {
        lock(&self.handle.drum).slack
    }

    fn is_docked(&self) -> bool {
        lock(&self.handle.drum).docked()
    }

    fn is_out_of_line(&self) -> bool {
        lock(&self.handle.drum).out_of_line()
    }

    fn set_slack_callback(&mut self, callback: SensorCallback) {
        lock(&self.handle.drum).slack_cb = Some(callback);
    }

    fn set_dock_callback(&mut self, callback: SensorCallback) {
        lock(&self.handle.drum).dock_cb = Some(callback);
    }

    fn set_line_callback(&mut self, callback: SensorCallback) {
        lock(&self.handle.drum).line_cb = Some(callback);
    }

    fn set_rotation_callback(&mut self, callback: RotationCallback) {
        lock(&self.handle.drum).rotation_cb = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn recorder() -> (SensorCallback, Arc<Mutex<Vec<bool>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (Arc::new(move |v: bool| sink.lock().unwrap().push(v)), seen)
    }

    #[test]
    fn test_idle_drum_does_not_rotate() {
        let sim = SimulatedController::new(Duration::ZERO, 5).unwrap();
        assert!(!sim.handle().rotate());
        assert_eq!(sim.handle().line_out(), 0);
    }

    #[test]
    fn test_pay_out_to_line_limit() {
        let mut sim = SimulatedController::new(Duration::ZERO, 3).unwrap();
        let (dock_cb, docks) = recorder();
        let (line_cb, lines) = recorder();
        let rotations = Arc::new(AtomicUsize::new(0));
        let counter = rotations.clone();
        sim.set_dock_callback(dock_cb);
        sim.set_line_callback(line_cb);
        sim.set_rotation_callback(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        sim.down();
        let handle = sim.handle();
        while handle.rotate() {}
        assert_eq!(handle.line_out(), 3);
        assert!(sim.is_out_of_line());
        assert!(!sim.is_docked());
        assert_eq!(rotations.load(Ordering::SeqCst), 3);
        assert_eq!(*docks.lock().unwrap(), vec![false]);
        assert_eq!(*lines.lock().unwrap(), vec![true]);

        sim.up();
        while handle.rotate() {}
        assert!(sim.is_docked());
        assert_eq!(*docks.lock().unwrap(), vec![false, true]);
        assert_eq!(*lines.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_slack_fires_on_change_only() {
        let mut sim = SimulatedController::new(Duration::ZERO, 3).unwrap();
        let (slack_cb, seen) = recorder();
        sim.set_slack_callback(slack_cb);
        let handle = sim.handle();
        handle.set_slack(true);
        handle.set_slack(true);
        handle.set_slack(false);
        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
        assert!(!sim.has_slack());
    }

    #[test]
    fn test_drum_thread_turns_driven_drum() {
        let mut sim = SimulatedController::new(Duration::from_millis(2), 1000).unwrap();
        sim.down();
        thread::sleep(Duration::from_millis(100));
        sim.off();
        assert!(sim.handle().line_out() > 0);
        assert_eq!(sim.handle().direction(), Direction::None);
    }

    #[test]
    fn test_rejects_empty_line() {
        assert!(SimulatedController::new(Duration::ZERO, 0).is_err());
    }
}
