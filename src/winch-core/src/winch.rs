// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Winch composition root.
//!
//! [`Winch`] owns the controller, the command source, the calibration table,
//! the timers and the state machine. [`Winch::tick`] is one iteration of the
//! fixed-period control loop; it is the only code path that mutates winch
//! state. Controller callbacks and the command intake post [`WinchEvent`]s
//! which are drained at the start of every tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::calibration::CalibrationTable;
use crate::client::{ClientCommand, SensorKind};
use crate::controller::{Controller, Direction};
use crate::machine::states;
use crate::machine::{
    CommandSource, Context, Dispatch, SensorEvent, StateId, StateSequence, Step, WinchEvent,
};
use crate::settings::WinchSettings;
use crate::timer::Timer;
use crate::DynResult;

/// Live command together with the time it was last refreshed.
#[derive(Debug, Clone)]
pub(crate) struct LiveCommand {
    pub(crate) text: String,
    pub(crate) refreshed_at: Instant,
}

/// Operator-toggleable sensor guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorFlags {
    pub slack: bool,
    pub dock: bool,
    pub line: bool,
}

impl Default for SensorFlags {
    fn default() -> Self {
        Self {
            slack: true,
            dock: true,
            line: true,
        }
    }
}

/// Last sensor levels reported by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readings {
    pub has_slack: bool,
    pub is_docked: bool,
    pub is_out_of_line: bool,
}

pub struct Winch {
    pub(crate) context: Context,
    pub(crate) controller: Box<dyn Controller>,
    pub(crate) source: Box<dyn CommandSource>,
    pub(crate) settings: WinchSettings,
    pub(crate) calibration: CalibrationTable,
    pub(crate) sequence: StateSequence,

    pub(crate) events_tx: UnboundedSender<WinchEvent>,
    events_rx: UnboundedReceiver<WinchEvent>,
    responses_tx: UnboundedSender<String>,
    pub(crate) responses_rx: Option<UnboundedReceiver<String>>,

    pub(crate) command: Option<LiveCommand>,
    /// Line out, in drum rotations.
    pub(crate) depth: i64,
    pub(crate) direction: Direction,
    pub(crate) target_depth: i64,
    pub(crate) soak_depth: i64,
    pub(crate) soak_time: Duration,
    pub(crate) max_depth: i64,

    pub(crate) sensors: SensorFlags,
    pub(crate) readings: Readings,

    pub(crate) has_error: bool,
    pub(crate) error_message: Option<String>,
    pub(crate) error_latched: bool,
    pub(crate) initialized: bool,

    pub(crate) slack_timer: Timer,
    /// Time since drive start or the last pulse; stall detection.
    pub(crate) rotation_timer: Timer,
    pub(crate) soak_timer: Timer,
    /// Previous pulse of the current drive; cleared whenever the motor stops.
    pub(crate) last_rotation: Option<Instant>,
}

impl Winch {
    pub fn new(
        controller: Box<dyn Controller>,
        source: Box<dyn CommandSource>,
        settings: WinchSettings,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        Self {
            context: Context::with_builtin_states(settings.name.clone()),
            controller,
            source,
            soak_time: settings.default_soak_time,
            settings,
            calibration: CalibrationTable::default(),
            sequence: StateSequence::new(),
            events_tx,
            events_rx,
            responses_tx,
            responses_rx: Some(responses_rx),
            command: None,
            depth: 0,
            direction: Direction::None,
            target_depth: 0,
            soak_depth: 0,
            max_depth: 0,
            sensors: SensorFlags::default(),
            readings: Readings::default(),
            has_error: false,
            error_message: None,
            error_latched: false,
            initialized: false,
            slack_timer: Timer::new(),
            rotation_timer: Timer::new(),
            soak_timer: Timer::new(),
            last_rotation: None,
        }
    }

    /// Use `calibration` until Init loads the configured calibration file.
    pub fn with_calibration(mut self, calibration: CalibrationTable) -> Self {
        self.calibration = calibration;
        self
    }

    /// Sender for posting events from outside the control loop.
    pub fn event_sender(&self) -> UnboundedSender<WinchEvent> {
        self.events_tx.clone()
    }

    /// Run the Init state once.
    pub fn power_on(&mut self) -> DynResult<()> {
        self.transition(StateId::Init.name(), &[]);
        if self.initialized {
            Ok(())
        } else {
            let reason = self
                .error_message
                .clone()
                .unwrap_or_else(|| "initialization failed".to_string());
            Err(reason.into())
        }
    }

    /// Motor off; called once when the loop exits.
    pub fn shutdown(&mut self) {
        self.motor_off();
        info!("{} shut down at {} rotations", self.context.name(), self.depth);
    }

    /// One control-loop iteration.
    pub fn tick(&mut self) {
        self.drain_events();
        self.expire_command();

        if self.has_error {
            self.transition(StateId::Error.name(), &[]);
            return;
        }

        states::execute(StateId::Monitor, self, &[]);

        let Some(head) = self.sequence.head().cloned() else {
            self.transition(StateId::Standby.name(), &[]);
            return;
        };

        match self.transition(&head.state, &head.args) {
            Dispatch::Executed(_, Step::Continue) => {}
            Dispatch::Executed(_, Step::Done) | Dispatch::Unknown => {
                self.sequence.pop_if_head(head.id);
            }
        }
    }

    /// Enter `target` with `args`. Unknown targets re-enter the current state.
    pub fn transition(&mut self, target: &str, args: &[f64]) -> Dispatch {
        let Some(state) = self.context.lookup(target) else {
            error!("Unknown state '{}', staying in {:?}", target, self.context.current());
            self.respond(format!("ERROR: unknown command '{}'", target));
            if let Some(current) = self.context.current() {
                states::execute(current, self, &[]);
            }
            return Dispatch::Unknown;
        };

        let previous = self.context.current();
        self.context.set_current(target);
        if previous != Some(state) {
            match previous {
                Some(prev) => info!("State {} -> {}", prev, state),
                None => info!("State -> {}", state),
            }
        }
        Dispatch::Executed(state, states::execute(state, self, args))
    }

    pub fn current_state(&self) -> Option<StateId> {
        self.context.current()
    }

    pub fn pending(&self) -> Vec<String> {
        self.sequence.names()
    }

    pub fn depth(&self) -> i64 {
        self.depth
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    /// Preempt everything with STOP.
    pub fn stop(&mut self) {
        self.sequence.push_front(StateId::Stop.name(), Vec::new());
    }

    /// Raise a safety fault. The Error state latches it on the next dispatch.
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("Fault: {}", message);
        self.has_error = true;
        self.error_message = Some(message);
        if self.sequence.head().map(|e| e.state.as_str()) != Some(StateId::Error.name()) {
            self.sequence.push_front(StateId::Error.name(), Vec::new());
        }
    }

    pub(crate) fn respond(&self, line: impl Into<String>) {
        let line = line.into();
        debug!("Response: {}", line);
        let _ = self.responses_tx.send(line);
    }

    pub(crate) fn meters(&self, rotations: i64) -> f64 {
        self.calibration.rotations_to_meters(rotations as f64)
    }

    pub(crate) fn live_command(&self) -> Option<&str> {
        self.command.as_ref().map(|c| c.text.as_str())
    }

    pub(crate) fn take_command(&mut self) -> Option<String> {
        self.command.take().map(|c| c.text)
    }

    pub(crate) fn down(&mut self) {
        self.drive(Direction::Down);
        self.controller.down();
    }

    pub(crate) fn up(&mut self) {
        self.drive(Direction::Up);
        self.controller.up();
    }

    fn drive(&mut self, direction: Direction) {
        if self.direction != direction {
            info!("Drum {} at {} rotations", direction, self.depth);
            self.last_rotation = None;
        }
        self.direction = direction;
        self.rotation_timer.start();
    }

    pub(crate) fn motor_off(&mut self) {
        if self.direction != Direction::None {
            info!("Drum off at {} rotations", self.depth);
        }
        self.direction = Direction::None;
        self.rotation_timer.stop();
        self.last_rotation = None;
        self.controller.off();
    }

    pub(crate) fn slack_blocks(&self) -> bool {
        self.sensors.slack && self.controller.has_slack()
    }

    pub(crate) fn dock_blocks(&self) -> bool {
        self.sensors.dock && self.controller.is_docked()
    }

    pub(crate) fn line_blocks(&self) -> bool {
        self.sensors.line && self.controller.is_out_of_line()
    }

    /// Keep a single latched ERROR entry at the sequence head.
    pub(crate) fn hold_error_head(&mut self) {
        let held = self.sequence.len() == 1
            && self.sequence.head().map(|e| e.state.as_str()) == Some(StateId::Error.name());
        if !held {
            self.sequence.clear();
            self.sequence.push_front(StateId::Error.name(), Vec::new());
        }
    }

    pub(crate) fn status_line(&self) -> String {
        format!(
            "depth={} rot ({:.2} m) direction={} slack={} docked={} out_of_line={} \
             sensors=[slack:{} dock:{} line:{}] error={}",
            self.depth,
            self.meters(self.depth),
            self.direction,
            self.readings.has_slack,
            self.readings.is_docked,
            self.readings.is_out_of_line,
            on_off(self.sensors.slack),
            on_off(self.sensors.dock),
            on_off(self.sensors.line),
            self.error_message.as_deref().unwrap_or("none"),
        )
    }

    pub(crate) fn wire_controller_callbacks(&mut self) {
        self.controller
            .set_slack_callback(sensor_callback(&self.events_tx, SensorEvent::Slack));
        self.controller
            .set_dock_callback(sensor_callback(&self.events_tx, SensorEvent::Dock));
        self.controller
            .set_line_callback(sensor_callback(&self.events_tx, SensorEvent::OutOfLine));

        let tx = self.events_tx.clone();
        self.controller.set_rotation_callback(Arc::new(move || {
            let _ = tx.send(WinchEvent::Sensor(SensorEvent::Rotation(Instant::now())));
        }));
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                WinchEvent::Sensor(SensorEvent::Slack(asserted)) => self.on_slack(asserted),
                WinchEvent::Sensor(SensorEvent::Dock(asserted)) => self.on_dock(asserted),
                WinchEvent::Sensor(SensorEvent::OutOfLine(asserted)) => self.on_line(asserted),
                WinchEvent::Sensor(SensorEvent::Rotation(at)) => self.on_rotation(at),
                WinchEvent::Client {
                    command,
                    received_at,
                } => self.on_client(command, received_at),
            }
        }
    }

    fn expire_command(&mut self) {
        let expired = self
            .command
            .as_ref()
            .is_some_and(|c| c.refreshed_at.elapsed() > self.settings.client_period);
        if expired {
            if let Some(cmd) = self.command.take() {
                debug!("Command '{}' expired", cmd.text);
            }
        }
    }

    fn on_slack(&mut self, asserted: bool) {
        self.readings.has_slack = asserted;
        if asserted {
            self.slack_timer.reset();
            if self.sensors.slack {
                warn!("Slack detected at {} rotations", self.depth);
                self.motor_off();
            }
        } else {
            self.slack_timer.stop();
        }
    }

    fn on_dock(&mut self, asserted: bool) {
        self.readings.is_docked = asserted;
        if !asserted {
            return;
        }
        if self.sensors.dock {
            if self.depth.abs() as f64 > self.settings.calibration_tolerance {
                self.error(format!(
                    "Dock position miscalibrated: docked at {} rotations",
                    self.depth
                ));
            } else {
                info!("Docked");
                self.stop();
            }
        }
        self.depth = 0;
    }

    fn on_line(&mut self, asserted: bool) {
        self.readings.is_out_of_line = asserted;
        if asserted && self.sensors.line {
            warn!("Out of line at {} rotations", self.depth);
            self.stop();
        }
    }

    fn on_rotation(&mut self, at: Instant) {
        let delta = match self.direction {
            Direction::Down => 1,
            Direction::Up => -1,
            Direction::None => {
                warn!("Drum rotated while not driven");
                return;
            }
        };
        self.depth += delta;

        // The first pulse after a start follows a partial turn and is not timed.
        let period = self
            .last_rotation
            .map(|prev| at.saturating_duration_since(prev));
        match period {
            Some(period) if period < self.settings.rotation_too_fast => {
                self.rotation_timer.stop();
                self.last_rotation = None;
                self.error(format!(
                    "Drum rotating too fast: {} ms per rotation",
                    period.as_millis()
                ));
            }
            _ => {
                self.rotation_timer.reset();
                self.last_rotation = Some(at);
            }
        }
        debug!("Rotation, depth now {}", self.depth);
    }

    fn on_client(&mut self, command: ClientCommand, received_at: Instant) {
        match command {
            ClientCommand::Stop => {
                info!("Operator STOP");
                self.stop();
            }
            ClientCommand::SetSensor { sensor, enabled } => {
                match sensor {
                    SensorKind::Slack => self.sensors.slack = enabled,
                    SensorKind::Dock => self.sensors.dock = enabled,
                    SensorKind::Line => self.sensors.line = enabled,
                }
                info!("{} sensor {}", sensor, on_off(enabled));
                self.respond(format!("{} sensor {}", sensor, on_off(enabled)));
            }
            ClientCommand::ClearError => {
                if self.has_error {
                    info!("Operator cleared error");
                    self.has_error = false;
                }
            }
            ClientCommand::Live(text) => {
                self.command = Some(LiveCommand {
                    text,
                    refreshed_at: received_at,
                });
            }
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn sensor_callback(
    tx: &UnboundedSender<WinchEvent>,
    event: fn(bool) -> SensorEvent,
) -> crate::controller::SensorCallback {
    let tx = tx.clone();
    Arc::new(move |asserted| {
        let _ = tx.send(WinchEvent::Sensor(event(asserted)));
    })
}
