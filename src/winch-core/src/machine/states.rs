// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Entry behaviors for every state.
//!
//! Each behavior does one bounded unit of work per call and reports
//! [`Step::Done`] only when its goal is reached. Behaviors never invoke each
//! other; follow-on work is expressed by editing the state sequence.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::state::{StateId, Step};
use crate::calibration::CalibrationTable;
use crate::command::{self, CastRequest, CAST_TOKEN};
use crate::controller::Direction;
use crate::winch::{Readings, Winch};

/// Run the entry behavior of `state`.
pub fn execute(state: StateId, winch: &mut Winch, args: &[f64]) -> Step {
    match state {
        StateId::Init => init(winch),
        StateId::Standby => standby(winch),
        StateId::Monitor => monitor(winch),
        StateId::Cast => cast(winch, args),
        StateId::DownCast => down_cast(winch, args),
        StateId::Soak => soak(winch, args),
        StateId::UpCast => up_cast(winch),
        StateId::ManualOut => manual_out(winch),
        StateId::ManualIn => manual_in(winch),
        StateId::Error => error_state(winch),
        StateId::Stop => stop(winch),
        StateId::ReadData => read_data(winch),
        StateId::Help => help(winch),
    }
}

fn init(winch: &mut Winch) -> Step {
    if winch.initialized {
        warn!("Init requested after start-up, ignoring");
        return Step::Done;
    }

    if let Some(path) = winch.settings.calibration_file.clone() {
        match CalibrationTable::load(&path) {
            Ok(table) => {
                let (first, last) = table.rotation_domain();
                info!(
                    "Loaded calibration from {} ({} points, {}..{} rotations)",
                    path.display(),
                    table.sample_count(),
                    first,
                    last
                );
                winch.calibration = table;
            }
            Err(e) => {
                winch.error(format!("Calibration load failed: {}", e));
                return Step::Done;
            }
        }
    }

    winch.max_depth = command::to_rotations(&winch.calibration, winch.settings.maximum_depth_m);
    winch.soak_depth = command::to_rotations(&winch.calibration, winch.settings.default_soak_depth_m);
    winch.soak_time = winch.settings.default_soak_time;
    winch.readings = Readings {
        has_slack: winch.controller.has_slack(),
        is_docked: winch.controller.is_docked(),
        is_out_of_line: winch.controller.is_out_of_line(),
    };
    winch.wire_controller_callbacks();

    if let Some(responses) = winch.responses_rx.take() {
        if let Err(e) = winch.source.start(winch.events_tx.clone(), responses) {
            winch.error(format!("Command intake failed to start: {}", e));
            return Step::Done;
        }
    }

    winch.initialized = true;
    info!(
        "{} initialized: controller '{}', max depth {} rotations",
        winch.context.name(),
        winch.controller.info().name,
        winch.max_depth
    );
    winch.sequence.push_back(StateId::Standby.name(), Vec::new());
    Step::Done
}

fn standby(winch: &mut Winch) -> Step {
    let Some(line) = winch.live_command().map(str::to_string) else {
        winch.motor_off();
        return Step::Done;
    };

    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        [token] => {
            // Manual drive stays live while the client keeps refreshing it.
            if *token != StateId::ManualOut.name() && *token != StateId::ManualIn.name() {
                winch.take_command();
            }
            debug!("Standby queues '{}'", token);
            winch.sequence.push_back(*token, Vec::new());
        }
        [first, _, _, _] if *first == CAST_TOKEN => {
            winch.take_command();
            let plan = CastRequest::parse(&line)
                .and_then(|req| req.resolve(&winch.calibration, &winch.settings));
            match plan {
                Ok(plan) => {
                    info!(
                        "Cast accepted: target {} rotations, soak {} rotations for {:?}",
                        plan.target, plan.soak_depth, plan.soak_time
                    );
                    winch.sequence.push_back(StateId::Cast.name(), plan.to_args());
                }
                Err(e) => {
                    warn!("Discarding command: {}", e);
                    winch.respond(format!("ERROR: {}", e));
                }
            }
        }
        _ => {
            winch.take_command();
            warn!("Discarding malformed command '{}'", line);
            winch.respond(format!("ERROR: malformed command '{}'", line));
        }
    }
    Step::Done
}

fn monitor(winch: &mut Winch) -> Step {
    let slack_for = winch.slack_timer.check_time();
    if winch.sensors.slack && slack_for > winch.settings.slack_timeout {
        winch.slack_timer.stop();
        winch.error(format!("Line has been slack for {:.1} s", slack_for.as_secs_f64()));
        return Step::Done;
    }

    let since_rotation = winch.rotation_timer.check_time();
    if winch.direction != Direction::None && since_rotation > winch.settings.rotation_too_slow {
        winch.rotation_timer.stop();
        winch.error(format!(
            "Drum rotating too slow (stalled): no rotation for {:.1} s",
            since_rotation.as_secs_f64()
        ));
    }
    Step::Done
}

fn cast(winch: &mut Winch, args: &[f64]) -> Step {
    let &[target, soak_depth, soak_secs] = args else {
        error!("CAST expects 3 arguments, got {}", args.len());
        winch.respond("ERROR: CAST expects <target> <soak_depth> <soak_time>");
        return Step::Done;
    };

    winch.target_depth = target as i64;
    winch.soak_depth = soak_depth as i64;
    winch.soak_time = seconds(soak_secs);

    winch.sequence.insert_after_head(vec![
        (StateId::Soak.name(), vec![soak_depth, soak_secs]),
        (StateId::DownCast.name(), vec![target]),
        (StateId::UpCast.name(), Vec::new()),
        (StateId::Stop.name(), Vec::new()),
    ]);
    winch.respond(format!(
        "Casting to {:.2} m, soak at {:.2} m for {:.0} s",
        winch.meters(winch.target_depth),
        winch.meters(winch.soak_depth),
        soak_secs
    ));
    Step::Done
}

/// Negative or unrepresentable values count as zero.
fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

fn down_cast(winch: &mut Winch, args: &[f64]) -> Step {
    let target = args.first().map(|t| *t as i64).unwrap_or(winch.target_depth);

    if winch.depth >= target {
        winch.motor_off();
        info!("Down cast reached {} rotations", winch.depth);
        winch.respond(format!("Reached {:.2} m", winch.meters(winch.depth)));
        return Step::Done;
    }

    if winch.slack_blocks() || winch.line_blocks() {
        winch.motor_off();
    } else {
        winch.down();
    }
    Step::Continue
}

fn soak(winch: &mut Winch, args: &[f64]) -> Step {
    let soak_depth = args.first().map(|d| *d as i64).unwrap_or(winch.soak_depth);
    let soak_time = args.get(1).map(|s| seconds(*s)).unwrap_or(winch.soak_time);

    if winch.depth < soak_depth {
        if winch.slack_blocks() || winch.line_blocks() {
            winch.motor_off();
        } else {
            winch.down();
        }
        return Step::Continue;
    }

    winch.motor_off();
    if !winch.soak_timer.is_running() {
        info!("Soaking at {} rotations for {:?}", winch.depth, soak_time);
        winch.soak_timer.start();
    }

    let soaked = winch.soak_timer.check_time();
    if soaked >= soak_time {
        winch.soak_timer.stop();
        winch.respond(format!("Soak complete after {:.0} s", soaked.as_secs_f64()));
        return Step::Done;
    }
    Step::Continue
}

fn up_cast(winch: &mut Winch) -> Step {
    if winch.depth <= 0 {
        winch.motor_off();
        info!("Up cast complete");
        winch.respond("At surface");
        return Step::Done;
    }

    if winch.slack_blocks() || winch.dock_blocks() {
        winch.motor_off();
    } else {
        winch.up();
    }
    Step::Continue
}

fn manual_out(winch: &mut Winch) -> Step {
    let live = winch.live_command() == Some(StateId::ManualOut.name());
    if live && !winch.slack_blocks() && !winch.line_blocks() {
        winch.down();
    } else {
        winch.motor_off();
    }
    Step::Done
}

fn manual_in(winch: &mut Winch) -> Step {
    let live = winch.live_command() == Some(StateId::ManualIn.name());
    if live && !winch.slack_blocks() && !winch.dock_blocks() {
        winch.up();
    } else {
        winch.motor_off();
    }
    Step::Done
}

fn error_state(winch: &mut Winch) -> Step {
    if winch.has_error {
        winch.motor_off();
        winch.hold_error_head();
        if !winch.error_latched {
            winch.error_latched = true;
            let message = winch.error_message.clone().unwrap_or_default();
            error!("Winch halted: {}", message);
            winch.respond(format!("ERROR: {}", message));
        }
        return Step::Continue;
    }

    // Only a latched fault resets the fault timers.
    if !winch.error_latched {
        debug!("No latched error to clear");
        winch.error_message = None;
        return Step::Done;
    }

    winch.slack_timer.stop();
    winch.rotation_timer.stop();
    winch.soak_timer.stop();
    winch.error_latched = false;
    winch.error_message = None;
    info!("Error cleared");
    winch.respond("Error cleared");
    Step::Done
}

fn stop(winch: &mut Winch) -> Step {
    winch.motor_off();
    winch.sequence.clear();
    winch.command = None;
    winch.soak_timer.stop();
    info!("Stopped at {} rotations", winch.depth);
    winch.respond("Stopped");
    Step::Done
}

fn read_data(winch: &mut Winch) -> Step {
    if winch.depth != 0 {
        warn!("Reading data while probe is off the surface ({} rotations)", winch.depth);
    }
    let status = winch.status_line();
    winch.respond(status);
    Step::Done
}

fn help(winch: &mut Winch) -> Step {
    let states = winch.context.print_states().join(" ");
    winch.respond(format!("States: {}", states));
    Step::Done
}
