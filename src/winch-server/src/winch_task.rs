// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use winch_core::{DynResult, Winch};

/// Drive the winch at a fixed period until shutdown is signalled.
///
/// Init runs once before the first tick. A tick that overruns the period is
/// logged and the missed ticks are skipped. The motor is turned off on exit.
pub async fn run_winch_task(
    mut winch: Winch,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> DynResult<()> {
    winch.power_on()?;
    info!("Control loop running every {:?}", period);

    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let started = Instant::now();
                winch.tick();
                let spent = started.elapsed();
                if spent > period {
                    warn!("Control loop tick took {:?} (period {:?})", spent, period);
                } else {
                    debug!("tick: state={:?} depth={}", winch.current_state(), winch.depth());
                }
            }
            changed = shutdown_rx.changed() => {
                match changed {
                    Ok(()) if *shutdown_rx.borrow() => {
                        info!("Shutdown requested");
                        break;
                    }
                    Ok(()) => {}
                    Err(_) => {
                        info!("Shutdown channel closed");
                        break;
                    }
                }
            }
        }
    }

    winch.shutdown();
    Ok(())
}
