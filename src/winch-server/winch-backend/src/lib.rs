// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use winch_core::{Controller, DynResult};

#[cfg(feature = "gpio")]
pub mod gpio;
#[cfg(feature = "simulated")]
pub mod simulated;

#[cfg(feature = "gpio")]
pub use gpio::GpioController;
#[cfg(feature = "simulated")]
pub use simulated::{SimulatedController, SimulatedHandle};

/// BCM pin numbers of the winch wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioPins {
    pub up: u32,
    pub down: u32,
    pub slack: u32,
    pub dock: u32,
    pub line: u32,
    pub rotation: u32,
}

impl Default for GpioPins {
    fn default() -> Self {
        Self {
            up: 23,
            down: 24,
            slack: 6,
            dock: 12,
            line: 17,
            rotation: 21,
        }
    }
}

/// Parameters for instantiating a controller backend.
#[derive(Debug, Clone)]
pub enum ControllerAccess {
    Simulated {
        /// Time per rotation while driven; zero disables the drum thread.
        rotation_period: Duration,
        /// Rotations until the out-of-line limit.
        line_length: i64,
    },
    Gpio {
        sysfs_root: PathBuf,
        pins: GpioPins,
    },
}

pub type ControllerFactory = fn(ControllerAccess) -> DynResult<Box<dyn Controller>>;

/// Name to factory registry for controller backends.
#[derive(Clone)]
pub struct RegistrationContext {
    factories: HashMap<String, ControllerFactory>,
}

impl RegistrationContext {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under a stable name (e.g. "gpio").
    pub fn register_backend(&mut self, name: &str, factory: ControllerFactory) {
        let key = normalize_name(name);
        self.factories.insert(key, factory);
    }

    pub fn is_backend_registered(&self, name: &str) -> bool {
        let key = normalize_name(name);
        self.factories.contains_key(&key)
    }

    /// Sorted list of registered names.
    pub fn registered_backends(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Instantiate the controller registered as `name`.
    pub fn build_controller(
        &self,
        name: &str,
        access: ControllerAccess,
    ) -> DynResult<Box<dyn Controller>> {
        let key = normalize_name(name);
        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| format!("Unknown controller backend: {}", name))?;
        factory(access)
    }
}

impl Default for RegistrationContext {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_name(name: &str) -> String {
    name.to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Register all built-in backends enabled by features on a context.
pub fn register_builtin_backends_on(context: &mut RegistrationContext) {
    #[cfg(feature = "simulated")]
    context.register_backend("simulated", simulated_factory);
    #[cfg(feature = "gpio")]
    context.register_backend("gpio", gpio_factory);
}

#[cfg(feature = "simulated")]
fn simulated_factory(access: ControllerAccess) -> DynResult<Box<dyn Controller>> {
    match access {
        ControllerAccess::Simulated {
            rotation_period,
            line_length,
        } => Ok(Box::new(SimulatedController::new(
            rotation_period,
            line_length,
        )?)),
        ControllerAccess::Gpio { .. } => Err("simulated backend requires Simulated access".into()),
    }
}

#[cfg(feature = "gpio")]
fn gpio_factory(access: ControllerAccess) -> DynResult<Box<dyn Controller>> {
    match access {
        ControllerAccess::Gpio { sysfs_root, pins } => {
            Ok(Box::new(GpioController::new(sysfs_root, pins)?))
        }
        ControllerAccess::Simulated { .. } => Err("gpio backend requires Gpio access".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_backends_registered() {
        let mut ctx = RegistrationContext::new();
        register_builtin_backends_on(&mut ctx);
        assert_eq!(ctx.registered_backends(), vec!["gpio", "simulated"]);
        assert!(ctx.is_backend_registered("Simulated"));
        assert!(!ctx.is_backend_registered("ft817"));
    }

    #[test]
    fn test_unknown_backend_is_error() {
        let ctx = RegistrationContext::default();
        let access = ControllerAccess::Simulated {
            rotation_period: Duration::ZERO,
            line_length: 10,
        };
        let err = ctx.build_controller("winchbot", access).err().unwrap();
        assert!(err.to_string().contains("winchbot"));
    }

    #[test]
    fn test_factory_rejects_mismatched_access() {
        let mut ctx = RegistrationContext::new();
        register_builtin_backends_on(&mut ctx);
        let access = ControllerAccess::Gpio {
            sysfs_root: PathBuf::from("/nonexistent"),
            pins: GpioPins::default(),
        };
        assert!(ctx.build_controller("simulated", access).is_err());
    }

    #[test]
    fn test_build_simulated_controller() {
        let mut ctx = RegistrationContext::new();
        register_builtin_backends_on(&mut ctx);
        let access = ControllerAccess::Simulated {
            rotation_period: Duration::ZERO,
            line_length: 10,
        };
        let controller = ctx.build_controller("SIMULATED", access).unwrap();
        assert_eq!(controller.info().name, "simulated");
        assert!(controller.is_docked());
    }

    #[test]
    fn test_pins_default_and_partial_override() {
        let pins: GpioPins = toml::from_str("rotation = 5\n").unwrap();
        assert_eq!(pins.rotation, 5);
        assert_eq!(pins.up, GpioPins::default().up);
    }
}
