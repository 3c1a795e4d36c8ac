//! Registry of output-channel driver factories.
//!
//! Constructor-injection rather than global state: `efi_engine_core` builds
//! one `ChannelRegistry`, registers "simulation" (and, on a `hw`-feature
//! build, the register-level backend), and asks it for eight channel
//! instances at startup.

use std::collections::HashMap;

use crate::driver::{ChannelDriverFactory, HalError, OutputChannelDriver};

pub struct ChannelRegistry {
    factories: HashMap<&'static str, ChannelDriverFactory>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a channel driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: ChannelDriverFactory) {
        if self.factories.contains_key(name) {
            panic!("channel driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn OutputChannelDriver>, HalError> {
        let factory = self
            .factories
            .get(name)
            .copied()
            .ok_or_else(|| HalError::DriverNotFound(name.to_string()))?;
        Ok(factory())
    }

    pub fn list(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::SimulationChannel;

    fn make_sim() -> Box<dyn OutputChannelDriver> {
        Box::new(SimulationChannel::new())
    }

    #[test]
    fn register_and_create() {
        let mut reg = ChannelRegistry::new();
        reg.register("simulation", make_sim);
        let ch = reg.create("simulation").expect("should create");
        assert_eq!(ch.read_counter(), 0);
    }

    #[test]
    fn unknown_name_is_driver_not_found() {
        let reg = ChannelRegistry::new();
        assert!(matches!(
            reg.create("missing"),
            Err(HalError::DriverNotFound(_))
        ));
    }

    #[test]
    fn list_returns_all_registered_names() {
        let mut reg = ChannelRegistry::new();
        reg.register("simulation", make_sim);
        assert_eq!(reg.list(), vec!["simulation"]);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let mut reg = ChannelRegistry::new();
        reg.register("simulation", make_sim);
        reg.register("simulation", make_sim);
    }
}
