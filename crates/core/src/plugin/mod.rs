use std::{collections::BTreeMap, fmt};

use crate::{Capabilities, HostError, Result};

pub mod builtin;

pub use builtin::{Rainbow, Walker};

/// A unit of display logic driven by the host.
///
/// `init` receives the plugin's only handle on the outside world. Anything the
/// plugin wants to react to has to be subscribed through that grant.
pub trait Plugin {
    fn id(&self) -> &str;

    fn init(&mut self, caps: Capabilities) -> Result<()>;
}

/// Resolves plugin names into fresh plugin instances.
pub trait PluginLoader {
    /// Fails with [`HostError::PluginNotFound`] when `name` is unknown.
    fn load(&mut self, name: &str) -> Result<Box<dyn Plugin>>;

    fn names(&self) -> Vec<String> {
        Vec::new()
    }
}

type Factory = Box<dyn Fn() -> Box<dyn Plugin>>;

/// Registry for all plugins the host can start by name.
#[derive(Default)]
pub struct PluginRegistry {
    factories: BTreeMap<String, Factory>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the plugins shipped in this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Rainbow::NAME, || Box::new(Rainbow::default()));
        registry.register(Walker::NAME, || Box::new(Walker::default()));
        registry
    }

    /// Adds or replaces the factory for `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Plugin> + 'static,
    ) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl PluginLoader for PluginRegistry {
    fn load(&mut self, name: &str) -> Result<Box<dyn Plugin>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| HostError::PluginNotFound(name.to_string()))?;
        Ok(factory())
    }

    fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Plugin for Named {
        fn id(&self) -> &str {
            self.0
        }

        fn init(&mut self, _caps: Capabilities) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn resolves_registered_plugins() {
        let mut registry = PluginRegistry::new();
        registry.register("clock", || Box::new(Named("clock-1")));

        let plugin = registry.load("clock").unwrap();
        assert_eq!(plugin.id(), "clock-1");
        assert!(registry.contains("clock"));
    }

    #[test]
    fn errors_on_missing_plugins() {
        let mut registry = PluginRegistry::new();
        let err = registry.load("missing").err().unwrap();
        assert!(matches!(err, HostError::PluginNotFound(_)));
        assert!(format!("{err}").contains("missing"));
    }

    #[test]
    fn builtins_are_listed_in_order() {
        let registry = PluginRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["rainbow", "walker"]);
    }
}
