//! Static localization catalogue.
//!
//! Packages must be registered before models declared in them can be
//! registered. A key with no message in its package resolves to itself.

use std::collections::BTreeMap;

use custos_core::traits::MessageResolver;

#[derive(Debug, Clone, Default)]
pub struct StaticMessageResolver {
    packages: BTreeMap<String, BTreeMap<String, String>>,
}

impl StaticMessageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.packages.entry(package.into()).or_default();
        self
    }

    /// Add a message, registering `package` if needed.
    pub fn with_message(
        mut self,
        package: impl Into<String>,
        key: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.packages
            .entry(package.into())
            .or_default()
            .insert(key.into(), text.into());
        self
    }
}

impl MessageResolver for StaticMessageResolver {
    fn is_package_registered(&self, package: &str) -> bool {
        self.packages.contains_key(package)
    }

    fn resolve(&self, package: &str, key: &str) -> String {
        self.packages
            .get(package)
            .and_then(|messages| messages.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
