use std::collections::BTreeMap;

use enrich_api::filter::{Filter, FilterFactory};

use crate::error::EngineError;

/// Filter factories by plugin name.
///
/// Populated once by the binary at startup, then read-only.
#[derive(Debug, Default)]
pub struct FilterRegistry {
    factories: BTreeMap<String, FilterFactory>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`. A later registration replaces an earlier one.
    pub fn register(&mut self, name: impl Into<String>, factory: FilterFactory) -> &mut Self {
        let name = name.into();
        if self.factories.insert(name.clone(), factory).is_some() {
            tracing::warn!(plugin = %name, "filter plugin registered twice, keeping the latest");
        }
        self
    }

    /// Build the filter registered as `name` from its config table.
    pub fn create(&self, name: &str, config: &serde_json::Value) -> Result<Box<dyn Filter>, EngineError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| EngineError::UnknownFilter(name.to_string()))?;
        factory(config).map_err(|e| EngineError::Plugin(e).with_context(format!("filter '{name}'")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
