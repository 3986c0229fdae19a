// Copyright 2024 The Kubernetes Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Plugin registry for admission controllers.

use super::chain::ChainAdmissionHandler;
use super::config::AdmissionConfiguration;
use super::errors::{AdmissionError, AdmissionResult};
use super::initializer::PluginInitializer;
use super::interfaces::Interface;
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Factory is a function that creates an admission plugin instance.
pub type Factory = fn(config: Option<&mut dyn Read>) -> AdmissionResult<Arc<dyn Interface>>;

/// Plugins is a registry of admission plugins.
#[derive(Default)]
pub struct Plugins {
    registry: RwLock<HashMap<String, Factory>>,
}

impl Plugins {
    /// Create a new empty plugin registry.
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new admission plugin with the given name and factory.
    pub fn register(&self, name: &str, factory: Factory) {
        let mut registry = self.registry.write().expect("plugin registry lock poisoned");
        if registry.insert(name.to_string(), factory).is_some() {
            debug!(plugin = name, "admission plugin registered twice, keeping the latest");
        } else {
            debug!(plugin = name, "registered admission plugin");
        }
    }

    /// Get a factory for the given plugin name.
    pub fn get_factory(&self, name: &str) -> Option<Factory> {
        let registry = self.registry.read().expect("plugin registry lock poisoned");
        registry.get(name).copied()
    }

    /// Get all registered plugin names, sorted.
    pub fn registered_names(&self) -> Vec<String> {
        let registry = self.registry.read().expect("plugin registry lock poisoned");
        let mut names: Vec<String> = registry.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a plugin is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        let registry = self.registry.read().expect("plugin registry lock poisoned");
        registry.contains_key(name)
    }

    /// Create a new instance of the named plugin.
    pub fn new_plugin(
        &self,
        name: &str,
        config: Option<&mut dyn Read>,
    ) -> AdmissionResult<Arc<dyn Interface>> {
        let factory = self.get_factory(name).ok_or_else(|| {
            AdmissionError::internal_error(format!("unknown admission plugin: {}", name))
        })?;
        factory(config)
    }

    /// Build the named plugins, initialize them and chain them in the given order.
    pub fn new_from_plugins(
        &self,
        names: &[String],
        configuration: &AdmissionConfiguration,
        initializer: &dyn PluginInitializer,
    ) -> AdmissionResult<ChainAdmissionHandler> {
        let unknown: Vec<AdmissionError> = names
            .iter()
            .filter(|name| !self.is_registered(name))
            .map(|name| AdmissionError::internal_error(format!("unknown admission plugin: {}", name)))
            .collect();
        if !unknown.is_empty() {
            return Err(AdmissionError::aggregate(unknown));
        }

        let mut plugins = Vec::with_capacity(names.len());
        for name in names {
            let plugin = match configuration.plugin_config(name)? {
                Some(bytes) => {
                    let mut reader: &[u8] = &bytes;
                    self.new_plugin(name, Some(&mut reader as &mut dyn Read))?
                }
                None => self.new_plugin(name, None)?,
            };
            initializer.initialize(plugin.as_ref());
            plugin.validate_initialization()?;
            debug!(plugin = name.as_str(), "loaded admission plugin");
            plugins.push(plugin);
        }
        Ok(ChainAdmissionHandler::new(plugins))
    }
}
