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

//! Admission configuration: which plugins run and what configuration each gets.

use super::errors::{AdmissionError, AdmissionResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;

/// AdmissionConfiguration is the content of the admission control config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionConfiguration {
    #[serde(default)]
    pub plugins: Vec<AdmissionPluginConfiguration>,
}

/// AdmissionPluginConfiguration carries the configuration of one plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionPluginConfiguration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<serde_json::Value>,
}

impl AdmissionConfiguration {
    /// Parse a configuration file.
    pub fn from_reader(reader: impl Read) -> AdmissionResult<Self> {
        serde_json::from_reader(reader).map_err(|e| {
            AdmissionError::bad_request(format!("unable to decode admission configuration: {}", e))
        })
    }

    /// Returns the serialized configuration for the named plugin, if any.
    pub fn plugin_config(&self, name: &str) -> AdmissionResult<Option<Vec<u8>>> {
        let Some(plugin) = self.plugins.iter().find(|p| p.name == name) else {
            return Ok(None);
        };
        match &plugin.configuration {
            Some(value) => serde_json::to_vec(value).map(Some).map_err(|e| {
                AdmissionError::internal_error(format!(
                    "unable to encode configuration for admission plugin {:?}: {}",
                    name, e
                ))
            }),
            None => Ok(None),
        }
    }
}

/// AdmissionOptions selects the plugins an API server runs.
#[derive(Debug, Clone, Default)]
pub struct AdmissionOptions {
    /// Every known plugin, in execution order.
    pub recommended_plugin_order: Vec<String>,
    /// Plugins that only run when explicitly enabled.
    pub default_off_plugins: HashSet<String>,
    pub enable_plugins: Vec<String>,
    pub disable_plugins: Vec<String>,
    pub config: AdmissionConfiguration,
}

impl AdmissionOptions {
    pub fn new(recommended_plugin_order: &[&str], default_off_plugins: &[&str]) -> Self {
        Self {
            recommended_plugin_order: recommended_plugin_order
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_off_plugins: default_off_plugins.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Checks that every enabled or disabled plugin is known and that no
    /// plugin is both enabled and disabled.
    pub fn validate(&self) -> AdmissionResult<()> {
        let known: HashSet<&str> = self
            .recommended_plugin_order
            .iter()
            .map(String::as_str)
            .collect();

        let mut errors = Vec::new();
        for name in self.enable_plugins.iter().chain(&self.disable_plugins) {
            if !known.contains(name.as_str()) {
                errors.push(AdmissionError::bad_request(format!(
                    "unknown admission plugin {:?}",
                    name
                )));
            }
        }
        for name in &self.enable_plugins {
            if self.disable_plugins.contains(name) {
                errors.push(AdmissionError::bad_request(format!(
                    "admission plugin {:?} is both enabled and disabled",
                    name
                )));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AdmissionError::aggregate(errors))
        }
    }

    /// Returns the plugins to run, in recommended order.
    pub fn enabled_plugin_names(&self) -> Vec<String> {
        self.recommended_plugin_order
            .iter()
            .filter(|name| !self.disable_plugins.contains(*name))
            .filter(|name| {
                !self.default_off_plugins.contains(*name) || self.enable_plugins.contains(*name)
            })
            .cloned()
            .collect()
    }
}
