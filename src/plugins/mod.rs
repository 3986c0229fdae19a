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

//! Admission plugins module.

pub mod defaultserviceplan;

use crate::admission::Plugins;

/// All ordered plugins in execution order.
pub const ALL_ORDERED_PLUGINS: &[&str] = &[
    defaultserviceplan::PLUGIN_NAME, // DefaultServicePlan
];

/// Plugins that stay off unless explicitly enabled.
pub const DEFAULT_OFF_PLUGINS: &[&str] = &[];

/// Register all admission plugins.
pub fn register_all_admission_plugins(plugins: &Plugins) {
    defaultserviceplan::register(plugins);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::AdmissionOptions;

    #[test]
    fn test_all_ordered_plugins_are_registered() {
        let plugins = Plugins::new();
        register_all_admission_plugins(&plugins);
        for name in ALL_ORDERED_PLUGINS {
            assert!(plugins.is_registered(name), "{} is not registered", name);
        }
        assert_eq!(plugins.registered_names().len(), ALL_ORDERED_PLUGINS.len());
    }

    #[test]
    fn test_default_service_plan_is_on_by_default() {
        assert!(!DEFAULT_OFF_PLUGINS.contains(&"DefaultServicePlan"));
        let options = AdmissionOptions::new(ALL_ORDERED_PLUGINS, DEFAULT_OFF_PLUGINS);
        assert_eq!(options.enabled_plugin_names(), vec!["DefaultServicePlan".to_string()]);
    }

    #[test]
    fn test_default_service_plan_can_be_disabled() {
        let mut options = AdmissionOptions::new(ALL_ORDERED_PLUGINS, DEFAULT_OFF_PLUGINS);
        options.disable_plugins = vec!["DefaultServicePlan".to_string()];
        assert!(options.validate().is_ok());
        assert!(options.enabled_plugin_names().is_empty());
    }
}
