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

//! Plugin initialization: injecting shared dependencies into plugins.

use super::interfaces::Interface;
use crate::client::ServiceCatalogClient;
use std::sync::Arc;

/// WantsServiceCatalogClient is implemented by plugins that need a
/// service catalog client.
pub trait WantsServiceCatalogClient {
    fn set_service_catalog_client(&self, client: Arc<dyn ServiceCatalogClient>);
}

/// PluginInitializer is used to initialize plugins after they are created.
pub trait PluginInitializer: Send + Sync {
    /// Initialize is called to initialize the plugin.
    fn initialize(&self, plugin: &dyn Interface);
}

/// Hands the service catalog client to every plugin that asks for it.
pub struct ServiceCatalogPluginInitializer {
    client: Arc<dyn ServiceCatalogClient>,
}

impl ServiceCatalogPluginInitializer {
    pub fn new(client: Arc<dyn ServiceCatalogClient>) -> Self {
        Self { client }
    }
}

impl PluginInitializer for ServiceCatalogPluginInitializer {
    fn initialize(&self, plugin: &dyn Interface) {
        if let Some(wants) = plugin.as_wants_service_catalog_client() {
            wants.set_service_catalog_client(self.client.clone());
        }
    }
}
