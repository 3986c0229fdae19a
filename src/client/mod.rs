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

//! Service catalog client seam.
//!
//! The admission plugins only need a handful of get/list calls, so the
//! client is a small synchronous trait. `fake::FakeClientset` implements it
//! in memory for tests.

pub mod fake;
mod fields;

pub use fields::{FieldSelector, Requirement, SelectorOperator};

use crate::api::servicecatalog::{
    ClusterServiceClass, ClusterServiceClassList, ClusterServicePlanList, ServiceClass,
    ServiceClassList, ServicePlanList,
};
use thiserror::Error;

pub const CLUSTER_SERVICE_CLASSES: &str = "clusterserviceclasses";
pub const CLUSTER_SERVICE_PLANS: &str = "clusterserviceplans";
pub const SERVICE_CLASSES: &str = "serviceclasses";
pub const SERVICE_PLANS: &str = "serviceplans";

/// Result type for client calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// ClientError represents a failed API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// NotFound indicates the requested object does not exist.
    #[error("{resource} \"{name}\" not found")]
    NotFound { resource: String, name: String },

    /// InvalidFieldSelector indicates a selector that could not be parsed or applied.
    #[error("invalid field selector {selector:?}: {reason}")]
    InvalidFieldSelector { selector: String, reason: String },

    /// Other carries any other failure reported by the server or transport.
    #[error("{0}")]
    Other(String),
}

impl ClientError {
    pub fn not_found(resource: impl Into<String>, name: impl Into<String>) -> Self {
        ClientError::NotFound {
            resource: resource.into(),
            name: name.into(),
        }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        ClientError::Other(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

/// ListOptions narrows a list call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub field_selector: Option<FieldSelector>,
}

impl ListOptions {
    pub fn with_field_selector(selector: FieldSelector) -> Self {
        Self {
            field_selector: Some(selector),
        }
    }
}

/// ServiceCatalogClient is the subset of the service catalog API the
/// admission plugins read from.
pub trait ServiceCatalogClient: Send + Sync {
    fn get_cluster_service_class(&self, name: &str) -> ClientResult<ClusterServiceClass>;

    fn list_cluster_service_classes(
        &self,
        options: &ListOptions,
    ) -> ClientResult<ClusterServiceClassList>;

    fn list_cluster_service_plans(
        &self,
        options: &ListOptions,
    ) -> ClientResult<ClusterServicePlanList>;

    fn get_service_class(&self, namespace: &str, name: &str) -> ClientResult<ServiceClass>;

    fn list_service_classes(
        &self,
        namespace: &str,
        options: &ListOptions,
    ) -> ClientResult<ServiceClassList>;

    fn list_service_plans(
        &self,
        namespace: &str,
        options: &ListOptions,
    ) -> ClientResult<ServicePlanList>;
}
