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

//! Core admission controller interfaces.

use super::attributes::Attributes;
use super::errors::{AdmissionError, AdmissionResult};
use super::initializer::WantsServiceCatalogClient;
use std::fmt;
use std::str::FromStr;

/// Operation is the type of resource operation being checked for admission control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create indicates a resource creation operation.
    Create,
    /// Update indicates a resource update operation.
    Update,
    /// Delete indicates a resource deletion operation.
    Delete,
    /// Connect indicates a resource connect operation (e.g., pod exec).
    Connect,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "CREATE"),
            Operation::Update => write!(f, "UPDATE"),
            Operation::Delete => write!(f, "DELETE"),
            Operation::Connect => write!(f, "CONNECT"),
        }
    }
}

impl FromStr for Operation {
    type Err = AdmissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CREATE" => Ok(Operation::Create),
            "UPDATE" => Ok(Operation::Update),
            "DELETE" => Ok(Operation::Delete),
            "CONNECT" => Ok(Operation::Connect),
            _ => Err(AdmissionError::bad_request(format!(
                "unknown admission operation {:?}",
                s
            ))),
        }
    }
}

/// Interface is an abstract, pluggable interface for Admission Control decisions.
///
/// The `as_*` accessors stand in for the type assertions an admission chain
/// performs on a plugin; plugins override the ones they implement.
pub trait Interface: Send + Sync {
    /// Returns true if this admission controller can handle the given operation.
    fn handles(&self, operation: Operation) -> bool;

    fn as_mutation(&self) -> Option<&dyn MutationInterface> {
        None
    }

    fn as_validation(&self) -> Option<&dyn ValidationInterface> {
        None
    }

    fn as_wants_service_catalog_client(&self) -> Option<&dyn WantsServiceCatalogClient> {
        None
    }

    /// Reports whether every dependency the plugin needs has been injected.
    fn validate_initialization(&self) -> AdmissionResult<()> {
        Ok(())
    }
}

/// MutationInterface is an interface for admission plugins that can modify objects.
pub trait MutationInterface: Interface {
    /// Admit makes an admission decision based on the request attributes.
    /// It may modify the object in the attributes.
    fn admit(&self, attributes: &mut dyn Attributes) -> AdmissionResult<()>;
}

/// ValidationInterface is an interface for admission plugins that validate objects.
pub trait ValidationInterface: Interface {
    /// Validate makes an admission decision based on the request attributes.
    /// It is NOT allowed to modify the object.
    fn validate(&self, attributes: &dyn Attributes) -> AdmissionResult<()>;
}

/// Runs the plugin's initialization check.
pub fn validate_initialization(plugin: &dyn Interface) -> AdmissionResult<()> {
    plugin.validate_initialization()
}
