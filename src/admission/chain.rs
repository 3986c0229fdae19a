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

//! Chain of admission plugins run in order.

use super::attributes::Attributes;
use super::errors::AdmissionResult;
use super::interfaces::{Interface, MutationInterface, Operation, ValidationInterface};
use std::sync::Arc;

/// ChainAdmissionHandler runs a list of plugins in order. The first error
/// stops the chain.
#[derive(Default, Clone)]
pub struct ChainAdmissionHandler {
    plugins: Vec<Arc<dyn Interface>>,
}

impl ChainAdmissionHandler {
    pub fn new(plugins: Vec<Arc<dyn Interface>>) -> Self {
        Self { plugins }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl Interface for ChainAdmissionHandler {
    fn handles(&self, operation: Operation) -> bool {
        self.plugins.iter().any(|p| p.handles(operation))
    }

    fn as_mutation(&self) -> Option<&dyn MutationInterface> {
        Some(self)
    }

    fn as_validation(&self) -> Option<&dyn ValidationInterface> {
        Some(self)
    }
}

impl MutationInterface for ChainAdmissionHandler {
    fn admit(&self, attributes: &mut dyn Attributes) -> AdmissionResult<()> {
        let operation = attributes.get_operation();
        for plugin in &self.plugins {
            if !plugin.handles(operation) {
                continue;
            }
            if let Some(mutator) = plugin.as_mutation() {
                mutator.admit(attributes)?;
            }
        }
        Ok(())
    }
}

impl ValidationInterface for ChainAdmissionHandler {
    fn validate(&self, attributes: &dyn Attributes) -> AdmissionResult<()> {
        let operation = attributes.get_operation();
        for plugin in &self.plugins {
            if !plugin.handles(operation) {
                continue;
            }
            if let Some(validator) = plugin.as_validation() {
                validator.validate(attributes)?;
            }
        }
        Ok(())
    }
}
