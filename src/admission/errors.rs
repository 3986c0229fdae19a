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

//! Admission error types.

use super::attributes::{Attributes, GroupResource};
use std::fmt;
use thiserror::Error;

/// Result type for admission operations.
pub type AdmissionResult<T> = Result<T, AdmissionError>;

/// AdmissionError represents errors that can occur during admission.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// BadRequest indicates a malformed request.
    #[error("{0}")]
    BadRequest(String),

    /// Forbidden indicates the request is not allowed.
    #[error("{0}")]
    Forbidden(ForbiddenError),

    /// Aggregate represents multiple errors.
    #[error("{0}")]
    Aggregate(AggregateError),

    /// Internal represents an internal error.
    #[error("Internal error occurred: {0}")]
    Internal(String),

    /// NotFound indicates a resource was not found.
    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: String, name: String },
}

impl AdmissionError {
    /// Create a new BadRequest error.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AdmissionError::BadRequest(msg.into())
    }

    /// Create a Forbidden error for the object described by the attributes.
    pub fn forbidden(attributes: &dyn Attributes, reason: impl fmt::Display) -> Self {
        AdmissionError::Forbidden(ForbiddenError {
            resource: attributes.get_resource().group_resource(),
            name: attributes.get_name().to_string(),
            reason: reason.to_string(),
        })
    }

    /// Create an aggregate error from multiple errors.
    pub fn aggregate(errors: Vec<AdmissionError>) -> Self {
        AdmissionError::Aggregate(AggregateError { errors })
    }

    /// Create a NotFound error.
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        AdmissionError::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an Internal error.
    pub fn internal_error(msg: impl Into<String>) -> Self {
        AdmissionError::Internal(msg.into())
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, AdmissionError::Forbidden(_))
    }
}

/// ForbiddenError represents a forbidden admission error.
#[derive(Debug)]
pub struct ForbiddenError {
    pub resource: GroupResource,
    pub name: String,
    pub reason: String,
}

impl fmt::Display for ForbiddenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{} is forbidden: {}", self.resource, self.reason)
        } else {
            write!(
                f,
                "{} \"{}\" is forbidden: {}",
                self.resource, self.name, self.reason
            )
        }
    }
}

/// AggregateError represents multiple errors.
#[derive(Debug)]
pub struct AggregateError {
    pub errors: Vec<AdmissionError>,
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.len() == 1 {
            return write!(f, "{}", self.errors[0]);
        }
        let error_strings: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "[{}]", error_strings.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::attributes::AttributesRecord;
    use crate::admission::Operation;
    use crate::api::servicecatalog::ServiceInstance;

    #[test]
    fn test_forbidden_error_display() {
        let attrs = AttributesRecord::new_service_instance(
            ServiceInstance::new("instance", "dummy"),
            "v1beta1",
            Operation::Create,
        );
        let err = AdmissionError::forbidden(&attrs, "not yet ready to handle request");
        assert!(err.is_forbidden());
        assert_eq!(
            err.to_string(),
            "serviceinstances.servicecatalog.k8s.io \"instance\" is forbidden: not yet ready to handle request"
        );
    }

    #[test]
    fn test_aggregate_error_display() {
        let errors = vec![
            AdmissionError::bad_request("error 1"),
            AdmissionError::bad_request("error 2"),
        ];
        let err = AdmissionError::aggregate(errors);
        let msg = err.to_string();
        assert!(msg.starts_with('['));
        assert!(msg.ends_with(']'));
        assert!(msg.contains("error 1"));
        assert!(msg.contains("error 2"));

        let single = AdmissionError::aggregate(vec![AdmissionError::bad_request("only")]);
        assert_eq!(single.to_string(), "only");
    }

    #[test]
    fn test_internal_error_display() {
        let err = AdmissionError::internal_error("boom");
        assert_eq!(err.to_string(), "Internal error occurred: boom");
    }
}
