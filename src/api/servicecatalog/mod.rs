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

//! Service catalog API types (classes, plans and instances).

use super::{ApiObject, FieldLabels, ListMeta, ObjectMeta};
use crate::admission::attributes::{GroupKind, GroupResource};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// GroupName is the API group of all service catalog resources.
pub const GROUP_NAME: &str = "servicecatalog.k8s.io";

/// Field label of a class's external name.
pub const FIELD_EXTERNAL_NAME: &str = "spec.externalName";

/// Field label of a class's external id.
pub const FIELD_EXTERNAL_ID: &str = "spec.externalID";

/// Field label of the class a cluster-scoped plan belongs to.
pub const FIELD_CLUSTER_SERVICE_CLASS_REF_NAME: &str = "spec.clusterServiceClassRef.name";

/// Field label of the class a namespaced plan belongs to.
pub const FIELD_SERVICE_CLASS_REF_NAME: &str = "spec.serviceClassRef.name";

/// Resource takes an unqualified resource and returns a group-qualified GroupResource.
pub fn resource(resource: &str) -> GroupResource {
    GroupResource::new(GROUP_NAME, resource)
}

/// Kind takes an unqualified kind and returns a group-qualified GroupKind.
pub fn kind(kind: &str) -> GroupKind {
    GroupKind::new(GROUP_NAME, kind)
}

/// PlanReference defines the user specification for the desired
/// (Cluster)ServicePlan and (Cluster)ServiceClass. Exactly one style of
/// reference (external name, external id or k8s name) is expected per scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReference {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_service_class_external_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_service_plan_external_name: String,
    #[serde(
        default,
        rename = "clusterServiceClassExternalID",
        skip_serializing_if = "String::is_empty"
    )]
    pub cluster_service_class_external_id: String,
    #[serde(
        default,
        rename = "clusterServicePlanExternalID",
        skip_serializing_if = "String::is_empty"
    )]
    pub cluster_service_plan_external_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_service_class_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_service_plan_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_class_external_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_plan_external_name: String,
    #[serde(
        default,
        rename = "serviceClassExternalID",
        skip_serializing_if = "String::is_empty"
    )]
    pub service_class_external_id: String,
    #[serde(
        default,
        rename = "servicePlanExternalID",
        skip_serializing_if = "String::is_empty"
    )]
    pub service_plan_external_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_class_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_plan_name: String,
}

impl PlanReference {
    pub fn cluster_service_class_specified(&self) -> bool {
        !self.cluster_service_class_external_name.is_empty()
            || !self.cluster_service_class_external_id.is_empty()
            || !self.cluster_service_class_name.is_empty()
    }

    pub fn cluster_service_plan_specified(&self) -> bool {
        !self.cluster_service_plan_external_name.is_empty()
            || !self.cluster_service_plan_external_id.is_empty()
            || !self.cluster_service_plan_name.is_empty()
    }

    pub fn service_class_specified(&self) -> bool {
        !self.service_class_external_name.is_empty()
            || !self.service_class_external_id.is_empty()
            || !self.service_class_name.is_empty()
    }

    pub fn service_plan_specified(&self) -> bool {
        !self.service_plan_external_name.is_empty()
            || !self.service_plan_external_id.is_empty()
            || !self.service_plan_name.is_empty()
    }

    /// Returns the user-specified cluster class value: the external name,
    /// else the external id, else the k8s name.
    pub fn specified_cluster_service_class(&self) -> &str {
        first_non_empty(&[
            &self.cluster_service_class_external_name,
            &self.cluster_service_class_external_id,
            &self.cluster_service_class_name,
        ])
    }

    /// Returns the user-specified namespaced class value.
    pub fn specified_service_class(&self) -> &str {
        first_non_empty(&[
            &self.service_class_external_name,
            &self.service_class_external_id,
            &self.service_class_name,
        ])
    }

    /// Returns the field label to filter cluster classes by, or an empty
    /// string when the class is referenced by its k8s name.
    pub fn cluster_service_class_filter_field_name(&self) -> &'static str {
        if !self.cluster_service_class_external_name.is_empty() {
            FIELD_EXTERNAL_NAME
        } else if !self.cluster_service_class_external_id.is_empty() {
            FIELD_EXTERNAL_ID
        } else {
            ""
        }
    }

    /// Returns the field label to filter namespaced classes by.
    pub fn service_class_filter_field_name(&self) -> &'static str {
        if !self.service_class_external_name.is_empty() {
            FIELD_EXTERNAL_NAME
        } else if !self.service_class_external_id.is_empty() {
            FIELD_EXTERNAL_ID
        } else {
            ""
        }
    }

    /// Renders only the class part of the reference.
    pub fn class_display(&self) -> ClassDisplay<'_> {
        ClassDisplay(self)
    }

    fn fields(&self) -> [(&'static str, &str); 12] {
        [
            (
                "ClusterServiceClassExternalName",
                self.cluster_service_class_external_name.as_str(),
            ),
            (
                "ClusterServicePlanExternalName",
                self.cluster_service_plan_external_name.as_str(),
            ),
            (
                "ClusterServiceClassExternalID",
                self.cluster_service_class_external_id.as_str(),
            ),
            (
                "ClusterServicePlanExternalID",
                self.cluster_service_plan_external_id.as_str(),
            ),
            ("ClusterServiceClassName", self.cluster_service_class_name.as_str()),
            ("ClusterServicePlanName", self.cluster_service_plan_name.as_str()),
            ("ServiceClassExternalName", self.service_class_external_name.as_str()),
            ("ServicePlanExternalName", self.service_plan_external_name.as_str()),
            ("ServiceClassExternalID", self.service_class_external_id.as_str()),
            ("ServicePlanExternalID", self.service_plan_external_id.as_str()),
            ("ServiceClassName", self.service_class_name.as_str()),
            ("ServicePlanName", self.service_plan_name.as_str()),
        ]
    }
}

fn first_non_empty<'a>(values: &[&'a String]) -> &'a str {
    values
        .iter()
        .copied()
        .find(|v| !v.is_empty())
        .map(String::as_str)
        .unwrap_or("")
}

fn write_fields<'a>(
    f: &mut fmt::Formatter<'_>,
    fields: impl Iterator<Item = (&'static str, &'a str)>,
) -> fmt::Result {
    let rendered: Vec<String> = fields
        .filter(|(_, value)| !value.is_empty())
        .map(|(label, value)| format!("{}:{:?}", label, value))
        .collect();
    write!(f, "{{{}}}", rendered.join(", "))
}

impl fmt::Display for PlanReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fields(f, self.fields().into_iter())
    }
}

/// ClassDisplay formats the class fields of a PlanReference.
pub struct ClassDisplay<'a>(&'a PlanReference);

impl fmt::Display for ClassDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fields(
            f,
            self.0
                .fields()
                .into_iter()
                .filter(|(label, _)| label.contains("Class")),
        )
    }
}

/// ClusterObjectReference references a cluster-scoped object by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterObjectReference {
    #[serde(default)]
    pub name: String,
}

/// LocalObjectReference references an object in the same namespace by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalObjectReference {
    #[serde(default)]
    pub name: String,
}

/// CommonServiceClassSpec holds the fields shared by ClusterServiceClass and ServiceClass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonServiceClassSpec {
    /// ExternalName is the name of this class as known to the broker.
    #[serde(default)]
    pub external_name: String,
    /// ExternalID is the identity of this class as known to the broker.
    #[serde(default, rename = "externalID")]
    pub external_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub bindable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterServiceClassSpec {
    #[serde(flatten)]
    pub common: CommonServiceClassSpec,
    #[serde(default)]
    pub cluster_service_broker_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceClassSpec {
    #[serde(flatten)]
    pub common: CommonServiceClassSpec,
    #[serde(default)]
    pub service_broker_name: String,
}

/// ClusterServiceClass is a cluster-scoped offering of a broker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterServiceClass {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ClusterServiceClassSpec,
}

impl ClusterServiceClass {
    /// Create a class whose k8s name and external id are both `id`.
    pub fn new(id: &str, external_name: &str) -> Self {
        Self {
            metadata: ObjectMeta::named(id),
            spec: ClusterServiceClassSpec {
                common: CommonServiceClassSpec {
                    external_id: id.to_string(),
                    external_name: external_name.to_string(),
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }
}

/// ServiceClass is a namespaced offering of a broker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceClass {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ServiceClassSpec,
}

impl ServiceClass {
    pub fn new(namespace: &str, id: &str, external_name: &str) -> Self {
        Self {
            metadata: ObjectMeta::namespaced(namespace, id),
            spec: ServiceClassSpec {
                common: CommonServiceClassSpec {
                    external_id: id.to_string(),
                    external_name: external_name.to_string(),
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }
}

/// CommonServicePlanSpec holds the fields shared by ClusterServicePlan and ServicePlan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonServicePlanSpec {
    #[serde(default)]
    pub external_name: String,
    #[serde(default, rename = "externalID")]
    pub external_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub free: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterServicePlanSpec {
    #[serde(flatten)]
    pub common: CommonServicePlanSpec,
    #[serde(default)]
    pub cluster_service_broker_name: String,
    #[serde(default)]
    pub cluster_service_class_ref: ClusterObjectReference,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePlanSpec {
    #[serde(flatten)]
    pub common: CommonServicePlanSpec,
    #[serde(default)]
    pub service_broker_name: String,
    #[serde(default)]
    pub service_class_ref: LocalObjectReference,
}

/// ClusterServicePlan is a tier of a ClusterServiceClass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterServicePlan {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ClusterServicePlanSpec,
}

impl ClusterServicePlan {
    pub fn new(name: &str, external_name: &str, external_id: &str, class_name: &str) -> Self {
        Self {
            metadata: ObjectMeta::named(name),
            spec: ClusterServicePlanSpec {
                common: CommonServicePlanSpec {
                    external_name: external_name.to_string(),
                    external_id: external_id.to_string(),
                    ..Default::default()
                },
                cluster_service_class_ref: ClusterObjectReference {
                    name: class_name.to_string(),
                },
                ..Default::default()
            },
        }
    }
}

/// ServicePlan is a tier of a namespaced ServiceClass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePlan {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ServicePlanSpec,
}

impl ServicePlan {
    pub fn new(
        namespace: &str,
        name: &str,
        external_name: &str,
        external_id: &str,
        class_name: &str,
    ) -> Self {
        Self {
            metadata: ObjectMeta::namespaced(namespace, name),
            spec: ServicePlanSpec {
                common: CommonServicePlanSpec {
                    external_name: external_name.to_string(),
                    external_id: external_id.to_string(),
                    ..Default::default()
                },
                service_class_ref: LocalObjectReference {
                    name: class_name.to_string(),
                },
                ..Default::default()
            },
        }
    }
}

macro_rules! list_type {
    ($(#[$doc:meta])* $list:ident, $item:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $list {
            #[serde(default)]
            pub metadata: ListMeta,
            #[serde(default)]
            pub items: Vec<$item>,
        }

        impl $list {
            pub fn new(resource_version: &str, items: Vec<$item>) -> Self {
                Self {
                    metadata: ListMeta::with_resource_version(resource_version),
                    items,
                }
            }
        }
    };
}

list_type!(
    /// ClusterServiceClassList is a list of ClusterServiceClasses.
    ClusterServiceClassList,
    ClusterServiceClass
);
list_type!(
    /// ClusterServicePlanList is a list of ClusterServicePlans.
    ClusterServicePlanList,
    ClusterServicePlan
);
list_type!(
    /// ServiceClassList is a list of ServiceClasses.
    ServiceClassList,
    ServiceClass
);
list_type!(
    /// ServicePlanList is a list of ServicePlans.
    ServicePlanList,
    ServicePlan
);

impl FieldLabels for ClusterServiceClass {
    fn field_label(&self, field: &str) -> Option<&str> {
        match field {
            "metadata.name" => Some(&self.metadata.name),
            FIELD_EXTERNAL_NAME => Some(&self.spec.common.external_name),
            FIELD_EXTERNAL_ID => Some(&self.spec.common.external_id),
            "spec.clusterServiceBrokerName" => Some(&self.spec.cluster_service_broker_name),
            _ => None,
        }
    }
}

impl FieldLabels for ServiceClass {
    fn field_label(&self, field: &str) -> Option<&str> {
        match field {
            "metadata.name" => Some(&self.metadata.name),
            "metadata.namespace" => Some(&self.metadata.namespace),
            FIELD_EXTERNAL_NAME => Some(&self.spec.common.external_name),
            FIELD_EXTERNAL_ID => Some(&self.spec.common.external_id),
            "spec.serviceBrokerName" => Some(&self.spec.service_broker_name),
            _ => None,
        }
    }
}

impl FieldLabels for ClusterServicePlan {
    fn field_label(&self, field: &str) -> Option<&str> {
        match field {
            "metadata.name" => Some(&self.metadata.name),
            FIELD_EXTERNAL_NAME => Some(&self.spec.common.external_name),
            FIELD_EXTERNAL_ID => Some(&self.spec.common.external_id),
            "spec.clusterServiceBrokerName" => Some(&self.spec.cluster_service_broker_name),
            FIELD_CLUSTER_SERVICE_CLASS_REF_NAME => Some(&self.spec.cluster_service_class_ref.name),
            _ => None,
        }
    }
}

impl FieldLabels for ServicePlan {
    fn field_label(&self, field: &str) -> Option<&str> {
        match field {
            "metadata.name" => Some(&self.metadata.name),
            "metadata.namespace" => Some(&self.metadata.namespace),
            FIELD_EXTERNAL_NAME => Some(&self.spec.common.external_name),
            FIELD_EXTERNAL_ID => Some(&self.spec.common.external_id),
            "spec.serviceBrokerName" => Some(&self.spec.service_broker_name),
            FIELD_SERVICE_CLASS_REF_NAME => Some(&self.spec.service_class_ref.name),
            _ => None,
        }
    }
}

/// ServiceInstanceSpec is the user-requested state of a ServiceInstance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceSpec {
    #[serde(flatten)]
    pub plan_reference: PlanReference,
    /// ExternalID is the identity of this instance as known to the broker.
    #[serde(default, rename = "externalID", skip_serializing_if = "String::is_empty")]
    pub external_id: String,
    /// Parameters are passed through to the broker untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// ServiceInstance represents a provisioned instance of a service plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ServiceInstanceSpec,
}

impl ServiceInstance {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            metadata: ObjectMeta::namespaced(namespace, name),
            spec: ServiceInstanceSpec::default(),
        }
    }

    /// Create an instance requesting the given plan reference.
    pub fn with_plan_reference(name: &str, namespace: &str, plan_reference: PlanReference) -> Self {
        let mut instance = Self::new(name, namespace);
        instance.spec.plan_reference = plan_reference;
        instance
    }
}

impl ApiObject for ServiceInstance {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn kind(&self) -> &str {
        "ServiceInstance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_reference_specified() {
        let pr = PlanReference {
            cluster_service_class_external_id: "foo".to_string(),
            ..Default::default()
        };
        assert!(pr.cluster_service_class_specified());
        assert!(!pr.cluster_service_plan_specified());
        assert!(!pr.service_class_specified());
        assert!(!pr.service_plan_specified());

        let pr = PlanReference {
            service_class_name: "foo".to_string(),
            service_plan_name: "bar".to_string(),
            ..Default::default()
        };
        assert!(!pr.cluster_service_class_specified());
        assert!(pr.service_class_specified());
        assert!(pr.service_plan_specified());
    }

    #[test]
    fn test_specified_class_and_filter_field() {
        let cases = [
            (
                PlanReference {
                    cluster_service_class_external_name: "ext".to_string(),
                    ..Default::default()
                },
                "ext",
                FIELD_EXTERNAL_NAME,
            ),
            (
                PlanReference {
                    cluster_service_class_external_id: "id".to_string(),
                    ..Default::default()
                },
                "id",
                FIELD_EXTERNAL_ID,
            ),
            (
                PlanReference {
                    cluster_service_class_name: "k8s".to_string(),
                    ..Default::default()
                },
                "k8s",
                "",
            ),
        ];
        for (pr, value, field) in cases {
            assert_eq!(pr.specified_cluster_service_class(), value);
            assert_eq!(pr.cluster_service_class_filter_field_name(), field);
        }

        let pr = PlanReference {
            service_class_external_id: "ns-id".to_string(),
            ..Default::default()
        };
        assert_eq!(pr.specified_service_class(), "ns-id");
        assert_eq!(pr.service_class_filter_field_name(), FIELD_EXTERNAL_ID);
    }

    #[test]
    fn test_plan_reference_display() {
        let pr = PlanReference {
            cluster_service_class_external_name: "foo".to_string(),
            cluster_service_plan_external_name: "bar".to_string(),
            ..Default::default()
        };
        assert_eq!(
            pr.to_string(),
            r#"{ClusterServiceClassExternalName:"foo", ClusterServicePlanExternalName:"bar"}"#
        );
        assert_eq!(
            pr.class_display().to_string(),
            r#"{ClusterServiceClassExternalName:"foo"}"#
        );
        assert_eq!(PlanReference::default().to_string(), "{}");
    }

    #[test]
    fn test_service_instance_json() {
        let instance: ServiceInstance = serde_json::from_value(serde_json::json!({
            "metadata": {"name": "instance", "namespace": "dummy"},
            "spec": {
                "clusterServiceClassExternalID": "foo",
                "parameters": {"size": 3}
            }
        }))
        .unwrap();

        assert_eq!(instance.metadata.name, "instance");
        assert_eq!(instance.spec.plan_reference.cluster_service_class_external_id, "foo");
        assert_eq!(instance.spec.parameters, Some(serde_json::json!({"size": 3})));

        let value = serde_json::to_value(&instance).unwrap();
        assert_eq!(value["spec"]["clusterServiceClassExternalID"], "foo");
        assert!(value["spec"].get("clusterServicePlanName").is_none());
    }

    #[test]
    fn test_plan_field_labels() {
        let plan = ClusterServicePlan::new("bar-id", "bar", "12345", "test-serviceclass");
        assert_eq!(
            plan.field_label(FIELD_CLUSTER_SERVICE_CLASS_REF_NAME),
            Some("test-serviceclass")
        );
        assert_eq!(plan.field_label(FIELD_EXTERNAL_ID), Some("12345"));
        assert_eq!(plan.field_label("spec.unknown"), None);

        let plan = ServicePlan::new("ns", "bar-id", "bar", "12345", "test-serviceclass");
        assert_eq!(plan.field_label(FIELD_SERVICE_CLASS_REF_NAME), Some("test-serviceclass"));
        assert_eq!(plan.field_label("metadata.namespace"), Some("ns"));
    }

    #[test]
    fn test_group_qualified_identifiers() {
        assert_eq!(resource("serviceinstances").to_string(), "serviceinstances.servicecatalog.k8s.io");
        assert_eq!(kind("ServiceInstance").group, GROUP_NAME);
    }
}
