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

//! DefaultServicePlan admission controller.
//!
//! When a ServiceInstance is created with a class but no plan, this
//! controller looks up the plans of that class. If the class has exactly
//! one plan, that plan is filled in, in the same style the class was
//! referenced with (external name, external id or k8s name). A class with
//! no plans, or more than one, is rejected. Requests that already name a
//! plan are let through untouched for the controller to resolve.

use crate::admission::{
    AdmissionError, AdmissionResult, Attributes, Handler, Interface, MutationInterface, Operation,
    Plugins, WantsServiceCatalogClient, DEFAULT_READY_TIMEOUT,
};
use crate::api::servicecatalog::{
    self, ClusterServiceClass, PlanReference, ServiceClass, ServiceInstance,
    FIELD_CLUSTER_SERVICE_CLASS_REF_NAME, FIELD_SERVICE_CLASS_REF_NAME, GROUP_NAME,
};
use crate::client::{
    ClientError, ClientResult, FieldSelector, ListOptions, ServiceCatalogClient,
    CLUSTER_SERVICE_CLASSES, SERVICE_CLASSES,
};
use std::io::Read;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

pub const PLUGIN_NAME: &str = "DefaultServicePlan";

pub fn register(plugins: &Plugins) {
    plugins.register(PLUGIN_NAME, |_config: Option<&mut dyn Read>| {
        Ok(Arc::new(DefaultServicePlan::new()) as Arc<dyn Interface>)
    });
}

type SharedClient = Arc<RwLock<Option<Arc<dyn ServiceCatalogClient>>>>;

/// DefaultServicePlan is an implementation of admission.Interface.
pub struct DefaultServicePlan {
    handler: Handler,
    client: SharedClient,
}

impl DefaultServicePlan {
    pub fn new() -> Self {
        Self::with_ready_timeout(DEFAULT_READY_TIMEOUT)
    }

    /// Create a plugin that gives up waiting for its client after `timeout`.
    pub fn with_ready_timeout(timeout: Duration) -> Self {
        let client: SharedClient = Arc::new(RwLock::new(None));
        let handler = Handler::new(&[Operation::Create]).with_ready_timeout(timeout);

        let ready = client.clone();
        handler.set_ready_func(Arc::new(move || {
            ready.read().expect("client lock poisoned").is_some()
        }));

        Self { handler, client }
    }

    fn client(&self) -> Option<Arc<dyn ServiceCatalogClient>> {
        self.client.read().expect("client lock poisoned").clone()
    }

    fn default_cluster_service_plan(
        &self,
        client: &dyn ServiceCatalogClient,
        attributes: &dyn Attributes,
        reference: &PlanReference,
    ) -> AdmissionResult<PlanReference> {
        let class = match get_cluster_service_class(client, reference) {
            Ok(class) => class,
            Err(e) if e.is_not_found() => {
                let msg = format!(
                    "ClusterServiceClass {} does not exist, can not figure out the default ClusterServicePlan.",
                    reference.class_display()
                );
                debug!("{}", msg);
                return Err(AdmissionError::forbidden(attributes, msg));
            }
            Err(e) => return Err(AdmissionError::forbidden(attributes, e)),
        };

        let selector =
            FieldSelector::one_term_equal(FIELD_CLUSTER_SERVICE_CLASS_REF_NAME, &class.metadata.name);
        let plans = match client.list_cluster_service_plans(&ListOptions::with_field_selector(selector)) {
            Ok(list) => list.items,
            Err(e) => {
                let msg = format!(
                    "Error listing ClusterServicePlans for ClusterServiceClass (K8S: {} ExternalName: {}) - retry and specify desired ClusterServicePlan",
                    class.metadata.name, class.spec.common.external_name
                );
                warn!(
                    error = %e,
                    instance = %instance_key(attributes),
                    "{}", msg
                );
                return Err(AdmissionError::forbidden(attributes, msg));
            }
        };

        let plan = single_plan(attributes, plans, || {
            (
                format!(
                    "no ClusterServicePlans found at all for ClusterServiceClass {:?}",
                    class.spec.common.external_name
                ),
                format!(
                    "ClusterServiceClass (K8S: {} ExternalName: {}) has more than one plan, PlanName must be specified",
                    class.metadata.name, class.spec.common.external_name
                ),
            )
        })?;
        debug!(
            instance = %instance_key(attributes),
            "Using default plan {:?} (K8S: {:?}) for ClusterServiceClass {:?}",
            plan.spec.common.external_name,
            plan.metadata.name,
            class.spec.common.external_name
        );

        let mut defaulted = reference.clone();
        if !reference.cluster_service_class_external_name.is_empty() {
            defaulted.cluster_service_plan_external_name = plan.spec.common.external_name;
        } else if !reference.cluster_service_class_external_id.is_empty() {
            defaulted.cluster_service_plan_external_id = plan.spec.common.external_id;
        } else {
            defaulted.cluster_service_plan_name = plan.metadata.name;
        }
        Ok(defaulted)
    }

    fn default_service_plan(
        &self,
        client: &dyn ServiceCatalogClient,
        attributes: &dyn Attributes,
        reference: &PlanReference,
    ) -> AdmissionResult<PlanReference> {
        let namespace = attributes.get_namespace();
        let class = match get_service_class(client, namespace, reference) {
            Ok(class) => class,
            Err(e) if e.is_not_found() => {
                let msg = format!(
                    "ServiceClass {} does not exist, can not figure out the default ServicePlan.",
                    reference.class_display()
                );
                debug!("{}", msg);
                return Err(AdmissionError::forbidden(attributes, msg));
            }
            Err(e) => return Err(AdmissionError::forbidden(attributes, e)),
        };

        let selector = FieldSelector::one_term_equal(FIELD_SERVICE_CLASS_REF_NAME, &class.metadata.name);
        let plans = match client.list_service_plans(namespace, &ListOptions::with_field_selector(selector)) {
            Ok(list) => list.items,
            Err(e) => {
                let msg = format!(
                    "Error listing ServicePlans for ServiceClass (K8S: {} ExternalName: {}) - retry and specify desired ServicePlan",
                    class.metadata.name, class.spec.common.external_name
                );
                warn!(
                    error = %e,
                    instance = %instance_key(attributes),
                    "{}", msg
                );
                return Err(AdmissionError::forbidden(attributes, msg));
            }
        };

        let plan = single_plan(attributes, plans, || {
            (
                format!(
                    "no ServicePlans found at all for ServiceClass {:?}",
                    class.spec.common.external_name
                ),
                format!(
                    "ServiceClass (K8S: {} ExternalName: {}) has more than one plan, PlanName must be specified",
                    class.metadata.name, class.spec.common.external_name
                ),
            )
        })?;
        debug!(
            instance = %instance_key(attributes),
            "Using default plan {:?} (K8S: {:?}) for ServiceClass {:?}",
            plan.spec.common.external_name,
            plan.metadata.name,
            class.spec.common.external_name
        );

        let mut defaulted = reference.clone();
        if !reference.service_class_external_name.is_empty() {
            defaulted.service_plan_external_name = plan.spec.common.external_name;
        } else if !reference.service_class_external_id.is_empty() {
            defaulted.service_plan_external_id = plan.spec.common.external_id;
        } else {
            defaulted.service_plan_name = plan.metadata.name;
        }
        Ok(defaulted)
    }
}

impl Default for DefaultServicePlan {
    fn default() -> Self {
        Self::new()
    }
}

fn instance_key(attributes: &dyn Attributes) -> String {
    format!("{}/{}", attributes.get_namespace(), attributes.get_name())
}

/// Picks the only plan. The closure renders the (none, several) messages.
fn single_plan<P>(
    attributes: &dyn Attributes,
    mut plans: Vec<P>,
    messages: impl FnOnce() -> (String, String),
) -> AdmissionResult<P> {
    match plans.len() {
        1 => Ok(plans.remove(0)),
        0 => Err(AdmissionError::forbidden(attributes, messages().0)),
        _ => Err(AdmissionError::forbidden(attributes, messages().1)),
    }
}

fn get_cluster_service_class(
    client: &dyn ServiceCatalogClient,
    reference: &PlanReference,
) -> ClientResult<ClusterServiceClass> {
    if !reference.cluster_service_class_name.is_empty() {
        return client.get_cluster_service_class(&reference.cluster_service_class_name);
    }

    let field = reference.cluster_service_class_filter_field_name();
    let value = reference.specified_cluster_service_class();
    let options = ListOptions::with_field_selector(FieldSelector::one_term_equal(field, value));
    let mut classes = client.list_cluster_service_classes(&options).map_err(|e| {
        warn!(error = %e, "Listing ClusterServiceClasses failed");
        e
    })?;
    if classes.items.len() == 1 {
        return Ok(classes.items.remove(0));
    }

    debug!(
        "Could not find a single ClusterServiceClass with {} = {:?}, found {}",
        field,
        value,
        classes.items.len()
    );
    Err(ClientError::not_found(CLUSTER_SERVICE_CLASSES, value))
}

fn get_service_class(
    client: &dyn ServiceCatalogClient,
    namespace: &str,
    reference: &PlanReference,
) -> ClientResult<ServiceClass> {
    if !reference.service_class_name.is_empty() {
        return client.get_service_class(namespace, &reference.service_class_name);
    }

    let field = reference.service_class_filter_field_name();
    let value = reference.specified_service_class();
    let options = ListOptions::with_field_selector(FieldSelector::one_term_equal(field, value));
    let mut classes = client.list_service_classes(namespace, &options).map_err(|e| {
        warn!(error = %e, namespace, "Listing ServiceClasses failed");
        e
    })?;
    if classes.items.len() == 1 {
        return Ok(classes.items.remove(0));
    }

    debug!(
        "Could not find a single ServiceClass with {} = {:?} in namespace {:?}, found {}",
        field,
        value,
        namespace,
        classes.items.len()
    );
    Err(ClientError::not_found(SERVICE_CLASSES, value))
}

impl Interface for DefaultServicePlan {
    fn handles(&self, operation: Operation) -> bool {
        self.handler.handles(operation)
    }

    fn as_mutation(&self) -> Option<&dyn MutationInterface> {
        Some(self)
    }

    fn as_wants_service_catalog_client(&self) -> Option<&dyn WantsServiceCatalogClient> {
        Some(self)
    }

    fn validate_initialization(&self) -> AdmissionResult<()> {
        if self.client().is_none() {
            return Err(AdmissionError::internal_error("missing service catalog client"));
        }
        Ok(())
    }
}

impl WantsServiceCatalogClient for DefaultServicePlan {
    fn set_service_catalog_client(&self, client: Arc<dyn ServiceCatalogClient>) {
        *self.client.write().expect("client lock poisoned") = Some(client);
    }
}

impl MutationInterface for DefaultServicePlan {
    fn admit(&self, attributes: &mut dyn Attributes) -> AdmissionResult<()> {
        // we need to wait for our caches to warm
        let client = self.handler.wait_for_ready().then(|| self.client()).flatten();
        let Some(client) = client else {
            return Err(AdmissionError::forbidden(
                &*attributes,
                "not yet ready to handle request",
            ));
        };

        let resource = attributes.get_resource();
        if resource.group != GROUP_NAME
            || resource.group_resource() != servicecatalog::resource("serviceinstances")
        {
            return Ok(());
        }

        let reference = match attributes
            .get_object()
            .and_then(|obj| obj.as_any().downcast_ref::<ServiceInstance>())
        {
            Some(instance) => instance.spec.plan_reference.clone(),
            None => {
                return Err(AdmissionError::bad_request(
                    "Resource was marked with kind Instance but was unable to be converted",
                ));
            }
        };

        // A named plan is resolved later by the controller.
        if reference.cluster_service_plan_specified() || reference.service_plan_specified() {
            return Ok(());
        }

        let defaulted = if reference.cluster_service_class_specified() {
            self.default_cluster_service_plan(client.as_ref(), &*attributes, &reference)?
        } else if reference.service_class_specified() {
            self.default_service_plan(client.as_ref(), &*attributes, &reference)?
        } else {
            return Err(AdmissionError::internal_error(
                "class not specified on ServiceInstance, cannot choose default plan",
            ));
        };

        if let Some(instance) = attributes
            .get_object_mut()
            .and_then(|obj| obj.as_any_mut().downcast_mut::<ServiceInstance>())
        {
            instance.spec.plan_reference = defaulted;
        }
        Ok(())
    }
}
