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

//! In-memory ServiceCatalogClient for tests.
//!
//! Calls are recorded as [`Action`]s and answered by a chain of reactors.
//! Each reactor is registered for a verb and a resource (`"*"` matches any).
//! The first reactor that handles an action decides the result.
//! [`FakeClientset::with_objects`] appends an object tracker that serves
//! get and list calls from memory, honoring namespaces and field selectors.

use super::{
    ClientError, ClientResult, FieldSelector, ListOptions, ServiceCatalogClient,
    CLUSTER_SERVICE_CLASSES, CLUSTER_SERVICE_PLANS, SERVICE_CLASSES, SERVICE_PLANS,
};
use crate::api::servicecatalog::{
    ClusterServiceClass, ClusterServiceClassList, ClusterServicePlan, ClusterServicePlanList,
    ServiceClass, ServiceClassList, ServicePlan, ServicePlanList,
};
use crate::api::{FieldLabels, ObjectMeta};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

/// Object is anything a reactor can hand back.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    ClusterServiceClass(ClusterServiceClass),
    ClusterServiceClassList(ClusterServiceClassList),
    ClusterServicePlan(ClusterServicePlan),
    ClusterServicePlanList(ClusterServicePlanList),
    ServiceClass(ServiceClass),
    ServiceClassList(ServiceClassList),
    ServicePlan(ServicePlan),
    ServicePlanList(ServicePlanList),
}

macro_rules! object_variants {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Object {
                fn from(value: $variant) -> Self {
                    Object::$variant(value)
                }
            }

            impl TryFrom<Object> for $variant {
                type Error = Object;

                fn try_from(object: Object) -> Result<Self, Object> {
                    match object {
                        Object::$variant(value) => Ok(value),
                        other => Err(other),
                    }
                }
            }
        )*

        impl Object {
            pub fn kind(&self) -> &'static str {
                match self {
                    $(Object::$variant(_) => stringify!($variant),)*
                }
            }
        }
    };
}

object_variants!(
    ClusterServiceClass,
    ClusterServiceClassList,
    ClusterServicePlan,
    ClusterServicePlanList,
    ServiceClass,
    ServiceClassList,
    ServicePlan,
    ServicePlanList,
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetAction {
    pub resource: String,
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListAction {
    pub resource: String,
    pub namespace: String,
    pub field_selector: Option<FieldSelector>,
}

/// Action records one call made against the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Get(GetAction),
    List(ListAction),
}

impl Action {
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Get(_) => "get",
            Action::List(_) => "list",
        }
    }

    pub fn resource(&self) -> &str {
        match self {
            Action::Get(a) => &a.resource,
            Action::List(a) => &a.resource,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            Action::Get(a) => &a.namespace,
            Action::List(a) => &a.namespace,
        }
    }

    pub fn matches(&self, verb: &str, resource: &str) -> bool {
        (verb == "*" || verb == self.verb()) && (resource == "*" || resource == self.resource())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.verb(), self.resource())?;
        match self {
            Action::Get(a) => write!(f, ":{}", a.name)?,
            Action::List(a) => {
                if let Some(selector) = &a.field_selector {
                    write!(f, ":{}", selector)?;
                }
            }
        }
        if !self.namespace().is_empty() {
            write!(f, " (namespace {})", self.namespace())?;
        }
        Ok(())
    }
}

/// ReactionFunc answers an action. `None` means "not handled, ask the next reactor".
pub type ReactionFunc = Box<dyn Fn(&Action) -> Option<ClientResult<Object>> + Send + Sync>;

struct Reactor {
    verb: String,
    resource: String,
    reaction: ReactionFunc,
}

/// FakeClientset records every call and answers it from its reactors.
#[derive(Default)]
pub struct FakeClientset {
    reactors: RwLock<Vec<Reactor>>,
    actions: Mutex<Vec<Action>>,
}

impl FakeClientset {
    /// A fake with no reactors: every call fails until one is added.
    pub fn new() -> Self {
        Self::default()
    }

    /// A fake backed by an object tracker seeded with `objects`.
    pub fn with_objects(objects: impl IntoIterator<Item = Object>) -> Self {
        let tracker = Arc::new(ObjectTracker::default());
        for object in objects {
            tracker.add(object);
        }
        let fake = Self::new();
        fake.add_reactor("*", "*", move |action| tracker.react(action));
        fake
    }

    /// Append a reactor. It runs after every reactor already registered.
    pub fn add_reactor<F>(&self, verb: &str, resource: &str, reaction: F)
    where
        F: Fn(&Action) -> Option<ClientResult<Object>> + Send + Sync + 'static,
    {
        self.reactors
            .write()
            .expect("reactor lock poisoned")
            .push(Reactor {
                verb: verb.to_string(),
                resource: resource.to_string(),
                reaction: Box::new(reaction),
            });
    }

    /// Prepend a reactor. It runs before every reactor already registered.
    pub fn prepend_reactor<F>(&self, verb: &str, resource: &str, reaction: F)
    where
        F: Fn(&Action) -> Option<ClientResult<Object>> + Send + Sync + 'static,
    {
        self.reactors.write().expect("reactor lock poisoned").insert(
            0,
            Reactor {
                verb: verb.to_string(),
                resource: resource.to_string(),
                reaction: Box::new(reaction),
            },
        );
    }

    /// Every action recorded so far, oldest first.
    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().expect("action lock poisoned").clone()
    }

    pub fn clear_actions(&self) {
        self.actions.lock().expect("action lock poisoned").clear();
    }

    fn invokes(&self, action: Action) -> ClientResult<Object> {
        self.actions
            .lock()
            .expect("action lock poisoned")
            .push(action.clone());

        let reactors = self.reactors.read().expect("reactor lock poisoned");
        for reactor in reactors.iter() {
            if !action.matches(&reactor.verb, &reactor.resource) {
                continue;
            }
            if let Some(result) = (reactor.reaction)(&action) {
                return result;
            }
        }
        Err(ClientError::other(format!(
            "no reaction implemented for {}",
            action
        )))
    }

    fn invoke_as<T>(&self, action: Action) -> ClientResult<T>
    where
        T: TryFrom<Object, Error = Object>,
    {
        let description = action.to_string();
        let object = self.invokes(action)?;
        T::try_from(object).map_err(|other| {
            ClientError::other(format!(
                "unexpected {} returned for {}",
                other.kind(),
                description
            ))
        })
    }

    fn get(&self, resource: &str, namespace: &str, name: &str) -> Action {
        Action::Get(GetAction {
            resource: resource.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    fn list(&self, resource: &str, namespace: &str, options: &ListOptions) -> Action {
        Action::List(ListAction {
            resource: resource.to_string(),
            namespace: namespace.to_string(),
            field_selector: options.field_selector.clone(),
        })
    }
}

impl ServiceCatalogClient for FakeClientset {
    fn get_cluster_service_class(&self, name: &str) -> ClientResult<ClusterServiceClass> {
        self.invoke_as(self.get(CLUSTER_SERVICE_CLASSES, "", name))
    }

    fn list_cluster_service_classes(
        &self,
        options: &ListOptions,
    ) -> ClientResult<ClusterServiceClassList> {
        self.invoke_as(self.list(CLUSTER_SERVICE_CLASSES, "", options))
    }

    fn list_cluster_service_plans(
        &self,
        options: &ListOptions,
    ) -> ClientResult<ClusterServicePlanList> {
        self.invoke_as(self.list(CLUSTER_SERVICE_PLANS, "", options))
    }

    fn get_service_class(&self, namespace: &str, name: &str) -> ClientResult<ServiceClass> {
        self.invoke_as(self.get(SERVICE_CLASSES, namespace, name))
    }

    fn list_service_classes(
        &self,
        namespace: &str,
        options: &ListOptions,
    ) -> ClientResult<ServiceClassList> {
        self.invoke_as(self.list(SERVICE_CLASSES, namespace, options))
    }

    fn list_service_plans(
        &self,
        namespace: &str,
        options: &ListOptions,
    ) -> ClientResult<ServicePlanList> {
        self.invoke_as(self.list(SERVICE_PLANS, namespace, options))
    }
}

trait Tracked: FieldLabels + Clone {
    fn meta(&self) -> &ObjectMeta;
}

macro_rules! tracked {
    ($($ty:ty),*) => {
        $(impl Tracked for $ty {
            fn meta(&self) -> &ObjectMeta {
                &self.metadata
            }
        })*
    };
}

tracked!(ClusterServiceClass, ClusterServicePlan, ServiceClass, ServicePlan);

#[derive(Default)]
struct TrackerState {
    resource_version: u64,
    cluster_service_classes: Vec<ClusterServiceClass>,
    cluster_service_plans: Vec<ClusterServicePlan>,
    service_classes: Vec<ServiceClass>,
    service_plans: Vec<ServicePlan>,
}

/// ObjectTracker stores objects and answers get/list actions for them.
#[derive(Default)]
struct ObjectTracker {
    state: RwLock<TrackerState>,
}

impl ObjectTracker {
    fn add(&self, object: Object) {
        let mut state = self.state.write().expect("tracker lock poisoned");
        state.resource_version += 1;
        match object {
            Object::ClusterServiceClass(o) => state.cluster_service_classes.push(o),
            Object::ClusterServiceClassList(l) => state.cluster_service_classes.extend(l.items),
            Object::ClusterServicePlan(o) => state.cluster_service_plans.push(o),
            Object::ClusterServicePlanList(l) => state.cluster_service_plans.extend(l.items),
            Object::ServiceClass(o) => state.service_classes.push(o),
            Object::ServiceClassList(l) => state.service_classes.extend(l.items),
            Object::ServicePlan(o) => state.service_plans.push(o),
            Object::ServicePlanList(l) => state.service_plans.extend(l.items),
        }
    }

    fn react(&self, action: &Action) -> Option<ClientResult<Object>> {
        let state = self.state.read().expect("tracker lock poisoned");
        let rv = state.resource_version.to_string();
        match action {
            Action::Get(get) => {
                let (resource, namespace, name) = (&get.resource, &get.namespace, &get.name);
                match resource.as_str() {
                    CLUSTER_SERVICE_CLASSES => Some(
                        get_tracked(&state.cluster_service_classes, resource, namespace, name)
                            .map(Object::from),
                    ),
                    CLUSTER_SERVICE_PLANS => Some(
                        get_tracked(&state.cluster_service_plans, resource, namespace, name)
                            .map(Object::from),
                    ),
                    SERVICE_CLASSES => Some(
                        get_tracked(&state.service_classes, resource, namespace, name)
                            .map(Object::from),
                    ),
                    SERVICE_PLANS => Some(
                        get_tracked(&state.service_plans, resource, namespace, name)
                            .map(Object::from),
                    ),
                    _ => None,
                }
            }
            Action::List(list) => {
                let (namespace, selector) = (&list.namespace, list.field_selector.as_ref());
                match list.resource.as_str() {
                    CLUSTER_SERVICE_CLASSES => Some(
                        list_tracked(&state.cluster_service_classes, namespace, selector)
                            .map(|items| ClusterServiceClassList::new(&rv, items).into()),
                    ),
                    CLUSTER_SERVICE_PLANS => Some(
                        list_tracked(&state.cluster_service_plans, namespace, selector)
                            .map(|items| ClusterServicePlanList::new(&rv, items).into()),
                    ),
                    SERVICE_CLASSES => Some(
                        list_tracked(&state.service_classes, namespace, selector)
                            .map(|items| ServiceClassList::new(&rv, items).into()),
                    ),
                    SERVICE_PLANS => Some(
                        list_tracked(&state.service_plans, namespace, selector)
                            .map(|items| ServicePlanList::new(&rv, items).into()),
                    ),
                    _ => None,
                }
            }
        }
    }
}

fn get_tracked<T: Tracked>(
    items: &[T],
    resource: &str,
    namespace: &str,
    name: &str,
) -> ClientResult<T> {
    items
        .iter()
        .find(|o| o.meta().name == name && o.meta().namespace == namespace)
        .cloned()
        .ok_or_else(|| ClientError::not_found(resource, name))
}

fn list_tracked<T: Tracked>(
    items: &[T],
    namespace: &str,
    selector: Option<&FieldSelector>,
) -> ClientResult<Vec<T>> {
    let mut selected = Vec::new();
    for item in items {
        if !namespace.is_empty() && item.meta().namespace != namespace {
            continue;
        }
        if let Some(selector) = selector {
            if !selector.matches(item)? {
                continue;
            }
        }
        selected.push(item.clone());
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plans() -> Vec<Object> {
        vec![
            ClusterServicePlan::new("bar-id", "bar", "12345", "foo-id").into(),
            ClusterServicePlan::new("baz-id", "baz", "23456", "other-id").into(),
        ]
    }

    #[test]
    fn test_no_reaction_is_an_error() {
        let fake = FakeClientset::new();
        let err = fake.get_cluster_service_class("foo").unwrap_err();
        assert_eq!(
            err.to_string(),
            "no reaction implemented for get:clusterserviceclasses:foo"
        );
        assert_eq!(fake.actions().len(), 1);
    }

    #[test]
    fn test_reactors_run_in_order() {
        let fake = FakeClientset::new();
        fake.add_reactor("list", CLUSTER_SERVICE_CLASSES, |_| None);
        fake.add_reactor("list", CLUSTER_SERVICE_CLASSES, |_| {
            Some(Err(ClientError::other("second")))
        });
        fake.add_reactor("*", "*", |_| Some(Err(ClientError::other("catch-all"))));

        let err = fake
            .list_cluster_service_classes(&ListOptions::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "second");

        fake.prepend_reactor("list", "*", |_| Some(Err(ClientError::other("first"))));
        let err = fake
            .list_cluster_service_classes(&ListOptions::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "first");

        let err = fake.get_service_class("ns", "foo").unwrap_err();
        assert_eq!(err.to_string(), "catch-all");
    }

    #[test]
    fn test_wrong_object_kind_is_an_error() {
        let fake = FakeClientset::new();
        fake.add_reactor("get", CLUSTER_SERVICE_CLASSES, |_| {
            Some(Ok(ServiceClassList::default().into()))
        });
        let err = fake.get_cluster_service_class("foo").unwrap_err();
        assert!(err.to_string().contains("unexpected ServiceClassList"));
    }

    #[test]
    fn test_actions_are_recorded() {
        let fake = FakeClientset::with_objects(plans());
        let selector = FieldSelector::one_term_equal("spec.clusterServiceClassRef.name", "foo-id");
        fake.list_cluster_service_plans(&ListOptions::with_field_selector(selector.clone()))
            .unwrap();
        let _ = fake.get_service_class("dummy", "foo-id");

        let actions = fake.actions();
        assert_eq!(actions.len(), 2);
        assert_eq!(
            actions[0],
            Action::List(ListAction {
                resource: CLUSTER_SERVICE_PLANS.to_string(),
                namespace: String::new(),
                field_selector: Some(selector),
            })
        );
        assert!(actions[1].matches("get", SERVICE_CLASSES));
        assert_eq!(actions[1].namespace(), "dummy");

        fake.clear_actions();
        assert!(fake.actions().is_empty());
    }

    #[test]
    fn test_tracker_get() {
        let fake =
            FakeClientset::with_objects(vec![ClusterServiceClass::new("foo-id", "foo").into()]);
        let class = fake.get_cluster_service_class("foo-id").unwrap();
        assert_eq!(class.spec.common.external_name, "foo");

        let err = fake.get_cluster_service_class("missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_tracker_list_honors_field_selector() {
        let fake = FakeClientset::with_objects(plans());
        let selector = FieldSelector::one_term_equal("spec.clusterServiceClassRef.name", "foo-id");
        let list = fake
            .list_cluster_service_plans(&ListOptions::with_field_selector(selector))
            .unwrap();
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].metadata.name, "bar-id");
        assert_eq!(list.metadata.resource_version, "2");

        let all = fake
            .list_cluster_service_plans(&ListOptions::default())
            .unwrap();
        assert_eq!(all.items.len(), 2);
    }

    #[test]
    fn test_tracker_list_honors_namespace() {
        let fake = FakeClientset::with_objects(vec![
            ServicePlan::new("ns1", "bar-id", "bar", "12345", "foo-id").into(),
            ServicePlan::new("ns2", "bar-id", "bar", "12345", "foo-id").into(),
        ]);
        let list = fake
            .list_service_plans("ns2", &ListOptions::default())
            .unwrap();
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].metadata.namespace, "ns2");

        assert!(fake.get_service_class("ns1", "foo-id").unwrap_err().is_not_found());
    }

    #[test]
    fn test_tracker_rejects_unsupported_field() {
        let fake =
            FakeClientset::with_objects(vec![ClusterServiceClass::new("foo-id", "foo").into()]);
        let selector = FieldSelector::one_term_equal("spec.serviceClassRef.name", "foo-id");
        let err = fake
            .list_cluster_service_classes(&ListOptions::with_field_selector(selector))
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidFieldSelector { .. }));
    }
}
