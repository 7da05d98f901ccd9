// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Uniform access to the pod template of the workload kinds the injector handles.

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Pod, PodSpec};
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};

/// A Kubernetes object carrying a mutable pod template.
///
/// Object-level metadata (selection annotations, the injected marker label)
/// comes from [`kube::ResourceExt`]; this trait adds the pod-level parts.
pub trait PodTemplate: Resource<DynamicType = ()> {
    /// Tag key naming the owning workload in the agent's default tags
    const NAME_TAG: Option<&'static str>;

    /// Metadata of the pods this workload creates
    fn template_metadata(&self) -> Option<&ObjectMeta>;

    fn template_metadata_mut(&mut self) -> &mut ObjectMeta;

    fn pod_spec(&self) -> Option<&PodSpec>;

    fn pod_spec_mut(&mut self) -> &mut PodSpec;

    /// Whether the object was stamped out from another workload's template.
    /// Such objects are injected through that template instead, where the
    /// owner's own opt-in and opt-out are visible.
    fn owned_by_controller(&self) -> bool {
        false
    }
}

impl PodTemplate for Pod {
    const NAME_TAG: Option<&'static str> = None;

    fn template_metadata(&self) -> Option<&ObjectMeta> {
        Some(&self.metadata)
    }

    fn template_metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn pod_spec(&self) -> Option<&PodSpec> {
        self.spec.as_ref()
    }

    fn pod_spec_mut(&mut self) -> &mut PodSpec {
        self.spec.get_or_insert_with(PodSpec::default)
    }

    fn owned_by_controller(&self) -> bool {
        self.owner_references()
            .iter()
            .any(|owner| owner.controller == Some(true))
    }
}

macro_rules! impl_pod_template {
    ($kind:ty, $tag:literal) => {
        impl PodTemplate for $kind {
            const NAME_TAG: Option<&'static str> = Some($tag);

            fn template_metadata(&self) -> Option<&ObjectMeta> {
                self.spec.as_ref().and_then(|s| s.template.metadata.as_ref())
            }

            fn template_metadata_mut(&mut self) -> &mut ObjectMeta {
                self.spec
                    .get_or_insert_with(Default::default)
                    .template
                    .metadata
                    .get_or_insert_with(ObjectMeta::default)
            }

            fn pod_spec(&self) -> Option<&PodSpec> {
                self.spec.as_ref().and_then(|s| s.template.spec.as_ref())
            }

            fn pod_spec_mut(&mut self) -> &mut PodSpec {
                self.spec
                    .get_or_insert_with(Default::default)
                    .template
                    .spec
                    .get_or_insert_with(PodSpec::default)
            }
        }
    };
}

impl_pod_template!(Deployment, "deployment.name");
impl_pod_template!(StatefulSet, "statefulset.name");
impl_pod_template!(DaemonSet, "daemonset.name");
