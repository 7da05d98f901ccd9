// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::ports;
use crate::inject::options::Options;
use crate::naming::headless_collector_service;
use k8s_openapi::api::core::v1::{
    Affinity, LocalObjectReference, PodSecurityContext, ResourceRequirements, SecurityContext,
    Toleration, Volume, VolumeMount,
};
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "jaegertracing.io", version = "v1", kind = "Jaeger")]
#[kube(namespaced)]
#[kube(status = "JaegerStatus")]
#[serde(rename_all = "camelCase")]
pub struct JaegerSpec {
    #[serde(flatten)]
    pub common: JaegerCommonSpec,
    #[serde(default)]
    pub agent: JaegerAgentSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<JaegerIngressSpec>,
}

/// Settings shared by every component of an instance, also used as the
/// fragment type `inject::merge` combines.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JaegerCommonSpec {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<PodSecurityContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_security_context: Option<SecurityContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,
}

/// Agent configuration of an instance
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JaegerAgentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    pub options: Options,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidecar_security_context: Option<SecurityContext>,
    #[serde(flatten)]
    pub common: JaegerCommonSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JaegerIngressSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<IngressSecurity>,
}

/// How the query UI is protected
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum IngressSecurity {
    None,
    OauthProxy,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JaegerStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Jaeger {
    /// Whether the instance is on its way out and must not be selected
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// gRPC address of the headless collector service agents report to
    pub fn collector_address(&self) -> String {
        format!(
            "dns:///{}.{}.svc:{}",
            headless_collector_service(&self.name_any()),
            self.namespace().unwrap_or_else(|| "default".to_string()),
            ports::COLLECTOR_GRPC
        )
    }

    /// Name of the ConfigMap holding the cluster trust bundle for this instance
    pub fn trusted_ca_name(&self) -> String {
        format!("{}-trusted-ca", self.name_any())
    }

    /// Name of the ConfigMap holding the service CA for this instance
    pub fn service_ca_name(&self) -> String {
        format!("{}-service-ca", self.name_any())
    }
}
