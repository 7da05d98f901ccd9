// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Builds the agent sidecar and applies it to a workload's pod template.

use crate::config::{InjectorConfig, Platform};
use crate::constants::{
    ca, env, flags, labels, ports, AGENT_CONTAINER_NAME, JAEGER_APP,
};
use crate::inject::merge::{dedup_image_pull_secrets, dedup_volume_mounts, dedup_volumes, merge};
use crate::inject::options::{find_arg, get_admin_port, get_port, AgentTags};
use crate::inject::select::{namespace_opt_in, requests_injection, workload_opt_in};
use crate::inject::workload::PodTemplate;
use crate::naming::label_value;
use crate::types::jaeger::{Jaeger, JaegerCommonSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, ContainerPort, EnvVar, EnvVarSource, KeyToPath, Namespace,
    ObjectFieldSelector, Volume, VolumeMount,
};
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::debug;

/// Index of the agent sidecar in the workload's container list
pub fn agent_index<W: PodTemplate>(workload: &W) -> Option<usize> {
    workload
        .pod_spec()?
        .containers
        .iter()
        .position(|c| c.name == AGENT_CONTAINER_NAME)
}

pub fn has_agent<W: PodTemplate>(workload: &W) -> bool {
    agent_index(workload).is_some()
}

/// Whether the workload is one of the tracing backend's own components.
/// The query component is the exception, it may report its own traces.
pub fn is_jaeger_component<W: PodTemplate>(workload: &W) -> bool {
    let object_labels = workload.labels();
    object_labels.get(labels::APP).map(String::as_str) == Some(JAEGER_APP)
        && object_labels.get(labels::APP_COMPONENT).map(String::as_str) != Some("query")
}

/// Whether the workload or, failing that, its namespace asks for injection
pub fn opted_in<W: PodTemplate>(workload: &W, namespace: &Namespace) -> bool {
    let value = workload_opt_in(workload).or_else(|| namespace_opt_in(namespace));
    requests_injection(value.as_deref())
}

/// Whether a sidecar should be added to the workload
pub fn needed<W: PodTemplate>(workload: &W, namespace: &Namespace) -> bool {
    opted_in(workload, namespace) && !is_jaeger_component(workload) && !has_agent(workload)
}

/// Name of the instance recorded by a previous injection
pub fn injected_instance<W: PodTemplate>(workload: &W) -> Option<String> {
    workload.labels().get(labels::INJECTED).cloned()
}

/// Applies and removes the agent sidecar. Holds only immutable settings, so a
/// single instance can be shared by every reconciler and webhook handler.
#[derive(Debug, Clone, Default)]
pub struct Injector {
    config: InjectorConfig,
}

impl Injector {
    pub fn new(config: InjectorConfig) -> Self {
        Self { config }
    }

    /// Add or refresh the agent sidecar bound to `jaeger`. A missing instance
    /// leaves the workload untouched.
    pub fn inject<W: PodTemplate>(&self, jaeger: Option<&Jaeger>, workload: &mut W) {
        let Some(jaeger) = jaeger else {
            debug!("No Jaeger instance for {}, leaving it unchanged", workload.name_any());
            return;
        };

        debug!(
            "Injecting agent for Jaeger {}/{} into {}",
            jaeger.namespace().unwrap_or_default(),
            jaeger.name_any(),
            workload.name_any()
        );

        let marker = label_value(&jaeger.name_any());
        if let Some(previous) = injected_instance(workload).filter(|p| *p != marker) {
            debug!("Rebinding {} from Jaeger {}", workload.name_any(), previous);
            remove_ca_volumes(&previous, workload);
        }

        self.decorate(workload);
        self.apply_default_annotations(workload);

        let scope = self.agent_scope(jaeger);
        let index = agent_index(workload);
        let existing = index.and_then(|i| workload.pod_spec().map(|s| s.containers[i].clone()));
        let sidecar = self.container(jaeger, workload, &scope, existing.as_ref());

        let spec = workload.pod_spec_mut();
        match index {
            Some(i) => spec.containers[i] = sidecar,
            None => spec.containers.push(sidecar),
        }

        if !scope.image_pull_secrets.is_empty() {
            let current = spec.image_pull_secrets.take().unwrap_or_default();
            spec.image_pull_secrets = Some(dedup_image_pull_secrets(
                current.into_iter().chain(scope.image_pull_secrets),
            ));
        }
        if !scope.volumes.is_empty() {
            let current = spec.volumes.take().unwrap_or_default();
            spec.volumes = Some(dedup_volumes(current.into_iter().chain(scope.volumes)));
        }

        workload
            .labels_mut()
            .insert(labels::INJECTED.to_string(), marker);
    }

    /// Remove a sidecar previously injected for `instance`, together with the
    /// marker label and the instance's CA volumes
    pub fn clean<W: PodTemplate>(&self, instance: &str, workload: &mut W) {
        debug!("Removing agent of Jaeger {} from {}", instance, workload.name_any());

        workload.labels_mut().remove(labels::INJECTED);
        workload
            .pod_spec_mut()
            .containers
            .retain(|c| c.name != AGENT_CONTAINER_NAME);
        remove_ca_volumes(instance, workload);
    }

    /// Set service name and propagation variables on the application
    /// containers, never overwriting values that are already there
    fn decorate<W: PodTemplate>(&self, workload: &mut W) {
        let namespace = namespace_or_default(workload);
        let service_name = app_name(workload).map(|app| format!("{}.{}", app, namespace));

        let containers = workload
            .pod_spec_mut()
            .containers
            .iter_mut()
            .filter(|c| c.name != AGENT_CONTAINER_NAME);

        for container in containers {
            let vars = container.env.get_or_insert_with(Vec::new);
            if let Some(service_name) = &service_name {
                if !vars.iter().any(|e| e.name == env::SERVICE_NAME) {
                    vars.push(env_var(env::SERVICE_NAME, service_name));
                }
            }
            if !vars.iter().any(|e| e.name == env::PROPAGATION) {
                vars.push(env_var(env::PROPAGATION, &self.config.propagation));
            }
        }
    }

    fn apply_default_annotations<W: PodTemplate>(&self, workload: &mut W) {
        let annotations = workload
            .template_metadata_mut()
            .annotations
            .get_or_insert_with(BTreeMap::new);
        for (key, value) in &self.config.default_annotations {
            annotations
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// Volumes, mounts and pull secrets the sidecar brings along. Only the
    /// agent's own fragment is used, instance-wide volumes stay out of
    /// application pods.
    fn agent_scope(&self, jaeger: &Jaeger) -> JaegerCommonSpec {
        let mut scope = jaeger.spec.agent.common.clone();

        if self.config.platform == Platform::OpenShift {
            scope.volumes.push(config_map_volume(
                &jaeger.trusted_ca_name(),
                "ca-bundle.crt",
                "tls-ca-bundle.pem",
            ));
            scope.volume_mounts.push(read_only_mount(
                &jaeger.trusted_ca_name(),
                ca::TRUSTED_CA_MOUNT_PATH,
            ));
            scope.volumes.push(config_map_volume(
                &jaeger.service_ca_name(),
                "service-ca.crt",
                "service-ca.crt",
            ));
            scope.volume_mounts.push(read_only_mount(
                &jaeger.service_ca_name(),
                ca::SERVICE_CA_MOUNT_PATH,
            ));
        }

        scope.volumes = dedup_volumes(scope.volumes);
        scope.volume_mounts = dedup_volume_mounts(scope.volume_mounts);
        scope
    }

    fn container<W: PodTemplate>(
        &self,
        jaeger: &Jaeger,
        workload: &W,
        scope: &JaegerCommonSpec,
        existing: Option<&Container>,
    ) -> Container {
        let agent = &jaeger.spec.agent;
        let mut args = agent.options.to_args();

        if find_arg(flags::REPORTER_GRPC_HOST_PORT, &args).is_none() {
            args.push(format!(
                "{}{}",
                flags::REPORTER_GRPC_HOST_PORT,
                jaeger.collector_address()
            ));
        }

        if self.config.platform == Platform::OpenShift
            && find_arg(flags::REPORTER_GRPC_TLS_ENABLED, &args).is_none()
        {
            args.push(format!("{}true", flags::REPORTER_GRPC_TLS_ENABLED));
            args.push(format!("{}{}", flags::REPORTER_GRPC_TLS_CA, ca::SERVICE_CA_PATH));
        }

        let zipkin_compact = get_port(flags::ZIPKIN_COMPACT, &args, ports::ZIPKIN_COMPACT);
        let config_rest = get_port(flags::CONFIG_REST, &args, ports::CONFIG_REST);
        let jaeger_compact = get_port(flags::JAEGER_COMPACT, &args, ports::JAEGER_COMPACT);
        let jaeger_binary = get_port(flags::JAEGER_BINARY, &args, ports::JAEGER_BINARY);
        let admin_http = get_admin_port(&args, ports::ADMIN_HTTP);

        if find_arg(flags::AGENT_TAGS, &args).is_none() {
            let existing_args = existing.and_then(|c| c.args.as_deref()).unwrap_or_default();
            let mut tags = AgentTags::from_args(existing_args);
            tags.merge(default_tags(workload));
            args.push(tags.to_arg());
        }

        args.sort();

        let resources = merge(&[&agent.common, &jaeger.spec.common])
            .resources
            .unwrap_or_default();

        let security_context = agent
            .sidecar_security_context
            .clone()
            .or_else(|| agent.common.container_security_context.clone());

        Container {
            name: AGENT_CONTAINER_NAME.to_string(),
            image: Some(
                agent
                    .image
                    .clone()
                    .unwrap_or_else(|| self.config.agent_image.clone()),
            ),
            args: Some(args),
            env: Some(vec![
                field_env_var(env::POD_NAME, "metadata.name"),
                field_env_var(env::HOST_IP, "status.hostIP"),
            ]),
            ports: Some(vec![
                container_port("zk-compact-trft", zipkin_compact, "UDP"),
                container_port("config-rest", config_rest, "TCP"),
                container_port("jg-compact-trft", jaeger_compact, "UDP"),
                container_port("jg-binary-trft", jaeger_binary, "UDP"),
                container_port("admin-http", admin_http, "TCP"),
            ]),
            resources: Some(resources),
            security_context,
            volume_mounts: (!scope.volume_mounts.is_empty()).then(|| scope.volume_mounts.clone()),
            // fields the API server defaults, kept so re-injection is a no-op
            image_pull_policy: existing.and_then(|c| c.image_pull_policy.clone()),
            termination_message_path: existing.and_then(|c| c.termination_message_path.clone()),
            termination_message_policy: existing
                .and_then(|c| c.termination_message_policy.clone()),
            ..Default::default()
        }
    }
}

/// Default `--agent.tags` for a workload.
///
/// `container.name` is taken from the first application container. With
/// several application containers that is a positional guess, not a notion
/// of a primary container.
fn default_tags<W: PodTemplate>(workload: &W) -> AgentTags {
    let mut tags = AgentTags::new();
    tags.insert("cluster", "undefined");
    tags.insert("pod.namespace", namespace_or_default(workload));
    tags.insert("pod.name", format!("${{{}:}}", env::POD_NAME));
    tags.insert("host.ip", format!("${{{}:}}", env::HOST_IP));

    if let Some(tag) = W::NAME_TAG {
        tags.insert(tag, workload.name_any());
    }

    let first_app_container = workload
        .pod_spec()
        .and_then(|s| s.containers.iter().find(|c| c.name != AGENT_CONTAINER_NAME));
    if let Some(container) = first_app_container {
        tags.insert("container.name", container.name.clone());
    }

    tags
}

/// Application name from the pod labels, falling back to the object labels
fn app_name<W: PodTemplate>(workload: &W) -> Option<String> {
    let keys = [labels::APP_INSTANCE, labels::APP_NAME, labels::APP];
    let template_labels = workload.template_metadata().and_then(|m| m.labels.as_ref());

    template_labels
        .and_then(|l| keys.iter().find_map(|k| l.get(*k)))
        .or_else(|| keys.iter().find_map(|k| workload.labels().get(*k)))
        .cloned()
}

/// Drop the CA ConfigMap volumes added for `instance`
fn remove_ca_volumes<W: PodTemplate>(instance: &str, workload: &mut W) {
    let names = [format!("{}-trusted-ca", instance), format!("{}-service-ca", instance)];
    if let Some(volumes) = workload.pod_spec_mut().volumes.as_mut() {
        volumes.retain(|v| !names.contains(&v.name));
    }
}

fn namespace_or_default<W: PodTemplate>(workload: &W) -> String {
    workload
        .namespace()
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| "default".to_string())
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

fn field_env_var(name: &str, field_path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                api_version: Some("v1".to_string()),
                field_path: field_path.to_string(),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn container_port(name: &str, port: i32, protocol: &str) -> ContainerPort {
    ContainerPort {
        name: Some(name.to_string()),
        container_port: port,
        protocol: Some(protocol.to_string()),
        ..Default::default()
    }
}

fn config_map_volume(name: &str, key: &str, path: &str) -> Volume {
    Volume {
        name: name.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: name.to_string(),
            items: Some(vec![KeyToPath {
                key: key.to_string(),
                path: path.to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn read_only_mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        read_only: Some(true),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::annotations;
    use crate::test_utils::{make_deployment, make_jaeger, make_namespace};
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::{
        LocalObjectReference, Pod, PodSpec, ResourceRequirements, SecretVolumeSource,
    };
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use kube::api::ObjectMeta;

    fn containers(deployment: &Deployment) -> &[Container] {
        &deployment.pod_spec().unwrap().containers
    }

    fn agent(deployment: &Deployment) -> &Container {
        containers(deployment)
            .iter()
            .find(|c| c.name == AGENT_CONTAINER_NAME)
            .unwrap()
    }

    fn env_value<'a>(container: &'a Container, name: &str) -> Option<&'a str> {
        container
            .env
            .as_ref()?
            .iter()
            .find(|e| e.name == name)?
            .value
            .as_deref()
    }

    fn agent_tags(container: &Container) -> AgentTags {
        AgentTags::from_args(container.args.as_deref().unwrap())
    }

    #[test]
    fn test_needed_with_workload_opt_in() {
        let deployment = make_deployment("shop", "shop", &[(annotations::INJECT, "true")]);
        assert!(needed(&deployment, &make_namespace("shop", &[])));
    }

    #[test]
    fn test_needed_with_namespace_opt_in() {
        let deployment = make_deployment("shop", "shop", &[]);
        assert!(needed(&deployment, &make_namespace("shop", &[(annotations::INJECT, "prod")])));
    }

    #[test]
    fn test_not_needed_without_opt_in() {
        let deployment = make_deployment("shop", "shop", &[]);
        assert!(!needed(&deployment, &make_namespace("shop", &[])));
    }

    #[test]
    fn test_not_needed_when_workload_opts_out() {
        let deployment = make_deployment("shop", "shop", &[(annotations::INJECT, "False")]);
        assert!(!needed(&deployment, &make_namespace("shop", &[(annotations::INJECT, "true")])));
    }

    #[test]
    fn test_not_needed_for_jaeger_components() {
        let mut deployment = make_deployment("prod-collector", "shop", &[(annotations::INJECT, "true")]);
        deployment.labels_mut().insert(labels::APP.to_string(), "jaeger".to_string());
        deployment
            .labels_mut()
            .insert(labels::APP_COMPONENT.to_string(), "collector".to_string());
        let namespace = make_namespace("shop", &[]);
        assert!(!needed(&deployment, &namespace));

        deployment
            .labels_mut()
            .insert(labels::APP_COMPONENT.to_string(), "query".to_string());
        assert!(needed(&deployment, &namespace));
    }

    #[test]
    fn test_not_needed_with_existing_agent() {
        let mut deployment = make_deployment("shop", "shop", &[(annotations::INJECT, "true")]);
        Injector::default().inject(Some(&make_jaeger("prod", "shop")), &mut deployment);
        assert!(!needed(&deployment, &make_namespace("shop", &[])));
    }

    #[test]
    fn test_inject_appends_sidecar() {
        let mut deployment = make_deployment("shop", "shop", &[]);
        let jaeger = make_jaeger("prod", "shop");

        Injector::default().inject(Some(&jaeger), &mut deployment);

        let names: Vec<_> = containers(&deployment).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["shop", "jaeger-agent"]);
        assert_eq!(
            deployment.labels().get(labels::INJECTED).map(String::as_str),
            Some("prod")
        );
    }

    #[test]
    fn test_inject_without_instance_is_noop() {
        let mut deployment = make_deployment("shop", "shop", &[]);
        let before = deployment.clone();

        Injector::default().inject(None, &mut deployment);

        assert_eq!(deployment, before);
    }

    #[test]
    fn test_inject_default_args() {
        let mut deployment = make_deployment("shop", "shop", &[]);
        Injector::default().inject(Some(&make_jaeger("prod", "observability")), &mut deployment);

        let sidecar = agent(&deployment);
        let args = sidecar.args.as_ref().unwrap();
        let mut sorted = args.clone();
        sorted.sort();
        assert_eq!(args, &sorted);
        assert_eq!(
            find_arg(flags::REPORTER_GRPC_HOST_PORT, args),
            Some("dns:///prod-collector-headless.observability.svc:14250")
        );
        assert!(find_arg(flags::REPORTER_GRPC_TLS_ENABLED, args).is_none());
        assert_eq!(sidecar.image.as_deref(), Some(crate::constants::DEFAULT_AGENT_IMAGE));
    }

    #[test]
    fn test_inject_keeps_explicit_reporter() {
        let mut jaeger = make_jaeger("prod", "shop");
        jaeger
            .spec
            .agent
            .options
            .insert("reporter.grpc.host-port", "collector.example:14250");
        jaeger.spec.agent.image = Some("agent:custom".to_string());
        let mut deployment = make_deployment("shop", "shop", &[]);

        Injector::default().inject(Some(&jaeger), &mut deployment);

        let sidecar = agent(&deployment);
        let args = sidecar.args.as_ref().unwrap();
        let reporters: Vec<_> = args
            .iter()
            .filter(|a| a.starts_with(flags::REPORTER_GRPC_HOST_PORT))
            .collect();
        assert_eq!(reporters, vec!["--reporter.grpc.host-port=collector.example:14250"]);
        assert_eq!(sidecar.image.as_deref(), Some("agent:custom"));
    }

    #[test]
    fn test_inject_openshift_tls_and_ca_volumes() {
        let injector = Injector::new(InjectorConfig {
            platform: Platform::OpenShift,
            ..Default::default()
        });
        let mut deployment = make_deployment("shop", "shop", &[]);

        injector.inject(Some(&make_jaeger("prod", "shop")), &mut deployment);

        let sidecar = agent(&deployment);
        let args = sidecar.args.as_ref().unwrap();
        assert_eq!(find_arg(flags::REPORTER_GRPC_TLS_ENABLED, args), Some("true"));
        assert_eq!(find_arg(flags::REPORTER_GRPC_TLS_CA, args), Some(ca::SERVICE_CA_PATH));

        let volumes: Vec<_> = deployment
            .pod_spec()
            .unwrap()
            .volumes
            .as_ref()
            .unwrap()
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(volumes, vec!["prod-trusted-ca", "prod-service-ca"]);
        assert_eq!(sidecar.volume_mounts.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_inject_openshift_respects_explicit_tls() {
        let injector = Injector::new(InjectorConfig {
            platform: Platform::OpenShift,
            ..Default::default()
        });
        let mut jaeger = make_jaeger("prod", "shop");
        jaeger.spec.agent.options.insert("reporter.grpc.tls.enabled", "false");
        let mut deployment = make_deployment("shop", "shop", &[]);

        injector.inject(Some(&jaeger), &mut deployment);

        let args = agent(&deployment).args.clone().unwrap();
        assert_eq!(find_arg(flags::REPORTER_GRPC_TLS_ENABLED, &args), Some("false"));
        assert!(find_arg(flags::REPORTER_GRPC_TLS_CA, &args).is_none());
    }

    #[test]
    fn test_inject_default_ports() {
        let mut deployment = make_deployment("shop", "shop", &[]);
        Injector::default().inject(Some(&make_jaeger("prod", "shop")), &mut deployment);

        let ports: Vec<_> = agent(&deployment)
            .ports
            .as_ref()
            .unwrap()
            .iter()
            .map(|p| (p.container_port, p.protocol.clone().unwrap()))
            .collect();
        assert_eq!(
            ports,
            vec![
                (5775, "UDP".to_string()),
                (5778, "TCP".to_string()),
                (6831, "UDP".to_string()),
                (6832, "UDP".to_string()),
                (14271, "TCP".to_string()),
            ]
        );
    }

    #[test]
    fn test_inject_ports_from_options() {
        let mut jaeger = make_jaeger("prod", "shop");
        jaeger
            .spec
            .agent
            .options
            .insert("processor.jaeger-compact.server-host-port", ":7831");
        jaeger.spec.agent.options.insert("admin.http.host-port", ":15271");
        let mut deployment = make_deployment("shop", "shop", &[]);

        Injector::default().inject(Some(&jaeger), &mut deployment);

        let ports = agent(&deployment).ports.clone().unwrap();
        assert_eq!(ports[2].container_port, 7831);
        assert_eq!(ports[4].container_port, 15271);
    }

    #[test]
    fn test_inject_default_tags() {
        let mut deployment = make_deployment("shop", "shop", &[]);
        Injector::default().inject(Some(&make_jaeger("prod", "shop")), &mut deployment);

        let tags = agent_tags(agent(&deployment));
        assert_eq!(tags.get("cluster"), Some("undefined"));
        assert_eq!(tags.get("pod.namespace"), Some("shop"));
        assert_eq!(tags.get("pod.name"), Some("${POD_NAME:}"));
        assert_eq!(tags.get("host.ip"), Some("${HOST_IP:}"));
        assert_eq!(tags.get("deployment.name"), Some("shop"));
        assert_eq!(tags.get("container.name"), Some("shop"));
    }

    #[test]
    fn test_inject_explicit_tags_untouched() {
        let mut jaeger = make_jaeger("prod", "shop");
        jaeger.spec.agent.options.insert("agent.tags", "team=payments");
        let mut deployment = make_deployment("shop", "shop", &[]);

        Injector::default().inject(Some(&jaeger), &mut deployment);

        let args = agent(&deployment).args.clone().unwrap();
        assert_eq!(
            args.iter().filter(|a| a.starts_with(flags::AGENT_TAGS)).count(),
            1
        );
        assert_eq!(find_arg(flags::AGENT_TAGS, &args), Some("team=payments"));
    }

    #[test]
    fn test_reinject_keeps_operator_tags() {
        let jaeger = make_jaeger("prod", "shop");
        let injector = Injector::default();
        let mut deployment = make_deployment("shop", "shop", &[]);
        injector.inject(Some(&jaeger), &mut deployment);

        let spec = deployment.pod_spec_mut();
        let agent_args = spec.containers[1].args.as_mut().unwrap();
        let tags_arg = agent_args
            .iter_mut()
            .find(|a| a.starts_with(flags::AGENT_TAGS))
            .unwrap();
        *tags_arg = "--agent.tags=team=payments,cluster=edited".to_string();

        injector.inject(Some(&jaeger), &mut deployment);

        let tags = agent_tags(agent(&deployment));
        assert_eq!(tags.get("team"), Some("payments"));
        assert_eq!(tags.get("cluster"), Some("undefined"));
    }

    #[test]
    fn test_reinject_malformed_tags() {
        let jaeger = make_jaeger("prod", "shop");
        let injector = Injector::default();
        let mut deployment = make_deployment("shop", "shop", &[]);
        injector.inject(Some(&jaeger), &mut deployment);

        let agent_args = deployment.pod_spec_mut().containers[1].args.as_mut().unwrap();
        agent_args.retain(|a| !a.starts_with(flags::AGENT_TAGS));
        agent_args.push("--agent.tags=%%%".to_string());

        injector.inject(Some(&jaeger), &mut deployment);

        let tags = agent_tags(agent(&deployment));
        assert_eq!(tags.len(), 6);
        assert_eq!(tags.get("pod.namespace"), Some("shop"));
    }

    #[test]
    fn test_inject_is_idempotent() {
        let mut jaeger = make_jaeger("prod", "shop");
        jaeger.spec.agent.common.volumes = vec![Volume {
            name: "agent-certs".to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some("agent-certs".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }];
        jaeger.spec.agent.common.image_pull_secrets = vec![LocalObjectReference {
            name: "registry".to_string(),
        }];
        let injector = Injector::new(InjectorConfig {
            platform: Platform::OpenShift,
            ..Default::default()
        });
        let mut deployment = make_deployment("shop", "shop", &[]);

        injector.inject(Some(&jaeger), &mut deployment);
        let once = deployment.clone();
        injector.inject(Some(&jaeger), &mut deployment);

        assert_eq!(deployment, once);
        assert_eq!(
            containers(&deployment)
                .iter()
                .filter(|c| c.name == AGENT_CONTAINER_NAME)
                .count(),
            1
        );
        assert_eq!(deployment.pod_spec().unwrap().volumes.as_ref().unwrap().len(), 3);
        assert_eq!(
            deployment.pod_spec().unwrap().image_pull_secrets.as_ref().unwrap().len(),
            1
        );
    }

    #[test]
    fn test_reinject_replaces_in_place() {
        let jaeger = make_jaeger("prod", "shop");
        let injector = Injector::default();
        let mut deployment = make_deployment("shop", "shop", &[]);
        injector.inject(Some(&jaeger), &mut deployment);

        // move the agent to the front, then add another container behind the app
        deployment.pod_spec_mut().containers.swap(0, 1);
        deployment.pod_spec_mut().containers.push(Container {
            name: "proxy".to_string(),
            ..Default::default()
        });

        injector.inject(Some(&jaeger), &mut deployment);

        let names: Vec<_> = containers(&deployment).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["jaeger-agent", "shop", "proxy"]);
        assert_eq!(agent_tags(agent(&deployment)).get("container.name"), Some("shop"));
    }

    #[test]
    fn test_reinject_keeps_server_defaults() {
        let jaeger = make_jaeger("prod", "shop");
        let injector = Injector::default();
        let mut deployment = make_deployment("shop", "shop", &[]);
        injector.inject(Some(&jaeger), &mut deployment);
        deployment.pod_spec_mut().containers[1].termination_message_path =
            Some("/dev/termination-log".to_string());
        deployment.pod_spec_mut().containers[1].image_pull_policy = Some("IfNotPresent".to_string());
        let stored = deployment.clone();

        injector.inject(Some(&jaeger), &mut deployment);

        assert_eq!(deployment, stored);
    }

    #[test]
    fn test_inject_decorates_app_containers() {
        let mut deployment = make_deployment("shop", "shop", &[]);
        Injector::default().inject(Some(&make_jaeger("prod", "shop")), &mut deployment);

        let app = &containers(&deployment)[0];
        assert_eq!(env_value(app, env::SERVICE_NAME), Some("shop.shop"));
        assert_eq!(env_value(app, env::PROPAGATION), Some("jaeger,b3,w3c"));
        assert!(env_value(agent(&deployment), env::SERVICE_NAME).is_none());
    }

    #[test]
    fn test_inject_never_overwrites_env() {
        let mut deployment = make_deployment("shop", "shop", &[]);
        deployment.pod_spec_mut().containers[0].env = Some(vec![
            env_var(env::SERVICE_NAME, "custom"),
            env_var(env::PROPAGATION, "w3c"),
        ]);

        Injector::default().inject(Some(&make_jaeger("prod", "shop")), &mut deployment);

        let app = &containers(&deployment)[0];
        assert_eq!(app.env.as_ref().unwrap().len(), 2);
        assert_eq!(env_value(app, env::SERVICE_NAME), Some("custom"));
        assert_eq!(env_value(app, env::PROPAGATION), Some("w3c"));
    }

    #[test]
    fn test_service_name_label_preference() {
        let mut deployment = make_deployment("shop", "shop", &[]);
        let template_labels = deployment
            .template_metadata_mut()
            .labels
            .get_or_insert_with(BTreeMap::new);
        template_labels.insert(labels::APP_NAME.to_string(), "storefront".to_string());
        template_labels.insert(labels::APP_INSTANCE.to_string(), "storefront-eu".to_string());

        Injector::default().inject(Some(&make_jaeger("prod", "shop")), &mut deployment);

        assert_eq!(
            env_value(&containers(&deployment)[0], env::SERVICE_NAME),
            Some("storefront-eu.shop")
        );
    }

    #[test]
    fn test_service_name_default_namespace() {
        let mut pod = Pod {
            metadata: ObjectMeta {
                name: Some("worker".to_string()),
                labels: Some(BTreeMap::from([(labels::APP.to_string(), "worker".to_string())])),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "worker".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };

        Injector::default().inject(Some(&make_jaeger("prod", "shop")), &mut pod);

        let worker = &pod.spec.as_ref().unwrap().containers[0];
        assert_eq!(env_value(worker, env::SERVICE_NAME), Some("worker.default"));
        let tags = AgentTags::from_args(pod.spec.as_ref().unwrap().containers[1].args.as_deref().unwrap());
        assert!(tags.get("deployment.name").is_none());
        assert_eq!(tags.get("pod.namespace"), Some("default"));
    }

    #[test]
    fn test_inject_default_annotations_only_when_absent() {
        let mut deployment = make_deployment("shop", "shop", &[]);
        deployment
            .template_metadata_mut()
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(annotations::PROMETHEUS_PORT.to_string(), "9090".to_string());

        Injector::default().inject(Some(&make_jaeger("prod", "shop")), &mut deployment);

        let template_annotations = deployment.template_metadata().unwrap().annotations.as_ref().unwrap();
        assert_eq!(template_annotations[annotations::PROMETHEUS_PORT], "9090");
        assert_eq!(template_annotations[annotations::PROMETHEUS_SCRAPE], "true");
    }

    #[test]
    fn test_inject_merges_resources() {
        let mut jaeger = make_jaeger("prod", "shop");
        jaeger.spec.agent.common.resources = Some(ResourceRequirements {
            limits: Some(BTreeMap::from([("cpu".to_string(), Quantity("100m".to_string()))])),
            ..Default::default()
        });
        jaeger.spec.common.resources = Some(ResourceRequirements {
            limits: Some(BTreeMap::from([
                ("cpu".to_string(), Quantity("1".to_string())),
                ("memory".to_string(), Quantity("128Mi".to_string())),
            ])),
            ..Default::default()
        });
        jaeger.spec.common.volumes = vec![Volume {
            name: "instance-secret".to_string(),
            ..Default::default()
        }];
        let mut deployment = make_deployment("shop", "shop", &[]);

        Injector::default().inject(Some(&jaeger), &mut deployment);

        let limits = agent(&deployment).resources.clone().unwrap().limits.unwrap();
        assert_eq!(limits["cpu"], Quantity("100m".to_string()));
        assert_eq!(limits["memory"], Quantity("128Mi".to_string()));
        assert!(deployment.pod_spec().unwrap().volumes.is_none());
    }

    #[test]
    fn test_inject_truncates_marker_label() {
        let long_name = format!("{}-tracing", "a".repeat(70));
        let mut deployment = make_deployment("shop", "shop", &[]);

        Injector::default().inject(Some(&make_jaeger(&long_name, "shop")), &mut deployment);

        assert_eq!(deployment.labels()[labels::INJECTED], "a".repeat(63));
    }

    #[test]
    fn test_clean_removes_sidecar() {
        let injector = Injector::new(InjectorConfig {
            platform: Platform::OpenShift,
            ..Default::default()
        });
        let mut deployment = make_deployment("shop", "shop", &[]);
        deployment.pod_spec_mut().volumes = Some(vec![Volume {
            name: "data".to_string(),
            ..Default::default()
        }]);
        injector.inject(Some(&make_jaeger("prod", "shop")), &mut deployment);

        injector.clean("prod", &mut deployment);

        assert!(!has_agent(&deployment));
        assert!(injected_instance(&deployment).is_none());
        let volumes = deployment.pod_spec().unwrap().volumes.clone().unwrap();
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0].name, "data");
    }
}
