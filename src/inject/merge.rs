// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Combines layered configuration fragments, most specific first.

use crate::types::jaeger::JaegerCommonSpec;
use k8s_openapi::api::core::v1::{LocalObjectReference, ResourceRequirements, Volume, VolumeMount};
use std::collections::{BTreeMap, HashSet};

/// Merge fragments into one. The first fragment is the most specific: it wins
/// every key collision, and later fragments only fill gaps.
pub fn merge(fragments: &[&JaegerCommonSpec]) -> JaegerCommonSpec {
    let mut merged = JaegerCommonSpec::default();
    let mut resources = ResourceRequirements::default();
    let mut volumes = Vec::new();
    let mut volume_mounts = Vec::new();
    let mut image_pull_secrets = Vec::new();

    for fragment in fragments {
        fill_gaps(&mut merged.annotations, &fragment.annotations);
        fill_gaps(&mut merged.labels, &fragment.labels);

        volumes.extend(fragment.volumes.iter().cloned());
        volume_mounts.extend(fragment.volume_mounts.iter().cloned());
        image_pull_secrets.extend(fragment.image_pull_secrets.iter().cloned());
        merged.tolerations.extend(fragment.tolerations.iter().cloned());

        if let Some(r) = &fragment.resources {
            merge_resources(&mut resources, r);
        }

        if merged.affinity.is_none() {
            merged.affinity = fragment.affinity.clone();
        }
        if merged.security_context.is_none() {
            merged.security_context = fragment.security_context.clone();
        }
        if merged.container_security_context.is_none() {
            merged.container_security_context = fragment.container_security_context.clone();
        }
        if merged.service_account.as_deref().unwrap_or_default().is_empty() {
            merged.service_account = fragment.service_account.clone();
        }
    }

    merged.volumes = dedup_volumes(volumes);
    merged.volume_mounts = dedup_volume_mounts(volume_mounts);
    merged.image_pull_secrets = dedup_image_pull_secrets(image_pull_secrets);
    if resources != ResourceRequirements::default() {
        merged.resources = Some(resources);
    }
    merged
}

fn fill_gaps(target: &mut BTreeMap<String, String>, source: &BTreeMap<String, String>) {
    for (key, value) in source {
        target.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

fn merge_resources(target: &mut ResourceRequirements, source: &ResourceRequirements) {
    if let Some(limits) = &source.limits {
        let into = target.limits.get_or_insert_with(BTreeMap::new);
        for (key, quantity) in limits {
            into.entry(key.clone()).or_insert_with(|| quantity.clone());
        }
    }
    if let Some(requests) = &source.requests {
        let into = target.requests.get_or_insert_with(BTreeMap::new);
        for (key, quantity) in requests {
            into.entry(key.clone()).or_insert_with(|| quantity.clone());
        }
    }
    if target.claims.is_none() {
        target.claims = source.claims.clone();
    }
}

fn dedup_by_name<T>(items: impl IntoIterator<Item = T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(name(item).to_string()))
        .collect()
}

/// Drop volumes whose name was already seen, keeping the first
pub fn dedup_volumes(volumes: impl IntoIterator<Item = Volume>) -> Vec<Volume> {
    dedup_by_name(volumes, |v| v.name.as_str())
}

/// Drop volume mounts whose name was already seen, keeping the first
pub fn dedup_volume_mounts(mounts: impl IntoIterator<Item = VolumeMount>) -> Vec<VolumeMount> {
    dedup_by_name(mounts, |m| m.name.as_str())
}

/// Drop image pull secrets whose name was already seen, keeping the first
pub fn dedup_image_pull_secrets(
    secrets: impl IntoIterator<Item = LocalObjectReference>,
) -> Vec<LocalObjectReference> {
    dedup_by_name(secrets, |s| s.name.as_str())
}
