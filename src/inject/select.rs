// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Picks the tracing instance a workload should be bound to.

use crate::constants::annotations;
use crate::inject::workload::PodTemplate;
use crate::types::jaeger::Jaeger;
use k8s_openapi::api::core::v1::Namespace;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::debug;

/// Opt-in value of any object: the current key wins over the legacy one and
/// annotations win over labels. Empty values count as unset.
fn opt_in_value<K: Resource>(obj: &K, keys: &[&str]) -> Option<String> {
    let set = |map: &BTreeMap<String, String>| {
        keys.iter()
            .find_map(|key| map.get(*key).filter(|v| !v.is_empty()))
            .cloned()
    };
    set(obj.annotations()).or_else(|| set(obj.labels()))
}

/// Opt-in value set on a workload
pub fn workload_opt_in<W: PodTemplate>(workload: &W) -> Option<String> {
    opt_in_value(workload, &[annotations::INJECT, annotations::INJECT_LEGACY])
}

/// Opt-in value set on a namespace
pub fn namespace_opt_in(namespace: &Namespace) -> Option<String> {
    opt_in_value(namespace, &[annotations::INJECT])
}

/// Whether an opt-in value asks for injection, either `"true"` or an
/// instance name
pub fn requests_injection(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty() && !is_false(v))
}

pub(crate) fn is_true(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

pub(crate) fn is_false(value: &str) -> bool {
    value.eq_ignore_ascii_case("false")
}

/// Resolve the instance a workload binds to, if exactly one qualifies.
///
/// `"false"` on the workload selects nothing, whatever the namespace says.
/// An explicit instance name on the workload beats one on the namespace and
/// never falls back when the name does not exist. With only `"true"` the
/// single known instance is chosen, then the single one in the workload's
/// namespace; anything else is ambiguous and selects nothing.
pub fn select<'a, W: PodTemplate>(
    workload: &W,
    namespace: &Namespace,
    candidates: &'a [Jaeger],
) -> Option<&'a Jaeger> {
    let workload_value = workload_opt_in(workload).unwrap_or_default();
    let namespace_value = namespace_opt_in(namespace).unwrap_or_default();

    if is_false(&workload_value) {
        return None;
    }

    for explicit in [&workload_value, &namespace_value] {
        if !explicit.is_empty() && !is_true(explicit) && !is_false(explicit) {
            let found = candidates.iter().find(|j| j.name_any() == *explicit);
            if found.is_none() {
                debug!("Requested Jaeger instance '{}' not found", explicit);
            }
            return found;
        }
    }

    if !is_true(&workload_value) && !is_true(&namespace_value) {
        return None;
    }

    if let [only] = candidates {
        return Some(only);
    }

    let target_namespace = workload
        .namespace()
        .or_else(|| namespace.metadata.name.clone())
        .unwrap_or_default();
    let mut in_namespace = candidates
        .iter()
        .filter(|j| j.namespace().as_deref() == Some(target_namespace.as_str()));

    match (in_namespace.next(), in_namespace.next()) {
        (Some(only), None) => Some(only),
        (first, _) => {
            debug!(
                "Cannot pick a Jaeger instance for {}/{}: {} candidates, {} in namespace",
                target_namespace,
                workload.name_any(),
                candidates.len(),
                if first.is_some() { "several" } else { "none" }
            );
            None
        }
    }
}
