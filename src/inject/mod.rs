// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Sidecar injection: instance selection, spec merging and pod template mutation.
//!
//! Everything in here is pure. Listing instances and persisting workloads is
//! left to the reconcilers and the admission webhook.

pub mod merge;
pub mod options;
pub mod select;
pub mod sidecar;
pub mod workload;

pub use select::select;
pub use sidecar::{has_agent, injected_instance, needed, opted_in, Injector};
pub use workload::PodTemplate;

use crate::types::jaeger::Jaeger;
use k8s_openapi::api::core::v1::Namespace;
use kube::ResourceExt;
use tracing::debug;

/// What a single evaluation did to a workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// Nothing to do, the workload is unchanged
    NoOp,
    /// Injection was requested but no single instance could be chosen
    NoTarget,
    /// A sidecar bound to the named instance was added
    Injected(String),
    /// An existing sidecar bound to the named instance was refreshed
    Updated(String),
    /// The sidecar of the named instance was removed after an opt-out
    Cleaned(String),
}

impl Evaluation {
    /// Whether the workload was modified and needs to be persisted
    pub fn changed(&self) -> bool {
        matches!(
            self,
            Evaluation::Injected(_) | Evaluation::Updated(_) | Evaluation::Cleaned(_)
        )
    }
}

/// Decide and apply the sidecar state of one workload from scratch.
///
/// Backend components and objects owned by a controller are never touched.
///
/// Nothing is carried between calls except what is stored on the workload
/// itself (the sidecar and the injected marker label), so repeated and
/// out-of-order calls converge on the same result.
pub fn evaluate<W>(
    injector: &Injector,
    workload: &mut W,
    namespace: &Namespace,
    instances: &[Jaeger],
) -> Evaluation
where
    W: PodTemplate + Clone + PartialEq,
{
    if sidecar::is_jaeger_component(workload) || workload.owned_by_controller() {
        return Evaluation::NoOp;
    }

    if needed(workload, namespace) {
        return match select(workload, namespace, instances) {
            Some(jaeger) => {
                injector.inject(Some(jaeger), workload);
                Evaluation::Injected(jaeger.name_any())
            }
            None => Evaluation::NoTarget,
        };
    }

    let Some(bound) = injected_instance(workload) else {
        return Evaluation::NoOp;
    };
    if !has_agent(workload) {
        return Evaluation::NoOp;
    }

    if !opted_in(workload, namespace) {
        injector.clean(&bound, workload);
        return Evaluation::Cleaned(bound);
    }

    match select(workload, namespace, instances) {
        Some(jaeger) => {
            let before = workload.clone();
            injector.inject(Some(jaeger), workload);
            if *workload == before {
                Evaluation::NoOp
            } else {
                Evaluation::Updated(jaeger.name_any())
            }
        }
        None => {
            debug!(
                "Workload {} keeps its agent for '{}', no instance selected",
                workload.name_any(),
                bound
            );
            Evaluation::NoTarget
        }
    }
}
