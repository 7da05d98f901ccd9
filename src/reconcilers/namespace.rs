// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace reconciler - re-evaluates every workload of a namespace when the
//! namespace changes.

use crate::constants::OPERATOR_NAME;
use crate::error::{InjectorError, Result};
use crate::inject::{evaluate, Evaluation, Injector, PodTemplate};
use crate::kubernetes::list_instances;
use crate::types::jaeger::Jaeger;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{ListParams, PostParams},
    runtime::{controller::Action, Controller},
    Api, Client, Resource, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

pub struct NamespaceReconciler {
    client: Client,
    injector: Injector,
    watch_namespaces: Vec<String>,
}

impl NamespaceReconciler {
    pub fn new(client: Client, injector: Injector, watch_namespaces: Vec<String>) -> Self {
        Self {
            client,
            injector,
            watch_namespaces,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(namespaces, WatcherConfig::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled namespace: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(namespace: Arc<Namespace>, ctx: Arc<NamespaceReconciler>) -> Result<Action> {
    if namespace.metadata.deletion_timestamp.is_some() {
        debug!("Skipping terminating namespace {}", namespace.name_any());
        return Ok(Action::await_change());
    }

    reconcile_namespace(
        &ctx.client,
        &ctx.injector,
        &ctx.watch_namespaces,
        &namespace,
    )
    .await?;

    Ok(Action::await_change())
}

fn error_policy(
    _namespace: Arc<Namespace>,
    error: &InjectorError,
    _ctx: Arc<NamespaceReconciler>,
) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(60))
}

/// Counters of one pass over a namespace
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NamespaceReport {
    pub evaluated: usize,
    pub persisted: usize,
    pub failed: usize,
}

/// Evaluate every deployment, stateful set and daemon set of a namespace and
/// persist the ones that changed.
///
/// A failed list or write does not stop the pass; the failures are counted
/// and reported as one error at the end so the caller retries the whole
/// namespace from a fresh read.
#[instrument(skip(client, injector, watch_namespaces, namespace), fields(namespace = %namespace.name_any()))]
pub async fn reconcile_namespace(
    client: &Client,
    injector: &Injector,
    watch_namespaces: &[String],
    namespace: &Namespace,
) -> Result<NamespaceReport> {
    let instances = list_instances(client, watch_namespaces).await?;
    let mut report = NamespaceReport::default();

    reconcile_workloads::<Deployment>(client, injector, namespace, &instances, &mut report).await;
    reconcile_workloads::<StatefulSet>(client, injector, namespace, &instances, &mut report).await;
    reconcile_workloads::<DaemonSet>(client, injector, namespace, &instances, &mut report).await;

    if report.failed > 0 {
        return Err(InjectorError::WorkloadErrors {
            namespace: namespace.name_any(),
            failed: report.failed,
        });
    }

    debug!(
        "Namespace pass done: {} evaluated, {} persisted",
        report.evaluated, report.persisted
    );
    Ok(report)
}

async fn reconcile_workloads<W>(
    client: &Client,
    injector: &Injector,
    namespace: &Namespace,
    instances: &[Jaeger],
    report: &mut NamespaceReport,
) where
    W: PodTemplate
        + Resource<Scope = NamespaceResourceScope>
        + Clone
        + PartialEq
        + Debug
        + Serialize
        + DeserializeOwned,
{
    let ns = namespace.name_any();
    let kind = W::kind(&());
    let api: Api<W> = Api::namespaced(client.clone(), &ns);
    let workloads = match api.list(&ListParams::default()).await {
        Ok(list) => list,
        Err(e) => {
            error!("Failed to list {} in {}: {}", kind, ns, e);
            report.failed += 1;
            return;
        }
    };
    let params = PostParams {
        field_manager: Some(OPERATOR_NAME.to_string()),
        ..Default::default()
    };

    for mut workload in workloads.items {
        let name = workload.name_any();
        report.evaluated += 1;

        let evaluation = evaluate(injector, &mut workload, namespace, instances);
        match &evaluation {
            Evaluation::NoOp => continue,
            Evaluation::NoTarget => {
                debug!("No unambiguous Jaeger instance for {} {}/{}", kind, ns, name);
                continue;
            }
            Evaluation::Injected(instance) => {
                info!("Injecting agent of '{}' into {} {}/{}", instance, kind, ns, name)
            }
            Evaluation::Updated(instance) => {
                info!("Updating agent of '{}' in {} {}/{}", instance, kind, ns, name)
            }
            Evaluation::Cleaned(instance) => {
                info!("Removing agent of '{}' from {} {}/{}", instance, kind, ns, name)
            }
        }

        match api.replace(&name, &params, &workload).await {
            Ok(_) => report.persisted += 1,
            Err(e) => {
                error!("Failed to update {} {}/{}: {}", kind, ns, name, e);
                report.failed += 1;
            }
        }
    }
}
