// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Jaeger reconciler - re-evaluates the namespaces a changed Jaeger instance
//! can affect: those with workloads bound to it or asking for injection.

use crate::constants::labels;
use crate::error::{InjectorError, Result};
use crate::inject::select::{namespace_opt_in, requests_injection, workload_opt_in};
use crate::inject::{Injector, PodTemplate};
use crate::naming::label_value;
use crate::reconcilers::namespace::reconcile_namespace;
use crate::types::jaeger::Jaeger;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::ListParams,
    runtime::{controller::Action, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

pub struct JaegerReconciler {
    client: Client,
    injector: Injector,
    watch_namespaces: Vec<String>,
}

impl JaegerReconciler {
    pub fn new(client: Client, injector: Injector, watch_namespaces: Vec<String>) -> Self {
        Self {
            client,
            injector,
            watch_namespaces,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let jaegers: Api<Jaeger> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(jaegers, WatcherConfig::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled Jaeger instance: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(jaeger: Arc<Jaeger>, ctx: Arc<JaegerReconciler>) -> Result<Action> {
    reconcile_instance(&ctx.client, &ctx.injector, &ctx.watch_namespaces, &jaeger).await?;
    Ok(Action::await_change())
}

fn error_policy(_jaeger: Arc<Jaeger>, error: &InjectorError, _ctx: Arc<JaegerReconciler>) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(60))
}

/// Run the namespace pass for every namespace an instance change can affect.
/// Returns the number of namespaces visited.
#[instrument(skip(client, injector, watch_namespaces, jaeger), fields(instance = %jaeger.name_any()))]
pub async fn reconcile_instance(
    client: &Client,
    injector: &Injector,
    watch_namespaces: &[String],
    jaeger: &Jaeger,
) -> Result<usize> {
    let namespaces = affected_namespaces(client, &jaeger.name_any()).await?;
    if namespaces.is_empty() {
        debug!("No workloads bound to or waiting for this instance");
        return Ok(0);
    }

    info!("Re-evaluating {} namespace(s)", namespaces.len());
    let api: Api<Namespace> = Api::all(client.clone());
    let mut failed = 0;

    for name in &namespaces {
        let result = match api.get(name).await {
            Ok(namespace) => reconcile_namespace(client, injector, watch_namespaces, &namespace)
                .await
                .map(|_| ()),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!("Failed to re-evaluate namespace {}: {}", name, e);
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(InjectorError::InstanceErrors {
            instance: jaeger.name_any(),
            failed,
        });
    }
    Ok(namespaces.len())
}

/// Namespaces holding a workload bound to `instance` or asking for injection,
/// plus the namespaces that opt in as a whole. Opted-in workloads without a
/// target yet are picked up here once their instance appears.
async fn affected_namespaces(client: &Client, instance: &str) -> Result<BTreeSet<String>> {
    let marker = label_value(instance);

    let mut namespaces = BTreeSet::new();
    namespaces.extend(workload_namespaces::<Deployment>(client, &marker).await?);
    namespaces.extend(workload_namespaces::<StatefulSet>(client, &marker).await?);
    namespaces.extend(workload_namespaces::<DaemonSet>(client, &marker).await?);

    let api: Api<Namespace> = Api::all(client.clone());
    namespaces.extend(
        api.list(&ListParams::default())
            .await?
            .items
            .iter()
            .filter(|ns| requests_injection(namespace_opt_in(ns).as_deref()))
            .map(|ns| ns.name_any()),
    );
    Ok(namespaces)
}

async fn workload_namespaces<W>(client: &Client, marker: &str) -> Result<Vec<String>>
where
    W: PodTemplate + Clone + Debug + DeserializeOwned,
{
    let api: Api<W> = Api::all(client.clone());
    Ok(api
        .list(&ListParams::default())
        .await?
        .items
        .iter()
        .filter(|w| {
            w.labels().get(labels::INJECTED).map(String::as_str) == Some(marker)
                || requests_injection(workload_opt_in(*w).as_deref())
        })
        .filter_map(|w| w.namespace())
        .collect())
}
