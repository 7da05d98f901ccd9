// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Listing of the Jaeger instances sidecars can be bound to

use crate::error::Result;
use crate::types::jaeger::Jaeger;
use kube::{api::ListParams, Api, Client};
use tracing::{debug, instrument};

/// List the Jaeger instances in the watched namespaces (all namespaces when
/// the list is empty). Instances being deleted are left out.
#[instrument(skip(client))]
pub async fn list_instances(client: &Client, watch_namespaces: &[String]) -> Result<Vec<Jaeger>> {
    let mut instances = Vec::new();

    if watch_namespaces.is_empty() {
        let api: Api<Jaeger> = Api::all(client.clone());
        instances.extend(api.list(&ListParams::default()).await?.items);
    } else {
        for namespace in watch_namespaces {
            let api: Api<Jaeger> = Api::namespaced(client.clone(), namespace);
            instances.extend(api.list(&ListParams::default()).await?.items);
        }
    }

    instances.retain(|j| !j.is_deleting());
    debug!("Found {} Jaeger instances", instances.len());
    Ok(instances)
}
