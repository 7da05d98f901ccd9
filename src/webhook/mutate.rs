// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Admission review handling for Pods and Deployments.

use super::WebhookState;
use crate::error::Result;
use crate::inject::{evaluate, Injector, PodTemplate};
use crate::kubernetes::list_instances;
use crate::types::jaeger::Jaeger;
use axum::{extract::State, Json};
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{Api, DynamicObject},
    core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview},
    Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Handle a mutating admission review for workloads of kind `W`
pub async fn mutate_handler<W>(
    State(state): State<Arc<WebhookState>>,
    Json(body): Json<AdmissionReview<W>>,
) -> Json<AdmissionReview<DynamicObject>>
where
    W: PodTemplate + Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let request: AdmissionRequest<W> = match body.try_into() {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "Failed to parse admission request");
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    Json(review(&state, &request).await.into_review())
}

/// Look up the namespace and candidate instances, then mutate.
///
/// Lookup failures deny the request; the API server reports them to the
/// creating controller, which retries.
#[instrument(skip(state, request), fields(uid = %request.uid, kind = %request.kind.kind))]
pub async fn review<W>(state: &WebhookState, request: &AdmissionRequest<W>) -> AdmissionResponse
where
    W: PodTemplate + Clone + PartialEq + Serialize,
{
    let Some(object) = &request.object else {
        debug!("No object in request, allowing unchanged");
        return AdmissionResponse::from(request);
    };

    let namespace_name = request
        .namespace
        .clone()
        .or_else(|| object.namespace())
        .unwrap_or_else(|| "default".to_string());

    let namespaces: Api<Namespace> = Api::all(state.client.clone());
    let namespace = match namespaces.get(&namespace_name).await {
        Ok(namespace) => namespace,
        Err(e) => {
            warn!(namespace = %namespace_name, error = %e, "Failed to read namespace");
            return AdmissionResponse::from(request).deny(format!(
                "failed to read namespace '{}': {}, will retry",
                namespace_name, e
            ));
        }
    };

    let instances = match list_instances(&state.client, &state.watch_namespaces).await {
        Ok(instances) => instances,
        Err(e) => {
            warn!(error = %e, "Failed to list Jaeger instances");
            return AdmissionResponse::from(request)
                .deny(format!("failed to list Jaeger instances: {}, will retry", e));
        }
    };

    mutate(&state.injector, request, &namespace, &instances)
}

/// Evaluate the object of an admission request and answer with the resulting
/// JSON patch. Requests without an object or without a change are allowed
/// unchanged.
pub fn mutate<W>(
    injector: &Injector,
    request: &AdmissionRequest<W>,
    namespace: &Namespace,
    instances: &[Jaeger],
) -> AdmissionResponse
where
    W: PodTemplate + Clone + PartialEq + Serialize,
{
    let response = AdmissionResponse::from(request);
    let Some(object) = &request.object else {
        return response;
    };

    let patch = match mutation_patch(
        injector,
        object,
        request.namespace.as_deref(),
        namespace,
        instances,
    ) {
        Ok(Some(patch)) => patch,
        Ok(None) => return response,
        Err(e) => {
            error!(error = %e, "Failed to compute patch");
            return AdmissionResponse::from(request).deny(format!("patch computation error: {e}"));
        }
    };

    info!(
        workload = %object.name_any(),
        operations = patch.0.len(),
        "Patching workload"
    );
    match response.with_patch(patch) {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "Failed to serialize patch");
            AdmissionResponse::from(request).deny(format!("patch serialization error: {e}"))
        }
    }
}

/// The patch turning `object` into its evaluated form, `None` when the
/// evaluation leaves it untouched.
///
/// Objects created through a controller carry no namespace of their own yet;
/// the request namespace is filled in on both sides so the injected tags see
/// it without it showing up in the patch.
fn mutation_patch<W>(
    injector: &Injector,
    object: &W,
    request_namespace: Option<&str>,
    namespace: &Namespace,
    instances: &[Jaeger],
) -> Result<Option<json_patch::Patch>>
where
    W: PodTemplate + Clone + PartialEq + Serialize,
{
    let mut original = object.clone();
    if original.meta().namespace.is_none() {
        original.meta_mut().namespace = request_namespace.map(str::to_string);
    }

    let mut mutated = original.clone();
    let evaluation = evaluate(injector, &mut mutated, namespace, instances);
    debug!("Admission evaluation: {:?}", evaluation);
    if !evaluation.changed() {
        return Ok(None);
    }

    let before = serde_json::to_value(&original)?;
    let after = serde_json::to_value(&mutated)?;
    Ok(Some(json_patch::diff(&before, &after)))
}
