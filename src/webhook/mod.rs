// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Mutating admission webhook.
//!
//! Pods and Deployments are run through the same evaluation as the namespace
//! reconciler when they are created or updated, so new workloads come up
//! with their agent already in place.

pub mod mutate;

use crate::config::Config;
use crate::inject::Injector;
use anyhow::Context;
use axum::{routing::post, Router};
use axum_server::tls_rustls::RustlsConfig;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::Client;
use std::sync::Arc;
use tracing::info;

/// Shared state for webhook handlers
pub struct WebhookState {
    pub client: Client,
    pub injector: Injector,
    pub watch_namespaces: Vec<String>,
}

impl WebhookState {
    pub fn new(client: Client, injector: Injector, watch_namespaces: Vec<String>) -> Self {
        Self {
            client,
            injector,
            watch_namespaces,
        }
    }
}

/// Router with one mutation endpoint per supported kind
pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/mutate-v1-pod", post(mutate::mutate_handler::<Pod>))
        .route("/mutate-v1-deployment", post(mutate::mutate_handler::<Deployment>))
        .with_state(state)
}

/// Serve the webhook over TLS until the server fails
pub async fn serve(state: WebhookState, config: &Config) -> anyhow::Result<()> {
    let cert = config.webhook_cert_dir.join("tls.crt");
    let key = config.webhook_cert_dir.join("tls.key");
    let tls_config = RustlsConfig::from_pem_file(&cert, &key)
        .await
        .with_context(|| format!("loading webhook certificate from {}", cert.display()))?;

    let router = webhook_router(Arc::new(state));
    info!("Starting admission webhook on {}", config.webhook_bind_address);

    axum_server::bind_rustls(config.webhook_bind_address, tls_config)
        .serve(router.into_make_service())
        .await
        .context("webhook server failed")?;

    Ok(())
}
