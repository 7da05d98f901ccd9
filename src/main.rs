// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use tracing::{info, warn};

use jaeger_injector::config::Config;
use jaeger_injector::inject::Injector;
use jaeger_injector::kubernetes::wait_for_jaeger_crd;
use jaeger_injector::reconcilers::{JaegerReconciler, NamespaceReconciler};
use jaeger_injector::webhook::{self, WebhookState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Jaeger agent injector");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: platform={:?}, agent_image={}, watch_namespaces={:?}",
        config.platform, config.agent_image, config.watch_namespaces
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Wait for the Jaeger CRD before starting reconcilers
    info!("Waiting for Jaeger CRD to become available...");
    wait_for_jaeger_crd(&client).await?;

    let injector = Injector::new(config.injector_config());

    let namespace_reconciler = NamespaceReconciler::new(
        client.clone(),
        injector.clone(),
        config.watch_namespaces.clone(),
    );
    let jaeger_reconciler = JaegerReconciler::new(
        client.clone(),
        injector.clone(),
        config.watch_namespaces.clone(),
    );
    let webhook_state = WebhookState::new(client, injector, config.watch_namespaces.clone());

    info!("Starting reconcilers...");

    if config.webhook_enabled {
        tokio::try_join!(
            namespace_reconciler.run(),
            jaeger_reconciler.run(),
            webhook::serve(webhook_state, &config)
        )?;
    } else {
        info!("Admission webhook disabled");
        tokio::try_join!(namespace_reconciler.run(), jaeger_reconciler.run())?;
    }

    // This should never be reached as reconcilers run forever
    warn!("All reconcilers stopped unexpectedly");
    Ok(())
}
