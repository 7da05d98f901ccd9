// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InjectorError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to update {failed} workload(s) in namespace {namespace}")]
    WorkloadErrors { namespace: String, failed: usize },

    #[error("Failed to re-evaluate {failed} namespace(s) bound to Jaeger instance {instance}")]
    InstanceErrors { instance: String, failed: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, InjectorError>;
