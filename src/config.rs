// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{annotations, ports, DEFAULT_AGENT_IMAGE, DEFAULT_PROPAGATION};
use crate::error::InjectorError;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// Platform the operator runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    #[default]
    Kubernetes,
    OpenShift,
}

impl FromStr for Platform {
    type Err = InjectorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kubernetes" => Ok(Platform::Kubernetes),
            "openshift" => Ok(Platform::OpenShift),
            other => Err(InjectorError::InvalidConfig(format!(
                "unknown platform '{}'",
                other
            ))),
        }
    }
}

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub platform: Platform,
    /// Agent image used when an instance does not set one
    pub agent_image: String,
    /// Namespaces to look for Jaeger instances in, empty means all
    pub watch_namespaces: Vec<String>,
    pub propagation: String,
    pub webhook_enabled: bool,
    pub webhook_bind_address: SocketAddr,
    /// Directory holding `tls.crt` and `tls.key` for the webhook server
    pub webhook_cert_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let platform = match env::var("PLATFORM") {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                warn!("{}, falling back to kubernetes", e);
                Platform::Kubernetes
            }),
            Err(_) => Platform::default(),
        };

        let agent_image =
            env::var("JAEGER_AGENT_IMAGE").unwrap_or_else(|_| DEFAULT_AGENT_IMAGE.to_string());
        let watch_namespaces = parse_namespaces(&env::var("WATCH_NAMESPACES").unwrap_or_default());
        let propagation =
            env::var("JAEGER_PROPAGATION").unwrap_or_else(|_| DEFAULT_PROPAGATION.to_string());
        let webhook_enabled: bool = env::var("ENABLE_WEBHOOK")
            .unwrap_or("true".to_string())
            .parse()
            .unwrap_or(true);
        let webhook_bind_address = env::var("WEBHOOK_BIND_ADDRESS")
            .unwrap_or("0.0.0.0:9443".to_string())
            .parse()
            .context("WEBHOOK_BIND_ADDRESS is not a valid socket address")?;
        let webhook_cert_dir = env::var("WEBHOOK_CERT_DIR")
            .unwrap_or("/tmp/k8s-webhook-server/serving-certs".to_string())
            .into();

        Ok(Config {
            platform,
            agent_image,
            watch_namespaces,
            propagation,
            webhook_enabled,
            webhook_bind_address,
            webhook_cert_dir,
        })
    }

    /// The immutable settings handed to the sidecar injector
    pub fn injector_config(&self) -> InjectorConfig {
        InjectorConfig {
            platform: self.platform,
            agent_image: self.agent_image.clone(),
            propagation: self.propagation.clone(),
            ..InjectorConfig::default()
        }
    }
}

/// Settings for [`crate::inject::Injector`], built once at start-up
#[derive(Debug, Clone, PartialEq)]
pub struct InjectorConfig {
    pub platform: Platform,
    pub agent_image: String,
    pub propagation: String,
    /// Pod template annotations added when absent
    pub default_annotations: BTreeMap<String, String>,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            platform: Platform::Kubernetes,
            agent_image: DEFAULT_AGENT_IMAGE.to_string(),
            propagation: DEFAULT_PROPAGATION.to_string(),
            default_annotations: BTreeMap::from([
                (annotations::PROMETHEUS_SCRAPE.to_string(), "true".to_string()),
                (
                    annotations::PROMETHEUS_PORT.to_string(),
                    ports::ADMIN_HTTP.to_string(),
                ),
            ]),
        }
    }
}

fn parse_namespaces(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|ns| !ns.is_empty())
        .map(str::to_string)
        .collect()
}
