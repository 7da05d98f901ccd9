// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Annotation (and label) keys used to request or record sidecar injection
pub mod annotations {
    /// `"true"` opts in with auto-selection, any other value names an instance
    pub const INJECT: &str = "sidecar.jaegertracing.io/inject";
    /// Older key name, same meaning as [`INJECT`] on workloads
    pub const INJECT_LEGACY: &str = "inject-jaeger-agent";
    /// Prometheus scrape annotations defaulted onto injected pod templates
    pub const PROMETHEUS_SCRAPE: &str = "prometheus.io/scrape";
    pub const PROMETHEUS_PORT: &str = "prometheus.io/port";
}

/// Label keys read or written by the injector
pub mod labels {
    /// Marker recording the name of the instance a workload is bound to
    pub const INJECTED: &str = "sidecar.jaegertracing.io/injected";
    pub const APP: &str = "app";
    pub const APP_NAME: &str = "app.kubernetes.io/name";
    pub const APP_INSTANCE: &str = "app.kubernetes.io/instance";
    pub const APP_COMPONENT: &str = "app.kubernetes.io/component";
    /// Kubernetes limit for label values
    pub const MAX_VALUE_LEN: usize = 63;
}

/// Environment variables set on application containers
pub mod env {
    pub const SERVICE_NAME: &str = "JAEGER_SERVICE_NAME";
    pub const PROPAGATION: &str = "JAEGER_PROPAGATION";
    pub const POD_NAME: &str = "POD_NAME";
    pub const HOST_IP: &str = "HOST_IP";
}

/// Agent command-line flags the injector inspects or adds
pub mod flags {
    pub const REPORTER_GRPC_HOST_PORT: &str = "--reporter.grpc.host-port=";
    pub const REPORTER_GRPC_TLS_ENABLED: &str = "--reporter.grpc.tls.enabled=";
    pub const REPORTER_GRPC_TLS_CA: &str = "--reporter.grpc.tls.ca=";
    pub const AGENT_TAGS: &str = "--agent.tags=";
    pub const ZIPKIN_COMPACT: &str = "--processor.zipkin-compact.server-host-port=";
    pub const CONFIG_REST: &str = "--http-server.host-port=";
    pub const JAEGER_COMPACT: &str = "--processor.jaeger-compact.server-host-port=";
    pub const JAEGER_BINARY: &str = "--processor.jaeger-binary.server-host-port=";
    pub const ADMIN_HTTP: &str = "--admin.http.host-port=";
    pub const ADMIN_HTTP_LEGACY: &str = "--admin-http-port=";
}

/// Default agent listening ports
pub mod ports {
    pub const ZIPKIN_COMPACT: i32 = 5775;
    pub const CONFIG_REST: i32 = 5778;
    pub const JAEGER_COMPACT: i32 = 6831;
    pub const JAEGER_BINARY: i32 = 6832;
    pub const ADMIN_HTTP: i32 = 14271;
    pub const COLLECTOR_GRPC: i32 = 14250;
}

/// Trust bundle locations used on OpenShift
pub mod ca {
    pub const TRUSTED_CA_MOUNT_PATH: &str = "/etc/pki/ca-trust/extracted/pem";
    pub const SERVICE_CA_MOUNT_PATH: &str = "/etc/pki/ca-trust/source/service-ca";
    pub const SERVICE_CA_PATH: &str = "/etc/pki/ca-trust/source/service-ca/service-ca.crt";
}

/// Name of the injected container
pub const AGENT_CONTAINER_NAME: &str = "jaeger-agent";

/// Value of the `app` label carried by the operator's own components
pub const JAEGER_APP: &str = "jaeger";

/// Default `JAEGER_PROPAGATION` value
pub const DEFAULT_PROPAGATION: &str = "jaeger,b3,w3c";

/// Agent image used when neither the instance nor the environment sets one
pub const DEFAULT_AGENT_IMAGE: &str = "jaegertracing/jaeger-agent:1.62.0";

/// The operator name used as field manager
pub const OPERATOR_NAME: &str = "jaeger-injector";

/// CRD polling configuration
pub mod crd {
    pub const GROUP: &str = "jaegertracing.io";
    pub const KIND: &str = "Jaeger";
    pub const VERSION: &str = "v1";
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}
