// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery and instance listing.

pub mod crd;
pub mod instances;

pub use crd::wait_for_jaeger_crd;
pub use instances::list_instances;
