// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Helpers keeping generated names within Kubernetes limits.

use crate::constants::labels::MAX_VALUE_LEN;

/// Truncate a value to `max` characters, dropping trailing characters that
/// would make it an invalid label value or DNS name.
pub fn truncate(value: &str, max: usize) -> String {
    let truncated: String = value.chars().take(max).collect();
    truncated
        .trim_end_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_string()
}

/// Truncate a value so it fits into a label value.
pub fn label_value(value: &str) -> String {
    truncate(value, MAX_VALUE_LEN)
}

/// Name of the headless collector service of an instance.
pub fn headless_collector_service(instance: &str) -> String {
    label_value(&format!("{}-collector-headless", instance)).to_ascii_lowercase()
}
