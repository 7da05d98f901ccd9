// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Agent options, command-line argument helpers and the `--agent.tags` codec.

use crate::constants::flags;
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Flat set of agent options keyed by dotted flag name.
///
/// Nested objects are flattened on deserialization, so
/// `{"es": {"username": "x"}}` is stored as `es.username = x`. A list value
/// yields one argument per element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Options(BTreeMap<String, Vec<String>>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Set a single-valued option, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), vec![value.into()]);
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// Build options from a JSON object, flattening nested objects
    pub fn from_json(value: &Map<String, Value>) -> Self {
        let mut options = Self::new();
        flatten_into(&mut options.0, "", value);
        options
    }

    /// Parse `--key=value` arguments back into options. Arguments without
    /// the `--` prefix are ignored, a bare `--flag` maps to `"true"`.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        let mut options = BTreeMap::<String, Vec<String>>::new();
        for arg in args {
            let Some(flag) = arg.as_ref().strip_prefix("--") else {
                continue;
            };
            let (key, value) = flag.split_once('=').unwrap_or((flag, "true"));
            options
                .entry(key.to_string())
                .or_default()
                .push(value.to_string());
        }
        Self(options)
    }

    /// Render the options as sorted `--key=value` arguments
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = self
            .0
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |v| format!("--{}={}", key, v)))
            .collect();
        args.sort();
        args
    }
}

fn flatten_into(target: &mut BTreeMap<String, Vec<String>>, prefix: &str, map: &Map<String, Value>) {
    for (key, value) in map {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Object(nested) => flatten_into(target, &key, nested),
            Value::Array(items) => {
                target.insert(key, items.iter().map(scalar_to_string).collect());
            }
            Value::Null => {}
            scalar => {
                target.insert(key, vec![scalar_to_string(scalar)]);
            }
        }
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl<'de> Deserialize<'de> for Options {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Options::from_json(&map))
    }
}

impl Serialize for Options {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(key, values)| {
                let value = match values.as_slice() {
                    [single] => Value::String(single.clone()),
                    many => Value::Array(many.iter().cloned().map(Value::String).collect()),
                };
                (key.clone(), value)
            })
            .collect();
        map.serialize(serializer)
    }
}

impl JsonSchema for Options {
    fn schema_name() -> String {
        "Options".to_string()
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        let mut schema = SchemaObject {
            instance_type: Some(InstanceType::Object.into()),
            ..Default::default()
        };
        schema
            .extensions
            .insert("x-kubernetes-preserve-unknown-fields".to_string(), Value::Bool(true));
        Schema::Object(schema)
    }
}

/// Value of the first argument starting with `prefix`, with the prefix removed
pub fn find_arg<'a, S: AsRef<str>>(prefix: &str, args: &'a [S]) -> Option<&'a str> {
    args.iter()
        .find_map(|arg| arg.as_ref().strip_prefix(prefix))
}

/// Port of a `host:port` or `:port` flag value, or `default` when the flag is
/// absent, unparsable or out of range
pub fn get_port<S: AsRef<str>>(flag: &str, args: &[S], default: i32) -> i32 {
    find_arg(flag, args)
        .and_then(|value| value.rsplit_once(':'))
        .and_then(|(_, port)| parse_port(port))
        .unwrap_or(default)
}

fn parse_port(value: &str) -> Option<i32> {
    value.parse().ok().filter(|port| (1..=65535).contains(port))
}

/// Admin port from `--admin.http.host-port`, falling back to the legacy
/// `--admin-http-port` flag which carries a bare port number
pub fn get_admin_port<S: AsRef<str>>(args: &[S], default: i32) -> i32 {
    if find_arg(flags::ADMIN_HTTP, args).is_some() {
        return get_port(flags::ADMIN_HTTP, args, default);
    }
    find_arg(flags::ADMIN_HTTP_LEGACY, args)
        .and_then(parse_port)
        .unwrap_or(default)
}

/// Tags the agent attaches to every span, encoded as `k=v,k=v`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentTags(BTreeMap<String, String>);

impl AgentTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a tag string. Entries without `=` are dropped, so a malformed
    /// value degrades to fewer tags instead of failing.
    pub fn decode(value: &str) -> Self {
        Self(
            value
                .split(',')
                .filter_map(|pair| pair.split_once('='))
                .filter(|(key, _)| !key.is_empty())
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }

    /// Tags found in the `--agent.tags` argument, empty when absent
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        find_arg(flags::AGENT_TAGS, args)
            .map(Self::decode)
            .unwrap_or_default()
    }

    /// Encode with keys in sorted order
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Render as a complete `--agent.tags=` argument
    pub fn to_arg(&self) -> String {
        format!("{}{}", flags::AGENT_TAGS, self.encode())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Add all tags of `other`, overwriting keys present in both
    pub fn merge(&mut self, other: AgentTags) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
