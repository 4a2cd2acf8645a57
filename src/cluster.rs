// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Live cluster context consumed by the compiler.
//!
//! The compiler never talks to an API server itself; the reconciliation
//! layer reads the cluster once and passes an immutable [`ClusterContext`]
//! through the whole call chain. The context carries the namespace identity,
//! the network overlay configuration and the named resource references
//! needed to locate operator-managed secrets.

use k8s_openapi::api::autoscaling::v1::CrossVersionObjectReference;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::REFERENCED_RESOURCES_PREFIX;
use crate::errors::ConfigError;

/// A named reference to a cluster resource, as declared by the cluster
/// owner. The reference `name` is what configuration points at; the target
/// identifies the actual object.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamedResourceReference {
    /// Name the reference is looked up by.
    pub name: String,

    /// The referenced object.
    pub resource_ref: CrossVersionObjectReference,
}

/// Immutable view of the cluster a compilation runs against.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterContext {
    /// Technical name of the cluster.
    pub name: String,

    /// Namespace hosting the cluster's control plane.
    pub namespace: String,

    /// Networking implementation of the cluster (e.g. `calico`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,

    /// Opaque provider configuration of the networking implementation.
    /// Inspected only for the nested `overlay.enabled` flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networking_provider_config: Option<serde_json::Value>,

    /// CIDR blocks of the pod network.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pod_networks: Vec<String>,

    /// Annotations of the seed hosting this cluster.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub seed_annotations: BTreeMap<String, String>,

    /// Name of the generic token kubeconfig secret for control plane
    /// components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_token_kubeconfig_secret_name: Option<String>,

    /// Resource references declared on the cluster.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<NamedResourceReference>,
}

/// Loosely typed view of the networking provider blob. Unknown fields are
/// ignored; only the overlay flag is of interest.
#[derive(Debug, Default, Deserialize)]
struct NetworkProviderConfig {
    #[serde(default)]
    overlay: Option<OverlaySection>,
}

#[derive(Debug, Default, Deserialize)]
struct OverlaySection {
    #[serde(default)]
    enabled: Option<bool>,
}

impl ClusterContext {
    /// Whether the cluster's network runs in overlay mode.
    ///
    /// An absent provider blob or an absent `overlay.enabled` flag means
    /// "disabled", not an error. A present flag of the wrong type is a
    /// decode error.
    pub fn overlay_enabled(&self) -> Result<bool, ConfigError> {
        let Some(blob) = &self.networking_provider_config else {
            return Ok(false);
        };
        let config: NetworkProviderConfig =
            serde_json::from_value(blob.clone()).map_err(|err| ConfigError::Decode {
                what: "networking provider config",
                reason: err.to_string(),
            })?;
        Ok(config
            .overlay
            .and_then(|overlay| overlay.enabled)
            .unwrap_or(false))
    }

    /// Resolve a named resource reference of kind `Secret` to the name the
    /// referenced secret carries inside the control plane namespace.
    ///
    /// Referenced resources are copied into the control plane namespace
    /// under a `ref-` prefixed name; configuration only ever names the
    /// reference, never the copy.
    pub fn referenced_secret_name(&self, ref_name: &str) -> Result<String, ConfigError> {
        for reference in &self.resources {
            if reference.name == ref_name {
                if reference.resource_ref.kind != "Secret" {
                    return Err(ConfigError::InvalidResourceReference {
                        kind: reference.resource_ref.kind.clone(),
                        name: reference.resource_ref.name.clone(),
                    });
                }
                return Ok(format!(
                    "{REFERENCED_RESOURCES_PREFIX}{}",
                    reference.resource_ref.name
                ));
            }
        }
        Err(ConfigError::MissingResourceReference {
            name: ref_name.to_string(),
        })
    }
}
