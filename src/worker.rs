// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Worker provisioning spec construction.
//!
//! For every configured pool the compiler emits one
//! [`MachineProvisioningSpec`] per zone. The spec carries everything a
//! downstream machine controller needs to create the machines of that zone:
//! the resolved image reference, the server selection labels, the merged
//! ignition payload and the opaque metadata. Deployment and class names
//! embed a short hash over the replacement-relevant pool fields, so a
//! changed machine type or image rolls the pool instead of mutating it in
//! place.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use k8s_openapi::api::core::v1::Taint;

use crate::config::{AddressesFromNetworks, CloudProfileConfig, WorkerConfig, WorkerPool};
use crate::constants::{DEFAULT_ARCHITECTURE, WORKER_POOL_HASH_LENGTH};
use crate::errors::{CompileError, ConfigError, WorkerError};

/// The per-(pool, zone) description of what machines to create and how to
/// configure them.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineProvisioningSpec {
    /// Deployment name: `{namespace}-{pool}-z{index+1}`.
    pub name: String,

    /// Machine class name: the deployment name suffixed with the pool hash.
    pub class_name: String,

    /// Zone this spec provisions into.
    pub zone: String,

    /// Machine type of the pool.
    pub machine_type: String,

    /// Resolved provider-specific image reference.
    pub image: String,

    /// Labels a server must carry to back one of these machines.
    pub server_labels: BTreeMap<String, String>,

    /// Merged ignition payload. Omitted when composition yielded nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignition: Option<String>,

    /// Whether secret-sourced ignition overrides inline ignition, passed
    /// through for the machine controller. Present exactly when `ignition`
    /// is present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignition_override: Option<bool>,

    /// Opaque key-value data handed to each machine.
    #[serde(rename = "metaData", skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,

    /// Network references for machine address assignment.
    #[serde(rename = "ipamConfig", skip_serializing_if = "Vec::is_empty")]
    pub addresses_from_networks: Vec<AddressesFromNetworks>,

    /// Machine labels stamped by the compiler (cluster ownership).
    pub labels: BTreeMap<String, String>,

    /// Node labels configured on the pool.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub pool_labels: BTreeMap<String, String>,

    /// Node annotations configured on the pool.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub pool_annotations: BTreeMap<String, String>,

    /// Node taints configured on the pool.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pool_taints: Vec<Taint>,
}

/// Deployment name of one pool in one zone. Zones are numbered from 1 in
/// the order they are configured.
#[must_use]
pub fn deployment_name(namespace: &str, pool: &str, zone_index: usize) -> String {
    format!("{namespace}-{pool}-z{}", zone_index + 1)
}

/// Short content hash over the pool fields whose change requires replacing
/// the pool's machines: machine type, image identity, architecture and the
/// raw provider configuration.
pub fn worker_pool_hash(pool: &WorkerPool) -> Result<String, CompileError> {
    let mut hasher = Sha256::new();
    hasher.update(pool.machine_type.as_bytes());
    hasher.update([0]);
    hasher.update(pool.machine_image.name.as_bytes());
    hasher.update([0]);
    hasher.update(pool.machine_image.version.as_bytes());
    hasher.update([0]);
    hasher.update(
        pool.architecture
            .as_deref()
            .unwrap_or(DEFAULT_ARCHITECTURE)
            .as_bytes(),
    );
    if let Some(provider_config) = &pool.provider_config {
        let raw = serde_json::to_vec(provider_config).map_err(|err| {
            CompileError::Config(ConfigError::Encode {
                what: "worker pool provider config",
                reason: err.to_string(),
            })
        })?;
        hasher.update([0]);
        hasher.update(&raw);
    }

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex.truncate(WORKER_POOL_HASH_LENGTH);
    Ok(hex)
}

/// Resolve the server selection labels for one pool.
///
/// The machine type's catalog labels are taken first, then the pool's extra
/// labels are laid over them (pool extras win on conflicts).
///
/// # Errors
///
/// Returns [`WorkerError::NoServerLabels`] when neither source yields any
/// label; a machine cannot be scheduled onto hardware without selection
/// criteria.
pub fn resolve_server_labels(
    profile: &CloudProfileConfig,
    machine_type: &str,
    worker_config: &WorkerConfig,
) -> Result<BTreeMap<String, String>, WorkerError> {
    let mut combined = BTreeMap::new();
    if let Some(machine_type_config) = profile
        .machine_types
        .iter()
        .find(|candidate| candidate.name == machine_type)
    {
        combined.extend(
            machine_type_config
                .server_labels
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
    }
    combined.extend(
        worker_config
            .extra_server_labels
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );

    if combined.is_empty() {
        return Err(WorkerError::NoServerLabels {
            machine_type: machine_type.to_string(),
        });
    }
    Ok(combined)
}

/// Decode a pool's raw provider configuration. An absent extension is an
/// empty configuration, not an error.
pub fn decode_worker_config(pool: &WorkerPool) -> Result<WorkerConfig, ConfigError> {
    match &pool.provider_config {
        Some(raw) => {
            serde_json::from_value(raw.clone()).map_err(|err| ConfigError::Decode {
                what: "worker pool provider config",
                reason: err.to_string(),
            })
        }
        None => Ok(WorkerConfig::default()),
    }
}
