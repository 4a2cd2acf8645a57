// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The values compiler: orchestration of every compilation stage.
//!
//! Two entry points cover the two halves of a reconciliation:
//!
//! - [`compile_control_plane`] produces the three value trees consumed by
//!   the templating layer (seed components, cluster system components, the
//!   cloud-provider config).
//! - [`compile_worker`] produces one provisioning spec per (pool, zone)
//!   pair plus the updated machine image status record.
//!
//! Both are pure apart from secret resolution, hold no state across calls
//! and may run concurrently for independent resources. Any component
//! failure aborts the whole compilation; partial output is never returned.

use std::time::Instant;

use crate::cluster::ClusterContext;
use crate::config::{
    CloudProfileConfig, ControlPlaneConfig, MachineImage, WorkerPool, WorkerSpec, WorkerStatus,
};
use crate::constants::DEFAULT_ARCHITECTURE;
use crate::errors::CompileError;
use crate::ignition::{compose_ignition, effective_override};
use crate::labels::CLUSTER_NAME_LABEL;
use crate::machine_image::{accumulate_machine_images, resolve_machine_image};
use crate::metrics;
use crate::secrets::SecretResolver;
use crate::values::{
    cloud_provider_config_values, control_plane_seed_values, control_plane_shoot_values,
    CompiledValues, ControlPlaneParams,
};
use crate::worker::{
    decode_worker_config, deployment_name, resolve_server_labels, worker_pool_hash,
    MachineProvisioningSpec,
};

/// The three value trees compiled for one control plane.
#[derive(Clone, Debug)]
pub struct ControlPlaneCompilation {
    /// Components deployed next to the control plane (seed side).
    pub seed_values: CompiledValues,

    /// System components deployed into the cluster itself (shoot side).
    pub shoot_values: CompiledValues,

    /// The cloud-provider config consumed by the CCM at runtime.
    pub config_values: CompiledValues,
}

/// The artifacts compiled for one worker resource.
#[derive(Clone, Debug)]
pub struct WorkerCompilation {
    /// One provisioning spec per (pool, zone) pair, in configuration order.
    pub machines: Vec<MachineProvisioningSpec>,

    /// The updated machine image status record, to be persisted for the
    /// next reconciliation.
    pub status: WorkerStatus,
}

/// Compile every control plane value tree for one cluster.
///
/// # Errors
///
/// Fails on the first invalid address pool entry or undecodable
/// configuration blob. No partial trees are returned.
pub fn compile_control_plane(
    config: &ControlPlaneConfig,
    cluster: &ClusterContext,
    params: &ControlPlaneParams,
) -> Result<ControlPlaneCompilation, CompileError> {
    let started = Instant::now();
    tracing::debug!(cluster = %cluster.name, "compiling control plane values");

    let result: Result<ControlPlaneCompilation, CompileError> = (|| {
        Ok(ControlPlaneCompilation {
            seed_values: control_plane_seed_values(config, cluster, params)?,
            shoot_values: control_plane_shoot_values(config, cluster)?,
            config_values: cloud_provider_config_values(config, cluster)?,
        })
    })();

    match &result {
        Ok(_) => metrics::record_compilation_success("control_plane", started.elapsed()),
        Err(err) => metrics::record_compilation_error("control_plane", err.status_reason()),
    }
    result
}

/// Compile the provisioning specs and the status record for one worker.
///
/// Pools compile in configuration order; the first failing pool aborts the
/// whole compilation with an error naming that pool. Secret resolution for
/// ignition fragments is the only blocking operation and is serialized
/// within one call.
///
/// # Errors
///
/// Fails when a pool's provider configuration does not decode, its image
/// resolves from neither catalog nor status, its server labels are empty,
/// or its ignition cannot be composed.
pub async fn compile_worker(
    worker: &WorkerSpec,
    cluster: &ClusterContext,
    profile: &CloudProfileConfig,
    existing_status: &WorkerStatus,
    resolver: &dyn SecretResolver,
) -> Result<WorkerCompilation, CompileError> {
    let started = Instant::now();
    tracing::debug!(
        cluster = %cluster.name,
        pools = worker.pools.len(),
        "compiling worker provisioning specs"
    );

    let mut machines = Vec::new();
    let mut resolved_images = Vec::new();

    for pool in &worker.pools {
        match compile_pool(worker, cluster, profile, existing_status, resolver, pool).await {
            Ok((mut pool_machines, image)) => {
                machines.append(&mut pool_machines);
                resolved_images.push(image);
            }
            Err(err) => {
                let wrapped = err.in_pool(&pool.name);
                metrics::record_compilation_error("worker", wrapped.status_reason());
                return Err(wrapped);
            }
        }
    }

    let status = accumulate_machine_images(existing_status, resolved_images);

    tracing::info!(
        cluster = %cluster.name,
        machines = machines.len(),
        recorded_images = status.machine_images.len(),
        "worker compilation complete"
    );
    metrics::record_compilation_success("worker", started.elapsed());

    Ok(WorkerCompilation { machines, status })
}

async fn compile_pool(
    worker: &WorkerSpec,
    cluster: &ClusterContext,
    profile: &CloudProfileConfig,
    existing_status: &WorkerStatus,
    resolver: &dyn SecretResolver,
    pool: &WorkerPool,
) -> Result<(Vec<MachineProvisioningSpec>, MachineImage), CompileError> {
    let worker_config = decode_worker_config(pool)?;

    let architecture = pool
        .architecture
        .as_deref()
        .unwrap_or(DEFAULT_ARCHITECTURE)
        .to_string();

    let image = resolve_machine_image(
        profile,
        existing_status,
        &pool.machine_image.name,
        &pool.machine_image.version,
        &architecture,
    )?;

    let server_labels = resolve_server_labels(profile, &pool.machine_type, &worker_config)?;

    let (ignition, ignition_override) = match &worker_config.extra_ignition {
        Some(ignition_config) => {
            let payload = compose_ignition(ignition_config, cluster, resolver).await?;
            if payload.is_empty() {
                (None, None)
            } else {
                (Some(payload), Some(effective_override(ignition_config)))
            }
        }
        None => (None, None),
    };

    let hash = worker_pool_hash(pool)?;
    let labels: std::collections::BTreeMap<String, String> =
        std::iter::once((CLUSTER_NAME_LABEL.to_string(), cluster.name.clone())).collect();

    let machines = pool
        .zones
        .iter()
        .enumerate()
        .map(|(zone_index, zone)| {
            let name = deployment_name(&worker.namespace, &pool.name, zone_index);
            MachineProvisioningSpec {
                class_name: format!("{name}-{hash}"),
                name,
                zone: zone.clone(),
                machine_type: pool.machine_type.clone(),
                image: image.clone(),
                server_labels: server_labels.clone(),
                ignition: ignition.clone(),
                ignition_override,
                metadata: worker_config.metadata.clone(),
                addresses_from_networks: worker_config.addresses_from_networks.clone(),
                labels: labels.clone(),
                pool_labels: pool.labels.clone(),
                pool_annotations: pool.annotations.clone(),
                pool_taints: pool.taints.clone(),
            }
        })
        .collect();

    let recorded = MachineImage {
        name: pool.machine_image.name.clone(),
        version: pool.machine_image.version.clone(),
        image,
        architecture: Some(architecture),
    };

    Ok((machines, recorded))
}
