// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `compiler.rs`

use serde_json::json;
use std::collections::BTreeMap;

use crate::cluster::ClusterContext;
use crate::compiler::{compile_control_plane, compile_worker};
use crate::config::{
    CloudProfileConfig, ControlPlaneConfig, MachineImageRef, MachineImageVersion, MachineImages,
    MachineTypeConfig, WorkerPool, WorkerSpec, WorkerStatus,
};
use crate::errors::CompileError;
use crate::secrets::StaticSecretResolver;
use crate::values::ControlPlaneParams;

fn test_cluster() -> ClusterContext {
    ClusterContext {
        name: "shoot--dev--cast".to_string(),
        namespace: "shoot--dev--cast".to_string(),
        network_type: Some("calico".to_string()),
        ..Default::default()
    }
}

fn test_profile() -> CloudProfileConfig {
    CloudProfileConfig {
        machine_images: vec![MachineImages {
            name: "gardenlinux".to_string(),
            versions: vec![MachineImageVersion {
                version: "1443.3".to_string(),
                image: "registry/gardenlinux:1443.3".to_string(),
                architecture: None,
            }],
        }],
        machine_types: vec![MachineTypeConfig {
            name: "metal-4c-32g".to_string(),
            server_labels: BTreeMap::from([("size".to_string(), "m".to_string())]),
        }],
        ..Default::default()
    }
}

fn test_pool(name: &str) -> WorkerPool {
    WorkerPool {
        name: name.to_string(),
        zones: vec!["z1".to_string(), "z2".to_string()],
        minimum: 0,
        maximum: 10,
        max_surge: None,
        max_unavailable: None,
        machine_type: "metal-4c-32g".to_string(),
        machine_image: MachineImageRef {
            name: "gardenlinux".to_string(),
            version: "1443.3".to_string(),
        },
        architecture: None,
        labels: BTreeMap::from([("role".to_string(), "worker".to_string())]),
        annotations: BTreeMap::new(),
        taints: Vec::new(),
        provider_config: None,
    }
}

fn test_worker(pools: Vec<WorkerPool>) -> WorkerSpec {
    WorkerSpec {
        namespace: "shoot--dev--cast".to_string(),
        region: "lab".to_string(),
        pools,
    }
}

// ============================================================================
// Worker Compilation
// ============================================================================

#[tokio::test]
async fn test_worker_compilation_emits_one_spec_per_zone() {
    let worker = test_worker(vec![test_pool("pool-1")]);
    let compiled = compile_worker(
        &worker,
        &test_cluster(),
        &test_profile(),
        &WorkerStatus::default(),
        &StaticSecretResolver::new(),
    )
    .await
    .unwrap();

    assert_eq!(compiled.machines.len(), 2);

    let first = &compiled.machines[0];
    let second = &compiled.machines[1];
    assert_eq!(first.name, "shoot--dev--cast-pool-1-z1");
    assert_eq!(second.name, "shoot--dev--cast-pool-1-z2");
    assert_eq!(first.zone, "z1");
    assert_eq!(second.zone, "z2");
    // Both zones carry the same resolved image reference.
    assert_eq!(first.image, "registry/gardenlinux:1443.3");
    assert_eq!(first.image, second.image);
    assert!(first.class_name.starts_with("shoot--dev--cast-pool-1-z1-"));
    assert_eq!(
        first.labels.get("metalcast.firestoned.io/cluster-name"),
        Some(&"shoot--dev--cast".to_string())
    );
    assert_eq!(first.pool_labels.get("role"), Some(&"worker".to_string()));
    assert!(first.ignition.is_none());
    assert!(first.ignition_override.is_none());
}

#[tokio::test]
async fn test_worker_compilation_records_status_with_default_architecture() {
    let worker = test_worker(vec![test_pool("pool-1")]);
    let compiled = compile_worker(
        &worker,
        &test_cluster(),
        &test_profile(),
        &WorkerStatus::default(),
        &StaticSecretResolver::new(),
    )
    .await
    .unwrap();

    assert_eq!(compiled.status.machine_images.len(), 1);
    let recorded = &compiled.status.machine_images[0];
    assert_eq!(recorded.name, "gardenlinux");
    assert_eq!(recorded.version, "1443.3");
    assert_eq!(recorded.architecture.as_deref(), Some("amd64"));
}

#[tokio::test]
async fn test_worker_compilation_status_is_idempotent_across_cycles() {
    let worker = test_worker(vec![test_pool("pool-1")]);
    let cluster = test_cluster();
    let profile = test_profile();
    let resolver = StaticSecretResolver::new();

    let first = compile_worker(&worker, &cluster, &profile, &WorkerStatus::default(), &resolver)
        .await
        .unwrap();
    let second = compile_worker(&worker, &cluster, &profile, &first.status, &resolver)
        .await
        .unwrap();

    assert_eq!(second.status.machine_images.len(), 1);
    assert_eq!(first.status.machine_images, second.status.machine_images);
}

#[tokio::test]
async fn test_worker_compilation_survives_catalog_removal_via_status() {
    let worker = test_worker(vec![test_pool("pool-1")]);
    let cluster = test_cluster();
    let resolver = StaticSecretResolver::new();

    let seeded = compile_worker(
        &worker,
        &cluster,
        &test_profile(),
        &WorkerStatus::default(),
        &resolver,
    )
    .await
    .unwrap();

    // The image mapping disappears from the catalog; the recorded status
    // keeps the pool reconcilable.
    let bare_profile = CloudProfileConfig {
        machine_types: test_profile().machine_types,
        ..Default::default()
    };
    let compiled = compile_worker(&worker, &cluster, &bare_profile, &seeded.status, &resolver)
        .await
        .unwrap();
    assert_eq!(compiled.machines[0].image, "registry/gardenlinux:1443.3");

    // Absent from both sources, the compilation fails naming the triple.
    let err = compile_worker(
        &worker,
        &cluster,
        &bare_profile,
        &WorkerStatus::default(),
        &resolver,
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_reason(), "ImageNotFound");
    let message = err.to_string();
    assert!(message.contains("pool-1"), "got: {message}");
}

#[tokio::test]
async fn test_worker_compilation_fails_fast_and_names_the_pool() {
    let mut broken = test_pool("pool-2");
    broken.machine_image.version = "0.0.0".to_string();
    let worker = test_worker(vec![test_pool("pool-1"), broken, test_pool("pool-3")]);

    let err = compile_worker(
        &worker,
        &test_cluster(),
        &test_profile(),
        &WorkerStatus::default(),
        &StaticSecretResolver::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CompileError::WorkerPool { ref pool, .. } if pool == "pool-2"));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_worker_compilation_composes_ignition() {
    let mut pool = test_pool("pool-1");
    pool.provider_config = Some(json!({
        "extraIgnition": {"raw": "storage:\n  disks: []\n"},
    }));
    let worker = test_worker(vec![pool]);

    let compiled = compile_worker(
        &worker,
        &test_cluster(),
        &test_profile(),
        &WorkerStatus::default(),
        &StaticSecretResolver::new(),
    )
    .await
    .unwrap();

    let spec = &compiled.machines[0];
    assert!(spec.ignition.as_deref().unwrap().contains("storage"));
    assert_eq!(spec.ignition_override, Some(true));
}

// ============================================================================
// Control Plane Compilation
// ============================================================================

#[test]
fn test_control_plane_compilation_produces_three_trees() {
    let compiled = compile_control_plane(
        &ControlPlaneConfig::default(),
        &test_cluster(),
        &ControlPlaneParams {
            server_secret_name: "cloud-controller-manager-server".to_string(),
            ..Default::default()
        },
    )
    .unwrap();

    assert!(compiled.seed_values.get("cloud-controller-manager").is_some());
    assert_eq!(compiled.shoot_values["metallb"], json!({"enabled": false}));
    assert_eq!(
        compiled.config_values,
        json!({"clusterName": "shoot--dev--cast"})
    );
}

#[test]
fn test_control_plane_compilation_aborts_on_invalid_pool() {
    use crate::config::{LoadBalancerConfig, MetallbConfig};

    let config = ControlPlaneConfig {
        load_balancer: Some(LoadBalancerConfig {
            metallb: Some(MetallbConfig {
                ip_address_pool: vec!["10.0.0.90-10.0.0.10".to_string()],
                enable_speaker: false,
                enable_l2_advertisement: false,
            }),
            ..Default::default()
        }),
        ..Default::default()
    };

    let err = compile_control_plane(
        &config,
        &test_cluster(),
        &ControlPlaneParams::default(),
    )
    .unwrap_err();
    assert_eq!(err.status_reason(), "InvalidAddressPool");
}
