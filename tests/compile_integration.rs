// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! End-to-end compilation tests for the metalcast compiler.
//!
//! These tests drive the public API the way a reconciliation layer would:
//! configuration read from YAML documents, a full control plane and worker
//! compilation, and the status record threaded into the following cycle.

use serde_json::json;

use metalcast::cluster::ClusterContext;
use metalcast::compiler::{compile_control_plane, compile_worker};
use metalcast::config::{CloudProfileConfig, ControlPlaneConfig, WorkerSpec, WorkerStatus};
use metalcast::secrets::StaticSecretResolver;
use metalcast::values::ControlPlaneParams;

const CONTROL_PLANE_CONFIG: &str = r#"
cloudControllerManager:
  featureGates:
    CustomResourceValidation: true
loadBalancerConfig:
  metallbConfig:
    ipAddressPool:
    - 10.10.0.0/24
    - 10.20.0.5-10.20.0.9
    enableSpeaker: true
  calicoBgpConfig:
    asNumber: 65001
    nodeToNodeMeshEnabled: true
    serviceLoadBalancerIPs:
    - 10.10.0.0/24
    bgpPeer:
    - peerIP: 192.0.2.1:179
      asNumber: 65000
      nodeSelector: role == 'worker'
      filters:
      - lab
    bgpFilter:
    - name: lab
      importV4:
      - cidr: 10.40.0.0/16
        matchOperator: In
        action: Accept
"#;

const CLOUD_PROFILE: &str = r#"
machineImages:
- name: gardenlinux
  versions:
  - version: "1443.3"
    image: registry/gardenlinux:1443.3
machineTypes:
- name: metal-4c-32g
  serverLabels:
    size: m
"#;

const WORKER: &str = r#"
namespace: shoot--dev--cast
region: lab
pools:
- name: pool-1
  zones: [z1, z2]
  minimum: 0
  maximum: 10
  machineType: metal-4c-32g
  machineImage:
    name: gardenlinux
    version: "1443.3"
  providerConfig:
    extraIgnition:
      raw: |
        passwd:
          users:
          - name: ops
      secretRef: extra-ignition
    extraServerLabels:
      rack: r7
    metaData:
      pool: one
"#;

const CLUSTER: &str = r#"
name: shoot--dev--cast
namespace: shoot--dev--cast
networkType: calico
networkingProviderConfig:
  overlay:
    enabled: true
resources:
- name: extra-ignition
  resourceRef:
    kind: Secret
    name: pool-ignition
    apiVersion: v1
"#;

fn parse_inputs() -> (ControlPlaneConfig, CloudProfileConfig, WorkerSpec, ClusterContext) {
    (
        serde_yaml::from_str(CONTROL_PLANE_CONFIG).unwrap(),
        serde_yaml::from_str(CLOUD_PROFILE).unwrap(),
        serde_yaml::from_str(WORKER).unwrap(),
        serde_yaml::from_str(CLUSTER).unwrap(),
    )
}

#[test]
fn test_control_plane_end_to_end() {
    let (config, _, _, cluster) = parse_inputs();
    let params = ControlPlaneParams {
        scaled_down: false,
        checksums: [(
            "cloud-provider-config".to_string(),
            "abc123".to_string(),
        )]
        .into_iter()
        .collect(),
        server_secret_name: "cloud-controller-manager-server".to_string(),
    };

    let compiled = compile_control_plane(&config, &cluster, &params).unwrap();

    // Overlay network: no cloud routes.
    assert_eq!(
        compiled.seed_values["cloud-controller-manager"]["configureCloudRoutes"],
        json!(false)
    );

    let metallb = &compiled.shoot_values["metallb"];
    assert_eq!(metallb["enabled"], json!(true));
    assert_eq!(metallb["speaker"]["enabled"], json!(true));

    let bgp = &compiled.shoot_values["calico-bgp"]["bgp"];
    assert_eq!(bgp["asNumber"], json!(65001));
    assert_eq!(bgp["bgpPeer"][0]["peerIP"], json!("192.0.2.1:179"));
    assert!(bgp["bgpFilter"][0].get("importV4").is_some());
    assert!(bgp["bgpFilter"][0].get("exportV4").is_none());

    assert_eq!(
        compiled.config_values["clusterName"],
        json!("shoot--dev--cast")
    );
}

#[tokio::test]
async fn test_worker_end_to_end_with_secret_ignition() {
    let (_, profile, worker, cluster) = parse_inputs();
    let resolver = StaticSecretResolver::new().with_field(
        "ref-pool-ignition",
        "ignition",
        "passwd:\n  users:\n  - name: audit\nstorage:\n  disks: []\n"
            .as_bytes()
            .to_vec(),
    );

    let compiled = compile_worker(
        &worker,
        &cluster,
        &profile,
        &WorkerStatus::default(),
        &resolver,
    )
    .await
    .unwrap();

    assert_eq!(compiled.machines.len(), 2);
    let spec = &compiled.machines[0];

    // The machine type labels and the pool extras are both present.
    assert_eq!(spec.server_labels.get("size"), Some(&"m".to_string()));
    assert_eq!(spec.server_labels.get("rack"), Some(&"r7".to_string()));
    assert_eq!(spec.metadata.get("pool"), Some(&"one".to_string()));

    // Inline and secret fragments merged: the users sequence appended, the
    // secret-only storage key filled in.
    let ignition: serde_yaml::Value =
        serde_yaml::from_str(spec.ignition.as_deref().unwrap()).unwrap();
    let users = ignition["passwd"]["users"].as_sequence().unwrap();
    assert_eq!(users.len(), 2);
    assert!(ignition.get("storage").is_some());
    assert_eq!(spec.ignition_override, Some(true));

    // Both zones carry identical provisioning content under distinct names.
    assert_eq!(compiled.machines[0].image, compiled.machines[1].image);
    assert_ne!(compiled.machines[0].name, compiled.machines[1].name);

    // The next cycle sees the recorded image.
    assert_eq!(compiled.status.machine_images.len(), 1);
}

#[tokio::test]
async fn test_worker_inputs_round_trip_through_files() {
    use std::io::Write as _;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("worker.yaml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(WORKER.as_bytes()).unwrap();
    drop(file);

    let raw = std::fs::read_to_string(&path).unwrap();
    let worker: WorkerSpec = serde_yaml::from_str(&raw).unwrap();
    assert_eq!(worker.pools.len(), 1);
    assert_eq!(worker.pools[0].zones, vec!["z1", "z2"]);
}
