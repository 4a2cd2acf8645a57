// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

use serde_json::json;

use crate::config::{
    CalicoBgpConfig, ControlPlaneConfig, FilterAction, IgnitionConfig, MatchOperator,
    WorkerConfig, WorkerStatus,
};

#[test]
fn test_control_plane_config_wire_names() {
    let config: ControlPlaneConfig = serde_json::from_value(json!({
        "cloudControllerManager": {
            "featureGates": {"CustomResourceValidation": true},
        },
        "loadBalancerConfig": {
            "metallbConfig": {
                "ipAddressPool": ["10.10.0.0/24"],
                "enableSpeaker": true,
            },
            "metalLoadBalancerConfig": {
                "nodeCIDRMask": 24,
                "allocateNodeCIDRs": true,
                "vni": 4100,
            },
        },
    }))
    .unwrap();

    let ccm = config.cloud_controller_manager.unwrap();
    assert_eq!(
        ccm.feature_gates.unwrap().get("CustomResourceValidation"),
        Some(&true)
    );

    let lb = config.load_balancer.unwrap();
    let metallb = lb.metallb.unwrap();
    assert!(metallb.enable_speaker);
    assert!(!metallb.enable_l2_advertisement);
    assert_eq!(metallb.ip_address_pool, vec!["10.10.0.0/24".to_string()]);

    let metal_lb = lb.metal_load_balancer.unwrap();
    assert_eq!(metal_lb.node_cidr_mask, 24);
    assert!(metal_lb.allocate_node_cidrs);
    assert_eq!(metal_lb.vni, 4100);
    assert!(metal_lb.metal_bond_server.is_none());
}

#[test]
fn test_calico_bgp_config_ip_field_casing() {
    let config: CalicoBgpConfig = serde_json::from_value(json!({
        "asNumber": 65001,
        "serviceLoadBalancerIPs": ["10.10.0.0/24"],
        "serviceExternalIPs": ["10.20.0.0/24"],
        "serviceClusterIPs": ["10.30.0.0/24"],
        "bgpPeer": [{"peerIP": "192.0.2.1", "asNumber": 65000}],
        "bgpFilter": [{
            "name": "lab",
            "importV4": [{"cidr": "10.0.0.0/8", "matchOperator": "NotIn", "action": "Reject"}],
        }],
    }))
    .unwrap();

    assert_eq!(config.as_number, 65001);
    assert_eq!(config.service_load_balancer_ips, vec!["10.10.0.0/24"]);
    assert_eq!(config.service_external_ips, vec!["10.20.0.0/24"]);
    assert_eq!(config.service_cluster_ips, vec!["10.30.0.0/24"]);
    assert_eq!(config.bgp_peer[0].peer_ip, "192.0.2.1");
    assert!(config.bgp_peer[0].filters.is_empty());

    let rule = &config.bgp_filter[0].import_v4[0];
    assert_eq!(rule.match_operator, MatchOperator::NotIn);
    assert_eq!(rule.action, FilterAction::Reject);
    assert!(config.bgp_filter[0].export_v4.is_empty());

    // The uppercase IP suffixes must survive a round trip.
    let raw = serde_json::to_value(&config).unwrap();
    assert!(raw.get("serviceLoadBalancerIPs").is_some());
    assert!(raw.get("serviceExternalIPs").is_some());
    assert!(raw.get("serviceClusterIPs").is_some());
    assert!(raw["bgpPeer"][0].get("peerIP").is_some());
}

#[test]
fn test_ignition_config_override_wire_name() {
    let config: IgnitionConfig = serde_json::from_value(json!({
        "raw": "a: 1\n",
        "secretRef": "extra-ignition",
        "override": false,
    }))
    .unwrap();
    assert_eq!(config.r#override, Some(false));

    let raw = serde_json::to_value(&config).unwrap();
    assert_eq!(raw["override"], json!(false));

    // Unset override stays absent on the wire.
    let unset: IgnitionConfig = serde_json::from_value(json!({"raw": "a: 1\n"})).unwrap();
    assert_eq!(unset.r#override, None);
    let raw = serde_json::to_value(&unset).unwrap();
    assert!(raw.get("override").is_none());
}

#[test]
fn test_worker_config_metadata_wire_name() {
    let config: WorkerConfig = serde_json::from_value(json!({
        "metaData": {"rack": "r7"},
        "addressesFromNetworks": [{
            "key": "private",
            "subnetRef": {"name": "pool-a", "apiGroup": "ipam.metal.dev", "kind": "Subnet"},
        }],
    }))
    .unwrap();

    assert_eq!(config.metadata.get("rack"), Some(&"r7".to_string()));
    let subnet = config.addresses_from_networks[0].subnet_ref.as_ref().unwrap();
    assert_eq!(subnet.api_group, "ipam.metal.dev");
}

#[test]
fn test_worker_status_decodes_from_empty_document() {
    let status: WorkerStatus = serde_yaml::from_str("{}").unwrap();
    assert!(status.machine_images.is_empty());

    let status: WorkerStatus = serde_yaml::from_str(
        "machineImages:\n- name: gardenlinux\n  version: \"1443.3\"\n  image: ref\n",
    )
    .unwrap();
    assert_eq!(status.machine_images.len(), 1);
    assert!(status.machine_images[0].architecture.is_none());
}
