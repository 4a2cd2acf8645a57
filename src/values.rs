// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Network policy and control plane value synthesis.
//!
//! Each load-balancing feature compiles independently: an absent
//! configuration section yields `{enabled: false}` and nothing else, a
//! present section yields `{enabled: true}` plus its fields. BGP peer and
//! filter emission is additionally gated on the cluster running the Calico
//! network type.
//!
//! The value trees are built as strongly typed structs and flattened to
//! [`CompiledValues`] only at the serialization boundary, so a mistyped key
//! name is a compile error here instead of a template failure downstream.
//! The emitted key names and nesting levels are a stable wire contract with
//! the templating/deployment layer.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::address_pool::{validate_address_pool, validate_address_pools};
use crate::cluster::ClusterContext;
use crate::config::{
    BgpFilter, BgpFilterRule, CalicoBgpConfig, ControlPlaneConfig, FilterAction, IpamKind,
    MatchOperator, MetalLoadBalancerConfig, MetallbConfig,
};
use crate::constants::{CALICO_NETWORK_TYPE, TLS_CIPHER_SUITES};
use crate::errors::{CompileError, ConfigError};
use crate::labels::{
    ALLOW_EGRESS_TO_ISTIO_INGRESS_LABEL, LOCAL_METAL_API_ANNOTATION,
    POD_MAINTENANCE_RESTART_LABEL,
};

/// The generic tree handed to the templating layer: maps of string to
/// scalars, sequences and nested maps.
pub type CompiledValues = serde_json::Value;

/// Caller-supplied inputs for the control plane values that are owned by
/// the reconciliation layer rather than the provider configuration.
#[derive(Clone, Debug, Default)]
pub struct ControlPlaneParams {
    /// Whether the control plane is scaled down (hibernated).
    pub scaled_down: bool,

    /// Checksums of dependent config maps and secrets, keyed by object
    /// name, stamped into pod annotations to trigger rollout on change.
    pub checksums: BTreeMap<String, String>,

    /// Name of the server certificate secret of the cloud-controller-manager.
    pub server_secret_name: String,
}

fn flatten<T: Serialize>(what: &'static str, value: &T) -> Result<CompiledValues, CompileError> {
    serde_json::to_value(value).map_err(|err| {
        CompileError::Config(ConfigError::Encode {
            what,
            reason: err.to_string(),
        })
    })
}

// ============================================================================
// Feature Gates
// ============================================================================

/// The `{enabled: ...}` shape shared by every feature gate.
#[derive(Serialize)]
struct FeatureGate {
    enabled: bool,
}

impl FeatureGate {
    const DISABLED: Self = Self { enabled: false };
    const ENABLED: Self = Self { enabled: true };
}

// ============================================================================
// MetalLB
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetallbValues {
    enabled: bool,
    speaker: FeatureGate,
    l2_advertisement: FeatureGate,
    ip_address_pool: Vec<String>,
}

/// Compile the MetalLB values.
///
/// Every configured address pool entry is validated before emission; the
/// first invalid entry aborts the compilation.
pub fn metallb_values(config: &ControlPlaneConfig) -> Result<CompiledValues, CompileError> {
    let Some(metallb) = load_balancer(config).and_then(|lb| lb.metallb.as_ref()) else {
        return flatten("metallb", &FeatureGate::DISABLED);
    };

    validate_address_pools(&metallb.ip_address_pool)?;

    flatten("metallb", &enabled_metallb_values(metallb))
}

fn enabled_metallb_values(metallb: &MetallbConfig) -> MetallbValues {
    MetallbValues {
        enabled: true,
        speaker: FeatureGate {
            enabled: metallb.enable_speaker,
        },
        l2_advertisement: FeatureGate {
            enabled: metallb.enable_l2_advertisement,
        },
        ip_address_pool: metallb.ip_address_pool.clone(),
    }
}

// ============================================================================
// Calico BGP
// ============================================================================

#[derive(Serialize)]
struct CalicoBgpValues<T: Serialize> {
    enabled: bool,
    bgp: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BgpValues {
    enabled: bool,
    as_number: u32,
    #[serde(rename = "serviceLoadBalancerIPs")]
    service_load_balancer_ips: Vec<String>,
    #[serde(rename = "serviceExternalIPs")]
    service_external_ips: Vec<String>,
    #[serde(rename = "serviceClusterIPs")]
    service_cluster_ips: Vec<String>,
    node_to_node_mesh_enabled: bool,
    bgp_peer: Vec<BgpPeerValues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bgp_filter: Option<Vec<BgpFilterValues>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BgpPeerValues {
    #[serde(rename = "peerIP")]
    peer_ip: String,
    as_number: u32,
    node_selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BgpFilterValues {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    export_v4: Option<Vec<BgpFilterRuleValues>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    import_v4: Option<Vec<BgpFilterRuleValues>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    export_v6: Option<Vec<BgpFilterRuleValues>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    import_v6: Option<Vec<BgpFilterRuleValues>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BgpFilterRuleValues {
    cidr: String,
    action: FilterAction,
    match_operator: MatchOperator,
}

/// Compile the Calico BGP values.
///
/// When the section is absent the feature compiles to
/// `{enabled: false, bgp: {enabled: false}}`. When present, the advertised
/// service addresses, peers and filters are only emitted on clusters whose
/// network type is Calico; every advertised address and filter rule CIDR is
/// validated first and the first invalid entry aborts the compilation.
pub fn calico_bgp_values(
    config: &ControlPlaneConfig,
    cluster: &ClusterContext,
) -> Result<CompiledValues, CompileError> {
    let Some(bgp_config) = load_balancer(config).and_then(|lb| lb.calico_bgp.as_ref()) else {
        return flatten(
            "calico-bgp",
            &CalicoBgpValues {
                enabled: false,
                bgp: FeatureGate::DISABLED,
            },
        );
    };

    let calico_cluster = cluster.network_type.as_deref() == Some(CALICO_NETWORK_TYPE);

    let (service_lb_ips, service_ext_ips, service_cluster) = if calico_cluster {
        (
            validated_pools(&bgp_config.service_load_balancer_ips)?,
            validated_pools(&bgp_config.service_external_ips)?,
            validated_pools(&bgp_config.service_cluster_ips)?,
        )
    } else {
        (Vec::new(), Vec::new(), Vec::new())
    };

    let filters = if calico_cluster {
        bgp_config
            .bgp_filter
            .iter()
            .map(filter_values)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        Vec::new()
    };

    let peers = if calico_cluster {
        bgp_config.bgp_peer.iter().map(peer_values).collect()
    } else {
        Vec::new()
    };

    let values = CalicoBgpValues {
        enabled: true,
        bgp: BgpValues {
            enabled: true,
            as_number: bgp_config.as_number,
            service_load_balancer_ips: service_lb_ips,
            service_external_ips: service_ext_ips,
            service_cluster_ips: service_cluster,
            node_to_node_mesh_enabled: bgp_config.node_to_node_mesh_enabled,
            bgp_peer: peers,
            bgp_filter: (!filters.is_empty()).then_some(filters),
        },
    };

    flatten("calico-bgp", &values)
}

fn validated_pools(pools: &[String]) -> Result<Vec<String>, CompileError> {
    for pool in pools {
        validate_address_pool(pool)?;
    }
    Ok(pools.to_vec())
}

fn peer_values(peer: &crate::config::BgpPeer) -> BgpPeerValues {
    BgpPeerValues {
        peer_ip: peer.peer_ip.clone(),
        as_number: peer.as_number,
        node_selector: peer.node_selector.clone(),
        filters: (!peer.filters.is_empty()).then(|| peer.filters.clone()),
    }
}

fn filter_values(filter: &BgpFilter) -> Result<BgpFilterValues, CompileError> {
    Ok(BgpFilterValues {
        name: filter.name.clone(),
        export_v4: rule_values(&filter.export_v4)?,
        import_v4: rule_values(&filter.import_v4)?,
        export_v6: rule_values(&filter.export_v6)?,
        import_v6: rule_values(&filter.import_v6)?,
    })
}

/// An empty rule list compiles to an omitted key, never to an empty list,
/// so consumers can tell "no rules" from "empty configuration".
fn rule_values(rules: &[BgpFilterRule]) -> Result<Option<Vec<BgpFilterRuleValues>>, CompileError> {
    if rules.is_empty() {
        return Ok(None);
    }
    let mut compiled = Vec::with_capacity(rules.len());
    for rule in rules {
        validate_address_pool(&rule.cidr)?;
        compiled.push(BgpFilterRuleValues {
            cidr: rule.cidr.clone(),
            action: rule.action,
            match_operator: rule.match_operator,
        });
    }
    Ok(Some(compiled))
}

// ============================================================================
// Metal Load Balancer Controller
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetalLoadBalancerManagerValues {
    enabled: bool,
    #[serde(rename = "nodeCIDRMask")]
    node_cidr_mask: i32,
    #[serde(rename = "allocateNodeCIDRs")]
    allocate_node_cidrs: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetalLoadBalancerSpeakerValues {
    enabled: bool,
    vni: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    metal_bond_server: Option<String>,
}

/// Compile the metal load balancer controller manager values (seed side).
pub fn metal_load_balancer_manager_values(
    config: &ControlPlaneConfig,
) -> Result<CompiledValues, CompileError> {
    let Some(lb) = metal_load_balancer(config) else {
        return flatten("metal-load-balancer-controller-manager", &FeatureGate::DISABLED);
    };

    flatten(
        "metal-load-balancer-controller-manager",
        &MetalLoadBalancerManagerValues {
            enabled: true,
            node_cidr_mask: lb.node_cidr_mask,
            allocate_node_cidrs: lb.allocate_node_cidrs,
        },
    )
}

/// Compile the metal load balancer controller speaker values (cluster side).
pub fn metal_load_balancer_speaker_values(
    config: &ControlPlaneConfig,
) -> Result<CompiledValues, CompileError> {
    let Some(lb) = metal_load_balancer(config) else {
        return flatten("metal-load-balancer-controller-speaker", &FeatureGate::DISABLED);
    };

    flatten(
        "metal-load-balancer-controller-speaker",
        &MetalLoadBalancerSpeakerValues {
            enabled: true,
            vni: lb.vni,
            metal_bond_server: lb.metal_bond_server.clone(),
        },
    )
}

fn metal_load_balancer(config: &ControlPlaneConfig) -> Option<&MetalLoadBalancerConfig> {
    load_balancer(config).and_then(|lb| lb.metal_load_balancer.as_ref())
}

fn load_balancer(config: &ControlPlaneConfig) -> Option<&crate::config::LoadBalancerConfig> {
    config.load_balancer.as_ref()
}

fn calico_bgp(config: &ControlPlaneConfig) -> Option<&CalicoBgpConfig> {
    load_balancer(config).and_then(|lb| lb.calico_bgp.as_ref())
}

// ============================================================================
// Cloud Controller Manager
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CloudControllerManagerValues {
    enabled: bool,
    replicas: i32,
    cluster_name: String,
    pod_network: String,
    pod_annotations: BTreeMap<String, String>,
    pod_labels: BTreeMap<String, String>,
    tls_cipher_suites: Vec<String>,
    secrets: CloudControllerManagerSecrets,
    #[serde(skip_serializing_if = "Option::is_none")]
    feature_gates: Option<BTreeMap<String, bool>>,
    configure_cloud_routes: bool,
}

#[derive(Serialize)]
struct CloudControllerManagerSecrets {
    server: String,
}

/// Name of the cloud provider config map whose checksum rolls the CCM pods.
pub const CLOUD_PROVIDER_CONFIG_NAME: &str = "cloud-provider-config";

/// Name of the cloud provider credentials secret whose checksum rolls the
/// CCM pods.
pub const CLOUD_PROVIDER_SECRET_NAME: &str = "cloudprovider";

/// Compile the cloud-controller-manager deployment values.
///
/// Cloud route configuration is the inverse of the overlay flag: clusters
/// running an overlay network do not need routes programmed by the CCM.
pub fn cloud_controller_manager_values(
    config: &ControlPlaneConfig,
    cluster: &ClusterContext,
    params: &ControlPlaneParams,
) -> Result<CompiledValues, CompileError> {
    let mut pod_labels = BTreeMap::new();
    pod_labels.insert(POD_MAINTENANCE_RESTART_LABEL.to_string(), "true".to_string());
    if cluster
        .seed_annotations
        .get(LOCAL_METAL_API_ANNOTATION)
        .is_some_and(|value| value == "true")
    {
        pod_labels.insert(
            ALLOW_EGRESS_TO_ISTIO_INGRESS_LABEL.to_string(),
            "allowed".to_string(),
        );
    }

    let mut pod_annotations = BTreeMap::new();
    for name in [CLOUD_PROVIDER_CONFIG_NAME, CLOUD_PROVIDER_SECRET_NAME] {
        if let Some(checksum) = params.checksums.get(name) {
            let kind = if name == CLOUD_PROVIDER_CONFIG_NAME {
                "config"
            } else {
                "secret"
            };
            pod_annotations.insert(format!("checksum/{kind}-{name}"), checksum.clone());
        }
    }

    let overlay_enabled = cluster.overlay_enabled()?;

    let values = CloudControllerManagerValues {
        enabled: true,
        replicas: if params.scaled_down { 0 } else { 1 },
        cluster_name: cluster.namespace.clone(),
        pod_network: cluster.pod_networks.join(","),
        pod_annotations,
        pod_labels,
        tls_cipher_suites: TLS_CIPHER_SUITES.iter().map(ToString::to_string).collect(),
        secrets: CloudControllerManagerSecrets {
            server: params.server_secret_name.clone(),
        },
        feature_gates: config
            .cloud_controller_manager
            .as_ref()
            .and_then(|ccm| ccm.feature_gates.clone()),
        configure_cloud_routes: !overlay_enabled,
    };

    flatten("cloud-controller-manager", &values)
}

// ============================================================================
// Cloud Provider Config
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CloudProviderConfigValues {
    cluster_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    networking: Option<NetworkingValues>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NetworkingValues {
    configure_node_addresses: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ipam_kind: Option<IpamKind>,
}

/// Compile the cloud-provider config values consumed by the CCM at runtime.
pub fn cloud_provider_config_values(
    config: &ControlPlaneConfig,
    cluster: &ClusterContext,
) -> Result<CompiledValues, CompileError> {
    let networking = config
        .cloud_controller_manager
        .as_ref()
        .and_then(|ccm| ccm.networking.as_ref())
        .map(|networking| NetworkingValues {
            configure_node_addresses: networking.configure_node_addresses,
            ipam_kind: networking.ipam_kind.clone(),
        });

    flatten(
        "cloud-provider-config",
        &CloudProviderConfigValues {
            cluster_name: cluster.name.clone(),
            networking,
        },
    )
}

// ============================================================================
// Tree Assembly
// ============================================================================

#[derive(Serialize)]
struct GlobalValues {
    #[serde(
        rename = "genericTokenKubeconfigSecretName",
        skip_serializing_if = "Option::is_none"
    )]
    generic_token_kubeconfig_secret_name: Option<String>,
}

#[derive(Serialize)]
struct SeedValues {
    global: GlobalValues,
    #[serde(rename = "cloud-controller-manager")]
    cloud_controller_manager: CompiledValues,
    #[serde(rename = "metal-load-balancer-controller-manager")]
    metal_load_balancer_manager: CompiledValues,
}

#[derive(Serialize)]
struct ShootValues {
    #[serde(rename = "cloud-controller-manager")]
    cloud_controller_manager: FeatureGate,
    metallb: CompiledValues,
    #[serde(rename = "calico-bgp")]
    calico_bgp: CompiledValues,
    #[serde(rename = "metal-load-balancer-controller-speaker")]
    metal_load_balancer_speaker: CompiledValues,
}

/// Assemble the control plane tree deployed next to the cluster's control
/// plane (seed side).
pub fn control_plane_seed_values(
    config: &ControlPlaneConfig,
    cluster: &ClusterContext,
    params: &ControlPlaneParams,
) -> Result<CompiledValues, CompileError> {
    let values = SeedValues {
        global: GlobalValues {
            generic_token_kubeconfig_secret_name: cluster
                .generic_token_kubeconfig_secret_name
                .clone(),
        },
        cloud_controller_manager: cloud_controller_manager_values(config, cluster, params)?,
        metal_load_balancer_manager: metal_load_balancer_manager_values(config)?,
    };
    flatten("seed-controlplane", &values)
}

/// Assemble the system component tree deployed into the cluster itself
/// (shoot side).
pub fn control_plane_shoot_values(
    config: &ControlPlaneConfig,
    cluster: &ClusterContext,
) -> Result<CompiledValues, CompileError> {
    // Peer and filter emission presupposes a Calico cluster; warn once per
    // compilation when configuration exists that cannot take effect.
    if calico_bgp(config).is_some()
        && cluster.network_type.as_deref() != Some(CALICO_NETWORK_TYPE)
    {
        tracing::warn!(
            network_type = cluster.network_type.as_deref().unwrap_or("unset"),
            "calico BGP configured on a cluster without the calico network type"
        );
    }

    let values = ShootValues {
        cloud_controller_manager: FeatureGate::ENABLED,
        metallb: metallb_values(config)?,
        calico_bgp: calico_bgp_values(config, cluster)?,
        metal_load_balancer_speaker: metal_load_balancer_speaker_values(config)?,
    };
    flatten("shoot-system-components", &values)
}
