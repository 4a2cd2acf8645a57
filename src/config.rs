// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed provider configuration for bare-metal clusters.
//!
//! This module defines the declarative configuration objects consumed by the
//! compiler:
//!
//! - [`ControlPlaneConfig`] - control plane settings (CCM, load balancing)
//! - [`CloudProfileConfig`] - the region/image/machine-type catalog
//! - [`WorkerSpec`] / [`WorkerPool`] - per-pool worker settings
//! - [`WorkerConfig`] - the pool-level provider extension
//! - [`WorkerStatus`] - the persisted machine image status record
//!
//! All types serialize with the stable camelCase wire names; the compiler
//! treats every instance as read-only for the duration of one compilation
//! call.
//!
//! # Example: a control plane with MetalLB
//!
//! ```rust
//! use metalcast::config::{ControlPlaneConfig, LoadBalancerConfig, MetallbConfig};
//!
//! let config = ControlPlaneConfig {
//!     load_balancer: Some(LoadBalancerConfig {
//!         metallb: Some(MetallbConfig {
//!             ip_address_pool: vec!["10.10.0.0/24".to_string()],
//!             enable_speaker: true,
//!             enable_l2_advertisement: false,
//!         }),
//!         ..Default::default()
//!     }),
//!     ..Default::default()
//! };
//! assert!(config.cloud_controller_manager.is_none());
//! ```

use k8s_openapi::api::core::v1::Taint;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::ByteString;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Control Plane Configuration
// ============================================================================

/// Configuration settings for the control plane of one cluster.
///
/// Every section is optional; an absent section compiles to a disabled
/// feature, never to an error.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneConfig {
    /// Configuration settings for the cloud-controller-manager.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_controller_manager: Option<CloudControllerManagerConfig>,

    /// Configuration settings for cluster load balancing.
    #[serde(
        default,
        rename = "loadBalancerConfig",
        skip_serializing_if = "Option::is_none"
    )]
    pub load_balancer: Option<LoadBalancerConfig>,

    /// Policy for generating hostnames for the worker nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname_policy: Option<HostnamePolicy>,
}

/// Policy for generating hostnames for the worker nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum HostnamePolicy {
    /// Hostnames follow the name of the backing server.
    Server,
}

/// Configuration settings for the cloud-controller-manager.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudControllerManagerConfig {
    /// Enabled feature gates, keyed by gate name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_gates: Option<BTreeMap<String, bool>>,

    /// Networking settings for node address management.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networking: Option<CloudControllerNetworking>,
}

/// Networking settings for the cloud-controller-manager.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudControllerNetworking {
    /// Enables the configuration of node addresses.
    #[serde(default)]
    pub configure_node_addresses: bool,

    /// Enables the IPAM integration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipam_kind: Option<IpamKind>,
}

/// Identifies the IPAM objects in use.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IpamKind {
    /// Resource group of the IPAM objects.
    pub api_group: String,

    /// Resource kind of the IPAM objects.
    pub kind: String,
}

/// Configuration settings for cluster load balancing.
///
/// Each member enables one independent load-balancing feature.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct LoadBalancerConfig {
    /// Configuration settings for MetalLB.
    #[serde(
        default,
        rename = "metallbConfig",
        skip_serializing_if = "Option::is_none"
    )]
    pub metallb: Option<MetallbConfig>,

    /// BGP configuration settings for Calico.
    #[serde(
        default,
        rename = "calicoBgpConfig",
        skip_serializing_if = "Option::is_none"
    )]
    pub calico_bgp: Option<CalicoBgpConfig>,

    /// Configuration settings for the metal load balancer controller.
    #[serde(
        default,
        rename = "metalLoadBalancerConfig",
        skip_serializing_if = "Option::is_none"
    )]
    pub metal_load_balancer: Option<MetalLoadBalancerConfig>,
}

/// Configuration settings for MetalLB.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetallbConfig {
    /// Address pools MetalLB assigns service addresses from. Each entry is
    /// either a CIDR block or an inclusive IP range (`start-end`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_address_pool: Vec<String>,

    /// Enables the MetalLB speaker.
    #[serde(default)]
    pub enable_speaker: bool,

    /// Enables L2 advertisement.
    #[serde(default)]
    pub enable_l2_advertisement: bool,
}

/// BGP configuration settings for Calico.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalicoBgpConfig {
    /// Default AS number used by a node.
    pub as_number: u32,

    /// Enables the node-to-node mesh.
    #[serde(default)]
    pub node_to_node_mesh_enabled: bool,

    /// CIDR blocks for Kubernetes Service LoadBalancer IPs.
    #[serde(
        default,
        rename = "serviceLoadBalancerIPs",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub service_load_balancer_ips: Vec<String>,

    /// CIDR blocks for Kubernetes Service External IPs.
    #[serde(
        default,
        rename = "serviceExternalIPs",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub service_external_ips: Vec<String>,

    /// CIDR blocks from which service cluster IPs are allocated.
    #[serde(
        default,
        rename = "serviceClusterIPs",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub service_cluster_ips: Vec<String>,

    /// BGP peers to announce service addresses to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bgp_peer: Vec<BgpPeer>,

    /// Named BGP route filters referenced by peers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bgp_filter: Vec<BgpFilter>,
}

/// A BGP routing protocol neighbor.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BgpPeer {
    /// IP address of the BGP peer, followed by an optional port number.
    #[serde(rename = "peerIP")]
    pub peer_ip: String,

    /// AS number of the BGP peer.
    pub as_number: u32,

    /// Key-value pair selecting the nodes that should have this peering.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub node_selector: String,

    /// Names of the [`BgpFilter`] entries applied to this peer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
}

/// A named set of BGP route filter rules.
///
/// Rules are grouped into up to four ordered lists keyed by address family
/// and direction. A list that is empty here is omitted entirely from the
/// compiled output, so consumers can distinguish "no rules configured" from
/// an explicitly empty rule set.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BgpFilter {
    /// Name of the filter, referenced from [`BgpPeer::filters`].
    pub name: String,

    /// Ordered IPv4 rules acting on exporting routes to a peer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub export_v4: Vec<BgpFilterRule>,

    /// Ordered IPv4 rules acting on importing routes from a peer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub import_v4: Vec<BgpFilterRule>,

    /// Ordered IPv6 rules acting on exporting routes to a peer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub export_v6: Vec<BgpFilterRule>,

    /// Ordered IPv6 rules acting on importing routes from a peer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub import_v6: Vec<BgpFilterRule>,
}

/// A single BGP filter rule: one CIDR block, a match operator and an action.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BgpFilterRule {
    /// The CIDR block the rule applies to.
    pub cidr: String,

    /// How routes are matched against the CIDR.
    pub match_operator: MatchOperator,

    /// Whether matching routes are accepted or rejected.
    pub action: FilterAction,
}

/// Match operator of a [`BgpFilterRule`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum MatchOperator {
    /// The route equals the CIDR.
    Equal,
    /// The route does not equal the CIDR.
    NotEqual,
    /// The route is contained in the CIDR.
    In,
    /// The route is not contained in the CIDR.
    NotIn,
}

/// Action of a [`BgpFilterRule`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum FilterAction {
    /// Accept matching routes.
    Accept,
    /// Reject matching routes.
    Reject,
}

/// Configuration settings for the metal load balancer controller.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetalLoadBalancerConfig {
    /// Mask size of the per-node CIDR allocations.
    #[serde(rename = "nodeCIDRMask")]
    pub node_cidr_mask: i32,

    /// Enables allocation of node CIDRs by the controller manager.
    #[serde(rename = "allocateNodeCIDRs", default)]
    pub allocate_node_cidrs: bool,

    /// VXLAN network identifier announced by the speaker.
    pub vni: i32,

    /// Address of the metalbond route reflector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metal_bond_server: Option<String>,
}

// ============================================================================
// Cloud Profile Configuration
// ============================================================================

/// Provider-specific catalog embedded into the cloud profile.
///
/// Loaded once at the start of a reconciliation and treated as read-only.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileConfig {
    /// Machine images understood by the provider, mapping logical names and
    /// versions to image references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_images: Vec<MachineImages>,

    /// Machine types understood by the provider.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_types: Vec<MachineTypeConfig>,

    /// Supported regions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub region_configs: Vec<RegionConfig>,
}

/// A logical machine image name and its published versions.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineImages {
    /// Logical name of the machine image.
    pub name: String,

    /// Versions with their provider-specific identifiers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<MachineImageVersion>,
}

/// One version of a machine image.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineImageVersion {
    /// Version of the image.
    pub version: String,

    /// Provider-specific image reference.
    pub image: String,

    /// CPU architecture of the image. Unset means the platform default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
}

/// A machine type and the server labels used to select matching hardware.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineTypeConfig {
    /// Name of the machine type.
    pub name: String,

    /// Labels a server must carry to satisfy this machine type.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub server_labels: BTreeMap<String, String>,
}

/// Definition of one region.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegionConfig {
    /// Name of the region.
    pub name: String,

    /// Server endpoint of the region.
    pub server: String,

    /// CA bundle of the region server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub certificate_authority_data: Option<ByteString>,
}

// ============================================================================
// Worker Configuration
// ============================================================================

/// Pool-level provider extension carried in a worker pool's raw
/// provider-specific configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    /// Additional ignition for the pool's nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_ignition: Option<IgnitionConfig>,

    /// Extra labels applied on top of the machine type's server labels for
    /// server selection.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_server_labels: BTreeMap<String, String>,

    /// Network resources used to assign IP addresses to the pool's nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses_from_networks: Vec<AddressesFromNetworks>,

    /// Additional key-value data passed to each machine.
    #[serde(
        default,
        rename = "metaData",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub metadata: BTreeMap<String, String>,
}

/// A node-bootstrap configuration fragment.
///
/// The inline `raw` fragment and the secret-referenced fragment are
/// deep-merged; `override` decides which side wins when both set the same
/// scalar key. Unset is equivalent to `true`: the secret-sourced value wins.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IgnitionConfig {
    /// Inline ignition fragment in YAML form. An empty string is an empty
    /// fragment, not an error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,

    /// Name of a cluster resource reference pointing at a Secret whose
    /// `ignition` field holds an additional fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<String>,

    /// Whether secret-sourced scalar values override inline values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#override: Option<bool>,
}

/// Reference to an IP subnet.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubnetRef {
    /// Name of the subnet resource.
    pub name: String,

    /// Group of the subnet resource.
    pub api_group: String,

    /// Kind of the subnet resource.
    pub kind: String,
}

/// A network resource used for machine address assignment.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressesFromNetworks {
    /// Metadata key the assigned address is published under.
    pub key: String,

    /// Reference to the IP subnet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_ref: Option<SubnetRef>,
}

// ============================================================================
// Worker Status
// ============================================================================

/// Persisted status of a worker resource.
///
/// `machine_images` records every image mapping that has been used by this
/// worker. The record survives catalog edits: when an operator removes a
/// mapping that provisioned machines still depend on, resolution falls back
/// to this record so reconciliation keeps working.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatus {
    /// Machine images in use by this worker, accumulated across
    /// reconciliations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_images: Vec<MachineImage>,
}

/// A recorded mapping from a logical image identity to its reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineImage {
    /// Logical name of the machine image.
    pub name: String,

    /// Logical version of the machine image.
    pub version: String,

    /// Provider-specific image reference.
    pub image: String,

    /// CPU architecture of the machine image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
}

// ============================================================================
// Worker Spec
// ============================================================================

/// The worker resource handed to the compiler: all pools of one cluster.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSpec {
    /// Namespace hosting the cluster's control plane.
    pub namespace: String,

    /// Region the machines are created in.
    pub region: String,

    /// Configured worker pools.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pools: Vec<WorkerPool>,
}

/// One configured worker pool.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPool {
    /// Name of the pool, unique within the worker.
    pub name: String,

    /// Ordered availability zones the pool spans.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,

    /// Minimum number of machines.
    pub minimum: i32,

    /// Maximum number of machines.
    pub maximum: i32,

    /// Maximum number of machines created above the desired count during an
    /// update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_surge: Option<IntOrString>,

    /// Maximum number of machines unavailable during an update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<IntOrString>,

    /// Machine type of the pool's machines.
    pub machine_type: String,

    /// Logical image reference of the pool's machines.
    pub machine_image: MachineImageRef,

    /// CPU architecture of the pool's machines. Unset means the platform
    /// default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,

    /// Labels applied to the pool's nodes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Annotations applied to the pool's nodes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Taints applied to the pool's nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,

    /// Raw provider-specific pool configuration, decoded to [`WorkerConfig`]
    /// during compilation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,
}

/// Logical (name, version) reference to a machine image.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineImageRef {
    /// Logical name of the machine image.
    pub name: String,

    /// Logical version of the machine image.
    pub version: String,
}
