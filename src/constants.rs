// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the metalcast compiler.
//!
//! This module contains all string and numeric constants used throughout the
//! codebase. Constants are organized by category for easy maintenance. The
//! field and component names below are part of the wire contract with the
//! templating/deployment layer and must remain stable across versions.

// ============================================================================
// Provider Identity
// ============================================================================

/// Name of the bare-metal provider.
pub const PROVIDER_NAME: &str = "provider-metalcast";

// ============================================================================
// Machine Class Provider Spec Field Names
// ============================================================================

/// Field carrying the resolved machine image reference
pub const IMAGE_FIELD: &str = "image";

/// Field carrying the server selection labels
pub const SERVER_LABELS_FIELD: &str = "serverLabels";

/// Field carrying the merged ignition payload
pub const IGNITION_FIELD: &str = "ignition";

/// Field carrying the ignition override flag
pub const IGNITION_OVERRIDE_FIELD: &str = "ignitionOverride";

/// Field carrying opaque machine metadata
pub const METADATA_FIELD: &str = "metaData";

/// Field carrying address-assignment network references
pub const IPAM_CONFIG_FIELD: &str = "ipamConfig";

/// Field carrying the machine labels
pub const LABELS_FIELD: &str = "labels";

// ============================================================================
// Chart Component Names
// ============================================================================

/// Component key for the cloud-controller-manager values
pub const CLOUD_CONTROLLER_MANAGER_NAME: &str = "cloud-controller-manager";

/// Component key for the MetalLB values
pub const METALLB_NAME: &str = "metallb";

/// Component key for the Calico BGP values
pub const CALICO_BGP_NAME: &str = "calico-bgp";

/// Component key for the metal load balancer controller speaker values
pub const METAL_LOAD_BALANCER_SPEAKER_NAME: &str = "metal-load-balancer-controller-speaker";

/// Component key for the metal load balancer controller manager values
pub const METAL_LOAD_BALANCER_MANAGER_NAME: &str = "metal-load-balancer-controller-manager";

// ============================================================================
// Cluster Conventions
// ============================================================================

/// Network type of clusters eligible for BGP peer and filter emission
pub const CALICO_NETWORK_TYPE: &str = "calico";

/// Default CPU architecture assumed when a worker pool does not specify one
pub const DEFAULT_ARCHITECTURE: &str = "amd64";

/// Prefix prepended to referenced cluster resources when they are copied
/// into the control plane namespace
pub const REFERENCED_RESOURCES_PREFIX: &str = "ref-";

/// Number of hex characters of the pool hash embedded in machine class names
pub const WORKER_POOL_HASH_LENGTH: usize = 5;

/// Secret field holding an externally managed ignition fragment
pub const IGNITION_SECRET_FIELD: &str = "ignition";

// ============================================================================
// TLS Constants
// ============================================================================

/// Cipher suites accepted by control plane components serving TLS
pub const TLS_CIPHER_SUITES: &[&str] = &[
    "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305",
    "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305",
];
