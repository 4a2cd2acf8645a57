// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across the compiler.
//!
//! This module defines the label and annotation keys stamped onto compiled
//! artifacts or consulted on cluster objects, to ensure consistency between
//! the control plane values and the worker provisioning specs.

// ============================================================================
// Metalcast-Specific Labels
// ============================================================================

/// Label carrying the owning cluster name on every provisioned machine
pub const CLUSTER_NAME_LABEL: &str = "metalcast.firestoned.io/cluster-name";

// ============================================================================
// Control Plane Pod Labels
// ============================================================================

/// Label requesting a pod restart during the cluster maintenance window
pub const POD_MAINTENANCE_RESTART_LABEL: &str = "maintenance.gardener.cloud/restart";

/// Label allowing egress from control plane pods to the istio ingress gateway
pub const ALLOW_EGRESS_TO_ISTIO_INGRESS_LABEL: &str =
    "networking.resources.gardener.cloud/to-all-istio-ingresses-istio-ingressgateway-tcp-9443";

// ============================================================================
// Seed Annotations
// ============================================================================

/// Annotation marking a seed that hosts a local bare-metal API
pub const LOCAL_METAL_API_ANNOTATION: &str = "metalcast.firestoned.io/local-metal-api";
