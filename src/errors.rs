// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Compilation error types for metalcast.
//!
//! This module provides specialized error types for:
//! - Address pool validation (CIDR blocks and IP ranges)
//! - Machine image resolution against catalog and persisted status
//! - Ignition fragment decoding and secret resolution
//! - Provider configuration decoding
//!
//! Every compiler function returns a typed error on the first failure; the
//! orchestrating compiler never produces partial output. These errors carry
//! the offending input so callers can surface an actionable message in a
//! status condition.

use thiserror::Error;

/// Errors produced while validating an address pool entry.
///
/// An address pool is either a CIDR block (`10.0.0.0/24`) or an inclusive
/// IP range (`10.0.0.10-10.0.0.90`). A single invalid entry aborts the
/// whole compilation of the configuration section that contains it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidAddressPool {
    /// The entry contains no `-` and does not parse as a CIDR block.
    #[error("invalid CIDR {pool:?}")]
    NotCidr {
        /// The rejected pool entry
        pool: String,
    },

    /// The entry contains a `-` but does not split into exactly two parts.
    #[error("invalid IP range {pool:?}")]
    MalformedRange {
        /// The rejected pool entry
        pool: String,
    },

    /// The range start does not parse as an IP address.
    #[error("invalid IP range {pool:?}: invalid start IP {start:?}")]
    InvalidStart {
        /// The rejected pool entry
        pool: String,
        /// The unparsable start substring
        start: String,
    },

    /// The range end does not parse as an IP address.
    #[error("invalid IP range {pool:?}: invalid end IP {end:?}")]
    InvalidEnd {
        /// The rejected pool entry
        pool: String,
        /// The unparsable end substring
        end: String,
    },

    /// The range start is after the end under byte-wise comparison.
    #[error("invalid IP range {pool:?}: start IP {start} is after the end IP {end}")]
    StartAfterEnd {
        /// The rejected pool entry
        pool: String,
        /// The parsed start address
        start: std::net::IpAddr,
        /// The parsed end address
        end: std::net::IpAddr,
    },

    /// The range endpoints belong to different address families.
    #[error("invalid IP range {pool:?}: start IP {start} and end IP {end} are of different address families")]
    MixedFamilies {
        /// The rejected pool entry
        pool: String,
        /// The parsed start address
        start: std::net::IpAddr,
        /// The parsed end address
        end: std::net::IpAddr,
    },
}

/// Errors produced while resolving a machine image reference.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// No entry for (name, version, architecture) exists in the image
    /// catalog, and none was recorded in the persisted worker status.
    #[error("machine image {name:?} version {version:?} for architecture {architecture:?} not found in catalog or status")]
    NotFound {
        /// Logical image name
        name: String,
        /// Logical image version
        version: String,
        /// CPU architecture the lookup was performed for
        architecture: String,
    },
}

/// Errors produced while composing an ignition payload.
#[derive(Error, Debug, Clone)]
pub enum IgnitionError {
    /// An inline or secret-sourced fragment is not valid YAML.
    #[error("failed to decode {source_kind} ignition fragment: {reason}")]
    Decode {
        /// Which fragment failed (`inline` or `secret`)
        source_kind: &'static str,
        /// Parser message
        reason: String,
    },

    /// The merged tree could not be serialized back to YAML.
    #[error("failed to encode merged ignition: {reason}")]
    Encode {
        /// Serializer message
        reason: String,
    },
}

/// Errors propagated from the injected secret resolution capability.
#[derive(Error, Debug, Clone)]
pub enum SecretError {
    /// The referenced secret does not exist.
    #[error("secret {name:?} not found in namespace {namespace:?}")]
    NotFound {
        /// Secret name
        name: String,
        /// Namespace that was searched
        namespace: String,
    },

    /// The secret exists but the expected field is absent.
    #[error("field {field:?} not found in secret {name:?}")]
    MissingField {
        /// Secret name
        name: String,
        /// Field that was expected
        field: String,
    },

    /// The underlying store returned a transport or server error.
    #[error("failed to read secret {name:?}: {reason}")]
    Api {
        /// Secret name
        name: String,
        /// Underlying error message
        reason: String,
    },
}

/// Errors produced while decoding caller-supplied configuration blobs.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// A raw provider configuration section is not valid for its schema.
    #[error("could not decode {what}: {reason}")]
    Decode {
        /// Which blob failed to decode
        what: &'static str,
        /// Parser message
        reason: String,
    },

    /// A compiled value tree could not be flattened for the templating
    /// layer.
    #[error("failed to encode {what} values: {reason}")]
    Encode {
        /// Which tree failed to flatten
        what: &'static str,
        /// Serializer message
        reason: String,
    },

    /// A named resource reference points at a non-Secret resource.
    #[error("invalid referenced resource, expected kind Secret, not {kind:?}: {name:?}")]
    InvalidResourceReference {
        /// Kind of the referenced resource
        kind: String,
        /// Name of the referenced resource
        name: String,
    },

    /// No resource reference with the given name exists on the cluster.
    #[error("missing or invalid referenced resource: {name:?}")]
    MissingResourceReference {
        /// Reference name that was looked up
        name: String,
    },
}

/// Errors produced while building worker provisioning specs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// Neither the machine type catalog nor the pool configuration yields
    /// any server selection labels.
    #[error("no server labels found for machine type {machine_type:?} or worker config")]
    NoServerLabels {
        /// The machine type the lookup was performed for
        machine_type: String,
    },
}

/// Composite error type covering every compilation failure.
///
/// This is the primary error type returned by the values compiler. A single
/// failure anywhere aborts the whole compilation; the `WorkerPool` variant
/// wraps failures with the name of the pool being compiled so callers can
/// identify the failing sub-computation.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Address pool validation failure
    #[error(transparent)]
    AddressPool(#[from] InvalidAddressPool),

    /// Machine image resolution failure
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Ignition composition failure
    #[error(transparent)]
    Ignition(#[from] IgnitionError),

    /// Secret resolution failure
    #[error(transparent)]
    Secret(#[from] SecretError),

    /// Configuration decoding failure
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Worker provisioning failure
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// A failure while compiling one worker pool, annotated with its name
    #[error("failed to compile worker pool {pool:?}: {source}")]
    WorkerPool {
        /// Name of the pool being compiled
        pool: String,
        /// The underlying failure
        source: Box<CompileError>,
    },
}

impl CompileError {
    /// Annotate an error with the worker pool it occurred in.
    #[must_use]
    pub fn in_pool(self, pool: &str) -> Self {
        Self::WorkerPool {
            pool: pool.to_string(),
            source: Box::new(self),
        }
    }

    /// Returns true if this error is transient and the reconciliation should
    /// be retried without operator intervention.
    ///
    /// Only transport-level secret resolution failures are transient; every
    /// validation or lookup failure requires a configuration change first.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Secret(SecretError::Api { .. }) => true,
            Self::WorkerPool { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Returns the status reason code for this error.
    ///
    /// This is used when surfacing the failure as a condition on the owning
    /// resource.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::AddressPool(_) => "InvalidAddressPool",
            Self::Image(_) => "ImageNotFound",
            Self::Ignition(_) => "IgnitionDecodeError",
            Self::Secret(SecretError::NotFound { .. }) => "SecretNotFound",
            Self::Secret(SecretError::MissingField { .. }) => "SecretFieldMissing",
            Self::Secret(SecretError::Api { .. }) => "SecretResolutionError",
            Self::Config(_) => "ConfigDecodeError",
            Self::Worker(WorkerError::NoServerLabels { .. }) => "NoServerLabels",
            Self::WorkerPool { source, .. } => source.status_reason(),
        }
    }
}
