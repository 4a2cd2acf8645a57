// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ignition fragment composition.
//!
//! A worker pool may carry node-bootstrap (ignition) configuration from two
//! places: an inline YAML fragment and a secret referenced through the
//! cluster's resource references. Both are decoded into a generic value tree
//! and deep-merged under an explicit [`MergePolicy`]:
//!
//! - maps merge recursively
//! - sequences append (secret-sourced elements after inline elements, no
//!   deduplication)
//! - on a scalar conflict the secret-sourced value wins unless the
//!   fragment's `override` flag is explicitly `false`
//!
//! An empty merge result composes to an empty string, never to a serialized
//! empty map, so downstream consumers do not receive a non-empty but vacuous
//! payload.

use serde_yaml::{Mapping, Value};

use crate::cluster::ClusterContext;
use crate::config::IgnitionConfig;
use crate::constants::IGNITION_SECRET_FIELD;
use crate::errors::{CompileError, IgnitionError};
use crate::secrets::SecretResolver;

/// How sequence-typed keys combine during a merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceStrategy {
    /// Overlay elements are appended after base elements.
    Append,
    /// The overlay sequence replaces the base sequence.
    Replace,
}

/// Explicit policy parameters for [`merge_values`].
#[derive(Clone, Copy, Debug)]
pub struct MergePolicy {
    /// Strategy for sequence-typed keys.
    pub sequences: SequenceStrategy,

    /// Whether the overlay wins scalar conflicts. Filling a key the base
    /// does not set is not a conflict and always happens.
    pub overlay_wins: bool,
}

/// Recursively merge `overlay` into `base` under the given policy.
pub fn merge_values(base: &mut Value, overlay: Value, policy: &MergePolicy) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => merge_values(base_value, overlay_value, policy),
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
        }
        (Value::Sequence(base_seq), Value::Sequence(mut overlay_seq)) => {
            match policy.sequences {
                SequenceStrategy::Append => base_seq.append(&mut overlay_seq),
                SequenceStrategy::Replace => *base_seq = overlay_seq,
            }
        }
        (base_slot, overlay_value) => {
            if policy.overlay_wins || matches!(base_slot, Value::Null) {
                *base_slot = overlay_value;
            }
        }
    }
}

/// Whether secret-sourced scalars override inline scalars for this
/// fragment. Unset is equivalent to `true`.
#[must_use]
pub fn effective_override(config: &IgnitionConfig) -> bool {
    config.r#override.unwrap_or(true)
}

fn decode_fragment(bytes: &[u8], source_kind: &'static str) -> Result<Value, IgnitionError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Mapping(Mapping::new()));
    }
    let value: Value = serde_yaml::from_slice(bytes).map_err(|err| IgnitionError::Decode {
        source_kind,
        reason: err.to_string(),
    })?;
    // An empty document parses to null; treat it as an empty tree.
    Ok(match value {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    })
}

/// Compose the final ignition payload for one worker pool.
///
/// Decodes the inline fragment (an empty or absent fragment is an empty
/// tree), resolves and decodes the secret-referenced fragment if one is
/// configured, merges the two and serializes the result.
///
/// # Errors
///
/// Fails when a fragment does not decode, the secret reference cannot be
/// resolved, or the referenced secret is missing the `ignition` field.
pub async fn compose_ignition(
    config: &IgnitionConfig,
    cluster: &ClusterContext,
    resolver: &dyn SecretResolver,
) -> Result<String, CompileError> {
    let mut merged = match &config.raw {
        Some(raw) => decode_fragment(raw.as_bytes(), "inline")?,
        None => Value::Mapping(Mapping::new()),
    };

    if let Some(secret_ref) = config.secret_ref.as_deref().filter(|name| !name.is_empty()) {
        let secret_name = cluster.referenced_secret_name(secret_ref)?;
        let bytes = resolver.resolve(&secret_name, IGNITION_SECRET_FIELD).await?;
        let overlay = decode_fragment(&bytes, "secret")?;

        let policy = MergePolicy {
            sequences: SequenceStrategy::Append,
            overlay_wins: effective_override(config),
        };
        merge_values(&mut merged, overlay, &policy);
    }

    // An empty result must stay an empty string, not "{}".
    match &merged {
        Value::Mapping(map) if map.is_empty() => Ok(String::new()),
        Value::Null => Ok(String::new()),
        _ => serde_yaml::to_string(&merged).map_err(|err| {
            CompileError::Ignition(IgnitionError::Encode {
                reason: err.to_string(),
            })
        }),
    }
}
