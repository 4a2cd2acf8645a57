// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Machine image resolution and status accumulation.
//!
//! Image references are resolved by exact (name, version, architecture)
//! lookup against the cloud profile catalog, falling back to the worker's
//! persisted status record. The fallback keeps already-provisioned machines
//! reconcilable after an operator removes their image mapping from the
//! catalog.
//!
//! Resolution is read-only against both sources. The status record grows by
//! set-union: an image identity is recorded once and never overwritten.

use crate::config::{CloudProfileConfig, MachineImage, WorkerStatus};
use crate::constants::DEFAULT_ARCHITECTURE;
use crate::errors::ImageError;

/// Look up an image reference in the cloud profile catalog.
///
/// Returns `None` when no entry matches (name, version, architecture)
/// exactly. Catalog entries without an architecture match only the platform
/// default.
#[must_use]
pub fn find_image_in_profile<'a>(
    profile: &'a CloudProfileConfig,
    name: &str,
    version: &str,
    architecture: &str,
) -> Option<&'a str> {
    profile
        .machine_images
        .iter()
        .filter(|images| images.name == name)
        .flat_map(|images| images.versions.iter())
        .find(|candidate| {
            candidate.version == version
                && candidate.architecture.as_deref().unwrap_or(DEFAULT_ARCHITECTURE)
                    == architecture
        })
        .map(|candidate| candidate.image.as_str())
}

/// Look up a recorded machine image by (name, version, architecture).
#[must_use]
pub fn find_machine_image<'a>(
    images: &'a [MachineImage],
    name: &str,
    version: &str,
    architecture: &str,
) -> Option<&'a MachineImage> {
    images.iter().find(|image| {
        image.name == name
            && image.version == version
            && image.architecture.as_deref().unwrap_or(DEFAULT_ARCHITECTURE) == architecture
    })
}

/// Resolve a (name, version, architecture) triple to an image reference.
///
/// The catalog is consulted first; on a miss the persisted status record is
/// consulted for the same key.
///
/// # Errors
///
/// Returns [`ImageError::NotFound`] naming the full lookup key when the
/// image is absent from both sources.
pub fn resolve_machine_image(
    profile: &CloudProfileConfig,
    status: &WorkerStatus,
    name: &str,
    version: &str,
    architecture: &str,
) -> Result<String, ImageError> {
    if let Some(image) = find_image_in_profile(profile, name, version, architecture) {
        return Ok(image.to_string());
    }

    if let Some(recorded) = find_machine_image(&status.machine_images, name, version, architecture)
    {
        tracing::debug!(
            name,
            version,
            architecture,
            "machine image resolved from persisted status"
        );
        crate::metrics::record_image_status_fallback();
        return Ok(recorded.image.clone());
    }

    Err(ImageError::NotFound {
        name: name.to_string(),
        version: version.to_string(),
        architecture: architecture.to_string(),
    })
}

/// Append a machine image to a record unless its identity is already
/// present. First write wins; an existing entry is never overwritten.
#[must_use]
pub fn append_machine_image(
    mut images: Vec<MachineImage>,
    image: MachineImage,
) -> Vec<MachineImage> {
    let architecture = image.architecture.as_deref().unwrap_or(DEFAULT_ARCHITECTURE);
    if find_machine_image(&images, &image.name, &image.version, architecture).is_none() {
        images.push(image);
    }
    images
}

/// Merge the images resolved during one reconciliation into the existing
/// status record.
///
/// Entries already recorded are retained unchanged, including entries not
/// revisited this cycle; new identities are appended. Accumulating the same
/// image twice yields exactly one entry.
#[must_use]
pub fn accumulate_machine_images<I>(existing: &WorkerStatus, resolved: I) -> WorkerStatus
where
    I: IntoIterator<Item = MachineImage>,
{
    let mut images = existing.machine_images.clone();
    for image in resolved {
        images = append_machine_image(images, image);
    }
    WorkerStatus {
        machine_images: images,
    }
}
