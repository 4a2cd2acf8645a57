// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `machine_image.rs`

use crate::config::{
    CloudProfileConfig, MachineImage, MachineImageVersion, MachineImages, WorkerStatus,
};
use crate::errors::ImageError;
use crate::machine_image::{
    accumulate_machine_images, append_machine_image, find_image_in_profile, resolve_machine_image,
};

fn test_profile() -> CloudProfileConfig {
    CloudProfileConfig {
        machine_images: vec![MachineImages {
            name: "gardenlinux".to_string(),
            versions: vec![
                MachineImageVersion {
                    version: "1443.3".to_string(),
                    image: "registry/gardenlinux:1443.3-amd64".to_string(),
                    architecture: None,
                },
                MachineImageVersion {
                    version: "1443.3".to_string(),
                    image: "registry/gardenlinux:1443.3-arm64".to_string(),
                    architecture: Some("arm64".to_string()),
                },
            ],
        }],
        ..Default::default()
    }
}

fn recorded(name: &str, version: &str, image: &str, architecture: &str) -> MachineImage {
    MachineImage {
        name: name.to_string(),
        version: version.to_string(),
        image: image.to_string(),
        architecture: Some(architecture.to_string()),
    }
}

#[test]
fn test_profile_lookup_defaults_architecture() {
    let profile = test_profile();
    // A catalog entry without an architecture matches the platform default.
    assert_eq!(
        find_image_in_profile(&profile, "gardenlinux", "1443.3", "amd64"),
        Some("registry/gardenlinux:1443.3-amd64")
    );
    assert_eq!(
        find_image_in_profile(&profile, "gardenlinux", "1443.3", "arm64"),
        Some("registry/gardenlinux:1443.3-arm64")
    );
    assert_eq!(
        find_image_in_profile(&profile, "gardenlinux", "1443.3", "riscv64"),
        None
    );
}

#[test]
fn test_resolution_prefers_catalog() {
    let profile = test_profile();
    let status = WorkerStatus {
        machine_images: vec![recorded(
            "gardenlinux",
            "1443.3",
            "stale/reference",
            "amd64",
        )],
    };

    let image =
        resolve_machine_image(&profile, &status, "gardenlinux", "1443.3", "amd64").unwrap();
    assert_eq!(image, "registry/gardenlinux:1443.3-amd64");
}

#[test]
fn test_resolution_falls_back_to_status() {
    let profile = test_profile();
    let status = WorkerStatus {
        machine_images: vec![recorded(
            "gardenlinux",
            "1312.2",
            "registry/gardenlinux:1312.2-amd64",
            "amd64",
        )],
    };

    // 1312.2 was removed from the catalog, but machines still use it.
    let image =
        resolve_machine_image(&profile, &status, "gardenlinux", "1312.2", "amd64").unwrap();
    assert_eq!(image, "registry/gardenlinux:1312.2-amd64");
}

#[test]
fn test_resolution_error_names_the_triple() {
    let profile = test_profile();
    let status = WorkerStatus::default();

    let err =
        resolve_machine_image(&profile, &status, "gardenlinux", "9999.9", "arm64").unwrap_err();
    assert_eq!(
        err,
        ImageError::NotFound {
            name: "gardenlinux".to_string(),
            version: "9999.9".to_string(),
            architecture: "arm64".to_string(),
        }
    );
    let message = err.to_string();
    assert!(message.contains("gardenlinux"), "got: {message}");
    assert!(message.contains("9999.9"), "got: {message}");
    assert!(message.contains("arm64"), "got: {message}");
}

#[test]
fn test_append_is_first_write_wins() {
    let images = vec![recorded("gardenlinux", "1443.3", "original", "amd64")];

    // Same identity, different reference: the original entry survives.
    let images = append_machine_image(
        images,
        recorded("gardenlinux", "1443.3", "replacement", "amd64"),
    );
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].image, "original");

    // Different architecture is a different identity.
    let images = append_machine_image(
        images,
        recorded("gardenlinux", "1443.3", "arm-ref", "arm64"),
    );
    assert_eq!(images.len(), 2);
}

#[test]
fn test_accumulate_retains_unvisited_entries() {
    let existing = WorkerStatus {
        machine_images: vec![recorded("gardenlinux", "1312.2", "old-ref", "amd64")],
    };

    let updated = accumulate_machine_images(
        &existing,
        vec![recorded("gardenlinux", "1443.3", "new-ref", "amd64")],
    );

    assert_eq!(updated.machine_images.len(), 2);
    assert_eq!(updated.machine_images[0].image, "old-ref");
    assert_eq!(updated.machine_images[1].image, "new-ref");
}

#[test]
fn test_accumulate_twice_is_idempotent() {
    let resolved = recorded("gardenlinux", "1443.3", "ref", "amd64");

    let first = accumulate_machine_images(&WorkerStatus::default(), vec![resolved.clone()]);
    let second = accumulate_machine_images(&first, vec![resolved]);

    assert_eq!(second.machine_images.len(), 1);
    assert_eq!(first.machine_images, second.machine_images);
}
