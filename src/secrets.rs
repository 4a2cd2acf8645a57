// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Secret resolution capability.
//!
//! The compiler never reads secrets itself; it receives a [`SecretResolver`]
//! and asks it for the raw bytes of one named field. Two implementations are
//! provided:
//!
//! - [`KubeSecretResolver`] - reads Kubernetes `Secret` objects in one
//!   namespace, for production reconciliation
//! - [`StaticSecretResolver`] - an in-memory map, for tests and offline
//!   compilation via the CLI
//!
//! Resolution is the only blocking operation in a compilation; callers
//! running many pools concurrently should parallelize across pools and let
//! their execution context enforce a deadline.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use std::collections::BTreeMap;

use crate::errors::SecretError;

/// Capability to resolve one field of a named secret to raw bytes.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Return the bytes stored under `field` in the secret called `name`.
    async fn resolve(&self, name: &str, field: &str) -> Result<Vec<u8>, SecretError>;
}

/// [`SecretResolver`] backed by the Kubernetes API, scoped to one namespace.
#[derive(Clone)]
pub struct KubeSecretResolver {
    client: Client,
    namespace: String,
}

impl KubeSecretResolver {
    /// Create a resolver reading secrets in `namespace`.
    #[must_use]
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
        }
    }
}

#[async_trait]
impl SecretResolver for KubeSecretResolver {
    async fn resolve(&self, name: &str, field: &str) -> Result<Vec<u8>, SecretError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &self.namespace);
        let secret = secrets.get(name).await.map_err(|err| match err {
            kube::Error::Api(response) if response.code == 404 => SecretError::NotFound {
                name: name.to_string(),
                namespace: self.namespace.clone(),
            },
            other => SecretError::Api {
                name: name.to_string(),
                reason: other.to_string(),
            },
        })?;

        secret
            .data
            .unwrap_or_default()
            .get(field)
            .map(|bytes| bytes.0.clone())
            .ok_or_else(|| SecretError::MissingField {
                name: name.to_string(),
                field: field.to_string(),
            })
    }
}

/// [`SecretResolver`] backed by an in-memory map of `(secret, field)` pairs.
#[derive(Clone, Debug, Default)]
pub struct StaticSecretResolver {
    entries: BTreeMap<(String, String), Vec<u8>>,
}

impl StaticSecretResolver {
    /// Create an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the bytes returned for `field` of the secret called `name`.
    #[must_use]
    pub fn with_field(mut self, name: &str, field: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.entries
            .insert((name.to_string(), field.to_string()), bytes.into());
        self
    }
}

#[async_trait]
impl SecretResolver for StaticSecretResolver {
    async fn resolve(&self, name: &str, field: &str) -> Result<Vec<u8>, SecretError> {
        let key = (name.to_string(), field.to_string());
        match self.entries.get(&key) {
            Some(bytes) => Ok(bytes.clone()),
            None if self.entries.keys().any(|(secret, _)| secret == name) => {
                Err(SecretError::MissingField {
                    name: name.to_string(),
                    field: field.to_string(),
                })
            }
            None => Err(SecretError::NotFound {
                name: name.to_string(),
                namespace: String::new(),
            }),
        }
    }
}
