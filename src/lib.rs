// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Metalcast - Bare-Metal Provider Configuration Compiler
//!
//! Metalcast turns declarative, versioned bare-metal provider configuration
//! (region/image catalogs, per-pool worker settings, control plane network
//! policy) plus live cluster context into concrete deployment artifacts:
//! per-zone machine provisioning specs, nested value trees consumed by
//! templated deployments, and a persisted status record read back on the
//! next reconciliation pass.
//!
//! ## Overview
//!
//! Every transformation is a pure, deterministic function over immutable
//! inputs. The compiler holds no state across calls, performs no I/O except
//! the injected secret resolution, and never returns partial output: the
//! first invalid address pool, unresolvable image or undecodable fragment
//! aborts the whole compilation with a typed error.
//!
//! ## Modules
//!
//! - [`config`] - typed provider configuration objects
//! - [`cluster`] - live cluster context (overlay detection, resource refs)
//! - [`address_pool`] - CIDR and IP-range validation
//! - [`machine_image`] - image resolution with status fallback
//! - [`ignition`] - node-bootstrap fragment composition
//! - [`values`] - network policy and control plane value synthesis
//! - [`worker`] - per-(pool, zone) provisioning spec construction
//! - [`compiler`] - orchestration of a full compilation pass
//! - [`secrets`] - the injected secret resolution capability
//! - [`errors`] - the compilation error taxonomy
//!
//! ## Example
//!
//! ```rust,no_run
//! use metalcast::cluster::ClusterContext;
//! use metalcast::compiler::compile_control_plane;
//! use metalcast::config::ControlPlaneConfig;
//! use metalcast::values::ControlPlaneParams;
//!
//! let config = ControlPlaneConfig::default();
//! let cluster = ClusterContext {
//!     name: "shoot--dev--cast".to_string(),
//!     namespace: "shoot--dev--cast".to_string(),
//!     ..Default::default()
//! };
//! let params = ControlPlaneParams::default();
//!
//! let compiled = compile_control_plane(&config, &cluster, &params).unwrap();
//! println!("{}", compiled.shoot_values);
//! ```
//!
//! ## Features
//!
//! - **Address pool validation** - CIDR blocks and inclusive IP ranges
//! - **Image fallback** - catalog lookups fall back to the persisted status
//!   record so removing a catalog entry never breaks provisioned machines
//! - **Explicit merge policy** - ignition fragments merge under declared
//!   sequence and scalar-conflict rules
//! - **Typed value trees** - chart keys are struct fields, flattened to a
//!   generic tree only at the serialization boundary

pub mod address_pool;
pub mod cluster;
pub mod compiler;
pub mod config;
pub mod constants;
pub mod errors;
pub mod ignition;
pub mod labels;
pub mod machine_image;
pub mod metrics;
pub mod secrets;
pub mod values;
pub mod worker;

#[cfg(test)]
mod compiler_tests;
#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod machine_image_tests;
