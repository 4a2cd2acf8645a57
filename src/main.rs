// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Metalcast CLI.
//!
//! Compiles provider configuration into deployment artifacts without a
//! running cluster: inputs are YAML files, outputs are printed as YAML.
//! Referenced ignition secrets are supplied as local files, so a full
//! worker compilation can be exercised offline.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use metalcast::cluster::ClusterContext;
use metalcast::compiler::{compile_control_plane, compile_worker};
use metalcast::config::{
    CloudProfileConfig, ControlPlaneConfig, WorkerConfig, WorkerSpec, WorkerStatus,
};
use metalcast::constants::{IGNITION_SECRET_FIELD, PROVIDER_NAME};
use metalcast::secrets::StaticSecretResolver;
use metalcast::values::ControlPlaneParams;

#[derive(Parser)]
#[command(name = "metalcast", version, about = "Bare-metal provider configuration compiler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile the control plane value trees for one cluster
    ControlPlane {
        /// Path to the control plane configuration YAML
        #[arg(long)]
        config: PathBuf,

        /// Path to the cluster context YAML
        #[arg(long)]
        cluster: PathBuf,

        /// Name of the CCM server certificate secret
        #[arg(long, default_value = "cloud-controller-manager-server")]
        server_secret: String,

        /// Checksum entries (`name=sum`) stamped into pod annotations
        #[arg(long = "checksum", value_parser = parse_key_value)]
        checksums: Vec<(String, String)>,

        /// Compile for a scaled-down (hibernated) control plane
        #[arg(long)]
        scaled_down: bool,
    },

    /// Compile the provisioning specs and status record for one worker
    Worker {
        /// Path to the worker spec YAML
        #[arg(long)]
        worker: PathBuf,

        /// Path to the cluster context YAML
        #[arg(long)]
        cluster: PathBuf,

        /// Path to the cloud profile configuration YAML
        #[arg(long)]
        profile: PathBuf,

        /// Path to the previously persisted worker status YAML
        #[arg(long)]
        status: Option<PathBuf>,

        /// Ignition secret entries (`name=path`); the file contents become
        /// the secret's ignition field
        #[arg(long = "ignition-secret", value_parser = parse_key_value)]
        ignition_secrets: Vec<(String, String)>,
    },

    /// Write the JSON Schemas of the configuration types
    Schema {
        /// Output directory for the schema files
        #[arg(long, default_value = "deploy/schemas")]
        out: PathBuf,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("metalcast")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Respects RUST_LOG if set, otherwise defaults to INFO level.
    // RUST_LOG_FORMAT=json switches to structured output.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    debug!("starting {PROVIDER_NAME} value compilation");

    let cli = Cli::parse();
    match cli.command {
        Command::ControlPlane {
            config,
            cluster,
            server_secret,
            checksums,
            scaled_down,
        } => {
            let config: ControlPlaneConfig = read_yaml(&config)?;
            let cluster: ClusterContext = read_yaml(&cluster)?;
            let params = ControlPlaneParams {
                scaled_down,
                checksums: checksums.into_iter().collect(),
                server_secret_name: server_secret,
            };

            let compiled = compile_control_plane(&config, &cluster, &params)?;
            let output = serde_yaml::to_string(&serde_json::json!({
                "seed": compiled.seed_values,
                "shoot": compiled.shoot_values,
                "config": compiled.config_values,
            }))?;
            println!("{output}");
        }

        Command::Worker {
            worker,
            cluster,
            profile,
            status,
            ignition_secrets,
        } => {
            let worker: WorkerSpec = read_yaml(&worker)?;
            let cluster: ClusterContext = read_yaml(&cluster)?;
            let profile: CloudProfileConfig = read_yaml(&profile)?;
            let existing_status: WorkerStatus = match status {
                Some(path) => read_yaml(&path)?,
                None => WorkerStatus::default(),
            };

            let mut resolver = StaticSecretResolver::new();
            for (name, path) in ignition_secrets {
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("failed to read ignition secret file {path}"))?;
                resolver = resolver.with_field(&name, IGNITION_SECRET_FIELD, bytes);
            }

            let compiled =
                compile_worker(&worker, &cluster, &profile, &existing_status, &resolver).await?;
            info!(
                machines = compiled.machines.len(),
                "worker compilation complete"
            );
            let output = serde_yaml::to_string(&serde_json::json!({
                "machines": compiled.machines,
                "status": compiled.status,
            }))?;
            println!("{output}");
        }

        Command::Schema { out } => {
            write_schemas(&out)?;
        }
    }

    Ok(())
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("failed to decode {}", path.display()))
}

fn write_schemas(out: &Path) -> Result<()> {
    std::fs::create_dir_all(out)?;

    write_schema::<ControlPlaneConfig>(out, "controlplaneconfig.schema.json")?;
    write_schema::<CloudProfileConfig>(out, "cloudprofileconfig.schema.json")?;
    write_schema::<WorkerSpec>(out, "workerspec.schema.json")?;
    write_schema::<WorkerConfig>(out, "workerconfig.schema.json")?;
    write_schema::<WorkerStatus>(out, "workerstatus.schema.json")?;
    write_schema::<ClusterContext>(out, "clustercontext.schema.json")?;

    Ok(())
}

fn write_schema<T: schemars::JsonSchema>(out: &Path, file_name: &str) -> Result<()> {
    let schema = schemars::schema_for!(T);
    let path = out.join(file_name);
    std::fs::write(&path, serde_json::to_string_pretty(&schema)?)?;
    debug!(path = %path.display(), "schema written");
    Ok(())
}
