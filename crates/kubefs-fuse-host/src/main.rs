// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! KubeFS FUSE Host: mounts cluster resources as a read-only filesystem
//!
//! Layout: `/<namespace>/{pod,svc,rc}/<object>/{describe,logs,json,yaml}`.

#[cfg(all(feature = "fuse", target_os = "linux"))]
mod adapter;

#[cfg(all(feature = "fuse", target_os = "linux"))]
use adapter::KubeFsFuse;
use anyhow::{Context, Result};
use clap::Parser;
use kubefs_client::KubectlClient;
use kubefs_core::{ContentSource, DataSource, FsConfig, StaticSource};
use kubefs_logging::CliLoggingArgs;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "kubefs", version, about = "Browse a Kubernetes cluster as a filesystem")]
struct Args {
    /// Mount point for the filesystem
    mount_point: PathBuf,

    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// kubectl binary to run
    #[arg(long, env = "KUBEFS_KUBECTL")]
    kubectl: Option<String>,

    /// kubeconfig file passed to kubectl
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// kubeconfig context passed to kubectl
    #[arg(long)]
    context: Option<String>,

    /// Serve a static JSON fixture instead of a live cluster
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Allow other users to access the filesystem
    #[arg(long)]
    allow_other: bool,

    /// Allow root to access the filesystem
    #[arg(long)]
    allow_root: bool,

    /// Auto unmount on process exit
    #[arg(long)]
    auto_unmount: bool,

    #[command(flatten)]
    logging: CliLoggingArgs,
}

fn load_config(config_path: Option<&PathBuf>) -> Result<FsConfig> {
    match config_path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let config: FsConfig = serde_json::from_str(&content)
                .with_context(|| format!("parsing config {}", path.display()))?;
            Ok(config)
        }
        None => Ok(FsConfig::default()),
    }
}

/// Command-line values take precedence over the config file
fn apply_overrides(config: &mut FsConfig, args: &Args) {
    if let Some(kubectl) = &args.kubectl {
        config.cluster.kubectl = kubectl.clone();
    }
    if let Some(kubeconfig) = &args.kubeconfig {
        config.cluster.kubeconfig = Some(kubeconfig.clone());
    }
    if let Some(context) = &args.context {
        config.cluster.context = Some(context.clone());
    }
}

type Sources = (Arc<dyn DataSource>, Arc<dyn ContentSource>);

fn build_sources(config: &FsConfig, fixture: Option<&PathBuf>) -> Result<Sources> {
    if let Some(path) = fixture {
        info!("Serving fixture {}", path.display());
        let source = Arc::new(
            StaticSource::from_json_file(path)
                .with_context(|| format!("loading fixture {}", path.display()))?,
        );
        return Ok((source.clone(), source));
    }

    let client = Arc::new(KubectlClient::new(config.cluster.clone()));
    if !client.is_available() {
        warn!(
            "{} could not be executed; listings will fail until it is available",
            config.cluster.kubectl
        );
    }
    Ok((client.clone(), client))
}

fn main() -> Result<()> {
    let args = Args::parse();
    args.logging.clone().init("kubefs")?;

    info!("Starting KubeFS FUSE Host");
    info!("Mount point: {}", args.mount_point.display());

    let mut config = load_config(args.config.as_ref())?;
    apply_overrides(&mut config, &args);
    info!("Configuration loaded: {:?}", config);

    let (source, content) = build_sources(&config, args.fixture.as_ref())?;

    #[cfg(all(feature = "fuse", target_os = "linux"))]
    {
        let filesystem = KubeFsFuse::new(&config.cache, source, content);

        let mut mount_options = vec![
            fuser::MountOption::FSName("kubefs".to_string()),
            fuser::MountOption::Subtype("kubefs".to_string()),
            fuser::MountOption::RO,
        ];

        if args.allow_other {
            mount_options.push(fuser::MountOption::AllowOther);
        }

        if args.allow_root {
            mount_options.push(fuser::MountOption::AllowRoot);
        }

        if args.auto_unmount {
            mount_options.push(fuser::MountOption::AutoUnmount);
        }

        info!("Mounting filesystem...");
        let session = fuser::spawn_mount2(filesystem, &args.mount_point, &mount_options)?;
        info!("KubeFS mounted; blocking until unmount");
        session.join();
    }

    #[cfg(not(all(feature = "fuse", target_os = "linux")))]
    {
        warn!("FUSE support not compiled in; listing the root instead of mounting");
        let _ = (&content, args.allow_other, args.allow_root, args.auto_unmount);
        let namespaces = kubefs_core::VirtualFileSystem::new("/").list_children(source.as_ref())?;
        for entry in namespaces {
            info!(namespace = %entry.name, "namespace");
        }
        info!("To enable FUSE support, compile with: cargo build --features fuse");
    }

    Ok(())
}
