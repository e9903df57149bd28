use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use lvm_agent::config::{DEFAULT_BASE_PATH, DEFAULT_FS_TYPE, ManagerConfig};
use lvm_agent::lvm::TagSet;
use lvm_agent::volume::VolumeManager;

#[derive(Parser, Debug)]
#[command(name = "lvm-agent")]
#[command(about = "Thin LVM volume lifecycle manager for host-path volume provisioning")]
struct Args {
    /// LVM volume group holding the thin pool
    #[arg(long, env = "LVM_VOLUME_GROUP")]
    volume_group: String,

    /// Thin pool volumes are allocated from (must already exist)
    #[arg(long, env = "LVM_THIN_POOL")]
    thin_pool: String,

    /// Root directory for volume mounts (<base>/<vg>/<lv>)
    #[arg(long, env = "LVM_BASE_PATH", default_value = DEFAULT_BASE_PATH)]
    base_path: PathBuf,

    /// Filesystem created on new volumes (ext4, xfs)
    #[arg(long, env = "LVM_FS_TYPE", default_value = DEFAULT_FS_TYPE)]
    fs_type: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Verify the thin pool exists
    Check,
    /// List logical volumes in the volume group
    List,
    /// Locate a volume, mounting it if needed
    Get { volume_id: String },
    /// Create, format and mount a thin volume
    Create {
        name: String,
        /// Virtual size (lvcreate syntax, e.g. 10G or 1073741824b)
        #[arg(long)]
        size: String,
        /// Tag in key=value form (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Unmount and remove a volume
    Delete { volume_id: String },
    /// Show filesystem usage of a volume
    Stats { volume_id: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize tracing with configured log level
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ManagerConfig::new(args.volume_group, args.thin_pool)
        .with_base_path(args.base_path)
        .with_fs_type(args.fs_type);
    config.validate()?;

    info!("Volume group: {}", config.volume_group);
    info!("Thin pool: {}", config.thin_pool);
    info!("Mount root: {}", config.base_path.display());

    // Abort the in-flight command on SIGINT/SIGTERM
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    let manager = VolumeManager::new(&config);

    match args.command {
        Cmd::Check => {
            manager.verify_thin_pool(&cancel).await?;
            print_json(&json!({
                "volume_group": config.volume_group,
                "thin_pool": config.thin_pool,
                "status": "ok",
            }))?;
        }
        Cmd::List => {
            let volumes = manager.list(&cancel).await?;
            print_json(&volumes)?;
        }
        Cmd::Get { volume_id } => match manager.find_by_id(&volume_id, &cancel).await? {
            Some(handle) => print_json(&handle)?,
            None => return Err(format!("volume '{}' not found", volume_id).into()),
        },
        Cmd::Create { name, size, tags } => {
            let tags: TagSet = tags.into_iter().collect();
            let handle = manager.create(&name, &size, &tags, &cancel).await?;
            print_json(&handle)?;
        }
        Cmd::Delete { volume_id } => {
            let deleted = manager.delete_by_id(&volume_id, &cancel).await?;
            print_json(&json!({ "volume_id": volume_id, "deleted": deleted }))?;
        }
        Cmd::Stats { volume_id } => {
            let handle = manager
                .find_by_id(&volume_id, &cancel)
                .await?
                .ok_or_else(|| format!("volume '{}' not found", volume_id))?;
            let stats = manager.filesystem_stats(&handle)?;
            print_json(&json!({
                "volume_id": volume_id,
                "path": handle.path(),
                "size_bytes": handle.size_bytes(),
                "bytes_available": stats.bytes_available,
                "bytes_capacity": stats.bytes_capacity,
            }))?;
        }
    }

    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    use signal::unix::{SignalKind, signal};

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to install SIGINT handler: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received SIGINT, cancelling");
        }
        _ = terminate => {
            info!("Received SIGTERM, cancelling");
        }
    }
}
