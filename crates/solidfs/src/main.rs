//! SolidFS binary: mount a Solid Pod as a file system.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use fuser::MountOption;
use solidfs::{
    config::DEFAULT_MOUNT_ROOT, fuse::SolidFsDriver, tracing::init_telemetry, Settings, SolidFs,
};

/// SolidFS enables a file system interface to a Solid Pod.
#[derive(Debug, Parser)]
#[command(name = "solidfs", version, about)]
struct Cli {
    /// Mount point. Falls back to the `root` mount option.
    mountpoint: Option<PathBuf>,

    /// Mount options, `root=PATH` style. Unrecognised options are
    /// passed through to the kernel.
    #[arg(short = 'o', long = "mountopt", value_name = "OPT")]
    mountopt: Vec<String>,

    /// Turn debugging information on.
    #[arg(short, long)]
    debug: bool,
}

/// FUSE tuning applied to every mount.
const DEFAULT_TUNING: &[&str] = &[
    "max_write=131072",
    "max_read=131072",
    "big_writes",
    "max_background=64",
    "sync_read",
    "no_remote_lock",
];

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(if cli.debug {
        "info,solidfs=debug"
    } else {
        "info"
    });

    let settings = Settings::from_env().context("resolving SOLIDFS_* environment")?;
    let fs = SolidFs::from_settings(&settings).context("assembling the adapter")?;

    let mountpoint = cli.mountpoint.clone().unwrap_or_else(|| {
        cli.mountopt
            .iter()
            .find_map(|opt| opt.strip_prefix("root="))
            .unwrap_or(DEFAULT_MOUNT_ROOT)
            .into()
    });

    let mut options = vec![MountOption::FSName("SolidFS".to_owned())];
    for tuning in DEFAULT_TUNING {
        options.push(MountOption::CUSTOM((*tuning).to_owned()));
    }
    for opt in &cli.mountopt {
        if !opt.starts_with("root=") {
            options.push(MountOption::CUSTOM(opt.clone()));
        }
    }

    // Runs in the foreground until unmounted.
    fuser::mount2(SolidFsDriver::new(fs), &mountpoint, &options)
        .with_context(|| format!("serving mount at {}", mountpoint.display()))?;
    Ok(())
}
