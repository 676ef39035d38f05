//! meldfs CLI
//!
//! Administrative front-end for the union dispatch core. Takes a branch set
//! (inline specs or a JSON config file) and runs one operation against the
//! union, the same way a transport binding would:
//!
//! ```bash
//! meldfs -b /mnt/disk1 -b /mnt/disk2=RO info
//! meldfs -b /mnt/disk1 -b /mnt/disk2 touch /data/file.bin
//! meldfs --config union.json chmod 644 /data/file.bin
//! meldfs -b /mnt/disk1 -b /mnt/disk2 unlink /data/file.bin
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use meldfs::{
    fs_ops, ops, Config, ConfigFile, DiskProbe, Dispatcher, Errno, FsCredentials, Ugid,
};

/// Format bytes as human-readable size
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

#[derive(Parser)]
#[command(name = "meldfs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Union filesystem dispatch: apply operations across a branch set")]
pub struct Cli {
    /// Branch spec PATH[=MODE] where MODE is RW, RO, or NC (repeatable, in order)
    #[arg(short = 'b', long = "branch", value_name = "PATH[=MODE]")]
    branches: Vec<String>,

    /// JSON config file (alternative to --branch)
    #[arg(long, value_name = "FILE", conflicts_with = "branches")]
    config: Option<PathBuf>,

    /// Minimum free bytes a branch must have to accept a mutation
    #[arg(long, value_name = "BYTES", default_value_t = 0)]
    min_free_space: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the branch table with modes, free space, and eligibility
    Info,
    /// Update timestamps to now on every branch holding the path
    Touch {
        /// Logical path within the union
        path: String,
    },
    /// Change mode bits on every branch holding the path
    Chmod {
        /// Octal mode, e.g. 644
        mode: String,
        /// Logical path within the union
        path: String,
    },
    /// Remove the path from every branch holding it
    Unlink {
        /// Logical path within the union
        path: String,
    },
}

fn build_config(cli: &Cli) -> Result<Config, meldfs::ConfigError> {
    let file = match &cli.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::from_specs(&cli.branches, cli.min_free_space)?,
    };
    Ok(file.into_config())
}

fn info(config: &Config) {
    use meldfs::BranchProbe;

    let probe = DiskProbe;
    let table = config.snapshot();
    let threshold = config.min_free_space();

    println!(
        "{} branches, min free space {}",
        table.len(),
        format_bytes(threshold)
    );
    for (idx, branch) in table.iter().enumerate() {
        let free = probe.free_space(branch);
        let eligible = branch.allows_mutation() && free >= threshold;
        println!(
            "  [{}] {} mode={} free={} {}",
            idx,
            branch.root().display(),
            branch.mode,
            format_bytes(free),
            if eligible { "eligible" } else { "ineligible" }
        );
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = build_config(cli).map_err(|e| e.to_string())?;

    if let Command::Info = cli.command {
        info(&config);
        return Ok(());
    }

    let probe = DiskProbe;
    let creds = FsCredentials;
    let dispatcher = Dispatcher::new(&config, &probe, &creds);
    let caller = Ugid::process();

    let result: Result<(), Errno> = match &cli.command {
        Command::Info => unreachable!("handled above"),
        Command::Touch { path } => ops::utimens(&dispatcher, caller, path, fs_ops::times_now()),
        Command::Chmod { mode, path } => {
            let bits = u32::from_str_radix(mode, 8)
                .map_err(|_| format!("invalid octal mode '{}'", mode))?;
            ops::chmod(&dispatcher, caller, path, bits)
        }
        Command::Unlink { path } => ops::unlink(&dispatcher, caller, path),
    };

    result.map_err(|errno| std::io::Error::from_raw_os_error(errno).to_string())
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("meldfs: {}", msg);
            ExitCode::FAILURE
        }
    }
}
