use clap::{Parser, Subcommand};
use std::path::PathBuf;

const HELP_EPILOG: &str = r#"Server options can also be provided via environment variables:
  CONFIG_PATH (default: ./config.yaml)
  DB_PATH     (default: data/classwatch.db)
  PORT        (default: 5858 or config.listen_port)

The `install` command helps set up a systemd service and a default config.
Run it as root (or with sudo) for system-wide install.
"#;

#[derive(Debug, Parser)]
#[command(
    name = "classwatch-server",
    version,
    about = "ClassWatch classroom monitoring server",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Optional subcommand. Without one, runs the server.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Install systemd unit + default config (run as root for system-wide)
    Install {
        /// Destination path for systemd unit
        #[arg(long, default_value = "/etc/systemd/system/classwatch-server.service")]
        unit_path: PathBuf,
        /// Destination path for server config
        #[arg(long, default_value = "/etc/classwatch/config.yaml")]
        config_path: PathBuf,
        /// Default DB path to include in unit env
        #[arg(long, default_value = "/var/lib/classwatch/classwatch.db")]
        db_path: PathBuf,
        /// Absolute path to the server binary used in ExecStart
        #[arg(long)]
        bin_path: Option<PathBuf>,
        /// systemd service user (defaults to 'classwatch')
        #[arg(long, default_value = "classwatch")]
        user: String,
        /// systemd service group (defaults to 'classwatch')
        #[arg(long, default_value = "classwatch")]
        group: String,
        /// Working directory for the service (defaults to /var/lib/classwatch)
        #[arg(long, default_value = "/var/lib/classwatch")]
        working_dir: PathBuf,
        /// Overwrite files if they already exist
        #[arg(long)]
        force: bool,
    },
    /// Uninstall systemd unit; optionally remove config
    Uninstall {
        /// Path to systemd unit to remove
        #[arg(long, default_value = "/etc/systemd/system/classwatch-server.service")]
        unit_path: PathBuf,
        /// Also remove config file
        #[arg(long)]
        remove_config: bool,
        /// Path to config file
        #[arg(long, default_value = "/etc/classwatch/config.yaml")]
        config_path: PathBuf,
    },
}
