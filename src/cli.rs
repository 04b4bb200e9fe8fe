use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::monitor::install::{DEFAULT_MAX_POLLS, DEFAULT_POLL_INTERVAL_SECS};

#[derive(Parser)]
#[command(name = "iiab-verify")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIME"), ")"))]
#[command(about = "Verify Internet-in-a-Box / Lokole installs on test VMs", long_about = None)]
pub struct Cli {
    /// Optional TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Log format (text or json)
    #[arg(long, global = true, default_value = "text")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TargetKind {
    Multipass,
    Ssh,
    Local,
}

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// VM name (multipass instance, and the label used in reports)
    #[arg(long)]
    pub vm_name: Option<String>,

    /// How to reach the machine
    #[arg(long, value_enum, default_value = "multipass")]
    pub target: TargetKind,

    /// SSH host (required with --target ssh)
    #[arg(long)]
    pub host: Option<String>,

    /// SSH user
    #[arg(long, default_value = "azureuser")]
    pub user: String,

    /// SSH port
    #[arg(long, default_value = "22")]
    pub port: u16,

    /// Per-command timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the comprehensive verification and write the report
    Verify {
        #[command(flatten)]
        target: TargetArgs,

        /// Ubuntu release the VM was built from; a mismatch is logged
        #[arg(long)]
        ubuntu_version: Option<String>,

        /// JSON report path (default: verification-<vm>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// stdout format (text, json or markdown)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Also write the markdown rendering here
        #[arg(long)]
        markdown: Option<PathBuf>,

        /// Warnings tolerated before the summary becomes WARNING
        #[arg(long)]
        warning_threshold: Option<u32>,
    },

    /// Render a report JSON file as markdown
    #[command(arg_required_else_help = true)]
    Render {
        /// Report JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Post a markdown file as a pull request / issue comment
    #[command(arg_required_else_help = true)]
    Comment {
        /// Repository as owner/name
        #[arg(long)]
        repo: Option<String>,

        /// Pull request or issue number
        #[arg(long)]
        pr_number: u64,

        /// Markdown body
        #[arg(long)]
        body_file: PathBuf,

        /// VM label for the hidden rerun marker
        #[arg(long)]
        vm_name: Option<String>,

        /// Edit the previous comment for this VM instead of adding one
        #[arg(long)]
        update: bool,

        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Poll a multipass VM until the IIAB installer finishes
    Monitor {
        /// VM name
        #[arg(long)]
        vm_name: Option<String>,

        /// Seconds between polls
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
        interval: u64,

        /// Give up after this many polls
        #[arg(long, default_value_t = DEFAULT_MAX_POLLS)]
        max_polls: u32,

        /// Log file (default: installation-monitor-<timestamp>.log)
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Sample VM resources in the background into this JSON-lines file
        #[arg(long)]
        resources: Option<PathBuf>,

        /// Seconds between resource samples
        #[arg(long, default_value = "30")]
        resource_interval: u64,
    },

    /// Sample CPU / memory / disk of the target until interrupted
    Resources {
        #[command(flatten)]
        target: TargetArgs,

        /// Seconds between samples
        #[arg(long, default_value = "10")]
        interval: u64,

        /// Stop after this many samples
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        count: Option<u32>,

        /// Append samples as JSON lines here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the GitHub Actions matrix built from ubuntu-versions.yml
    Matrix {
        #[arg(long, default_value = ".github/ubuntu-versions.yml")]
        versions_file: PathBuf,

        /// Include pre-release Ubuntu versions
        #[arg(long)]
        include_upcoming: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_defaults_come_from_the_poller() {
        let cli = Cli::try_parse_from(["iiab-verify", "monitor"]).expect("parses");
        match cli.command {
            Commands::Monitor { interval, max_polls, .. } => {
                assert_eq!(interval, DEFAULT_POLL_INTERVAL_SECS);
                assert_eq!(max_polls, DEFAULT_MAX_POLLS);
            }
            _ => panic!("expected monitor"),
        }
    }

    #[test]
    fn resources_rejects_zero_count() {
        assert!(Cli::try_parse_from(["iiab-verify", "resources", "--count", "0"]).is_err());
        let cli = Cli::try_parse_from(["iiab-verify", "resources", "--count", "2", "--target", "local"])
            .expect("parses");
        match cli.command {
            Commands::Resources { count, target, .. } => {
                assert_eq!(count, Some(2));
                assert_eq!(target.target, TargetKind::Local);
            }
            _ => panic!("expected resources"),
        }
    }
}
