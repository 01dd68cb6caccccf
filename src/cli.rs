use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::operator::OperatorType;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision the cluster described by the manifest and write its record
    Provision(ProvisionArgs),

    /// Destroy a provisioned cluster using its record
    Deprovision(DeprovisionArgs),

    /// Print the live status of the cluster
    Status(StatusArgs),

    /// Fetch the kubeconfig of the cluster
    Credentials(CredentialsArgs),

    /// Validate the given YAML manifest
    Validate(ValidateArgs),

    /// Check whether the application installed on a cluster is ready
    CheckInstallation(CheckInstallationArgs),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

impl Commands {
    /// Log level requested by the subcommand.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Provision(opts) => opts.common.log_level,
            Self::Deprovision(opts) => opts.common.log_level,
            Self::Status(opts) => opts.common.log_level,
            Self::Credentials(opts) => opts.common.log_level,
            Self::Validate(opts) => opts.common.log_level,
            Self::CheckInstallation(opts) => opts.log_level,
            Self::Completions(_) => LogLevel::Warn,
        }
    }

    /// Whether external commands should only be logged.
    pub fn dry_run(&self) -> bool {
        match self {
            Self::Provision(opts) => opts.engine.dry_run,
            Self::Deprovision(opts) => opts.engine.dry_run,
            _ => false,
        }
    }
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to the YAML manifest with `cluster` and `provider` sections
    #[arg(short, long, default_value = "cluster.yaml")]
    pub file: Utf8PathBuf,

    /// Set the log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct EngineArgs {
    /// Operator driving the infrastructure
    #[arg(long, default_value = "terraform")]
    pub operator: OperatorType,

    /// Infrastructure engine binary
    #[arg(long, default_value = "terraform")]
    pub terraform: String,

    /// Directory for per-call engine work directories (defaults to the system temp dir)
    #[arg(long)]
    pub work_dir: Option<Utf8PathBuf>,

    /// Do not run, just show what would be done
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct KubeArgs {
    /// kubectl binary used for Kubernetes reads
    #[arg(long, default_value = "kubectl")]
    pub kubectl: String,
}

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(flatten)]
    pub kube: KubeArgs,

    /// Where to write the cluster record
    #[arg(long, default_value = "cluster-record.yaml")]
    pub record: Utf8PathBuf,
}

#[derive(Args, Debug)]
pub struct DeprovisionArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(flatten)]
    pub kube: KubeArgs,

    /// Cluster record written by `provision`
    #[arg(long, default_value = "cluster-record.yaml")]
    pub record: Utf8PathBuf,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub kube: KubeArgs,
}

#[derive(Args, Debug)]
pub struct CredentialsArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub kube: KubeArgs,

    /// Write the kubeconfig to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<Utf8PathBuf>,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct CheckInstallationArgs {
    /// kubeconfig of the provisioned cluster
    #[arg(short, long)]
    pub kubeconfig: Utf8PathBuf,

    #[command(flatten)]
    pub kube: KubeArgs,

    /// Set the log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}

/// Verbosity of logging output, mapped onto `tracing` levels.
///
/// Specifying `--log-level debug` also logs rendered infrastructure
/// documents and every external command line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

pub fn parse_args() -> Result<Cli> {
    Ok(Cli::parse())
}
