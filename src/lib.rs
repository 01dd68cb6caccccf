pub mod cli;
pub mod config;
pub mod configuration;
pub mod engine;
pub mod error;
pub mod executor;
pub mod installation;
pub mod kube;
pub mod operator;
pub mod provisioner;
pub(crate) mod serde_helpers;
pub mod status;
pub mod template;
pub mod types;
pub mod validation;

pub use error::HydroformError;

use std::fs;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use camino::Utf8Path;
use clap::CommandFactory;
use tracing::{info, warn};
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

use crate::engine::TerraformEngine;
use crate::executor::CommandExecutor;
use crate::installation::InstallationChecker;
use crate::kube::KubectlConnector;
use crate::provisioner::{Provisioner, new_provisioner};
use crate::types::{Cluster, ProviderType};

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(filter)
            .with_writer(io::stderr)
            .finish(),
    )
    .context("failed to set global default tracing subscriber")
}

fn kube_connector(opts: &cli::KubeArgs, executor: Arc<dyn CommandExecutor>) -> KubectlConnector {
    KubectlConnector::new(executor).with_binary(opts.kubectl.as_str())
}

/// Builds the provisioner for `provider_type` from the command-line settings.
fn build_provisioner(
    provider_type: ProviderType,
    engine_opts: Option<&cli::EngineArgs>,
    kube_opts: &cli::KubeArgs,
    executor: Arc<dyn CommandExecutor>,
) -> Result<Box<dyn Provisioner>> {
    let mut engine = TerraformEngine::new(Arc::clone(&executor));
    let mut operator_type = operator::OperatorType::default();
    if let Some(opts) = engine_opts {
        engine = engine.with_binary(opts.terraform.as_str());
        if let Some(work_dir) = &opts.work_dir {
            engine = engine.with_work_root(work_dir.clone());
        }
        operator_type = opts.operator;
    }
    let connector = kube_connector(kube_opts, executor);
    new_provisioner(provider_type, operator_type, Arc::new(engine), Arc::new(connector))
}

pub fn run_provision(opts: &cli::ProvisionArgs, executor: Arc<dyn CommandExecutor>) -> Result<()> {
    let manifest = config::load_manifest(&opts.common.file)
        .with_context(|| format!("failed to load manifest from {}", opts.common.file))?;
    ensure_record_free(&opts.record)?;
    let provisioner = build_provisioner(
        manifest.provider.provider_type,
        Some(&opts.engine),
        &opts.kube,
        executor,
    )?;

    match provisioner.provision(&manifest.cluster, &manifest.provider) {
        Ok(cluster) if opts.engine.dry_run => {
            info!(cluster = %cluster.name, "dry run: cluster record not written");
            Ok(())
        }
        Ok(cluster) => {
            config::save_record(&opts.record, &cluster)?;
            info!(cluster = %cluster.name, "cluster provisioned");
            Ok(())
        }
        Err(err) => {
            save_partial_record(&opts.record, &manifest.cluster, &err);
            Err(err)
        }
    }
}

/// Fails when the record at `path` still holds engine state.
///
/// Provision starts from an empty state, so writing over such a record
/// would lose the only handle to infrastructure that already exists.
fn ensure_record_free(path: &Utf8Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let existing = config::load_record(path)
        .with_context(|| format!("failed to load cluster record from {}", path))?;
    match existing.cluster_info {
        Some(info) if !info.internal_state.is_empty() => {
            Err(HydroformError::RecordInUse(path.to_string()).into())
        }
        _ => Ok(()),
    }
}

/// Writes the engine state carried by `err` so a later run can clean it up.
fn save_partial_record(path: &Utf8Path, cluster: &Cluster, err: &anyhow::Error) {
    let Some(partial) = err
        .downcast_ref::<HydroformError>()
        .and_then(HydroformError::cluster_info)
    else {
        return;
    };
    let recorded = cluster
        .cluster_info
        .as_ref()
        .is_some_and(|info| !info.internal_state.is_empty());
    if recorded && partial.internal_state.is_empty() {
        warn!("engine returned no state, keeping cluster record {}", path);
        return;
    }
    let record = Cluster {
        cluster_info: Some(partial.clone()),
        ..cluster.clone()
    };
    match config::save_record(path, &record) {
        Ok(()) => warn!("partial cluster record written to {}", path),
        Err(save_err) => tracing::error!("failed to write partial cluster record: {:#}", save_err),
    }
}

pub fn run_deprovision(
    opts: &cli::DeprovisionArgs,
    executor: Arc<dyn CommandExecutor>,
) -> Result<()> {
    let manifest = config::load_manifest(&opts.common.file)
        .with_context(|| format!("failed to load manifest from {}", opts.common.file))?;
    let cluster = config::load_record(&opts.record)
        .with_context(|| format!("failed to load cluster record from {}", opts.record))?;
    let provisioner = build_provisioner(
        manifest.provider.provider_type,
        Some(&opts.engine),
        &opts.kube,
        executor,
    )?;

    if let Err(err) = provisioner.deprovision(&cluster, &manifest.provider) {
        if !opts.engine.dry_run {
            save_partial_record(&opts.record, &cluster, &err);
        }
        return Err(err);
    }
    if opts.engine.dry_run {
        info!(cluster = %cluster.name, "dry run: cluster record kept");
        return Ok(());
    }
    info!(cluster = %cluster.name, "cluster deprovisioned");

    match fs::remove_file(&opts.record) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(HydroformError::io(format!("failed to remove {}", opts.record), e).into()),
    }
}

pub fn run_status(opts: &cli::StatusArgs, executor: Arc<dyn CommandExecutor>) -> Result<()> {
    let manifest = config::load_manifest(&opts.common.file)
        .with_context(|| format!("failed to load manifest from {}", opts.common.file))?;
    let provisioner =
        build_provisioner(manifest.provider.provider_type, None, &opts.kube, executor)?;

    let status = provisioner.status(&manifest.cluster, &manifest.provider)?;
    writeln!(io::stdout(), "{}", status.phase).context("failed to write status")?;
    Ok(())
}

pub fn run_credentials(
    opts: &cli::CredentialsArgs,
    executor: Arc<dyn CommandExecutor>,
) -> Result<()> {
    let manifest = config::load_manifest(&opts.common.file)
        .with_context(|| format!("failed to load manifest from {}", opts.common.file))?;
    let provisioner =
        build_provisioner(manifest.provider.provider_type, None, &opts.kube, executor)?;

    let kubeconfig = provisioner.credentials(&manifest.cluster, &manifest.provider)?;
    match &opts.output {
        Some(path) => {
            fs::write(path, &kubeconfig)
                .map_err(|e| HydroformError::io(format!("failed to write {}", path), e))?;
            info!("kubeconfig written to {}", path);
        }
        None => io::stdout()
            .write_all(&kubeconfig)
            .context("failed to write kubeconfig")?,
    }
    Ok(())
}

pub fn run_validate(opts: &cli::ValidateArgs) -> Result<()> {
    let manifest = config::load_manifest(&opts.common.file)?;
    validation::validate(&manifest.cluster, &manifest.provider)
        .context("manifest validation failed")?;
    info!("validation successful:\n{:#?}", manifest);
    Ok(())
}

pub fn run_check_installation(
    opts: &cli::CheckInstallationArgs,
    executor: Arc<dyn CommandExecutor>,
) -> Result<()> {
    let connector = kube_connector(&opts.kube, executor);
    let checker = InstallationChecker::connect(&connector, &opts.kubeconfig)?;

    let deployed = checker.is_deployed()?;
    let ready = deployed && checker.is_ready()?;
    let state = checker.check_installation_state()?;

    let mut stdout = io::stdout();
    writeln!(stdout, "deployed: {}", deployed).context("failed to write installation state")?;
    writeln!(stdout, "ready: {}", ready).context("failed to write installation state")?;
    writeln!(stdout, "state: {}", state.state).context("failed to write installation state")?;
    if !state.description.is_empty() {
        writeln!(stdout, "description: {}", state.description)
            .context("failed to write installation state")?;
    }
    Ok(())
}

pub fn run_completions(opts: &cli::CompletionsArgs) -> Result<()> {
    let mut cmd = cli::Cli::command();
    clap_complete::generate(opts.shell, &mut cmd, env!("CARGO_PKG_NAME"), &mut io::stdout());
    Ok(())
}
