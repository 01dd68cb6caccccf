//! Engine adapter driving the Terraform CLI.
//!
//! Each apply runs in a fresh work directory holding:
//! - `main.tf`: the rendered document
//! - `providers.tf`: the `required_providers` entry for the single plugin
//! - `terraform.tfvars.json`: every variable binding
//! - `terraform.tfstate`: the prior state, when there is one
//!
//! After `terraform apply` the state file is read back whether or not the
//! apply succeeded. The work directory is removed when the call returns.

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info, warn};

use super::{ApplyFailure, ApplyOutput, Engine, EngineState, Platform};
use crate::error::HydroformError;
use crate::executor::{CommandExecutor, CommandSpec};

const DOCUMENT_FILE: &str = "main.tf";
const PROVIDERS_FILE: &str = "providers.tf";
const VARS_FILE: &str = "terraform.tfvars.json";
const STATE_FILE: &str = "terraform.tfstate";

/// Removes a work directory when dropped.
struct WorkDir {
    path: Utf8PathBuf,
}

impl WorkDir {
    fn create(root: &Utf8Path) -> Result<Self, HydroformError> {
        let path = root.join(format!("hydroform-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&path)
            .map_err(|e| HydroformError::io(format!("failed to create work directory: {}", path), e))?;
        debug!("created engine work directory: {}", path);
        Ok(Self { path })
    }

    fn file(&self, name: &str) -> Utf8PathBuf {
        self.path.join(name)
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("cleaned up engine work directory: {}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("engine work directory already removed: {}", self.path);
            }
            Err(e) => {
                tracing::error!(
                    path = %self.path,
                    error_kind = ?e.kind(),
                    "failed to clean up engine work directory: {}",
                    e,
                );
            }
        }
    }
}

/// [`Engine`] backed by the `terraform` binary.
pub struct TerraformEngine {
    executor: Arc<dyn CommandExecutor>,
    binary: String,
    work_root: Utf8PathBuf,
}

impl TerraformEngine {
    /// Creates an engine running `terraform` from PATH in the system temp directory.
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        let work_root = Utf8PathBuf::from_path_buf(std::env::temp_dir())
            .unwrap_or_else(|_| Utf8PathBuf::from("/tmp"));
        Self {
            executor,
            binary: "terraform".to_string(),
            work_root,
        }
    }

    /// Uses a different engine binary (e.g., `tofu`).
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Creates work directories under `root`.
    #[must_use]
    pub fn with_work_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.work_root = root.into();
        self
    }

    fn prepare(&self, dir: &WorkDir, platform: &Platform, prior: &EngineState) -> Result<()> {
        write_file(&dir.file(DOCUMENT_FILE), platform.document().as_str())?;
        write_file(&dir.file(PROVIDERS_FILE), &required_providers(platform))?;

        let vars = serde_json::to_string_pretty(platform.vars())
            .context("failed to serialize variable bindings")?;
        write_file(&dir.file(VARS_FILE), &vars)?;

        if !prior.is_empty() {
            let state = serde_json::to_string_pretty(prior.as_value())
                .context("failed to serialize prior engine state")?;
            write_file(&dir.file(STATE_FILE), &state)?;
        }
        Ok(())
    }

    fn run(&self, dir: &WorkDir, destroy: bool) -> Result<()> {
        let init = vec![
            "init".to_string(),
            "-input=false".to_string(),
            "-no-color".to_string(),
        ];
        self.run_step(dir, init)?;

        let mut args = vec![
            "apply".to_string(),
            "-input=false".to_string(),
            "-auto-approve".to_string(),
            "-no-color".to_string(),
            format!("-state={}", STATE_FILE),
            format!("-var-file={}", VARS_FILE),
        ];
        if destroy {
            args.push("-destroy".to_string());
        }
        self.run_step(dir, args)
    }

    fn run_step(&self, dir: &WorkDir, args: Vec<String>) -> Result<()> {
        let spec = CommandSpec::new(self.binary.clone(), args)
            .with_cwd(dir.path.clone())
            .with_env("TF_IN_AUTOMATION", "1");
        debug!("running engine step: {}", spec.display());

        let result = self
            .executor
            .execute(&spec)
            .with_context(|| format!("failed to execute {}", self.binary))?;
        if !result.success() {
            let status = match result.code() {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            };
            return Err(HydroformError::Execution {
                command: spec.display(),
                status,
            }
            .into());
        }
        Ok(())
    }
}

impl Engine for TerraformEngine {
    fn apply(
        &self,
        platform: &Platform,
        prior: &EngineState,
        destroy: bool,
    ) -> Result<ApplyOutput, ApplyFailure> {
        let dir = WorkDir::create(&self.work_root).map_err(|e| ApplyFailure::new(prior.clone(), e))?;
        self.prepare(&dir, platform, prior)
            .map_err(|e| ApplyFailure::new(prior.clone(), e))?;

        info!(
            plugin = platform.plugin().name,
            destroy = destroy,
            "applying infrastructure document"
        );
        let run_result = self.run(&dir, destroy);

        let state = match read_state(&dir.file(STATE_FILE)) {
            Ok(Some(state)) => state,
            Ok(None) => prior.clone(),
            Err(e) => match &run_result {
                Ok(()) => return Err(ApplyFailure::new(prior.clone(), e)),
                Err(_) => {
                    warn!("engine state unreadable after failed apply: {:#}", e);
                    prior.clone()
                }
            },
        };

        match run_result {
            Ok(()) => Ok(ApplyOutput {
                outputs: state_outputs(&state),
                state,
            }),
            Err(e) => Err(ApplyFailure::new(state, e)),
        }
    }
}

fn write_file(path: &Utf8Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .map_err(|e| HydroformError::io(format!("failed to write {}", path), e))?;
    Ok(())
}

fn required_providers(platform: &Platform) -> String {
    let plugin = platform.plugin();
    format!(
        "terraform {{\n  required_providers {{\n    {} = {{\n      source = \"{}\"\n    }}\n  }}\n}}\n",
        plugin.name, plugin.source
    )
}

/// Reads the state file, returning `None` when the engine never wrote one.
fn read_state(path: &Utf8Path) -> Result<Option<EngineState>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(HydroformError::io(format!("failed to read {}", path), e).into()),
    };
    if contents.trim().is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse engine state: {}", path))?;
    Ok(Some(EngineState::from_value(value)))
}

/// Extracts `outputs.<name>.value` from a Terraform state document.
fn state_outputs(state: &EngineState) -> std::collections::BTreeMap<String, serde_json::Value> {
    state
        .as_value()
        .get("outputs")
        .and_then(|outputs| outputs.as_object())
        .map(|outputs| {
            outputs
                .iter()
                .filter_map(|(name, output)| {
                    output.get("value").map(|value| (name.clone(), value.clone()))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::engine::ProviderPlugin;
    use crate::executor::ExecutionResult;
    use crate::template::gcp;

    /// Records commands and their working directory contents, and writes a
    /// state file on `apply` to stand in for the engine.
    struct FakeTerraform {
        calls: Mutex<Vec<Vec<String>>>,
        seen_vars: Mutex<Option<serde_json::Value>>,
        seen_prior: Mutex<Option<serde_json::Value>>,
        written_state: Option<serde_json::Value>,
        fail_apply: bool,
    }

    impl FakeTerraform {
        fn new(written_state: Option<serde_json::Value>, fail_apply: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                seen_vars: Mutex::new(None),
                seen_prior: Mutex::new(None),
                written_state,
                fail_apply,
            }
        }
    }

    impl CommandExecutor for FakeTerraform {
        fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
            self.calls.lock().unwrap().push(spec.args.clone());
            let cwd = spec.cwd.clone().expect("engine steps run in the work directory");
            if spec.args.first().map(String::as_str) == Some("apply") {
                let vars = fs::read_to_string(cwd.join(VARS_FILE)).unwrap();
                *self.seen_vars.lock().unwrap() = Some(serde_json::from_str(&vars).unwrap());
                if let Ok(prior) = fs::read_to_string(cwd.join(STATE_FILE)) {
                    *self.seen_prior.lock().unwrap() = Some(serde_json::from_str(&prior).unwrap());
                }
                assert!(cwd.join(DOCUMENT_FILE).is_file());
                assert!(
                    fs::read_to_string(cwd.join(PROVIDERS_FILE))
                        .unwrap()
                        .contains("source = \"hashicorp/google\"")
                );
                if let Some(state) = &self.written_state {
                    fs::write(cwd.join(STATE_FILE), state.to_string()).unwrap();
                }
                if self.fail_apply {
                    anyhow::bail!("simulated apply failure");
                }
            }
            Ok(ExecutionResult::default())
        }
    }

    fn platform() -> Platform {
        let mut platform = Platform::new(gcp::document(), ProviderPlugin::GOOGLE).unwrap();
        platform.var("cluster_name", "demo");
        platform.var("node_count", 2_i64);
        platform
    }

    fn engine(fake: Arc<FakeTerraform>, root: &Utf8Path) -> TerraformEngine {
        TerraformEngine::new(fake).with_work_root(root)
    }

    fn tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_create_runs_init_then_apply_and_reads_outputs() {
        let (_guard, root) = tempdir();
        let state = json!({
            "version": 4,
            "outputs": {
                "endpoint": {"value": "35.1.2.3", "type": "string"},
                "cluster_ca_certificate": {"value": "Y2VydA==", "type": "string"}
            }
        });
        let fake = Arc::new(FakeTerraform::new(Some(state.clone()), false));
        let output = engine(fake.clone(), &root)
            .apply(&platform(), &EngineState::empty(), false)
            .unwrap();

        let calls = fake.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0][0], "init");
        assert_eq!(calls[1][0], "apply");
        assert!(!calls[1].contains(&"-destroy".to_string()));

        assert_eq!(output.state, EngineState::from_value(state));
        assert_eq!(output.outputs.get("endpoint"), Some(&json!("35.1.2.3")));
        assert_eq!(
            fake.seen_vars.lock().unwrap().clone(),
            Some(json!({"cluster_name": "demo", "node_count": 2}))
        );
        assert!(fake.seen_prior.lock().unwrap().is_none());
    }

    #[test]
    fn test_destroy_passes_flag_and_prior_state() {
        let (_guard, root) = tempdir();
        let prior = EngineState::from_value(json!({"version": 4, "serial": 7}));
        let fake = Arc::new(FakeTerraform::new(Some(json!({"version": 4, "serial": 8})), false));
        engine(fake.clone(), &root)
            .apply(&platform(), &prior, true)
            .unwrap();

        let calls = fake.calls.lock().unwrap();
        assert!(calls[1].contains(&"-destroy".to_string()));
        assert_eq!(fake.seen_prior.lock().unwrap().clone(), Some(prior.as_value().clone()));
    }

    #[test]
    fn test_failed_apply_keeps_partial_state() {
        let (_guard, root) = tempdir();
        let partial = json!({"version": 4, "serial": 1, "resources": [{"type": "gardener_shoot"}]});
        let fake = Arc::new(FakeTerraform::new(Some(partial.clone()), true));
        let failure = engine(fake, &root)
            .apply(&platform(), &EngineState::empty(), false)
            .unwrap_err();
        assert_eq!(failure.state, EngineState::from_value(partial));
        assert!(format!("{:#}", failure.source).contains("simulated apply failure"));
    }

    #[test]
    fn test_failed_apply_without_state_returns_prior() {
        let (_guard, root) = tempdir();
        let prior = EngineState::from_value(json!({"serial": 3}));
        let fake = Arc::new(FakeTerraform::new(None, true));
        let failure = engine(fake, &root)
            .apply(&platform(), &prior, true)
            .unwrap_err();
        assert_eq!(failure.state, prior);
    }

    #[test]
    fn test_work_directory_is_removed() {
        let (_guard, root) = tempdir();
        let fake = Arc::new(FakeTerraform::new(Some(json!({"version": 4})), false));
        engine(fake, &root)
            .apply(&platform(), &EngineState::empty(), false)
            .unwrap();
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn test_state_outputs_without_outputs_map() {
        assert!(state_outputs(&EngineState::from_value(json!({"version": 4}))).is_empty());
        assert!(state_outputs(&EngineState::empty()).is_empty());
    }

    #[test]
    fn test_required_providers_block() {
        let block = required_providers(&platform());
        assert!(block.contains("google = {"));
        assert!(block.contains("source = \"hashicorp/google\""));
    }
}
