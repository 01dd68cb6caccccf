#![allow(dead_code)]

use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

use camino::Utf8PathBuf;
use hydroform::executor::{CommandExecutor, CommandSpec, ExecutionResult};
use tempfile::TempDir;

/// Manifest for a Gardener shoot on GCP. The credentials path is relative
/// to the manifest.
pub const GARDENER_MANIFEST: &str = r#"---
cluster:
  name: demo
  node_count: 2
  machine_type: n1-standard-4
  kubernetes_version: "1.15"
  disk_size_gb: 30
  location: europe-west3
provider:
  type: gardener
  credentials_file_path: gardener-kubeconfig.yaml
  project_name: proj
  custom_configurations:
    target_provider: gcp
    target_seed: gcp-eu1
    target_secret: secret-gcp
    disk_type: pd-standard
    autoscaler_min: "1"
    autoscaler_max: "3"
    max_surge: "1"
    max_unavailable: "1"
    workercidr: 10.250.0.0/19
    zone: europe-west3-b
"#;

/// Temporary directory holding a manifest and the kubeconfig it points to.
pub struct Workspace {
    _dir: TempDir,
    pub root: Utf8PathBuf,
}

impl Workspace {
    pub fn new(manifest: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        fs::write(root.join("cluster.yaml"), manifest).unwrap();
        fs::write(root.join("gardener-kubeconfig.yaml"), "apiVersion: v1\n").unwrap();
        fs::create_dir(root.join("work")).unwrap();
        Self { _dir: dir, root }
    }

    pub fn manifest(&self) -> Utf8PathBuf {
        self.root.join("cluster.yaml")
    }

    pub fn record(&self) -> Utf8PathBuf {
        self.root.join("cluster-record.yaml")
    }

    pub fn work_dir(&self) -> Utf8PathBuf {
        self.root.join("work")
    }

    pub fn kubeconfig(&self) -> Utf8PathBuf {
        self.root.join("gardener-kubeconfig.yaml")
    }
}

/// One recorded command.
#[derive(Debug, Clone)]
pub struct Call {
    pub command: String,
    pub args: Vec<String>,
    /// Prior state found in the work directory when `apply` ran.
    pub prior_state: Option<serde_json::Value>,
}

/// Stands in for `terraform` and `kubectl`.
///
/// `terraform apply` writes `state` to the work directory and exits with
/// `apply_exit_code`. `kubectl get` answers with `kubectl_stdout`, or with
/// `kubectl_stderr` and exit code 1 when that is set.
#[derive(Default)]
pub struct FakeTools {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub state: Option<serde_json::Value>,
    pub apply_exit_code: i32,
    pub kubectl_stdout: String,
    pub kubectl_stderr: Option<String>,
}

impl FakeTools {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn terraform(&self, spec: &CommandSpec) -> (i32, Vec<u8>, Vec<u8>) {
        let mut prior_state = None;
        let mut code = 0;
        if spec.args.first().map(String::as_str) == Some("apply") {
            let cwd = spec.cwd.as_ref().expect("terraform runs in a work directory");
            let state_file = cwd.join("terraform.tfstate");
            if let Ok(prior) = fs::read_to_string(&state_file) {
                prior_state = Some(serde_json::from_str(&prior).unwrap());
            }
            if let Some(state) = &self.state {
                fs::write(&state_file, state.to_string()).unwrap();
            }
            code = self.apply_exit_code;
        }
        self.record(spec, prior_state);
        (code, Vec::new(), Vec::new())
    }

    fn kubectl(&self, spec: &CommandSpec) -> (i32, Vec<u8>, Vec<u8>) {
        self.record(spec, None);
        match &self.kubectl_stderr {
            Some(stderr) => (1, Vec::new(), stderr.clone().into_bytes()),
            None => (0, self.kubectl_stdout.clone().into_bytes(), Vec::new()),
        }
    }

    fn record(&self, spec: &CommandSpec, prior_state: Option<serde_json::Value>) {
        self.calls.lock().unwrap().push(Call {
            command: spec.command.clone(),
            args: spec.args.clone(),
            prior_state,
        });
    }
}

impl CommandExecutor for FakeTools {
    fn execute(&self, spec: &CommandSpec) -> anyhow::Result<ExecutionResult> {
        let (code, stdout, stderr) = match spec.command.as_str() {
            "terraform" => self.terraform(spec),
            "kubectl" => self.kubectl(spec),
            other => anyhow::bail!("unexpected command: {}", other),
        };
        Ok(ExecutionResult {
            status: Some(ExitStatus::from_raw(code << 8)),
            stdout,
            stderr,
        })
    }
}

/// A Terraform state document with the given outputs.
pub fn terraform_state(serial: u64, outputs: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "version": 4,
        "serial": serial,
        "outputs": outputs,
        "resources": [{"type": "gardener_shoot", "name": "test_cluster"}]
    })
}
