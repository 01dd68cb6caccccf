mod helpers;

use std::fs;
use std::sync::Arc;

use helpers::{FakeTools, GARDENER_MANIFEST, Workspace, terraform_state};
use hydroform::config::load_record;
use hydroform::operator::OperatorType;
use hydroform::types::Phase;
use hydroform::{
    HydroformError, cli, run_check_installation, run_credentials, run_deprovision, run_provision,
    run_status, run_validate,
};

fn common(ws: &Workspace) -> cli::CommonArgs {
    cli::CommonArgs {
        file: ws.manifest(),
        log_level: cli::LogLevel::Error,
    }
}

fn engine(ws: &Workspace) -> cli::EngineArgs {
    cli::EngineArgs {
        operator: OperatorType::Terraform,
        terraform: "terraform".to_string(),
        work_dir: Some(ws.work_dir()),
        dry_run: false,
    }
}

fn kube() -> cli::KubeArgs {
    cli::KubeArgs {
        kubectl: "kubectl".to_string(),
    }
}

fn provision_args(ws: &Workspace) -> cli::ProvisionArgs {
    cli::ProvisionArgs {
        common: common(ws),
        engine: engine(ws),
        kube: kube(),
        record: ws.record(),
    }
}

fn deprovision_args(ws: &Workspace) -> cli::DeprovisionArgs {
    cli::DeprovisionArgs {
        common: common(ws),
        engine: engine(ws),
        kube: kube(),
        record: ws.record(),
    }
}

fn provisioned_state() -> serde_json::Value {
    terraform_state(
        1,
        serde_json::json!({
            "endpoint": {"value": "https://api.demo.proj.shoot.example"},
            "cluster_ca_certificate": {"value": "Y2VydA=="}
        }),
    )
}

#[test]
fn test_run_provision_writes_cluster_record() {
    let ws = Workspace::new(GARDENER_MANIFEST);
    let tools = Arc::new(FakeTools {
        state: Some(provisioned_state()),
        ..FakeTools::default()
    });

    run_provision(&provision_args(&ws), tools.clone()).expect("provision should succeed");

    let calls = tools.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].args[0], "init");
    assert_eq!(calls[1].args[0], "apply");
    assert!(!calls[1].args.contains(&"-destroy".to_string()));
    assert!(calls[1].prior_state.is_none(), "create starts from an empty state");

    let record = load_record(&ws.record()).unwrap();
    assert_eq!(record.name, "demo");
    let info = record.cluster_info.expect("record carries cluster info");
    assert_eq!(info.endpoint, "https://api.demo.proj.shoot.example");
    assert_eq!(info.certificate_authority_data, b"cert");
    assert_eq!(info.status.phase, Phase::Provisioned);
    assert_eq!(info.internal_state.as_value()["serial"], 1);

    let leftovers: Vec<_> = fs::read_dir(ws.work_dir()).unwrap().collect();
    assert!(leftovers.is_empty(), "engine work directories are removed");
}

#[test]
fn test_run_deprovision_destroys_recorded_state() {
    let ws = Workspace::new(GARDENER_MANIFEST);
    let create = Arc::new(FakeTools {
        state: Some(provisioned_state()),
        ..FakeTools::default()
    });
    run_provision(&provision_args(&ws), create).unwrap();

    let destroy = Arc::new(FakeTools {
        state: Some(terraform_state(2, serde_json::json!({}))),
        ..FakeTools::default()
    });
    run_deprovision(&deprovision_args(&ws), destroy.clone()).expect("deprovision should succeed");

    let calls = destroy.calls();
    let apply = calls.iter().find(|call| call.args[0] == "apply").unwrap();
    assert!(apply.args.contains(&"-destroy".to_string()));
    assert_eq!(apply.prior_state.as_ref().unwrap()["serial"], 1);
    assert!(!ws.record().exists(), "record is removed after deprovision");
}

#[test]
fn test_run_provision_failure_keeps_partial_record() {
    let ws = Workspace::new(GARDENER_MANIFEST);
    let tools = Arc::new(FakeTools {
        state: Some(terraform_state(1, serde_json::json!({}))),
        apply_exit_code: 1,
        ..FakeTools::default()
    });

    let err = run_provision(&provision_args(&ws), tools).unwrap_err();

    assert!(err.to_string().contains("unable to provision gardener cluster"));
    let typed = err.downcast_ref::<HydroformError>().expect("typed error");
    assert!(matches!(typed, HydroformError::Apply { .. }));

    let record = load_record(&ws.record()).unwrap();
    let info = record.cluster_info.unwrap();
    assert_eq!(info.status.phase, Phase::Errored);
    assert_eq!(info.internal_state.as_value()["serial"], 1);
}

#[test]
fn test_run_provision_refuses_record_with_state() {
    let ws = Workspace::new(GARDENER_MANIFEST);
    let first = Arc::new(FakeTools {
        state: Some(terraform_state(1, serde_json::json!({}))),
        apply_exit_code: 1,
        ..FakeTools::default()
    });
    run_provision(&provision_args(&ws), first).unwrap_err();
    let before = load_record(&ws.record()).unwrap().cluster_info.unwrap();

    let retry = Arc::new(FakeTools {
        apply_exit_code: 1,
        ..FakeTools::default()
    });
    let err = run_provision(&provision_args(&ws), retry.clone()).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<HydroformError>(),
        Some(HydroformError::RecordInUse(_))
    ));
    assert!(retry.calls().is_empty(), "no engine call when the record holds state");
    let after = load_record(&ws.record()).unwrap().cluster_info.unwrap();
    assert_eq!(after.internal_state, before.internal_state);
}

#[test]
fn test_run_provision_reuses_record_without_state() {
    let ws = Workspace::new(GARDENER_MANIFEST);
    let stale = hydroform::config::load_manifest(&ws.manifest()).unwrap().cluster;
    hydroform::config::save_record(&ws.record(), &stale).unwrap();
    let tools = Arc::new(FakeTools {
        state: Some(provisioned_state()),
        ..FakeTools::default()
    });

    run_provision(&provision_args(&ws), tools).expect("provision should succeed");

    let info = load_record(&ws.record()).unwrap().cluster_info.unwrap();
    assert_eq!(info.status.phase, Phase::Provisioned);
}

#[test]
fn test_run_deprovision_failure_records_partial_state() {
    let ws = Workspace::new(GARDENER_MANIFEST);
    run_provision(
        &provision_args(&ws),
        Arc::new(FakeTools {
            state: Some(provisioned_state()),
            ..FakeTools::default()
        }),
    )
    .unwrap();
    let destroy = Arc::new(FakeTools {
        state: Some(terraform_state(2, serde_json::json!({}))),
        apply_exit_code: 1,
        ..FakeTools::default()
    });

    let err = run_deprovision(&deprovision_args(&ws), destroy).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<HydroformError>(),
        Some(HydroformError::Apply { .. })
    ));
    let record = load_record(&ws.record()).unwrap();
    let info = record.cluster_info.unwrap();
    assert_eq!(info.internal_state.as_value()["serial"], 2);
    assert_eq!(info.status.phase, Phase::Errored);
}

#[test]
fn test_run_provision_invalid_manifest_runs_nothing() {
    let ws = Workspace::new(&GARDENER_MANIFEST.replace("node_count: 2", "node_count: 0"));
    let tools = Arc::new(FakeTools::default());

    let err = run_provision(&provision_args(&ws), tools.clone()).unwrap_err();

    assert!(format!("{:#}", err).contains("Cluster.NodeCount cannot be less than 1."));
    assert!(tools.calls().is_empty());
    assert!(!ws.record().exists());
}

#[test]
fn test_run_provision_dry_run_skips_record() {
    let ws = Workspace::new(GARDENER_MANIFEST);
    let tools = Arc::new(FakeTools {
        state: Some(provisioned_state()),
        ..FakeTools::default()
    });
    let mut opts = provision_args(&ws);
    opts.engine.dry_run = true;

    run_provision(&opts, tools).unwrap();

    assert!(!ws.record().exists());
}

#[test]
fn test_run_deprovision_unknown_operator_fails() {
    let ws = Workspace::new(GARDENER_MANIFEST);
    run_provision(
        &provision_args(&ws),
        Arc::new(FakeTools {
            state: Some(provisioned_state()),
            ..FakeTools::default()
        }),
    )
    .unwrap();
    let tools = Arc::new(FakeTools::default());
    let mut opts = deprovision_args(&ws);
    opts.engine.operator = OperatorType::Unknown;

    let err = run_deprovision(&opts, tools.clone()).unwrap_err();

    assert!(format!("{:#}", err).contains("unknown operator"));
    assert!(tools.calls().is_empty());
    assert!(ws.record().exists(), "record is kept when deprovision fails");
}

#[test]
fn test_run_status_queries_shoot() {
    let ws = Workspace::new(GARDENER_MANIFEST);
    let tools = Arc::new(FakeTools {
        kubectl_stdout: r#"{"status":{"lastOperation":{"state":"Succeeded"}}}"#.to_string(),
        ..FakeTools::default()
    });
    let opts = cli::StatusArgs {
        common: common(&ws),
        kube: kube(),
    };

    run_status(&opts, tools.clone()).expect("status should succeed");

    let calls = tools.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].command, "kubectl");
    assert_eq!(calls[0].args[1], ws.kubeconfig().as_str());
    assert_eq!(
        &calls[0].args[2..],
        ["get", "shoots", "demo", "-n", "garden-proj", "-o", "json"]
    );
}

#[test]
fn test_run_status_lookup_failure() {
    let ws = Workspace::new(GARDENER_MANIFEST);
    let tools = Arc::new(FakeTools {
        kubectl_stderr: Some("Error from server (NotFound): shoots \"demo\" not found".to_string()),
        ..FakeTools::default()
    });
    let opts = cli::StatusArgs {
        common: common(&ws),
        kube: kube(),
    };

    let err = run_status(&opts, tools).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<HydroformError>(),
        Some(HydroformError::ExternalLookup { .. })
    ));
}

#[test]
fn test_run_credentials_writes_kubeconfig() {
    let ws = Workspace::new(GARDENER_MANIFEST);
    let tools = Arc::new(FakeTools {
        kubectl_stdout: r#"{"metadata":{"name":"demo.kubeconfig"},"data":{"kubeconfig":"YXBpVmVyc2lvbjogdjEK"}}"#
            .to_string(),
        ..FakeTools::default()
    });
    let output = ws.root.join("demo-kubeconfig.yaml");
    let opts = cli::CredentialsArgs {
        common: common(&ws),
        kube: kube(),
        output: Some(output.clone()),
    };

    run_credentials(&opts, tools.clone()).expect("credentials should succeed");

    assert_eq!(fs::read_to_string(&output).unwrap(), "apiVersion: v1\n");
    assert!(tools.calls()[0].args.contains(&"demo.kubeconfig".to_string()));
}

#[test]
fn test_run_check_installation() {
    let ws = Workspace::new(GARDENER_MANIFEST);
    // One document answers both the pod list and the installation resource.
    let tools = Arc::new(FakeTools {
        kubectl_stdout: r#"{
            "items": [{"metadata": {"name": "tiller-deploy"}, "status": {"phase": "Running"}}],
            "status": {"state": "Installed", "description": "Kyma installed"}
        }"#
        .to_string(),
        ..FakeTools::default()
    });
    let opts = cli::CheckInstallationArgs {
        kubeconfig: ws.kubeconfig(),
        kube: kube(),
        log_level: cli::LogLevel::Error,
    };

    run_check_installation(&opts, tools.clone()).expect("check should succeed");

    let calls = tools.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].args.contains(&"name=tiller".to_string()));
    assert!(
        calls[2]
            .args
            .contains(&"installations.installer.kyma-project.io".to_string())
    );
}

#[test]
fn test_run_validate() {
    let ws = Workspace::new(GARDENER_MANIFEST);
    let opts = cli::ValidateArgs { common: common(&ws) };
    run_validate(&opts).expect("manifest should be valid");

    let ws = Workspace::new(&GARDENER_MANIFEST.replace("    zone: europe-west3-b\n", ""));
    let opts = cli::ValidateArgs { common: common(&ws) };
    let err = run_validate(&opts).unwrap_err();
    assert!(format!("{:#}", err).contains("Provider.CustomConfigurations['zone'] cannot be empty."));
}
