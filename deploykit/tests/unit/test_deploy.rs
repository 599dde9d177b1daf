//! Deploy tests

mod support;

use std::path::PathBuf;

use deploykit::deploy::deployer::DeployRequest;
use deploykit::errors::{CommandPhase, DeployError};
use deploykit::models::release::{ReleaseMeta, ScmKind};
use support::{TestApp, USER};

fn stored_meta(app: &TestApp, tag: &str) -> ReleaseMeta {
    let raw = std::fs::read_to_string(app.release_path(tag).join("META")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn test_successful_deploy() {
    let app = TestApp::new().await;
    let request = DeployRequest {
        rev: Some("v1.0".to_string()),
        deploy_cmd: Some("make build".to_string()),
        test_cmd: Some("make test".to_string()),
        ..app.request("r1")
    };

    let release = app.manager.deploy(&request).await.unwrap();
    assert_eq!(release.tag.as_str(), "r1");
    assert!(release.current);
    assert_eq!(release.path, app.release_path("r1"));

    let meta = stored_meta(&app, "r1");
    assert_eq!(
        meta,
        ReleaseMeta {
            commit: Some("commit-v1.0".to_string()),
            rev: Some("v1.0".to_string()),
            scm: ScmKind::Git,
            deploy_cmd_ok: Some(true),
            test_cmd_ok: Some(true),
            ok: true,
        }
    );
    assert_eq!(release.meta, Some(meta));
    assert_eq!(app.current_tag().await.as_deref(), Some("r1"));

    // hooks ran in the release directory as the releases/ owner
    let hooks: Vec<_> = app
        .runner
        .invocations()
        .into_iter()
        .filter(|i| i.cmd.starts_with("make"))
        .collect();
    assert_eq!(hooks.len(), 2);
    assert!(hooks.iter().all(|i| i.cwd == app.release_path("r1")));
    assert!(hooks.iter().all(|i| i.user.as_deref() == Some(USER)));
}

#[tokio::test]
async fn test_deploy_without_hooks_leaves_them_unset() {
    let app = TestApp::new().await;
    app.deploy_ok("r1").await;

    let meta = stored_meta(&app, "r1");
    assert!(meta.ok);
    assert_eq!(meta.rev, None);
    assert_eq!(meta.commit.as_deref(), Some("commit-HEAD"));
    assert_eq!(meta.deploy_cmd_ok, None);
    assert_eq!(meta.test_cmd_ok, None);
}

#[tokio::test]
async fn test_deploy_links_shared_log() {
    let app = TestApp::new().await;
    app.deploy_ok("r1").await;

    let log = app.release_path("r1").join("log");
    assert_eq!(
        std::fs::read_link(&log).unwrap(),
        PathBuf::from("../../shared/log")
    );
    std::fs::write(log.join("app.log"), "line\n").unwrap();
    assert!(app.root.join("shared").join("log").join("app.log").is_file());
}

#[tokio::test]
async fn test_shipped_log_is_moved_aside() {
    let app = TestApp::new().await;
    app.scm.ship("log");
    app.deploy_ok("r1").await;

    let release = app.release_path("r1");
    assert!(release.join("log-old").is_dir());
    assert!(std::fs::symlink_metadata(release.join("log"))
        .unwrap()
        .file_type()
        .is_symlink());
}

#[tokio::test]
async fn test_failed_deploy_hook_persists_record() {
    let app = TestApp::new().await;
    app.deploy_ok("r1").await;

    app.runner.script("make build", 2, "");
    let request = DeployRequest {
        deploy_cmd: Some("make build".to_string()),
        test_cmd: Some("make test".to_string()),
        on_failed_cmd: Some("notify failed".to_string()),
        ..app.request("r2")
    };
    let err = app.manager.deploy(&request).await.unwrap_err();

    let DeployError::CommandFailed(failure) = &err else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(failure.phase, CommandPhase::Deploy);
    assert_eq!(failure.exit_code, Some(2));

    let meta = stored_meta(&app, "r2");
    assert!(!meta.ok);
    assert_eq!(meta.deploy_cmd_ok, Some(false));
    assert_eq!(meta.test_cmd_ok, None);

    let recovery: Vec<_> = app
        .runner
        .invocations()
        .into_iter()
        .filter(|i| i.cmd == "notify failed")
        .collect();
    assert_eq!(recovery.len(), 1);
    assert_eq!(recovery[0].cwd, app.release_path("r2"));
    assert_eq!(recovery[0].user.as_deref(), Some(USER));
    assert!(!app.runner.ran("make test"));
    assert_eq!(app.current_tag().await.as_deref(), Some("r1"));
}

#[tokio::test]
async fn test_failed_test_hook_persists_record() {
    let app = TestApp::new().await;

    app.runner.script("make test", 1, "");
    let request = DeployRequest {
        deploy_cmd: Some("make build".to_string()),
        test_cmd: Some("make test".to_string()),
        ..app.request("r1")
    };
    let err = app.manager.deploy(&request).await.unwrap_err();
    assert_eq!(err.command_failure().unwrap().phase, CommandPhase::Test);

    let meta = stored_meta(&app, "r1");
    assert!(!meta.ok);
    assert_eq!(meta.deploy_cmd_ok, Some(true));
    assert_eq!(meta.test_cmd_ok, Some(false));
    assert_eq!(app.current_tag().await, None);
}

#[tokio::test]
async fn test_failing_on_failed_hook_is_reported_separately() {
    let app = TestApp::new().await;

    app.runner.script("make test", 1, "");
    app.runner.script("cleanup", 7, "");
    let request = DeployRequest {
        test_cmd: Some("make test".to_string()),
        on_failed_cmd: Some("cleanup".to_string()),
        ..app.request("r1")
    };
    let err = app.manager.deploy(&request).await.unwrap_err();

    let DeployError::CommandFailedWithRecovery { failure, on_failed } = &err else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(failure.phase, CommandPhase::Test);
    assert_eq!(on_failed.phase, CommandPhase::OnFailed);
    assert_eq!(on_failed.exit_code, Some(7));

    // the record is still inspectable
    assert_eq!(stored_meta(&app, "r1").test_cmd_ok, Some(false));
}

#[tokio::test]
async fn test_failed_activation_keeps_release_current() {
    let app = TestApp::new().await;

    app.runner.script("supervisorctl", 1, "");
    let request = DeployRequest {
        activate_cmd: Some("supervisorctl restart app".to_string()),
        ..app.request("r1")
    };
    let err = app.manager.deploy(&request).await.unwrap_err();

    let DeployError::ActivationFailed { release, failure } = &err else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(failure.phase, CommandPhase::Activate);
    assert_eq!(release.tag.as_str(), "r1");
    assert!(release.current);

    assert!(stored_meta(&app, "r1").ok);
    assert_eq!(app.current_tag().await.as_deref(), Some("r1"));

    let activation = app
        .runner
        .invocations()
        .into_iter()
        .find(|i| i.cmd.contains("supervisorctl"))
        .unwrap();
    assert_eq!(activation.cwd, app.root);
}

#[tokio::test]
async fn test_duplicate_tag_is_rejected() {
    let app = TestApp::new().await;
    app.deploy_ok("r1").await;

    let err = app.manager.deploy(&app.request("r1")).await.unwrap_err();
    assert!(matches!(err, DeployError::InvalidState(_)));
    assert_eq!(app.scm.clones(), 1);
}

#[tokio::test]
async fn test_generated_tag() {
    let app = TestApp::new().await;
    let request = DeployRequest {
        tag: None,
        ..app.request("unused")
    };

    let release = app.manager.deploy(&request).await.unwrap();
    assert!(release.tag.is_timestamp());
    assert!(app.release_path(release.tag.as_str()).is_dir());
}

#[tokio::test]
async fn test_deploy_requires_releases_directory() {
    let app = TestApp::bare();
    std::fs::create_dir(&app.root).unwrap();

    let err = app.manager.deploy(&app.request("r1")).await.unwrap_err();
    assert!(matches!(err, DeployError::NotFound(_)));
    assert_eq!(app.scm.clones(), 0);
}
