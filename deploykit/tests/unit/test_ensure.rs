//! Convergence tests

mod support;

use deploykit::deploy::deployer::DeployRequest;
use deploykit::deploy::reconcile::{DeployReason, EnsureOutcome, EnsureRequest};
use support::TestApp;

fn ensure_request(app: &TestApp, rev: &str, tag: &str) -> EnsureRequest {
    EnsureRequest::new(DeployRequest {
        rev: Some(rev.to_string()),
        ..app.request(tag)
    })
}

/// Checkouts are on `main` and the upstream has nothing new
fn on_clean_branch(app: &TestApp) {
    app.runner.script("git symbolic-ref", 0, "refs/heads/main\n");
    app.runner.script("git diff", 0, "");
}

#[tokio::test]
async fn test_ensure_is_idempotent() {
    let app = TestApp::new().await;
    on_clean_branch(&app);

    let first = app.manager.ensure(&ensure_request(&app, "main", "r1")).await.unwrap();
    assert!(matches!(
        first,
        EnsureOutcome::Deployed {
            reason: DeployReason::NoCurrentRelease,
            ..
        }
    ));
    assert_eq!(app.scm.clones(), 1);

    let second = app.manager.ensure(&ensure_request(&app, "main", "r2")).await.unwrap();
    let EnsureOutcome::Converged { release } = second else {
        panic!("expected convergence, got {second:?}");
    };
    assert_eq!(release.tag.as_str(), "r1");
    assert_eq!(app.scm.clones(), 1);
    assert_eq!(app.scm.fetches(), 1);
    assert!(!app.release_path("r2").exists());
}

#[tokio::test]
async fn test_ensure_redeploys_on_revision_change() {
    let app = TestApp::new().await;
    on_clean_branch(&app);
    app.manager.ensure(&ensure_request(&app, "v1", "r1")).await.unwrap();

    let outcome = app.manager.ensure(&ensure_request(&app, "v2", "r2")).await.unwrap();
    let EnsureOutcome::Deployed { reason, release } = outcome else {
        panic!("expected a deploy");
    };
    assert_eq!(
        reason,
        DeployReason::RevisionChanged {
            from: Some("v1".to_string()),
            to: Some("v2".to_string()),
        }
    );
    assert_eq!(release.tag.as_str(), "r2");
    assert_eq!(app.current_tag().await.as_deref(), Some("r2"));
}

#[tokio::test]
async fn test_ensure_redeploys_on_upstream_drift() {
    let app = TestApp::new().await;
    on_clean_branch(&app);
    app.manager.ensure(&ensure_request(&app, "main", "r1")).await.unwrap();

    app.runner.script("git diff", 0, "diff --git a/app.py b/app.py\n");
    let outcome = app.manager.ensure(&ensure_request(&app, "main", "r2")).await.unwrap();
    let EnsureOutcome::Deployed { reason, .. } = outcome else {
        panic!("expected a deploy");
    };
    assert_eq!(
        reason,
        DeployReason::UpstreamDrift {
            branch: "main".to_string()
        }
    );

    let diff = app
        .runner
        .invocations()
        .into_iter()
        .find(|i| i.cmd.starts_with("git diff"))
        .unwrap();
    assert!(diff.cmd.contains("main origin/main"));
    assert_eq!(diff.cwd, app.release_path("r1"));
}

#[tokio::test]
async fn test_ensure_skips_drift_check_when_disabled_or_detached() {
    let app = TestApp::new().await;
    on_clean_branch(&app);
    app.manager.ensure(&ensure_request(&app, "main", "r1")).await.unwrap();
    app.runner.script("git diff", 0, "upstream changed\n");

    let mut request = ensure_request(&app, "main", "r2");
    request.update_branch = false;
    let outcome = app.manager.ensure(&request).await.unwrap();
    assert!(!outcome.deployed());

    app.runner.script("git symbolic-ref", 1, "");
    let outcome = app.manager.ensure(&ensure_request(&app, "main", "r3")).await.unwrap();
    assert!(!outcome.deployed());
    assert_eq!(app.scm.fetches(), 0);
}

#[tokio::test]
async fn test_ensure_redeploys_when_current_has_no_record() {
    let app = TestApp::new().await;
    std::fs::create_dir(app.release_path("manual")).unwrap();
    app.manager.select(&TestApp::tag("manual")).await.unwrap();

    let outcome = app.manager.ensure(&ensure_request(&app, "main", "r1")).await.unwrap();
    assert!(matches!(
        outcome,
        EnsureOutcome::Deployed {
            reason: DeployReason::NoCurrentRelease,
            ..
        }
    ));
}

#[tokio::test]
async fn test_ensure_dry_run_does_not_deploy() {
    let app = TestApp::new().await;

    let mut request = ensure_request(&app, "main", "r1");
    request.dry_run = true;
    let outcome = app.manager.ensure(&request).await.unwrap();

    assert!(matches!(
        outcome,
        EnsureOutcome::WouldDeploy {
            reason: DeployReason::NoCurrentRelease
        }
    ));
    assert_eq!(app.scm.clones(), 0);
    assert_eq!(app.current_tag().await, None);

    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["outcome"], "wouldDeploy");
    assert_eq!(value["reason"]["kind"], "noCurrentRelease");
}
