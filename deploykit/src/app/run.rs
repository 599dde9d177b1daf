//! Command dispatch

use anyhow::Context;
use serde_json::{json, Value};
use tracing::info;

use crate::app::options::{CliOptions, Command};
use crate::deploy::reconcile::EnsureRequest;
use crate::deploy::ReleaseManager;
use crate::services::Services;
use crate::storage::settings::Settings;

/// Run one command and return its result as JSON
pub async fn run(options: CliOptions, settings: &Settings) -> anyhow::Result<Value> {
    let services = Services::system(&settings.sudo_program);
    run_with(ReleaseManager::new(&options.root, services), options.command, settings).await
}

/// Run one command against an existing manager
pub async fn run_with(
    manager: ReleaseManager,
    command: Command,
    settings: &Settings,
) -> anyhow::Result<Value> {
    let root = manager.layout().root().to_path_buf();
    info!("Running {:?} on {:?}", command, root);

    let value = match command {
        Command::Skeleton(options) => {
            let changes = manager.skeleton(&options).await?;
            serde_json::to_value(changes)?
        }
        Command::Deploy(request) => serde_json::to_value(manager.deploy(&request).await?)?,
        Command::Rollback => serde_json::to_value(manager.rollback().await?)?,
        Command::Rollforward => serde_json::to_value(manager.rollforward().await?)?,
        Command::Current => match manager.current().await? {
            Some(release) => serde_json::to_value(release)?,
            None => json!({}),
        },
        Command::Available => serde_json::to_value(manager.available().await?)?,
        Command::Status => serde_json::to_value(manager.status().await?)?,
        Command::LimitHistory { keep } => {
            let keep = keep.unwrap_or(settings.keep_releases);
            let removed = manager
                .limit_history(keep)
                .await
                .with_context(|| format!("pruning releases in {:?}", root))?;
            serde_json::to_value(removed)?
        }
        Command::Select(tag) => serde_json::to_value(manager.select(&tag).await?)?,
        Command::Ensure {
            request,
            update_branch,
            dry_run,
        } => {
            let request = EnsureRequest {
                deploy: request,
                update_branch: update_branch.unwrap_or(settings.update_branch),
                dry_run,
            };
            serde_json::to_value(manager.ensure(&request).await?)?
        }
    };
    Ok(value)
}
