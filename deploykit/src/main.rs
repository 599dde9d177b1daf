//! deploykit - Entry Point
//!
//! Manages tagged releases of an application checked out from source
//! control: deploy, inspect, roll back and forward, prune.

use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use tracing::error;

use deploykit::app::options::{CliArgs, CliOptions};
use deploykit::app::run::run;
use deploykit::logs::{init_logging, LogOptions};
use deploykit::storage::settings::Settings;
use deploykit::utils::version_info;

const USAGE: &str = "\
usage: deploykit <command> --root=<dir> [--key=value ...]

commands:
  skeleton       [--user= --group= --mode= --makedirs --dry-run]
  deploy         --repository= [--rev= --user= --group= --tag=
                  --deploy-cmd= --test-cmd= --on-failed-cmd= --activate-cmd=]
  ensure         same as deploy, plus [--update-branch=true|false --dry-run]
  rollback | rollforward | current | available | status
  select         --tag=
  limit-history  [--keep=]

global: --config=<settings.json> --version";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = CliArgs::parse(std::env::args().skip(1));

    // Print version and exit
    if args.has("version") {
        return match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => {
                println!("{}", version);
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e.to_string()),
        };
    }

    if args.has("help") || args.command.is_none() {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    }

    let settings = match Settings::load(args.get("config").map(PathBuf::from)).await {
        Ok(settings) => settings,
        Err(e) => return fail(&e.to_string()),
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings.log_dir.clone(),
        json_format: settings.log_json,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = match CliOptions::from_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", USAGE);
            return fail(&e.to_string());
        }
    };

    match run(options, &settings).await {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(output) => {
                println!("{}", output);
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e.to_string()),
        },
        Err(e) => {
            error!("{:#}", e);
            fail(&format!("{:#}", e))
        }
    }
}

fn fail(message: &str) -> ExitCode {
    eprintln!("{} {}", "error:".red().bold(), message);
    ExitCode::FAILURE
}
