//! Command line options

use std::collections::HashMap;
use std::path::PathBuf;

use crate::deploy::deployer::DeployRequest;
use crate::deploy::skeleton::SkeletonOptions;
use crate::deploy::tag::ReleaseTag;
use crate::errors::DeployError;

/// Raw `command --key=value --flag` arguments
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub command: Option<String>,
    pub values: HashMap<String, String>,
}

impl CliArgs {
    /// Split arguments (without the program name) into a command and
    /// `--key=value` pairs; bare `--flag`s are stored as `"true"`
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = CliArgs::default();
        for arg in args {
            let arg = arg.as_ref();
            if let Some((key, value)) = arg.split_once('=') {
                let clean_key = key.trim_start_matches('-');
                parsed.values.insert(clean_key.to_string(), value.to_string());
            } else if arg.starts_with("--") {
                let clean_key = arg.trim_start_matches('-');
                parsed.values.insert(clean_key.to_string(), "true".to_string());
            } else if parsed.command.is_none() {
                parsed.command = Some(arg.to_string());
            }
        }
        parsed
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn flag(&self, key: &str) -> Result<bool, DeployError> {
        self.bool_value(key).map(|value| value.unwrap_or(false))
    }

    fn bool_value(&self, key: &str) -> Result<Option<bool>, DeployError> {
        match self.values.get(key).map(|v| v.to_lowercase()) {
            None => Ok(None),
            Some(v) if matches!(v.as_str(), "true" | "yes" | "1") => Ok(Some(true)),
            Some(v) if matches!(v.as_str(), "false" | "no" | "0") => Ok(Some(false)),
            Some(v) => Err(DeployError::ConfigError(format!(
                "--{} expects true or false, got {:?}",
                key, v
            ))),
        }
    }

    fn required(&self, key: &str) -> Result<String, DeployError> {
        self.get(key)
            .ok_or_else(|| DeployError::ConfigError(format!("Missing required --{}=<value>", key)))
    }

    fn tag(&self) -> Result<Option<ReleaseTag>, DeployError> {
        self.get("tag").map(|tag| ReleaseTag::new(tag)).transpose()
    }

    fn deploy_request(&self) -> Result<DeployRequest, DeployError> {
        Ok(DeployRequest {
            repository: self.required("repository")?,
            rev: self.get("rev"),
            user: self.get("user"),
            group: self.get("group"),
            deploy_cmd: self.get("deploy-cmd"),
            test_cmd: self.get("test-cmd"),
            on_failed_cmd: self.get("on-failed-cmd"),
            activate_cmd: self.get("activate-cmd"),
            tag: self.tag()?,
        })
    }
}

/// A command to run against an application root
#[derive(Debug, Clone)]
pub enum Command {
    Skeleton(SkeletonOptions),
    Deploy(DeployRequest),
    Rollback,
    Rollforward,
    Current,
    Available,
    Status,
    LimitHistory {
        /// Falls back to the configured default
        keep: Option<usize>,
    },
    Select(ReleaseTag),
    Ensure {
        request: DeployRequest,

        /// Falls back to the configured default
        update_branch: Option<bool>,
        dry_run: bool,
    },
}

/// Fully parsed invocation
#[derive(Debug, Clone)]
pub struct CliOptions {
    pub root: PathBuf,
    pub command: Command,
}

impl CliOptions {
    pub fn from_args(args: &CliArgs) -> Result<Self, DeployError> {
        let name = args
            .command
            .as_deref()
            .ok_or_else(|| DeployError::ConfigError("Missing command".to_string()))?;

        let command = match name {
            "skeleton" => Command::Skeleton(SkeletonOptions {
                user: args.get("user"),
                group: args.get("group"),
                mode: args.get("mode").map(|m| parse_mode(&m)).transpose()?,
                makedirs: args.flag("makedirs")?,
                dry_run: args.flag("dry-run")?,
            }),
            "deploy" => Command::Deploy(args.deploy_request()?),
            "rollback" => Command::Rollback,
            "rollforward" => Command::Rollforward,
            "current" => Command::Current,
            "available" => Command::Available,
            "status" => Command::Status,
            "limit-history" | "limit_history" => Command::LimitHistory {
                keep: args
                    .get("keep")
                    .map(|k| {
                        k.parse().map_err(|_| {
                            DeployError::ConfigError(format!("--keep expects a count, got {:?}", k))
                        })
                    })
                    .transpose()?,
            },
            "select" => Command::Select(ReleaseTag::new(args.required("tag")?)?),
            "ensure" => Command::Ensure {
                request: args.deploy_request()?,
                update_branch: args.bool_value("update-branch")?,
                dry_run: args.flag("dry-run")?,
            },
            other => {
                return Err(DeployError::ConfigError(format!("Unknown command {:?}", other)));
            }
        };

        Ok(Self {
            root: PathBuf::from(args.required("root")?),
            command,
        })
    }
}

/// Parse an octal mode such as `755` or `0o750`
fn parse_mode(mode: &str) -> Result<u32, DeployError> {
    let digits = mode.trim_start_matches("0o");
    u32::from_str_radix(digits, 8)
        .map_err(|_| DeployError::ConfigError(format!("--mode expects an octal mode, got {:?}", mode)))
}
