use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::cache_clear::CacheClearOptions;
use crate::commands::models_check::ModelsCheckOptions;
use crate::commands::scripts_diff::ScriptsDiffOptions;
use crate::commands::scripts_export::{ExportFormat, ScriptsExportOptions};
use crate::commands::scripts_history::ScriptsHistoryOptions;
use crate::commands::scripts_list::ScriptsListOptions;
use crate::commands::scripts_manage::ScriptsManageOptions;
use crate::commands::scripts_normalize::ScriptsNormalizeOptions;
use crate::commands::scripts_rollback::ScriptsRollbackOptions;
use crate::commands::scripts_sync::ScriptsSyncOptions;
use crate::commands::{self, CommandReport, KeeperContext};
use crate::keeper::paths::PathOverrides;
use crate::logging;

/// Housekeeping for a Draw Things container: model manifests, caches and
/// script metadata.
#[derive(Parser, Debug)]
#[command(name = "dt-keeper", version, about, long_about = None)]
pub struct Cli {
    /// Print the report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Draw Things container directory
    #[arg(long, global = true, value_name = "DIR")]
    pub container_dir: Option<PathBuf>,

    /// Models directory (defaults to <container>/Documents/Models)
    #[arg(long, global = true, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Scripts directory (defaults to <container>/Documents/Scripts)
    #[arg(long, global = true, value_name = "DIR")]
    pub scripts_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Validate model manifests against the files on disk
    ModelsCheck {
        /// Drop entries whose files are missing
        #[arg(long)]
        fix: bool,
    },

    /// List model files no manifest references
    ModelsOrphans,

    /// Disk usage of models and LoRAs
    ModelsUsage,

    /// Show or clear cache directories
    CacheClear {
        /// Include non-selective cache targets
        #[arg(long)]
        all: bool,

        /// Actually delete cache contents
        #[arg(long)]
        apply: bool,
    },

    /// List declared scripts
    ScriptsList {
        /// Include size and description per script
        #[arg(long)]
        details: bool,
    },

    /// Reconcile the scripts manifest against the scripts directory
    ScriptsValidate,

    /// Add manifest entries for untracked scripts
    ScriptsSync {
        /// Only these files
        #[arg(long, num_args = 1..)]
        files: Vec<String>,

        /// Write the manifest
        #[arg(long)]
        apply: bool,
    },

    /// Validate, list and optionally sync in one pass
    ScriptsManage {
        /// Print history status as well
        #[arg(long)]
        status: bool,

        /// Add entries for untracked scripts and write them
        #[arg(long)]
        auto_sync: bool,
    },

    /// Fix filename case and sort manifest entries
    ScriptsNormalize {
        /// Leave filename case untouched
        #[arg(long)]
        no_fix_case: bool,

        /// Keep the current entry order
        #[arg(long)]
        no_sort: bool,

        /// Write the manifest
        #[arg(long)]
        apply: bool,
    },

    /// Restore the manifest from a previous revision
    ScriptsRollback {
        /// Revision id or unique prefix (defaults to the previous one)
        #[arg(long, value_name = "REV")]
        commit: Option<String>,

        /// Write the restored manifest
        #[arg(long)]
        apply: bool,
    },

    /// Show manifest changes
    ScriptsDiff {
        /// Revision to show instead of uncommitted changes
        #[arg(long, value_name = "REV")]
        commit: Option<String>,

        #[arg(long)]
        no_color: bool,
    },

    /// Show recent manifest revisions
    ScriptsHistory {
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Show uncommitted changes in the scripts directory
    ScriptsGitStatus,

    /// Write a summary of declared scripts
    ScriptsExport {
        /// Destination (defaults to the summary file in the scripts dir)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = ExportFormat::Text)]
        format: ExportFormat,
    },

    /// Show resolved paths, configuration and environment overrides
    Status,
}

fn dispatch(ctx: &KeeperContext, command: Command) -> Result<CommandReport> {
    match command {
        Command::ModelsCheck { fix } => {
            commands::models_check::run(ctx, &ModelsCheckOptions { fix })
        }
        Command::ModelsOrphans => commands::models_orphans::run(ctx),
        Command::ModelsUsage => commands::models_usage::run(ctx),
        Command::CacheClear { all, apply } => {
            commands::cache_clear::run(ctx, &CacheClearOptions { all, apply })
        }
        Command::ScriptsList { details } => {
            commands::scripts_list::run(ctx, &ScriptsListOptions { details })
        }
        Command::ScriptsValidate => commands::scripts_validate::run(ctx),
        Command::ScriptsSync { files, apply } => {
            commands::scripts_sync::run(ctx, &ScriptsSyncOptions { files, apply })
        }
        Command::ScriptsManage { status, auto_sync } => {
            commands::scripts_manage::run(ctx, &ScriptsManageOptions { status, auto_sync })
        }
        Command::ScriptsNormalize {
            no_fix_case,
            no_sort,
            apply,
        } => commands::scripts_normalize::run(
            ctx,
            &ScriptsNormalizeOptions {
                fix_case: !no_fix_case,
                sort: !no_sort,
                apply,
            },
        ),
        Command::ScriptsRollback { commit, apply } => {
            commands::scripts_rollback::run(ctx, &ScriptsRollbackOptions { commit, apply })
        }
        Command::ScriptsDiff { commit, no_color } => {
            commands::scripts_diff::run(ctx, &ScriptsDiffOptions { commit, no_color })
        }
        Command::ScriptsHistory { limit } => {
            commands::scripts_history::run(ctx, &ScriptsHistoryOptions { limit })
        }
        Command::ScriptsGitStatus => commands::scripts_git_status::run(ctx),
        Command::ScriptsExport { output, format } => {
            commands::scripts_export::run(ctx, &ScriptsExportOptions { output, format })
        }
        Command::Status => commands::status::run(ctx),
    }
}

/// Parse arguments, run the command and print its report. Returns whether
/// the report came back clean.
pub fn run() -> Result<bool> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let overrides = PathOverrides {
        container_dir: cli.container_dir,
        models_dir: cli.models_dir,
        scripts_dir: cli.scripts_dir,
    };
    let ctx = KeeperContext::load(&overrides)?;
    tracing::debug!(command = ?cli.command, "dispatching");

    let report = dispatch(&ctx, cli.command)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(report.ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn normalize_flags_parse() {
        let cli = Cli::parse_from(["dt-keeper", "scripts-normalize", "--no-sort", "--apply"]);
        assert_eq!(
            cli.command,
            Command::ScriptsNormalize {
                no_fix_case: false,
                no_sort: true,
                apply: true,
            }
        );
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::parse_from([
            "dt-keeper",
            "scripts-sync",
            "--files",
            "a.js",
            "b.js",
            "--json",
            "--scripts-dir",
            "/tmp/scripts",
        ]);
        assert!(cli.json);
        assert_eq!(cli.scripts_dir, Some(PathBuf::from("/tmp/scripts")));
        assert_eq!(
            cli.command,
            Command::ScriptsSync {
                files: vec!["a.js".to_string(), "b.js".to_string()],
                apply: false,
            }
        );
    }

    #[test]
    fn export_format_is_a_value_enum() {
        let cli = Cli::parse_from(["dt-keeper", "scripts-export", "--format", "json"]);
        assert_eq!(
            cli.command,
            Command::ScriptsExport {
                output: None,
                format: ExportFormat::Json,
            }
        );
    }
}
