//! CLI surface for molt.
//!
//! Thin handlers over the [`Migrator`] facade: every subcommand loads or
//! writes its JSON artifact (manifest, plan, result) and defers the
//! actual work to the kernel.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::Result;
use crate::config;
use crate::migrator::Migrator;
use crate::quarantine::QuarantineStore;

mod commands;
mod render;

// =============================================================================
// Entry + global options
// =============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "molt",
    version,
    about = "Lossless schema migration for versioned JSON documents",
    infer_subcommands = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Machine-readable JSON output.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Errors only.
    #[arg(short = 'q', long, global = true, default_value_t = false)]
    pub quiet: bool,

    /// Debug output (repeat for more).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan an upgrade of all discovered documents to the latest
    /// registered versions.
    PlanUpgrade(PlanUpgradeArgs),

    /// Plan a rollback of all discovered documents to one explicit
    /// schema version.
    PlanRollback(PlanRollbackArgs),

    /// Execute a previously generated plan.
    Migrate(MigrateArgs),

    /// Build a fresh plan over exactly the failed items of a previous
    /// result.
    Retry(RetryArgs),

    /// Remove obsolete snapshots of the discovered documents.
    Gc(GcArgs),

    /// Roll back an interrupted transaction.
    Resume(ResumeArgs),
}

#[derive(Args, Debug)]
pub struct PlanUpgradeArgs {
    /// Manifest naming the documents to plan over.
    #[arg(long, value_name = "PATH", default_value = "molt-manifest.json")]
    pub manifest: PathBuf,

    /// Where to write the plan.
    #[arg(long, value_name = "PATH", default_value = "migration-plan.json")]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct PlanRollbackArgs {
    /// Schema version to roll back to.
    #[arg(long, value_name = "VERSION")]
    pub target_version: String,

    /// Manifest naming the documents to plan over.
    #[arg(long, value_name = "PATH", default_value = "molt-manifest.json")]
    pub manifest: PathBuf,

    /// Where to write the plan.
    #[arg(long, value_name = "PATH", default_value = "migration-plan.json")]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Plan file to execute.
    #[arg(long, value_name = "PATH")]
    pub plan: PathBuf,

    /// Transaction storage directory; enables resumable execution.
    #[arg(long, value_name = "PATH")]
    pub transactions: Option<PathBuf>,

    /// Where to write the result.
    #[arg(long, value_name = "PATH", default_value = "migration-result.json")]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct RetryArgs {
    /// Result file of the previous run.
    #[arg(long, value_name = "PATH")]
    pub result: PathBuf,

    /// Where to write the fresh plan.
    #[arg(long, value_name = "PATH", default_value = "migration-plan.json")]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct GcArgs {
    /// Manifest naming the documents to collect over.
    #[arg(long, value_name = "PATH", default_value = "molt-manifest.json")]
    pub manifest: PathBuf,
}

#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// Transaction storage directory holding the interrupted journal.
    #[arg(long, value_name = "PATH")]
    pub transactions: PathBuf,

    /// Where to write the rollback result.
    #[arg(long, value_name = "PATH", default_value = "migration-result.json")]
    pub out: PathBuf,
}

pub fn parse_from<I, T>(args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::parse_from(args)
}

pub(crate) struct Ctx {
    pub migrator: Migrator,
    pub json: bool,
    pub quiet: bool,
    pub transactions_dir: Option<PathBuf>,
}

pub fn run(cli: Cli) -> Result<()> {
    let config = config::load_or_default();
    let registry = crate::schemas::registry()?;
    let migrator = Migrator::new(registry, QuarantineStore::new(config.quarantine_dir.clone()));
    let ctx = Ctx {
        migrator,
        json: cli.json,
        quiet: cli.quiet,
        transactions_dir: config.transactions_dir,
    };

    match cli.command {
        Commands::PlanUpgrade(args) => commands::plan_upgrade::handle(&ctx, args),
        Commands::PlanRollback(args) => commands::plan_rollback::handle(&ctx, args),
        Commands::Migrate(args) => commands::migrate::handle(&ctx, args),
        Commands::Retry(args) => commands::retry::handle(&ctx, args),
        Commands::Gc(args) => commands::gc::handle(&ctx, args),
        Commands::Resume(args) => commands::resume::handle(&ctx, args),
    }
}
