//! `compdup` command-line entry point.
//!
//! # Responsibility
//! - Open the project store and dispatch one subcommand against it.
//! - Keep output machine-readable: JSON on stdout, diagnostics in logs.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use compdup_core::{
    default_log_level, import_snapshot, init_logging, init_stderr_logging, load_snapshot,
    open_db, write_manifest, DuplicateService, DuplicationConfig, MemoScope, ProjectService,
    SqliteProjectRepository,
};
use log::info;
use std::path::{Path, PathBuf};

/// Recursive project-item duplication over a SQLite project store.
#[derive(Parser, Debug)]
#[command(name = "compdup")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Project store (SQLite file, created when missing)
    #[arg(long, global = true, default_value = "project.db")]
    db: PathBuf,

    /// Directory for rolling log files; logs go to stderr when omitted
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import a project snapshot (folders, items, layers) from JSON
    Import {
        /// Snapshot file
        snapshot: PathBuf,
    },

    /// Duplicate every item of a source folder into a target folder
    Duplicate {
        /// JSON config file; flags below override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Source folder name
        #[arg(long)]
        source: Option<String>,

        /// Target folder name (created when missing)
        #[arg(long)]
        target: Option<String>,

        /// Parent folder for a newly created target
        #[arg(long)]
        parent: Option<String>,

        /// Where an existing duplicate must live to be reused
        #[arg(long, value_enum)]
        scope: Option<ScopeArg>,

        /// Manifest output path
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// List direct children of every folder with this name
    Search {
        /// Folder name (`Root` lists root-level items)
        folder: String,
    },

    /// List every item in the project with its folder
    Map,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScopeArg {
    Project,
    Destination,
}

impl From<ScopeArg> for MemoScope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Project => MemoScope::Project,
            ScopeArg::Destination => MemoScope::Destination,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_cli_logging(&cli)?;
    info!(
        "event=cli_start module=cli status=ok version={}",
        env!("CARGO_PKG_VERSION")
    );

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open project store `{}`", cli.db.display()))?;
    let repo = SqliteProjectRepository::try_new(&conn).context("project store is not ready")?;

    match cli.command {
        Commands::Import { snapshot } => {
            let parsed = load_snapshot(&snapshot)?;
            let service = ProjectService::new(repo);
            let summary = import_snapshot(&service, &parsed)
                .with_context(|| format!("failed to import `{}`", snapshot.display()))?;
            println!(
                "imported folders={} items={} layers={}",
                summary.folders, summary.items, summary.layers
            );
        }
        Commands::Duplicate {
            config,
            source,
            target,
            parent,
            scope,
            manifest,
        } => {
            let config = build_config(config.as_deref(), source, target, parent, scope, manifest)?;
            let manifest_path = config.manifest_path(".");
            let run = DuplicateService::new(repo)
                .run(&config)
                .context("duplication failed")?;
            write_manifest(&manifest_path, &run.manifest)?;
            println!("{}", serde_json::to_string_pretty(&run.manifest)?);
            info!(
                "event=manifest_write module=cli status=ok path={} entries={}",
                manifest_path.display(),
                run.manifest.len()
            );
        }
        Commands::Search { folder } => {
            let items = ProjectService::new(repo).search_folder_items(&folder)?;
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        Commands::Map => {
            let items = ProjectService::new(repo).project_map()?;
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
    }
    Ok(())
}

fn init_cli_logging(cli: &Cli) -> Result<()> {
    let level = cli.log_level.as_deref().unwrap_or_else(|| default_log_level());
    let result = match &cli.log_dir {
        Some(dir) => {
            let dir = std::path::absolute(dir)
                .with_context(|| format!("invalid log dir `{}`", dir.display()))?;
            init_logging(level, &dir.to_string_lossy())
        }
        None => init_stderr_logging(level),
    };
    result.map_err(anyhow::Error::msg)
}

fn build_config(
    path: Option<&Path>,
    source: Option<String>,
    target: Option<String>,
    parent: Option<String>,
    scope: Option<ScopeArg>,
    manifest: Option<PathBuf>,
) -> Result<DuplicationConfig> {
    let mut config = match path {
        Some(path) => DuplicationConfig::from_file(path)?,
        None => match (&source, &target) {
            (Some(source), Some(target)) => DuplicationConfig::new(source, target),
            _ => bail!("either --config or both --source and --target are required"),
        },
    };

    if let Some(source) = source {
        config.source_folder_name = source;
    }
    if let Some(target) = target {
        config.target_folder_name = target;
    }
    if let Some(parent) = parent {
        config.parent_folder = parent;
    }
    if let Some(scope) = scope {
        config.memo_scope = scope.into();
    }
    if manifest.is_some() {
        config.manifest_file = manifest;
    }
    Ok(config.validated()?)
}
