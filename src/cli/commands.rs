//! CLI commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::core::{RunError, RunOutcome, Workbench};
use crate::db::{Database, Project};
use crate::reconcile::ReconcileError;
use crate::session::SessionStatus;

#[derive(Parser)]
#[command(name = "sitecraft")]
#[command(about = "Prompt-driven website generation with live preview and version history", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.sitecraft/config.yml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Database path, overriding the config file
    #[arg(long, global = true)]
    database: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all projects
    Projects,

    /// Create a new project
    CreateProject {
        /// Project name
        name: String,

        /// Workspace ID (a new one is minted when omitted)
        #[arg(long)]
        workspace: Option<String>,

        /// Project description
        #[arg(long)]
        description: Option<String>,
    },

    /// Run a prompt against a project
    Generate {
        /// Project ID
        #[arg(long)]
        project: String,

        /// What to build or change
        prompt: String,

        /// Write the final preview document here
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List a project's saved files
    Files {
        /// Project ID
        #[arg(long)]
        project: String,
    },

    /// List a project's versions
    Versions {
        /// Project ID
        #[arg(long)]
        project: String,
    },

    /// Restore a project to an earlier version
    Restore {
        /// Project ID
        #[arg(long)]
        project: String,

        /// Version number
        #[arg(long)]
        version: i64,

        /// Skip the safety snapshot of the current files
        #[arg(long)]
        no_backup: bool,
    },

    /// Compile the project's preview document
    Preview {
        /// Project ID
        #[arg(long)]
        project: String,

        /// Route to render
        #[arg(long)]
        route: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List a project's generation sessions
    Sessions {
        /// Project ID
        #[arg(long)]
        project: String,

        /// Filter by status
        #[arg(long)]
        status: Option<String>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let db_path = match cli.database {
        Some(path) => PathBuf::from(path),
        None => config.resolve_db_path()?,
    };

    // Initialize database
    let db = Database::new(&db_path)?;

    // Create a multi-threaded runtime for CLI operations
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let bench = Workbench::from_config(db, &config);

        match cli.command {
        Commands::Projects => {
            let projects = bench.projects.list().await?;

            if projects.is_empty() {
                println!("No projects found");
            } else {
                for project in projects {
                    println!(
                        "[{}] {} - {} (workspace {})",
                        short_id(&project.id),
                        project.name,
                        project.description.as_deref().unwrap_or("-"),
                        short_id(&project.workspace_id)
                    );
                }
            }
            Ok(())
        }

        Commands::CreateProject { name, workspace, description } => {
            let project = bench.projects.create(name, workspace, description).await?;

            println!("Created project: {} ({})", project.name, project.id);
            Ok(())
        }

        Commands::Generate { project, prompt, out } => {
            let project = bench.open_project(&project).await?;
            generate(&bench, &project, &prompt, config.api_token(), out).await
        }

        Commands::Files { project } => {
            bench.open_project(&project).await?;
            let paths = bench.store.paths();

            if paths.is_empty() {
                println!("No files saved");
            } else {
                for path in paths {
                    println!("{}", path);
                }
            }
            Ok(())
        }

        Commands::Versions { project } => {
            let versions = bench.reconciler.versions().list(&project).await?;

            if versions.is_empty() {
                println!("No versions found");
            } else {
                for version in versions {
                    println!(
                        "v{} - {} files - {} - {}",
                        version.version_number,
                        version.file_count,
                        version.created_at.format("%Y-%m-%d %H:%M:%S"),
                        version.label.as_deref().unwrap_or("-")
                    );
                }
            }
            Ok(())
        }

        Commands::Restore { project, version, no_backup } => {
            let project = bench.open_project(&project).await?;

            match bench.restore(&project, version, !no_backup).await {
                Ok(report) => {
                    println!("Restored v{} ({} files)", report.version_number, report.file_count);
                    if let Some(backup) = report.backup {
                        println!("Previous files saved as v{}", backup);
                    }
                    Ok(())
                }
                Err(e @ ReconcileError::VersionNotFound { .. }) => Err(e.into()),
                Err(e) => Err(anyhow::Error::new(e).context("Restore failed; live files were left unchanged")),
            }
        }

        Commands::Preview { project, route, out } => {
            bench.open_project(&project).await?;
            let route = route.unwrap_or_else(|| config.preview.default_route.clone());
            let html = bench.preview(&route);
            emit(&html, out)
        }

        Commands::Sessions { project, status } => {
            let status = status.map(|s| SessionStatus::from_str(&s)).transpose()?;

            let sessions = bench.sessions.list(&project, status).await?;

            if sessions.is_empty() {
                println!("No sessions found");
            } else {
                for session in sessions {
                    println!(
                        "[{}] {} - {} files - {} - {}",
                        short_id(&session.id),
                        session.status.as_str(),
                        session.files_generated,
                        session.started_at.format("%Y-%m-%d %H:%M:%S"),
                        session.error.as_deref().unwrap_or(&session.prompt)
                    );
                }
            }
            Ok(())
        }
        }
    })
}

async fn generate(
    bench: &Workbench,
    project: &Project,
    prompt: &str,
    credential: Option<String>,
    out: Option<PathBuf>,
) -> Result<()> {
    let mut phases = bench.controller.subscribe();
    let progress = tokio::spawn(async move {
        while phases.changed().await.is_ok() {
            let phase = phases.borrow_and_update().clone();
            eprintln!("[{:>3}%] {}", phase.progress, phase.message);
        }
    });

    let controller = bench.controller.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            controller.cancel();
        }
    });

    let result = bench
        .run_generation(project, prompt, credential.as_deref())
        .await;
    interrupt.abort();
    progress.abort();

    let report = match result {
        Ok(report) => report,
        Err(RunError::Generation(e)) => {
            eprintln!("{}", e.guidance());
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    match report.outcome {
        RunOutcome::Cancelled => {
            println!("Generation cancelled");
            Ok(())
        }
        RunOutcome::Completed { generation, saved, version } => {
            if let Some(message) = &generation.summary.ai_message {
                println!("{}", message);
            }
            for path in &generation.delta.written {
                println!("  wrote   {}", path);
            }
            for path in &generation.delta.deleted {
                println!("  deleted {}", path);
            }
            println!(
                "Saved {} new, {} updated, {} unchanged",
                saved.saved.inserted, saved.saved.updated, saved.saved.unchanged
            );
            if let Some(version) = version {
                println!("Version v{}", version.version_number);
            }
            if generation.synthesized {
                eprintln!("warning: stream ended early; results may be incomplete");
            }
            for suggestion in &generation.summary.suggestions {
                println!("  next: {}", suggestion);
            }
            match out {
                Some(path) => emit(&generation.preview_html, Some(path)),
                None => Ok(()),
            }
        }
    }
}

fn emit(html: &str, out: Option<PathBuf>) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(&path, html)
                .with_context(|| format!("Failed to write preview to {:?}", path))?;
            println!("Preview written to {}", path.display());
        }
        None => println!("{}", html),
    }
    Ok(())
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}
