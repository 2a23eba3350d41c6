//! `weir` -- command-line front end for the permit workflow.
//!
//! Drives the lifecycle engine against a JSON-file-persisted store: seed
//! demonstration data, draft and submit applications, record reviews,
//! advance batches, and make final decisions, with the comment history and
//! activity log along for inspection.

mod seed;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use weir_engine::{
    unread_counts, Actor, BatchReport, BulkCoordinator, LifecycleEngine, ReviewGate, ReviewInput,
    TransitionError,
};
use weir_storage::{
    next_application_code, MemoryStore, PermitApplication, PermitClass, PermitStore, Status,
    WaterSource,
};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Water-use permit workflow toolchain.
#[derive(Parser)]
#[command(name = "weir", version, about = "Water-use permit workflow toolchain")]
struct Cli {
    /// Path to the JSON store file
    #[arg(long, global = true, default_value = "weir-store.json")]
    store: PathBuf,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a store file populated with demonstration data
    Seed {
        /// Overwrite an existing store file
        #[arg(long)]
        force: bool,
    },

    /// Draft a new application (permitting officer)
    New {
        /// Acting user id
        #[arg(long)]
        user: String,
        /// Applicant name
        #[arg(long)]
        applicant: String,
        /// Permit class: urban, irrigation, or industrial
        #[arg(long)]
        class: String,
        /// Water source: ground_water or surface_water
        #[arg(long)]
        source: String,
        /// Requested allocation in ML per annum
        #[arg(long)]
        allocation: f64,
        /// Property size in hectares
        #[arg(long)]
        land: f64,
    },

    /// List applications: the full set, or a user's eligible set
    List {
        /// Restrict to the applications this user can currently act on
        #[arg(long)]
        user: Option<String>,
    },

    /// Submit one drafted application into the pipeline
    Submit {
        application: String,
        #[arg(long)]
        user: String,
    },

    /// Submit every drafted application
    SubmitAll {
        #[arg(long)]
        user: String,
    },

    /// Record a stage review
    Review {
        application: String,
        #[arg(long)]
        user: String,
        /// Review comment; mandatory (>= 20 characters) for the catchment
        /// manager, optional for the chairperson
        #[arg(long)]
        comment: Option<String>,
    },

    /// Advance every reviewed application at the user's stage
    AdvanceAll {
        #[arg(long)]
        user: String,
    },

    /// Approve an application at the final stage
    Approve {
        application: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        comment: Option<String>,
    },

    /// Reject an application at the final stage
    Reject {
        application: String,
        #[arg(long)]
        user: String,
        /// Rejection reason (mandatory)
        #[arg(long)]
        reason: String,
    },

    /// Show an application's comment history
    Comments { application: String },

    /// Show recent activity-log entries
    Log {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show unread message counts for a user
    Unread {
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(message) = run(cli).await {
        eprintln!("error: {}", message);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Seed { force } => {
            if cli.store.exists() && !force {
                return Err(format!(
                    "{} already exists (pass --force to overwrite)",
                    cli.store.display()
                ));
            }
            let store = MemoryStore::new();
            seed::seed(&store).await.map_err(|e| e.to_string())?;
            store.save(&cli.store).map_err(|e| e.to_string())?;
            println!("Seeded demonstration data into {}", cli.store.display());
            Ok(())
        }

        Commands::New {
            user,
            applicant,
            class,
            source,
            allocation,
            land,
        } => {
            let store = load_store(&cli.store)?;
            let actor = resolve_actor(&store, &user).await?;
            let applications = store.get_applications().await.map_err(|e| e.to_string())?;
            let year = time::OffsetDateTime::now_utc().year();
            let code = next_application_code(&applications, year);
            let now = weir_storage::now_iso8601();
            let application = PermitApplication {
                id: format!("app-{:04}", applications.len() + 1),
                code: code.clone(),
                applicant_name: applicant,
                permit_class: class.parse::<PermitClass>()?,
                water_source: source.parse::<WaterSource>()?,
                water_allocation_ml: allocation,
                land_size_ha: land,
                current_stage: 1,
                status: Status::Unsubmitted,
                created_at: now.clone(),
                updated_at: now,
                submitted_at: None,
                approved_at: None,
                rejected_at: None,
            };
            store
                .insert_application(application.clone())
                .await
                .map_err(|e| e.to_string())?;
            let recorder = weir_engine::AuditRecorder::new(Arc::new(store.clone()));
            recorder
                .record(
                    &actor,
                    "Created Application",
                    &format!("Drafted application {}", code),
                    Some(&application.id),
                )
                .await;
            store.save(&cli.store).map_err(|e| e.to_string())?;
            match cli.output {
                OutputFormat::Text => {
                    println!("Created {} ({})", application.code, application.id)
                }
                OutputFormat::Json => print_json(&application)?,
            }
            Ok(())
        }

        Commands::List { user } => {
            let store = load_store(&cli.store)?;
            match user {
                Some(user) => {
                    let actor = resolve_actor(&store, &user).await?;
                    let gate = gate_for(&store);
                    let eligible = gate
                        .eligible_applications(&actor)
                        .await
                        .map_err(|e| e.to_string())?;
                    match cli.output {
                        OutputFormat::Text => {
                            for item in &eligible {
                                println!(
                                    "{}  {}",
                                    format_application(&item.application),
                                    if item.already_reviewed { "[reviewed]" } else { "[pending]" }
                                );
                            }
                        }
                        OutputFormat::Json => {
                            let mut rows = Vec::new();
                            for item in &eligible {
                                rows.push(serde_json::json!({
                                    "application": serde_json::to_value(&item.application)
                                        .map_err(|e| e.to_string())?,
                                    "already_reviewed": item.already_reviewed,
                                }));
                            }
                            print_json(&rows)?;
                        }
                    }
                }
                None => {
                    let applications =
                        store.get_applications().await.map_err(|e| e.to_string())?;
                    match cli.output {
                        OutputFormat::Text => {
                            for application in &applications {
                                println!("{}", format_application(application));
                            }
                        }
                        OutputFormat::Json => print_json(&applications)?,
                    }
                }
            }
            Ok(())
        }

        Commands::Submit { application, user } => {
            let store = load_store(&cli.store)?;
            let actor = resolve_actor(&store, &user).await?;
            let updated = gate_for(&store)
                .submit(&actor, &application)
                .await
                .map_err(|e| e.to_string())?;
            store.save(&cli.store).map_err(|e| e.to_string())?;
            report_transition(&updated, cli.output)
        }

        Commands::SubmitAll { user } => {
            let store = load_store(&cli.store)?;
            let actor = resolve_actor(&store, &user).await?;
            let coordinator = BulkCoordinator::new(engine_for(&store));
            let report = coordinator
                .submit_all(&actor)
                .await
                .map_err(|e| format_transition_error(&e))?;
            store.save(&cli.store).map_err(|e| e.to_string())?;
            report_batch("Submitted", &report, cli.output)
        }

        Commands::Review {
            application,
            user,
            comment,
        } => {
            let store = load_store(&cli.store)?;
            let actor = resolve_actor(&store, &user).await?;
            let input = match comment {
                Some(text) => ReviewInput::with_comment(text),
                None => ReviewInput::acknowledged(),
            };
            let updated = gate_for(&store)
                .review(&actor, &application, input)
                .await
                .map_err(|e| e.to_string())?;
            store.save(&cli.store).map_err(|e| e.to_string())?;
            report_transition(&updated, cli.output)
        }

        Commands::AdvanceAll { user } => {
            let store = load_store(&cli.store)?;
            let actor = resolve_actor(&store, &user).await?;
            let coordinator = BulkCoordinator::new(engine_for(&store));
            let report = coordinator
                .advance_all(&actor)
                .await
                .map_err(|e| format_transition_error(&e))?;
            store.save(&cli.store).map_err(|e| e.to_string())?;
            report_batch("Advanced", &report, cli.output)
        }

        Commands::Approve {
            application,
            user,
            comment,
        } => {
            let store = load_store(&cli.store)?;
            let actor = resolve_actor(&store, &user).await?;
            let updated = gate_for(&store)
                .approve(&actor, &application, comment.as_deref())
                .await
                .map_err(|e| e.to_string())?;
            store.save(&cli.store).map_err(|e| e.to_string())?;
            report_transition(&updated, cli.output)
        }

        Commands::Reject {
            application,
            user,
            reason,
        } => {
            let store = load_store(&cli.store)?;
            let actor = resolve_actor(&store, &user).await?;
            let updated = gate_for(&store)
                .reject(&actor, &application, &reason)
                .await
                .map_err(|e| e.to_string())?;
            store.save(&cli.store).map_err(|e| e.to_string())?;
            report_transition(&updated, cli.output)
        }

        Commands::Comments { application } => {
            let store = load_store(&cli.store)?;
            let comments = store
                .get_comments_by_application(&application)
                .await
                .map_err(|e| e.to_string())?;
            match cli.output {
                OutputFormat::Text => {
                    for comment in &comments {
                        println!(
                            "[stage {}] {} ({}): {}",
                            comment.stage, comment.author_role, comment.action, comment.body
                        );
                    }
                }
                OutputFormat::Json => print_json(&comments)?,
            }
            Ok(())
        }

        Commands::Log { limit } => {
            let store = load_store(&cli.store)?;
            let logs = store.get_logs(limit).await.map_err(|e| e.to_string())?;
            match cli.output {
                OutputFormat::Text => {
                    for entry in &logs {
                        println!(
                            "{}  {} ({}): {}",
                            entry.recorded_at, entry.action, entry.actor_role, entry.details
                        );
                    }
                }
                OutputFormat::Json => print_json(&logs)?,
            }
            Ok(())
        }

        Commands::Unread { user } => {
            let store = load_store(&cli.store)?;
            resolve_actor(&store, &user).await?;
            let counts = unread_counts(&store, &user).await.map_err(|e| e.to_string())?;
            match cli.output {
                OutputFormat::Text => println!(
                    "unread: {} broadcast, {} direct",
                    counts.broadcast, counts.direct
                ),
                OutputFormat::Json => print_json(&serde_json::json!({
                    "broadcast": counts.broadcast,
                    "direct": counts.direct,
                }))?,
            }
            Ok(())
        }
    }
}

fn load_store(path: &Path) -> Result<MemoryStore, String> {
    if !path.exists() {
        return Err(format!(
            "store file {} not found (run `weir seed` first)",
            path.display()
        ));
    }
    MemoryStore::load(path).map_err(|e| e.to_string())
}

async fn resolve_actor(store: &MemoryStore, user_id: &str) -> Result<Actor, String> {
    let user = store.get_user(user_id).await.map_err(|e| e.to_string())?;
    Ok(Actor::new(user.id, user.role))
}

fn engine_for(store: &MemoryStore) -> LifecycleEngine<MemoryStore> {
    LifecycleEngine::new(Arc::new(store.clone()))
}

fn gate_for(store: &MemoryStore) -> ReviewGate<MemoryStore> {
    ReviewGate::new(engine_for(store))
}

fn format_application(application: &PermitApplication) -> String {
    format!(
        "{:<12} {:<24} stage {}  {:<12} {:>7.1} ML",
        application.code,
        application.applicant_name,
        application.current_stage,
        application.status.to_string(),
        application.water_allocation_ml,
    )
}

/// Batch refusals carry the blocking list; surface it rather than just a
/// count.
fn format_transition_error(error: &TransitionError) -> String {
    match error {
        TransitionError::IncompleteReview { pending } => {
            format!("{}:\n  {}", error, pending.join("\n  "))
        }
        other => other.to_string(),
    }
}

fn report_transition(application: &PermitApplication, output: OutputFormat) -> Result<(), String> {
    match output {
        OutputFormat::Text => {
            println!(
                "{} is now at stage {} ({})",
                application.code, application.current_stage, application.status
            );
            if application.permit_ready() {
                println!("Permit is ready for printing.");
            }
            if application.rejection_notice_ready() {
                println!("Rejection notice is ready for printing.");
            }
            Ok(())
        }
        OutputFormat::Json => print_json(application),
    }
}

fn report_batch(verb: &str, report: &BatchReport, output: OutputFormat) -> Result<(), String> {
    match output {
        OutputFormat::Text => {
            println!("{} {} application(s)", verb, report.applied.len());
            for id in &report.applied {
                println!("  {}", id);
            }
            if let Some(halt) = &report.halted {
                println!(
                    "Stopped at {}: {}",
                    halt.application_id,
                    format_transition_error(&halt.error)
                );
                for id in &halt.not_attempted {
                    println!("  not attempted: {}", id);
                }
            }
            Ok(())
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "applied": report.applied,
            "halted": report.halted.as_ref().map(|halt| serde_json::json!({
                "application_id": halt.application_id,
                "error": halt.error.to_string(),
                "not_attempted": halt.not_attempted,
            })),
        })),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", rendered);
    Ok(())
}
