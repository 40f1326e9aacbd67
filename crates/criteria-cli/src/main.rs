//! Criteria Studio CLI
//!
//! The `criteria` command authors, lints, publishes and audits
//! healthcare-audit problem statements.
//!
//! ## Commands
//!
//! - `criterion`: create, show, list and update criteria
//! - `lint`: run the policy checklist against a stored criterion or a file
//! - `publish` / `rollback` / `deprecate` / `history`: the version lifecycle
//! - `issue`: report and close issues against a criterion
//! - `regenerate` / `runs` / `run`: generator-assisted candidates and their audit trail
//! - `statement`: the standalone statement library

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use criteria_core::{
    CriteriaService, CriteriaStore, CriterionPatch, IssueService, LifecycleService, LintVerdict,
    NewCriterion, NewIssue, NewStatement, PublishOutcome, PublishRequest, RegenerationService,
    RollbackRequest, StatementLibrary, StatementPatch,
};
use criteria_doc::ProblemStatement;
use criteria_regen::{Generator, OpenAiGenerator, RegenerateRequest, RegenerationMode};
use criteria_state::{AiRunLedger, CriterionStatus, IssueType, SurrealCriteriaStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "criteria")]
#[command(author = "Criteria Studio Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Author, lint and version healthcare-audit problem statements", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Name recorded as author, publisher or reporter
    #[arg(long, global = true, env = "CRITERIA_USER", default_value = "cli")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage criteria
    Criterion {
        #[command(subcommand)]
        action: CriterionAction,
    },

    /// Lint a stored criterion, or a document file with --file
    Lint {
        /// Criterion ID
        #[arg(required_unless_present = "file")]
        criterion_id: Option<String>,

        /// Problem statement JSON file to lint instead
        #[arg(short, long, conflicts_with = "criterion_id")]
        file: Option<PathBuf>,
    },

    /// Publish the current document as a new version
    Publish {
        /// Criterion ID
        criterion_id: String,

        /// Why this version exists
        #[arg(short, long)]
        reason: String,

        /// Publish even when lint fails
        #[arg(long)]
        override_lint: bool,
    },

    /// Restore the most recent snapshot that differs from the current document
    Rollback {
        /// Criterion ID
        criterion_id: String,

        /// Why the rollback is needed
        #[arg(short, long)]
        reason: String,
    },

    /// Retire a criterion (terminal)
    Deprecate {
        /// Criterion ID
        criterion_id: String,

        /// Why the criterion is retired
        #[arg(short, long)]
        reason: String,
    },

    /// Show published snapshots (newest first)
    History {
        /// Criterion ID
        criterion_id: String,
    },

    /// Manage issues
    Issue {
        #[command(subcommand)]
        action: IssueAction,
    },

    /// Ask the configured generator for a candidate document
    Regenerate {
        /// Criterion ID
        criterion_id: String,

        /// targeted | full
        #[arg(short, long, default_value = "targeted")]
        mode: RegenerationMode,

        /// Free-form guidance for the generator
        #[arg(short, long, default_value = "")]
        notes: String,

        /// Skip open issues when building the request
        #[arg(long)]
        no_issues: bool,

        /// Write the candidate document to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List regeneration audit records for a criterion (newest first)
    Runs {
        /// Criterion ID
        criterion_id: String,
    },

    /// Show one regeneration audit record
    Run {
        /// Run ID
        run_id: Uuid,
    },

    /// Manage the standalone statement library
    Statement {
        #[command(subcommand)]
        action: StatementAction,
    },
}

#[derive(Subcommand)]
enum CriterionAction {
    /// Create a draft criterion from a problem statement file
    Create {
        /// Criterion ID (e.g. SEPSIS-2024-001)
        criterion_id: String,

        /// Title
        #[arg(short, long)]
        title: String,

        /// Problem statement JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Linked policy ID
        #[arg(long)]
        policy: Option<String>,

        /// Linked criterion IDs
        #[arg(long = "link")]
        links: Vec<String>,
    },

    /// Show a criterion as JSON
    Show {
        /// Criterion ID
        criterion_id: String,
    },

    /// List criteria (most recently updated first)
    List {
        /// draft | published | deprecated
        #[arg(short, long)]
        status: Option<CriterionStatus>,
    },

    /// Edit the working copy of a criterion
    Update {
        /// Criterion ID
        criterion_id: String,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// Replacement problem statement JSON file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// New linked policy ID
        #[arg(long)]
        policy: Option<String>,
    },
}

#[derive(Subcommand)]
enum IssueAction {
    /// Report an issue against a criterion
    Add {
        /// Criterion ID
        criterion_id: String,

        /// Issue type label or slug (e.g. "exclusions")
        #[arg(short = 't', long = "type")]
        issue_type: IssueType,

        /// Notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Proposed fix
        #[arg(long)]
        fix: Option<String>,
    },

    /// List issues for a criterion (oldest first)
    List {
        /// Criterion ID
        criterion_id: String,
    },

    /// Mark an open issue resolved
    Resolve {
        /// Issue ID
        issue_id: Uuid,
    },

    /// Dismiss an open issue
    Dismiss {
        /// Issue ID
        issue_id: Uuid,
    },
}

#[derive(Subcommand)]
enum StatementAction {
    /// Save a problem statement to the library
    Create {
        /// Criterion ID the statement was written for
        criterion_id: String,

        /// Problem statement JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Original free-text input
        #[arg(long, default_value = "")]
        input: String,

        /// Additional context
        #[arg(long)]
        context: Option<String>,

        /// Tags
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Show a statement as JSON
    Show {
        /// Statement ID
        id: Uuid,
    },

    /// List statements saved for a criterion (newest first)
    List {
        /// Criterion ID
        criterion_id: String,
    },

    /// Update a saved statement
    Update {
        /// Statement ID
        id: Uuid,

        /// Replacement problem statement JSON file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Replacement additional context
        #[arg(long)]
        context: Option<String>,

        /// Replacement tags
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
    },

    /// Delete a statement
    Delete {
        /// Statement ID
        id: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    criteria_core::init_tracing(cli.json, level);

    // `lint --file` needs no database
    if let Commands::Lint {
        file: Some(path), ..
    } = &cli.command
    {
        return cmd_lint_file(path);
    }

    let store = Arc::new(
        SurrealCriteriaStore::from_env()
            .await
            .context("Failed to connect to criteria database")?,
    );
    let user = cli.user.as_str();

    match cli.command {
        Commands::Criterion { action } => match action {
            CriterionAction::Create {
                criterion_id,
                title,
                file,
                policy,
                links,
            } => cmd_criterion_create(&store, &criterion_id, &title, &file, policy, links, user).await,
            CriterionAction::Show { criterion_id } => {
                cmd_criterion_show(&store, &criterion_id).await
            }
            CriterionAction::List { status } => cmd_criterion_list(&store, status).await,
            CriterionAction::Update {
                criterion_id,
                title,
                file,
                policy,
            } => {
                cmd_criterion_update(&store, &criterion_id, title, file.as_deref(), policy, user)
                    .await
            }
        },
        Commands::Lint { criterion_id, .. } => {
            let criterion_id = criterion_id.context("criterion ID or --file is required")?;
            cmd_lint(&store, &criterion_id).await
        }
        Commands::Publish {
            criterion_id,
            reason,
            override_lint,
        } => cmd_publish(&store, &criterion_id, &reason, override_lint, user).await,
        Commands::Rollback {
            criterion_id,
            reason,
        } => cmd_rollback(&store, &criterion_id, &reason, user).await,
        Commands::Deprecate {
            criterion_id,
            reason,
        } => cmd_deprecate(&store, &criterion_id, &reason).await,
        Commands::History { criterion_id } => cmd_history(&store, &criterion_id).await,
        Commands::Issue { action } => match action {
            IssueAction::Add {
                criterion_id,
                issue_type,
                notes,
                fix,
            } => cmd_issue_add(&store, &criterion_id, issue_type, notes, fix, user).await,
            IssueAction::List { criterion_id } => cmd_issue_list(&store, &criterion_id).await,
            IssueAction::Resolve { issue_id } => {
                cmd_issue_close(&store, &issue_id, IssueClose::Resolve, user).await
            }
            IssueAction::Dismiss { issue_id } => {
                cmd_issue_close(&store, &issue_id, IssueClose::Dismiss, user).await
            }
        },
        Commands::Regenerate {
            criterion_id,
            mode,
            notes,
            no_issues,
            output,
        } => {
            let generator: Arc<dyn Generator> = Arc::new(
                OpenAiGenerator::from_env().context("Failed to configure generator")?,
            );
            let options = RegenerateOptions {
                mode,
                notes,
                include_issues: !no_issues,
                output,
            };
            cmd_regenerate(&store, generator, &criterion_id, options, user).await
        }
        Commands::Runs { criterion_id } => cmd_runs(&store, &criterion_id).await,
        Commands::Run { run_id } => cmd_run_show(&store, &run_id).await,
        Commands::Statement { action } => match action {
            StatementAction::Create {
                criterion_id,
                file,
                input,
                context,
                tags,
            } => cmd_statement_create(&store, &criterion_id, &file, input, context, tags).await,
            StatementAction::Show { id } => cmd_statement_show(&store, &id).await,
            StatementAction::List { criterion_id } => {
                cmd_statement_list(&store, &criterion_id).await
            }
            StatementAction::Update {
                id,
                file,
                context,
                tags,
            } => cmd_statement_update(&store, &id, file.as_deref(), context, tags).await,
            StatementAction::Delete { id } => cmd_statement_delete(&store, &id).await,
        },
    }
}

// ========== Helpers ==========

fn read_json_file(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read problem statement file: {:?}", path))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Problem statement file is not valid JSON: {:?}", path))
}

/// Parse and schema-check a document for any write path.
fn read_document(path: &Path) -> Result<ProblemStatement> {
    ProblemStatement::from_json(read_json_file(path)?)
        .with_context(|| format!("Problem statement failed schema validation: {:?}", path))
}

/// Parse a document's shape only. Lint reports on content the schema would reject.
fn read_draft(path: &Path) -> Result<ProblemStatement> {
    serde_json::from_value(read_json_file(path)?)
        .with_context(|| format!("Problem statement has the wrong shape: {:?}", path))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_verdict(verdict: &LintVerdict) {
    println!("Lint: {}", if verdict.passed { "PASS" } else { "FAIL" });
    for finding in &verdict.failures {
        println!("  FAIL {:<24} {}", finding.rule.id(), finding.message);
    }
    for finding in &verdict.warnings {
        println!("  WARN {:<24} {}", finding.rule.id(), finding.message);
    }
}

// ========== Criterion Commands ==========

async fn cmd_criterion_create<S: CriteriaStore>(
    store: &Arc<S>,
    criterion_id: &str,
    title: &str,
    file: &Path,
    linked_policy_id: Option<String>,
    linked_criteria_ids: Vec<String>,
    author: &str,
) -> Result<()> {
    let problem_statement = read_document(file)?;
    let service = CriteriaService::new(store.clone());
    let record = service
        .create(NewCriterion {
            criterion_id: criterion_id.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            problem_statement,
            linked_policy_id,
            linked_criteria_ids,
        })
        .await
        .context("create failed")?;

    info!(criterion_id = %record.criterion_id, "criterion created");
    println!(
        "Created {} v{} ({})",
        record.criterion_id, record.version_number, record.status
    );
    Ok(())
}

async fn cmd_criterion_show<S: CriteriaStore>(store: &Arc<S>, criterion_id: &str) -> Result<()> {
    let record = CriteriaService::new(store.clone()).get(criterion_id).await?;
    print_json(&record)
}

async fn cmd_criterion_list<S: CriteriaStore>(
    store: &Arc<S>,
    status: Option<CriterionStatus>,
) -> Result<()> {
    let records = CriteriaService::new(store.clone()).list(status).await?;
    if records.is_empty() {
        println!("No criteria found");
        return Ok(());
    }
    for record in records {
        println!(
            "{:<24} v{:<4} {:<10} {}",
            record.criterion_id, record.version_number, record.status, record.title
        );
    }
    Ok(())
}

async fn cmd_criterion_update<S: CriteriaStore>(
    store: &Arc<S>,
    criterion_id: &str,
    title: Option<String>,
    file: Option<&Path>,
    linked_policy_id: Option<String>,
    author: &str,
) -> Result<()> {
    let problem_statement = file.map(read_document).transpose()?;
    let patch = CriterionPatch {
        title,
        problem_statement,
        linked_policy_id,
        linked_criteria_ids: None,
        author: None,
    };
    if patch.is_empty() {
        anyhow::bail!("Nothing to update: pass --title, --file or --policy");
    }
    let patch = CriterionPatch {
        author: Some(author.to_string()),
        ..patch
    };

    let record = CriteriaService::new(store.clone())
        .update(criterion_id, patch)
        .await
        .context("update failed")?;
    println!(
        "Updated {} (working copy of v{})",
        record.criterion_id, record.version_number
    );
    Ok(())
}

fn lint_file(path: &Path) -> Result<LintVerdict> {
    Ok(criteria_core::lint(&read_draft(path)?))
}

fn cmd_lint_file(path: &Path) -> Result<()> {
    let verdict = lint_file(path)?;
    print_verdict(&verdict);
    if !verdict.passed {
        anyhow::bail!("{} lint failure(s)", verdict.failures.len());
    }
    Ok(())
}

async fn cmd_lint<S: CriteriaStore>(store: &Arc<S>, criterion_id: &str) -> Result<()> {
    let verdict = CriteriaService::new(store.clone()).lint(criterion_id).await?;
    print_verdict(&verdict);
    Ok(())
}

// ========== Lifecycle Commands ==========

async fn cmd_publish<S: CriteriaStore>(
    store: &Arc<S>,
    criterion_id: &str,
    reason: &str,
    override_lint: bool,
    published_by: &str,
) -> Result<()> {
    let outcome = LifecycleService::new(store.clone())
        .publish(
            criterion_id,
            PublishRequest {
                change_reason: reason.to_string(),
                override_lint,
                published_by: published_by.to_string(),
            },
        )
        .await
        .context("publish failed")?;

    print_verdict(outcome.lint_result());
    match outcome {
        PublishOutcome::Published { criterion, .. } => {
            println!(
                "Published {} v{}",
                criterion.criterion_id, criterion.version_number
            );
            Ok(())
        }
        PublishOutcome::Rejected { lint_result } => anyhow::bail!(
            "Publish rejected: {} lint failure(s); fix them or pass --override-lint",
            lint_result.failures.len()
        ),
    }
}

async fn cmd_rollback<S: CriteriaStore>(
    store: &Arc<S>,
    criterion_id: &str,
    reason: &str,
    rolled_back_by: &str,
) -> Result<()> {
    let outcome = LifecycleService::new(store.clone())
        .rollback(
            criterion_id,
            RollbackRequest {
                change_reason: reason.to_string(),
                rolled_back_by: rolled_back_by.to_string(),
            },
        )
        .await
        .context("rollback failed")?;
    println!(
        "Rolled back {} to content of v{} (now v{})",
        outcome.criterion.criterion_id,
        outcome.restored_from_version,
        outcome.criterion.version_number
    );
    Ok(())
}

async fn cmd_deprecate<S: CriteriaStore>(
    store: &Arc<S>,
    criterion_id: &str,
    reason: &str,
) -> Result<()> {
    let record = LifecycleService::new(store.clone())
        .deprecate(criterion_id, reason)
        .await
        .context("deprecate failed")?;
    println!(
        "Deprecated {} at v{}",
        record.criterion_id, record.version_number
    );
    Ok(())
}

async fn cmd_history<S: CriteriaStore>(store: &Arc<S>, criterion_id: &str) -> Result<()> {
    let history = LifecycleService::new(store.clone())
        .history(criterion_id)
        .await?;
    if history.is_empty() {
        println!("No published versions for {}", criterion_id);
        return Ok(());
    }
    for snapshot in history {
        let restored = snapshot
            .restored_from_version
            .map(|v| format!(" (restored v{})", v))
            .unwrap_or_default();
        println!(
            "v{:<4} {} {} {} {}{}",
            snapshot.version_number,
            snapshot.created_at.to_rfc3339(),
            snapshot.document_digest.short(),
            snapshot.published_by,
            snapshot.change_reason,
            restored
        );
    }
    Ok(())
}

// ========== Issue Commands ==========

#[derive(Debug, Clone, Copy)]
enum IssueClose {
    Resolve,
    Dismiss,
}

async fn cmd_issue_add<S: CriteriaStore>(
    store: &Arc<S>,
    criterion_id: &str,
    issue_type: IssueType,
    notes: Option<String>,
    proposed_fix: Option<String>,
    created_by: &str,
) -> Result<()> {
    let issue = IssueService::new(store.clone())
        .report(
            criterion_id,
            NewIssue {
                issue_type,
                notes,
                proposed_fix,
                created_by: created_by.to_string(),
            },
        )
        .await
        .context("issue report failed")?;
    println!("Reported issue {} ({})", issue.issue_id, issue.issue_type);
    Ok(())
}

async fn cmd_issue_list<S: CriteriaStore>(store: &Arc<S>, criterion_id: &str) -> Result<()> {
    let issues = IssueService::new(store.clone()).list(criterion_id).await?;
    if issues.is_empty() {
        println!("No issues for {}", criterion_id);
        return Ok(());
    }
    for issue in issues {
        println!(
            "{} {:<10} {} {}",
            issue.issue_id,
            format!("{:?}", issue.status),
            issue.issue_type,
            issue.notes.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn cmd_issue_close<S: CriteriaStore>(
    store: &Arc<S>,
    issue_id: &Uuid,
    action: IssueClose,
    by: &str,
) -> Result<()> {
    let service = IssueService::new(store.clone());
    let issue = match action {
        IssueClose::Resolve => service.resolve(issue_id, by).await,
        IssueClose::Dismiss => service.dismiss(issue_id, by).await,
    }
    .with_context(|| format!("Failed to close issue {}", issue_id))?;
    println!("Issue {} is now {:?}", issue.issue_id, issue.status);
    Ok(())
}

// ========== Regeneration Commands ==========

struct RegenerateOptions {
    mode: RegenerationMode,
    notes: String,
    include_issues: bool,
    output: Option<PathBuf>,
}

async fn cmd_regenerate<S: CriteriaStore>(
    store: &Arc<S>,
    generator: Arc<dyn Generator>,
    criterion_id: &str,
    options: RegenerateOptions,
    created_by: &str,
) -> Result<()> {
    let current = CriteriaService::new(store.clone()).get(criterion_id).await?;
    let issues = if options.include_issues {
        IssueService::new(store.clone())
            .open_issue_context(criterion_id)
            .await?
    } else {
        Vec::new()
    };

    let request = RegenerateRequest::new(criterion_id, current.problem_statement)
        .with_issues(issues)
        .with_developer_notes(options.notes)
        .with_mode(options.mode);

    let outcome = RegenerationService::new(store.clone(), generator)
        .regenerate(request, created_by)
        .await
        .context("regeneration failed")?;

    println!("Run {}", outcome.run_id);
    println!("Rationale: {}", outcome.edit_rationale);
    print_verdict(&outcome.lint_result);

    match options.output {
        Some(path) => {
            let body = serde_json::to_string_pretty(&outcome.problem_statement_json)?;
            std::fs::write(&path, body)
                .with_context(|| format!("Failed to write candidate to {:?}", path))?;
            println!("Candidate written to {:?}", path);
        }
        None => print_json(&outcome.problem_statement_json)?,
    }
    Ok(())
}

async fn cmd_runs<S: CriteriaStore>(store: &Arc<S>, criterion_id: &str) -> Result<()> {
    let runs = store
        .list_runs(criterion_id)
        .await
        .with_context(|| format!("Failed to list runs for {}", criterion_id))?;
    if runs.is_empty() {
        println!("No regeneration runs for {}", criterion_id);
        return Ok(());
    }
    for run in runs {
        println!(
            "{} {} {:<14} {} {}",
            run.run_id,
            run.created_at.to_rfc3339(),
            run.mode,
            if run.lint_result.passed { "PASS" } else { "FAIL" },
            run.created_by
        );
    }
    Ok(())
}

async fn cmd_run_show<S: CriteriaStore>(store: &Arc<S>, run_id: &Uuid) -> Result<()> {
    let run = store.get_run(run_id).await?;
    print_json(&run)
}

// ========== Statement Library Commands ==========

async fn cmd_statement_create<S: CriteriaStore>(
    store: &Arc<S>,
    criterion_id: &str,
    file: &Path,
    original_input: String,
    additional_context: Option<String>,
    tags: Vec<String>,
) -> Result<()> {
    let problem_statement = read_document(file)?;
    let record = StatementLibrary::new(store.clone())
        .create(NewStatement {
            criterion_id: criterion_id.to_string(),
            problem_statement,
            original_input,
            selected_issues: Vec::new(),
            additional_context,
            tags,
        })
        .await
        .context("statement create failed")?;
    println!("Saved statement {}", record.id);
    Ok(())
}

async fn cmd_statement_show<S: CriteriaStore>(store: &Arc<S>, id: &Uuid) -> Result<()> {
    let record = StatementLibrary::new(store.clone()).get(id).await?;
    print_json(&record)
}

async fn cmd_statement_list<S: CriteriaStore>(store: &Arc<S>, criterion_id: &str) -> Result<()> {
    let records = StatementLibrary::new(store.clone())
        .list_for_criterion(criterion_id)
        .await?;
    if records.is_empty() {
        println!("No statements for {}", criterion_id);
        return Ok(());
    }
    for record in records {
        println!(
            "{} {} [{}]",
            record.id,
            record.updated_at.to_rfc3339(),
            record.tags.join(", ")
        );
    }
    Ok(())
}

async fn cmd_statement_update<S: CriteriaStore>(
    store: &Arc<S>,
    id: &Uuid,
    file: Option<&Path>,
    additional_context: Option<String>,
    tags: Option<Vec<String>>,
) -> Result<()> {
    let patch = StatementPatch {
        problem_statement: file.map(read_document).transpose()?,
        additional_context,
        tags,
    };
    let record = StatementLibrary::new(store.clone())
        .update(id, patch)
        .await
        .context("statement update failed")?;
    println!("Updated statement {}", record.id);
    Ok(())
}

async fn cmd_statement_delete<S: CriteriaStore>(store: &Arc<S>, id: &Uuid) -> Result<()> {
    StatementLibrary::new(store.clone()).delete(id).await?;
    println!("Deleted statement {}", id);
    Ok(())
}
