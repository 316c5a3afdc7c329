//! ToastyAnalytics command line
//!
//! Grades files, records feedback and inspects learned strategies. State is
//! kept in a JSON snapshot between runs.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use toasty_core::{
    storage::{InMemoryLedger, InMemoryPatternStore, InMemoryStrategyStore},
    BatchOutcome, EngineConfig, EngineSnapshot, FeedbackRecord, GradeOutcome, GradeRequest,
    GraderRegistry, GradingDimension, GradingEngine, GradingId, Language, UserId,
};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{self, EnvFilter};

/// Default state path under the platform data directory
fn default_state_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toasty")
        .join("state.json")
}

#[derive(Parser)]
#[command(name = "toasty")]
#[command(about = "Adaptive code-quality grading engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// State file (defaults to the platform data directory)
    #[arg(long, env = "TOASTY_STATE")]
    state: Option<PathBuf>,

    /// Engine configuration (TOML)
    #[arg(long, env = "TOASTY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade one or more source files
    Grade {
        /// Files to grade
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Language tag (inferred from the extension if omitted)
        #[arg(long)]
        language: Option<String>,

        /// Dimension to grade (repeatable, defaults to code_quality)
        #[arg(short, long = "dimension")]
        dimensions: Vec<String>,

        /// Requesting user
        #[arg(short, long, env = "TOASTY_USER", default_value = "local")]
        user: String,
    },

    /// Rate an earlier grading
    Feedback {
        /// Grading id printed by `toasty grade`
        grading_id: String,

        /// Usefulness rating
        #[arg(short, long)]
        rating: u8,

        /// Free-text comment (e.g. "too detailed", "explain more")
        #[arg(short, long)]
        comment: Option<String>,

        /// User giving the feedback
        #[arg(short, long, env = "TOASTY_USER", default_value = "local")]
        user: String,
    },

    /// Show learned strategies
    Strategy {
        /// Only this user's strategies
        #[arg(short, long)]
        user: Option<String>,

        /// Only this dimension
        #[arg(short, long)]
        dimension: Option<String>,

        /// Delete the selected strategy (requires --user and --dimension)
        #[arg(long)]
        delete: bool,
    },

    /// Show feedback effectiveness for a user
    Progress {
        /// User to summarise
        #[arg(short, long, env = "TOASTY_USER", default_value = "local")]
        user: String,
    },

    /// Show collective suggestion patterns
    Patterns {
        /// Multiply every counter by this factor first
        #[arg(long)]
        decay: Option<f64>,

        /// Clear every counter first
        #[arg(long)]
        reset: bool,
    },

    /// List registered dimensions
    Dimensions,
}

/// Engine plus the concrete stores needed to snapshot it
struct Workspace {
    engine: GradingEngine,
    strategies: Arc<InMemoryStrategyStore>,
    ledger: Arc<InMemoryLedger>,
    patterns: Arc<InMemoryPatternStore>,
    state_path: PathBuf,
}

impl Workspace {
    fn open(config_path: Option<&Path>, state_path: PathBuf) -> anyhow::Result<Self> {
        let config = match config_path {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => EngineConfig::default(),
        };

        let (strategies, ledger, patterns) = EngineSnapshot::load(&state_path)
            .with_context(|| format!("loading state {}", state_path.display()))?
            .into_stores();
        let strategies = Arc::new(strategies);
        let ledger = Arc::new(ledger);
        let patterns = Arc::new(patterns);

        let registry = GraderRegistry::with_builtin_graders(&config.grading);
        let engine = GradingEngine::new(
            config,
            registry,
            strategies.clone(),
            ledger.clone(),
            patterns.clone(),
        )?;

        Ok(Self {
            engine,
            strategies,
            ledger,
            patterns,
            state_path,
        })
    }

    fn save(&self) -> anyhow::Result<()> {
        EngineSnapshot::capture(&self.strategies, &self.ledger, &self.patterns)?
            .save(&self.state_path)?;
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn resolve_language(tag: Option<&str>, file: &Path) -> anyhow::Result<Language> {
    if let Some(tag) = tag {
        return Ok(Language::from_tag(tag)?);
    }
    let ext = file.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match Language::from_extension(ext) {
        Some(language) => Ok(language),
        None => bail!(
            "cannot infer language of {}; pass --language",
            file.display()
        ),
    }
}

#[derive(Serialize)]
struct FileReport<'a> {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'a GradeOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn grade_files(
    workspace: &Workspace,
    files: Vec<PathBuf>,
    language: Option<String>,
    dimensions: Vec<String>,
    user: String,
) -> anyhow::Result<()> {
    let dimensions: Vec<GradingDimension> = dimensions.iter().map(|d| GradingDimension::from(d.as_str())).collect();
    let user = UserId::new(user);

    let mut requests = Vec::with_capacity(files.len());
    for file in &files {
        let code = std::fs::read_to_string(file)
            .with_context(|| format!("reading {}", file.display()))?;
        let language = resolve_language(language.as_deref(), file)?;
        requests.push(
            GradeRequest::new(code, language, user.clone()).with_dimensions(dimensions.iter().cloned()),
        );
    }

    if requests.len() == 1 {
        let request = requests.remove(0);
        let outcome = workspace.engine.grade(request).await?;
        return print_json(&outcome);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, abandoning remaining files");
            on_interrupt.cancel();
        }
    });

    let batch = workspace.engine.grade_batch(requests, cancel).await;
    if batch.cancelled {
        info!("{} file(s) skipped", batch.skipped);
    }
    print_json(&batch_reports(&batch, &files))
}

/// One report per graded or failed file, in input order
fn batch_reports<'a>(batch: &'a BatchOutcome, files: &[PathBuf]) -> Vec<FileReport<'a>> {
    let mut reports: Vec<(usize, FileReport)> = batch
        .completed
        .iter()
        .map(|(index, outcome)| {
            (
                *index,
                FileReport {
                    file: files[*index].display().to_string(),
                    outcome: Some(outcome),
                    error: None,
                },
            )
        })
        .collect();
    reports.extend(batch.failed.iter().map(|(index, e)| {
        (
            *index,
            FileReport {
                file: files[*index].display().to_string(),
                outcome: None,
                error: Some(e.to_string()),
            },
        )
    }));
    reports.sort_by_key(|(index, _)| *index);
    reports.into_iter().map(|(_, report)| report).collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let filter = EnvFilter::new(format!(
        "toasty={0},toasty_core={0}",
        level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("toasty v{} starting...", env!("CARGO_PKG_VERSION"));

    let state_path = cli.state.unwrap_or_else(default_state_path);
    let workspace = Workspace::open(cli.config.as_deref(), state_path)?;

    match cli.command {
        Commands::Grade {
            files,
            language,
            dimensions,
            user,
        } => {
            grade_files(&workspace, files, language, dimensions, user).await?;
            workspace.save()?;
        }

        Commands::Feedback {
            grading_id,
            rating,
            comment,
            user,
        } => {
            let grading_id = GradingId::from_string(&grading_id)
                .with_context(|| format!("invalid grading id {}", grading_id))?;
            let mut record = FeedbackRecord::new(grading_id, UserId::new(user), rating);
            if let Some(comment) = comment {
                record = record.with_comment(comment);
            }
            let outcome = workspace.engine.submit_feedback(record).await;
            print_json(&outcome)?;
            workspace.save()?;
        }

        Commands::Strategy {
            user,
            dimension,
            delete,
        } => {
            let user = user.map(UserId::new);
            let dimension = dimension.map(|d| GradingDimension::from(d.as_str()));

            if delete {
                let (Some(user), Some(dimension)) = (user.as_ref(), dimension.as_ref()) else {
                    bail!("--delete requires --user and --dimension");
                };
                let deleted = workspace.engine.delete_strategy(user, dimension).await?;
                print_json(&serde_json::json!({ "deleted": deleted }))?;
                workspace.save()?;
            } else {
                let strategies: Vec<_> = workspace
                    .engine
                    .strategies(user.as_ref())
                    .await?
                    .into_iter()
                    .filter(|s| dimension.as_ref().map(|d| &s.key.dimension == d).unwrap_or(true))
                    .collect();
                print_json(&strategies)?;
            }
        }

        Commands::Progress { user } => {
            let progress = workspace.engine.user_progress(&UserId::new(user)).await?;
            print_json(&progress)?;
        }

        Commands::Patterns { decay, reset } => {
            if reset {
                workspace.engine.reset_patterns().await?;
            }
            if let Some(factor) = decay {
                workspace.engine.decay_patterns(factor).await?;
            }
            print_json(&workspace.engine.collective_patterns().await?)?;
            if reset || decay.is_some() {
                workspace.save()?;
            }
        }

        Commands::Dimensions => {
            let dimensions: Vec<_> = workspace
                .engine
                .registry()
                .graders()
                .map(|g| {
                    serde_json::json!({
                        "dimension": g.dimension(),
                        "description": g.description(),
                        "weights": g.default_weights(),
                        "thresholds": g.default_thresholds(),
                    })
                })
                .collect();
            print_json(&dimensions)?;
        }
    }

    Ok(())
}
