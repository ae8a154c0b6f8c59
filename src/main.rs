use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};

use forge_coach::client::ClaudeClient;
use forge_coach::config::AppConfig;
use forge_coach::db::Database;
use forge_coach::logging::{init_logging, OperationTimer};
use forge_coach::metrics::MetricsCollector;
use forge_coach::models::{Formality, PointOfView, Tense};
use forge_coach::repository::SqliteRepository;
use forge_coach::service::CoachingService;
use forge_coach::temperature::TemperatureAnalyzer;
use forge_coach::validation::InputValidator;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the coach to observe a passage
    Analyze {
        /// Requesting user id
        #[arg(short, long)]
        user: String,

        /// Document the passage was selected from
        #[arg(short, long)]
        document: String,

        /// File containing the selected passage
        #[arg(short, long)]
        file: PathBuf,

        /// Feedback depth (LIGHT_TOUCH, STANDARD, DEEP_DIVE)
        #[arg(short, long, default_value = "STANDARD")]
        intensity: String,

        /// Comma-separated focus areas (e.g. PACING,DIALOGUE)
        #[arg(long, value_delimiter = ',')]
        focus: Vec<String>,
    },
    /// Ask a craft question about a project
    Ask {
        /// Requesting user id
        #[arg(short, long)]
        user: String,

        /// Project id
        #[arg(short, long)]
        project: String,

        /// The question
        #[arg(short, long)]
        question: String,

        /// Optional file with a passage for context
        #[arg(short, long)]
        context: Option<PathBuf>,
    },
    /// Coarse chapter aggregate over stored word counts
    Temperature {
        /// Requesting user id
        #[arg(short, long)]
        user: String,

        /// Chapter id
        #[arg(short, long)]
        chapter: String,

        /// Also compute full text metrics for each scene
        #[arg(long)]
        scenes: bool,
    },
    /// Compute prose metrics for a local file
    Metrics {
        /// File to analyze
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Show coaching usage for a user
    Usage {
        /// Requesting user id
        #[arg(short, long)]
        user: String,
    },
    /// List a user's interactions in a project
    Interactions {
        /// Requesting user id
        #[arg(short, long)]
        user: String,

        /// Project id
        #[arg(short, long)]
        project: String,
    },
    /// Mark an interaction as acknowledged
    Acknowledge {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        interaction: String,
    },
    /// Mark an interaction as dismissed
    Dismiss {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        interaction: String,
    },
    /// Flag an interaction for review
    Flag {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        interaction: String,
    },
    /// Show or update a project's style profile
    Style {
        /// Requesting user id
        #[arg(short, long)]
        user: String,

        /// Project id
        #[arg(short, long)]
        project: String,

        /// Point of view literal (e.g. THIRD_LIMITED)
        #[arg(long)]
        pov: Option<String>,

        /// Tense literal (PAST, PRESENT, MIXED)
        #[arg(long)]
        tense: Option<String>,

        /// Register literal (LITERARY, COMMERCIAL, GENRE, EXPERIMENTAL)
        #[arg(long)]
        formality: Option<String>,
    },
}

impl Commands {
    /// Whether the command calls the external model
    const fn needs_model(&self) -> bool {
        matches!(self, Self::Analyze { .. } | Self::Ask { .. })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging; the guard flushes the file appender on exit
    let log_file = config.logging.file_path.as_deref().map(Path::new);
    let _guard = init_logging(Some(&config.get_log_level()), log_file, config.logging.format == "json")?;
    MetricsCollector::init()?;

    info!("Starting forge-coach");

    // Parse command line arguments
    let cli = Cli::parse();

    // Local metrics need neither storage nor the model
    if let Commands::Metrics { file } = &cli.command {
        let text = read_input(file)?;
        let timer = OperationTimer::new("local_metrics");
        let metrics = TemperatureAnalyzer::new()?.analyze(&text);
        timer.finish();
        return print_json(&metrics);
    }

    let service = build_service(&config, cli.command.needs_model())?;

    match cli.command {
        Commands::Analyze {
            user,
            document,
            file,
            intensity,
            focus,
        } => {
            let intensity = InputValidator::parse_intensity(&intensity)?;
            let focus_areas = InputValidator::parse_focus_areas(&focus)?;
            let passage = read_input(&file)?;
            let interaction = service
                .analyze_passage(&user, &document, &passage, intensity, &focus_areas)
                .await?;
            print_json(&interaction)
        },
        Commands::Ask {
            user,
            project,
            question,
            context,
        } => {
            let context = context.as_deref().map(read_input).transpose()?;
            let question = InputValidator::sanitize_text(&question);
            let interaction = service
                .craft_qa(&user, &project, &question, context.as_deref())
                .await?;
            print_json(&interaction)
        },
        Commands::Temperature { user, chapter, scenes } => {
            if scenes {
                print_json(&service.scene_temperatures(&user, &chapter).await?)
            } else {
                print_json(&service.temperature_check(&user, &chapter).await?)
            }
        },
        Commands::Usage { user } => print_json(&service.usage_summary(&user).await?),
        Commands::Interactions { user, project } => print_json(&service.list_interactions(&user, &project).await?),
        Commands::Acknowledge { user, interaction } => print_json(&service.acknowledge(&user, &interaction).await?),
        Commands::Dismiss { user, interaction } => print_json(&service.dismiss(&user, &interaction).await?),
        Commands::Flag { user, interaction } => print_json(&service.flag(&user, &interaction).await?),
        Commands::Style {
            user,
            project,
            pov,
            tense,
            formality,
        } => {
            let current = service.style_profile(&user, &project).await?;
            if pov.is_none() && tense.is_none() && formality.is_none() {
                return print_json(&current);
            }

            let mut context = current.context;
            if let Some(pov) = pov {
                context.pov = pov.parse::<PointOfView>()?;
            }
            if let Some(tense) = tense {
                context.tense = tense.parse::<Tense>()?;
            }
            if let Some(formality) = formality {
                context.formality = formality.parse::<Formality>()?;
            }
            print_json(&service.update_style_profile(&user, &project, context).await?)
        },
        Commands::Metrics { .. } => Ok(()),
    }
}

/// Wire the SQLite repository and model client into a service
fn build_service(config: &AppConfig, needs_model: bool) -> Result<CoachingService> {
    let database_url = config.get_database_url();
    InputValidator::validate_database_url(&database_url)?;
    let database = Database::from_config(&config.database, &database_url)?;
    debug!(url = %database_url, "Database ready");

    // Storage-only commands run without credentials
    let api_key = match config.get_api_key() {
        Ok(key) => key,
        Err(e) if needs_model => return Err(e),
        Err(_) => String::new(),
    };
    let client = ClaudeClient::new(&config.coaching, api_key)?;

    Ok(CoachingService::new(
        Box::new(SqliteRepository::new(database)),
        Box::new(client),
    )?)
}

fn read_input(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(InputValidator::sanitize_text(&raw))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
