//! OpinionLens console - sentiment inference and model administration from the terminal

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use opinionlens_console::client::ApiClient;
use opinionlens_console::config::ConsoleConfig;
use opinionlens_console::inference::InferenceConsole;
use opinionlens_console::models::ModelId;
use opinionlens_console::preferences::{PreferencesManager, Theme};
use opinionlens_console::store::JsonFileStore;
use opinionlens_console::view;
use opinionlens_console::{AdminPanel, LoadReport};

#[derive(Parser)]
#[command(name = "opinionlens")]
#[command(version)]
#[command(about = "OpinionLens - sentiment inference console and model admin", long_about = None)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true, env = "OPINIONLENS_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the OpinionLens API
    #[arg(long, global = true, env = "OPINIONLENS_API_URL")]
    api_url: Option<String>,

    /// Directory holding the local cache
    #[arg(long, global = true, env = "OPINIONLENS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the sentiment of a text
    Predict {
        /// Text to evaluate (words are joined with spaces)
        text: Vec<String>,
    },

    /// Evaluate several texts in one request
    BatchPredict {
        /// Texts to evaluate
        texts: Vec<String>,

        /// Read one text per line from this file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show backend information
    About,

    /// Show or change the display theme
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },

    /// Manage models on the backend
    Models {
        #[command(subcommand)]
        action: ModelsAction,
    },
}

#[derive(Subcommand)]
enum ThemeAction {
    /// Print the current theme
    Show,
    /// Switch between dark and light
    Toggle,
    /// Set the theme explicitly (dark or light)
    Set { theme: Theme },
}

#[derive(Subcommand)]
enum ModelsAction {
    /// List the model registry
    Registry,

    /// List models loaded on the backend
    Loaded,

    /// Show which models and versions can still be downloaded
    Options {
        /// Model to list versions for
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show the full record of a loaded model
    Show { model_id: String },

    /// Download a model version from the registry
    Download {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        version: u32,

        /// Make it the model serving predictions
        #[arg(long)]
        set_default: bool,
    },

    /// Make a loaded model the active one
    Activate {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        version: u32,
    },

    /// Remove a loaded model from the backend
    Delete { model_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConsoleConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let data_dir = config.data_dir().context("Failed to resolve data directory")?;
    let store = Arc::new(JsonFileStore::in_dir(&data_dir).context("Failed to open local cache")?);
    let client = ApiClient::with_timeout(&config.api_url, config.request_timeout())
        .context("Failed to create API client")?;
    let prefs = PreferencesManager::new(store.clone());

    info!("Using API at {}", client.base_url());

    match cli.command {
        Commands::Predict { text } => {
            let console = InferenceConsole::new(client);
            let shown = console.evaluate(&text.join(" ")).await?;
            print!("{}", view::render_inference(&shown));
            if shown.error.is_some() {
                std::process::exit(1);
            }
        }

        Commands::BatchPredict { mut texts, file } => {
            if let Some(path) = file {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                texts.extend(content.lines().map(str::to_string));
            }
            let console = InferenceConsole::new(client);
            let results = console
                .evaluate_batch(&texts)
                .await
                .context("Batch inference failed")?;
            for (text, sentiment) in results {
                println!("{:<8}  {}", sentiment.label(), text);
            }
        }

        Commands::About => {
            let about = client.about().await.context("Failed to fetch backend info")?;
            println!("{}", serde_json::to_string_pretty(&about)?);
        }

        Commands::Theme { action } => {
            let theme = match action.unwrap_or(ThemeAction::Show) {
                ThemeAction::Show => prefs.theme(),
                ThemeAction::Toggle => prefs.toggle_theme()?,
                ThemeAction::Set { theme } => {
                    prefs.set_theme(theme)?;
                    theme
                }
            };
            println!("{} {}", theme.icon(), theme);
        }

        Commands::Models { action } => {
            let panel = AdminPanel::new(client.clone(), store.clone());
            let report = panel.load().await;
            warn_if_stale(report);
            print!("{}", view::render_header("OpinionLens admin", prefs.theme()));

            match action {
                ModelsAction::Registry => {
                    print!("{}", view::render_registry_table(&panel.view().registry));
                }
                ModelsAction::Loaded => {
                    print!("{}", view::render_loaded_table(&panel.view().loaded));
                }
                ModelsAction::Options { name } => {
                    if let Some(name) = name {
                        panel.select_name(&name)?;
                    }
                    print!("{}", view::render_download_form(&panel.view()));
                }
                ModelsAction::Show { model_id } => {
                    let details = client
                        .model_details(&ModelId(model_id))
                        .await
                        .context("Failed to fetch model details")?;
                    println!("{}", serde_json::to_string_pretty(&details)?);
                }
                ModelsAction::Download {
                    name,
                    version,
                    set_default,
                } => {
                    panel.select_name(&name)?;
                    panel.select_version(Some(version))?;
                    panel.set_default(set_default);
                    let outcome = panel.submit_download().await?;
                    if !outcome.is_success() {
                        bail!("Download of {name} v{version} {outcome}");
                    }
                    println!("{name} v{version}: {outcome}");
                    print!("{}", view::render_loaded_table(&panel.view().loaded));
                }
                ModelsAction::Activate { name, version } => {
                    let outcome = panel.set_active(&name, version).await?;
                    if !outcome.is_success() {
                        bail!("Activation of {name} v{version} {outcome}");
                    }
                    print!("{}", view::render_loaded_table(&panel.view().loaded));
                }
                ModelsAction::Delete { model_id } => {
                    let outcome = panel.delete(&ModelId(model_id.clone())).await?;
                    if !outcome.is_success() {
                        bail!("Deletion of {model_id} {outcome}");
                    }
                    print!("{}", view::render_loaded_table(&panel.view().loaded));
                }
            }
        }
    }

    Ok(())
}

fn warn_if_stale(report: LoadReport) {
    if !report.loaded_fresh || !report.registry_fresh {
        eprintln!("warning: backend unreachable for some listings, showing cached data");
    }
}
