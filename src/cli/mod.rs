//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod agents;
pub mod chat;
pub mod exec;
mod follow;
pub mod history;
pub mod model_list;
pub mod server;

#[cfg(test)]
mod tests;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::api::BackendClient;
use crate::cli::agents::run_agents;
use crate::cli::chat::run_chat;
use crate::cli::exec::run_exec;
use crate::cli::history::list_history;
use crate::cli::model_list::list_models;
use crate::cli::server::{list_files, test_connection};
use crate::core::config::Config;
use crate::utils::url::validate_backend_url;

pub const BACKEND_URL_ENV: &str = "FLAMES_BACKEND_URL";

#[derive(Parser)]
#[command(name = "flames")]
#[command(version)]
#[command(about = "Terminal client for the Flames chat and dev-server backend")]
#[command(
    long_about = "Flames talks to a Flames backend: it streams chat replies from upstream LLM \
providers, runs commands on a private development server, and browses its files.\n\n\
Environment Variables:\n\
  FLAMES_BACKEND_URL  Backend base URL (defaults to http://localhost:8000)\n\
  FLAMES_LOG          Diagnostic log filter, e.g. 'debug' (falls back to RUST_LOG)\n\n\
Controls:\n\
  Ctrl+C              Stop the reply or command in flight"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Backend base URL for this invocation
    #[arg(short = 'b', long, global = true, value_name = "URL")]
    pub backend: Option<String>,

    /// Upstream provider for this invocation
    #[arg(short = 'p', long, global = true, value_name = "PROVIDER")]
    pub provider: Option<String>,

    /// Model for this invocation
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Show debug diagnostics on stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a message and stream the reply
    Chat {
        /// Message text (multiple words are joined with spaces)
        prompt: Vec<String>,
        /// Attach a file (only its name and size are recorded)
        #[arg(short = 'a', long = "attach", value_name = "FILE")]
        attachments: Vec<PathBuf>,
        /// Append the exchange to a transcript file
        #[arg(short = 'l', long, value_name = "FILE")]
        log: Option<PathBuf>,
    },
    /// Run a command on the private server and stream its output
    Exec {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
    /// List models offered by the configured provider
    Models,
    /// List saved conversations
    History,
    /// Check that the private server is reachable
    TestConnection,
    /// List files on the private server
    Files {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Manage the multi-agent roster
    Agents {
        #[command(subcommand)]
        command: AgentCommands,
    },
    /// Show or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum AgentCommands {
    /// Show all agents
    List,
    /// Add an agent with default settings
    Add {
        name: String,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// System prompt
        #[arg(long)]
        system: Option<String>,
        #[arg(long)]
        temperature: Option<f32>,
    },
    /// Remove an agent by id
    Remove { id: String },
    /// Set the run mode (parallel or sequential)
    Mode { mode: String },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the current configuration
    Show,
    /// Set a configuration value
    Set {
        key: String,
        /// Value to set (multiple words are joined with spaces; omit to clear)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
}

/// Everything a command needs, resolved once from flags, environment and
/// the configuration file.
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
    pub backend_url: String,
    pub client: Arc<BackendClient>,
}

impl Context {
    fn load(args: &Args) -> Result<Self, Box<dyn Error>> {
        let config_path = match &args.config {
            Some(path) => path.clone(),
            None => Config::default_path()?,
        };
        let mut config = Config::load_from_path(&config_path)?;

        let override_url = args
            .backend
            .clone()
            .or_else(|| std::env::var(BACKEND_URL_ENV).ok());
        let backend_url =
            validate_backend_url(&config.resolve_backend_url(override_url.as_deref()))?;

        // Per-invocation overrides; never persisted unless a command saves
        if let Some(provider) = args.provider.as_deref().filter(|p| !p.trim().is_empty()) {
            config.set_value("provider", provider)?;
        }
        if let Some(model) = args.model.as_deref().filter(|m| !m.trim().is_empty()) {
            config.set_value("model", model)?;
        }

        debug!(backend = %backend_url, config = %config_path.display(), "resolved context");
        Ok(Self {
            config,
            config_path,
            client: Arc::new(BackendClient::new(backend_url.clone())),
            backend_url,
        })
    }

    /// Reload the file and save it with `edit` applied, so per-invocation
    /// overrides never leak into the saved configuration.
    pub fn save_with(
        &self,
        edit: impl FnOnce(&mut Config) -> Result<(), Box<dyn Error>>,
    ) -> Result<(), Box<dyn Error>> {
        let mut stored = Config::load_from_path(&self.config_path)?;
        edit(&mut stored)?;
        stored.save_to_path(&self.config_path)?;
        Ok(())
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    crate::logging::init(args.verbose);

    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let ctx = Context::load(&args)?;

    match args.command {
        Commands::Chat {
            prompt,
            attachments,
            log,
        } => run_chat(&ctx, prompt, attachments, log).await,
        Commands::Exec { command } => run_exec(&ctx, command).await,
        Commands::Models => list_models(&ctx).await,
        Commands::History => list_history(&ctx).await,
        Commands::TestConnection => test_connection(&ctx).await,
        Commands::Files { path } => list_files(&ctx, &path).await,
        Commands::Agents { command } => run_agents(&ctx, command),
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                ctx.config.print_all(&ctx.backend_url);
                Ok(())
            }
            ConfigCommands::Set { key, value } => {
                let value = value.join(" ");
                ctx.save_with(|config| Ok(config.set_value(&key, &value)?))?;
                if value.trim().is_empty() {
                    println!("✅ Cleared {key}");
                } else {
                    println!("✅ Set {key} to: {value}");
                }
                Ok(())
            }
        },
    }
}
