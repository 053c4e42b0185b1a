//! CLI Tooling
//!
//! Local administration of the perspectives registry in a data directory.
//! The CLI installs no link languages, so shared perspectives can be listed,
//! renamed and removed but not synchronized from here.

use crate::bridge::content_address;
use crate::config::{ConfigLoader, WeaveConfig};
use crate::error::ApiError;
use crate::identity::{AgentIdentity, Ed25519Agent};
use crate::language::LanguageController;
use crate::notify::BroadcastSink;
use crate::perspective::{Neighbourhood, PerspectiveHandle};
use crate::registry::{JsonFileRepository, PerspectivesController, RegistryContext};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const AGENT_SEED_FILE: &str = "agent.seed";

/// Weave CLI - agent-owned link perspectives
#[derive(Parser, Debug)]
#[command(name = "weave")]
#[command(about = "Manage agent-owned link perspectives")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory (overrides config)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Load config and fold command-line overrides into it.
    pub fn resolve_config(&self) -> Result<WeaveConfig, ApiError> {
        let mut config = ConfigLoader::load(self.config.as_deref())?;
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.logging.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Perspective commands
    Perspectives {
        #[command(subcommand)]
        command: PerspectiveCommands,
    },
    /// Print the blake3 content address of a string
    Hash {
        /// Text to hash
        text: String,
    },
    /// Show the agent DID used to author links
    Identity,
}

#[derive(Subcommand, Debug)]
pub enum PerspectiveCommands {
    /// List all perspectives
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Create a perspective
    Add {
        /// Display name
        name: String,
        /// Shared URL of the neighbourhood
        #[arg(long)]
        shared_url: Option<String>,
        /// Bind to this link language address
        #[arg(long)]
        language: Option<String>,
    },
    /// Rename a perspective
    Rename {
        uuid: String,
        name: String,
    },
    /// Remove a perspective
    Remove {
        uuid: String,
    },
    /// Show one perspective
    Show {
        uuid: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

/// CLI context holding the registry for one data directory
pub struct CliContext {
    registry: PerspectivesController,
    identity: Arc<Ed25519Agent>,
    data_dir: PathBuf,
}

impl CliContext {
    pub fn new(config: &WeaveConfig) -> Result<Self, ApiError> {
        let data_dir = config.resolve_data_dir()?;
        let identity = Arc::new(Ed25519Agent::load_or_create(&data_dir.join(AGENT_SEED_FILE))?);
        let context = RegistryContext {
            repository: Arc::new(JsonFileRepository::new(config.perspectives_path()?)),
            languages: Arc::new(LanguageController::new(config.languages.diff_channel_capacity)),
            identity: identity.clone(),
            sink: Arc::new(BroadcastSink::with_capacity(config.notifications.capacity)),
        };
        let registry = PerspectivesController::load(context)?;
        info!(data_dir = %data_dir.display(), "CLI context ready");
        Ok(Self {
            registry,
            identity,
            data_dir,
        })
    }

    pub fn registry(&self) -> &PerspectivesController {
        &self.registry
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Perspectives { command } => self.handle_perspective_command(command),
            Commands::Hash { text } => Ok(content_address(text.as_bytes())),
            Commands::Identity => Ok(self.identity.did()),
        }
    }

    fn handle_perspective_command(&self, command: &PerspectiveCommands) -> Result<String, ApiError> {
        match command {
            PerspectiveCommands::List { format } => {
                let handles = self.registry.all_handles();
                match format.as_str() {
                    "json" => to_json(&handles),
                    "text" => Ok(format_handle_table(&handles)),
                    other => Err(invalid_format(other)),
                }
            }
            PerspectiveCommands::Add {
                name,
                shared_url,
                language,
            } => {
                let neighbourhood = language.as_ref().map(Neighbourhood::new);
                let handle = self.registry.add(name.clone(), shared_url.clone(), neighbourhood)?;
                Ok(format!("Added perspective {} ({})", handle.name, handle.uuid))
            }
            PerspectiveCommands::Rename { uuid, name } => {
                let handle = self.registry.update(parse_uuid(uuid)?, name.clone())?;
                Ok(format!("Renamed perspective {} to {}", handle.uuid, handle.name))
            }
            PerspectiveCommands::Remove { uuid } => {
                let uuid = parse_uuid(uuid)?;
                if self.registry.handle(uuid).is_none() {
                    return Ok(format!("Perspective {} does not exist, nothing to remove", uuid));
                }
                self.registry.remove(uuid)?;
                Ok(format!("Removed perspective {}", uuid))
            }
            PerspectiveCommands::Show { uuid, format } => {
                let uuid = parse_uuid(uuid)?;
                let handle = self.registry.handle(uuid).ok_or(ApiError::NotFound(uuid))?;
                match format.as_str() {
                    "json" => to_json(&handle),
                    "text" => Ok(format_handle_detail(&handle)),
                    other => Err(invalid_format(other)),
                }
            }
        }
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|e| ApiError::ConfigError(format!("Invalid perspective uuid {}: {}", raw, e)))
}

fn invalid_format(format: &str) -> ApiError {
    ApiError::ConfigError(format!(
        "Invalid output format: {} (must be 'text' or 'json')",
        format
    ))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::ConfigError(format!("Failed to render JSON: {}", e)))
}

fn format_handle_table(handles: &[PerspectiveHandle]) -> String {
    if handles.is_empty() {
        return "No perspectives".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["UUID", "Name", "Link Language", "Shared URL"]);
    for handle in handles {
        table.add_row(vec![
            handle.uuid.to_string(),
            handle.name.clone(),
            handle.language_address().unwrap_or("-").to_string(),
            handle.shared_url.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table.to_string()
}

fn format_handle_detail(handle: &PerspectiveHandle) -> String {
    let mut lines = vec![
        format!("UUID:          {}", handle.uuid),
        format!("Name:          {}", handle.name),
        format!(
            "Shared URL:    {}",
            handle.shared_url.as_deref().unwrap_or("-")
        ),
    ];
    match &handle.neighbourhood {
        Some(n) => {
            lines.push(format!("Link Language: {}", n.link_language_address));
            if !n.shared_metadata.is_null() {
                lines.push(format!("Metadata:      {}", n.shared_metadata));
            }
        }
        None => lines.push("Link Language: - (private)".to_string()),
    }
    lines.join("\n")
}
