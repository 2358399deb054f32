//! Configuration management for CampusBot.
//!
//! Configuration is merged from three sources, later ones winning:
//! - built-in defaults
//! - the YAML config file (`campusbot.yaml` in the workspace, or
//!   `CAMPUSBOT_CONFIG`)
//! - environment variables and CLI flags
//!
//! All mutable state (document index, session transcripts) lives under the
//! workspace-local `.campusbot/` directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .campusbot/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// LLM provider (currently "gemini")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Custom LLM endpoint (None = provider default)
    pub llm_endpoint: Option<String>,

    /// Base URL of the vector-similarity service
    pub vector_endpoint: String,

    /// Default schedule index page (used when retrieval yields nothing)
    pub schedule_url: String,

    /// Run without the external vector service (in-memory retrieval)
    pub offline: bool,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// YAML config file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    retrieval: Option<RetrievalSection>,
    schedule: Option<ScheduleSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    #[serde(rename = "apiKeyEnv")]
    api_key_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RetrievalSection {
    endpoint: Option<String>,
    offline: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScheduleSection {
    url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash-lite".to_string(),
            api_key: None,
            llm_endpoint: None,
            vector_endpoint: "http://localhost:8080".to_string(),
            schedule_url: "https://enigplus.rnu.tn/emplois-du-temps/".to_string(),
            offline: false,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment, defaults and the YAML file.
    ///
    /// Environment variables:
    /// - `CAMPUSBOT_WORKSPACE`: Override workspace path
    /// - `CAMPUSBOT_CONFIG`: Path to config file
    /// - `CAMPUSBOT_PROVIDER`: LLM provider
    /// - `CAMPUSBOT_MODEL`: Model identifier
    /// - `GEMINI_API_KEY` / `GOOGLE_API_KEY`: LLM API key
    /// - `CAMPUSBOT_VECTOR_URL`: Vector-service base URL
    /// - `CAMPUSBOT_SCHEDULE_URL`: Default schedule index page
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("CAMPUSBOT_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("CAMPUSBOT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.workspace.join("campusbot.yaml"),
        };

        if config_path.exists() {
            config.merge_yaml(&config_path)?;
        }

        // Environment variables override the YAML file
        if let Ok(provider) = std::env::var("CAMPUSBOT_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("CAMPUSBOT_MODEL") {
            config.model = model;
        }

        if let Ok(endpoint) = std::env::var("CAMPUSBOT_VECTOR_URL") {
            config.vector_endpoint = endpoint;
        }

        if let Ok(url) = std::env::var("CAMPUSBOT_SCHEDULE_URL") {
            config.schedule_url = url;
        }

        // Either key name works; GEMINI_API_KEY wins
        if config.api_key.is_none() {
            config.api_key = std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("GOOGLE_API_KEY"))
                .ok();
        }

        if config.log_level.is_none() {
            config.log_level = std::env::var("RUST_LOG").ok();
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge the YAML configuration file into this config in place.
    fn merge_yaml(&mut self, path: &PathBuf) -> AppResult<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                self.provider = provider;
            }
            if let Some(model) = llm.model {
                self.model = model;
            }
            if llm.endpoint.is_some() {
                self.llm_endpoint = llm.endpoint;
            }
            if let Some(key_env) = llm.api_key_env {
                self.api_key = std::env::var(&key_env).ok();
            }
        }

        if let Some(retrieval) = file.retrieval {
            if let Some(endpoint) = retrieval.endpoint {
                self.vector_endpoint = endpoint;
            }
            if let Some(offline) = retrieval.offline {
                self.offline = offline;
            }
        }

        if let Some(schedule) = file.schedule {
            if let Some(url) = schedule.url {
                self.schedule_url = url;
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        Ok(())
    }

    /// Apply CLI overrides, which win over env and file settings.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        offline: bool,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if offline {
            self.offline = true;
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the workspace-local state directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(".campusbot")
    }

    /// Ensure the state directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<PathBuf> {
        let dir = self.state_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .campusbot directory: {}", e))
            })?;
        }
        Ok(dir)
    }

    /// Path to the uploaded-document index database.
    pub fn document_db_path(&self) -> PathBuf {
        self.state_dir().join("documents.db")
    }
}
