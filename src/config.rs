use clap::{Parser, ValueEnum};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub backend: String, // "remote" or "ollama"
    pub model: String,   // Model name
    pub api_key: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Favorites and saved connections. Relative paths live under `data_dir`.
    pub state_file: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConnectionConfig {
    /// Failed connects after which every further failure arms the cooldown
    pub max_failed_attempts: u32,
    pub cooldown_secs: u64,
    /// Public sample database opened by the "Demo Database" choice
    pub demo_url: String,
    pub odbc_driver: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    /// Oldest entries are evicted past this many; 0 keeps everything.
    pub max_entries: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub web: WebConfig,
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub connection: ConnectionConfig,
    pub history: HistoryConfig,
    pub data_dir: String,
    pub log_format: LogFormat,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory for data storage
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        // Start with default configuration
        let mut config_builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            // Check for config in default locations
            let default_locations = vec![
                "config.toml",
                "config/config.toml",
                "/etc/askdb/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        // ASKDB__LLM__API_KEY and friends
        config_builder = config_builder.add_source(
            Environment::with_prefix("ASKDB")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        // Build the config
        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }
        if let Some(data_dir) = &args.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(log_format) = args.log_format {
            config.log_format = log_format;
        }

        Ok(config)
    }

    pub fn state_file_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.storage.state_file);
        if path.is_absolute() {
            path
        } else {
            Path::new(&self.data_dir).join(path)
        }
    }

    /// Where the downloaded demo database is cached.
    pub fn demo_cache_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("Chinook.sqlite")
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.connection.cooldown_secs)
    }
}

// Default implementation
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            llm: LlmConfig {
                backend: "remote".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key: None,
                api_url: Some("https://api.openai.com/v1/chat/completions".to_string()),
            },
            storage: StorageConfig {
                state_file: "saved_data.json".to_string(),
            },
            connection: ConnectionConfig {
                max_failed_attempts: 3,
                cooldown_secs: 5,
                demo_url: "https://vanna.ai/Chinook.sqlite".to_string(),
                odbc_driver: "ODBC Driver 18 for SQL Server".to_string(),
            },
            history: HistoryConfig { max_entries: 1000 },
            data_dir: "data".to_string(),
            log_format: LogFormat::Text,
        }
    }
}
