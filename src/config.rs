use crate::error::{ClientError, Result};
use crate::identity::ProviderConfig;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const APP_DIR: &str = "todo-tui";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub google_client_id: Option<String>,
    pub data_dir: PathBuf,
}

// Optional ~/.config/todo-tui/config.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api_url: Option<String>,
    google_client_id: Option<String>,
    data_dir: Option<PathBuf>,
}

impl Config {
    /// Defaults, then the config file, then `.env` and the environment.
    pub fn load() -> Result<Config> {
        dotenv::dotenv().ok();

        let file = match config_file_path() {
            Some(path) if path.exists() => read_file_config(&path)?,
            _ => FileConfig::default(),
        };

        let config = Config::resolve(file, |key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn resolve(file: FileConfig, var: impl Fn(&str) -> Option<String>) -> Config {
        let api_url = var("TODO_API_URL")
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let google_client_id = var("GOOGLE_CLIENT_ID").or(file.google_client_id);
        let data_dir = var("TODO_DATA_DIR")
            .map(PathBuf::from)
            .or(file.data_dir)
            .unwrap_or_else(default_data_dir);

        Config {
            api_url: api_url.trim().trim_end_matches('/').to_string(),
            google_client_id,
            data_dir,
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "TODO_API_URL must start with http:// or https://, got {:?}",
                self.api_url
            )));
        }
        Ok(())
    }

    pub fn provider(&self) -> ProviderConfig {
        ProviderConfig {
            client_id: self.google_client_id.clone(),
        }
    }
}

pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)?;
    toml::from_str(&raw)
        .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))
}
