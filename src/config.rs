use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub groq: GroqConfig,
    #[serde(default)]
    pub rapidapi: RapidApiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// Base URL of a running `flashread serve` instance.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
        }
    }
}

fn default_api_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding the durable history, documents, and credentials records.
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Deserialize, Clone)]
pub struct GroqConfig {
    /// OpenAI-compatible API root; `/v1/chat/completions` is appended.
    #[serde(default = "default_groq_base_url")]
    pub base_url: String,
    #[serde(default = "default_summary_model")]
    pub summary_model: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            base_url: default_groq_base_url(),
            summary_model: default_summary_model(),
            chat_model: default_chat_model(),
        }
    }
}

fn default_groq_base_url() -> String {
    "https://api.groq.com/openai".to_string()
}
fn default_summary_model() -> String {
    "llama-3.1-70b-versatile".to_string()
}
fn default_chat_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RapidApiConfig {
    #[serde(default = "default_rapidapi_base_url")]
    pub base_url: String,
    /// Value sent as `X-RapidAPI-Host`.
    #[serde(default = "default_rapidapi_host")]
    pub host: String,
}

impl Default for RapidApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_rapidapi_base_url(),
            host: default_rapidapi_host(),
        }
    }
}

fn default_rapidapi_base_url() -> String {
    "https://article-extractor-and-summarizer.p.rapidapi.com".to_string()
}
fn default_rapidapi_host() -> String {
    "article-extractor-and-summarizer.p.rapidapi.com".to_string()
}

impl Config {
    /// Defaults for every section; used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            server: ServerConfig::default(),
            client: ClientConfig::default(),
            storage: StorageConfig::default(),
            groq: GroqConfig::default(),
            rapidapi: RapidApiConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Loads `path` when it exists, otherwise falls back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!("no config at {}, using defaults", path.display());
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    for (field, url) in [
        ("client.api_url", &config.client.api_url),
        ("groq.base_url", &config.groq.base_url),
        ("rapidapi.base_url", &config.rapidapi.base_url),
    ] {
        if !url.starts_with("http") {
            anyhow::bail!("{} must be an http(s) URL, got '{}'", field, url);
        }
    }

    if config.groq.summary_model.trim().is_empty() || config.groq.chat_model.trim().is_empty() {
        anyhow::bail!("groq.summary_model and groq.chat_model must not be empty");
    }

    if config.rapidapi.host.trim().is_empty() {
        anyhow::bail!("rapidapi.host must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_yields_defaults() {
        let file = write_config("");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:3000");
        assert_eq!(cfg.groq.summary_model, "llama-3.1-70b-versatile");
        assert_eq!(cfg.groq.chat_model, "llama-3.1-8b-instant");
    }

    #[test]
    fn sections_override_defaults() {
        let file = write_config(
            r#"
[server]
bind = "0.0.0.0:8080"

[groq]
base_url = "http://localhost:9999"
"#,
        );
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert_eq!(cfg.groq.base_url, "http://localhost:9999");
        assert_eq!(cfg.groq.chat_model, "llama-3.1-8b-instant");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let file = write_config("[rapidapi]\nbase_url = \"ftp://nope\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("rapidapi.base_url"));
    }

    #[test]
    fn missing_file_falls_back_to_minimal() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.storage.dir, PathBuf::from("./data"));
    }

    #[test]
    fn example_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/flashread.example.toml");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.client.api_url, "http://127.0.0.1:3000");
        assert_eq!(cfg.rapidapi.host, "article-extractor-and-summarizer.p.rapidapi.com");
    }
}
