use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "postboard", about = "Post records with image attachments")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase API key
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// Storage bucket for post images
    #[arg(long, env = "SUPABASE_BUCKET")]
    pub bucket: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub supabase: SupabaseConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body cap, covering multipart image uploads
    pub max_upload_mb: usize,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub key: Option<String>,
    pub bucket: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_mb: 16,
        }
    }
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            bucket: "post-images".to_string(),
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            None => Config::default(),
        };

        // CLI / environment overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref url) = cli.supabase_url {
            config.supabase.url = Some(url.clone());
        }
        if let Some(ref key) = cli.supabase_key {
            config.supabase.key = Some(key.clone());
        }
        if let Some(ref bucket) = cli.bucket {
            config.supabase.bucket = bucket.clone();
        }

        Ok(config)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl SupabaseConfig {
    /// URL and key, both required to start.
    pub fn credentials(&self) -> anyhow::Result<(&str, &str)> {
        match (self.url.as_deref(), self.key.as_deref()) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Ok((url, key)),
            _ => anyhow::bail!("Missing required settings SUPABASE_URL and SUPABASE_KEY"),
        }
    }
}
