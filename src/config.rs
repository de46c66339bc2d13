//! Service configuration: defaults, then an optional TOML file, then
//! `VISION_*` environment variables, then positional CLI arguments.

use crate::inference::InputLayout;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming an alternate config file
pub const CONFIG_ENV: &str = "VISION_CONFIG";

/// Config file looked up in the working directory when `VISION_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "vision.toml";

/// Confidence reported for JSON requests, which never run a model
pub const JSON_CONFIDENCE: f32 = 0.42;

/// Confidence reported for image requests when the model gives none
pub const IMAGE_CONFIDENCE: f32 = 0.73;

/// Multipart field carrying the uploaded image
pub const IMAGE_FIELD: &str = "image";

/// Fixed name uploads are persisted under
pub const UPLOAD_FILE_NAME: &str = "content.jpg";

pub const USAGE: &str = "usage: ./vision-service [port] [model file]";

/// What to do with a JSON body that carries neither `image_url` nor `data`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonPolicy {
    /// Reject with 422
    #[default]
    Strict,

    /// Accept and label the outcome `json_empty`
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    /// TorchScript file to classify uploads with. Without one, image
    /// requests only report whether bytes were received.
    pub model_path: Option<String>,
    pub input_layout: InputLayout,
    pub image_size: u32,

    pub json_policy: JsonPolicy,
    pub upload_dir: PathBuf,

    /// Maximum request body size in bytes
    pub payload_limit: usize,

    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub log: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            host: "0.0.0.0".into(),
            port: 8000,
            model_path: None,
            input_layout: InputLayout::Flat,
            image_size: 28,
            json_policy: JsonPolicy::Strict,
            upload_dir: PathBuf::from("uploads"),
            payload_limit: 10 * 1024 * 1024,
            log: "info,actix_web=info".into(),
        }
    }
}

impl Settings {
    /// Load settings from the config file (if present) and the environment
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        Self::from_file(&file)
    }

    pub fn from_file(file: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(config::Environment::with_prefix("VISION").try_parsing(true))
            .build()
            .with_context(|| format!("reading configuration from {file}"))?
            .try_deserialize::<Settings>()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply positional `[port] [model file]` overrides
    pub fn apply_args(&mut self, args: &[String]) -> Result<()> {
        match args {
            [] => {}
            [port] => self.port = parse_port(port)?,
            [port, model] => {
                self.port = parse_port(port)?;
                self.model_path = Some(model.clone());
            }
            _ => return Err(anyhow!("{USAGE}")),
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.image_size == 0 {
            return Err(anyhow!("image_size must be positive"));
        }
        if self.payload_limit == 0 {
            return Err(anyhow!("payload_limit must be positive"));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_port(port: &str) -> Result<u16> {
    port.parse()
        .with_context(|| format!("invalid port {port:?}\n{USAGE}"))
}
