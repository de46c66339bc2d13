pub mod config;
pub mod inference;
pub mod server;
#[cfg(feature = "torch")]
pub mod torch;

/// Process-level helpers used by the binary
pub mod util {
    use crate::config::Settings;
    use crate::inference::Classifier;
    use std::sync::Arc;
    use tracing_subscriber::EnvFilter;

    /// Install the global tracing subscriber. `RUST_LOG` wins over the
    /// configured directive.
    pub fn init_logging(settings: &Settings) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&settings.log));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    /// Load the inference adapter named by the settings, if any. Failing to
    /// load a configured model is fatal.
    pub fn load_classifier(settings: &Settings) -> anyhow::Result<Option<Arc<dyn Classifier>>> {
        let Some(path) = settings.model_path.as_deref() else {
            tracing::warn!("no model configured: image requests will not run inference");
            return Ok(None);
        };

        load_model(path, settings).map(Some)
    }

    #[cfg(feature = "torch")]
    fn load_model(path: &str, settings: &Settings) -> anyhow::Result<Arc<dyn Classifier>> {
        let model =
            crate::torch::TorchModel::new(path, settings.image_size, settings.input_layout)?;
        Ok(Arc::new(model))
    }

    #[cfg(not(feature = "torch"))]
    fn load_model(path: &str, _settings: &Settings) -> anyhow::Result<Arc<dyn Classifier>> {
        anyhow::bail!("model {path} configured but this build lacks the `torch` feature")
    }
}
