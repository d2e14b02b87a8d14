use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::llm::{LlmProvider, LlmService, OpenAiProvider};
use crate::pipeline::RewriteService;
use crate::samples::SampleStore;

pub mod error;

use error::InitializationError;

/// Shared application state handed to every route.
///
/// Everything here is read-only after startup; requests never mutate it.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<Settings>,
    pub samples: Arc<SampleStore>,
    pub rewriter: Arc<RewriteService>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// 1. Loads `config.yml`, `secrets.yaml` and environment overrides
    /// 2. Builds the OpenAI-compatible client (an API key is required)
    /// 3. Loads the sample corpus and embeds it when an embedding model is set
    /// 4. Compiles the entity patterns and the retrieval index
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;
        Self::initialize_with(paths, config, settings).await
    }

    /// Same as [`AppState::initialize`] with settings the caller already loaded.
    pub async fn initialize_with(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: Settings,
    ) -> Result<Arc<Self>, InitializationError> {
        let api_key = settings
            .api_key()
            .map_err(|e| InitializationError::Config(e.into()))?;
        let provider = OpenAiProvider::from_settings(&settings.llm, api_key)
            .map_err(|e| InitializationError::Llm(e.into()))?;

        Self::build(paths, config, settings, Arc::new(provider)).await
    }

    /// Wires the state around an already constructed provider.
    pub async fn build(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: Settings,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Arc<Self>, InitializationError> {
        let settings = Arc::new(settings);
        let llm = LlmService::new(provider, settings.llm.clone());

        let samples_path = paths.resolve(&settings.retrieval.samples_path);
        let mut samples =
            SampleStore::load(&samples_path).map_err(|e| InitializationError::Samples(e.into()))?;
        samples.attach_embeddings(&llm).await;
        let samples = Arc::new(samples);

        let rewriter = RewriteService::new(settings.clone(), samples.clone(), llm)
            .map_err(|e| InitializationError::Protect(e.into()))?;
        tracing::info!(
            "Rewriter ready: provider {}, model {}, vocabulary {}",
            rewriter.llm().provider_name(),
            rewriter.llm().model(),
            rewriter.retriever().vocabulary_size()
        );

        Ok(Arc::new(AppState {
            paths,
            config,
            settings,
            samples,
            rewriter: Arc::new(rewriter),
            started_at: Utc::now(),
        }))
    }
}
