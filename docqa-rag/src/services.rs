//! Lifecycle of the model-backed collaborators.
//!
//! [`Services`] owns the embedder and generator for the lifetime of a
//! session. Build it once (via [`Services::initialize`] or, with your own
//! providers, [`Services::new`]), hand its `Arc`s to a
//! [`RagPipeline`](crate::RagPipeline), and call [`Services::shutdown`] when
//! the session ends.

use std::sync::Arc;

use tracing::{info, warn};

use crate::embedding::EmbeddingProvider;
use crate::generation::Generator;

#[cfg(feature = "ollama")]
use crate::{
    config::ModelConfig,
    error::Result,
    ollama::{OllamaEmbedder, OllamaGenerator},
};

/// Shared embedder and generator handles.
#[derive(Clone)]
pub struct Services {
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn Generator>,
}

impl Services {
    /// Wrap already-constructed providers.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, generator: Arc<dyn Generator>) -> Self {
        Self { embedder, generator }
    }

    /// Connect to Ollama and build both providers.
    ///
    /// The embedder is connected eagerly so its dimensionality is known. An
    /// unreachable generation endpoint is logged but not fatal; the first
    /// [`generate`](Generator::generate) call reports the failure.
    ///
    /// # Errors
    ///
    /// [`RagError::EmbeddingFailure`](crate::RagError::EmbeddingFailure) if the
    /// embedder cannot connect, or
    /// [`RagError::GenerationFailure`](crate::RagError::GenerationFailure) if
    /// the generator's HTTP client cannot be built.
    #[cfg(feature = "ollama")]
    pub async fn initialize(config: &ModelConfig) -> Result<Self> {
        let embedder = OllamaEmbedder::connect(config).await?;
        let generator = OllamaGenerator::new(config)?;
        if !generator.health_check().await {
            warn!(base_url = %config.base_url, "generation endpoint is not reachable");
        }

        info!(
            embed_model = %config.embed_model,
            dimensions = embedder.dimensions(),
            generate_model = %config.generate_model,
            "services initialized"
        );
        Ok(Self::new(Arc::new(embedder), Arc::new(generator)))
    }

    /// The embedding provider.
    pub fn embedder(&self) -> Arc<dyn EmbeddingProvider> {
        Arc::clone(&self.embedder)
    }

    /// The generator.
    pub fn generator(&self) -> Arc<dyn Generator> {
        Arc::clone(&self.generator)
    }

    /// End the session, releasing this handle's providers.
    ///
    /// Providers still referenced elsewhere stay alive until those references
    /// are dropped.
    pub fn shutdown(self) {
        let shared = Arc::strong_count(&self.embedder) > 1 || Arc::strong_count(&self.generator) > 1;
        if shared {
            warn!("services shut down while providers are still in use");
        }
        info!(
            embed_model = self.embedder.model_name(),
            generate_model = self.generator.model_name(),
            "services shut down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use async_trait::async_trait;

    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, query: &str, _context: &str) -> crate::Result<String> {
            Ok(query.to_string())
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn hands_out_shared_providers() {
        let services = Services::new(Arc::new(HashEmbedder::new(8).unwrap()), Arc::new(EchoGenerator));
        let embedder = services.embedder();
        assert_eq!(embedder.dimensions(), 8);
        assert_eq!(services.generator().generate("hi", "").await.unwrap(), "hi");

        services.shutdown();
        // Handles outlive the service container.
        assert_eq!(embedder.embed("still usable").await.unwrap().len(), 8);
    }
}
