use crate::adapters::vision::ChatCompletionClient;
use crate::core::accumulator::Accumulator;
use crate::core::batch::BatchDriver;
use crate::core::extractor::Extractor;
use crate::core::inputs::collect_images;
use crate::core::rate_limit::build_rate_limiter;
use crate::core::{
    BatchOutcome, ConfigProvider, ImageInput, Pipeline, RateLimit, SavedTable, Storage,
    VisionModel,
};
use crate::utils::error::Result;
use std::sync::Arc;

/// 輸入圖片，輸出電話號碼並附加到結果表
pub struct PhonePipeline<S: Storage, C: ConfigProvider, M: VisionModel> {
    pub(crate) accumulator: Accumulator<S>,
    pub(crate) config: C,
    pub(crate) driver: BatchDriver<M>,
}

impl<S: Storage, C: ConfigProvider> PhonePipeline<S, C, ChatCompletionClient> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let client = ChatCompletionClient::from_config(&config)?;
        Ok(Self::with_model(storage, config, client))
    }
}

impl<S: Storage, C: ConfigProvider, M: VisionModel> PhonePipeline<S, C, M> {
    pub fn with_model(storage: S, config: C, model: M) -> Self {
        let rate_limit = build_rate_limiter(config.rate_limiter(), config.request_interval());
        Self::with_model_and_rate_limit(storage, config, model, rate_limit)
    }

    pub fn with_model_and_rate_limit(
        storage: S,
        config: C,
        model: M,
        rate_limit: Arc<dyn RateLimit>,
    ) -> Self {
        let extractor = Extractor::new(model, config.model(), config.instruction());
        let accumulator = Accumulator::new(storage).with_deduplication(config.deduplicate());
        Self {
            accumulator,
            driver: BatchDriver::new(extractor, rate_limit),
            config,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, M: VisionModel> Pipeline for PhonePipeline<S, C, M> {
    async fn extract(&self) -> Result<Vec<ImageInput>> {
        tracing::debug!("Collecting images from {:?}", self.config.inputs());
        collect_images(self.config.inputs())
    }

    async fn transform(&self, images: Vec<ImageInput>) -> Result<BatchOutcome> {
        Ok(self.driver.run(&images).await)
    }

    async fn load(&self, outcome: &BatchOutcome) -> Result<SavedTable> {
        self.accumulator
            .merge(self.config.table_file(), &outcome.records)
            .await
    }
}
