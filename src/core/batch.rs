use crate::core::extractor::Extractor;
use crate::domain::model::{BatchOutcome, ImageFailure, ImageInput};
use crate::domain::ports::{RateLimit, VisionModel};
use crate::utils::error::PhoneExtractError;
use std::sync::Arc;

/// 逐張圖片執行擷取器
pub struct BatchDriver<M: VisionModel> {
    extractor: Extractor<M>,
    rate_limit: Arc<dyn RateLimit>,
}

impl<M: VisionModel> BatchDriver<M> {
    pub fn new(extractor: Extractor<M>, rate_limit: Arc<dyn RateLimit>) -> Self {
        Self {
            extractor,
            rate_limit,
        }
    }

    /// 依批次順序對每張圖片擷取一次；失敗的圖片記錄在 `failures` 後繼續下一張
    pub async fn run(&self, images: &[ImageInput]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let total = images.len();

        for (index, image) in images.iter().enumerate() {
            // 讀取階段就失敗的圖片不呼叫模型
            if let Some(reason) = &image.read_error {
                tracing::warn!("❌ {} could not be read: {}", image.name, reason);
                outcome.failures.push(ImageFailure {
                    image: image.name.clone(),
                    error: PhoneExtractError::UnreadableImage {
                        name: image.name.clone(),
                        reason: reason.clone(),
                    },
                });
                outcome.images_processed += 1;
                continue;
            }

            self.rate_limit.acquire().await;
            tracing::info!("🔍 Processing {} ({}/{})", image.name, index + 1, total);

            match self.extractor.extract(image).await {
                Ok(numbers) => {
                    tracing::info!("📞 {}: found {} phone numbers", image.name, numbers.len());
                    outcome.records.extend(numbers);
                }
                Err(e) => {
                    tracing::warn!("❌ {} failed: {}", image.name, e);
                    outcome.failures.push(ImageFailure {
                        image: image.name.clone(),
                        error: e,
                    });
                }
            }
            outcome.images_processed += 1;
        }

        outcome
    }
}
