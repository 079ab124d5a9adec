use crate::core::{Pipeline, RunReport};
use crate::utils::error::Result;

pub struct ExtractionEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ExtractionEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// 收集 → 擷取 → 合併。合併失敗時錯誤保留在報告中，本次擷取的號碼不會遺失
    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!("🚀 Starting phone number extraction");

        // Extract
        let images = self.pipeline.extract().await?;
        tracing::info!("🖼️ Collected {} images", images.len());

        // Transform
        let outcome = self.pipeline.transform(images).await?;
        tracing::info!(
            "📊 Extracted {} phone numbers from {} images ({} failed)",
            outcome.records.len(),
            outcome.images_processed,
            outcome.failures.len()
        );

        // Load
        if !outcome.has_records() {
            if outcome.all_failed() {
                tracing::error!(
                    "❌ All {} images failed, result table left unchanged",
                    outcome.images_processed
                );
            } else {
                tracing::info!("No phone numbers found, result table left unchanged");
            }
            return Ok(RunReport {
                outcome,
                saved: None,
                save_error: None,
                finished_at: chrono::Utc::now(),
            });
        }

        let (saved, save_error) = match self.pipeline.load(&outcome).await {
            Ok(saved) => {
                tracing::info!("📁 Table saved to: {}", saved.artifact.path);
                (Some(saved), None)
            }
            Err(e) => {
                tracing::error!("❌ Could not save results: {}", e);
                (None, Some(e))
            }
        };

        Ok(RunReport {
            outcome,
            saved,
            save_error,
            finished_at: chrono::Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BatchOutcome, ImageInput, ResultTable, SavedTable};
    use crate::domain::model::{ImageFailure, TableArtifact};
    use crate::utils::error::PhoneExtractError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubPipeline {
        records: Vec<String>,
        fail_load: bool,
        fail_images: bool,
        loads: AtomicUsize,
    }

    impl StubPipeline {
        fn new(records: &[&str], fail_load: bool) -> Self {
            Self {
                records: records.iter().map(|r| r.to_string()).collect(),
                fail_load,
                fail_images: false,
                loads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Pipeline for StubPipeline {
        async fn extract(&self) -> Result<Vec<ImageInput>> {
            Ok(vec![ImageInput::new("a.png", vec![1, 2, 3])])
        }

        async fn transform(&self, images: Vec<ImageInput>) -> Result<BatchOutcome> {
            let failures = if self.fail_images {
                images
                    .iter()
                    .map(|image| ImageFailure {
                        image: image.name.clone(),
                        error: PhoneExtractError::ModelCallFailed {
                            message: "HTTP 401: invalid api key".to_string(),
                        },
                    })
                    .collect()
            } else {
                vec![]
            };
            Ok(BatchOutcome {
                records: self.records.clone(),
                failures,
                images_processed: images.len(),
            })
        }

        async fn load(&self, outcome: &BatchOutcome) -> Result<SavedTable> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_load {
                return Err(PhoneExtractError::CorruptExistingTable {
                    path: "phones.csv".to_string(),
                    reason: "bad header".to_string(),
                });
            }
            Ok(SavedTable {
                table: ResultTable::new(outcome.records.clone()),
                artifact: TableArtifact {
                    path: "out/phones.csv".to_string(),
                    file_name: "phones.csv".to_string(),
                    media_type: "text/csv",
                },
                appended: outcome.records.len(),
            })
        }
    }

    #[tokio::test]
    async fn test_run_saves_when_records_found() {
        let engine = ExtractionEngine::new(StubPipeline::new(&["555-1234"], false));
        let report = engine.run().await.unwrap();

        assert!(report.is_success());
        let saved = report.saved.unwrap();
        assert_eq!(saved.table.rows, vec!["555-1234"]);
        assert_eq!(saved.artifact.path, "out/phones.csv");
    }

    #[tokio::test]
    async fn test_run_skips_load_without_records() {
        let engine = ExtractionEngine::new(StubPipeline::new(&[], false));
        let report = engine.run().await.unwrap();

        assert!(report.saved.is_none());
        assert!(report.save_error.is_none());
        assert_eq!(engine.pipeline.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_extracted_records() {
        let engine = ExtractionEngine::new(StubPipeline::new(&["1", "2"], true));
        let report = engine.run().await.unwrap();

        assert!(!report.is_success());
        assert!(matches!(
            report.save_error,
            Some(PhoneExtractError::CorruptExistingTable { .. })
        ));
        assert_eq!(report.outcome.records, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_all_images_failed_is_reported_as_failure() {
        let mut pipeline = StubPipeline::new(&[], false);
        pipeline.fail_images = true;
        let engine = ExtractionEngine::new(pipeline);
        let report = engine.run().await.unwrap();

        assert!(report.outcome.all_failed());
        assert!(!report.is_success());
        assert!(report.failure_exit_code().unwrap() >= 1);
        assert_eq!(engine.pipeline.loads.load(Ordering::SeqCst), 0);
    }
}
