use crate::domain::model::{BatchOutcome, ExtractionRequest, ImageInput, SavedTable};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn append_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = Result<bool>> + Send;
    /// 顯示給使用者的 `path` 位置
    fn display_path(&self, path: &str) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateLimiterKind {
    #[default]
    Fixed,
    TokenBucket,
}

impl std::str::FromStr for RateLimiterKind {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "fixed" => Ok(RateLimiterKind::Fixed),
            "token-bucket" | "token_bucket" => Ok(RateLimiterKind::TokenBucket),
            other => Err(format!(
                "unknown rate limiter '{}', expected 'fixed' or 'token-bucket'",
                other
            )),
        }
    }
}

impl std::fmt::Display for RateLimiterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateLimiterKind::Fixed => write!(f, "fixed"),
            RateLimiterKind::TokenBucket => write!(f, "token-bucket"),
        }
    }
}

pub trait ConfigProvider: Send + Sync {
    fn inputs(&self) -> &[String];
    fn api_endpoint(&self) -> &str;
    fn api_key(&self) -> &str;
    fn model(&self) -> &str;
    fn instruction(&self) -> &str;
    fn output_path(&self) -> &str;
    fn table_file(&self) -> &str;
    fn request_interval(&self) -> Duration;
    fn rate_limiter(&self) -> RateLimiterKind;
    fn request_timeout(&self) -> Duration;
    fn deduplicate(&self) -> bool;
}

/// 可讀取圖片的外部對話補全模型
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// 回傳唯一一則補全的文字
    async fn complete(&self, request: &ExtractionRequest) -> Result<String>;
}

/// 控制模型呼叫的節奏，每次呼叫前取得一次
#[async_trait]
pub trait RateLimit: Send + Sync {
    async fn acquire(&self);
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// 收集這一批圖片
    async fn extract(&self) -> Result<Vec<ImageInput>>;
    /// 將每張圖片交給視覺模型
    async fn transform(&self, images: Vec<ImageInput>) -> Result<BatchOutcome>;
    /// 將批次結果合併進結果表
    async fn load(&self, outcome: &BatchOutcome) -> Result<SavedTable>;
}

