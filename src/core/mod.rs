pub mod accumulator;
pub mod batch;
pub mod engine;
pub mod extractor;
pub mod inputs;
pub mod rate_limit;

pub use crate::domain::model::{BatchOutcome, ImageInput, ResultTable, RunReport, SavedTable};
pub use crate::domain::ports::{
    ConfigProvider, Pipeline, RateLimit, RateLimiterKind, Storage, VisionModel,
};
pub use crate::utils::error::Result;
