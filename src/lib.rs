pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::vision::ChatCompletionClient;
pub use app::pipelines::phone_pipeline::PhonePipeline;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};
pub use core::engine::ExtractionEngine;
pub use utils::error::{PhoneExtractError, Result};
