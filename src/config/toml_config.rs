use crate::adapters::vision::{DEFAULT_API_ENDPOINT, DEFAULT_MODEL};
use crate::core::extractor::DEFAULT_INSTRUCTION;
use crate::core::{ConfigProvider, RateLimiterKind};
use crate::utils::error::{PhoneExtractError, Result};
use crate::utils::validation::{self, Validate, ARCHIVE_EXTENSIONS, IMAGE_EXTENSIONS};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

static ENV_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

#[derive(Clone, Deserialize)]
pub struct TomlConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub load: LoadConfig,
}

#[derive(Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub name: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractConfig {
    #[serde(default)]
    pub inputs: Vec<String>,
    pub instruction: Option<String>,
    pub request_interval_seconds: Option<u64>,
    #[serde(default)]
    pub rate_limiter: RateLimiterKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default = "default_table_file")]
    pub table_file: String,
    #[serde(default)]
    pub deduplicate: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            table_file: default_table_file(),
            deduplicate: false,
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_output_path() -> String {
    ".".to_string()
}

fn default_table_file() -> String {
    "extracted_phone_numbers.csv".to_string()
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("name", &self.name)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl std::fmt::Debug for TomlConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TomlConfig")
            .field("model", &self.model)
            .field("extract", &self.extract)
            .field("load", &self.load)
            .finish()
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PhoneExtractError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| PhoneExtractError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MISTRAL_API_KEY})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn request_interval_seconds(&self) -> u64 {
        self.extract.request_interval_seconds.unwrap_or(10)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.model.timeout_seconds.unwrap_or(60)
    }
}

impl ConfigProvider for TomlConfig {
    fn inputs(&self) -> &[String] {
        &self.extract.inputs
    }

    fn api_endpoint(&self) -> &str {
        &self.model.endpoint
    }

    fn api_key(&self) -> &str {
        self.model.api_key.as_deref().unwrap_or_default()
    }

    fn model(&self) -> &str {
        &self.model.name
    }

    fn instruction(&self) -> &str {
        self.extract
            .instruction
            .as_deref()
            .unwrap_or(DEFAULT_INSTRUCTION)
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn table_file(&self) -> &str {
        &self.load.table_file
    }

    fn request_interval(&self) -> Duration {
        Duration::from_secs(self.request_interval_seconds())
    }

    fn rate_limiter(&self) -> RateLimiterKind {
        self.extract.rate_limiter
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds())
    }

    fn deduplicate(&self) -> bool {
        self.load.deduplicate
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("model.endpoint", &self.model.endpoint)?;

        let api_key = validation::validate_required_field("model.api_key", &self.model.api_key)?;
        if api_key.starts_with("${") {
            return Err(PhoneExtractError::MissingConfigError {
                field: format!("model.api_key (environment variable {} is not set)", api_key),
            });
        }
        validation::validate_non_empty_string("model.api_key", api_key)?;
        validation::validate_non_empty_string("model.name", &self.model.name)?;
        validation::validate_range("model.timeout_seconds", self.timeout_seconds(), 1, 600)?;

        if self.extract.inputs.is_empty() {
            return Err(PhoneExtractError::MissingConfigError {
                field: "extract.inputs".to_string(),
            });
        }
        let allowed: Vec<&str> = IMAGE_EXTENSIONS
            .iter()
            .chain(ARCHIVE_EXTENSIONS)
            .copied()
            .collect();
        validation::validate_file_extensions("extract.inputs", &self.extract.inputs, &allowed)?;

        validation::validate_path("load.output_path", &self.load.output_path)?;
        validation::validate_file_extensions(
            "load.table_file",
            std::slice::from_ref(&self.load.table_file),
            &["csv"],
        )?;

        Ok(())
    }
}
