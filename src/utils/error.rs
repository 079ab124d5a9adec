use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhoneExtractError {
    #[error("Unreadable image '{name}': {reason}")]
    UnreadableImage { name: String, reason: String },

    #[error("Model call failed: {message}")]
    ModelCallFailed { message: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Existing table '{path}' is corrupt: {reason}")]
    CorruptExistingTable { path: String, reason: String },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Network,
    Storage,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PhoneExtractError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnreadableImage { .. } | Self::ZipError(_) | Self::ValidationError { .. } => {
                ErrorCategory::Input
            }
            Self::ModelCallFailed { .. } | Self::ApiError(_) => ErrorCategory::Network,
            Self::CorruptExistingTable { .. } | Self::CsvError(_) | Self::IoError(_) => {
                ErrorCategory::Storage
            }
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單張圖片失敗不影響整批
            Self::UnreadableImage { .. } => ErrorSeverity::Low,
            Self::ModelCallFailed { .. } | Self::ApiError(_) => ErrorSeverity::Medium,
            Self::CorruptExistingTable { .. }
            | Self::ZipError(_)
            | Self::CsvError(_)
            | Self::ValidationError { .. } => ErrorSeverity::High,
            Self::IoError(_)
            | Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::UnreadableImage { .. } => {
                "Make sure the file is a PNG or JPEG image and is not truncated".to_string()
            }
            Self::ModelCallFailed { .. } | Self::ApiError(_) => {
                "Check the API key, the endpoint and your network, or raise --request-interval-secs if the provider is rate limiting".to_string()
            }
            Self::CorruptExistingTable { path, .. } => format!(
                "Repair or move '{}' aside; it must be a CSV with the single column 'Phone Number'",
                path
            ),
            Self::ZipError(_) => "Re-create the archive and make sure it is a valid ZIP file".to_string(),
            Self::CsvError(_) | Self::IoError(_) => {
                "Check that the output directory exists and is writable".to_string()
            }
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "Review the command line flags or the TOML configuration".to_string()
            }
            Self::MissingConfigError { field } => {
                format!("Provide a value for '{}' (flag, environment variable or config file)", field)
            }
            Self::ValidationError { .. } => {
                "Pass .png, .jpg, .jpeg or .zip files as input".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::UnreadableImage { name, .. } => format!("Could not read image '{}'", name),
            Self::ModelCallFailed { .. } | Self::ApiError(_) => {
                "The vision model could not be reached".to_string()
            }
            Self::CorruptExistingTable { path, .. } => {
                format!("The existing result table '{}' could not be read", path)
            }
            Self::MissingConfigError { field } => format!("Missing configuration: {}", field),
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid configuration for {}: {}", field, reason)
            }
            other => other.to_string(),
        }
    }

    /// 對應 CLI 的退出碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, PhoneExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_maps_to_exit_code() {
        let corrupt = PhoneExtractError::CorruptExistingTable {
            path: "t.csv".to_string(),
            reason: "bad header".to_string(),
        };
        assert_eq!(corrupt.category(), ErrorCategory::Storage);
        assert_eq!(corrupt.exit_code(), 1);

        let model = PhoneExtractError::ModelCallFailed {
            message: "timeout".to_string(),
        };
        assert_eq!(model.category(), ErrorCategory::Network);
        assert_eq!(model.exit_code(), 2);

        let missing = PhoneExtractError::MissingConfigError {
            field: "api_key".to_string(),
        };
        assert_eq!(missing.severity(), ErrorSeverity::Critical);
        assert!(missing.recovery_suggestion().contains("api_key"));
    }
}
