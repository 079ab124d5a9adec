pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli_config::CliConfig;

#[cfg(feature = "cli")]
mod cli_config {
    use crate::adapters::vision::{DEFAULT_API_ENDPOINT, DEFAULT_MODEL};
    use crate::core::extractor::DEFAULT_INSTRUCTION;
    use crate::core::{ConfigProvider, RateLimiterKind};
    use crate::utils::error::Result;
    use crate::utils::validation::{self, Validate, ARCHIVE_EXTENSIONS, IMAGE_EXTENSIONS};
    use clap::Parser;
    use std::time::Duration;

    #[derive(Clone, Parser)]
    #[command(name = "phone-extract")]
    #[command(about = "Extract phone numbers from images with a vision model and collect them in a CSV table")]
    pub struct CliConfig {
        #[arg(required = true, help = "Image files (.png, .jpg, .jpeg) or ZIP archives of images")]
        pub inputs: Vec<String>,

        #[arg(long, default_value = DEFAULT_API_ENDPOINT)]
        pub api_endpoint: String,

        #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
        pub api_key: Option<String>,

        #[arg(long, default_value = DEFAULT_MODEL)]
        pub model: String,

        #[arg(long, default_value = ".", help = "Directory holding the result table")]
        pub output_path: String,

        #[arg(
            long,
            default_value = "extracted_phone_numbers.csv",
            help = "Result table file name (CSV with a single 'Phone Number' column). An existing .xlsx table is not read; export it to CSV first to keep accumulating"
        )]
        pub table_file: String,

        #[arg(
            long,
            default_value = "10",
            help = "Minimum seconds between two model calls (0 disables pacing)"
        )]
        pub request_interval_secs: u64,

        #[arg(long, default_value = "fixed")]
        pub rate_limiter: RateLimiterKind,

        #[arg(long, default_value = "60")]
        pub timeout_secs: u64,

        #[arg(long, help = "Override the instruction sent with every image")]
        pub instruction: Option<String>,

        #[arg(long, help = "Skip numbers that are already in the table")]
        pub deduplicate: bool,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit logs as JSON")]
        pub log_json: bool,
    }

    impl std::fmt::Debug for CliConfig {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("CliConfig")
                .field("inputs", &self.inputs)
                .field("api_endpoint", &self.api_endpoint)
                .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
                .field("model", &self.model)
                .field("output_path", &self.output_path)
                .field("table_file", &self.table_file)
                .field("request_interval_secs", &self.request_interval_secs)
                .field("rate_limiter", &self.rate_limiter)
                .field("timeout_secs", &self.timeout_secs)
                .field("deduplicate", &self.deduplicate)
                .finish()
        }
    }

    impl ConfigProvider for CliConfig {
        fn inputs(&self) -> &[String] {
            &self.inputs
        }

        fn api_endpoint(&self) -> &str {
            &self.api_endpoint
        }

        fn api_key(&self) -> &str {
            self.api_key.as_deref().unwrap_or_default()
        }

        fn model(&self) -> &str {
            &self.model
        }

        fn instruction(&self) -> &str {
            self.instruction.as_deref().unwrap_or(DEFAULT_INSTRUCTION)
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn table_file(&self) -> &str {
            &self.table_file
        }

        fn request_interval(&self) -> Duration {
            Duration::from_secs(self.request_interval_secs)
        }

        fn rate_limiter(&self) -> RateLimiterKind {
            self.rate_limiter
        }

        fn request_timeout(&self) -> Duration {
            Duration::from_secs(self.timeout_secs)
        }

        fn deduplicate(&self) -> bool {
            self.deduplicate
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validation::validate_url("api_endpoint", &self.api_endpoint)?;
            let api_key = validation::validate_required_field("api_key", &self.api_key)?;
            validation::validate_non_empty_string("api_key", api_key)?;
            validation::validate_non_empty_string("model", &self.model)?;
            validation::validate_path("output_path", &self.output_path)?;
            validation::validate_path("table_file", &self.table_file)?;
            validation::validate_file_extensions(
                "table_file",
                std::slice::from_ref(&self.table_file),
                &["csv"],
            )?;
            validation::validate_range("timeout_secs", self.timeout_secs, 1, 600)?;

            let allowed: Vec<&str> = IMAGE_EXTENSIONS
                .iter()
                .chain(ARCHIVE_EXTENSIONS)
                .copied()
                .collect();
            validation::validate_file_extensions("inputs", &self.inputs, &allowed)?;
            Ok(())
        }
    }

}
