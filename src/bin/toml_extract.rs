use clap::Parser;
use phone_extract::config::toml_config::TomlConfig;
use phone_extract::core::inputs::collect_images;
use phone_extract::core::ConfigProvider;
use phone_extract::utils::{logger, report, validation::Validate};
use phone_extract::{ExtractionEngine, LocalStorage, PhonePipeline};

#[derive(Parser)]
#[command(name = "toml-extract")]
#[command(about = "Phone number extraction driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "phone-extract.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Override the request interval from the config (seconds)
    #[arg(long)]
    request_interval_secs: Option<u64>,

    /// Dry run - list the images that would be sent without calling the model
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting TOML-based phone extraction");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 應用命令列覆蓋設定
    if let Some(interval) = args.request_interval_secs {
        config.extract.request_interval_seconds = Some(interval);
        tracing::info!("🔧 Request interval overridden to: {}s", interval);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code().max(1));
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no model calls will be made");
        perform_dry_run(&config)?;
        return Ok(());
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = PhonePipeline::new(storage, config)?;
    let engine = ExtractionEngine::new(pipeline);

    match engine.run().await {
        Ok(run_report) => {
            report::print_report(&run_report);
            if let Some(exit_code) = run_report.failure_exit_code() {
                std::process::exit(exit_code);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Extraction failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Endpoint: {}", config.api_endpoint());
    println!("  Model: {}", config.model());
    println!("  Inputs: {}", config.inputs().join(", "));
    println!(
        "  Table: {}/{}",
        config.output_path(),
        config.table_file()
    );
    println!(
        "  Pacing: {} every {}s",
        config.rate_limiter(),
        config.request_interval_seconds()
    );
    println!("  Timeout: {}s", config.timeout_seconds());
    println!("  Deduplicate: {}", config.deduplicate());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) -> anyhow::Result<()> {
    println!("🔍 Dry Run Analysis:");
    println!();

    let images = collect_images(config.inputs())?;
    println!("🖼️ Images to process: {}", images.len());
    for image in &images {
        println!("  {} ({} bytes)", image.name, image.bytes.len());
    }

    let calls = images.len() as u64;
    let minimum_secs = calls.saturating_sub(1) * config.request_interval_seconds();
    println!();
    println!("⏱️ Model calls: {} (at least {}s with pacing)", calls, minimum_secs);

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
    Ok(())
}
