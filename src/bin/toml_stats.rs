use clap::Parser;
use vacancy_etl::core::ConfigProvider;
use vacancy_etl::domain::settings::{RateSource, SourceKind};
use vacancy_etl::utils::error::{EtlError, ErrorSeverity};
use vacancy_etl::utils::{logger, validation::Validate};
use vacancy_etl::{ChunkedPipeline, CsvPipeline, EtlEngine, EtlStatus, LocalStorage, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-stats")]
#[command(about = "Vacancy statistics driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "vacancy-stats.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override worker count from config
    #[arg(long)]
    workers: Option<usize>,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(args.verbose);
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_logger(args.verbose, config.json_logs());
    tracing::info!("🚀 Starting TOML-based statistics run");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(workers) = args.workers {
        config
            .performance
            .get_or_insert(vacancy_etl::config::toml_config::PerformanceConfig { workers: None })
            .workers = Some(workers);
        tracing::info!("🔧 Workers overridden to: {}", workers);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config);
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let result = match config.source() {
        SourceKind::Csv(_) => {
            EtlEngine::new_with_monitoring(CsvPipeline::new(storage, config), monitor_enabled)
                .run()
                .await
        }
        SourceKind::Chunks(_) => {
            EtlEngine::new_with_monitoring(ChunkedPipeline::new(storage, config), monitor_enabled)
                .run()
                .await
        }
    };

    match result {
        Ok(EtlStatus::Completed {
            output_path,
            failed_chunks,
        }) => {
            tracing::info!("✅ Statistics run completed successfully!");
            println!("✅ Report written to: {}", output_path);
            if failed_chunks > 0 {
                println!("⚠️ {} chunk(s) failed, see failed_chunks.json", failed_chunks);
            }
        }
        Ok(EtlStatus::NoData) => println!("📭 Нет данных: no valid vacancies found in the input"),
        Ok(EtlStatus::InvalidInput { reason }) => {
            eprintln!("❌ Некорректный ввод: {}", reason);
            std::process::exit(1);
        }
        Err(e) => fail(&e),
    }

    Ok(())
}

fn fail(e: &EtlError) -> ! {
    tracing::error!(
        "❌ Statistics run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Report: {}", config.report.name);
    println!("  Professions: {}", config.report.professions.join(", "));
    println!("  Source: {} ({})", config.source.path, config.source.r#type);
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.load.output_formats.join(", "));
    println!("  Workers: {}", config.workers());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📂 Data Source:");
    match config.source() {
        SourceKind::Csv(path) => println!("  Single CSV file: {}", path.display()),
        SourceKind::Chunks(dir) => println!("  Chunk directory: {}", dir.display()),
    }

    println!();
    println!("💱 Currency Conversion:");
    match config.rate_source() {
        RateSource::Static(rates) => {
            println!("  Static table with {} currencies", rates.len());
            for (currency, rate) in &rates {
                println!("    {} -> {}", currency, rate);
            }
        }
        RateSource::TimeIndexed(path) => println!("  Monthly rates from {}", path.display()),
    }

    let options = config.statistics_options();
    println!();
    println!("⚙️ Aggregation:");
    println!("  Name filter: {:?}", options.name_filter_mode);
    println!("  Validation: {:?}", options.validation_policy);
    println!(
        "  Cities: share >= {} of records, top {}",
        options.city_min_share, options.top_cities
    );
    println!(
        "  Skills: top {} shares, top {} per year",
        options.top_skill_shares, options.top_skills_per_year
    );

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
}
