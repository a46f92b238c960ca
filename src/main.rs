use clap::Parser;
use vacancy_etl::core::{ConfigProvider, Pipeline};
use vacancy_etl::domain::settings::SourceKind;
use vacancy_etl::utils::error::{EtlError, ErrorSeverity};
use vacancy_etl::utils::{logger, validation::Validate};
use vacancy_etl::{ChunkedPipeline, CliConfig, CsvPipeline, EtlEngine, EtlStatus, LocalStorage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(config.verbose, config.json_logs);

    tracing::info!("Starting vacancy-etl CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path.clone());
    let result = match config.source() {
        SourceKind::Csv(_) => run(CsvPipeline::new(storage, config), monitor_enabled).await,
        SourceKind::Chunks(_) => run(ChunkedPipeline::new(storage, config), monitor_enabled).await,
    };

    match result {
        Ok(status) => report_status(&status),
        Err(e) => exit_with_error(&e),
    }

    Ok(())
}

async fn run<P: Pipeline>(pipeline: P, monitor_enabled: bool) -> Result<EtlStatus, EtlError> {
    EtlEngine::new_with_monitoring(pipeline, monitor_enabled)
        .run()
        .await
}

fn report_status(status: &EtlStatus) {
    match status {
        EtlStatus::Completed {
            output_path,
            failed_chunks,
        } => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ Report written to: {}", output_path);
            if *failed_chunks > 0 {
                println!("⚠️ {} chunk(s) failed, see failed_chunks.json", failed_chunks);
            }
        }
        EtlStatus::NoData => {
            println!("📭 Нет данных: no valid vacancies found in the input");
        }
        EtlStatus::InvalidInput { reason } => {
            eprintln!("❌ Некорректный ввод: {}", reason);
            std::process::exit(1);
        }
    }
}

fn exit_with_error(e: &EtlError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
