use crate::core::batch::ChunkFailure;
use crate::core::report::ReportOutcome;
use crate::core::skills::SkillReport;
use crate::core::statistics::StatisticsReport;
use crate::core::validator::ValidationDiagnostics;
use crate::core::Pipeline;
use crate::domain::model::Vacancy;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// transform 階段的輸出，交給 load 寫入報表包
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub outcome: ReportOutcome,
    pub skills: Option<SkillReport>,
    pub failed_chunks: Vec<ChunkFailure>,
    pub diagnostics: ValidationDiagnostics,
    pub listing: Option<Vec<Vacancy>>,
}

impl TransformResult {
    pub fn new(outcome: ReportOutcome, diagnostics: ValidationDiagnostics) -> Self {
        Self {
            outcome,
            skills: None,
            failed_chunks: Vec::new(),
            diagnostics,
            listing: None,
        }
    }

    pub fn from_report(report: StatisticsReport) -> Self {
        Self {
            skills: report.skills,
            ..Self::new(report.outcome, report.diagnostics)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EtlStatus {
    Completed {
        output_path: String,
        failed_chunks: usize,
    },
    NoData,
    InvalidInput {
        reason: String,
    },
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<EtlStatus> {
        tracing::info!("🚀 Starting ETL process");
        self.monitor.log_stats("Start");

        // Extract
        tracing::info!("📥 Extracting data...");
        let extracted = self.pipeline.extract().await?;
        self.monitor.log_stats("Extract");

        // Transform
        tracing::info!("🔄 Transforming data...");
        let result = self.pipeline.transform(extracted).await?;
        tracing::info!(
            "🔄 Validation kept {} of {} rows ({} malformed)",
            result.diagnostics.accepted_rows,
            result.diagnostics.total_rows,
            result.diagnostics.malformed_records
        );
        self.monitor.log_stage("Transform", result.diagnostics.total_rows);
        let accepted_rows = result.diagnostics.accepted_rows;

        let status = match &result.outcome {
            ReportOutcome::NoData => {
                tracing::warn!("📭 No data to report, skipping load");
                EtlStatus::NoData
            }
            ReportOutcome::InvalidInput { reason } => {
                tracing::warn!("⚠️ Invalid input, skipping load: {}", reason);
                EtlStatus::InvalidInput {
                    reason: reason.clone(),
                }
            }
            ReportOutcome::Ready(_) => {
                // Load
                tracing::info!("📤 Loading data...");
                let failed_chunks = result.failed_chunks.len();
                let output_path = self.pipeline.load(result).await?;
                tracing::info!("📁 Output saved to: {}", output_path);
                self.monitor.log_stage("Load", accepted_rows);
                EtlStatus::Completed {
                    output_path,
                    failed_chunks,
                }
            }
        };

        self.monitor.log_final_stats(accepted_rows);
        Ok(status)
    }
}
