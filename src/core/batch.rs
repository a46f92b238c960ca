use crate::core::reader::read_raw_table_from_path;
use crate::core::report::{ReportOutcome, ReportPayload};
use crate::core::statistics::{StatisticsEngine, StatisticsReport};
use crate::core::validator::ValidationDiagnostics;
use crate::utils::error::{EtlError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkFailure {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub outcome: ReportOutcome,
    pub failed_chunks: Vec<ChunkFailure>,
    pub processed: Vec<String>,
    pub diagnostics: ValidationDiagnostics,
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 3
}

/// 列出目錄中的 CSV 分塊檔，依檔名排序
pub fn discover_chunks(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut chunks: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("csv")
        })
        .collect();
    chunks.sort();
    Ok(chunks)
}

/// Runs the statistics engine over chunk files on a fixed-size blocking pool.
pub struct BatchRunner {
    engine: Arc<StatisticsEngine>,
    workers: usize,
}

impl BatchRunner {
    pub fn new(engine: StatisticsEngine, workers: usize) -> Self {
        Self {
            engine: Arc::new(engine),
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub async fn run(&self, chunks: Vec<PathBuf>) -> Result<BatchOutcome> {
        tracing::info!(
            "🧵 Processing {} chunks with {} workers",
            chunks.len(),
            self.workers
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(chunks.len());

        for path in chunks {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| EtlError::ProcessingError {
                    message: format!("worker pool closed: {}", e),
                })?;
            let engine = Arc::clone(&self.engine);
            let chunk_path = path.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                process_chunk(&engine, &chunk_path)
            });
            handles.push((path, handle));
        }

        let mut merged: Option<ReportPayload> = None;
        let mut invalid_reason: Option<String> = None;
        let mut failed_chunks = Vec::new();
        let mut processed = Vec::new();
        let mut diagnostics = ValidationDiagnostics::default();

        for (path, handle) in handles {
            let name = path.display().to_string();
            let result = handle.await.map_err(|e| EtlError::ChunkError {
                chunk: name.clone(),
                details: e.to_string(),
            });

            match result.and_then(|inner| inner) {
                Ok(report) => {
                    tracing::debug!("✅ Chunk {} done", name);
                    diagnostics.absorb(&report.diagnostics);
                    match report.outcome {
                        ReportOutcome::Ready(payload) => match merged.as_mut() {
                            Some(total) => total.merge_union(payload),
                            None => merged = Some(payload),
                        },
                        ReportOutcome::NoData => {
                            tracing::info!("📭 Chunk {} has no valid records", name)
                        }
                        ReportOutcome::InvalidInput { reason } => {
                            tracing::warn!("⚠️ Chunk {} rejected: {}", name, reason);
                            invalid_reason.get_or_insert(reason);
                        }
                    }
                    processed.push(name);
                }
                Err(e) => {
                    tracing::error!("❌ Chunk {} failed: {}", name, e);
                    failed_chunks.push(ChunkFailure {
                        path: name,
                        error: e.to_string(),
                    });
                }
            }
        }

        let outcome = match (merged, invalid_reason) {
            (Some(payload), _) => ReportOutcome::Ready(payload.into_report_order()),
            (None, Some(reason)) => ReportOutcome::InvalidInput { reason },
            (None, None) => ReportOutcome::NoData,
        };

        tracing::info!(
            "📦 Batch finished: {} processed, {} failed",
            processed.len(),
            failed_chunks.len()
        );

        Ok(BatchOutcome {
            outcome,
            failed_chunks,
            processed,
            diagnostics,
        })
    }
}

fn process_chunk(engine: &StatisticsEngine, path: &Path) -> Result<StatisticsReport> {
    let table = read_raw_table_from_path(path)?;
    engine.run(table)
}
