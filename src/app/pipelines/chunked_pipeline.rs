use crate::app::pipelines::bundle::write_bundle;
use crate::core::batch::{discover_chunks, BatchRunner};
use crate::core::rates::RateTable;
use crate::core::statistics::StatisticsEngine;
use crate::core::{ConfigProvider, Pipeline, Storage, TransformResult};
use crate::domain::settings::SourceKind;
use crate::utils::error::{EtlError, Result};
use std::path::PathBuf;
use std::sync::Arc;

pub struct ChunkExtract {
    pub chunks: Vec<PathBuf>,
    pub rates: Arc<RateTable>,
}

/// Processes a directory of per-year chunk files in parallel and merges the results.
pub struct ChunkedPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
}

impl<S: Storage, C: ConfigProvider> ChunkedPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ChunkedPipeline<S, C> {
    type Extracted = ChunkExtract;

    async fn extract(&self) -> Result<ChunkExtract> {
        let dir = match self.config.source() {
            SourceKind::Chunks(dir) => dir,
            SourceKind::Csv(path) => {
                return Err(EtlError::ConfigError {
                    message: format!("{} is a CSV file, not a chunk directory", path.display()),
                })
            }
        };

        let chunks = discover_chunks(&dir)?;
        tracing::info!("📥 Found {} chunk files in {}", chunks.len(), dir.display());

        let rates = Arc::new(RateTable::load(&self.config.rate_source())?);
        Ok(ChunkExtract { chunks, rates })
    }

    async fn transform(&self, data: ChunkExtract) -> Result<TransformResult> {
        let engine = StatisticsEngine::new(self.config.statistics_options(), data.rates)?;
        let batch = BatchRunner::new(engine, self.config.workers())
            .run(data.chunks)
            .await?;

        let mut result = TransformResult::new(batch.outcome, batch.diagnostics);
        result.failed_chunks = batch.failed_chunks;
        Ok(result)
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        write_bundle(
            &self.storage,
            self.config.output_path(),
            &result,
            &self.config.output_formats(),
        )
        .await
    }
}
