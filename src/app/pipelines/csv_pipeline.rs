use crate::app::pipelines::bundle::write_bundle;
use crate::core::listing::VacancyListing;
use crate::core::rates::RateTable;
use crate::core::reader::read_raw_table_from_bytes;
use crate::core::statistics::{PreparedRun, StatisticsEngine};
use crate::core::{ConfigProvider, Pipeline, Storage, TransformResult};
use crate::domain::model::RawTable;
use crate::domain::settings::SourceKind;
use crate::utils::error::{EtlError, Result};
use std::sync::Arc;

pub struct CsvExtract {
    pub table: RawTable,
    pub rates: Arc<RateTable>,
}

/// 單一 CSV 檔的統計管道
pub struct CsvPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
}

impl<S: Storage, C: ConfigProvider> CsvPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for CsvPipeline<S, C> {
    type Extracted = CsvExtract;

    async fn extract(&self) -> Result<CsvExtract> {
        let path = match self.config.source() {
            SourceKind::Csv(path) => path,
            SourceKind::Chunks(path) => {
                return Err(EtlError::ConfigError {
                    message: format!("{} is a chunk directory, not a CSV file", path.display()),
                })
            }
        };

        tracing::debug!("Reading vacancies from {}", path.display());
        let data = tokio::fs::read(&path).await?;
        let table = read_raw_table_from_bytes(&data)?;
        tracing::info!("📥 Read {} raw rows", table.rows.len());

        let rates = Arc::new(RateTable::load(&self.config.rate_source())?);
        Ok(CsvExtract { table, rates })
    }

    async fn transform(&self, data: CsvExtract) -> Result<TransformResult> {
        let engine = StatisticsEngine::new(self.config.statistics_options(), data.rates)?;
        let listing_query = self.config.listing_query()?;

        tokio::task::spawn_blocking(move || -> Result<TransformResult> {
            let set = match engine.prepare(data.table)? {
                PreparedRun::Ready(set) => set,
                PreparedRun::Stopped(report) => return Ok(TransformResult::from_report(report)),
            };

            // 清單與統計共用同一份驗證後的資料
            let listing = listing_query.as_ref().map(|query| {
                VacancyListing::new()
                    .query(&set.vacancies, query)
                    .into_iter()
                    .cloned()
                    .collect::<Vec<_>>()
            });

            let mut result = TransformResult::from_report(engine.report(set)?);
            result.listing = listing;
            Ok(result)
        })
        .await
        .map_err(|e| EtlError::ProcessingError {
            message: format!("transform task failed: {}", e),
        })?
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
